/// Signal Monitor
///
/// Headless consumer of the signal engine. Reads JSON-lines feed commands from
/// stdin (or INPUT_PATH), classifies every instrument and prints the ranked
/// board once the input is exhausted. Strong signals are logged as they appear.
use std::{collections::HashSet, error::Error, str::FromStr};

use barter_signals::{
    forward_lines, spawn_signal_feed, EngineConfig, FeedCommand, MacdSignalMode, SignalEngine,
    SignalFilter, SignalLabel, SignalSnapshot, SortDirection, SortKey, ThresholdConfig,
    DEFAULT_SERIES_CAPACITY,
};
use tokio::{
    io::BufReader,
    sync::{mpsc, watch},
};
use tracing::{info, warn};

/// Parse an env var, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Load ThresholdConfig from THRESHOLDS_PATH (default: built-in thresholds)
async fn load_thresholds() -> Result<ThresholdConfig, Box<dyn Error>> {
    match std::env::var("THRESHOLDS_PATH") {
        Ok(path) => {
            let raw = tokio::fs::read_to_string(&path).await?;
            let thresholds = serde_json::from_str(&raw)?;
            info!(%path, "Loaded thresholds");
            Ok(thresholds)
        }
        Err(_) => Ok(ThresholdConfig::default()),
    }
}

fn macd_signal_mode() -> MacdSignalMode {
    match std::env::var("MACD_SIGNAL_MODE").as_deref() {
        Ok("rolling") => MacdSignalMode::Rolling,
        Ok("scalar") | Err(_) => MacdSignalMode::Scalar,
        Ok(other) => {
            warn!(value = other, "unknown MACD_SIGNAL_MODE, using scalar");
            MacdSignalMode::Scalar
        }
    }
}

async fn engine_config() -> Result<EngineConfig, Box<dyn Error>> {
    Ok(EngineConfig::default()
        .with_series_capacity(env_or("SERIES_CAPACITY", DEFAULT_SERIES_CAPACITY))
        .with_thresholds(load_thresholds().await?)
        .with_macd_signal(macd_signal_mode())
        .with_validate_thresholds(env_or("STRICT_THRESHOLDS", false)))
}

/// Log STRONG_BUY / STRONG_SELL alerts whenever the alert set changes
fn spawn_alert_logger(mut snapshot_rx: watch::Receiver<SignalSnapshot>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut active: HashSet<(String, SignalLabel)> = HashSet::new();

        while snapshot_rx.changed().await.is_ok() {
            let alerts = snapshot_rx.borrow_and_update().alerts();
            let current: HashSet<(String, SignalLabel)> = alerts
                .iter()
                .map(|r| (r.instrument.to_string(), r.label))
                .collect();

            for result in alerts.iter() {
                if !active.contains(&(result.instrument.to_string(), result.label)) {
                    info!(
                        instrument = %result.instrument,
                        label = %result.label,
                        price = result.price,
                        reasons = ?result.reasons,
                        "ALERT"
                    );
                }
            }
            active = current;
        }
    })
}

fn print_board(snapshot: &SignalSnapshot, key: SortKey, direction: SortDirection, filter: SignalFilter) {
    println!(
        "{:<8} {:>16} {:>9} {:>7} {:>12} {:>9} {:<12} {:<16} {:<12}",
        "SYMBOL", "PRICE", "24H%", "RSI", "MACD", "CCI", "SIGNAL", "PATTERN", "DONCHIAN"
    );
    for result in snapshot.board(key, direction, filter) {
        let change = result
            .change_24h
            .map(|c| format!("{c:+.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<8} {:>16.2} {:>9} {:>7.2} {:>12.4} {:>9.2} {:<12} {:<16} {:<12}",
            result.instrument,
            result.price,
            change,
            result.snapshot.rsi,
            result.snapshot.macd.macd,
            result.snapshot.cci,
            result.label,
            result.snapshot.pattern.label(),
            result.snapshot.donchian.label(),
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    let config = engine_config().await?;
    let sort_key = env_or("SORT_KEY", SortKey::Signal);
    let sort_direction = env_or("SORT_DIRECTION", SortDirection::Descending);
    let filter = env_or("SIGNAL_FILTER", SignalFilter::All);

    info!(
        capacity = config.series_capacity,
        macd_signal = ?config.macd_signal,
        strict = config.validate_thresholds,
        "Starting signal monitor"
    );

    let engine = SignalEngine::new(config)?;
    let (command_tx, command_rx) = mpsc::channel::<FeedCommand>(config.channel_buffer_size);
    let (snapshot_tx, snapshot_rx) = watch::channel(engine.snapshot());

    let alert_logger = spawn_alert_logger(snapshot_rx.clone());
    let driver = spawn_signal_feed(engine, command_rx, snapshot_tx);

    // Configurable via INPUT_PATH env var (default: stdin)
    let forwarded = match std::env::var("INPUT_PATH") {
        Ok(path) => {
            info!(%path, "Reading feed commands from file");
            let file = tokio::fs::File::open(&path).await?;
            forward_lines(BufReader::new(file), command_tx).await?
        }
        Err(_) => {
            info!("Reading feed commands from stdin");
            forward_lines(BufReader::new(tokio::io::stdin()), command_tx).await?
        }
    };

    let engine = driver.await?;
    alert_logger.await?;
    info!(
        forwarded,
        instruments = engine.instruments().count(),
        "Input exhausted"
    );

    print_board(&engine.snapshot(), sort_key, sort_direction, filter);
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
