//! Feed driver applying JSON-lines commands to a [`SignalEngine`]

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::config::ThresholdConfig;
use super::state::{SignalEngine, SignalSnapshot};
use super::types::ObservationMessage;
use crate::error::Result;

/// Commands accepted by the feed driver
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum FeedCommand {
    #[serde(rename = "observation")]
    Observation(ObservationMessage),
    #[serde(rename = "thresholds")]
    Thresholds(ThresholdConfig),
}

pub fn parse_feed_command(line: &str) -> Result<FeedCommand> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Apply one command to the engine
pub fn apply_command(engine: &mut SignalEngine, command: FeedCommand) -> Result<()> {
    match command {
        FeedCommand::Observation(message) => engine.ingest(message).map(|_| ()),
        FeedCommand::Thresholds(thresholds) => engine.set_thresholds(thresholds),
    }
}

/// Spawn the feed driver task
///
/// Commands are applied strictly in arrival order. A failing command is logged
/// and skipped. After every applied command the whole snapshot is published.
/// The task returns the engine once the command channel closes.
pub fn spawn_signal_feed(
    mut engine: SignalEngine,
    mut command_rx: mpsc::Receiver<FeedCommand>,
    snapshot_tx: watch::Sender<SignalSnapshot>,
) -> tokio::task::JoinHandle<SignalEngine> {
    tokio::spawn(async move {
        info!("Starting signal feed driver");
        let mut applied = 0usize;
        let mut skipped = 0usize;

        while let Some(command) = command_rx.recv().await {
            match apply_command(&mut engine, command) {
                Ok(()) => {
                    applied += 1;
                    let _ = snapshot_tx.send(engine.snapshot());
                }
                Err(error) => {
                    skipped += 1;
                    warn!(%error, "skipping feed command");
                }
            }
        }

        info!(applied, skipped, "Command channel closed, feed driver stopping");
        engine
    })
}

/// Parse JSON-lines from `reader` and forward commands in order
///
/// Blank lines are ignored and undecodable lines are logged and skipped.
/// Returns the number of commands forwarded.
pub async fn forward_lines<R>(reader: R, command_tx: mpsc::Sender<FeedCommand>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match parse_feed_command(&line) {
            Ok(command) => {
                if command_tx.send(command).await.is_err() {
                    debug!("Feed driver gone, stop reading input");
                    break;
                }
                forwarded += 1;
            }
            Err(error) => warn!(line_number, %error, "skipping undecodable line"),
        }
    }

    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::EngineConfig;
    use crate::shared::types::InstrumentId;

    const INPUT: &str = r#"
{"type":"observation","instrument":"BTC","time":"2024-01-01T00:00:00Z","close":"85000000","volume":"1.5"}
not json
{"type":"observation","instrument":"ETH","close":4500000}
{"type":"observation","instrument":"BTC","close":"-5"}
{"type":"thresholds","rsi_oversold":25}
{"type":"observation","instrument":"btc","time":"2024-01-01T00:01:00Z","close":"85100000","change_24h":"1.2"}
"#;

    #[test]
    fn test_parse_feed_command() {
        let command = parse_feed_command(r#"{"type":"thresholds","cci_period":10}"#).unwrap();
        assert_eq!(
            command,
            FeedCommand::Thresholds(ThresholdConfig::default().with_cci_period(10))
        );

        let command = parse_feed_command(r#"{"type":"observation","instrument":"XRP","close":"2500"}"#).unwrap();
        assert!(matches!(command, FeedCommand::Observation(ref msg) if msg.instrument == "XRP"));

        assert!(parse_feed_command(r#"{"type":"unknown"}"#).is_err());
    }

    #[tokio::test]
    async fn test_feed_driver_applies_commands_in_order() {
        let engine = SignalEngine::new(EngineConfig::default()).unwrap();
        let (command_tx, command_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(SignalSnapshot::default());

        let driver = spawn_signal_feed(engine, command_rx, snapshot_tx);
        let forwarded = forward_lines(INPUT.as_bytes(), command_tx).await.unwrap();
        assert_eq!(forwarded, 5);

        let engine = driver.await.unwrap();
        let btc = InstrumentId::new("BTC");

        // Negative close rejected, both valid BTC observations admitted
        let series = engine.series(&btc).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].close, 85_100_000.0);
        assert_eq!(engine.thresholds().rsi_oversold, 25.0);

        let snapshot = snapshot_rx.borrow().clone();
        assert_eq!(snapshot.results.len(), 2);
        assert_eq!(snapshot.thresholds.rsi_oversold, 25.0);
        assert_eq!(snapshot.results[0].instrument, btc);
        assert_eq!(snapshot.results[0].change_24h, Some(1.2));
    }
}
