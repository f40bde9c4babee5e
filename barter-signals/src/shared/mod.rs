/// Shared modules for Barter Signals
pub mod config;
pub mod feed;
pub mod indicators;
pub mod patterns;
pub mod ranking;
pub mod series;
pub mod signal;
pub mod state;
pub mod types;
