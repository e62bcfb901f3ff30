//! ScoreLab Runner — backtest orchestration, metrics and walk-forward.
//!
//! This crate builds on `scorelab-core` to provide:
//! - Run configuration with TOML loading and a deterministic run id
//! - Single-backtest runner with performance metrics
//! - Walk-forward validation with per-window threshold tuning

pub mod config;
pub mod metrics;
pub mod runner;
pub mod walk_forward;

pub use config::{BacktestConfig, ConfigError};
pub use metrics::PerformanceSummary;
pub use runner::{run_backtest, run_backtest_from_data, RunError, SimulationResult};
pub use walk_forward::{
    create_windows, run_walk_forward, WalkForwardError, WalkForwardParams, WalkForwardResult,
    WindowResult,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }

    #[test]
    fn performance_summary_is_send_sync() {
        assert_send::<PerformanceSummary>();
        assert_sync::<PerformanceSummary>();
    }

    #[test]
    fn simulation_result_is_send_sync() {
        assert_send::<SimulationResult>();
        assert_sync::<SimulationResult>();
    }

    #[test]
    fn walk_forward_types_are_send_sync() {
        assert_send::<WalkForwardParams>();
        assert_sync::<WalkForwardParams>();
        assert_send::<WalkForwardResult>();
        assert_sync::<WalkForwardResult>();
    }
}
