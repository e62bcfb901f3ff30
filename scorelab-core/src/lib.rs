//! ScoreLab Core — the conviction-score backtest engine.
//!
//! This crate contains everything below the orchestration layer:
//! - Domain types (bars, positions, trades, equity snapshots)
//! - Data providers (Yahoo Finance, CSV) and benchmark-calendar alignment
//! - Feature engine (rolling technical indicators per symbol)
//! - Scoring function (multi-factor conviction score, 0–100)
//! - Portfolio simulator (sequential day loop with next-bar fills)

pub mod data;
pub mod domain;
pub mod features;
pub mod scoring;
pub mod sim;
