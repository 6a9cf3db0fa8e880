//! Application layer containing the fraud-review workflow.
//!
//! The `Orchestrator` fans a case out to the independent agents on separate
//! `tokio` tasks, runs the generic agent over their verdicts and hands all
//! four to the voting aggregator.

pub mod agents;
pub mod config;
pub mod orchestrator;
pub mod voting;
