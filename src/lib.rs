//! Yatra Sevak - multi-provider LLM chat gateway
//!
//! Forwards travel-assistant chat messages to every enabled hosted LLM
//! provider, retries transient failures, and returns the answer of the
//! highest-priority provider that succeeded.

pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod orchestration;
pub mod providers;
pub mod telemetry;
