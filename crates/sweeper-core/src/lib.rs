//! Core sweep engines for the sweeper system.
//!
//! This crate provides the two sequential multi-chain runs: the swap sweep,
//! which funds every chain of one native token through a bridging service,
//! and the deploy sweep, which runs an external deployment command once per
//! network under a primary timeout and a kill grace period. Both keep an
//! ordered run log that is persisted after every target.

use sweeper_types::{RunState, TargetStatus};
use thiserror::Error;

pub mod artifact;
pub mod deploy;
pub mod fee;
pub mod log;
pub mod state;
pub mod swap;

#[cfg(test)]
mod test_support;

pub use artifact::ContractArtifact;
pub use deploy::DeploySweep;
pub use fee::{FeeEstimator, ReferenceOperation};
pub use log::RunLog;
pub use state::{RunTracker, TargetTracker};
pub use swap::SwapSweep;

/// Errors that abort a sweep.
///
/// Per-target failures never surface here; they become log records.
#[derive(Debug, Error)]
pub enum RunnerError {
	/// Error related to configuration or chain metadata.
	#[error("Configuration error: {0}")]
	Config(String),
	/// The run log could not be persisted.
	#[error("Storage error: {0}")]
	Storage(String),
	/// No chain matched the sweep's selection.
	#[error("No targets: {0}")]
	NoTargets(String),
	/// The contract bundle could not be loaded.
	#[error("Artifact error: {0}")]
	Artifact(String),
	/// A target attempted an illegal status change.
	#[error("Invalid transition for {network}: {from:?} -> {to:?}")]
	InvalidTransition {
		network: String,
		from: TargetStatus,
		to: TargetStatus,
	},
	/// A run was started or finished out of order.
	#[error("Invalid run state: {0:?}")]
	InvalidRunState(RunState),
}
