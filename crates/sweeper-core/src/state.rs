//! Run and target state machines.
//!
//! Targets move `Pending -> InProgress -> {Completed, Skipped, Failed}` and
//! never go back. A run moves `Idle -> Running -> Done`.

use crate::RunnerError;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use sweeper_types::{RunState, TargetStatus};

/// Lifecycle of one target within a sweep.
#[derive(Debug, Clone)]
pub struct TargetTracker {
	network: String,
	status: TargetStatus,
}

impl TargetTracker {
	pub fn new(network: impl Into<String>) -> Self {
		Self {
			network: network.into(),
			status: TargetStatus::Pending,
		}
	}

	pub fn status(&self) -> TargetStatus {
		self.status
	}

	/// Moves to `to`, rejecting transitions outside the table.
	pub fn transition(&mut self, to: TargetStatus) -> Result<(), RunnerError> {
		if !is_valid_transition(self.status, to) {
			return Err(RunnerError::InvalidTransition {
				network: self.network.clone(),
				from: self.status,
				to,
			});
		}
		tracing::trace!(network = %self.network, from = ?self.status, to = ?to, "Target transition");
		self.status = to;
		Ok(())
	}
}

fn is_valid_transition(from: TargetStatus, to: TargetStatus) -> bool {
	// Static transition table - each state maps to allowed next states
	static TRANSITIONS: Lazy<HashMap<TargetStatus, HashSet<TargetStatus>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			TargetStatus::Pending,
			HashSet::from([TargetStatus::InProgress]),
		);
		m.insert(
			TargetStatus::InProgress,
			HashSet::from([
				TargetStatus::Completed,
				TargetStatus::Skipped,
				TargetStatus::Failed,
			]),
		);
		m.insert(TargetStatus::Completed, HashSet::new()); // terminal
		m.insert(TargetStatus::Skipped, HashSet::new()); // terminal
		m.insert(TargetStatus::Failed, HashSet::new()); // terminal
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}

/// Lifecycle of a whole sweep.
#[derive(Debug)]
pub struct RunTracker {
	state: RunState,
}

impl Default for RunTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl RunTracker {
	pub fn new() -> Self {
		Self {
			state: RunState::Idle,
		}
	}

	pub fn state(&self) -> RunState {
		self.state
	}

	/// `Idle -> Running`, once the target list is loaded.
	pub fn start(&mut self) -> Result<(), RunnerError> {
		match self.state {
			RunState::Idle => {
				self.state = RunState::Running;
				Ok(())
			},
			other => Err(RunnerError::InvalidRunState(other)),
		}
	}

	/// `Running -> Done`, after the final flush.
	pub fn finish(&mut self) -> Result<(), RunnerError> {
		match self.state {
			RunState::Running => {
				self.state = RunState::Done;
				Ok(())
			},
			other => Err(RunnerError::InvalidRunState(other)),
		}
	}
}
