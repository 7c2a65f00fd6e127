//! Run and per-target lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle of one target within a run.
///
/// `Pending -> InProgress -> {Completed, Skipped, Failed}`; the last three
/// are terminal and each yields exactly one log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
	Pending,
	InProgress,
	Completed,
	Skipped,
	Failed,
}

impl TargetStatus {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Completed | Self::Skipped | Self::Failed)
	}
}

/// Lifecycle of a whole sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
	Idle,
	Running,
	Done,
}

/// Per-status counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
	pub completed: usize,
	pub skipped: usize,
	pub failed: usize,
}

impl RunSummary {
	pub fn record(&mut self, status: TargetStatus) {
		match status {
			TargetStatus::Completed => self.completed += 1,
			TargetStatus::Skipped => self.skipped += 1,
			TargetStatus::Failed => self.failed += 1,
			TargetStatus::Pending | TargetStatus::InProgress => {},
		}
	}

	pub fn total(&self) -> usize {
		self.completed + self.skipped + self.failed
	}
}
