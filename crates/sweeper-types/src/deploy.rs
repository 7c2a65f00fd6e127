//! Deployment-path result records.

use serde::{Deserialize, Serialize};

/// Terminal status of one deployment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployStatus {
	Success,
	Failed,
}

/// One deploy-sweep record per target network.
///
/// `contract` holds the address extracted from the command output, if any;
/// a missing address does not make an otherwise clean run `failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRunResult {
	pub network: String,
	pub status: DeployStatus,
	#[serde(rename = "contract")]
	pub contract_address: Option<String>,
	pub output: String,
	pub error: Option<String>,
	/// RFC 3339 / ISO-8601 completion time.
	pub timestamp: String,
}

impl ProcessRunResult {
	pub fn is_success(&self) -> bool {
		self.status == DeployStatus::Success
	}
}
