//! Precompiled contract bundle used as the fee reference operation.
//!
//! The file is the JSON artifact emitted by the contract build step: an
//! object with at least `bytecode` (hex init code) and usually `abi` and
//! `contractName`.

use crate::RunnerError;
use alloy_primitives::hex;
use serde::Deserialize;
use std::path::Path;

/// Bytecode and ABI bundle of one compiled contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractArtifact {
	#[serde(default, rename = "contractName")]
	pub contract_name: Option<String>,
	#[serde(default)]
	pub abi: serde_json::Value,
	pub bytecode: String,
}

impl ContractArtifact {
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RunnerError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			RunnerError::Artifact(format!("Cannot read {}: {}", path.display(), e))
		})?;
		serde_json::from_str(&content)
			.map_err(|e| RunnerError::Artifact(format!("Invalid artifact {}: {}", path.display(), e)))
	}

	/// Decodes the creation bytecode.
	pub fn init_code(&self) -> Result<Vec<u8>, RunnerError> {
		let code = hex::decode(self.bytecode.trim())
			.map_err(|e| RunnerError::Artifact(format!("Invalid bytecode: {}", e)))?;
		if code.is_empty() {
			return Err(RunnerError::Artifact(format!(
				"Artifact {} has no bytecode",
				self.contract_name.as_deref().unwrap_or("<unnamed>")
			)));
		}
		Ok(code)
	}
}
