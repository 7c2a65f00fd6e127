//! Deployed-address extraction from free-form command output.
//!
//! Pattern version 1: `<marker>\s*-\s*(0x[0-9a-fA-F]{40})`, the line format
//! deployment tools print for each deployed future, e.g.
//! `ForwarderModule#Forwarder - 0x5FbDB2315678afecb367f032d93F642f64180aa3`.

use crate::ProcessError;
use regex::Regex;

/// Current version of the marker pattern.
pub const MARKER_PATTERN_VERSION: u32 = 1;

/// Compiled address pattern anchored to one marker token.
#[derive(Debug, Clone)]
pub struct AddressMarker {
	marker: String,
	pattern: Regex,
}

impl AddressMarker {
	/// Compiles the pattern for `marker`. The marker is matched literally.
	pub fn new(marker: &str) -> Result<Self, ProcessError> {
		if marker.trim().is_empty() {
			return Err(ProcessError::InvalidMarker("marker cannot be empty".into()));
		}
		let pattern = Regex::new(&format!(
			r"{}\s*-\s*(0x[0-9a-fA-F]{{40}})",
			regex::escape(marker)
		))
		.map_err(|e| ProcessError::InvalidMarker(e.to_string()))?;

		Ok(Self {
			marker: marker.to_string(),
			pattern,
		})
	}

	pub fn marker(&self) -> &str {
		&self.marker
	}

	/// Returns the first address following the marker, if any.
	///
	/// No match is a normal outcome.
	pub fn extract(&self, output: &str) -> Option<String> {
		self.pattern
			.captures(output)
			.and_then(|caps| caps.get(1))
			.map(|m| m.as_str().to_string())
	}
}
