//! Run log owned by a sweep.
//!
//! The in-memory record list is the source of truth. Every append is
//! followed by a flush that rewrites the whole list under its storage key,
//! so a crash loses at most the target that was in flight.

use crate::RunnerError;
use serde::Serialize;
use std::sync::Arc;
use sweeper_storage::StorageService;
use sweeper_types::StorageKey;

/// Ordered result records plus, optionally, the names of successful targets.
pub struct RunLog<T> {
	storage: Arc<StorageService>,
	key: StorageKey,
	records: Vec<T>,
	successes: Option<(StorageKey, Vec<String>)>,
}

impl<T: Serialize> RunLog<T> {
	pub fn new(storage: Arc<StorageService>, key: StorageKey) -> Self {
		Self {
			storage,
			key,
			records: Vec::new(),
			successes: None,
		}
	}

	/// Also keeps the list of successful target names under `key`.
	pub fn with_success_list(mut self, key: StorageKey) -> Self {
		self.successes = Some((key, Vec::new()));
		self
	}

	/// Appends `record` and flushes.
	pub async fn append(&mut self, record: T) -> Result<(), RunnerError> {
		self.records.push(record);
		self.flush().await
	}

	/// Appends `record`, adds `name` to the success list and flushes both.
	pub async fn append_success(&mut self, record: T, name: &str) -> Result<(), RunnerError> {
		if let Some((_, names)) = &mut self.successes {
			names.push(name.to_string());
		}
		self.append(record).await
	}

	/// Writes the full record list, and the success list if kept.
	pub async fn flush(&self) -> Result<(), RunnerError> {
		self.storage
			.store(self.key, &self.records)
			.await
			.map_err(|e| RunnerError::Storage(e.to_string()))?;
		if let Some((key, names)) = &self.successes {
			self.storage
				.store(*key, names)
				.await
				.map_err(|e| RunnerError::Storage(e.to_string()))?;
		}
		tracing::debug!(key = self.key.as_str(), records = self.records.len(), "Flushed run log");
		Ok(())
	}

	pub fn records(&self) -> &[T] {
		&self.records
	}

	pub fn successes(&self) -> &[String] {
		self.successes
			.as_ref()
			.map(|(_, names)| names.as_slice())
			.unwrap_or_default()
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::memory_storage;

	#[tokio::test]
	async fn test_every_append_is_persisted() {
		let (storage, reader) = memory_storage();
		let mut log = RunLog::new(storage, StorageKey::SwapLog).with_success_list(StorageKey::SwappedChains);

		log.append("skipped".to_string()).await.unwrap();
		let stored: Vec<String> = reader.retrieve(StorageKey::SwapLog).await.unwrap();
		assert_eq!(stored, vec!["skipped"]);
		let names: Vec<String> = reader.retrieve(StorageKey::SwappedChains).await.unwrap();
		assert!(names.is_empty());

		log.append_success("completed".to_string(), "BASE_MAINNET")
			.await
			.unwrap();
		let stored: Vec<String> = reader.retrieve(StorageKey::SwapLog).await.unwrap();
		assert_eq!(stored, vec!["skipped", "completed"]);
		let names: Vec<String> = reader.retrieve(StorageKey::SwappedChains).await.unwrap();
		assert_eq!(names, vec!["BASE_MAINNET"]);
		assert_eq!(log.successes(), ["BASE_MAINNET".to_string()]);
	}

	#[tokio::test]
	async fn test_empty_flush_writes_empty_list() {
		let (storage, reader) = memory_storage();
		let log: RunLog<String> = RunLog::new(storage, StorageKey::DeployLog);
		log.flush().await.unwrap();

		let stored: Vec<String> = reader.retrieve(StorageKey::DeployLog).await.unwrap();
		assert!(stored.is_empty());
		assert!(!reader.exists(StorageKey::SwappedChains).await.unwrap());
		assert!(log.successes().is_empty());
	}
}
