//! Scripted chain, bridging-service and storage doubles shared by the sweep
//! tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sweeper_delivery::{DeliveryError, DeliveryInterface};
use sweeper_quote::{QuoteError, QuoteInterface};
use sweeper_storage::implementations::memory::MemoryStorage;
use sweeper_storage::{StorageError, StorageInterface, StorageService};
use sweeper_types::{
	ChainDescriptor, StorageKey, SwapQuote, SwapRequest, Transaction, TransactionHash,
	TransactionReceipt, B256,
};

pub(crate) fn chain(name: &str, chain_id: u64, decimals: u8) -> ChainDescriptor {
	ChainDescriptor {
		name: name.into(),
		chain_id,
		node_url: format!("https://{}.rpc.example", name.to_lowercase()),
		token_symbol: Some("ETH".into()),
		decimals,
	}
}

/// A memory-backed storage service plus a handle to read what was written.
pub(crate) fn memory_storage() -> (Arc<StorageService>, StorageService) {
	let backend = MemoryStorage::new();
	(
		Arc::new(StorageService::new(Box::new(backend.clone()))),
		StorageService::new(Box::new(backend)),
	)
}

/// Memory storage whose `fail_on`-th write (1-based) fails.
///
/// Every attempted write is recorded as the key and the number of
/// top-level array entries in the document.
#[derive(Clone)]
pub(crate) struct FlakyStorage {
	inner: MemoryStorage,
	fail_on: usize,
	writes: Arc<Mutex<Vec<(String, usize)>>>,
}

impl FlakyStorage {
	pub fn new(fail_on: usize) -> Self {
		Self {
			inner: MemoryStorage::new(),
			fail_on,
			writes: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn service(&self) -> Arc<StorageService> {
		Arc::new(StorageService::new(Box::new(self.clone())))
	}

	/// Reads what was actually persisted.
	pub fn reader(&self) -> StorageService {
		StorageService::new(Box::new(self.inner.clone()))
	}

	pub fn writes(&self) -> Vec<(String, usize)> {
		self.writes.lock().unwrap().clone()
	}

	/// Entry count of the last attempted write under `key`.
	pub fn last_write(&self, key: StorageKey) -> Option<usize> {
		self.writes()
			.into_iter()
			.rev()
			.find(|(written, _)| written == key.as_str())
			.map(|(_, entries)| entries)
	}
}

#[async_trait]
impl StorageInterface for FlakyStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let entries = serde_json::from_slice::<Value>(&value)
			.ok()
			.and_then(|doc| doc.as_array().map(Vec::len))
			.unwrap_or_default();
		let attempt = {
			let mut writes = self.writes.lock().unwrap();
			writes.push((key.to_string(), entries));
			writes.len()
		};
		if attempt == self.fail_on {
			return Err(StorageError::Backend("disk full".into()));
		}
		self.inner.set_bytes(key, value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.inner.delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.inner.exists(key).await
	}
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum DepositOutcome {
	Mined,
	NullReceipt,
	BroadcastFails,
}

/// Chain double: live estimates only for networks given a gas value.
pub(crate) struct FakeChain {
	gas: HashMap<String, u64>,
	fee_per_gas: u128,
	outcome: DepositOutcome,
	pub estimated: Mutex<Vec<(String, Transaction)>>,
	pub submitted: Mutex<Vec<(String, Transaction)>>,
}

impl FakeChain {
	pub fn new() -> Self {
		Self {
			gas: HashMap::new(),
			fee_per_gas: 1,
			outcome: DepositOutcome::Mined,
			estimated: Mutex::new(Vec::new()),
			submitted: Mutex::new(Vec::new()),
		}
	}

	pub fn with_gas(mut self, network: &str, gas: u64) -> Self {
		self.gas.insert(network.to_string(), gas);
		self
	}

	pub fn with_fee_per_gas(mut self, fee_per_gas: u128) -> Self {
		self.fee_per_gas = fee_per_gas;
		self
	}

	pub fn with_outcome(mut self, outcome: DepositOutcome) -> Self {
		self.outcome = outcome;
		self
	}
}

#[async_trait]
impl DeliveryInterface for FakeChain {
	async fn estimate_gas(&self, network: &str, tx: &Transaction) -> Result<u64, DeliveryError> {
		self.estimated
			.lock()
			.unwrap()
			.push((network.to_string(), tx.clone()));
		self.gas
			.get(network)
			.copied()
			.ok_or_else(|| DeliveryError::Network(format!("{} unreachable", network)))
	}

	async fn get_fee_per_gas(&self, _network: &str) -> Result<u128, DeliveryError> {
		Ok(self.fee_per_gas)
	}

	async fn submit(&self, network: &str, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		if let DepositOutcome::BroadcastFails = self.outcome {
			return Err(DeliveryError::Broadcast("insufficient funds for gas".into()));
		}
		let mut submitted = self.submitted.lock().unwrap();
		submitted.push((network.to_string(), tx));
		Ok(TransactionHash(B256::repeat_byte(submitted.len() as u8)))
	}

	async fn wait_for_confirmation(
		&self,
		_network: &str,
		hash: &TransactionHash,
		_confirmations: u64,
		_timeout: Duration,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		match self.outcome {
			DepositOutcome::NullReceipt => Ok(None),
			_ => Ok(Some(TransactionReceipt {
				hash: *hash,
				block_number: 1,
				success: true,
			})),
		}
	}
}

/// Bridging-service double answering per destination network.
///
/// Destinations without a scripted answer get HTTP 404.
pub(crate) struct FakeBridge {
	answers: HashMap<String, Result<Value, (u16, String)>>,
	pub requests: Mutex<Vec<SwapRequest>>,
}

impl FakeBridge {
	pub fn new(answers: impl IntoIterator<Item = (&'static str, Result<Value, (u16, String)>)>) -> Arc<Self> {
		Arc::new(Self {
			answers: answers
				.into_iter()
				.map(|(network, answer)| (network.to_string(), answer))
				.collect(),
			requests: Mutex::new(Vec::new()),
		})
	}
}

#[async_trait]
impl QuoteInterface for FakeBridge {
	async fn request_quote(&self, request: &SwapRequest) -> Result<SwapQuote, QuoteError> {
		self.requests.lock().unwrap().push(request.clone());
		match self.answers.get(&request.destination_network) {
			Some(Ok(body)) => Ok(SwapQuote(body.clone())),
			Some(Err((status, body))) => Err(QuoteError::Http {
				status: *status,
				body: body.clone(),
			}),
			None => Err(QuoteError::Http {
				status: 404,
				body: "unknown network".into(),
			}),
		}
	}
}
