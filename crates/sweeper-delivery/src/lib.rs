//! Transaction delivery module for the sweeper system.
//!
//! This module reads gas and fee data from target chains and executes the
//! native-currency deposits of the swap sweep. Chains are addressed by their
//! descriptor name, the same key the sweeps iterate over.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use sweeper_types::{Address, Transaction, TransactionHash, TransactionReceipt, U256};
use thiserror::Error;
use tracing::instrument;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The transaction could not be signed or broadcast.
	#[error("Broadcast failed: {0}")]
	Broadcast(String),
	/// The transaction was not mined within the confirmation timeout.
	#[error("Timed out waiting for confirmation of {0}")]
	Timeout(String),
	/// The transaction was reported mined but no receipt could be read.
	#[error("Receipt for {0} was null")]
	NullReceipt(String),
	/// The transaction was mined but reverted.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// The delivery backend could not be built.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// Error that occurs when no provider is configured for a network.
	#[error("No provider available for network '{0}'")]
	NoProviderAvailable(String),
}

/// Trait defining the interface for chain access.
///
/// Implementations hold one connection per network and sign with a single
/// configured credential.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Estimates the gas units `tx` would consume on `network`.
	async fn estimate_gas(&self, network: &str, tx: &Transaction) -> Result<u64, DeliveryError>;

	/// Returns the current fee per gas unit on `network`, in smallest units.
	async fn get_fee_per_gas(&self, network: &str) -> Result<u128, DeliveryError>;

	/// Signs and broadcasts `tx` on `network`, returning its hash.
	async fn submit(&self, network: &str, tx: Transaction) -> Result<TransactionHash, DeliveryError>;

	/// Waits until `hash` has `confirmations` confirmations or `timeout`
	/// elapses.
	///
	/// Returns `Ok(None)` when the transaction was reported mined but the
	/// receipt read back as null.
	async fn wait_for_confirmation(
		&self,
		network: &str,
		hash: &TransactionHash,
		confirmations: u64,
		timeout: Duration,
	) -> Result<Option<TransactionReceipt>, DeliveryError>;
}

/// Service wrapping a delivery backend with the deposit-executor contract.
///
/// A deposit is one attempt: broadcast, then wait. Broadcast failures, a
/// confirmation timeout, a null receipt and a reverted receipt each surface
/// as a distinct [`DeliveryError`]; nothing is retried.
pub struct DeliveryService {
	backend: Arc<dyn DeliveryInterface>,
	/// Confirmations required before a deposit counts as mined.
	min_confirmations: u64,
	/// Upper bound on the confirmation wait.
	confirmation_timeout: Duration,
}

impl DeliveryService {
	pub fn new(
		backend: Arc<dyn DeliveryInterface>,
		min_confirmations: u64,
		confirmation_timeout: Duration,
	) -> Self {
		Self {
			backend,
			min_confirmations,
			confirmation_timeout,
		}
	}

	pub async fn estimate_gas(&self, network: &str, tx: &Transaction) -> Result<u64, DeliveryError> {
		self.backend.estimate_gas(network, tx).await
	}

	pub async fn fee_per_gas(&self, network: &str) -> Result<u128, DeliveryError> {
		self.backend.get_fee_per_gas(network).await
	}

	/// Transfers `amount` to `to` on `network` and waits for it to be mined.
	///
	/// Returns the hash of the mined transaction.
	#[instrument(skip_all, fields(network = %network, to = %to))]
	pub async fn deposit(
		&self,
		network: &str,
		to: Address,
		amount: U256,
	) -> Result<TransactionHash, DeliveryError> {
		let hash = self
			.backend
			.submit(network, Transaction::transfer(to, amount))
			.await?;
		tracing::info!(tx_hash = %hash, "Deposit broadcast, waiting for confirmation");

		let receipt = self
			.backend
			.wait_for_confirmation(
				network,
				&hash,
				self.min_confirmations,
				self.confirmation_timeout,
			)
			.await?;

		match receipt {
			None => Err(DeliveryError::NullReceipt(hash.to_string())),
			Some(receipt) if !receipt.success => Err(DeliveryError::TransactionFailed(format!(
				"{} reverted in block {}",
				hash, receipt.block_number
			))),
			Some(receipt) => {
				tracing::info!(
					tx_hash = %receipt.hash,
					block_number = receipt.block_number,
					"Deposit confirmed"
				);
				Ok(receipt.hash)
			},
		}
	}
}
