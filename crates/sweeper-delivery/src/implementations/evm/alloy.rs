//! Alloy-based EVM delivery implementation.
//!
//! One HTTP provider is built per chain descriptor, each carrying a wallet
//! bound to that chain's id. Fee reads use the EIP-1559 `max_fee_per_gas`
//! and fall back to the legacy gas price on chains without fee history.

use crate::{DeliveryError, DeliveryInterface};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::Address;
use alloy::providers::{
	DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
	WatchTxError,
};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use sweeper_types::{
	ChainDescriptor, SecretString, Transaction, TransactionHash, TransactionReceipt,
};

/// Alloy-based EVM delivery implementation.
///
/// Providers are keyed by descriptor name. Building them performs no I/O;
/// an unreachable endpoint only shows up on the first call.
pub struct AlloyDelivery {
	providers: HashMap<String, DynProvider>,
	/// Address of the configured signer, used as `from` in estimates.
	sender: Address,
}

impl AlloyDelivery {
	/// Creates providers for every chain in `chains`.
	pub fn new(
		chains: &[ChainDescriptor],
		private_key: &SecretString,
		poll_interval: Duration,
	) -> Result<Self, DeliveryError> {
		let signer: PrivateKeySigner = private_key
			.expose_secret()
			.trim()
			.parse()
			.map_err(|e| DeliveryError::Configuration(format!("Invalid private key: {}", e)))?;
		let sender = signer.address();

		let mut providers = HashMap::new();
		for chain in chains {
			let url: Url = chain.node_url.parse().map_err(|e| {
				DeliveryError::Configuration(format!(
					"Invalid RPC URL for network {}: {}",
					chain.name, e
				))
			})?;

			let wallet = EthereumWallet::from(signer.clone().with_chain_id(Some(chain.chain_id)));
			let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);
			provider.client().set_poll_interval(poll_interval);

			providers.insert(chain.name.clone(), provider.erased());
		}

		tracing::debug!(networks = providers.len(), sender = %sender, "Built chain providers");
		Ok(Self { providers, sender })
	}

	pub fn sender(&self) -> Address {
		self.sender
	}

	fn get_provider(&self, network: &str) -> Result<&DynProvider, DeliveryError> {
		self.providers
			.get(network)
			.ok_or_else(|| DeliveryError::NoProviderAvailable(network.to_string()))
	}
}

/// Converts a chain-agnostic transaction into an alloy request from `from`.
fn to_request(tx: &Transaction, from: Address) -> TransactionRequest {
	let request = TransactionRequest::default()
		.with_from(from)
		.with_value(tx.value)
		.with_input(tx.data.clone());
	match tx.to {
		Some(to) => request.with_to(to),
		None => request.into_create(),
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn estimate_gas(&self, network: &str, tx: &Transaction) -> Result<u64, DeliveryError> {
		let provider = self.get_provider(network)?;
		provider
			.estimate_gas(to_request(tx, self.sender))
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to estimate gas: {}", e)))
	}

	async fn get_fee_per_gas(&self, network: &str) -> Result<u128, DeliveryError> {
		let provider = self.get_provider(network)?;
		match provider.estimate_eip1559_fees().await {
			Ok(fees) => Ok(fees.max_fee_per_gas),
			Err(e) => {
				tracing::debug!(network = %network, error = %e, "EIP-1559 fees unavailable, using gas price");
				provider
					.get_gas_price()
					.await
					.map_err(|e| DeliveryError::Network(format!("Failed to get gas price: {}", e)))
			},
		}
	}

	async fn submit(&self, network: &str, tx: Transaction) -> Result<TransactionHash, DeliveryError> {
		let provider = self.get_provider(network)?;

		// The provider's wallet signs; nonce and fees are filled in.
		let pending = provider
			.send_transaction(to_request(&tx, self.sender))
			.await
			.map_err(|e| DeliveryError::Broadcast(e.to_string()))?;

		let hash = TransactionHash(*pending.tx_hash());
		tracing::info!(tx_hash = %hash, network = %network, "Submitted transaction");
		Ok(hash)
	}

	async fn wait_for_confirmation(
		&self,
		network: &str,
		hash: &TransactionHash,
		confirmations: u64,
		timeout: Duration,
	) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let provider = self.get_provider(network)?;

		tracing::info!(
			tx_hash = %hash,
			confirmations,
			timeout_secs = timeout.as_secs(),
			"Waiting for confirmation"
		);

		let watched = PendingTransactionBuilder::new(provider.root().clone(), hash.0)
			.with_required_confirmations(confirmations)
			.with_timeout(Some(timeout))
			.watch()
			.await;
		match watched {
			Ok(_) => {},
			Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
				return Err(DeliveryError::Timeout(hash.to_string()));
			},
			Err(e) => {
				return Err(DeliveryError::Network(format!(
					"Failed while watching {}: {}",
					hash, e
				)));
			},
		}

		let receipt = provider
			.get_transaction_receipt(hash.0)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: TransactionHash(receipt.transaction_hash),
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
		}))
	}
}
