//! Transaction and fee types for chain interactions.

use crate::utils::u256_decimal;
use alloy_primitives::{hex, Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain-agnostic transaction request.
///
/// `to == None` describes a contract creation with `data` as init code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
	pub to: Option<Address>,
	pub data: Vec<u8>,
	pub value: U256,
}

impl Transaction {
	/// A plain native-currency transfer.
	pub fn transfer(to: Address, value: U256) -> Self {
		Self {
			to: Some(to),
			data: Vec::new(),
			value,
		}
	}

	/// A contract creation carrying `init_code`.
	pub fn deployment(init_code: Vec<u8>) -> Self {
		Self {
			to: None,
			data: init_code,
			value: U256::ZERO,
		}
	}
}

/// Hash of a broadcast transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub B256);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(self.0))
	}
}

/// Receipt data kept once a transaction is mined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
	pub hash: TransactionHash,
	pub block_number: u64,
	pub success: bool,
}

/// Where a fee estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeSource {
	/// Gas estimate times fee-per-gas read from the chain, plus margin.
	Live,
	/// Configured amount parsed with the chain's decimals.
	Fallback,
}

/// Approximate native-currency cost of the reference operation on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
	/// Amount in the chain's smallest unit.
	#[serde(with = "u256_decimal")]
	pub amount: U256,
	/// `amount` rendered with the chain's decimals.
	pub formatted: String,
	pub source: FeeSource,
}
