//! Per-chain fee estimation.
//!
//! A live estimate is gas units times fee-per-gas for the reference
//! operation, plus a 20% margin. Any failure on the way falls back to the
//! configured amount parsed with the chain's decimals, so estimation itself
//! never fails.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use sweeper_delivery::{DeliveryError, DeliveryService};
use sweeper_types::{
	format_token_amount, parse_token_amount, ChainDescriptor, FeeEstimate, FeeSource, Transaction,
};

/// Operation whose cost is estimated on every target chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceOperation {
	/// A zero-value native transfer.
	Transfer,
	/// Creation of a contract from the given init code.
	Deploy(Vec<u8>),
}

impl ReferenceOperation {
	fn transaction(&self) -> Transaction {
		match self {
			ReferenceOperation::Transfer => Transaction::transfer(Address::ZERO, U256::ZERO),
			ReferenceOperation::Deploy(init_code) => Transaction::deployment(init_code.clone()),
		}
	}
}

/// `gas * price * 1.2`, rounded as `(gas * price * 12 + 9) / 10`.
pub fn apply_margin(gas: u64, fee_per_gas: u128) -> U256 {
	let cost = U256::from(gas).saturating_mul(U256::from(fee_per_gas));
	cost.saturating_mul(U256::from(12u8)).saturating_add(U256::from(9u8)) / U256::from(10u8)
}

/// Estimates the reference operation's cost on each chain.
pub struct FeeEstimator {
	delivery: Arc<DeliveryService>,
	operation: ReferenceOperation,
	/// Human-readable amount used when live estimation fails.
	fallback_amount: String,
}

impl FeeEstimator {
	pub fn new(
		delivery: Arc<DeliveryService>,
		operation: ReferenceOperation,
		fallback_amount: impl Into<String>,
	) -> Self {
		Self {
			delivery,
			operation,
			fallback_amount: fallback_amount.into(),
		}
	}

	/// Returns the live estimate for `chain`, or the fallback.
	pub async fn estimate(&self, chain: &ChainDescriptor) -> FeeEstimate {
		match self.estimate_live(chain).await {
			Ok(amount) => FeeEstimate {
				amount,
				formatted: format_token_amount(amount, chain.decimals),
				source: FeeSource::Live,
			},
			Err(e) => {
				tracing::warn!(
					network = %chain.name,
					error = %e,
					"Live fee estimate failed, using configured amount"
				);
				self.fallback(chain)
			},
		}
	}

	async fn estimate_live(&self, chain: &ChainDescriptor) -> Result<U256, DeliveryError> {
		let gas = self
			.delivery
			.estimate_gas(&chain.name, &self.operation.transaction())
			.await?;
		let fee_per_gas = self.delivery.fee_per_gas(&chain.name).await?;
		tracing::debug!(network = %chain.name, gas, fee_per_gas, "Live fee inputs");
		Ok(apply_margin(gas, fee_per_gas))
	}

	/// The configured amount in `chain`'s smallest unit.
	///
	/// An unparsable amount yields zero.
	pub fn fallback(&self, chain: &ChainDescriptor) -> FeeEstimate {
		let amount = match parse_token_amount(&self.fallback_amount, chain.decimals) {
			Ok(amount) => amount,
			Err(e) => {
				tracing::warn!(
					network = %chain.name,
					amount = %self.fallback_amount,
					error = %e,
					"Configured fallback amount is unusable, estimating zero"
				);
				U256::ZERO
			},
		};
		FeeEstimate {
			amount,
			formatted: format_token_amount(amount, chain.decimals),
			source: FeeSource::Fallback,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::{chain, FakeChain};
	use std::time::Duration;

	fn estimator(fake: Arc<FakeChain>, operation: ReferenceOperation, amount: &str) -> FeeEstimator {
		let delivery = Arc::new(DeliveryService::new(fake, 1, Duration::from_secs(1)));
		FeeEstimator::new(delivery, operation, amount)
	}

	#[test]
	fn test_margin_rounding() {
		assert_eq!(apply_margin(21_000, 1), U256::from(25_200u64));
		// 7 * 1.2 = 8.4 -> (84 + 9) / 10 = 9
		assert_eq!(apply_margin(7, 1), U256::from(9u64));
		assert_eq!(apply_margin(0, 1_000), U256::ZERO);
		assert_eq!(
			apply_margin(u64::MAX, u128::MAX),
			(U256::from(u64::MAX) * U256::from(u128::MAX) * U256::from(12u8) + U256::from(9u8))
				/ U256::from(10u8)
		);
	}

	#[tokio::test]
	async fn test_live_estimate() {
		let fake = Arc::new(
			FakeChain::new()
				.with_gas("BASE_MAINNET", 100_000)
				.with_fee_per_gas(1_000_000_000),
		);
		let fees = estimator(fake.clone(), ReferenceOperation::Deploy(vec![0x60, 0x80]), "0.001");

		let estimate = fees.estimate(&chain("BASE_MAINNET", 8453, 18)).await;
		assert_eq!(estimate.source, FeeSource::Live);
		assert_eq!(estimate.amount, U256::from(120_000_000_000_000u64));
		assert_eq!(estimate.formatted, "0.00012");

		let estimated = fake.estimated.lock().unwrap();
		assert_eq!(estimated.len(), 1);
		assert_eq!(estimated[0].1, Transaction::deployment(vec![0x60, 0x80]));
	}

	#[tokio::test]
	async fn test_fallback_is_deterministic() {
		let fees = estimator(Arc::new(FakeChain::new()), ReferenceOperation::Transfer, "0.0015");
		let polygon = chain("POLYGON_ZKEVM", 1101, 18);

		let first = fees.estimate(&polygon).await;
		let second = fees.estimate(&polygon).await;
		assert_eq!(first, second);
		assert_eq!(first.source, FeeSource::Fallback);
		assert_eq!(first.amount, U256::from(1_500_000_000_000_000u64));
		assert_eq!(first.formatted, "0.0015");

		let six_decimals = fees.estimate(&chain("SIX", 6, 6)).await;
		assert_eq!(six_decimals.amount, U256::from(1_500u64));
	}

	#[tokio::test]
	async fn test_unusable_fallback_amount_yields_zero() {
		let fees = estimator(Arc::new(FakeChain::new()), ReferenceOperation::Transfer, "lots");
		let estimate = fees.estimate(&chain("BASE_MAINNET", 8453, 18)).await;
		assert_eq!(estimate.source, FeeSource::Fallback);
		assert_eq!(estimate.amount, U256::ZERO);
		assert_eq!(estimate.formatted, "0");
	}
}
