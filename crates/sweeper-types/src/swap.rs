//! Bridging request, quote and deposit result types.
//!
//! The bridging service speaks snake_case JSON. Quotes are kept opaque so
//! that the run log records exactly what the service returned; only the
//! first `data.deposit_actions[]` entry is ever interpreted.

use crate::delivery::FeeEstimate;
use crate::networks::ChainDescriptor;
use crate::run::TargetStatus;
use crate::utils::{parse_base_units, AmountError};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Fixed part of every swap request in one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
	pub destination_address: String,
	pub source_network: String,
	pub source_token: String,
	pub destination_token: String,
	pub refuel: bool,
}

/// Body of a bridging-service swap request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
	pub destination_address: String,
	pub reference_id: Option<String>,
	pub source_network: String,
	pub source_token: String,
	pub destination_network: String,
	pub destination_token: String,
	pub refuel: bool,
	pub use_deposit_address: bool,
	pub use_new_deposit_address: Option<bool>,
	pub amount: String,
	pub source_address: Option<String>,
	pub slippage: Option<String>,
}

impl SwapRequest {
	/// Builds the request moving `amount` (a decimal string) from the
	/// route's source network to `destination_network`.
	pub fn new(route: &SwapRoute, destination_network: &str, amount: &str) -> Self {
		Self {
			destination_address: route.destination_address.clone(),
			reference_id: None,
			source_network: route.source_network.clone(),
			source_token: route.source_token.clone(),
			destination_network: destination_network.to_string(),
			destination_token: route.destination_token.clone(),
			refuel: route.refuel,
			use_deposit_address: false,
			use_new_deposit_address: None,
			amount: amount.to_string(),
			source_address: None,
			slippage: None,
		}
	}
}

/// Amount field of a deposit action; the service sends either form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BaseUnits {
	Integer(serde_json::Number),
	Text(String),
}

/// Where and how much native currency to send to trigger the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositAction {
	pub to_address: String,
	pub amount_in_base_units: BaseUnits,
}

impl DepositAction {
	pub fn amount(&self) -> Result<U256, AmountError> {
		match &self.amount_in_base_units {
			BaseUnits::Integer(n) => integer_units(n),
			BaseUnits::Text(s) => parse_base_units(s),
		}
	}
}

/// JSON integers above `u64::MAX` are decoded as `f64`; the integral value
/// of that float is taken as is.
fn integer_units(n: &serde_json::Number) -> Result<U256, AmountError> {
	if let Some(n) = n.as_u64() {
		return Ok(U256::from(n));
	}
	match n.as_f64() {
		Some(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => {
			parse_base_units(&format!("{:.0}", f))
		},
		_ => Err(AmountError::Invalid(n.to_string())),
	}
}

/// Raw bridging-service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapQuote(pub serde_json::Value);

impl SwapQuote {
	/// Returns the first deposit action.
	///
	/// `Ok(None)` when the response has no `data.deposit_actions[0]`; an
	/// entry that is present but does not decode is an error.
	pub fn first_deposit_action(&self) -> Result<Option<DepositAction>, serde_json::Error> {
		let first = self
			.0
			.get("data")
			.and_then(|data| data.get("deposit_actions"))
			.and_then(|actions| actions.get(0));
		match first {
			Some(first) => serde_json::from_value(first.clone()).map(Some),
			None => Ok(None),
		}
	}
}

/// Deposit transaction outcome as it appears in the run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepositTx {
	/// Hash of the mined deposit.
	Hash(String),
	/// Synthetic marker for a deposit that was not confirmed.
	Error { error: String },
}

/// One swap-sweep record per attempted target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositResult {
	pub network: String,
	pub chain_id: String,
	pub status: TargetStatus,
	pub fee: Option<FeeEstimate>,
	pub quote: Option<SwapQuote>,
	pub tx_hash: Option<DepositTx>,
	pub reason: Option<String>,
}

impl DepositResult {
	fn base(chain: &ChainDescriptor, status: TargetStatus) -> Self {
		Self {
			network: chain.name.clone(),
			chain_id: chain.chain_id.to_string(),
			status,
			fee: None,
			quote: None,
			tx_hash: None,
			reason: None,
		}
	}

	pub fn completed(
		chain: &ChainDescriptor,
		fee: FeeEstimate,
		quote: SwapQuote,
		tx_hash: String,
	) -> Self {
		Self {
			fee: Some(fee),
			quote: Some(quote),
			tx_hash: Some(DepositTx::Hash(tx_hash)),
			..Self::base(chain, TargetStatus::Completed)
		}
	}

	pub fn skipped(
		chain: &ChainDescriptor,
		fee: Option<FeeEstimate>,
		quote: Option<SwapQuote>,
		reason: impl Into<String>,
	) -> Self {
		Self {
			fee,
			quote,
			reason: Some(reason.into()),
			..Self::base(chain, TargetStatus::Skipped)
		}
	}

	pub fn failed(
		chain: &ChainDescriptor,
		fee: FeeEstimate,
		quote: SwapQuote,
		error: impl Into<String>,
	) -> Self {
		let error = error.into();
		Self {
			fee: Some(fee),
			quote: Some(quote),
			tx_hash: Some(DepositTx::Error {
				error: format!("ERROR: {}", error),
			}),
			reason: Some(error),
			..Self::base(chain, TargetStatus::Failed)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn route() -> SwapRoute {
		SwapRoute {
			destination_address: "0x000000000000000000000000000000000000dEaD".into(),
			source_network: "ARBITRUM_MAINNET".into(),
			source_token: "ETH".into(),
			destination_token: "ETH".into(),
			refuel: false,
		}
	}

	#[test]
	fn test_swap_request_wire_shape() {
		let request = SwapRequest::new(&route(), "BASE_MAINNET", "0.0012");
		let body = serde_json::to_value(&request).unwrap();
		assert_eq!(
			body,
			json!({
				"destination_address": "0x000000000000000000000000000000000000dEaD",
				"reference_id": null,
				"source_network": "ARBITRUM_MAINNET",
				"source_token": "ETH",
				"destination_network": "BASE_MAINNET",
				"destination_token": "ETH",
				"refuel": false,
				"use_deposit_address": false,
				"use_new_deposit_address": null,
				"amount": "0.0012",
				"source_address": null,
				"slippage": null
			})
		);
	}

	#[test]
	fn test_first_deposit_action_accepts_both_amount_forms() {
		let text = SwapQuote(json!({
			"data": { "deposit_actions": [
				{ "to_address": "0xabc", "amount_in_base_units": "1000000000000000000000" },
				{ "to_address": "0xdef", "amount_in_base_units": "1" }
			]}
		}));
		let action = text.first_deposit_action().unwrap().unwrap();
		assert_eq!(action.to_address, "0xabc");
		assert_eq!(
			action.amount().unwrap(),
			U256::from(1_000_000_000_000_000_000_000u128)
		);

		let integer = SwapQuote(json!({
			"data": { "deposit_actions": [{ "to_address": "0xabc", "amount_in_base_units": 42 }] }
		}));
		assert_eq!(
			integer.first_deposit_action().unwrap().unwrap().amount().unwrap(),
			U256::from(42u64)
		);
	}

	#[test]
	fn test_integer_amount_above_u64_is_kept() {
		let quote: SwapQuote = serde_json::from_str(
			r#"{"data":{"deposit_actions":[{"to_address":"0xabc","amount_in_base_units":20000000000000000000}]}}"#,
		)
		.unwrap();
		let action = quote.first_deposit_action().unwrap().unwrap();
		assert_eq!(
			action.amount().unwrap(),
			U256::from(20_000_000_000_000_000_000u128)
		);
	}

	#[test]
	fn test_non_integral_amount_is_rejected() {
		for amount in [json!(1.5), json!(-3), json!("12abc"), json!("")] {
			let quote = SwapQuote(json!({
				"data": { "deposit_actions": [{ "to_address": "0xabc", "amount_in_base_units": amount }] }
			}));
			let action = quote.first_deposit_action().unwrap().unwrap();
			assert!(action.amount().is_err(), "{:?}", action.amount_in_base_units);
		}
	}

	#[test]
	fn test_missing_deposit_actions_yield_none() {
		for quote in [
			json!({ "data": { "deposit_actions": [] } }),
			json!({ "data": {} }),
			json!({ "error": "nope" }),
			json!([1, 2, 3]),
			json!("<html>Bad Gateway</html>"),
		] {
			assert!(SwapQuote(quote).first_deposit_action().unwrap().is_none());
		}
	}

	#[test]
	fn test_malformed_deposit_action_is_an_error() {
		for quote in [
			json!({ "data": { "deposit_actions": [{ "amount_in_base_units": "1" }] } }),
			json!({ "data": { "deposit_actions": [{ "to_address": "0xabc" }] } }),
			json!({ "data": { "deposit_actions": [{ "to_address": "0xabc", "amount_in_base_units": true }] } }),
			json!({ "data": { "deposit_actions": [null] } }),
		] {
			assert!(SwapQuote(quote).first_deposit_action().is_err());
		}
	}

	#[test]
	fn test_failed_record_carries_error_tag() {
		let chain = ChainDescriptor {
			name: "BASE_MAINNET".into(),
			chain_id: 8453,
			node_url: "https://base.example".into(),
			token_symbol: Some("ETH".into()),
			decimals: 18,
		};
		let fee = FeeEstimate {
			amount: U256::from(1u64),
			formatted: "0.000000000000000001".into(),
			source: crate::FeeSource::Fallback,
		};
		let record = DepositResult::failed(&chain, fee, SwapQuote(json!({})), "receipt was null");
		let json = serde_json::to_value(&record).unwrap();
		assert_eq!(json["chainId"], "8453");
		assert_eq!(json["status"], "failed");
		assert_eq!(json["txHash"]["error"], "ERROR: receipt was null");
	}
}
