//! Utility functions for amounts and their serialization.

pub mod formatting;

pub use formatting::{format_token_amount, parse_base_units, parse_token_amount, AmountError};

/// Serde adapter writing `U256` as a base-10 string.
pub mod u256_decimal {
	use alloy_primitives::U256;
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		super::parse_base_units(&s).map_err(serde::de::Error::custom)
	}
}
