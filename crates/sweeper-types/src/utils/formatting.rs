//! Token amount formatting and parsing.
//!
//! Converts between human-readable decimal strings ("0.0012") and integer
//! amounts in a chain's smallest unit, given the chain's decimals.

use alloy_primitives::U256;
use thiserror::Error;

/// Errors produced when parsing an amount string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
	#[error("Amount is empty")]
	Empty,
	#[error("Invalid amount '{0}'")]
	Invalid(String),
	#[error("Amount '{0}' does not fit in 256 bits")]
	Overflow(String),
}

/// Parses a base-10 integer amount already expressed in smallest units.
pub fn parse_base_units(amount: &str) -> Result<U256, AmountError> {
	let amount = amount.trim();
	if amount.is_empty() {
		return Err(AmountError::Empty);
	}
	if !amount.bytes().all(|b| b.is_ascii_digit()) {
		return Err(AmountError::Invalid(amount.to_string()));
	}
	U256::from_str_radix(amount, 10).map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Parses a decimal amount such as "0.0012" into smallest units.
///
/// Fraction digits beyond `decimals` are truncated.
pub fn parse_token_amount(amount: &str, decimals: u8) -> Result<U256, AmountError> {
	let amount = amount.trim();
	if amount.is_empty() {
		return Err(AmountError::Empty);
	}

	let (integer_part, fraction_part) = match amount.split_once('.') {
		Some((integer, fraction)) => (integer, fraction),
		None => (amount, ""),
	};
	if integer_part.is_empty() && fraction_part.is_empty() {
		return Err(AmountError::Invalid(amount.to_string()));
	}
	let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
	if !all_digits(integer_part) || !all_digits(fraction_part) {
		return Err(AmountError::Invalid(amount.to_string()));
	}

	let decimal_places = decimals as usize;
	let fraction: String = fraction_part.chars().take(decimal_places).collect();
	let digits = format!(
		"{}{:0<width$}",
		integer_part,
		fraction,
		width = decimal_places
	);
	let digits = digits.trim_start_matches('0');
	if digits.is_empty() {
		return Ok(U256::ZERO);
	}
	U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow(amount.to_string()))
}

/// Formats a smallest-unit amount with decimal places for display.
///
/// Trailing zeros of the fraction are dropped: 1.5 ETH renders as "1.5",
/// 2 ETH as "2".
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	let amount = amount.to_string();
	if decimals == 0 {
		return amount;
	}

	let decimal_places = decimals as usize;

	let (integer_part, decimal_part) = if amount.len() <= decimal_places {
		let decimal_str = format!("{:0>width$}", amount, width = decimal_places);
		("0".to_string(), decimal_str)
	} else {
		let split_pos = amount.len() - decimal_places;
		(
			amount[..split_pos].to_string(),
			amount[split_pos..].to_string(),
		)
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');

	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}
