//! Chain descriptor types for multi-chain sweeps.
//!
//! Descriptors are produced by an external network-metadata fetch step and
//! consumed read-only. The on-disk shape is a JSON list of objects with
//! `name`, `chain_id`, `node_url`, `token_symbol` and `decimals`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Decimal precision assumed when a descriptor declares none.
pub const DEFAULT_NATIVE_DECIMALS: u8 = 18;

/// Errors raised while building or querying a [`ChainRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
	/// The descriptor source could not be parsed.
	#[error("Invalid chain descriptor list: {0}")]
	Parse(String),
	/// Two descriptors share the same name.
	#[error("Duplicate chain name '{0}' in descriptor list")]
	Duplicate(String),
	/// A referenced chain name has no descriptor.
	#[error("Chain '{0}' not found in descriptor list")]
	NotFound(String),
}

/// Identity and economic metadata of one target chain.
///
/// # Fields
///
/// * `name` - Unique, case-sensitive key (e.g. "ARBITRUM_MAINNET")
/// * `chain_id` - EVM chain id
/// * `node_url` - HTTP(S) RPC endpoint
/// * `token_symbol` - Native token symbol, if known
/// * `decimals` - Native token precision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
	pub name: String,
	#[serde(alias = "chainId", deserialize_with = "deserialize_chain_id")]
	pub chain_id: u64,
	#[serde(alias = "nodeUrl")]
	pub node_url: String,
	#[serde(default, alias = "tokenSymbol")]
	pub token_symbol: Option<String>,
	#[serde(
		default = "default_decimals",
		deserialize_with = "deserialize_decimals"
	)]
	pub decimals: u8,
}

fn default_decimals() -> u8 {
	DEFAULT_NATIVE_DECIMALS
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
	Number(u64),
	Text(String),
}

impl NumberOrString {
	fn into_u64<E: serde::de::Error>(self, field: &str) -> Result<u64, E> {
		match self {
			Self::Number(n) => Ok(n),
			Self::Text(s) => s
				.trim()
				.parse::<u64>()
				.map_err(|e| E::custom(format!("Invalid {} '{}': {}", field, s, e))),
		}
	}
}

/// Accepts the chain id either as a JSON number or as a decimal string.
fn deserialize_chain_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	NumberOrString::deserialize(deserializer)?.into_u64("chain_id")
}

/// Accepts decimals as a number, a decimal string, or null.
fn deserialize_decimals<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<NumberOrString>::deserialize(deserializer)? {
		None => Ok(DEFAULT_NATIVE_DECIMALS),
		Some(value) => {
			let decimals = value.into_u64::<D::Error>("decimals")?;
			u8::try_from(decimals).map_err(|_| {
				serde::de::Error::custom(format!("decimals out of range: {}", decimals))
			})
		}
	}
}

/// Ordered, name-unique collection of chain descriptors.
///
/// Iteration order is the order of the source list; it is the order in
/// which sweeps attempt their targets.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
	chains: Vec<ChainDescriptor>,
}

impl ChainRegistry {
	/// Builds a registry, rejecting duplicate names.
	pub fn new(chains: Vec<ChainDescriptor>) -> Result<Self, RegistryError> {
		let mut seen = HashSet::new();
		for chain in &chains {
			if !seen.insert(chain.name.as_str()) {
				return Err(RegistryError::Duplicate(chain.name.clone()));
			}
		}
		Ok(Self { chains })
	}

	/// Parses a JSON descriptor list.
	pub fn from_json(json: &str) -> Result<Self, RegistryError> {
		let chains: Vec<ChainDescriptor> =
			serde_json::from_str(json).map_err(|e| RegistryError::Parse(e.to_string()))?;
		Self::new(chains)
	}

	/// Looks up a descriptor by exact name.
	pub fn get(&self, name: &str) -> Result<&ChainDescriptor, RegistryError> {
		self.chains
			.iter()
			.find(|chain| chain.name == name)
			.ok_or_else(|| RegistryError::NotFound(name.to_string()))
	}

	/// Returns the descriptors whose native token symbol equals `symbol`,
	/// preserving source order.
	pub fn with_token_symbol(&self, symbol: &str) -> Vec<ChainDescriptor> {
		self.chains
			.iter()
			.filter(|chain| chain.token_symbol.as_deref() == Some(symbol))
			.cloned()
			.collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
		self.chains.iter()
	}

	pub fn len(&self) -> usize {
		self.chains.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chains.is_empty()
	}
}
