//! Configuration module for the sweeper system.
//!
//! Configuration is a single TOML file. Values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, which is how secrets such as
//! the signing key and the bridging API key are supplied.
//!
//! The `[swap]` and `[deploy]` sections are optional; each sweep checks that
//! its own section is present before any target is attempted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use sweeper_types::{parse_token_amount, SecretString, SwapRoute, U256};
use thiserror::Error;

/// Placeholder replaced with the target network in deploy commands.
pub const NETWORK_PLACEHOLDER: &str = "{network}";
/// Placeholder replaced with the deployment module path in deploy commands.
pub const MODULE_PLACEHOLDER: &str = "{module}";

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Location of the chain descriptor list.
	pub networks: NetworksConfig,
	/// Backend used for the run logs.
	pub storage: StorageConfig,
	/// Transaction confirmation settings.
	#[serde(default)]
	pub delivery: DeliveryConfig,
	/// Signing credential for deposits on the source chain.
	pub account: Option<AccountConfig>,
	/// Bridge-and-deposit sweep settings.
	pub swap: Option<SwapConfig>,
	/// Multi-network deployment settings.
	pub deploy: Option<DeployConfig>,
}

/// Location of the chain descriptor JSON list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworksConfig {
	pub file: PathBuf,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for deposit confirmation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Confirmations required before a deposit counts as mined.
	#[serde(default = "default_confirmations")]
	pub min_confirmations: u64,
	/// Upper bound on the wait for a deposit to be mined.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
	/// RPC polling interval while waiting.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			min_confirmations: default_confirmations(),
			confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
			poll_interval_seconds: default_poll_interval_seconds(),
		}
	}
}

fn default_confirmations() -> u64 {
	1
}

fn default_confirmation_timeout_seconds() -> u64 {
	300
}

fn default_poll_interval_seconds() -> u64 {
	7
}

/// Signing credential.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub private_key: SecretString,
}

/// Configuration for the bridge-and-deposit sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwapConfig {
	/// Swap endpoint of the bridging service.
	pub api_url: String,
	pub api_key: SecretString,
	/// Header carrying the API key.
	#[serde(default = "default_api_key_header")]
	pub api_key_header: String,
	/// Recipient on every destination chain.
	pub destination_address: String,
	/// Human-readable fallback fee amount, in native units.
	pub amount: String,
	/// Chain the deposits are sent from; never swept itself.
	#[serde(default = "default_source_network")]
	pub source_network: String,
	/// Native token symbol selecting the target chains.
	#[serde(default = "default_token_symbol")]
	pub token_symbol: String,
	/// Defaults to `token_symbol`.
	pub source_token: Option<String>,
	/// Defaults to `token_symbol`.
	pub destination_token: Option<String>,
	#[serde(default)]
	pub refuel: bool,
	/// Transport timeout for bridging-service requests.
	#[serde(default = "default_request_timeout_seconds")]
	pub request_timeout_seconds: u64,
	/// Precompiled contract bundle whose deployment cost is estimated per
	/// chain. A plain transfer is estimated when unset.
	pub artifact_path: Option<PathBuf>,
}

fn default_api_key_header() -> String {
	"X-LS-APIKEY".to_string()
}

fn default_source_network() -> String {
	"ARBITRUM_MAINNET".to_string()
}

fn default_token_symbol() -> String {
	"ETH".to_string()
}

fn default_request_timeout_seconds() -> u64 {
	30
}

impl SwapConfig {
	/// Fixed part of every swap request of the sweep.
	pub fn route(&self) -> SwapRoute {
		SwapRoute {
			destination_address: self.destination_address.clone(),
			source_network: self.source_network.clone(),
			source_token: self
				.source_token
				.clone()
				.unwrap_or_else(|| self.token_symbol.clone()),
			destination_token: self
				.destination_token
				.clone()
				.unwrap_or_else(|| self.token_symbol.clone()),
			refuel: self.refuel,
		}
	}
}

/// Configuration for the multi-network deployment sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeployConfig {
	/// Shell command template with `{network}` and `{module}` placeholders.
	#[serde(default = "default_deploy_command")]
	pub command: String,
	/// Deployment module passed to the command.
	pub module: String,
	/// Output token preceding the deployed address, e.g.
	/// `ForwarderModule#Forwarder`.
	pub marker: String,
	/// Target networks, attempted in order.
	pub networks: Vec<String>,
	/// Primary timeout after which the command is asked to terminate.
	#[serde(default = "default_deploy_timeout_seconds")]
	pub timeout_seconds: u64,
	/// Extra wait after the primary timeout before the process is killed.
	#[serde(default = "default_grace_seconds")]
	pub grace_seconds: u64,
}

fn default_deploy_command() -> String {
	"yes | npx hardhat ignition deploy {module} --network {network}".to_string()
}

fn default_deploy_timeout_seconds() -> u64 {
	300
}

fn default_grace_seconds() -> u64 {
	5
}

impl DeployConfig {
	/// Renders the command for one network.
	pub fn command_for(&self, network: &str) -> String {
		self.command
			.replace(MODULE_PLACEHOLDER, &self.module)
			.replace(NETWORK_PLACEHOLDER, network)
	}
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME`, or with the text
/// after `:-` in `${VAR_NAME:-default}` when the variable is unset.
/// Input is limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing: Option<String> = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let name = &caps[1];
		match (std::env::var(name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(name) => Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			name
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Returns the swap settings and signing credential, or a validation
	/// error naming the missing section.
	pub fn require_swap(&self) -> Result<(&SwapConfig, &AccountConfig), ConfigError> {
		let swap = self
			.swap
			.as_ref()
			.ok_or_else(|| ConfigError::Validation("Missing [swap] section".into()))?;
		let account = self
			.account
			.as_ref()
			.ok_or_else(|| ConfigError::Validation("Missing [account] section".into()))?;
		Ok((swap, account))
	}

	/// Returns the deploy settings, or a validation error.
	pub fn require_deploy(&self) -> Result<&DeployConfig, ConfigError> {
		self.deploy
			.as_ref()
			.ok_or_else(|| ConfigError::Validation("Missing [deploy] section".into()))
	}

	/// Validates every section that is present.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.networks.file.as_os_str().is_empty() {
			return Err(ConfigError::Validation(
				"networks.file cannot be empty".into(),
			));
		}

		if self.storage.primary.is_empty() {
			return Err(ConfigError::Validation(
				"Storage primary implementation cannot be empty".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}

		if self.delivery.min_confirmations == 0 {
			return Err(ConfigError::Validation(
				"min_confirmations must be at least 1".into(),
			));
		}
		if self.delivery.min_confirmations > 100 {
			return Err(ConfigError::Validation(
				"min_confirmations cannot exceed 100".into(),
			));
		}
		if self.delivery.confirmation_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"confirmation_timeout_seconds must be greater than 0".into(),
			));
		}
		if self.delivery.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}

		if let Some(account) = &self.account {
			if account.private_key.is_empty() {
				return Err(ConfigError::Validation(
					"account.private_key cannot be empty".into(),
				));
			}
		}
		if let Some(swap) = &self.swap {
			Self::validate_swap(swap)?;
		}
		if let Some(deploy) = &self.deploy {
			Self::validate_deploy(deploy)?;
		}

		Ok(())
	}

	fn validate_swap(swap: &SwapConfig) -> Result<(), ConfigError> {
		if !(swap.api_url.starts_with("http://") || swap.api_url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"swap.api_url must be an http(s) URL, got '{}'",
				swap.api_url
			)));
		}
		if swap.api_key.is_empty() {
			return Err(ConfigError::Validation("swap.api_key cannot be empty".into()));
		}
		if swap.api_key_header.trim().is_empty() {
			return Err(ConfigError::Validation(
				"swap.api_key_header cannot be empty".into(),
			));
		}
		if swap.destination_address.trim().is_empty() {
			return Err(ConfigError::Validation(
				"swap.destination_address cannot be empty".into(),
			));
		}
		match parse_token_amount(&swap.amount, 18) {
			Ok(amount) if amount > U256::ZERO => {},
			Ok(_) => {
				return Err(ConfigError::Validation(
					"swap.amount must be greater than 0".into(),
				))
			},
			Err(e) => {
				return Err(ConfigError::Validation(format!("swap.amount: {}", e)));
			},
		}
		if swap.source_network.is_empty() {
			return Err(ConfigError::Validation(
				"swap.source_network cannot be empty".into(),
			));
		}
		if swap.token_symbol.is_empty() {
			return Err(ConfigError::Validation(
				"swap.token_symbol cannot be empty".into(),
			));
		}
		if swap.request_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"swap.request_timeout_seconds must be greater than 0".into(),
			));
		}
		Ok(())
	}

	fn validate_deploy(deploy: &DeployConfig) -> Result<(), ConfigError> {
		if !deploy.command.contains(NETWORK_PLACEHOLDER) {
			return Err(ConfigError::Validation(format!(
				"deploy.command must contain the {} placeholder",
				NETWORK_PLACEHOLDER
			)));
		}
		if deploy.marker.trim().is_empty() {
			return Err(ConfigError::Validation(
				"deploy.marker cannot be empty".into(),
			));
		}
		if deploy.networks.is_empty() {
			return Err(ConfigError::Validation(
				"deploy.networks must list at least one network".into(),
			));
		}
		let mut seen = HashSet::new();
		for network in &deploy.networks {
			if network.trim().is_empty() {
				return Err(ConfigError::Validation(
					"deploy.networks contains an empty name".into(),
				));
			}
			if !seen.insert(network.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate network '{}' in deploy.networks",
					network
				)));
			}
		}
		if deploy.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"deploy.timeout_seconds must be greater than 0".into(),
			));
		}
		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating
/// the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[networks]
file = "networks-simple.json"

[storage]
primary = "file"
[storage.implementations.file]
storage_path = "./logs"
"#;

	const SWAP: &str = r#"
[account]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"

[swap]
api_url = "https://bridge.example/api/v2/swaps"
api_key = "secret"
destination_address = "0x000000000000000000000000000000000000dEaD"
amount = "0.001"
"#;

	const DEPLOY: &str = r#"
[deploy]
module = "./ignition/modules/forwarder/deployForwarder.js"
marker = "ForwarderModule#Forwarder"
networks = ["ETHEREUM_MAINNET", "BASE_MAINNET"]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("SWEEPER_TEST_HOST", "localhost");
		std::env::set_var("SWEEPER_TEST_PORT", "8545");

		let input = "url = \"http://${SWEEPER_TEST_HOST}:${SWEEPER_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:8545\"");

		std::env::remove_var("SWEEPER_TEST_HOST");
		std::env::remove_var("SWEEPER_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${SWEEPER_MISSING_VAR:-fallback}\"";
		assert_eq!(resolve_env_vars(input).unwrap(), "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "a = \"${SWEEPER_MISSING_A}\"\nb = \"${SWEEPER_MISSING_B}\"";
		let err = resolve_env_vars(input).unwrap_err();
		assert!(err.to_string().contains("SWEEPER_MISSING_A"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = format!("{}{}{}", BASE, SWAP, DEPLOY).parse().unwrap();
		assert_eq!(config.delivery.min_confirmations, 1);
		assert_eq!(config.delivery.confirmation_timeout_seconds, 300);

		let (swap, account) = config.require_swap().unwrap();
		assert_eq!(swap.api_key_header, "X-LS-APIKEY");
		assert_eq!(swap.source_network, "ARBITRUM_MAINNET");
		assert_eq!(swap.request_timeout_seconds, 30);
		assert!(!account.private_key.is_empty());

		let route = swap.route();
		assert_eq!(route.source_token, "ETH");
		assert_eq!(route.destination_token, "ETH");

		let deploy = config.require_deploy().unwrap();
		assert_eq!(deploy.timeout_seconds, 300);
		assert_eq!(deploy.grace_seconds, 5);
		assert_eq!(
			deploy.command_for("ETHEREUM_MAINNET"),
			"yes | npx hardhat ignition deploy ./ignition/modules/forwarder/deployForwarder.js --network ETHEREUM_MAINNET"
		);
	}

	#[test]
	fn test_missing_sections_reported() {
		let config: Config = BASE.parse().unwrap();
		assert!(config
			.require_swap()
			.unwrap_err()
			.to_string()
			.contains("[swap]"));
		assert!(config
			.require_deploy()
			.unwrap_err()
			.to_string()
			.contains("[deploy]"));
	}

	#[test]
	fn test_unknown_primary_storage_rejected() {
		let config_str = BASE.replace("primary = \"file\"", "primary = \"redis\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary storage 'redis' not found"));
	}

	#[test]
	fn test_invalid_swap_amount_rejected() {
		for (amount, expected) in [
			("0", "greater than 0"),
			("abc", "Invalid amount"),
			("", "empty"),
		] {
			let swap = SWAP.replace("amount = \"0.001\"", &format!("amount = \"{}\"", amount));
			let err = Config::from_str(&format!("{}{}", BASE, swap)).unwrap_err();
			assert!(
				err.to_string().contains(expected),
				"amount {:?}: unexpected error {}",
				amount,
				err
			);
		}
	}

	#[test]
	fn test_duplicate_deploy_network_rejected() {
		let deploy = DEPLOY.replace("\"BASE_MAINNET\"", "\"ETHEREUM_MAINNET\"");
		let err = Config::from_str(&format!("{}{}", BASE, deploy)).unwrap_err();
		assert!(err
			.to_string()
			.contains("Duplicate network 'ETHEREUM_MAINNET'"));
	}

	#[test]
	fn test_deploy_command_requires_network_placeholder() {
		let deploy = format!("{}command = \"npx hardhat ignition deploy {{module}}\"\n", DEPLOY);
		let err = Config::from_str(&format!("{}{}", BASE, deploy)).unwrap_err();
		assert!(err.to_string().contains("{network}"));
	}

	#[tokio::test]
	async fn test_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, format!("{}{}", BASE, DEPLOY)).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.networks.file, PathBuf::from("networks-simple.json"));
		assert_eq!(config.require_deploy().unwrap().networks.len(), 2);

		let missing = Config::from_file(dir.path().join("nope.toml")).await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}
