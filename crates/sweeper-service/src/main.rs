//! Main entry point for the sweeper service.
//!
//! This binary runs one of the two multi-chain sweeps: `swap` funds every
//! chain of the configured native token through a bridging service, and
//! `deploy` runs the deployment command against each configured network.
//! Run logs are written through the configured storage backend.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sweeper_config::Config;
use sweeper_core::{
	ContractArtifact, DeploySweep, FeeEstimator, ReferenceOperation, SwapSweep,
};
use sweeper_delivery::implementations::evm::alloy::AlloyDelivery;
use sweeper_delivery::DeliveryService;
use sweeper_quote::HttpQuoteClient;
use sweeper_storage::{create_backend, StorageError, StorageService};
use sweeper_types::{ChainDescriptor, ChainRegistry, RunSummary};

/// Command-line arguments for the sweeper service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
	/// Bridge native currency to every chain of the configured token
	Swap,
	/// Deploy the configured module to every configured network
	Deploy,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!(config = %args.config.display(), command = ?args.command, "Loaded configuration");

	let summary = run(&config, args.command).await?;
	tracing::info!(
		completed = summary.completed,
		skipped = summary.skipped,
		failed = summary.failed,
		"Sweep complete"
	);
	Ok(())
}

async fn run(config: &Config, command: Command) -> Result<RunSummary, Box<dyn std::error::Error>> {
	let storage = build_storage(config)?;
	let summary = match command {
		Command::Swap => build_swap_sweep(config, storage).await?.run().await?,
		Command::Deploy => DeploySweep::new(config.require_deploy()?, storage)?.run().await?,
	};
	Ok(summary)
}

/// Creates the primary storage backend named in the config.
fn build_storage(config: &Config) -> Result<Arc<StorageService>, StorageError> {
	let primary = &config.storage.primary;
	let backend_config = config.storage.implementations.get(primary).ok_or_else(|| {
		StorageError::Configuration(format!("No configuration for storage '{}'", primary))
	})?;
	let backend = create_backend(primary, backend_config)?;
	tracing::info!(component = "storage", implementation = %primary, "Loaded");
	Ok(Arc::new(StorageService::new(backend)))
}

/// Loads the chain descriptor list.
async fn load_registry(config: &Config) -> Result<ChainRegistry, Box<dyn std::error::Error>> {
	let path = &config.networks.file;
	let json = tokio::fs::read_to_string(path)
		.await
		.map_err(|e| format!("Cannot read chain descriptors {}: {}", path.display(), e))?;
	let registry = ChainRegistry::from_json(&json)?;
	tracing::info!(networks = registry.len(), file = %path.display(), "Loaded chain descriptors");
	Ok(registry)
}

/// Wires the swap sweep from its config sections.
async fn build_swap_sweep(
	config: &Config,
	storage: Arc<StorageService>,
) -> Result<SwapSweep, Box<dyn std::error::Error>> {
	let (swap, account) = config.require_swap()?;
	let registry = Arc::new(load_registry(config).await?);

	let chains: Vec<ChainDescriptor> = registry.iter().cloned().collect();
	let backend = AlloyDelivery::new(
		&chains,
		&account.private_key,
		Duration::from_secs(config.delivery.poll_interval_seconds),
	)?;
	tracing::info!(component = "delivery", sender = %backend.sender(), "Loaded");
	let delivery = Arc::new(DeliveryService::new(
		Arc::new(backend),
		config.delivery.min_confirmations,
		Duration::from_secs(config.delivery.confirmation_timeout_seconds),
	));

	let operation = match &swap.artifact_path {
		Some(path) => {
			let artifact = ContractArtifact::from_file(path).await?;
			tracing::info!(
				contract = artifact.contract_name.as_deref().unwrap_or_default(),
				"Estimating fees for contract deployment"
			);
			ReferenceOperation::Deploy(artifact.init_code()?)
		},
		None => ReferenceOperation::Transfer,
	};
	let fees = FeeEstimator::new(delivery.clone(), operation, swap.amount.clone());

	let quotes = Arc::new(HttpQuoteClient::new(
		&swap.api_url,
		&swap.api_key,
		&swap.api_key_header,
		Duration::from_secs(swap.request_timeout_seconds),
	)?);
	tracing::info!(component = "quote", endpoint = %swap.api_url, "Loaded");

	Ok(SwapSweep::new(swap, registry, fees, quotes, delivery, storage))
}
