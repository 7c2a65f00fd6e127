//! Bridge-and-deposit sweep.
//!
//! For every chain carrying the configured native token, the sweep estimates
//! a fee, asks the bridging service for a swap of that amount from the
//! source chain, and sends the quoted deposit on the source chain. Targets
//! are processed one at a time in descriptor order, and each one yields
//! exactly one [`DepositResult`].

use crate::fee::FeeEstimator;
use crate::log::RunLog;
use crate::state::{RunTracker, TargetTracker};
use crate::RunnerError;
use std::sync::Arc;
use sweeper_config::SwapConfig;
use sweeper_delivery::DeliveryService;
use sweeper_quote::QuoteInterface;
use sweeper_storage::StorageService;
use sweeper_types::{
	Address, ChainDescriptor, ChainRegistry, DepositResult, RunSummary, StorageKey, SwapRequest,
	SwapRoute, TargetStatus,
};
use tracing::instrument;

/// Skip reason recorded when a quote carries no usable deposit action.
pub const NO_DEPOSIT_ACTION: &str = "no deposit action found";
/// Skip reason recorded for the source chain itself.
pub const SOURCE_CHAIN: &str = "source chain";

/// Sequential swap sweep over the chains of one native token.
pub struct SwapSweep {
	registry: Arc<ChainRegistry>,
	route: SwapRoute,
	token_symbol: String,
	fees: FeeEstimator,
	quotes: Arc<dyn QuoteInterface>,
	delivery: Arc<DeliveryService>,
	storage: Arc<StorageService>,
}

impl SwapSweep {
	pub fn new(
		config: &SwapConfig,
		registry: Arc<ChainRegistry>,
		fees: FeeEstimator,
		quotes: Arc<dyn QuoteInterface>,
		delivery: Arc<DeliveryService>,
		storage: Arc<StorageService>,
	) -> Self {
		Self {
			registry,
			route: config.route(),
			token_symbol: config.token_symbol.clone(),
			fees,
			quotes,
			delivery,
			storage,
		}
	}

	/// Runs the sweep.
	///
	/// Returns an error without logging anything when no chain carries the
	/// token or the source chain is unknown. Once targets are being
	/// processed the log is flushed one last time even if the loop fails.
	pub async fn run(&self) -> Result<RunSummary, RunnerError> {
		let targets = self.registry.with_token_symbol(&self.token_symbol);
		if targets.is_empty() {
			return Err(RunnerError::NoTargets(format!(
				"no networks with token_symbol '{}'",
				self.token_symbol
			)));
		}
		let source = self
			.registry
			.get(&self.route.source_network)
			.map_err(|e| RunnerError::Config(e.to_string()))?;

		tracing::info!(
			source = %source.name,
			chain_id = source.chain_id,
			token = %self.token_symbol,
			targets = targets.len(),
			"Starting swap sweep"
		);

		let mut run = RunTracker::new();
		run.start()?;
		let mut log = RunLog::new(self.storage.clone(), StorageKey::SwapLog)
			.with_success_list(StorageKey::SwappedChains);
		let mut summary = RunSummary::default();

		let outcome = self.sweep(&targets, &mut log, &mut summary).await;
		let flushed = log.flush().await;
		if let Err(e) = &outcome {
			tracing::error!(error = %e, records = log.len(), "Swap sweep aborted, log flushed");
		}
		outcome?;
		flushed?;
		run.finish()?;

		tracing::info!(
			completed = summary.completed,
			skipped = summary.skipped,
			failed = summary.failed,
			swapped = ?log.successes(),
			"Swap sweep finished"
		);
		Ok(summary)
	}

	async fn sweep(
		&self,
		targets: &[ChainDescriptor],
		log: &mut RunLog<DepositResult>,
		summary: &mut RunSummary,
	) -> Result<(), RunnerError> {
		for chain in targets {
			let mut target = TargetTracker::new(&chain.name);
			target.transition(TargetStatus::InProgress)?;

			let record = self.process_target(chain).await;
			target.transition(record.status)?;
			summary.record(record.status);

			if record.status == TargetStatus::Completed {
				log.append_success(record, &chain.name).await?;
			} else {
				log.append(record).await?;
			}
		}
		Ok(())
	}

	#[instrument(skip_all, fields(network = %chain.name))]
	async fn process_target(&self, chain: &ChainDescriptor) -> DepositResult {
		if chain.name == self.route.source_network {
			tracing::info!("Skipping source chain");
			return DepositResult::skipped(chain, None, None, SOURCE_CHAIN);
		}

		tracing::info!(chain_id = chain.chain_id, "Starting swap");
		let fee = self.fees.estimate(chain).await;
		tracing::info!(fee = %fee.formatted, source = ?fee.source, "Estimated fee in native tokens");

		let request = SwapRequest::new(&self.route, &chain.name, &fee.formatted);
		let quote = match self.quotes.request_quote(&request).await {
			Ok(quote) => quote,
			Err(e) => {
				tracing::warn!(error = %e, "Swap request failed, skipping");
				return DepositResult::skipped(
					chain,
					Some(fee),
					None,
					format!("quote request failed: {}", e),
				);
			},
		};

		let action = match quote.first_deposit_action() {
			Ok(Some(action)) => action,
			Ok(None) => {
				tracing::warn!("No deposit action found in swap response, skipping deposit");
				return DepositResult::skipped(chain, Some(fee), Some(quote), NO_DEPOSIT_ACTION);
			},
			Err(e) => {
				let error = format!("invalid deposit action: {}", e);
				tracing::error!(error = %error, "Unusable deposit action");
				return DepositResult::failed(chain, fee, quote, error);
			},
		};

		let to = match action.to_address.parse::<Address>() {
			Ok(to) => to,
			Err(e) => {
				let error = format!("invalid deposit address '{}': {}", action.to_address, e);
				tracing::error!(error = %error, "Unusable deposit action");
				return DepositResult::failed(chain, fee, quote, error);
			},
		};
		let amount = match action.amount() {
			Ok(amount) => amount,
			Err(e) => {
				let error = format!("invalid deposit amount: {}", e);
				tracing::error!(error = %error, "Unusable deposit action");
				return DepositResult::failed(chain, fee, quote, error);
			},
		};

		tracing::info!(
			deposit_address = %to,
			amount_in_base_units = %amount,
			source = %self.route.source_network,
			"Sending deposit"
		);
		match self
			.delivery
			.deposit(&self.route.source_network, to, amount)
			.await
		{
			Ok(hash) => {
				tracing::info!(tx_hash = %hash, "Swap deposit completed");
				DepositResult::completed(chain, fee, quote, hash.to_string())
			},
			Err(e) => {
				tracing::error!(error = %e, "Deposit failed");
				DepositResult::failed(chain, fee, quote, e.to_string())
			},
		}
	}
}
