//! Deploy-to-many-networks sweep.
//!
//! Runs the configured deployment command once per network, strictly in
//! order. A failed or timed-out network is recorded and the sweep moves on.

use crate::log::RunLog;
use crate::state::{RunTracker, TargetTracker};
use crate::RunnerError;
use std::sync::Arc;
use std::time::Duration;
use sweeper_config::DeployConfig;
use sweeper_process::{AddressMarker, ProcessRunner};
use sweeper_storage::StorageService;
use sweeper_types::{DeployStatus, ProcessRunResult, RunSummary, StorageKey, TargetStatus};

/// Sequential deployment over a fixed network list.
pub struct DeploySweep {
	config: DeployConfig,
	runner: ProcessRunner,
	storage: Arc<StorageService>,
}

impl DeploySweep {
	pub fn new(config: &DeployConfig, storage: Arc<StorageService>) -> Result<Self, RunnerError> {
		let marker =
			AddressMarker::new(&config.marker).map_err(|e| RunnerError::Config(e.to_string()))?;
		let runner = ProcessRunner::new(
			marker,
			Duration::from_secs(config.timeout_seconds),
			Duration::from_secs(config.grace_seconds),
		);
		Ok(Self {
			config: config.clone(),
			runner,
			storage,
		})
	}

	/// Deploys to every configured network and returns the tally.
	pub async fn run(&self) -> Result<RunSummary, RunnerError> {
		if self.config.networks.is_empty() {
			return Err(RunnerError::NoTargets("deploy network list is empty".into()));
		}
		tracing::info!(
			module = %self.config.module,
			networks = self.config.networks.len(),
			timeout_secs = self.config.timeout_seconds,
			grace_secs = self.config.grace_seconds,
			"Starting deploy sweep"
		);

		let mut run = RunTracker::new();
		run.start()?;
		let mut log = RunLog::new(self.storage.clone(), StorageKey::DeployLog);
		let mut summary = RunSummary::default();

		let outcome = self.sweep(&mut log, &mut summary).await;
		let flushed = log.flush().await;
		if let Err(e) = &outcome {
			tracing::error!(error = %e, records = log.len(), "Deploy sweep aborted, log flushed");
		}
		outcome?;
		flushed?;
		run.finish()?;

		tracing::info!(
			succeeded = summary.completed,
			failed = summary.failed,
			"Deploy sweep finished"
		);
		Ok(summary)
	}

	async fn sweep(
		&self,
		log: &mut RunLog<ProcessRunResult>,
		summary: &mut RunSummary,
	) -> Result<(), RunnerError> {
		for network in &self.config.networks {
			let mut target = TargetTracker::new(network);
			target.transition(TargetStatus::InProgress)?;

			let record = self
				.runner
				.run(network, &self.config.command_for(network))
				.await;
			let status = match record.status {
				DeployStatus::Success => TargetStatus::Completed,
				DeployStatus::Failed => TargetStatus::Failed,
			};
			target.transition(status)?;
			summary.record(status);
			log.append(record).await?;
		}
		Ok(())
	}
}
