//! External-process runner for the deploy sweep.
//!
//! Commands run through `sh -c` in their own process group. Two time bounds
//! apply: when the primary timeout fires the group receives SIGTERM, and if
//! the process is still alive after the grace period the group is sent
//! SIGKILL. Output is captured while the command runs, so whatever was
//! printed before a kill is kept.

use chrono::{SecondsFormat, Utc};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use sweeper_types::{DeployStatus, ProcessRunResult};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::instrument;

pub mod marker;

pub use marker::{AddressMarker, MARKER_PATTERN_VERSION};

/// How long output readers may keep draining after the process is gone.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that can occur while running an external command.
#[derive(Debug, Error)]
pub enum ProcessError {
	/// The command could not be started.
	#[error("Failed to spawn command: {0}")]
	Spawn(String),
	/// Waiting on the child failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The address marker could not be compiled.
	#[error("Invalid address marker: {0}")]
	InvalidMarker(String),
}

/// How a command run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
	/// The command exited on its own before the primary timeout.
	Exited(ExitStatus),
	/// The primary timeout fired and the command exited during the grace
	/// period.
	TimedOut,
	/// The grace period expired and the process group was killed.
	Killed,
}

impl Termination {
	/// Only a zero exit before the primary timeout counts as success.
	pub fn is_success(&self) -> bool {
		matches!(self, Termination::Exited(status) if status.success())
	}

	fn describe(&self, timeout: Duration, grace: Duration) -> String {
		match self {
			Termination::Exited(status) => match status.code() {
				Some(code) => format!("Command failed with exit code {}", code),
				None => format!("Command terminated by signal ({})", status),
			},
			Termination::TimedOut => {
				format!("Command timed out after {}s", timeout.as_secs_f64())
			},
			Termination::Killed => format!(
				"Command forcibly killed after {}s",
				(timeout + grace).as_secs_f64()
			),
		}
	}
}

/// Captured result of one command run.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
	pub termination: Termination,
	pub stdout: String,
	pub stderr: String,
}

/// Runs deployment commands with a primary timeout and a kill grace period.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
	timeout: Duration,
	grace: Duration,
	marker: AddressMarker,
}

impl ProcessRunner {
	pub fn new(marker: AddressMarker, timeout: Duration, grace: Duration) -> Self {
		Self {
			timeout,
			grace,
			marker,
		}
	}

	/// Runs `command` for `network` and builds its log record.
	///
	/// Never fails: a command that cannot even be spawned yields a `failed`
	/// record carrying the spawn error.
	#[instrument(skip_all, fields(network = %network))]
	pub async fn run(&self, network: &str, command: &str) -> ProcessRunResult {
		tracing::info!(command = %command, "Deploying");

		let (status, contract_address, output, error) = match self.execute(command).await {
			Ok(out) => {
				let contract_address = self.marker.extract(&out.stdout);
				let status = if out.termination.is_success() {
					DeployStatus::Success
				} else {
					DeployStatus::Failed
				};
				let error = if !out.stderr.is_empty() {
					Some(out.stderr)
				} else if status == DeployStatus::Failed {
					Some(out.termination.describe(self.timeout, self.grace))
				} else {
					None
				};
				(status, contract_address, out.stdout, error)
			},
			Err(e) => (DeployStatus::Failed, None, String::new(), Some(e.to_string())),
		};

		match (&status, &contract_address) {
			(DeployStatus::Success, Some(address)) => {
				tracing::info!(contract = %address, "Deployment succeeded")
			},
			(DeployStatus::Success, None) => tracing::warn!(
				marker = %self.marker.marker(),
				"Deployment succeeded but no contract address was found in the output"
			),
			(DeployStatus::Failed, _) => tracing::error!(
				error = error.as_deref().unwrap_or_default(),
				"Deployment failed or timed out"
			),
		}

		ProcessRunResult {
			network: network.to_string(),
			status,
			contract_address,
			output,
			error,
			timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
		}
	}

	/// Spawns `command` and waits for it under the dual time bound.
	pub async fn execute(&self, command: &str) -> Result<ProcessOutput, ProcessError> {
		let mut child = Command::new("sh")
			.arg("-c")
			.arg(command)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.process_group(0)
			.kill_on_drop(true)
			.spawn()
			.map_err(|e| ProcessError::Spawn(e.to_string()))?;

		// The child leads its own group, so its pid is the group id.
		let group = child.id().and_then(|id| i32::try_from(id).ok()).map(Pid::from_raw);

		let stdout_buf = Arc::new(Mutex::new(Vec::new()));
		let stderr_buf = Arc::new(Mutex::new(Vec::new()));
		let readers: Vec<JoinHandle<()>> = [
			child
				.stdout
				.take()
				.map(|pipe| tokio::spawn(capture(pipe, stdout_buf.clone()))),
			child
				.stderr
				.take()
				.map(|pipe| tokio::spawn(capture(pipe, stderr_buf.clone()))),
		]
		.into_iter()
		.flatten()
		.collect();

		let termination = match tokio::time::timeout(self.timeout, child.wait()).await {
			Ok(status) => Termination::Exited(status?),
			Err(_) => {
				tracing::warn!(
					timeout_secs = self.timeout.as_secs_f64(),
					"Primary timeout reached, terminating command"
				);
				signal_group(group, Signal::SIGTERM);

				match tokio::time::timeout(self.grace, child.wait()).await {
					Ok(status) => {
						status?;
						Termination::TimedOut
					},
					Err(_) => {
						tracing::error!(
							grace_secs = self.grace.as_secs_f64(),
							"Command ignored termination, killing process group"
						);
						signal_group(group, Signal::SIGKILL);
						if let Err(e) = child.kill().await {
							tracing::debug!(error = %e, "Child already reaped");
						}
						Termination::Killed
					},
				}
			},
		};

		for mut reader in readers {
			if tokio::time::timeout(READER_DRAIN_TIMEOUT, &mut reader)
				.await
				.is_err()
			{
				tracing::debug!("Output pipe still open after exit, killing leftover processes");
				signal_group(group, Signal::SIGKILL);
				reader.abort();
			}
		}

		let stdout = String::from_utf8_lossy(&stdout_buf.lock().await).into_owned();
		let stderr = String::from_utf8_lossy(&stderr_buf.lock().await).into_owned();

		Ok(ProcessOutput {
			termination,
			stdout,
			stderr,
		})
	}
}

/// Appends everything read from `pipe` into `buf` until EOF.
async fn capture<R>(mut pipe: R, buf: Arc<Mutex<Vec<u8>>>)
where
	R: AsyncRead + Unpin,
{
	let mut chunk = [0u8; 4096];
	loop {
		match pipe.read(&mut chunk).await {
			Ok(0) => break,
			Ok(n) => buf.lock().await.extend_from_slice(&chunk[..n]),
			Err(e) => {
				tracing::debug!(error = %e, "Output pipe read failed");
				break;
			},
		}
	}
}

fn signal_group(group: Option<Pid>, signal: Signal) {
	let Some(group) = group else {
		return;
	};
	if let Err(e) = killpg(group, signal) {
		tracing::debug!(signal = ?signal, error = %e, "Failed to signal process group");
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const ADDRESS: &str = "0xabc0000000000000000000000000000000000def";

	fn runner(timeout_ms: u64, grace_ms: u64) -> ProcessRunner {
		ProcessRunner::new(
			AddressMarker::new("ForwarderModule#Forwarder").unwrap(),
			Duration::from_millis(timeout_ms),
			Duration::from_millis(grace_ms),
		)
	}

	#[tokio::test]
	async fn test_success_with_marker() {
		let record = runner(5_000, 1_000)
			.run(
				"mainnet",
				&format!("echo 'ForwarderModule#Forwarder - {}'", ADDRESS),
			)
			.await;

		assert_eq!(record.network, "mainnet");
		assert_eq!(record.status, DeployStatus::Success);
		assert_eq!(record.contract_address.as_deref(), Some(ADDRESS));
		assert!(record.output.contains("ForwarderModule#Forwarder"));
		assert_eq!(record.error, None);
		assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
	}

	#[tokio::test]
	async fn test_success_without_address_is_still_success() {
		let record = runner(5_000, 1_000).run("mainnet", "echo deployed").await;
		assert_eq!(record.status, DeployStatus::Success);
		assert_eq!(record.contract_address, None);
	}

	#[tokio::test]
	async fn test_non_zero_exit_prefers_stderr() {
		let record = runner(5_000, 1_000)
			.run("mainnet", "echo progress; echo 'HH110: Invalid JSON-RPC response' >&2; exit 3")
			.await;
		assert_eq!(record.status, DeployStatus::Failed);
		assert_eq!(record.output, "progress\n");
		assert_eq!(record.error.as_deref(), Some("HH110: Invalid JSON-RPC response\n"));

		let silent = runner(5_000, 1_000).run("mainnet", "exit 7").await;
		assert_eq!(silent.status, DeployStatus::Failed);
		assert_eq!(silent.error.as_deref(), Some("Command failed with exit code 7"));
	}

	#[tokio::test]
	async fn test_primary_timeout_keeps_partial_output() {
		let out = runner(300, 2_000)
			.execute("echo partial; sleep 5")
			.await
			.unwrap();
		assert_eq!(out.termination, Termination::TimedOut);
		assert_eq!(out.stdout, "partial\n");

		let record = runner(300, 2_000).run("mainnet", "echo partial; sleep 5").await;
		assert_eq!(record.status, DeployStatus::Failed);
		assert_eq!(record.output, "partial\n");
		assert!(record.error.unwrap().contains("timed out"));
	}

	#[tokio::test]
	async fn test_grace_kill_when_termination_ignored() {
		let started = std::time::Instant::now();
		let out = runner(200, 300)
			.execute("trap '' TERM; echo stubborn; sleep 5")
			.await
			.unwrap();

		assert_eq!(out.termination, Termination::Killed);
		assert_eq!(out.stdout, "stubborn\n");
		assert!(started.elapsed() < Duration::from_secs(4));
	}

	#[tokio::test]
	async fn test_failed_record_matches_marker_on_partial_output() {
		let record = runner(5_000, 1_000)
			.run(
				"mainnet",
				&format!("echo 'ForwarderModule#Forwarder - {}'; exit 1", ADDRESS),
			)
			.await;
		assert_eq!(record.status, DeployStatus::Failed);
		assert_eq!(record.contract_address.as_deref(), Some(ADDRESS));
	}

	/// Whether `pid` is alive; a zombie awaiting reaping counts as gone.
	fn is_running(pid: &str) -> bool {
		std::fs::read_to_string(format!("/proc/{}/stat", pid))
			.map(|stat| {
				let state = stat.rsplit(')').next().unwrap_or_default().trim_start();
				!state.starts_with('Z')
			})
			.unwrap_or(false)
	}

	#[tokio::test]
	async fn test_background_process_holding_output_is_killed() {
		let started = std::time::Instant::now();
		let out = runner(10_000, 1_000)
			.execute("sleep 30 & echo $!; echo done")
			.await
			.unwrap();

		assert!(out.termination.is_success());
		assert!(started.elapsed() < Duration::from_secs(8));
		let mut lines = out.stdout.lines();
		let pid = lines.next().unwrap().to_string();
		assert_eq!(lines.next(), Some("done"));

		let deadline = std::time::Instant::now() + Duration::from_secs(2);
		while is_running(&pid) && std::time::Instant::now() < deadline {
			tokio::time::sleep(Duration::from_millis(50)).await;
		}
		assert!(!is_running(&pid), "background sleep {} outlived the run", pid);
	}
}
