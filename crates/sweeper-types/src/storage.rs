//! Storage keys for persisted run artifacts.

/// Keys of the durable artifacts written by the sweeps.
///
/// Each key is overwritten in full on every flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Ordered `DepositResult` list of the swap sweep.
	SwapLog,
	/// Names of networks whose deposit was confirmed.
	SwappedChains,
	/// Ordered `ProcessRunResult` list of the deploy sweep.
	DeployLog,
}

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::SwapLog => "all-swap-tx-log",
			StorageKey::SwappedChains => "swapped-chains",
			StorageKey::DeployLog => "deploy-log",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Self::SwapLog, Self::SwappedChains, Self::DeployLog].into_iter()
	}
}
