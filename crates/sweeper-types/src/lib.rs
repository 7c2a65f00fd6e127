//! Common types module for the sweeper system.
//!
//! This module defines the data types shared by the swap sweep and the
//! deploy sweep: chain descriptors, fee estimates, bridging requests and
//! quotes, per-target result records and the run state machine states.

/// Deployment-path result records.
pub mod deploy;
/// Transaction and fee types for chain interactions.
pub mod delivery;
/// Chain descriptor types and the descriptor registry.
pub mod networks;
/// Run and per-target lifecycle states.
pub mod run;
/// Secure string type for credentials.
pub mod secret_string;
/// Storage keys for persisted run artifacts.
pub mod storage;
/// Bridging request, quote and deposit result types.
pub mod swap;
/// Utility functions for amount formatting.
pub mod utils;

pub use deploy::*;
pub use delivery::*;
pub use networks::{ChainDescriptor, ChainRegistry, RegistryError};
pub use run::*;
pub use secret_string::SecretString;
pub use storage::*;
pub use swap::*;
pub use utils::{format_token_amount, parse_base_units, parse_token_amount, AmountError};

pub use alloy_primitives::{Address, B256, U256};
