//! Bridging-service quote module for the sweeper system.
//!
//! A quote is one request/response exchange: the client posts a
//! [`SwapRequest`] and hands back the response body untouched. Picking the
//! deposit action out of it is the caller's job.

use async_trait::async_trait;
use sweeper_types::{SwapQuote, SwapRequest};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

pub use implementations::http::HttpQuoteClient;

/// Errors that can occur while requesting a quote.
#[derive(Debug, Error)]
pub enum QuoteError {
	/// The service answered with a non-2xx status.
	#[error("Quote request failed with status {status}: {body}")]
	Http { status: u16, body: String },
	/// The request did not complete (connection, TLS, timeout).
	#[error("Network error: {0}")]
	Network(String),
	/// The client could not be built.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for bridging-service clients.
#[async_trait]
pub trait QuoteInterface: Send + Sync {
	/// Requests a swap quote for `request`.
	async fn request_quote(&self, request: &SwapRequest) -> Result<SwapQuote, QuoteError>;
}
