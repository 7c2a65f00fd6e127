//! HTTP client for the bridging service's swap endpoint.

use crate::{QuoteError, QuoteInterface};
use async_trait::async_trait;
use std::time::Duration;
use sweeper_types::{SecretString, SwapQuote, SwapRequest};

/// Posts swap requests with header-based API-key authentication.
pub struct HttpQuoteClient {
	client: reqwest::Client,
	endpoint: reqwest::Url,
}

impl HttpQuoteClient {
	/// Builds a client for `endpoint`.
	///
	/// The API key is sent under `api_key_header` on every request and is
	/// marked sensitive so it never shows up in debug output.
	pub fn new(
		endpoint: &str,
		api_key: &SecretString,
		api_key_header: &str,
		timeout: Duration,
	) -> Result<Self, QuoteError> {
		let endpoint = endpoint
			.parse::<reqwest::Url>()
			.map_err(|e| QuoteError::Configuration(format!("Invalid api_url: {}", e)))?;

		let mut key = reqwest::header::HeaderValue::from_str(api_key.expose_secret())
			.map_err(|_| QuoteError::Configuration("API key is not a valid header value".into()))?;
		key.set_sensitive(true);
		let name = reqwest::header::HeaderName::from_bytes(api_key_header.as_bytes())
			.map_err(|e| QuoteError::Configuration(format!("Invalid api_key_header: {}", e)))?;

		let mut headers = reqwest::header::HeaderMap::new();
		headers.insert(name, key);

		let client = reqwest::Client::builder()
			.default_headers(headers)
			.timeout(timeout)
			.build()
			.map_err(|e| QuoteError::Configuration(e.to_string()))?;

		Ok(Self { client, endpoint })
	}
}

#[async_trait]
impl QuoteInterface for HttpQuoteClient {
	async fn request_quote(&self, request: &SwapRequest) -> Result<SwapQuote, QuoteError> {
		tracing::debug!(
			destination_network = %request.destination_network,
			amount = %request.amount,
			"Requesting swap quote"
		);

		let response = self
			.client
			.post(self.endpoint.clone())
			.json(request)
			.send()
			.await
			.map_err(|e| QuoteError::Network(e.to_string()))?;

		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| QuoteError::Network(e.to_string()))?;

		if !status.is_success() {
			return Err(QuoteError::Http {
				status: status.as_u16(),
				body,
			});
		}

		// A 2xx body that is not JSON is kept verbatim as a string quote.
		let quote = serde_json::from_str(&body).unwrap_or_else(|e| {
			tracing::warn!(error = %e, "Swap response is not JSON, keeping raw body");
			serde_json::Value::String(body)
		});
		Ok(SwapQuote(quote))
	}
}
