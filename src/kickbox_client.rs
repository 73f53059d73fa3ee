use crate::errors::AppError;
use crate::models::RawVerificationResponse;
use reqwest::Client;
use std::time::Duration;

/// Client for the Kickbox single-address verification endpoint.
#[derive(Clone)]
pub struct KickboxClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KickboxClient {
    /// Creates a new `KickboxClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Kickbox API root, normally `https://api.kickbox.com`.
    /// * `api_key` - The Kickbox API key.
    /// * `timeout` - Optional request timeout; `None` keeps the client default.
    pub fn new(base_url: String, api_key: String, timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::Internal(format!("Failed to create Kickbox client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Calls `GET /v2/verify` for one address.
    ///
    /// Transport failures, non-2xx statuses and unparseable bodies are
    /// provider errors. A body carrying an `error` field is returned as-is;
    /// rejecting it is the caller's job.
    ///
    /// # Returns
    ///
    /// * `Result<RawVerificationResponse, AppError>` - The raw provider response.
    pub async fn verify(&self, email: &str) -> Result<RawVerificationResponse, AppError> {
        // Build URL with proper parameter encoding
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v2/verify", self.base_url),
            &[("email", email), ("apikey", self.api_key.as_str())],
        )
        .map_err(|e| AppError::Provider(format!("Failed to build Kickbox URL: {}", e)))?;

        tracing::info!("Verifying email with Kickbox: {}", email);
        // Redact key from logs to prevent credential exposure
        tracing::debug!(
            "Kickbox URL: {}/v2/verify?email={}&apikey=[REDACTED]",
            self.base_url,
            email
        );

        // The request URL carries the API key; strip it from transport errors.
        let response = self.client.get(url).send().await.map_err(|e| {
            AppError::Provider(format!(
                "Failed to verify email with Kickbox: {}",
                e.without_url()
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!(
                "Kickbox API responded with status: {}, body: {}",
                status.as_u16(),
                error_text
            );
            return Err(AppError::Provider(format!(
                "Failed to verify email with Kickbox: Kickbox API responded with status: {} - {}",
                status.as_u16(),
                error_text
            )));
        }

        let raw: RawVerificationResponse = response.json().await.map_err(|e| {
            AppError::Provider(format!(
                "Failed to verify email with Kickbox: unreadable response: {}",
                e.without_url()
            ))
        })?;

        tracing::debug!("Kickbox raw result for {}: {:?}", email, raw);
        Ok(raw)
    }
}
