use serde::Deserialize;

use crate::errors::AppError;

pub const DEFAULT_KICKBOX_BASE_URL: &str = "https://api.kickbox.com";
pub const DEFAULT_HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Optional at load time; a missing key is reported per invocation as a
    /// configuration error (see `Credentials::from_config`).
    pub kickbox_api_key: Option<String>,
    pub hubspot_access_token: Option<String>,
    pub kickbox_base_url: String,
    pub hubspot_base_url: String,
    pub function_secret: Option<String>,
    /// Client-level request timeout; unset leaves reqwest's default (none).
    pub http_timeout_secs: Option<u64>,
}

impl Config {
    pub fn http_timeout(&self) -> Option<std::time::Duration> {
        self.http_timeout_secs.map(std::time::Duration::from_secs)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            kickbox_api_key: non_blank(
                std::env::var("KICKBOX_API_KEY").or_else(|_| std::env::var("kickbox")),
            ),
            hubspot_access_token: non_blank(
                std::env::var("HUBSPOT_ACCESS_TOKEN").or_else(|_| std::env::var("private_app")),
            ),
            kickbox_base_url: base_url("KICKBOX_BASE_URL", DEFAULT_KICKBOX_BASE_URL)?,
            hubspot_base_url: base_url("HUBSPOT_BASE_URL", DEFAULT_HUBSPOT_BASE_URL)?,
            function_secret: non_blank(std::env::var("FUNCTION_SECRET")),
            http_timeout_secs: non_blank(std::env::var("HTTP_TIMEOUT_SECS"))
                .map(|secs| secs.trim().parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a whole number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Kickbox Base URL: {}", config.kickbox_base_url);
        tracing::debug!("HubSpot Base URL: {}", config.hubspot_base_url);
        tracing::debug!("Server Port: {}", config.port);
        if config.kickbox_api_key.is_none() {
            tracing::warn!("KICKBOX_API_KEY not set; verifications will fail until configured");
        }
        if config.hubspot_access_token.is_none() {
            tracing::warn!("HUBSPOT_ACCESS_TOKEN not set; verifications will fail until configured");
        }
        if config.function_secret.is_none() {
            tracing::warn!("FUNCTION_SECRET not set; function endpoints accept unauthenticated calls");
        }

        Ok(config)
    }
}

/// Secrets required by every verification, validated once before any invocation runs.
#[derive(Clone)]
pub struct Credentials {
    pub kickbox_api_key: String,
    pub hubspot_access_token: String,
}

impl Credentials {
    /// Checks the provider key first, then the CRM token.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let kickbox_api_key = config.kickbox_api_key.clone().ok_or_else(|| {
            AppError::Configuration("Kickbox API key not configured.".to_string())
        })?;
        let hubspot_access_token = config.hubspot_access_token.clone().ok_or_else(|| {
            AppError::Configuration("HubSpot Access Token not configured.".to_string())
        })?;

        Ok(Self {
            kickbox_api_key,
            hubspot_access_token,
        })
    }
}

// Secrets stay out of Debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("kickbox_api_key", &"[REDACTED]")
            .field("hubspot_access_token", &"[REDACTED]")
            .finish()
    }
}

fn non_blank(value: Result<String, std::env::VarError>) -> Option<String> {
    value.ok().filter(|s| !s.trim().is_empty())
}

fn base_url(var: &str, default: &str) -> anyhow::Result<String> {
    let url = std::env::var(var).unwrap_or_else(|_| default.to_string());
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", var);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", var);
    }
    Ok(url.trim_end_matches('/').to_string())
}
