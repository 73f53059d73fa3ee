use crate::errors::AppError;
use crate::models::{CrmContact, PropertyPatch};
use reqwest::{Client, Response};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

/// Client for the HubSpot CRM contacts API (`/crm/v3/objects/contacts`).
#[derive(Clone)]
pub struct HubSpotClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HubSpotClient {
    /// Creates a new `HubSpotClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The HubSpot API root, normally `https://api.hubapi.com`.
    /// * `token` - Private app access token.
    /// * `timeout` - Optional request timeout; `None` keeps the client default.
    pub fn new(base_url: String, token: String, timeout: Option<Duration>) -> Result<Self, AppError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            AppError::Internal(format!("Failed to create HubSpot client: {}", e))
        })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Fetches a contact with an explicit property list.
    ///
    /// # Arguments
    ///
    /// * `contact_id` - The HubSpot record id.
    /// * `properties` - Property names to return.
    ///
    /// # Returns
    ///
    /// * `Result<CrmContact, AppError>` - The contact; every property value is a string or null.
    pub async fn get_contact(
        &self,
        contact_id: &str,
        properties: &[&str],
    ) -> Result<CrmContact, AppError> {
        let mut url = self.contact_url(contact_id).map_err(AppError::CrmRead)?;
        url.query_pairs_mut()
            .append_pair("properties", &properties.join(","));

        tracing::info!("Fetching contact {} from HubSpot", contact_id);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::CrmRead(format!("HubSpot request failed: {}", e)))?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            tracing::error!("HubSpot contact {} fetch failed: {}", contact_id, detail);
            return Err(AppError::CrmRead(format!(
                "Failed to fetch contact from HubSpot: {}",
                detail
            )));
        }

        let contact: CrmContact = response.json().await.map_err(|e| {
            AppError::CrmRead(format!("Failed to parse HubSpot contact response: {}", e))
        })?;

        Ok(contact)
    }

    /// Writes a property patch onto a contact.
    ///
    /// # Arguments
    ///
    /// * `contact_id` - The HubSpot record id.
    /// * `patch` - Properties to set; absent keys are left untouched by HubSpot.
    pub async fn update_contact(
        &self,
        contact_id: &str,
        patch: &PropertyPatch,
    ) -> Result<(), AppError> {
        let url = self.contact_url(contact_id).map_err(AppError::CrmWrite)?;
        tracing::info!(
            "Updating HubSpot contact {} ({} properties)",
            contact_id,
            patch.len()
        );

        let body = json!({ "properties": patch });

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AppError::CrmWrite(format!("Failed to update HubSpot contact: {}", e))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            tracing::error!("HubSpot contact {} update failed: {}", contact_id, detail);
            return Err(AppError::CrmWrite(format!(
                "Failed to update HubSpot contact: {}",
                detail
            )));
        }

        tracing::info!("✓ Successfully updated HubSpot contact {}", contact_id);
        Ok(())
    }

    fn contact_url(&self, contact_id: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid HubSpot base URL: {}", e))?;
        url.path_segments_mut()
            .map_err(|_| "HubSpot base URL cannot be a base".to_string())?
            .pop_if_empty()
            .extend(&["crm", "v3", "objects", "contacts", contact_id]);
        Ok(url)
    }
}

/// HubSpot error bodies look like `{"status":"error","message":"..."}`; prefer
/// the message, fall back to the raw text.
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);

    format!("{} {}", status.as_u16(), message)
}
