//! Brevo (formerly Sendinblue) contacts API client. Thin adapter: the core
//! only ever sees the `ContactSync` trait.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::config::SyncConfig;
use crate::sync::{ContactAttributes, ContactSync, SyncError};

pub struct BrevoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BrevoClient {
    pub fn from_config(cfg: &SyncConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
        }
    }

    fn check(response: &reqwest::Response) -> Result<(), SyncError> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::Api {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ContactSync for BrevoClient {
    async fn subscribe(
        &self,
        email: &str,
        list: &str,
        attributes: &ContactAttributes,
    ) -> Result<(), SyncError> {
        let response = self
            .http
            .post(format!("{}/contacts", self.base_url))
            .header("api-key", &self.api_key)
            .json(&json!({
                "email": email,
                "attributes": attributes,
                "listNames": [list],
                "updateEnabled": false,
            }))
            .send()
            .await?;

        Self::check(&response)
    }

    async fn update_contact(
        &self,
        email: &str,
        attributes: &ContactAttributes,
    ) -> Result<(), SyncError> {
        // Keyed by the address the remote record currently carries; the
        // attribute payload may move it to a new one.
        let response = self
            .http
            .put(format!(
                "{}/contacts/{}",
                self.base_url,
                urlencode(email)
            ))
            .header("api-key", &self.api_key)
            .json(&json!({ "attributes": attributes }))
            .send()
            .await?;

        Self::check(&response)
    }

    async fn unsubscribe(&self, email: &str, list: &str) -> Result<(), SyncError> {
        let response = self
            .http
            .post(format!(
                "{}/contacts/lists/{}/contacts/remove",
                self.base_url,
                urlencode(list)
            ))
            .header("api-key", &self.api_key)
            .json(&json!({ "emails": [email] }))
            .send()
            .await?;

        Self::check(&response)
    }
}

/// Percent-encode a path segment (emails carry '@', list names may carry
/// spaces).
fn urlencode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_safe_in_path_segments() {
        assert_eq!(urlencode("a+b@example.com"), "a%2Bb%40example.com");
    }
}
