//! One-way contact-list synchronization. Lifecycle hooks push the manager's
//! flattened attribute set to the remote list; failures are logged and never
//! fail the local write.

pub mod brevo;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::config;
use crate::database::models::Manager;
use crate::hierarchy::ManagerScopes;
use crate::localization;

pub const HOW_THEY_JOINED: &str = "Atlas Manager";
const ALL: &str = "ALL";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sync API rejected the request: status {status}")]
    Api { status: u16 },
}

/// Flattened attribute set pushed to the remote contact record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactAttributes {
    pub email: String,
    pub firstname: String,
    pub lastname: Option<String>,
    pub timezone: Option<String>,
    pub city: Option<String>,
    pub state_region: Option<String>,
    pub country: Option<String>,
    pub how_they_joined: String,
    pub language: Option<String>,
    pub clients_managed: String,
    pub countries_managed: String,
    pub regions_managed: String,
    pub areas_managed: String,
    pub events_managed: String,
}

#[async_trait]
pub trait ContactSync: Send + Sync {
    async fn subscribe(
        &self,
        email: &str,
        list: &str,
        attributes: &ContactAttributes,
    ) -> Result<(), SyncError>;

    async fn update_contact(
        &self,
        email: &str,
        attributes: &ContactAttributes,
    ) -> Result<(), SyncError>;

    async fn unsubscribe(&self, email: &str, list: &str) -> Result<(), SyncError>;
}

pub type SharedSync = Arc<dyn ContactSync>;

/// Semicolon-joined list with a trailing separator per item, matching the
/// legacy remote field format ("A;B;").
fn joined<T>(items: &[T], label: impl Fn(&T) -> &str) -> String {
    items
        .iter()
        .map(|item| format!("{};", label(item)))
        .collect()
}

/// Build the flattened attribute set from the manager row and its loaded
/// scopes. Administrators report the literal "ALL" for every managed list.
pub fn contact_attributes(manager: &Manager, scopes: &ManagerScopes) -> ContactAttributes {
    let first_area = scopes.areas.first();

    let mut attributes = ContactAttributes {
        email: manager.email.clone(),
        firstname: manager.first_name().to_string(),
        lastname: manager.last_name().map(str::to_string),
        timezone: first_area.and_then(|a| a.time_zone.clone()),
        city: first_area.map(|a| a.name.clone()),
        state_region: scopes.regions.first().map(|r| r.name.clone()),
        country: scopes.countries.first().map(|c| c.name.clone()),
        how_they_joined: HOW_THEY_JOINED.to_string(),
        language: localization::language_name(&manager.language_code).map(str::to_string),
        clients_managed: joined(&scopes.clients, |c| &c.label),
        countries_managed: joined(&scopes.countries, |c| &c.name),
        regions_managed: joined(&scopes.regions, |r| &r.name),
        areas_managed: joined(&scopes.areas, |a| &a.name),
        events_managed: joined(&scopes.events, |e| &e.label),
    };

    if manager.administrator {
        attributes.clients_managed = ALL.to_string();
        attributes.countries_managed = ALL.to_string();
        attributes.regions_managed = ALL.to_string();
        attributes.areas_managed = ALL.to_string();
        attributes.events_managed = ALL.to_string();
    }

    attributes
}

/// No-op client used when sync is disabled; logs at debug so local
/// development still shows what would have been pushed.
pub struct NullSync;

#[async_trait]
impl ContactSync for NullSync {
    async fn subscribe(
        &self,
        email: &str,
        list: &str,
        _attributes: &ContactAttributes,
    ) -> Result<(), SyncError> {
        tracing::debug!(email, list, "contact sync disabled: skipping subscribe");
        Ok(())
    }

    async fn update_contact(
        &self,
        email: &str,
        _attributes: &ContactAttributes,
    ) -> Result<(), SyncError> {
        tracing::debug!(email, "contact sync disabled: skipping update");
        Ok(())
    }

    async fn unsubscribe(&self, email: &str, list: &str) -> Result<(), SyncError> {
        tracing::debug!(email, list, "contact sync disabled: skipping unsubscribe");
        Ok(())
    }
}

static CLIENT: OnceLock<SharedSync> = OnceLock::new();

/// Process-wide sync client, chosen from configuration at first use.
pub fn client() -> SharedSync {
    CLIENT
        .get_or_init(|| {
            let cfg = &config::config().sync;
            if cfg.enabled && !cfg.api_key.is_empty() {
                Arc::new(brevo::BrevoClient::from_config(cfg))
            } else {
                Arc::new(NullSync)
            }
        })
        .clone()
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub enum SyncCall {
        Subscribe { email: String, list: String },
        UpdateContact { email: String },
        Unsubscribe { email: String, list: String },
    }

    /// Records every call for assertions in lifecycle tests.
    #[derive(Default)]
    pub struct RecordingSync {
        pub calls: Mutex<Vec<SyncCall>>,
    }

    #[async_trait]
    impl ContactSync for RecordingSync {
        async fn subscribe(
            &self,
            email: &str,
            list: &str,
            _attributes: &ContactAttributes,
        ) -> Result<(), SyncError> {
            self.calls.lock().unwrap().push(SyncCall::Subscribe {
                email: email.to_string(),
                list: list.to_string(),
            });
            Ok(())
        }

        async fn update_contact(
            &self,
            email: &str,
            _attributes: &ContactAttributes,
        ) -> Result<(), SyncError> {
            self.calls.lock().unwrap().push(SyncCall::UpdateContact {
                email: email.to_string(),
            });
            Ok(())
        }

        async fn unsubscribe(&self, email: &str, list: &str) -> Result<(), SyncError> {
            self.calls.lock().unwrap().push(SyncCall::Unsubscribe {
                email: email.to_string(),
                list: list.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ContactMethod;
    use crate::hierarchy::{AreaScope, CountryScope, EventScope, RegionScope};
    use chrono::Utc;
    use uuid::Uuid;

    fn manager(name: &str, administrator: bool) -> Manager {
        Manager {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: "kavya@example.com".to_string(),
            phone: None,
            language_code: "kn".to_string(),
            contact_method: ContactMethod::Email,
            administrator,
            email_verified: true,
            phone_verified: false,
            notifications: vec![],
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn scopes() -> ManagerScopes {
        ManagerScopes {
            manager_id: Uuid::new_v4(),
            administrator: false,
            countries: vec![CountryScope {
                id: Uuid::new_v4(),
                country_code: "IN".to_string(),
                name: "India".to_string(),
                enable_regions: true,
                persisted: true,
            }],
            regions: vec![RegionScope {
                id: Uuid::new_v4(),
                region_code: "IN-KA".to_string(),
                country_code: "IN".to_string(),
                name: "Karnataka".to_string(),
                persisted: true,
            }],
            areas: vec![AreaScope {
                id: Uuid::new_v4(),
                name: "Bengaluru".to_string(),
                country_code: "IN".to_string(),
                region_code: Some("IN-KA".to_string()),
                time_zone: Some("Asia/Kolkata".to_string()),
                persisted: true,
            }],
            events: vec![
                EventScope {
                    id: Uuid::new_v4(),
                    label: "weekly meditation, MG Road".to_string(),
                    country_code: Some("IN".to_string()),
                    region_code: Some("IN-KA".to_string()),
                    persisted: true,
                },
                EventScope {
                    id: Uuid::new_v4(),
                    label: "intro talk, Church Street".to_string(),
                    country_code: Some("IN".to_string()),
                    region_code: Some("IN-KA".to_string()),
                    persisted: true,
                },
            ],
            clients: vec![],
        }
    }

    #[test]
    fn attributes_flatten_scopes_with_trailing_separators() {
        let attrs = contact_attributes(&manager("Kavya Rao", false), &scopes());

        assert_eq!(attrs.firstname, "Kavya");
        assert_eq!(attrs.lastname.as_deref(), Some("Rao"));
        assert_eq!(attrs.city.as_deref(), Some("Bengaluru"));
        assert_eq!(attrs.timezone.as_deref(), Some("Asia/Kolkata"));
        assert_eq!(attrs.state_region.as_deref(), Some("Karnataka"));
        assert_eq!(attrs.country.as_deref(), Some("India"));
        assert_eq!(attrs.language.as_deref(), Some("Kannada"));
        assert_eq!(attrs.countries_managed, "India;");
        assert_eq!(attrs.regions_managed, "Karnataka;");
        assert_eq!(
            attrs.events_managed,
            "weekly meditation, MG Road;intro talk, Church Street;"
        );
        assert_eq!(attrs.clients_managed, "");
    }

    #[test]
    fn administrators_report_all_for_every_managed_list() {
        let attrs = contact_attributes(&manager("Kavya Rao", true), &scopes());

        assert_eq!(attrs.countries_managed, "ALL");
        assert_eq!(attrs.regions_managed, "ALL");
        assert_eq!(attrs.areas_managed, "ALL");
        assert_eq!(attrs.events_managed, "ALL");
        assert_eq!(attrs.clients_managed, "ALL");
        // identity fields still come from the record
        assert_eq!(attrs.firstname, "Kavya");
    }

    #[tokio::test]
    async fn recording_double_captures_the_call_sequence() {
        let double = testing::RecordingSync::default();
        let attrs = contact_attributes(&manager("Kavya Rao", false), &scopes());

        double
            .subscribe("kavya@example.com", "managers", &attrs)
            .await
            .unwrap();
        double.update_contact("kavya@example.com", &attrs).await.unwrap();
        double
            .unsubscribe("kavya@example.com", "managers")
            .await
            .unwrap();

        let calls = double.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            testing::SyncCall::UpdateContact {
                email: "kavya@example.com".to_string()
            }
        );
    }
}
