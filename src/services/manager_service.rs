//! Manager lifecycle: validation, persistence, and the contact-sync hooks
//! that fire after each successful write.

use std::collections::HashMap;
use std::future::Future;

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::config;
use crate::database::models::manager::NOTIFICATION_FLAGS;
use crate::database::models::{ContactMethod, ManagedRecord, ManagedTarget, Manager};
use crate::database::PgDelegationStore;
use crate::hierarchy::{DelegationStore, ManagerScopes};
use crate::services::ValidationError;
use crate::sync::{self, SharedSync, SyncError};

#[derive(Debug, Clone, Deserialize)]
pub struct ManagerInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub language_code: String,
    #[serde(default = "default_contact_method")]
    pub contact_method: ContactMethod,
    #[serde(default)]
    pub notifications: Vec<String>,
}

fn default_contact_method() -> ContactMethod {
    ContactMethod::Email
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{}", .0.message)]
    Validation(ValidationError),

    #[error("Manager not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

const MANAGER_COLUMNS: &str = "id, name, email, phone, language_code, contact_method, \
     administrator, email_verified, phone_verified, notifications, \
     last_login_at, created_at, updated_at";

pub struct ManagerService {
    pool: PgPool,
    sync: SharedSync,
}

impl ManagerService {
    pub fn new(pool: PgPool, sync: SharedSync) -> Self {
        Self { pool, sync }
    }

    pub async fn find(&self, id: Uuid) -> Result<Manager, ManagerError> {
        sqlx::query_as::<_, Manager>(&format!(
            "SELECT {MANAGER_COLUMNS} FROM managers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ManagerError::NotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Manager>, ManagerError> {
        let email = normalize_email(email);
        Ok(sqlx::query_as::<_, Manager>(&format!(
            "SELECT {MANAGER_COLUMNS} FROM managers WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// All managers, most recently touched first.
    pub async fn list(&self, limit: i64) -> Result<Vec<Manager>, ManagerError> {
        Ok(sqlx::query_as::<_, Manager>(&format!(
            "SELECT {MANAGER_COLUMNS} FROM managers ORDER BY updated_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn create(&self, input: ManagerInput) -> Result<Manager, ManagerError> {
        let input = normalize(input);
        let mut field_errors = validate(&input);
        if field_errors.is_empty() && self.email_taken(&input.email, None).await? {
            field_errors.insert("email".to_string(), "has already been taken".to_string());
        }
        if !field_errors.is_empty() {
            return Err(ManagerError::Validation(ValidationError::new(field_errors)));
        }

        let manager = sqlx::query_as::<_, Manager>(&format!(
            "INSERT INTO managers \
                 (name, email, phone, language_code, contact_method, notifications) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {MANAGER_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.language_code)
        .bind(input.contact_method)
        .bind(&input.notifications)
        .fetch_one(&self.pool)
        .await?;

        // New managers hold no delegations yet, so the attribute lists start
        // out empty (or "ALL" for administrators created by seed data).
        let scopes = ManagerScopes {
            manager_id: manager.id,
            administrator: manager.administrator,
            ..ManagerScopes::default()
        };
        let attributes = sync::contact_attributes(&manager, &scopes);
        let email = manager.email.clone();
        let list = config::config().sync.list_name.clone();
        let client = self.sync.clone();
        fire_and_forget("subscribe", async move {
            client.subscribe(&email, &list, &attributes).await
        });

        Ok(manager)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: ManagerInput,
        force_sync: bool,
    ) -> Result<Manager, ManagerError> {
        let existing = self.find(id).await?;
        let input = normalize(input);
        let mut field_errors = validate(&input);
        if field_errors.is_empty() && self.email_taken(&input.email, Some(id)).await? {
            field_errors.insert("email".to_string(), "has already been taken".to_string());
        }
        if !field_errors.is_empty() {
            return Err(ManagerError::Validation(ValidationError::new(field_errors)));
        }

        let (email_verified, phone_verified) = carry_verification(&existing, &input);

        let updated = sqlx::query_as::<_, Manager>(&format!(
            "UPDATE managers SET \
                 name = $1, email = $2, phone = $3, language_code = $4, \
                 contact_method = $5, notifications = $6, \
                 email_verified = $7, phone_verified = $8, updated_at = now() \
             WHERE id = $9 \
             RETURNING {MANAGER_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.language_code)
        .bind(input.contact_method)
        .bind(&input.notifications)
        .bind(email_verified)
        .bind(phone_verified)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if let Some(sync_key) = update_sync_key(&existing.email, &updated.email, force_sync) {
            let scopes = self.scopes_for_sync(id).await;
            let attributes = sync::contact_attributes(&updated, &scopes);
            let client = self.sync.clone();
            // The remote record is keyed by the address it currently carries,
            // so a changed email must be pushed under the previous one.
            fire_and_forget("update_contact", async move {
                client.update_contact(&sync_key, &attributes).await
            });
        }

        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ManagerError> {
        let existing = self.find(id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM managed_records WHERE manager_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM managers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        let list = config::config().sync.list_name.clone();
        let client = self.sync.clone();
        fire_and_forget("unsubscribe", async move {
            client.unsubscribe(&existing.email, &list).await
        });

        Ok(())
    }

    pub async fn record_login(&self, id: Uuid) -> Result<(), ManagerError> {
        sqlx::query("UPDATE managers SET last_login_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn managed_records(
        &self,
        manager_id: Uuid,
    ) -> Result<Vec<ManagedRecord>, ManagerError> {
        Ok(sqlx::query_as::<_, ManagedRecord>(
            "SELECT id, manager_id, target_kind, target_id \
             FROM managed_records WHERE manager_id = $1",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Idempotent: granting a delegation the manager already holds is a no-op.
    pub async fn grant_scope(
        &self,
        manager_id: Uuid,
        target: &ManagedTarget,
    ) -> Result<(), ManagerError> {
        self.find(manager_id).await?;
        sqlx::query(
            "INSERT INTO managed_records (manager_id, target_kind, target_id) \
             SELECT $1, $2, $3 \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM managed_records \
                 WHERE manager_id = $1 AND target_kind = $2 AND target_id = $3)",
        )
        .bind(manager_id)
        .bind(target.kind())
        .bind(target.id())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn revoke_scope(
        &self,
        manager_id: Uuid,
        target: &ManagedTarget,
    ) -> Result<(), ManagerError> {
        self.find(manager_id).await?;
        sqlx::query(
            "DELETE FROM managed_records \
             WHERE manager_id = $1 AND target_kind = $2 AND target_id = $3",
        )
        .bind(manager_id)
        .bind(target.kind())
        .bind(target.id())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn email_taken(&self, email: &str, excluding: Option<Uuid>) -> Result<bool, sqlx::Error> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM managers WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(email)
        .bind(excluding)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Sync attributes want the current delegation lists; a load failure only
    /// degrades the pushed attributes, never the local write.
    async fn scopes_for_sync(&self, id: Uuid) -> ManagerScopes {
        let store = PgDelegationStore::new(self.pool.clone());
        match store.manager_scopes(id).await {
            Ok(scopes) => scopes,
            Err(err) => {
                tracing::warn!(manager_id = %id, error = %err, "scope load for sync failed");
                ManagerScopes {
                    manager_id: id,
                    ..ManagerScopes::default()
                }
            }
        }
    }
}

/// Spawn a sync call without awaiting it; a failed push is logged and the
/// request that triggered it still succeeds.
fn fire_and_forget<F>(action: &'static str, task: F)
where
    F: Future<Output = Result<(), SyncError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(err) = task.await {
            tracing::warn!(action, error = %err, "contact sync call failed");
        }
    });
}

/// Verification flags to carry through a save: changing a contact channel
/// invalidates its verification, an unchanged channel keeps whatever state it
/// had.
fn carry_verification(existing: &Manager, input: &ManagerInput) -> (bool, bool) {
    let email_verified = existing.email_verified && existing.email == input.email;
    let phone_verified = existing.phone_verified && existing.phone == input.phone;
    (email_verified, phone_verified)
}

/// Key for the post-update sync push: `Some(previous_email)` when the remote
/// record needs touching, `None` when nothing contact-visible changed.
fn update_sync_key(previous_email: &str, current_email: &str, force: bool) -> Option<String> {
    (force || previous_email != current_email).then(|| previous_email.to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Strip formatting from a phone number, keeping digits and a leading '+'.
/// Returns `None` when nothing dialable remains.
fn normalize_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut normalized = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            normalized.push(c);
        }
    }
    let has_digits = normalized.chars().any(|c| c.is_ascii_digit());
    has_digits.then_some(normalized)
}

fn normalize(input: ManagerInput) -> ManagerInput {
    ManagerInput {
        name: input.name.trim().to_string(),
        email: normalize_email(&input.email),
        phone: input.phone.as_deref().and_then(normalize_phone),
        language_code: input.language_code.trim().to_string(),
        ..input
    }
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
        && !domain.contains('@')
}

/// Field-level checks against a normalized input. Uniqueness is checked
/// separately since it needs the database.
fn validate(input: &ManagerInput) -> HashMap<String, String> {
    let mut errors = HashMap::new();

    if input.name.is_empty() {
        errors.insert("name".to_string(), "can't be blank".to_string());
    }
    if input.language_code.is_empty() {
        errors.insert("language_code".to_string(), "can't be blank".to_string());
    }

    if input.email.is_empty() {
        errors.insert("email".to_string(), "can't be blank".to_string());
    } else if !valid_email(&input.email) {
        errors.insert("email".to_string(), "is invalid".to_string());
    }

    // Messenger-based contact methods are unreachable without a number.
    if input.contact_method != ContactMethod::Email && input.phone.is_none() {
        errors.insert("phone".to_string(), "can't be blank".to_string());
    }

    for flag in &input.notifications {
        if !NOTIFICATION_FLAGS.contains(&flag.as_str()) {
            errors.insert(
                "notifications".to_string(),
                format!("{} is not a known notification flag", flag),
            );
            break;
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn existing_manager() -> Manager {
        Manager {
            id: Uuid::new_v4(),
            name: "Kavya Rao".to_string(),
            email: "kavya@example.com".to_string(),
            phone: Some("+919900112233".to_string()),
            language_code: "en".to_string(),
            contact_method: ContactMethod::Email,
            administrator: false,
            email_verified: true,
            phone_verified: true,
            notifications: vec![],
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn input() -> ManagerInput {
        ManagerInput {
            name: "Kavya Rao".to_string(),
            email: "kavya@example.com".to_string(),
            phone: None,
            language_code: "en".to_string(),
            contact_method: ContactMethod::Email,
            notifications: vec![],
        }
    }

    #[test]
    fn a_complete_input_passes_validation() {
        assert!(validate(&input()).is_empty());
    }

    #[test]
    fn blank_name_email_and_language_are_rejected() {
        let bad = normalize(ManagerInput {
            name: "  ".to_string(),
            email: String::new(),
            language_code: String::new(),
            ..input()
        });
        let errors = validate(&bad);
        assert_eq!(errors.get("name").map(String::as_str), Some("can't be blank"));
        assert_eq!(errors.get("email").map(String::as_str), Some("can't be blank"));
        assert_eq!(
            errors.get("language_code").map(String::as_str),
            Some("can't be blank")
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["kavya", "kavya@", "@example.com", "kavya@example", "a b@example.com"] {
            let errors = validate(&ManagerInput {
                email: email.to_string(),
                ..input()
            });
            assert_eq!(
                errors.get("email").map(String::as_str),
                Some("is invalid"),
                "expected {email:?} to be rejected"
            );
        }
    }

    #[test]
    fn messenger_contact_requires_a_phone_number() {
        let errors = validate(&ManagerInput {
            contact_method: ContactMethod::Whatsapp,
            phone: None,
            ..input()
        });
        assert_eq!(errors.get("phone").map(String::as_str), Some("can't be blank"));

        let errors = validate(&ManagerInput {
            contact_method: ContactMethod::Whatsapp,
            phone: Some("+919900112233".to_string()),
            ..input()
        });
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_notification_flags_are_rejected() {
        let errors = validate(&ManagerInput {
            notifications: vec!["event_verification".to_string(), "carrier_pigeon".to_string()],
            ..input()
        });
        assert!(errors.contains_key("notifications"));
    }

    #[test]
    fn normalization_lowercases_email_and_strips_phone_formatting() {
        let normalized = normalize(ManagerInput {
            email: "  Kavya@Example.COM ".to_string(),
            phone: Some("+91 (99) 001-122 33".to_string()),
            ..input()
        });
        assert_eq!(normalized.email, "kavya@example.com");
        assert_eq!(normalized.phone.as_deref(), Some("+919900112233"));
    }

    #[test]
    fn phone_with_no_digits_normalizes_to_none() {
        assert_eq!(normalize_phone("  -- "), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn email_change_syncs_once_under_the_previous_address() {
        assert_eq!(
            update_sync_key("old@example.com", "new@example.com", false).as_deref(),
            Some("old@example.com")
        );
    }

    #[test]
    fn changing_the_email_clears_its_verification_only() {
        let existing = existing_manager();
        let changed = ManagerInput {
            email: "kavya.rao@example.com".to_string(),
            phone: existing.phone.clone(),
            ..input()
        };
        assert_eq!(carry_verification(&existing, &changed), (false, true));
    }

    #[test]
    fn changing_the_phone_clears_its_verification_only() {
        let existing = existing_manager();
        let changed = ManagerInput {
            phone: Some("+919911223344".to_string()),
            ..input()
        };
        assert_eq!(carry_verification(&existing, &changed), (true, false));
    }

    #[test]
    fn unchanged_channels_keep_their_verification() {
        let existing = existing_manager();
        let same = ManagerInput {
            name: "Kavya R Rao".to_string(),
            phone: existing.phone.clone(),
            ..input()
        };
        assert_eq!(carry_verification(&existing, &same), (true, true));

        // and an unverified channel never becomes verified by saving
        let mut unverified = existing_manager();
        unverified.email_verified = false;
        unverified.phone_verified = false;
        let same = ManagerInput {
            phone: unverified.phone.clone(),
            ..input()
        };
        assert_eq!(carry_verification(&unverified, &same), (false, false));
    }

    #[test]
    fn phone_only_change_does_not_sync_unless_forced() {
        assert_eq!(update_sync_key("a@example.com", "a@example.com", false), None);
        assert_eq!(
            update_sync_key("a@example.com", "a@example.com", true).as_deref(),
            Some("a@example.com")
        );
    }
}
