use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Preferred contact channel. Stored as a smallint, matching the legacy
/// numbering (email=0, whatsapp=1, telegram=2, wechat=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Email = 0,
    Whatsapp = 1,
    Telegram = 2,
    Wechat = 3,
}

/// Valid entries for the `notifications` flag set.
pub const NOTIFICATION_FLAGS: &[&str] = &[
    "new_managed_record",
    "event_verification",
    "event_registrations",
    "place_summary",
    "country_summary",
    "application_summary",
    "client_summary",
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Manager {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub language_code: String,
    pub contact_method: ContactMethod,
    pub administrator: bool,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub notifications: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manager {
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    pub fn last_name(&self) -> Option<&str> {
        self.name
            .split_once(' ')
            .map(|(_, rest)| rest.trim())
            .filter(|rest| !rest.is_empty())
    }

    pub fn verified(&self) -> bool {
        self.email_verified || self.phone_verified
    }

    pub fn contact_by_email(&self) -> bool {
        self.contact_method == ContactMethod::Email
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(name: &str) -> Manager {
        Manager {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: "a@example.com".to_string(),
            phone: None,
            language_code: "en".to_string(),
            contact_method: ContactMethod::Email,
            administrator: false,
            email_verified: false,
            phone_verified: false,
            notifications: vec![],
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn name_splits_on_the_first_space() {
        let m = manager("Nirmala Devi Srivastava");
        assert_eq!(m.first_name(), "Nirmala");
        assert_eq!(m.last_name(), Some("Devi Srivastava"));
    }

    #[test]
    fn single_word_names_have_no_last_name() {
        let m = manager("Nirmala");
        assert_eq!(m.first_name(), "Nirmala");
        assert_eq!(m.last_name(), None);
    }
}
