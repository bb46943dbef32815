use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: Uuid,
    pub area_id: Uuid,
    pub street: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    /// Hosting venue; absent for online events.
    pub venue_id: Option<Uuid>,
    /// Set for online events, which attach to an area directly.
    pub area_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub room: Option<String>,
    pub category: Option<String>,
    pub recurrence: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    /// Per-language contact mapping (keyed configuration, not a relation).
    pub manager: Value,
    pub languages: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn online(&self) -> bool {
        self.venue_id.is_none()
    }
}
