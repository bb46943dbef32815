//! Event CRUD under a venue. Authorization happens in the handler layer
//! before any of these mutations run.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::{Event, Venue};
use crate::services::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub name: String,
    pub description: Option<String>,
    pub room: Option<String>,
    pub category: Option<String>,
    pub recurrence: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default = "empty_object")]
    pub manager: Value,
    #[serde(default)]
    pub languages: Vec<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("{}", .0.message)]
    Validation(ValidationError),

    #[error("Event not found")]
    NotFound,

    #[error("Venue not found")]
    VenueNotFound,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

const EVENT_COLUMNS: &str = "id, venue_id, area_id, name, description, room, category, \
     recurrence, start_date, end_date, start_time, end_time, \
     manager, languages, created_at, updated_at";

pub struct EventService {
    pool: PgPool,
}

impl EventService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: Uuid) -> Result<Event, EventError> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(EventError::NotFound)
    }

    pub async fn find_venue(&self, venue_id: Uuid) -> Result<Venue, EventError> {
        sqlx::query_as::<_, Venue>("SELECT id, area_id, street FROM venues WHERE id = $1")
            .bind(venue_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(EventError::VenueNotFound)
    }

    pub async fn list_for_venue(&self, venue_id: Uuid) -> Result<Vec<Event>, EventError> {
        self.find_venue(venue_id).await?;
        Ok(sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE venue_id = $1 ORDER BY start_date, name"
        ))
        .bind(venue_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn create(&self, venue_id: Uuid, input: EventInput) -> Result<Event, EventError> {
        self.find_venue(venue_id).await?;
        validate(&input).map_err(EventError::Validation)?;

        Ok(sqlx::query_as::<_, Event>(&format!(
            "INSERT INTO events \
                 (venue_id, name, description, room, category, recurrence, \
                  start_date, end_date, start_time, end_time, manager, languages) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(venue_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.room)
        .bind(&input.category)
        .bind(&input.recurrence)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.manager)
        .bind(&input.languages)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn update(&self, id: Uuid, input: EventInput) -> Result<Event, EventError> {
        self.find(id).await?;
        validate(&input).map_err(EventError::Validation)?;

        Ok(sqlx::query_as::<_, Event>(&format!(
            "UPDATE events SET \
                 name = $1, description = $2, room = $3, category = $4, \
                 recurrence = $5, start_date = $6, end_date = $7, \
                 start_time = $8, end_time = $9, manager = $10, languages = $11, \
                 updated_at = now() \
             WHERE id = $12 \
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.room)
        .bind(&input.category)
        .bind(&input.recurrence)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.start_time)
        .bind(input.end_time)
        .bind(&input.manager)
        .bind(&input.languages)
        .bind(id)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), EventError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EventError::NotFound);
        }
        Ok(())
    }
}

fn validate(input: &EventInput) -> Result<(), ValidationError> {
    let mut errors = HashMap::new();

    if input.name.trim().is_empty() {
        errors.insert("name".to_string(), "can't be blank".to_string());
    }
    if let Some(end_date) = input.end_date {
        if end_date < input.start_date {
            errors.insert(
                "end_date".to_string(),
                "must be on or after the start date".to_string(),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> EventInput {
        EventInput {
            name: "Weekly meditation".to_string(),
            description: None,
            room: Some("Hall 2".to_string()),
            category: None,
            recurrence: Some("weekly".to_string()),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: None,
            start_time: NaiveTime::from_hms_opt(18, 30, 0),
            end_time: NaiveTime::from_hms_opt(20, 0, 0),
            manager: empty_object(),
            languages: vec!["en".to_string(), "hi".to_string()],
        }
    }

    #[test]
    fn open_ended_events_are_valid() {
        assert!(validate(&input()).is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = validate(&EventInput {
            name: "  ".to_string(),
            ..input()
        })
        .unwrap_err();
        assert_eq!(
            err.field_errors.get("name").map(String::as_str),
            Some("can't be blank")
        );
    }

    #[test]
    fn end_date_may_not_precede_start_date() {
        let err = validate(&EventInput {
            end_date: NaiveDate::from_ymd_opt(2026, 2, 1),
            ..input()
        })
        .unwrap_err();
        assert!(err.field_errors.contains_key("end_date"));

        // same-day events are fine
        assert!(validate(&EventInput {
            end_date: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..input()
        })
        .is_ok());
    }
}
