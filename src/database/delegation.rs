//! Postgres-backed delegation store. All reads the hierarchy core needs,
//! expressed as plain runtime queries against the relational layout.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::hierarchy::scopes::{
    AreaScope, ClientScope, CountryScope, EventScope, ManagerScopes, RegionScope,
};
use crate::hierarchy::store::{DelegationError, DelegationNode, DelegationStore};

/// Shared select for event scope rows: label parts plus the geographic codes
/// the accessible-set paths match on. Offline events resolve their area via
/// the venue, online events attach to an area directly.
const EVENT_SELECT: &str = "SELECT e.id, e.name, v.street, a.country_code, a.region_code \
     FROM events e \
     LEFT JOIN venues v ON v.id = e.venue_id \
     LEFT JOIN areas a ON a.id = COALESCE(v.area_id, e.area_id)";

type EventRow = (Uuid, String, Option<String>, Option<String>, Option<String>);

fn event_scope(row: EventRow) -> EventScope {
    let (id, name, street, country_code, region_code) = row;
    let label = match street {
        Some(street) => format!("{}, {}", name, street),
        None => name,
    };
    EventScope {
        id,
        label,
        country_code,
        region_code,
        persisted: true,
    }
}

fn country_scope(row: (Uuid, String, String, bool)) -> CountryScope {
    CountryScope {
        id: row.0,
        country_code: row.1,
        name: row.2,
        enable_regions: row.3,
        persisted: true,
    }
}

fn region_scope(row: (Uuid, String, String, String)) -> RegionScope {
    RegionScope {
        id: row.0,
        region_code: row.1,
        country_code: row.2,
        name: row.3,
        persisted: true,
    }
}

pub struct PgDelegationStore {
    pool: PgPool,
}

impl PgDelegationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DelegationStore for PgDelegationStore {
    async fn manager_scopes(&self, manager_id: Uuid) -> Result<ManagerScopes, DelegationError> {
        let administrator: Option<(bool,)> =
            sqlx::query_as("SELECT administrator FROM managers WHERE id = $1")
                .bind(manager_id)
                .fetch_optional(&self.pool)
                .await?;
        let (administrator,) =
            administrator.ok_or(DelegationError::UnknownManager(manager_id))?;

        let countries: Vec<(Uuid, String, String, bool)> = sqlx::query_as(
            "SELECT c.id, c.country_code, c.name, c.enable_regions \
             FROM countries c \
             JOIN managed_records mr ON mr.target_id = c.id AND mr.target_kind = 'country' \
             WHERE mr.manager_id = $1 \
             ORDER BY mr.id",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;

        let regions: Vec<(Uuid, String, String, String)> = sqlx::query_as(
            "SELECT r.id, r.region_code, r.country_code, r.name \
             FROM regions r \
             JOIN managed_records mr ON mr.target_id = r.id AND mr.target_kind = 'region' \
             WHERE mr.manager_id = $1 \
             ORDER BY mr.id",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;

        let areas: Vec<(Uuid, String, String, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT a.id, a.name, a.country_code, a.region_code, a.time_zone \
             FROM areas a \
             JOIN managed_records mr ON mr.target_id = a.id AND mr.target_kind = 'area' \
             WHERE mr.manager_id = $1 \
             ORDER BY mr.id",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;

        let events: Vec<EventRow> = sqlx::query_as(&format!(
            "{EVENT_SELECT} \
             JOIN managed_records mr ON mr.target_id = e.id AND mr.target_kind = 'event' \
             WHERE mr.manager_id = $1 \
             ORDER BY mr.id",
        ))
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;

        let clients: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT cl.id, cl.label \
             FROM clients cl \
             JOIN managed_records mr ON mr.target_id = cl.id AND mr.target_kind = 'client' \
             WHERE mr.manager_id = $1 \
             ORDER BY mr.id",
        )
        .bind(manager_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ManagerScopes {
            manager_id,
            administrator,
            countries: countries.into_iter().map(country_scope).collect(),
            regions: regions.into_iter().map(region_scope).collect(),
            areas: areas
                .into_iter()
                .map(|(id, name, country_code, region_code, time_zone)| AreaScope {
                    id,
                    name,
                    country_code,
                    region_code,
                    time_zone,
                    persisted: true,
                })
                .collect(),
            events: events.into_iter().map(event_scope).collect(),
            clients: clients
                .into_iter()
                .map(|(id, label)| ClientScope {
                    id,
                    label,
                    persisted: true,
                })
                .collect(),
        })
    }

    async fn manager_scopes_bulk(
        &self,
        manager_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ManagerScopes>, DelegationError> {
        let flags: Vec<(Uuid, bool)> =
            sqlx::query_as("SELECT id, administrator FROM managers WHERE id = ANY($1)")
                .bind(manager_ids)
                .fetch_all(&self.pool)
                .await?;

        let mut result: HashMap<Uuid, ManagerScopes> = flags
            .into_iter()
            .map(|(manager_id, administrator)| {
                (
                    manager_id,
                    ManagerScopes {
                        manager_id,
                        administrator,
                        ..ManagerScopes::default()
                    },
                )
            })
            .collect();

        let countries: Vec<(Uuid, Uuid, String, String, bool)> = sqlx::query_as(
            "SELECT mr.manager_id, c.id, c.country_code, c.name, c.enable_regions \
             FROM countries c \
             JOIN managed_records mr ON mr.target_id = c.id AND mr.target_kind = 'country' \
             WHERE mr.manager_id = ANY($1) \
             ORDER BY mr.id",
        )
        .bind(manager_ids)
        .fetch_all(&self.pool)
        .await?;
        for (manager_id, id, country_code, name, enable_regions) in countries {
            if let Some(scopes) = result.get_mut(&manager_id) {
                scopes
                    .countries
                    .push(country_scope((id, country_code, name, enable_regions)));
            }
        }

        let regions: Vec<(Uuid, Uuid, String, String, String)> = sqlx::query_as(
            "SELECT mr.manager_id, r.id, r.region_code, r.country_code, r.name \
             FROM regions r \
             JOIN managed_records mr ON mr.target_id = r.id AND mr.target_kind = 'region' \
             WHERE mr.manager_id = ANY($1) \
             ORDER BY mr.id",
        )
        .bind(manager_ids)
        .fetch_all(&self.pool)
        .await?;
        for (manager_id, id, region_code, country_code, name) in regions {
            if let Some(scopes) = result.get_mut(&manager_id) {
                scopes
                    .regions
                    .push(region_scope((id, region_code, country_code, name)));
            }
        }

        let areas: Vec<(Uuid, Uuid, String, String, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT mr.manager_id, a.id, a.name, a.country_code, a.region_code, a.time_zone \
                 FROM areas a \
                 JOIN managed_records mr ON mr.target_id = a.id AND mr.target_kind = 'area' \
                 WHERE mr.manager_id = ANY($1) \
                 ORDER BY mr.id",
            )
            .bind(manager_ids)
            .fetch_all(&self.pool)
            .await?;
        for (manager_id, id, name, country_code, region_code, time_zone) in areas {
            if let Some(scopes) = result.get_mut(&manager_id) {
                scopes.areas.push(AreaScope {
                    id,
                    name,
                    country_code,
                    region_code,
                    time_zone,
                    persisted: true,
                });
            }
        }

        let events: Vec<(Uuid, Uuid, String, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT mr.manager_id, e.id, e.name, v.street, a.country_code, a.region_code \
                 FROM events e \
                 LEFT JOIN venues v ON v.id = e.venue_id \
                 LEFT JOIN areas a ON a.id = COALESCE(v.area_id, e.area_id) \
                 JOIN managed_records mr ON mr.target_id = e.id AND mr.target_kind = 'event' \
                 WHERE mr.manager_id = ANY($1) \
                 ORDER BY mr.id",
            )
            .bind(manager_ids)
            .fetch_all(&self.pool)
            .await?;
        for (manager_id, id, name, street, country_code, region_code) in events {
            if let Some(scopes) = result.get_mut(&manager_id) {
                scopes
                    .events
                    .push(event_scope((id, name, street, country_code, region_code)));
            }
        }

        let clients: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
            "SELECT mr.manager_id, cl.id, cl.label \
             FROM clients cl \
             JOIN managed_records mr ON mr.target_id = cl.id AND mr.target_kind = 'client' \
             WHERE mr.manager_id = ANY($1) \
             ORDER BY mr.id",
        )
        .bind(manager_ids)
        .fetch_all(&self.pool)
        .await?;
        for (manager_id, id, label) in clients {
            if let Some(scopes) = result.get_mut(&manager_id) {
                scopes.clients.push(ClientScope {
                    id,
                    label,
                    persisted: true,
                });
            }
        }

        Ok(result)
    }

    async fn parent_of(
        &self,
        node: &DelegationNode,
    ) -> Result<Option<DelegationNode>, DelegationError> {
        match node {
            DelegationNode::Manager(id) => {
                let scopes = self.manager_scopes(*id).await?;
                Ok(scopes.parent().map(|p| p.node()))
            }
            DelegationNode::Country(_) => Ok(None),
            DelegationNode::Region(id) => {
                let row: Option<(Option<Uuid>,)> = sqlx::query_as(
                    "SELECT c.id FROM regions r \
                     LEFT JOIN countries c ON c.country_code = r.country_code \
                     WHERE r.id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
                Ok(row
                    .and_then(|(country,)| country)
                    .map(DelegationNode::Country))
            }
            DelegationNode::Area(id) => {
                let row: Option<(Option<Uuid>, Option<Uuid>)> = sqlx::query_as(
                    "SELECT r.id, c.id FROM areas a \
                     LEFT JOIN regions r ON r.region_code = a.region_code \
                     LEFT JOIN countries c ON c.country_code = a.country_code \
                     WHERE a.id = $1",
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
                Ok(row.and_then(|(region, country)| {
                    region
                        .map(DelegationNode::Region)
                        .or(country.map(DelegationNode::Country))
                }))
            }
            DelegationNode::Event(id) => {
                let row: Option<(Option<Uuid>, Option<Uuid>)> =
                    sqlx::query_as("SELECT venue_id, area_id FROM events WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                Ok(row.and_then(|(venue, area)| {
                    venue
                        .map(DelegationNode::Venue)
                        .or(area.map(DelegationNode::Area))
                }))
            }
            DelegationNode::Venue(id) => {
                let row: Option<(Uuid,)> =
                    sqlx::query_as("SELECT area_id FROM venues WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                Ok(row.map(|(area,)| DelegationNode::Area(area)))
            }
            DelegationNode::Client(id) => {
                let row: Option<(Option<Uuid>,)> =
                    sqlx::query_as("SELECT area_id FROM clients WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                Ok(row.and_then(|(area,)| area).map(DelegationNode::Area))
            }
            DelegationNode::Picture(id) => {
                let row: Option<(Uuid,)> =
                    sqlx::query_as("SELECT venue_id FROM pictures WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                Ok(row.map(|(venue,)| DelegationNode::Venue(venue)))
            }
        }
    }

    async fn all_countries(&self) -> Result<Vec<CountryScope>, DelegationError> {
        let rows: Vec<(Uuid, String, String, bool)> = sqlx::query_as(
            "SELECT id, country_code, name, enable_regions FROM countries ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(country_scope).collect())
    }

    async fn countries_by_codes(
        &self,
        codes: &[String],
    ) -> Result<Vec<CountryScope>, DelegationError> {
        let rows: Vec<(Uuid, String, String, bool)> = sqlx::query_as(
            "SELECT id, country_code, name, enable_regions FROM countries \
             WHERE country_code = ANY($1) ORDER BY name",
        )
        .bind(codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(country_scope).collect())
    }

    async fn regions(
        &self,
        country_code: Option<&str>,
    ) -> Result<Vec<RegionScope>, DelegationError> {
        let rows: Vec<(Uuid, String, String, String)> = match country_code {
            Some(code) => {
                sqlx::query_as(
                    "SELECT id, region_code, country_code, name FROM regions \
                     WHERE country_code = $1 ORDER BY name",
                )
                .bind(code)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, region_code, country_code, name FROM regions ORDER BY name",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(region_scope).collect())
    }

    async fn regions_in_countries(
        &self,
        country_codes: &[String],
    ) -> Result<Vec<RegionScope>, DelegationError> {
        let rows: Vec<(Uuid, String, String, String)> = sqlx::query_as(
            "SELECT id, region_code, country_code, name FROM regions \
             WHERE country_code = ANY($1) ORDER BY name",
        )
        .bind(country_codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(region_scope).collect())
    }

    async fn regions_by_codes(
        &self,
        region_codes: &[String],
    ) -> Result<Vec<RegionScope>, DelegationError> {
        let rows: Vec<(Uuid, String, String, String)> = sqlx::query_as(
            "SELECT id, region_code, country_code, name FROM regions \
             WHERE region_code = ANY($1) ORDER BY name",
        )
        .bind(region_codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(region_scope).collect())
    }

    async fn all_events(&self) -> Result<Vec<EventScope>, DelegationError> {
        let rows: Vec<EventRow> =
            sqlx::query_as(&format!("{EVENT_SELECT} ORDER BY e.updated_at DESC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(event_scope).collect())
    }

    async fn events_in_countries(
        &self,
        country_codes: &[String],
    ) -> Result<Vec<EventScope>, DelegationError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{EVENT_SELECT} WHERE a.country_code = ANY($1) ORDER BY e.updated_at DESC",
        ))
        .bind(country_codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(event_scope).collect())
    }

    async fn events_in_regions(
        &self,
        region_codes: &[String],
    ) -> Result<Vec<EventScope>, DelegationError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{EVENT_SELECT} WHERE a.region_code = ANY($1) ORDER BY e.updated_at DESC",
        ))
        .bind(region_codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(event_scope).collect())
    }

    async fn events_in_areas(&self, area_ids: &[Uuid]) -> Result<Vec<EventScope>, DelegationError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!(
            "{EVENT_SELECT} WHERE COALESCE(v.area_id, e.area_id) = ANY($1) \
             ORDER BY e.updated_at DESC",
        ))
        .bind(area_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(event_scope).collect())
    }
}
