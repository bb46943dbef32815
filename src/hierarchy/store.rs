use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::hierarchy::scopes::{CountryScope, EventScope, ManagerScopes, RegionScope};

/// One node of the delegation tree. Grantable scope targets plus the leaf
/// entities (venues, pictures) that only ever delegate upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DelegationNode {
    Manager(Uuid),
    Country(Uuid),
    Region(Uuid),
    Area(Uuid),
    Event(Uuid),
    Venue(Uuid),
    Client(Uuid),
    Picture(Uuid),
}

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("unknown manager: {0}")]
    UnknownManager(Uuid),

    #[error("delegation chain exceeded the depth bound")]
    DepthExceeded,

    #[error("store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for DelegationError {
    fn from(err: sqlx::Error) -> Self {
        DelegationError::Store(err.to_string())
    }
}

/// Read-only view of the delegation tree. The authority walk and the
/// accessible-set queries are written against this trait so they can run over
/// Postgres in production and an in-memory fixture in tests.
#[async_trait]
pub trait DelegationStore: Send + Sync {
    /// Load a manager's owned-entity collections and administrator flag.
    async fn manager_scopes(&self, manager_id: Uuid) -> Result<ManagerScopes, DelegationError>;

    /// Scope loads for many managers at once; unknown ids are simply absent
    /// from the result. List endpoints use this to avoid one load per row.
    async fn manager_scopes_bulk(
        &self,
        manager_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ManagerScopes>, DelegationError>;

    /// One step up the delegation chain; `None` at the root.
    async fn parent_of(
        &self,
        node: &DelegationNode,
    ) -> Result<Option<DelegationNode>, DelegationError>;

    // Accessible-set lookups
    async fn all_countries(&self) -> Result<Vec<CountryScope>, DelegationError>;
    async fn countries_by_codes(
        &self,
        codes: &[String],
    ) -> Result<Vec<CountryScope>, DelegationError>;

    async fn regions(&self, country_code: Option<&str>) -> Result<Vec<RegionScope>, DelegationError>;
    async fn regions_in_countries(
        &self,
        country_codes: &[String],
    ) -> Result<Vec<RegionScope>, DelegationError>;
    async fn regions_by_codes(
        &self,
        region_codes: &[String],
    ) -> Result<Vec<RegionScope>, DelegationError>;

    async fn all_events(&self) -> Result<Vec<EventScope>, DelegationError>;
    async fn events_in_countries(
        &self,
        country_codes: &[String],
    ) -> Result<Vec<EventScope>, DelegationError>;
    async fn events_in_regions(
        &self,
        region_codes: &[String],
    ) -> Result<Vec<EventScope>, DelegationError>;
    async fn events_in_areas(&self, area_ids: &[Uuid]) -> Result<Vec<EventScope>, DelegationError>;
}

/// In-memory delegation tree for unit tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub managers: HashMap<Uuid, ManagerScopes>,
    pub countries: Vec<CountryScope>,
    pub regions: Vec<RegionScope>,
    /// Full event universe; ownership paths resolve through `event_parents`.
    pub events: Vec<EventScope>,
    /// Event id -> hosting Venue (offline) or Area (online).
    pub event_parents: HashMap<Uuid, DelegationNode>,
    pub venue_areas: HashMap<Uuid, Uuid>,
    pub picture_venues: HashMap<Uuid, Uuid>,
    pub client_areas: HashMap<Uuid, Uuid>,
    /// Area id -> (region_code, country_code)
    pub area_parents: HashMap<Uuid, (Option<String>, String)>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn insert_manager(&mut self, scopes: ManagerScopes) {
        self.managers.insert(scopes.manager_id, scopes);
    }

    fn country_node_by_code(&self, code: &str) -> Option<DelegationNode> {
        self.countries
            .iter()
            .find(|c| c.country_code == code)
            .map(|c| DelegationNode::Country(c.id))
    }

    fn region_node_by_code(&self, code: &str) -> Option<DelegationNode> {
        self.regions
            .iter()
            .find(|r| r.region_code == code)
            .map(|r| DelegationNode::Region(r.id))
    }

    fn event_area_id(&self, event_id: &Uuid) -> Option<Uuid> {
        match self.event_parents.get(event_id)? {
            DelegationNode::Venue(venue_id) => self.venue_areas.get(venue_id).copied(),
            DelegationNode::Area(area_id) => Some(*area_id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl DelegationStore for MemoryStore {
    async fn manager_scopes(&self, manager_id: Uuid) -> Result<ManagerScopes, DelegationError> {
        self.managers
            .get(&manager_id)
            .cloned()
            .ok_or(DelegationError::UnknownManager(manager_id))
    }

    async fn manager_scopes_bulk(
        &self,
        manager_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, ManagerScopes>, DelegationError> {
        Ok(manager_ids
            .iter()
            .filter_map(|id| self.managers.get(id).map(|s| (*id, s.clone())))
            .collect())
    }

    async fn parent_of(
        &self,
        node: &DelegationNode,
    ) -> Result<Option<DelegationNode>, DelegationError> {
        let parent = match node {
            DelegationNode::Manager(id) => {
                let scopes = self.manager_scopes(*id).await?;
                scopes.parent().map(|p| p.node())
            }
            DelegationNode::Country(_) => None,
            DelegationNode::Region(id) => self
                .regions
                .iter()
                .find(|r| r.id == *id)
                .and_then(|r| self.country_node_by_code(&r.country_code)),
            DelegationNode::Area(id) => self.area_parents.get(id).and_then(|(region, country)| {
                region
                    .as_deref()
                    .and_then(|code| self.region_node_by_code(code))
                    .or_else(|| self.country_node_by_code(country))
            }),
            DelegationNode::Event(id) => self.event_parents.get(id).copied(),
            DelegationNode::Venue(id) => self.venue_areas.get(id).copied().map(DelegationNode::Area),
            DelegationNode::Client(id) => {
                self.client_areas.get(id).copied().map(DelegationNode::Area)
            }
            DelegationNode::Picture(id) => self
                .picture_venues
                .get(id)
                .copied()
                .map(DelegationNode::Venue),
        };
        Ok(parent)
    }

    async fn all_countries(&self) -> Result<Vec<CountryScope>, DelegationError> {
        Ok(self.countries.clone())
    }

    async fn countries_by_codes(
        &self,
        codes: &[String],
    ) -> Result<Vec<CountryScope>, DelegationError> {
        Ok(self
            .countries
            .iter()
            .filter(|c| codes.contains(&c.country_code))
            .cloned()
            .collect())
    }

    async fn regions(
        &self,
        country_code: Option<&str>,
    ) -> Result<Vec<RegionScope>, DelegationError> {
        Ok(self
            .regions
            .iter()
            .filter(|r| country_code.map_or(true, |code| r.country_code == code))
            .cloned()
            .collect())
    }

    async fn regions_in_countries(
        &self,
        country_codes: &[String],
    ) -> Result<Vec<RegionScope>, DelegationError> {
        Ok(self
            .regions
            .iter()
            .filter(|r| country_codes.contains(&r.country_code))
            .cloned()
            .collect())
    }

    async fn regions_by_codes(
        &self,
        region_codes: &[String],
    ) -> Result<Vec<RegionScope>, DelegationError> {
        Ok(self
            .regions
            .iter()
            .filter(|r| region_codes.contains(&r.region_code))
            .cloned()
            .collect())
    }

    async fn all_events(&self) -> Result<Vec<EventScope>, DelegationError> {
        Ok(self.events.clone())
    }

    async fn events_in_countries(
        &self,
        country_codes: &[String],
    ) -> Result<Vec<EventScope>, DelegationError> {
        Ok(self
            .events
            .iter()
            .filter(|e| {
                e.country_code
                    .as_ref()
                    .map_or(false, |code| country_codes.contains(code))
            })
            .cloned()
            .collect())
    }

    async fn events_in_regions(
        &self,
        region_codes: &[String],
    ) -> Result<Vec<EventScope>, DelegationError> {
        Ok(self
            .events
            .iter()
            .filter(|e| {
                e.region_code
                    .as_ref()
                    .map_or(false, |code| region_codes.contains(code))
            })
            .cloned()
            .collect())
    }

    async fn events_in_areas(&self, area_ids: &[Uuid]) -> Result<Vec<EventScope>, DelegationError> {
        Ok(self
            .events
            .iter()
            .filter(|e| {
                self.event_area_id(&e.id)
                    .map_or(false, |area| area_ids.contains(&area))
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bulk_scope_load_skips_unknown_ids() {
        let mut store = MemoryStore::default();
        let known = ManagerScopes {
            manager_id: Uuid::new_v4(),
            ..Default::default()
        };
        store.insert_manager(known.clone());

        let unknown = Uuid::new_v4();
        let loaded = store
            .manager_scopes_bulk(&[known.manager_id, unknown])
            .await
            .unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains_key(&known.manager_id));
        assert!(!loaded.contains_key(&unknown));
    }
}
