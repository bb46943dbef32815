use serde::Serialize;
use uuid::Uuid;

use crate::hierarchy::store::DelegationNode;

/// A manager's position in the delegation hierarchy, derived (never stored)
/// from the administrator flag and the owned-entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Worldwide,
    Country,
    Local,
    Client,
    Event,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryScope {
    pub id: Uuid,
    pub country_code: String,
    pub name: String,
    /// Opt-in to region-level drill-down for this country.
    pub enable_regions: bool,
    #[serde(skip)]
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionScope {
    pub id: Uuid,
    pub region_code: String,
    pub country_code: String,
    pub name: String,
    #[serde(skip)]
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaScope {
    pub id: Uuid,
    pub name: String,
    pub country_code: String,
    pub region_code: Option<String>,
    pub time_zone: Option<String>,
    #[serde(skip)]
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventScope {
    pub id: Uuid,
    pub label: String,
    pub country_code: Option<String>,
    pub region_code: Option<String>,
    #[serde(skip)]
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientScope {
    pub id: Uuid,
    pub label: String,
    #[serde(skip)]
    pub persisted: bool,
}

/// The loaded owned-entity collections of a single manager. This is the input
/// to every tier/parent/authority decision, so it can be built from SQL or
/// assembled by hand in tests.
#[derive(Debug, Clone, Default)]
pub struct ManagerScopes {
    pub manager_id: Uuid,
    pub administrator: bool,
    pub countries: Vec<CountryScope>,
    pub regions: Vec<RegionScope>,
    pub areas: Vec<AreaScope>,
    pub events: Vec<EventScope>,
    pub clients: Vec<ClientScope>,
}

/// The single upward delegation target of a manager: the first entity of the
/// tier-appropriate collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScopeParent<'a> {
    Country(&'a CountryScope),
    Region(&'a RegionScope),
    Area(&'a AreaScope),
    Event(&'a EventScope),
    Client(&'a ClientScope),
}

impl<'a> ScopeParent<'a> {
    pub fn persisted(&self) -> bool {
        match self {
            ScopeParent::Country(c) => c.persisted,
            ScopeParent::Region(r) => r.persisted,
            ScopeParent::Area(a) => a.persisted,
            ScopeParent::Event(e) => e.persisted,
            ScopeParent::Client(c) => c.persisted,
        }
    }

    pub fn node(&self) -> DelegationNode {
        match self {
            ScopeParent::Country(c) => DelegationNode::Country(c.id),
            ScopeParent::Region(r) => DelegationNode::Region(r.id),
            ScopeParent::Area(a) => DelegationNode::Area(a.id),
            ScopeParent::Event(e) => DelegationNode::Event(e.id),
            ScopeParent::Client(c) => DelegationNode::Client(c.id),
        }
    }
}

impl ManagerScopes {
    /// Tier resolution in strict precedence order; first match wins, a manager
    /// owning both a country and an event classifies as country.
    pub fn tier(&self) -> Tier {
        if self.administrator {
            Tier::Worldwide
        } else if !self.countries.is_empty() {
            Tier::Country
        } else if !self.regions.is_empty() || !self.areas.is_empty() {
            Tier::Local
        } else if !self.clients.is_empty() {
            Tier::Client
        } else if !self.events.is_empty() {
            Tier::Event
        } else {
            Tier::None
        }
    }

    /// First member of the tier-appropriate collection. Absent for worldwide
    /// and unassigned managers, and when the first member is an unpersisted
    /// placeholder (in-progress record construction must not produce a
    /// false-positive parent).
    pub fn parent(&self) -> Option<ScopeParent<'_>> {
        let parent = match self.tier() {
            Tier::Country => self.countries.first().map(ScopeParent::Country),
            Tier::Local => self
                .regions
                .first()
                .map(ScopeParent::Region)
                .or_else(|| self.areas.first().map(ScopeParent::Area)),
            Tier::Client => self.clients.first().map(ScopeParent::Client),
            Tier::Event => self.events.first().map(ScopeParent::Event),
            Tier::Worldwide | Tier::None => None,
        }?;

        parent.persisted().then_some(parent)
    }

    /// Direct ownership check against the loaded collections. Managers never
    /// own venues or pictures directly; those delegate upward.
    pub fn owns(&self, node: &DelegationNode) -> bool {
        match node {
            DelegationNode::Country(id) => self.countries.iter().any(|c| c.id == *id),
            DelegationNode::Region(id) => self.regions.iter().any(|r| r.id == *id),
            DelegationNode::Area(id) => self.areas.iter().any(|a| a.id == *id),
            DelegationNode::Event(id) => self.events.iter().any(|e| e.id == *id),
            DelegationNode::Client(id) => self.clients.iter().any(|c| c.id == *id),
            DelegationNode::Manager(_) | DelegationNode::Venue(_) | DelegationNode::Picture(_) => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn country(code: &str) -> CountryScope {
        CountryScope {
            id: Uuid::new_v4(),
            country_code: code.to_string(),
            name: code.to_string(),
            enable_regions: true,
            persisted: true,
        }
    }

    fn region(code: &str, country_code: &str) -> RegionScope {
        RegionScope {
            id: Uuid::new_v4(),
            region_code: code.to_string(),
            country_code: country_code.to_string(),
            name: code.to_string(),
            persisted: true,
        }
    }

    fn event(label: &str) -> EventScope {
        EventScope {
            id: Uuid::new_v4(),
            label: label.to_string(),
            country_code: None,
            region_code: None,
            persisted: true,
        }
    }

    #[test]
    fn tier_is_total_and_defaults_to_none() {
        let scopes = ManagerScopes::default();
        assert_eq!(scopes.tier(), Tier::None);
        assert!(scopes.parent().is_none());
    }

    #[test]
    fn administrator_is_worldwide_regardless_of_scopes() {
        let scopes = ManagerScopes {
            administrator: true,
            countries: vec![country("IN")],
            events: vec![event("weekly")],
            ..Default::default()
        };
        assert_eq!(scopes.tier(), Tier::Worldwide);
        assert!(scopes.parent().is_none());
    }

    #[test]
    fn country_ownership_beats_event_ownership() {
        let scopes = ManagerScopes {
            countries: vec![country("IN")],
            events: vec![event("weekly")],
            ..Default::default()
        };
        assert_eq!(scopes.tier(), Tier::Country);
    }

    #[test]
    fn regions_and_areas_both_classify_as_local() {
        let with_region = ManagerScopes {
            regions: vec![region("IN-KA", "IN")],
            ..Default::default()
        };
        assert_eq!(with_region.tier(), Tier::Local);

        let with_area = ManagerScopes {
            areas: vec![AreaScope {
                id: Uuid::new_v4(),
                name: "Bengaluru".to_string(),
                country_code: "IN".to_string(),
                region_code: Some("IN-KA".to_string()),
                time_zone: None,
                persisted: true,
            }],
            ..Default::default()
        };
        assert_eq!(with_area.tier(), Tier::Local);
    }

    #[test]
    fn client_tier_beats_event_tier() {
        let scopes = ManagerScopes {
            clients: vec![ClientScope {
                id: Uuid::new_v4(),
                label: "school".to_string(),
                persisted: true,
            }],
            events: vec![event("weekly")],
            ..Default::default()
        };
        assert_eq!(scopes.tier(), Tier::Client);
    }

    #[test]
    fn parent_prefers_regions_over_areas_at_local_tier() {
        let r = region("IN-KA", "IN");
        let scopes = ManagerScopes {
            regions: vec![r.clone()],
            areas: vec![AreaScope {
                id: Uuid::new_v4(),
                name: "Bengaluru".to_string(),
                country_code: "IN".to_string(),
                region_code: None,
                time_zone: None,
                persisted: true,
            }],
            ..Default::default()
        };
        assert_eq!(scopes.parent(), Some(ScopeParent::Region(&r)));
    }

    #[test]
    fn unpersisted_first_member_yields_no_parent() {
        let mut c = country("IN");
        c.persisted = false;
        let scopes = ManagerScopes {
            countries: vec![c],
            ..Default::default()
        };
        assert_eq!(scopes.tier(), Tier::Country);
        assert!(scopes.parent().is_none());
    }

    #[test]
    fn owns_checks_identity_per_kind() {
        let c = country("IN");
        let scopes = ManagerScopes {
            countries: vec![c.clone()],
            ..Default::default()
        };
        assert!(scopes.owns(&DelegationNode::Country(c.id)));
        assert!(!scopes.owns(&DelegationNode::Region(c.id)));
        assert!(!scopes.owns(&DelegationNode::Venue(c.id)));
    }
}
