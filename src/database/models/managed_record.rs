use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::hierarchy::DelegationNode;

/// The entity a managed-record link points at. The legacy polymorphic foreign
/// key is re-expressed as a tagged variant with an explicit discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ManagedTarget {
    Country(Uuid),
    Region(Uuid),
    Area(Uuid),
    Event(Uuid),
    Client(Uuid),
}

impl ManagedTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            ManagedTarget::Country(_) => "country",
            ManagedTarget::Region(_) => "region",
            ManagedTarget::Area(_) => "area",
            ManagedTarget::Event(_) => "event",
            ManagedTarget::Client(_) => "client",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ManagedTarget::Country(id)
            | ManagedTarget::Region(id)
            | ManagedTarget::Area(id)
            | ManagedTarget::Event(id)
            | ManagedTarget::Client(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "country" => Some(ManagedTarget::Country(id)),
            "region" => Some(ManagedTarget::Region(id)),
            "area" => Some(ManagedTarget::Area(id)),
            "event" => Some(ManagedTarget::Event(id)),
            "client" => Some(ManagedTarget::Client(id)),
            _ => None,
        }
    }

    pub fn node(&self) -> DelegationNode {
        match self {
            ManagedTarget::Country(id) => DelegationNode::Country(*id),
            ManagedTarget::Region(id) => DelegationNode::Region(*id),
            ManagedTarget::Area(id) => DelegationNode::Area(*id),
            ManagedTarget::Event(id) => DelegationNode::Event(*id),
            ManagedTarget::Client(id) => DelegationNode::Client(*id),
        }
    }
}

/// A row linking one manager to one owned entity. Rows are created and
/// destroyed only by scope grant/revoke; deleting the manager deletes them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ManagedRecord {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub target_kind: String,
    pub target_id: Uuid,
}

impl ManagedRecord {
    pub fn target(&self) -> Option<ManagedTarget> {
        ManagedTarget::from_parts(&self.target_kind, self.target_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminant_round_trips() {
        let id = Uuid::new_v4();
        for target in [
            ManagedTarget::Country(id),
            ManagedTarget::Region(id),
            ManagedTarget::Area(id),
            ManagedTarget::Event(id),
            ManagedTarget::Client(id),
        ] {
            assert_eq!(
                ManagedTarget::from_parts(target.kind(), target.id()),
                Some(target)
            );
        }
    }

    #[test]
    fn unknown_discriminant_is_rejected() {
        assert_eq!(ManagedTarget::from_parts("venue", Uuid::new_v4()), None);
    }
}
