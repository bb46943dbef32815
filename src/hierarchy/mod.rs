//! Delegation hierarchy core: manager tiers, the recursive authority walk and
//! the accessible-set queries. Everything here is pure decision logic over a
//! `DelegationStore`; the HTTP and SQL layers live elsewhere.

pub mod accessible;
pub mod authority;
pub mod scopes;
pub mod store;

pub use authority::{
    is_ancestor_or_self, is_ancestor_or_self_of, is_delegated_ancestor, is_strict_ancestor,
};
pub use scopes::{
    AreaScope, ClientScope, CountryScope, EventScope, ManagerScopes, RegionScope, ScopeParent, Tier,
};
pub use store::{DelegationError, DelegationNode, DelegationStore};
#[cfg(test)]
pub use store::MemoryStore;
