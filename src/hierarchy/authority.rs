//! The recursive delegated-authorization check. The legacy tri-state
//! modifier flag is split into three explicit entry points that share one
//! bounded walk up the delegation chain.

use crate::hierarchy::scopes::ManagerScopes;
use crate::hierarchy::store::{DelegationError, DelegationNode, DelegationStore};

/// A well-formed chain is at most four hops (event -> local/client -> country
/// -> worldwide); anything deeper means the tree is malformed.
const MAX_DELEGATION_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Ancestor-or-self, administrator short-circuit active.
    Default,
    /// Self-match suppressed at the first level only.
    StrictAncestor,
    /// Administrator short-circuit suppressed at the first level only.
    IgnoreAdmin,
}

/// Does `actor` manage `target`, where managing yourself counts?
pub async fn is_ancestor_or_self<S>(
    store: &S,
    actor: &ManagerScopes,
    target: DelegationNode,
) -> Result<bool, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    walk(store, actor, target, Mode::Default).await
}

/// Does `actor` strictly manage `target` (self-match excluded)?
pub async fn is_strict_ancestor<S>(
    store: &S,
    actor: &ManagerScopes,
    target: DelegationNode,
) -> Result<bool, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    walk(store, actor, target, Mode::StrictAncestor).await
}

/// `is_ancestor_or_self` for a target manager whose scopes are already
/// loaded. Same outcome as starting the walk at the manager node, without the
/// per-target scope reload; list filtering uses this after a bulk load.
pub async fn is_ancestor_or_self_of<S>(
    store: &S,
    actor: &ManagerScopes,
    target: &ManagerScopes,
) -> Result<bool, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    if target.manager_id == actor.manager_id || actor.administrator {
        return Ok(true);
    }
    match target.parent() {
        Some(parent) => walk(store, actor, parent.node(), Mode::Default).await,
        None => Ok(false),
    }
}

/// Does `actor` hold real delegated authority over `target`, ignoring blanket
/// administrator rights at the first level?
pub async fn is_delegated_ancestor<S>(
    store: &S,
    actor: &ManagerScopes,
    target: DelegationNode,
) -> Result<bool, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    walk(store, actor, target, Mode::IgnoreAdmin).await
}

/// Shared walk. Rules per node, short-circuiting on the first true:
/// 1. the node is the actor itself (definitive: true by default, false under
///    strict mode, which asks for a real superior rather than self)
/// 2. the actor is an administrator (suppressed under ignore-admin mode)
/// 3. the actor owns the node directly
/// 4. recurse to the node's parent; absent parent is false
///
/// Parents of entities are always entities, so a manager node can only appear
/// at the start of the chain; the strict modifier therefore binds exactly one
/// self-match, and the ignore-admin modifier binds the whole walk (delegated
/// authority means the chain itself must reach the actor's scopes).
async fn walk<S>(
    store: &S,
    actor: &ManagerScopes,
    start: DelegationNode,
    mode: Mode,
) -> Result<bool, DelegationError>
where
    S: DelegationStore + ?Sized,
{
    let mut node = start;

    for _ in 0..=MAX_DELEGATION_DEPTH {
        match node {
            DelegationNode::Manager(id) => {
                if id == actor.manager_id {
                    return Ok(mode != Mode::StrictAncestor);
                }
                if actor.administrator && mode != Mode::IgnoreAdmin {
                    return Ok(true);
                }
            }
            _ => {
                if actor.administrator && mode != Mode::IgnoreAdmin {
                    return Ok(true);
                }
                if actor.owns(&node) {
                    return Ok(true);
                }
            }
        }

        match store.parent_of(&node).await? {
            Some(parent) => node = parent,
            None => return Ok(false),
        }
    }

    Err(DelegationError::DepthExceeded)
}
