//! Hook for an external authorization collaborator.
//!
//! The store names the [`Action`] every operation exercises and asks the
//! configured [`AccessGate`] whether it may proceed. Evaluating grants is the
//! gate's business; the store ships only [`AllowAll`].

use std::collections::HashSet;
use std::fmt::Debug;

use async_trait::async_trait;
use common::action::Action;

use crate::models::NodeRef;

#[async_trait]
pub trait AccessGate: Send + Sync + Debug {
    /// Whether `action` may be exercised on `node`.
    async fn admit(&self, action: Action, node: NodeRef) -> bool;
}

/// Admits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl AccessGate for AllowAll {
    async fn admit(&self, _action: Action, _node: NodeRef) -> bool {
        true
    }
}

/// Refuses a fixed set of actions on every node.
#[derive(Debug, Clone, Default)]
pub struct DenyActions(pub HashSet<Action>);

impl FromIterator<Action> for DenyActions {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[async_trait]
impl AccessGate for DenyActions {
    async fn admit(&self, action: Action, _node: NodeRef) -> bool {
        !self.0.contains(&action)
    }
}
