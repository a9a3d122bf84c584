//! # Actions
//!
//! An [`Action`] names the kind of access an operation exercises on a graph
//! node. The set is closed: grants issued by an authorization service are
//! expressed in these six words, and nothing else parses.
//!
//! ## Wire encoding
//!
//! The string forms (`fetch`, `update`, `view`, `manage`, `stored_delete`,
//! `stored_replace`) are shared with remote clients and must never change.
//! New actions may be added, existing encodings may not be renamed.
//!
//! Deciding whether an action is *allowed* is not done here. Callers hand the
//! action to an access gate owned by the store layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A permission kind that can be granted on a cluster or content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Read a stored value once it is addressable.
    Fetch,
    /// Write metadata, create children or add references.
    Update,
    /// Read metadata.
    View,
    /// Create or delete the node itself.
    Manage,
    /// Remove the stored payload while keeping the content record.
    StoredDelete,
    /// Overwrite an existing stored payload.
    StoredReplace,
}

impl Action {
    /// Every action, in wire order.
    pub const ALL: [Action; 6] = [
        Action::Fetch,
        Action::Update,
        Action::View,
        Action::Manage,
        Action::StoredDelete,
        Action::StoredReplace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Fetch => "fetch",
            Action::Update => "update",
            Action::View => "view",
            Action::Manage => "manage",
            Action::StoredDelete => "stored_delete",
            Action::StoredReplace => "stored_replace",
        }
    }

    /// Whether the action touches the externally stored payload rather than
    /// the metadata record.
    pub fn is_stored(&self) -> bool {
        matches!(
            self,
            Action::Fetch | Action::StoredDelete | Action::StoredReplace
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action: {0:?}")]
pub struct ActionParseError(pub String);

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ActionParseError(s.to_string()))
    }
}

impl TryFrom<&str> for Action {
    type Error = ActionParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings_are_stable() {
        let encoded: Vec<&str> = Action::ALL.iter().map(Action::as_str).collect();
        assert_eq!(
            encoded,
            vec![
                "fetch",
                "update",
                "view",
                "manage",
                "stored_delete",
                "stored_replace"
            ]
        );
    }

    #[test]
    fn test_parse_round_trips_every_action() {
        for action in Action::ALL {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }

    #[test]
    fn test_unknown_action_rejected() {
        let err = "delete".parse::<Action>().unwrap_err();
        assert_eq!(err, ActionParseError("delete".to_string()));

        // Case matters on the wire
        assert!("FETCH".parse::<Action>().is_err());
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let json = serde_json::to_string(&Action::StoredReplace).unwrap();
        assert_eq!(json, "\"stored_replace\"");

        let parsed: Action = serde_json::from_str("\"stored_delete\"").unwrap();
        assert_eq!(parsed, Action::StoredDelete);

        assert!(serde_json::from_str::<Action>("\"admin\"").is_err());
    }

    #[test]
    fn test_stored_actions() {
        assert!(Action::Fetch.is_stored());
        assert!(Action::StoredDelete.is_stored());
        assert!(Action::StoredReplace.is_stored());
        assert!(!Action::View.is_stored());
        assert!(!Action::Update.is_stored());
        assert!(!Action::Manage.is_stored());
    }
}
