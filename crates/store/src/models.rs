//! Records held by the graph store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of node a reference can point from or to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Cluster,
    Content,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Cluster => "cluster",
            NodeKind::Content => "content",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cluster" => Some(NodeKind::Cluster),
            "content" => Some(NodeKind::Content),
            _ => None,
        }
    }
}

/// Address of a graph node.
///
/// Displayed and parsed as `cluster:<uuid>` / `content:<uuid>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Cluster(Uuid),
    Content(Uuid),
}

impl NodeRef {
    pub fn new(kind: NodeKind, id: Uuid) -> Self {
        match kind {
            NodeKind::Cluster => NodeRef::Cluster(id),
            NodeKind::Content => NodeRef::Content(id),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Cluster(_) => NodeKind::Cluster,
            NodeRef::Content(_) => NodeKind::Content,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            NodeRef::Cluster(id) | NodeRef::Content(id) => *id,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid node reference {0:?}, expected cluster:<uuid> or content:<uuid>")]
pub struct NodeRefParseError(pub String);

impl FromStr for NodeRef {
    type Err = NodeRefParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| NodeRefParseError(s.to_string()))?;
        let kind = NodeKind::parse(kind).ok_or_else(|| NodeRefParseError(s.to_string()))?;
        let id = Uuid::parse_str(id).map_err(|_| NodeRefParseError(s.to_string()))?;
        Ok(NodeRef::new(kind, id))
    }
}

/// Top-level owner of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Concurrency token; changes on every accepted write.
    pub update_id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A node inside exactly one cluster, holding at most one stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: Uuid,
    pub cluster_id: Uuid,
    pub content_type: String,
    pub state: String,
    pub update_id: Uuid,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Metadata of the payload bound to a content.
///
/// `payload_key` is `None` for empty values, which have nothing in object
/// storage to release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentValue {
    pub content_id: Uuid,
    pub payload_key: Option<String>,
    pub size: i64,
    pub created_at: i64,
}

/// Directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: Uuid,
    pub source: NodeRef,
    pub target: NodeRef,
    pub group: String,
    /// Delete this reference whenever its target is deleted.
    pub delete_recursive: bool,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCluster {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Update guarded by the `update_id` the caller last saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterUpdate {
    pub update_id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContent {
    pub cluster_id: Uuid,
    pub content_type: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub update_id: Uuid,
    /// Move the content into another cluster.
    pub cluster_id: Option<Uuid>,
    pub content_type: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReference {
    pub source: NodeRef,
    pub target: NodeRef,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub delete_recursive: bool,
}

/// Result of a guarded update.
///
/// When `write_ok` is false the update was rejected because the record had
/// moved on, and `record` holds the current state (with its fresh
/// `update_id`) so the caller can try again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult<T> {
    pub write_ok: bool,
    pub record: T,
}

/// References touching a node, split by direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReferences {
    pub incoming: Vec<Reference>,
    pub outgoing: Vec<Reference>,
}
