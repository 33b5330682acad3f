//! Scheduler-extender wire types.
//!
//! A minimal mirror of the Kubernetes `ExtenderArgs` /
//! `HostPriorityList` contract: only the fields the prioritize verb
//! needs. Candidate names come from `Nodes.items[].metadata.name`,
//! falling back to `NodeNames` when the scheduler is configured to
//! send names only.

use serde::{Deserialize, Serialize};

/// Inbound prioritize request.
#[derive(Debug, Default, Deserialize)]
pub struct ExtenderArgs {
    #[serde(rename = "Nodes")]
    pub nodes: Option<NodeList>,
    #[serde(rename = "NodeNames")]
    pub node_names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct NodeList {
    #[serde(default)]
    pub items: Vec<NodeItem>,
}

#[derive(Debug, Deserialize)]
pub struct NodeItem {
    pub metadata: NodeMetadata,
}

#[derive(Debug, Deserialize)]
pub struct NodeMetadata {
    pub name: String,
}

/// One scored candidate in the response list.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPriority {
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Score")]
    pub score: i64,
}

impl ExtenderArgs {
    /// Candidate node names in request order.
    pub fn candidate_names(&self) -> Vec<String> {
        if let Some(nodes) = &self.nodes {
            return nodes.items.iter().map(|n| n.metadata.name.clone()).collect();
        }
        self.node_names.clone().unwrap_or_default()
    }
}
