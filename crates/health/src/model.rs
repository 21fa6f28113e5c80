//! Snapshot data model.
//!
//! A [`ClusterSnapshot`] is one point-in-time capture of node and drive
//! health. It is the only unit that is persisted and compared between runs,
//! so the serialized key names here are the on-disk format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node status as reported by the cluster.
///
/// Anything other than `online` or `offline` is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Online,
    Offline,
    Other(String),
}

impl NodeStatus {
    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for NodeStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Other(value),
        }
    }
}

impl From<NodeStatus> for String {
    fn from(value: NodeStatus) -> Self {
        match value {
            NodeStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drive state as reported by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DriveState {
    Healthy,
    /// Any non-healthy state (`missing`, `dead`, ...), kept verbatim.
    Unhealthy(String),
}

impl DriveState {
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Healthy => "healthy",
            Self::Unhealthy(s) => s,
        }
    }
}

impl From<String> for DriveState {
    fn from(value: String) -> Self {
        if value == "healthy" {
            Self::Healthy
        } else {
            Self::Unhealthy(value)
        }
    }
}

impl From<DriveState> for String {
    fn from(value: DriveState) -> Self {
        match value {
            DriveState::Healthy => "healthy".to_string(),
            DriveState::Unhealthy(s) => s,
        }
    }
}

impl fmt::Display for DriveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cluster node. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u64,
    pub status: NodeStatus,
    pub name: String,
    pub uuid: String,
    pub model: String,
    pub serial: String,
}

/// One drive slot. Identity is `id` (`"<node>.<slot>"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveRecord {
    pub id: String,
    pub node_id: u64,
    pub slot: u64,
    pub state: DriveState,
    pub slot_type: String,
    pub disk_type: String,
    pub disk_model: String,
    pub disk_serial: String,
    /// Capacity in bytes, as the decimal string the cluster reports.
    pub capacity: String,
}

/// Immutable capture of every node and drive, in the order received.
///
/// Equality is strict structural equality over every field of every
/// record, order included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub drives: Vec<DriveRecord>,
}

/// Cluster identity details quoted in alert mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMetadata {
    pub name: String,
    pub uuid: String,
    pub time: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_unknown_values() {
        let status: NodeStatus = serde_json::from_str("\"rebooting\"").unwrap();
        assert_eq!(status, NodeStatus::Other("rebooting".to_string()));
        assert!(!status.is_online());
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"rebooting\"");

        let status: NodeStatus = serde_json::from_str("\"online\"").unwrap();
        assert!(status.is_online());
    }

    #[test]
    fn test_drive_state_any_non_healthy_is_unhealthy() {
        let state: DriveState = serde_json::from_str("\"missing\"").unwrap();
        assert_eq!(state, DriveState::Unhealthy("missing".to_string()));
        assert_eq!(state.to_string(), "missing");
        assert!(DriveState::from("healthy".to_string()).is_healthy());
    }

    #[test]
    fn test_snapshot_serializes_with_model_key_names() {
        let snapshot = ClusterSnapshot {
            nodes: vec![NodeRecord {
                id: 1,
                status: NodeStatus::Online,
                name: "node-1".to_string(),
                uuid: "u-1".to_string(),
                model: "QVIRT".to_string(),
                serial: "SN1".to_string(),
            }],
            drives: vec![],
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        let node = &value["nodes"][0];
        assert_eq!(node["status"], "online");
        assert_eq!(node["model"], "QVIRT");
        assert_eq!(node["serial"], "SN1");
        assert!(value["drives"].as_array().unwrap().is_empty());
    }
}
