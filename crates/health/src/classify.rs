//! Health classification of a single snapshot.

use serde::Serialize;

use crate::model::{ClusterSnapshot, DriveRecord, NodeRecord};

/// Kind of unhealthy finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    NodeOffline,
    DriveUnhealthy,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NodeOffline => "node-offline",
            Self::DriveUnhealthy => "drive-unhealthy",
        }
    }
}

/// The record an event is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Node(NodeRecord),
    Drive(DriveRecord),
}

/// One unhealthy finding.
///
/// `ordinal` is run-local: it numbers findings within one classification
/// and means nothing across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertEvent {
    pub ordinal: usize,
    pub payload: EventPayload,
}

impl AlertEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::Node(_) => EventKind::NodeOffline,
            EventPayload::Drive(_) => EventKind::DriveUnhealthy,
        }
    }
}

/// Result of classifying a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub events: Vec<AlertEvent>,
    pub healthy: bool,
}

/// Scan nodes, then drives, in snapshot order.
///
/// A node that is not `online` and a drive that is not `healthy` each
/// produce one event. Ordinals start at 1 and run across both passes.
#[must_use]
pub fn classify(snapshot: &ClusterSnapshot) -> Classification {
    let offline = snapshot
        .nodes
        .iter()
        .filter(|node| !node.status.is_online())
        .cloned()
        .map(EventPayload::Node);

    let unhealthy = snapshot
        .drives
        .iter()
        .filter(|drive| !drive.state.is_healthy())
        .cloned()
        .map(EventPayload::Drive);

    let events: Vec<AlertEvent> = offline
        .chain(unhealthy)
        .enumerate()
        .map(|(index, payload)| AlertEvent {
            ordinal: index + 1,
            payload,
        })
        .collect();

    Classification {
        healthy: events.is_empty(),
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DriveState, NodeStatus};

    fn node(id: u64, status: NodeStatus) -> NodeRecord {
        NodeRecord {
            id,
            status,
            name: format!("node-{id}"),
            uuid: format!("uuid-{id}"),
            model: "QVIRT".to_string(),
            serial: format!("SN{id}"),
        }
    }

    fn drive(node_id: u64, slot: u64, state: DriveState) -> DriveRecord {
        DriveRecord {
            id: format!("{node_id}.{slot}"),
            node_id,
            slot,
            state,
            slot_type: "SSD".to_string(),
            disk_type: "SSD".to_string(),
            disk_model: "Virtual_disk".to_string(),
            disk_serial: format!("D{node_id}{slot}"),
            capacity: "10467934208".to_string(),
        }
    }

    #[test]
    fn test_healthy_snapshot_has_no_events() {
        let snapshot = ClusterSnapshot {
            nodes: vec![node(1, NodeStatus::Online), node(2, NodeStatus::Online)],
            drives: vec![drive(1, 1, DriveState::Healthy)],
        };

        let result = classify(&snapshot);
        assert!(result.healthy);
        assert!(result.events.is_empty());
    }

    #[test]
    fn test_empty_snapshot_is_healthy() {
        assert!(classify(&ClusterSnapshot::default()).healthy);
    }

    #[test]
    fn test_one_offline_node() {
        let snapshot = ClusterSnapshot {
            nodes: vec![
                node(1, NodeStatus::Online),
                node(2, NodeStatus::Offline),
                node(3, NodeStatus::Online),
            ],
            drives: vec![drive(1, 1, DriveState::Healthy)],
        };

        let result = classify(&snapshot);
        assert!(!result.healthy);
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].ordinal, 1);
        assert_eq!(result.events[0].kind(), EventKind::NodeOffline);
        assert_eq!(
            result.events[0].payload,
            EventPayload::Node(node(2, NodeStatus::Offline))
        );
    }

    #[test]
    fn test_nodes_are_numbered_before_drives() {
        let snapshot = ClusterSnapshot {
            nodes: vec![node(1, NodeStatus::Online), node(2, NodeStatus::Offline)],
            drives: vec![
                drive(1, 1, DriveState::Unhealthy("missing".to_string())),
                drive(1, 2, DriveState::Healthy),
                drive(2, 1, DriveState::Unhealthy("dead".to_string())),
            ],
        };

        let result = classify(&snapshot);
        let summary: Vec<(usize, EventKind)> =
            result.events.iter().map(|e| (e.ordinal, e.kind())).collect();
        assert_eq!(
            summary,
            vec![
                (1, EventKind::NodeOffline),
                (2, EventKind::DriveUnhealthy),
                (3, EventKind::DriveUnhealthy),
            ]
        );

        match (&result.events[1].payload, &result.events[2].payload) {
            (EventPayload::Drive(a), EventPayload::Drive(b)) => {
                assert_eq!(a.id, "1.1");
                assert_eq!(b.id, "2.1");
            }
            other => panic!("expected two drive payloads, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_node_status_is_offline() {
        let snapshot = ClusterSnapshot {
            nodes: vec![node(1, NodeStatus::Other("rebooting".to_string()))],
            drives: vec![],
        };
        let result = classify(&snapshot);
        assert_eq!(result.events[0].kind(), EventKind::NodeOffline);
    }

    #[test]
    fn test_event_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&EventKind::DriveUnhealthy).unwrap(),
            "\"drive-unhealthy\""
        );
        assert_eq!(EventKind::NodeOffline.as_str(), "node-offline");
    }
}
