//! Snapshot acquisition.
//!
//! Calls the cluster collaborator for raw node and drive records and
//! projects them into a [`ClusterSnapshot`]. Acquisition is all-or-nothing:
//! a failure on either list, or a single malformed record, fails the call
//! and no snapshot is produced.
//!
//! Projection drops every upstream field that is not part of the model.
//! A record missing a model field is a `QueryError`; nothing is defaulted.
//! The one allowance is that a present-but-`null` text field becomes an
//! empty string, since virtual nodes report no serial number.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};

use crate::cluster::{ClusterConnector, ClusterSession};
use crate::error::AcquisitionError;
use crate::model::{ClusterMetadata, ClusterSnapshot, DriveRecord, NodeRecord};

/// Node record as the cluster API names its fields.
#[derive(Deserialize)]
struct RawNode {
    id: u64,
    node_status: String,
    #[serde(deserialize_with = "nullable_string")]
    node_name: String,
    #[serde(deserialize_with = "nullable_string")]
    uuid: String,
    #[serde(deserialize_with = "nullable_string")]
    model_number: String,
    #[serde(deserialize_with = "nullable_string")]
    serial_number: String,
}

/// Drive slot record as the cluster API names its fields.
#[derive(Deserialize)]
struct RawDrive {
    id: String,
    node_id: u64,
    slot: u64,
    state: String,
    #[serde(deserialize_with = "nullable_string")]
    slot_type: String,
    #[serde(deserialize_with = "nullable_string")]
    disk_type: String,
    #[serde(deserialize_with = "nullable_string")]
    disk_model: String,
    #[serde(deserialize_with = "nullable_string")]
    disk_serial_number: String,
    #[serde(deserialize_with = "capacity_string")]
    capacity: String,
}

impl From<RawNode> for NodeRecord {
    fn from(raw: RawNode) -> Self {
        Self {
            id: raw.id,
            status: raw.node_status.into(),
            name: raw.node_name,
            uuid: raw.uuid,
            model: raw.model_number,
            serial: raw.serial_number,
        }
    }
}

impl From<RawDrive> for DriveRecord {
    fn from(raw: RawDrive) -> Self {
        Self {
            id: raw.id,
            node_id: raw.node_id,
            slot: raw.slot,
            state: raw.state.into(),
            slot_type: raw.slot_type,
            disk_type: raw.disk_type,
            disk_model: raw.disk_model,
            disk_serial: raw.disk_serial_number,
            capacity: raw.capacity,
        }
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Capacity arrives as a decimal string; accept a bare integer too.
fn capacity_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) if n.is_u64() => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "capacity must be an integer or integer string, got {other}"
        ))),
    }
}

/// Project raw node records, failing on the first malformed one.
pub fn project_nodes(raw: Vec<Value>) -> Result<Vec<NodeRecord>, AcquisitionError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value::<RawNode>(value)
                .map(NodeRecord::from)
                .map_err(|e| {
                    AcquisitionError::query("list_nodes", format!("malformed node record #{index}: {e}"))
                })
        })
        .collect()
}

/// Project raw drive records, failing on the first malformed one.
pub fn project_drives(raw: Vec<Value>) -> Result<Vec<DriveRecord>, AcquisitionError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, value)| {
            serde_json::from_value::<RawDrive>(value)
                .map(DriveRecord::from)
                .map_err(|e| {
                    AcquisitionError::query(
                        "list_drives",
                        format!("malformed drive record #{index}: {e}"),
                    )
                })
        })
        .collect()
}

/// A snapshot together with the session that produced it.
///
/// The session is kept so alert metadata comes from the same login.
pub struct Acquisition {
    pub snapshot: ClusterSnapshot,
    pub session: Box<dyn ClusterSession>,
}

/// Obtains snapshots through a [`ClusterConnector`].
pub struct SnapshotAcquirer {
    connector: Box<dyn ClusterConnector>,
}

impl SnapshotAcquirer {
    #[must_use]
    pub fn new(connector: Box<dyn ClusterConnector>) -> Self {
        Self { connector }
    }

    /// Connect, list nodes and drives, and project both.
    pub async fn acquire(&self) -> Result<Acquisition, AcquisitionError> {
        let endpoint = self.connector.endpoint();
        debug!(endpoint = %endpoint, "Acquiring cluster snapshot");

        let session = self.connector.connect().await?;
        let raw_nodes = session.list_nodes().await?;
        let raw_drives = session.list_drives().await?;

        let snapshot = ClusterSnapshot {
            nodes: project_nodes(raw_nodes)?,
            drives: project_drives(raw_drives)?,
        };

        info!(
            endpoint = %endpoint,
            nodes = snapshot.nodes.len(),
            drives = snapshot.drives.len(),
            "Acquired cluster snapshot"
        );

        Ok(Acquisition { snapshot, session })
    }
}

/// Fetch the cluster identity quoted in alert mail.
pub async fn fetch_metadata(
    session: &dyn ClusterSession,
) -> Result<ClusterMetadata, AcquisitionError> {
    Ok(ClusterMetadata {
        name: session.cluster_name().await?,
        uuid: session.cluster_uuid().await?,
        time: session.cluster_time().await?,
        version: session.software_version().await?,
    })
}
