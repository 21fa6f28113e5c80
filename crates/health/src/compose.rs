//! Alert body rendering.
//!
//! Bodies are HTML fragments: text is laid out line by line and newlines
//! become `<br>`. The layout is fixed so that two runs with the same
//! findings produce byte-identical mail.

use chrono::{DateTime, Utc};

use crate::classify::{AlertEvent, EventPayload};
use crate::error::AcquisitionError;
use crate::model::{ClusterMetadata, DriveRecord, NodeRecord};

const ALERT_TITLE: &str = "<b> CLUSTER EVENT ALERT! </b>";
const NODE_TITLE: &str = "<b> NODE OFFLINE </b>";
const DRIVE_TITLE: &str = "<b> DRIVE UNHEALTHY </b>";

fn banner(title: &str, width: usize) -> String {
    let rule = "=".repeat(width);
    format!("{rule}{title}{rule}")
}

/// Escape text for inclusion in an HTML body.
fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn push_field(body: &mut String, label: &str, value: &str) {
    body.push_str(&format!("{label}: {}\n", escape(value)));
}

fn push_node(body: &mut String, node: &NodeRecord, version: &str) {
    body.push_str(&banner(NODE_TITLE, 23));
    body.push('\n');
    push_field(body, "Node Number", &node.id.to_string());
    push_field(body, "Node Status", node.status.as_str());
    push_field(body, "Node Name", &node.name);
    push_field(body, "Node UUID", &node.uuid);
    push_field(body, "Node Type", &node.model);
    push_field(body, "Node S/N", &node.serial);
    push_field(body, "Software Version", version);
    body.push('\n');
}

fn push_drive(body: &mut String, drive: &DriveRecord, version: &str) {
    body.push_str(&banner(DRIVE_TITLE, 21));
    body.push('\n');
    push_field(body, "Drive ID", &drive.id);
    push_field(body, "Node Number", &drive.node_id.to_string());
    push_field(body, "Drive Slot", &drive.slot.to_string());
    push_field(body, "Drive Status", drive.state.as_str());
    push_field(body, "Slot Type", &drive.slot_type);
    push_field(body, "Disk Type", &drive.disk_type);
    push_field(body, "Disk Model", &drive.disk_model);
    push_field(body, "Disk S/N", &drive.disk_serial);
    push_field(body, "Disk Capacity", &drive.capacity);
    push_field(body, "Software Version", version);
    body.push('\n');
}

/// Render the health alert body for `events`.
#[must_use]
pub fn compose(events: &[AlertEvent], metadata: &ClusterMetadata) -> String {
    let mut body = String::new();
    body.push_str(&banner(ALERT_TITLE, 19));
    body.push('\n');
    body.push_str(
        "Unhealthy object(s) found. See below for info and engage storage support \
         in your preferred fashion.\n",
    );
    push_field(&mut body, "Cluster name", &metadata.name);
    push_field(&mut body, "Cluster UUID", &metadata.uuid);
    body.push_str(&format!("Approx. time: {} UTC\n", escape(&metadata.time)));
    body.push('\n');
    body.push_str(&format!("<i>{} Event(s) found:</i>\n", events.len()));

    for event in events {
        match &event.payload {
            EventPayload::Node(node) => push_node(&mut body, node, &metadata.version),
            EventPayload::Drive(drive) => push_drive(&mut body, drive, &metadata.version),
        }
    }

    body.replace('\n', "<br>")
}

/// Render the connectivity failure body.
#[must_use]
pub fn compose_failure(
    cause: &AcquisitionError,
    rest_port: u16,
    detected_at: DateTime<Utc>,
) -> String {
    let mut body = String::new();
    body.push_str("The cluster health monitor could not reach or query the cluster ");
    body.push_str("and stopped before checking node and drive state.\n");
    body.push_str(&format!(
        "Please check this machine's connection to the cluster over port {rest_port}.\n"
    ));
    body.push('\n');
    push_field(&mut body, "Failure", cause.label());
    push_field(&mut body, "Error", &cause.to_string());
    body.push_str(&format!(
        "Detected at: {} UTC\n",
        detected_at.format("%Y-%m-%d %H:%M:%S")
    ));

    body.replace('\n', "<br>")
}
