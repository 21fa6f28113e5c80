//! Storage cluster health monitor.
//!
//! Each run captures node and drive state from the cluster, compares it
//! with the snapshot persisted by the previous run, and sends at most one
//! notification:
//!
//! - an event alert when the state changed and something is unhealthy
//! - a failure alert when the cluster could not be reached or queried
//! - nothing when the state is unchanged or healthy
//!
//! # Modules
//!
//! - [`cluster`]: collaborator traits and the REST implementation
//! - [`acquire`]: projection of raw records into a [`ClusterSnapshot`]
//! - [`store`]: two-generation snapshot persistence
//! - [`detect`], [`classify`], [`router`]: the dedup state machine
//! - [`compose`]: alert bodies
//! - [`pipeline`]: one scheduler tick end to end

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod acquire;
pub mod classify;
pub mod cluster;
pub mod compose;
pub mod detect;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod router;
pub mod store;

pub use classify::{classify, AlertEvent, Classification, EventKind, EventPayload};
pub use cluster::{ClusterConnector, ClusterSession, RestConnector};
pub use error::{AcquisitionError, MonitorError, StoreError};
pub use model::{ClusterMetadata, ClusterSnapshot, DriveRecord, DriveState, NodeRecord, NodeStatus};
pub use pipeline::{Monitor, RunReport};
pub use router::{OutcomeKind, RunOutcome, RunState};
pub use store::SnapshotStore;
