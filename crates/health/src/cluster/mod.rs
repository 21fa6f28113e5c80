//! Cluster query collaborator.
//!
//! The engine only sees these two traits. [`rest::RestConnector`] is the
//! production implementation; tests substitute in-memory fakes.

pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AcquisitionError;

pub use rest::RestConnector;

/// Opens authenticated sessions against a cluster.
#[async_trait]
pub trait ClusterConnector: Send + Sync {
    /// Endpoint description for logs.
    fn endpoint(&self) -> String;

    /// Reach the cluster and authenticate.
    async fn connect(&self) -> Result<Box<dyn ClusterSession>, AcquisitionError>;
}

/// An authenticated session. Raw records are returned as the cluster sent
/// them; projection happens in [`crate::acquire`].
#[async_trait]
pub trait ClusterSession: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Value>, AcquisitionError>;

    async fn list_drives(&self) -> Result<Vec<Value>, AcquisitionError>;

    async fn cluster_name(&self) -> Result<String, AcquisitionError>;

    async fn cluster_uuid(&self) -> Result<String, AcquisitionError>;

    async fn cluster_time(&self) -> Result<String, AcquisitionError>;

    async fn software_version(&self) -> Result<String, AcquisitionError>;
}
