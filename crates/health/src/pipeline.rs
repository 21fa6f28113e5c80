//! One scheduler tick: acquire, persist, detect, classify, route, notify.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use health_config::{ConfigError, MonitorConfig};
use notify::{AlertKind, MailMessage, Notifier, Recipients, SmtpSettings};

use crate::acquire::{fetch_metadata, Acquisition, SnapshotAcquirer};
use crate::classify::{classify, AlertEvent};
use crate::cluster::ClusterConnector;
use crate::compose::{compose, compose_failure};
use crate::error::{AcquisitionError, MonitorError};
use crate::router::{route, OutcomeKind, RunOutcome, RunState};
use crate::store::SnapshotStore;

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcome: OutcomeKind,
    /// Absent when acquisition failed before a state could be derived.
    pub state: Option<RunState>,
    pub events: Vec<AlertEvent>,
    pub notified: bool,
    pub started_at: DateTime<Utc>,
    /// Rendered acquisition error for connectivity failures.
    pub cause: Option<String>,
}

/// Build the notifier described by the mail settings.
#[must_use]
pub fn build_notifier(config: &MonitorConfig, dry_run: bool) -> Notifier {
    if dry_run {
        return Notifier::dry_run();
    }
    Notifier::smtp(SmtpSettings {
        port: config.email.port,
        starttls: config.email.starttls,
        username: config.email.username.clone(),
        password: config.email.password.clone(),
        timeout: Duration::from_secs(config.cluster.timeout_secs),
    })
}

/// Parse the configured recipient list into a non-empty set.
pub fn recipients(config: &MonitorConfig) -> Result<Recipients, ConfigError> {
    Recipients::new(config.email.recipients.iter().cloned()).map_err(|_| {
        ConfigError::MissingField {
            fields: vec!["email_settings.mail_to".to_string()],
        }
    })
}

/// Runs the health pipeline against one cluster.
pub struct Monitor {
    cluster_name: String,
    rest_port: u16,
    sender: String,
    server: String,
    recipients: Recipients,
    store: SnapshotStore,
    acquirer: SnapshotAcquirer,
    notifier: Notifier,
}

impl Monitor {
    pub fn new(
        config: &MonitorConfig,
        store: SnapshotStore,
        connector: Box<dyn ClusterConnector>,
        notifier: Notifier,
    ) -> Result<Self, MonitorError> {
        Ok(Self {
            cluster_name: config.cluster.name.clone(),
            rest_port: config.cluster.rest_port,
            sender: config.email.sender.clone(),
            server: config.email.server.clone(),
            recipients: recipients(config)?,
            store,
            acquirer: SnapshotAcquirer::new(connector),
            notifier,
        })
    }

    /// Execute one run.
    ///
    /// Store problems found before contacting the cluster are fatal and
    /// nothing is sent. An acquisition failure sends one failure mail and
    /// leaves the store untouched. Otherwise the new snapshot is persisted
    /// and the previous generation is removed before returning.
    ///
    /// A run that classified the new snapshot but could not deliver its
    /// health alert reverts the rotation, so the next run compares against
    /// the same prior generation and detects the change again.
    pub async fn run(&self) -> Result<RunReport, MonitorError> {
        let started_at = Utc::now();
        info!(cluster = %self.cluster_name, "Starting health check run");

        self.store.prepare()?;

        let acquisition = match self.acquirer.acquire().await {
            Ok(acquisition) => acquisition,
            Err(cause) => return self.report_failure(cause, None, started_at).await,
        };

        let previous_existed = self.store.rotate_and_persist(&acquisition.snapshot)?;
        let result = self
            .evaluate(previous_existed, acquisition, started_at)
            .await;

        let settled = matches!(
            &result,
            Ok(report) if report.outcome != OutcomeKind::ConnectivityFailure
        );
        let reverted = if settled {
            Ok(())
        } else {
            warn!(
                cluster = %self.cluster_name,
                "Run did not complete, reverting snapshot rotation"
            );
            self.store.revert(previous_existed)
        };
        if let Err(e) = &reverted {
            error!(error = %e, "Failed to revert snapshot rotation");
        }
        let cleared = self.store.clear_previous();

        let report = result?;
        reverted?;
        cleared?;

        info!(
            cluster = %self.cluster_name,
            outcome = report.outcome.as_str(),
            events = report.events.len(),
            notified = report.notified,
            "Health check run finished"
        );
        Ok(report)
    }

    async fn evaluate(
        &self,
        previous_existed: bool,
        acquisition: Acquisition,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport, MonitorError> {
        let Acquisition { snapshot, session } = acquisition;

        let previous = if previous_existed {
            Some(self.store.load_previous()?)
        } else {
            None
        };
        let state = RunState::derive(previous.as_ref(), &snapshot);
        debug!(state = ?state, "Derived run state");

        // A failed metadata lookup turns an alert into a connectivity failure.
        let mut outcome = route(state, &snapshot, classify);
        loop {
            match outcome {
                RunOutcome::Silent => {
                    return Ok(RunReport {
                        outcome: OutcomeKind::Silent,
                        state: Some(state),
                        events: Vec::new(),
                        notified: false,
                        started_at,
                        cause: None,
                    })
                }
                RunOutcome::UnhealthyAlert(events) => {
                    let metadata = match fetch_metadata(session.as_ref()).await {
                        Ok(metadata) => metadata,
                        Err(cause) => {
                            warn!(error = %cause, "Metadata lookup failed after classification");
                            outcome = RunOutcome::ConnectivityFailure(cause);
                            continue;
                        }
                    };

                    warn!(
                        cluster = %self.cluster_name,
                        events = events.len(),
                        "Unhealthy objects found"
                    );
                    let body = compose(&events, &metadata);
                    self.send(AlertKind::HealthAlert, body).await?;

                    return Ok(RunReport {
                        outcome: OutcomeKind::UnhealthyAlert,
                        state: Some(state),
                        events,
                        notified: true,
                        started_at,
                        cause: None,
                    });
                }
                RunOutcome::ConnectivityFailure(cause) => {
                    return self.report_failure(cause, Some(state), started_at).await
                }
            }
        }
    }

    async fn report_failure(
        &self,
        cause: AcquisitionError,
        state: Option<RunState>,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport, MonitorError> {
        warn!(
            cluster = %self.cluster_name,
            kind = cause.label(),
            error = %cause,
            "Cluster unreachable, sending failure notification"
        );

        let body = compose_failure(&cause, self.rest_port, started_at);
        self.send(AlertKind::ScriptFailure, body).await?;

        Ok(RunReport {
            outcome: OutcomeKind::ConnectivityFailure,
            state,
            events: Vec::new(),
            notified: true,
            started_at,
            cause: Some(cause.to_string()),
        })
    }

    async fn send(&self, kind: AlertKind, body: String) -> Result<(), MonitorError> {
        let message = MailMessage::new(
            kind,
            &self.cluster_name,
            body,
            self.sender.clone(),
            self.recipients.clone(),
            self.server.clone(),
        );

        self.notifier
            .deliver(&message)
            .await
            .map_err(|source| MonitorError::Delivery {
                kind: kind.as_str(),
                source,
            })
    }
}
