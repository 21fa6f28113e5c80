//! Alert routing: the per-run dedup and failure state machine.
//!
//! The router never stores state. Each run derives a [`RunState`] from
//! whether a previous generation exists and whether it differs from the
//! new snapshot, then decides a [`RunOutcome`]:
//!
//! | Prior     | Changed | Classified | Outcome                       |
//! |-----------|---------|------------|-------------------------------|
//! | absent    | n/a     | yes        | alert iff unhealthy           |
//! | present   | no      | no         | `Silent`                      |
//! | present   | yes     | yes        | alert iff unhealthy           |
//!
//! An unchanged snapshot is never classified, so an unhealthy condition
//! that was already reported does not alert again while it stays
//! identical. Acquisition failures bypass all of this and become
//! [`RunOutcome::ConnectivityFailure`].

use serde::Serialize;

use crate::classify::{AlertEvent, Classification};
use crate::detect::detect_change;
use crate::error::AcquisitionError;
use crate::model::ClusterSnapshot;

/// Per-run state, derived from the store and the change detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    NoPrior,
    PriorUnchanged,
    PriorChanged,
}

impl RunState {
    /// Derive the state for `current` given the previous generation, if any.
    #[must_use]
    pub fn derive(previous: Option<&ClusterSnapshot>, current: &ClusterSnapshot) -> Self {
        match previous {
            None => Self::NoPrior,
            Some(previous) if detect_change(current, previous) => Self::PriorChanged,
            Some(_) => Self::PriorUnchanged,
        }
    }
}

/// What a run decided to do.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Silent,
    UnhealthyAlert(Vec<AlertEvent>),
    ConnectivityFailure(AcquisitionError),
}

/// Fieldless mirror of [`RunOutcome`] for reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Silent,
    UnhealthyAlert,
    ConnectivityFailure,
}

impl OutcomeKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::UnhealthyAlert => "unhealthy_alert",
            Self::ConnectivityFailure => "connectivity_failure",
        }
    }
}

impl RunOutcome {
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Silent => OutcomeKind::Silent,
            Self::UnhealthyAlert(_) => OutcomeKind::UnhealthyAlert,
            Self::ConnectivityFailure(_) => OutcomeKind::ConnectivityFailure,
        }
    }
}

/// Decide the outcome for a successfully acquired snapshot.
///
/// `classifier` is only invoked when the state calls for classification.
pub fn route<F>(state: RunState, snapshot: &ClusterSnapshot, classifier: F) -> RunOutcome
where
    F: FnOnce(&ClusterSnapshot) -> Classification,
{
    match state {
        RunState::PriorUnchanged => RunOutcome::Silent,
        RunState::NoPrior | RunState::PriorChanged => {
            let Classification { events, healthy } = classifier(snapshot);
            if healthy {
                RunOutcome::Silent
            } else {
                RunOutcome::UnhealthyAlert(events)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::model::{NodeRecord, NodeStatus};
    use std::cell::Cell;

    fn snapshot(status: NodeStatus) -> ClusterSnapshot {
        ClusterSnapshot {
            nodes: vec![NodeRecord {
                id: 1,
                status,
                name: "node-1".to_string(),
                uuid: "u-1".to_string(),
                model: "QVIRT".to_string(),
                serial: "SN1".to_string(),
            }],
            drives: vec![],
        }
    }

    #[test]
    fn test_derive_states() {
        let online = snapshot(NodeStatus::Online);
        let offline = snapshot(NodeStatus::Offline);

        assert_eq!(RunState::derive(None, &online), RunState::NoPrior);
        assert_eq!(
            RunState::derive(Some(&online), &online),
            RunState::PriorUnchanged
        );
        assert_eq!(
            RunState::derive(Some(&online), &offline),
            RunState::PriorChanged
        );
    }

    #[test]
    fn test_unchanged_never_classifies() {
        let calls = Cell::new(0);
        let offline = snapshot(NodeStatus::Offline);

        let outcome = route(RunState::PriorUnchanged, &offline, |s| {
            calls.set(calls.get() + 1);
            classify(s)
        });

        assert_eq!(outcome.kind(), OutcomeKind::Silent);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_first_run_healthy_is_silent() {
        let calls = Cell::new(0);
        let outcome = route(RunState::NoPrior, &snapshot(NodeStatus::Online), |s| {
            calls.set(calls.get() + 1);
            classify(s)
        });

        assert_eq!(outcome.kind(), OutcomeKind::Silent);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_changed_unhealthy_alerts() {
        let outcome = route(
            RunState::PriorChanged,
            &snapshot(NodeStatus::Offline),
            classify,
        );

        match outcome {
            RunOutcome::UnhealthyAlert(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].ordinal, 1);
            }
            other => panic!("expected UnhealthyAlert, got {other:?}"),
        }
    }

    #[test]
    fn test_outcome_kind_labels() {
        let failure = RunOutcome::ConnectivityFailure(AcquisitionError::Auth("denied".to_string()));
        assert_eq!(failure.kind(), OutcomeKind::ConnectivityFailure);
        assert_eq!(failure.kind().as_str(), "connectivity_failure");
        assert_eq!(
            serde_json::to_string(&OutcomeKind::UnhealthyAlert).unwrap(),
            "\"unhealthy_alert\""
        );
    }
}
