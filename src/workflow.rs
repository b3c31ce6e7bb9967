//! The status submission workflow: validate → persist → escalate →
//! notify, as one explicit stage machine per attempt.
//!
//! Persistence and notification are decoupled failure domains. A
//! validation failure rejects the attempt before anything is written; a
//! persistence fault fails the whole attempt; a notification failure is
//! reported on the outcome while the committed audit record stands.

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::audit::{AuditStore, RagStatus, StatusDraft, StatusRecord};
use crate::dispatch::{DispatchReport, Dispatcher, Notifier};
use crate::error::{RagtrackError, ValidationError};
use crate::escalation::{EscalationPolicy, EscalationTarget, PolicyWarning};
use crate::roster::{Employee, Roster};

/// The stages a submission attempt moves through.
///
/// RECEIVED → VALIDATED → PERSISTED → ESCALATED → COMPLETED, with early
/// exits to REJECTED (validation failure) and PERSISTENCE_FAILED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Received,
    Validated,
    Persisted,
    Escalated,
    Completed,
    Rejected,
    PersistenceFailed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Received => write!(f, "RECEIVED"),
            Stage::Validated => write!(f, "VALIDATED"),
            Stage::Persisted => write!(f, "PERSISTED"),
            Stage::Escalated => write!(f, "ESCALATED"),
            Stage::Completed => write!(f, "COMPLETED"),
            Stage::Rejected => write!(f, "REJECTED"),
            Stage::PersistenceFailed => write!(f, "PERSISTENCE_FAILED"),
        }
    }
}

/// One submission attempt as entered at the operator surface.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Roster search query identifying the target employee.
    pub query: String,
    pub status: RagStatus,
    pub comment: String,
    /// Accept the first match in roster order when the query is
    /// ambiguous. Without it an ambiguous query fails the attempt.
    pub use_first: bool,
}

/// Surfaced whenever an ambiguous query was resolved by taking the
/// first match. Never silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmbiguityNote {
    pub matched: usize,
}

impl std::fmt::Display for AmbiguityNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "multiple matches ({}), using first", self.matched)
    }
}

/// Everything a completed submission produced: the committed record
/// plus the escalation and notification outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub attempt_id: String,
    pub record: StatusRecord,
    pub targets: Vec<EscalationTarget>,
    pub warnings: Vec<PolicyWarning>,
    /// `None` when no escalation fired (non-Red status).
    pub dispatch: Option<DispatchReport>,
    pub ambiguity: Option<AmbiguityNote>,
    pub stages: Vec<Stage>,
}

/// A failed submission attempt: the error plus the stages traversed
/// before the early exit, so the trail is reported on failures too.
#[derive(Debug)]
pub struct SubmissionFailure {
    pub error: RagtrackError,
    pub stages: Vec<Stage>,
}

impl std::fmt::Display for SubmissionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for SubmissionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Notification subject for a committed record.
pub fn subject_for(record: &StatusRecord) -> String {
    format!("Immediate Attention Required for {}", record.employee_name)
}

/// Notification body for a committed record.
pub fn body_for(record: &StatusRecord) -> String {
    format!(
        "Dear all,\n\nThe RAG status for {} has been marked as {}. \
         Please review the comments and take necessary actions.\n\nComment: {}",
        record.employee_name, record.status, record.comment
    )
}

/// Orchestrates one submission attempt across the roster index, the
/// audit store, the escalation policy and the dispatcher.
pub struct SubmissionPipeline<'a, N> {
    roster: &'a Roster,
    store: &'a AuditStore,
    policy: &'a EscalationPolicy,
    dispatcher: &'a Dispatcher<N>,
}

impl<'a, N: Notifier> SubmissionPipeline<'a, N> {
    pub fn new(
        roster: &'a Roster,
        store: &'a AuditStore,
        policy: &'a EscalationPolicy,
        dispatcher: &'a Dispatcher<N>,
    ) -> Self {
        Self {
            roster,
            store,
            policy,
            dispatcher,
        }
    }

    /// Run one submission attempt end to end.
    ///
    /// Escalation recipients are always computed from the committed
    /// record, never from pre-validation input, and a notification
    /// failure never rolls the record back. On failure the traversed
    /// stages come back on the [`SubmissionFailure`], ending in
    /// `Rejected` or `PersistenceFailed`.
    pub async fn submit(
        &self,
        request: SubmissionRequest,
        cancel: watch::Receiver<bool>,
    ) -> Result<SubmissionOutcome, SubmissionFailure> {
        let mut stages = vec![Stage::Received];
        match self.run(request, cancel, &mut stages).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                stages.push(match &error {
                    RagtrackError::Persistence(_) => Stage::PersistenceFailed,
                    _ => Stage::Rejected,
                });
                Err(SubmissionFailure { error, stages })
            }
        }
    }

    async fn run(
        &self,
        request: SubmissionRequest,
        cancel: watch::Receiver<bool>,
        stages: &mut Vec<Stage>,
    ) -> Result<SubmissionOutcome, RagtrackError> {
        let (employee, ambiguity) = self.select_target(&request)?;

        let comment = request.comment.trim();
        if comment.is_empty() {
            log::warn!(
                "submission for {} -> {}: empty comment",
                employee.id,
                Stage::Rejected
            );
            return Err(ValidationError::EmptyComment.into());
        }
        stages.push(Stage::Validated);

        let record = self
            .store
            .append(StatusDraft {
                employee_id: employee.id.clone(),
                employee_name: employee.name.clone(),
                status: request.status,
                comment: comment.to_string(),
            })
            .map_err(|e| {
                log::error!("submission for {} -> {}: {e}", employee.id, Stage::PersistenceFailed);
                e
            })?;
        stages.push(Stage::Persisted);

        let resolution = self.policy.resolve(&record, &employee);
        stages.push(Stage::Escalated);
        for warning in &resolution.warnings {
            log::warn!("policy warning: {warning}");
        }

        let dispatch = if resolution.targets.is_empty() {
            None
        } else {
            let subject = subject_for(&record);
            let body = body_for(&record);
            log::info!(
                "dispatching escalation for record #{} to {} targets",
                record.sequence_id,
                resolution.targets.len()
            );
            Some(
                self.dispatcher
                    .dispatch(&resolution.targets, &subject, &body, cancel)
                    .await,
            )
        };
        stages.push(Stage::Completed);

        Ok(SubmissionOutcome {
            attempt_id: Uuid::new_v4().to_string(),
            record,
            targets: resolution.targets,
            warnings: resolution.warnings,
            dispatch,
            ambiguity,
            stages: stages.clone(),
        })
    }

    /// Resolve the submission query to a single employee.
    ///
    /// Zero matches fail with `NoMatch`. Multiple matches require the
    /// explicit use-first flag; when taken, the choice is reported on
    /// the outcome as an [`AmbiguityNote`].
    fn select_target(
        &self,
        request: &SubmissionRequest,
    ) -> Result<(Employee, Option<AmbiguityNote>), RagtrackError> {
        let matches = self.roster.search(&request.query);
        match matches.len() {
            0 => Err(RagtrackError::NoMatch(request.query.clone())),
            1 => Ok((matches[0].clone(), None)),
            n if request.use_first => {
                log::warn!(
                    "query \"{}\" matched {n} employees; using first ({})",
                    request.query,
                    matches[0].id
                );
                Ok((matches[0].clone(), Some(AmbiguityNote { matched: n })))
            }
            n => Err(RagtrackError::AmbiguousMatch {
                query: request.query.clone(),
                matched: n,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use std::sync::Mutex;
    use std::time::Duration;

    const ROSTER_CSV: &str = "\
Employee ID,Employee Name,Reporting Manager,Mail ID
123,John Doe,Jane Smith,john.doe@company.com
456,Mary Major,Jane Smith,mary.major@company.com
789,Jo Dalton,,jo.dalton@company.com
";

    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
        fail_all: bool,
    }

    impl RecordingNotifier {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_all: false,
            }
        }

        fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_all: true,
            }
        }
    }

    impl Notifier for RecordingNotifier {
        async fn send(
            &self,
            address: &str,
            _subject: &str,
            _body: &str,
        ) -> Result<(), TransportError> {
            if self.fail_all {
                return Err(TransportError::Rejected {
                    status: 500,
                    message: "sink down".to_string(),
                });
            }
            self.sent.lock().unwrap().push(address.to_string());
            Ok(())
        }
    }

    struct Fixture {
        roster: Roster,
        store: AuditStore,
        policy: EscalationPolicy,
        dispatcher: Dispatcher<RecordingNotifier>,
    }

    impl Fixture {
        fn new(notifier: RecordingNotifier) -> Self {
            Self::with_store(notifier, AuditStore::in_memory())
        }

        fn with_store(notifier: RecordingNotifier, store: AuditStore) -> Self {
            Self {
                roster: Roster::from_csv_bytes(ROSTER_CSV.as_bytes()).unwrap(),
                store,
                policy: EscalationPolicy::from_config(&crate::config::RagtrackConfig::default()),
                dispatcher: Dispatcher::new(notifier, 4, Duration::from_secs(1)),
            }
        }

        fn pipeline(&self) -> SubmissionPipeline<'_, RecordingNotifier> {
            SubmissionPipeline::new(&self.roster, &self.store, &self.policy, &self.dispatcher)
        }
    }

    fn no_cancel() -> watch::Receiver<bool> {
        let (tx, rx) = watch::channel(false);
        std::mem::forget(tx);
        rx
    }

    fn request(query: &str, status: RagStatus, comment: &str) -> SubmissionRequest {
        SubmissionRequest {
            query: query.to_string(),
            status,
            comment: comment.to_string(),
            use_first: false,
        }
    }

    #[tokio::test]
    async fn red_submission_persists_and_notifies_all_parties() {
        let fixture = Fixture::new(RecordingNotifier::new());
        let outcome = fixture
            .pipeline()
            .submit(request("John Doe", RagStatus::Red, "needs support"), no_cancel())
            .await
            .unwrap();

        assert_eq!(outcome.record.sequence_id, 1);
        assert_eq!(outcome.record.employee_id, "123");
        assert_eq!(outcome.record.comment, "needs support");

        let addresses: Vec<_> = outcome.targets.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(
            addresses,
            vec![
                "jane.smith@company.com",
                "hr@company.com",
                "hrmanager@company.com",
                "hrhead@company.com",
                "john.doe@company.com",
            ]
        );

        let report = outcome.dispatch.unwrap();
        assert!(report.all_delivered());
        assert_eq!(report.delivered.len(), 5);
        assert_eq!(
            outcome.stages,
            vec![
                Stage::Received,
                Stage::Validated,
                Stage::Persisted,
                Stage::Escalated,
                Stage::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn green_submission_commits_without_dispatch() {
        let fixture = Fixture::new(RecordingNotifier::new());
        let outcome = fixture
            .pipeline()
            .submit(request("John Doe", RagStatus::Green, "on track"), no_cancel())
            .await
            .unwrap();

        assert_eq!(outcome.record.sequence_id, 1);
        assert!(outcome.targets.is_empty());
        assert!(outcome.dispatch.is_none());
        assert!(
            fixture
                .dispatcher
                .notifier()
                .sent
                .lock()
                .unwrap()
                .is_empty()
        );
        assert_eq!(fixture.store.len(), 1);
    }

    #[tokio::test]
    async fn empty_comment_is_rejected_before_persistence() {
        let fixture = Fixture::new(RecordingNotifier::new());
        let failure = fixture
            .pipeline()
            .submit(request("John Doe", RagStatus::Red, "   "), no_cancel())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            RagtrackError::Validation(ValidationError::EmptyComment)
        ));
        assert_eq!(failure.stages, vec![Stage::Received, Stage::Rejected]);
        assert_eq!(fixture.store.len(), 0);
    }

    #[tokio::test]
    async fn no_match_fails_without_persistence() {
        let fixture = Fixture::new(RecordingNotifier::new());
        let failure = fixture
            .pipeline()
            .submit(request("zzz-no-such", RagStatus::Red, "x"), no_cancel())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, RagtrackError::NoMatch(_)));
        assert_eq!(fixture.store.len(), 0);
    }

    #[tokio::test]
    async fn ambiguous_query_requires_explicit_use_first() {
        let fixture = Fixture::new(RecordingNotifier::new());
        // "jo" matches both John Doe and Jo Dalton.
        let failure = fixture
            .pipeline()
            .submit(request("jo", RagStatus::Amber, "watching"), no_cancel())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            RagtrackError::AmbiguousMatch { matched: 2, .. }
        ));
        assert_eq!(fixture.store.len(), 0);
    }

    #[tokio::test]
    async fn storage_fault_fails_submission_without_escalation() {
        let fixture = Fixture::with_store(
            RecordingNotifier::new(),
            AuditStore::with_sink_failures(usize::MAX),
        );
        let failure = fixture
            .pipeline()
            .submit(request("John Doe", RagStatus::Red, "needs support"), no_cancel())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, RagtrackError::Persistence(_)));
        assert_eq!(
            failure.stages,
            vec![Stage::Received, Stage::Validated, Stage::PersistenceFailed]
        );
        // Nothing committed, so nobody gets notified.
        assert_eq!(fixture.store.len(), 0);
        assert!(
            fixture
                .dispatcher
                .notifier()
                .sent
                .lock()
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn use_first_takes_first_match_and_reports_ambiguity() {
        let fixture = Fixture::new(RecordingNotifier::new());
        let mut req = request("jo", RagStatus::Amber, "watching");
        req.use_first = true;

        let outcome = fixture.pipeline().submit(req, no_cancel()).await.unwrap();
        assert_eq!(outcome.record.employee_id, "123");
        assert_eq!(outcome.ambiguity, Some(AmbiguityNote { matched: 2 }));
    }

    #[tokio::test]
    async fn notification_failure_never_rolls_back_the_record() {
        let fixture = Fixture::new(RecordingNotifier::failing());
        let outcome = fixture
            .pipeline()
            .submit(request("John Doe", RagStatus::Red, "needs support"), no_cancel())
            .await
            .unwrap();

        let report = outcome.dispatch.unwrap();
        assert!(report.delivered.is_empty());
        assert_eq!(report.failed.len(), 5);
        // The audit trail remains authoritative.
        assert_eq!(fixture.store.len(), 1);
        assert_eq!(fixture.store.snapshot()[0].sequence_id, 1);
    }

    #[tokio::test]
    async fn missing_manager_warns_but_completes() {
        let fixture = Fixture::new(RecordingNotifier::new());
        let outcome = fixture
            .pipeline()
            .submit(request("Jo Dalton", RagStatus::Red, "check in"), no_cancel())
            .await
            .unwrap();

        assert_eq!(outcome.targets.len(), 4);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.dispatch.unwrap().delivered.len(), 4);
    }

    #[tokio::test]
    async fn comment_is_stored_trimmed() {
        let fixture = Fixture::new(RecordingNotifier::new());
        let outcome = fixture
            .pipeline()
            .submit(
                request("Mary", RagStatus::Green, "  steady progress  "),
                no_cancel(),
            )
            .await
            .unwrap();

        assert_eq!(outcome.record.comment, "steady progress");
    }

    #[test]
    fn stage_display_names() {
        assert_eq!(Stage::Received.to_string(), "RECEIVED");
        assert_eq!(Stage::PersistenceFailed.to_string(), "PERSISTENCE_FAILED");
    }

    #[test]
    fn message_text_for_committed_record() {
        let record = StatusRecord {
            sequence_id: 7,
            employee_id: "123".into(),
            employee_name: "John Doe".into(),
            status: RagStatus::Red,
            comment: "needs support".into(),
            created_at: chrono::Utc::now(),
        };
        assert_eq!(
            subject_for(&record),
            "Immediate Attention Required for John Doe"
        );
        let body = body_for(&record);
        assert!(body.contains("marked as Red"));
        assert!(body.contains("Comment: needs support"));
    }
}
