//! The "add knowledge" action: upload, start ingestion, wait.

use std::future::Future;

use serde::Serialize;

use crate::config::{KnowledgeBaseTarget, PollConfig};
use crate::notice::Notices;
use crate::remote::{IngestionControl, ObjectStore};

use super::poller::{IngestionPoller, PollOutcome};
use super::trigger::start_ingestion;
use super::upload::{UploadRequest, upload_document};

/// How an add-knowledge action ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddKnowledgeStatus {
    /// No file was provided.
    NoFile,
    /// The upload failed; nothing else ran.
    UploadFailed,
    /// The ingestion job could not be started.
    NotStarted,
    /// Ingestion completed.
    Complete,
    /// Ingestion failed.
    Failed,
    /// Ingestion did not finish in time.
    TimedOut,
    /// Waiting was abandoned.
    Cancelled,
}

impl From<PollOutcome> for AddKnowledgeStatus {
    fn from(outcome: PollOutcome) -> Self {
        match outcome {
            PollOutcome::Complete => Self::Complete,
            PollOutcome::Failed => Self::Failed,
            PollOutcome::TimedOut => Self::TimedOut,
            PollOutcome::Cancelled => Self::Cancelled,
        }
    }
}

/// Outcome plus everything the user should see.
#[derive(Clone, Debug, Serialize)]
pub struct AddKnowledgeReport {
    /// Final status.
    pub status: AddKnowledgeStatus,
    /// Notices in the order they were produced.
    pub notices: Notices,
}

/// Runs the add-knowledge action against the remote collaborators.
pub struct KnowledgeIngestor<'a> {
    store: &'a dyn ObjectStore,
    control: &'a dyn IngestionControl,
    target: &'a KnowledgeBaseTarget,
    poll: PollConfig,
}

impl<'a> KnowledgeIngestor<'a> {
    /// Bind collaborators and configuration.
    #[must_use]
    pub const fn new(
        store: &'a dyn ObjectStore,
        control: &'a dyn IngestionControl,
        target: &'a KnowledgeBaseTarget,
        poll: PollConfig,
    ) -> Self {
        Self {
            store,
            control,
            target,
            poll,
        }
    }

    /// Upload `file`, start an ingestion job and wait for it.
    ///
    /// A failed upload halts the action before any job is started.
    pub async fn add_knowledge(&self, file: Option<UploadRequest>) -> AddKnowledgeReport {
        self.add_knowledge_until(file, std::future::pending()).await
    }

    /// Like [`KnowledgeIngestor::add_knowledge`], abandoning the wait when
    /// `cancel` resolves.
    pub async fn add_knowledge_until<F>(
        &self,
        file: Option<UploadRequest>,
        cancel: F,
    ) -> AddKnowledgeReport
    where
        F: Future<Output = ()>,
    {
        let mut notices = Notices::new();
        let status = self.run(file, &mut notices, cancel).await;
        AddKnowledgeReport { status, notices }
    }

    async fn run<F>(
        &self,
        file: Option<UploadRequest>,
        notices: &mut Notices,
        cancel: F,
    ) -> AddKnowledgeStatus
    where
        F: Future<Output = ()>,
    {
        let Some(file) = file else {
            notices.warning("Please upload a file first.");
            return AddKnowledgeStatus::NoFile;
        };

        if upload_document(self.store, &self.target.bucket, file, notices)
            .await
            .is_err()
        {
            return AddKnowledgeStatus::UploadFailed;
        }
        notices.info("File uploaded. Starting ingestion...");

        let Some(job_id) = start_ingestion(self.control, self.target, notices).await else {
            return AddKnowledgeStatus::NotStarted;
        };

        notices.info("Waiting for ingestion job to complete. This may take a few seconds...");
        let poller = IngestionPoller::new(
            self.control,
            &self.target.knowledge_base_id,
            &self.target.data_source_id,
            self.poll,
        );
        let report = poller
            .wait_for_completion_until(&job_id, notices, cancel)
            .await;

        tracing::info!(
            job_id = %job_id,
            outcome = report.outcome.as_str(),
            queries = report.queries,
            had_errors = notices.has_error(),
            "ingestion finished"
        );
        report.outcome.into()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::remote::fake::{FakeIngestion, FakeObjectStore};

    fn target() -> KnowledgeBaseTarget {
        KnowledgeBaseTarget {
            bucket: "kb-docs".to_string(),
            knowledge_base_id: "KB123".to_string(),
            data_source_id: "DS456".to_string(),
            model_arn: "arn:aws:bedrock:us-east-1::foundation-model/m".to_string(),
        }
    }

    fn poll() -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(300),
        }
    }

    fn file() -> Option<UploadRequest> {
        Some(UploadRequest::new("handbook.pdf", b"%PDF-1.7".to_vec()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_flow_completes() {
        let store = FakeObjectStore::default();
        let control = FakeIngestion::with_statuses(&["STARTING", "IN_PROGRESS", "COMPLETE"]);
        let target = target();
        let ingestor = KnowledgeIngestor::new(&store, &control, &target, poll());

        let report = ingestor.add_knowledge(file()).await;

        assert_eq!(report.status, AddKnowledgeStatus::Complete);
        assert_eq!(control.start_count(), 1);
        assert_eq!(control.query_count(), 3);
    }

    #[tokio::test]
    async fn test_permission_error_on_upload_skips_ingestion() {
        let store = FakeObjectStore {
            deny: true,
            ..FakeObjectStore::default()
        };
        let control = FakeIngestion::with_statuses(&["COMPLETE"]);
        let target = target();
        let ingestor = KnowledgeIngestor::new(&store, &control, &target, poll());

        let report = ingestor.add_knowledge(file()).await;

        assert_eq!(report.status, AddKnowledgeStatus::UploadFailed);
        assert_eq!(control.start_count(), 0);
        assert_eq!(control.query_count(), 0);
        assert!(report.notices.has_error());
    }

    #[tokio::test]
    async fn test_failed_start_skips_polling() {
        let store = FakeObjectStore::default();
        let control = FakeIngestion::rejecting_start();
        let target = target();
        let ingestor = KnowledgeIngestor::new(&store, &control, &target, poll());

        let report = ingestor.add_knowledge(file()).await;

        assert_eq!(report.status, AddKnowledgeStatus::NotStarted);
        assert_eq!(control.query_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_warns() {
        let store = FakeObjectStore::default();
        let control = FakeIngestion::default();
        let target = target();
        let ingestor = KnowledgeIngestor::new(&store, &control, &target, poll());

        let report = ingestor.add_knowledge(None).await;

        assert_eq!(report.status, AddKnowledgeStatus::NoFile);
        assert_eq!(control.start_count(), 0);
        let json = serde_json::to_value(&report).unwrap_or_default();
        assert_eq!(json["status"], "NO_FILE");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reported() {
        let store = FakeObjectStore::default();
        let control = FakeIngestion::with_statuses(&["IN_PROGRESS"]);
        let target = target();
        let ingestor = KnowledgeIngestor::new(&store, &control, &target, poll());

        let report = ingestor.add_knowledge(file()).await;

        assert_eq!(report.status, AddKnowledgeStatus::TimedOut);
        assert_eq!(control.query_count(), 30);
    }
}
