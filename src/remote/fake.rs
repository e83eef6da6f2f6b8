//! In-process collaborators for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{ChatbotError, ChatbotResult};

use super::{
    IngestionControl, IngestionJobId, JobStatus, KnowledgeBaseRuntime, ObjectStore,
    RetrievedPassage,
};

/// Error a fake returns when told to fail.
pub fn access_denied(operation: &'static str) -> ChatbotError {
    ChatbotError::RemoteClient {
        operation,
        detail: "AccessDenied: not authorized".to_string(),
    }
}

/// Records uploads; optionally rejects them.
#[derive(Default)]
pub struct FakeObjectStore {
    /// Reject every upload with a permission error.
    pub deny: bool,
    /// `(bucket, key, size)` of every accepted upload.
    pub puts: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> ChatbotResult<()> {
        if self.deny {
            return Err(access_denied("PutObject"));
        }
        if let Ok(mut puts) = self.puts.lock() {
            puts.push((bucket.to_string(), key.to_string(), body.len()));
        }
        Ok(())
    }
}

/// Plays back a scripted status sequence, repeating the last entry.
#[derive(Default)]
pub struct FakeIngestion {
    /// Reject job starts.
    pub deny_start: bool,
    script: Mutex<VecDeque<Option<JobStatus>>>,
    last: Mutex<Option<Option<JobStatus>>>,
    /// Number of start calls.
    pub starts: AtomicUsize,
    /// Number of status queries.
    pub queries: AtomicUsize,
}

impl FakeIngestion {
    /// Script status responses; `None` makes that query fail.
    #[must_use]
    pub fn scripted(statuses: Vec<Option<JobStatus>>) -> Self {
        Self {
            script: Mutex::new(statuses.into()),
            ..Self::default()
        }
    }

    /// Reject every job start with a permission error.
    #[must_use]
    pub fn rejecting_start() -> Self {
        Self {
            deny_start: true,
            ..Self::default()
        }
    }

    /// Script raw status strings that all succeed.
    #[must_use]
    pub fn with_statuses(statuses: &[&str]) -> Self {
        Self::scripted(
            statuses
                .iter()
                .map(|raw| Some(JobStatus::from_remote(raw)))
                .collect(),
        )
    }

    /// Status queries made so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Start calls made so far.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    fn next(&self) -> Option<JobStatus> {
        let (Ok(mut script), Ok(mut last)) = (self.script.lock(), self.last.lock()) else {
            return None;
        };
        if let Some(step) = script.pop_front() {
            *last = Some(step.clone());
            return step;
        }
        last.clone().flatten()
    }
}

#[async_trait]
impl IngestionControl for FakeIngestion {
    async fn start_ingestion_job(
        &self,
        _knowledge_base_id: &str,
        _data_source_id: &str,
    ) -> ChatbotResult<IngestionJobId> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.deny_start {
            return Err(access_denied("StartIngestionJob"));
        }
        Ok(IngestionJobId::new("job-1"))
    }

    async fn ingestion_job_status(
        &self,
        _knowledge_base_id: &str,
        _data_source_id: &str,
        _job_id: &IngestionJobId,
    ) -> ChatbotResult<JobStatus> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.next().ok_or_else(|| ChatbotError::RemoteService {
            operation: "GetIngestionJob",
            detail: "ThrottlingException".to_string(),
        })
    }
}

/// Echoes queries back as answers.
#[derive(Default)]
pub struct FakeKnowledgeBase {
    /// Fail generation.
    pub fail_generate: bool,
    /// Fail the diagnostic retrieval.
    pub fail_retrieve: bool,
    /// Queries seen by `retrieve_and_generate`.
    pub generated: Mutex<Vec<String>>,
    /// Number of retrieve calls.
    pub retrieves: AtomicUsize,
}

#[async_trait]
impl KnowledgeBaseRuntime for FakeKnowledgeBase {
    async fn retrieve_and_generate(
        &self,
        query: &str,
        _knowledge_base_id: &str,
        _model_arn: &str,
    ) -> ChatbotResult<String> {
        if self.fail_generate {
            return Err(ChatbotError::RemoteService {
                operation: "RetrieveAndGenerate",
                detail: "ValidationException".to_string(),
            });
        }
        if let Ok(mut generated) = self.generated.lock() {
            generated.push(query.to_string());
        }
        Ok(format!("answer to: {query}"))
    }

    async fn retrieve(
        &self,
        query: &str,
        _knowledge_base_id: &str,
    ) -> ChatbotResult<Vec<RetrievedPassage>> {
        self.retrieves.fetch_add(1, Ordering::SeqCst);
        if self.fail_retrieve {
            return Err(access_denied("Retrieve"));
        }
        Ok(vec![RetrievedPassage {
            text: format!("passage about {query}"),
            score: Some(0.9),
            source: Some("s3://kb-docs/doc.pdf".to_string()),
        }])
    }
}
