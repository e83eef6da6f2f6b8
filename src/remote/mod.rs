//! Remote collaborators the chatbot delegates to.
//!
//! - `ObjectStore`: receives uploaded documents
//! - `IngestionControl`: starts and observes knowledge-base sync jobs
//! - `KnowledgeBaseRuntime`: retrieve-and-generate plus raw retrieval
//!
//! `aws` holds the AWS SDK implementations used in production.

pub mod aws;
#[cfg(test)]
pub mod fake;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ChatbotResult;

pub use aws::{AwsBackends, BedrockIngestion, BedrockKnowledgeBase, S3ObjectStore};

/// Opaque identifier of a remote ingestion job.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct IngestionJobId(String);

impl IngestionJobId {
    /// Wrap a job id returned by the service.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IngestionJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by the ingestion service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Job accepted, not yet running.
    Starting,
    /// Job running.
    InProgress,
    /// Job finished successfully.
    Complete,
    /// Job finished with an error.
    Failed,
    /// Stop requested.
    Stopping,
    /// Job stopped before completion.
    Stopped,
    /// Any status this client does not know about.
    Other(String),
}

impl JobStatus {
    /// Parse a service status string.
    #[must_use]
    pub fn from_remote(raw: &str) -> Self {
        match raw {
            "STARTING" => Self::Starting,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            "STOPPING" => Self::Stopping,
            "STOPPED" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }

    /// Service status string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "STARTING",
            Self::InProgress => "IN_PROGRESS",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Other(raw) => raw,
        }
    }

    /// Whether polling should stop on this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A passage returned by a retrieve-only query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievedPassage {
    /// Passage text.
    pub text: String,
    /// Relevance score, when the service provides one.
    pub score: Option<f64>,
    /// Source document location.
    pub source: Option<String>,
}

/// Remote object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` in `bucket` under `key`.
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> ChatbotResult<()>;
}

/// Remote ingestion job control.
#[async_trait]
pub trait IngestionControl: Send + Sync {
    /// Start syncing `data_source_id` into `knowledge_base_id`.
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> ChatbotResult<IngestionJobId>;

    /// Current status of a job.
    async fn ingestion_job_status(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        job_id: &IngestionJobId,
    ) -> ChatbotResult<JobStatus>;
}

/// Remote retrieval-augmented generation.
#[async_trait]
pub trait KnowledgeBaseRuntime: Send + Sync {
    /// Generate an answer to `query` grounded in the knowledge base.
    async fn retrieve_and_generate(
        &self,
        query: &str,
        knowledge_base_id: &str,
        model_arn: &str,
    ) -> ChatbotResult<String>;

    /// Fetch the passages the knowledge base ranks highest for `query`.
    async fn retrieve(
        &self,
        query: &str,
        knowledge_base_id: &str,
    ) -> ChatbotResult<Vec<RetrievedPassage>>;
}
