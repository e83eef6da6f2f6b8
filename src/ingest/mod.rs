//! Knowledge ingestion: upload relay, job trigger and job poller.

pub mod flow;
pub mod poller;
pub mod trigger;
pub mod upload;

pub use flow::{AddKnowledgeReport, AddKnowledgeStatus, KnowledgeIngestor};
pub use poller::{IngestionPoller, PollOutcome, PollReport};
pub use trigger::start_ingestion;
pub use upload::{UploadRequest, upload_document};
