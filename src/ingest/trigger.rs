//! Job trigger: asks the ingestion service to sync the data source.

use crate::config::KnowledgeBaseTarget;
use crate::notice::Notices;
use crate::remote::{IngestionControl, IngestionJobId};

/// Start an ingestion job for `target`.
///
/// Returns `None` when the job could not be started; the error is already in
/// `notices` and the caller must not poll.
pub async fn start_ingestion(
    control: &dyn IngestionControl,
    target: &KnowledgeBaseTarget,
    notices: &mut Notices,
) -> Option<IngestionJobId> {
    match control
        .start_ingestion_job(&target.knowledge_base_id, &target.data_source_id)
        .await
    {
        Ok(job_id) => {
            notices.success(format!(
                "Ingestion job started successfully with ID: {job_id}"
            ));
            Some(job_id)
        }
        Err(e) => {
            notices.error(format!("Error starting ingestion job: {e}"));
            None
        }
    }
}
