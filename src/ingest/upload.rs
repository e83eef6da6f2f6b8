//! Upload relay: pushes a user file into the knowledge-base bucket.

use crate::error::{ChatbotError, ChatbotResult};
use crate::notice::Notices;
use crate::remote::ObjectStore;

/// A file handed over by the user.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Name of the file on the user's side.
    pub file_name: String,
    /// Destination key; defaults to `file_name`.
    pub object_name: Option<String>,
    /// File bytes.
    pub body: Vec<u8>,
}

impl UploadRequest {
    /// Create a request stored under the file's own name.
    pub fn new(file_name: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            object_name: None,
            body,
        }
    }

    /// Store under `object_name` instead of the file name.
    #[must_use]
    pub fn with_object_name(mut self, object_name: impl Into<String>) -> Self {
        self.object_name = Some(object_name.into());
        self
    }

    /// Key the file will be stored under.
    ///
    /// # Errors
    /// Returns `InvalidInput` if neither a destination nor a file name is set.
    pub fn destination(&self) -> ChatbotResult<&str> {
        self.object_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| Some(self.file_name.trim()).filter(|name| !name.is_empty()))
            .ok_or_else(|| ChatbotError::InvalidInput("uploaded file has no name".to_string()))
    }
}

/// Send `request` to `bucket`, reporting the result in `notices`.
///
/// # Errors
/// Returns the classified remote error, or `InvalidInput` for an unnamed or
/// empty file. No retry is attempted.
pub async fn upload_document(
    store: &dyn ObjectStore,
    bucket: &str,
    request: UploadRequest,
    notices: &mut Notices,
) -> ChatbotResult<String> {
    let file_name = request.file_name.clone();
    let result = relay(store, bucket, request).await;
    match &result {
        Ok(_) => notices.success(format!(
            "File {file_name} uploaded to S3 bucket {bucket} successfully."
        )),
        Err(e) if e.is_remote_client() => notices.error(format!("ClientError: {e}")),
        Err(e) => notices.error(format!("An error occurred: {e}")),
    }
    result
}

async fn relay(
    store: &dyn ObjectStore,
    bucket: &str,
    request: UploadRequest,
) -> ChatbotResult<String> {
    let key = request.destination()?.to_string();
    if request.body.is_empty() {
        return Err(ChatbotError::InvalidInput(format!("{key} is empty")));
    }

    tracing::debug!(bucket, key = %key, bytes = request.body.len(), "uploading document");
    store.put_object(bucket, &key, request.body).await?;
    Ok(key)
}
