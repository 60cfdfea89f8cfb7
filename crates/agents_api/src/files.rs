//! Optional multipart upload of an attachment to `POST /files`.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::attachments::Attachment;
use crate::client::{AgentsApiClient, CancellationSignal};
use crate::error::AgentsApiError;

pub const DEFAULT_FILE_PURPOSE: &str = "assistants";

/// Server record for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub purpose: Option<String>,
}

impl AgentsApiClient {
    /// Uploads an attachment's bytes; the form is rebuilt for every retry attempt.
    pub async fn upload_file(
        &self,
        attachment: &Attachment,
        purpose: Option<&str>,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<FileObject, AgentsApiError> {
        let bytes = attachment.decode().map_err(|error| {
            AgentsApiError::InvalidPayload(format!(
                "attachment '{}' payload is not valid base64: {error}",
                attachment.name
            ))
        })?;
        let purpose = purpose.unwrap_or(DEFAULT_FILE_PURPOSE).to_owned();
        let segments = ["files"];

        let build = || {
            let part = Part::bytes(bytes.clone())
                .file_name(attachment.name.clone())
                .mime_str(&attachment.mime_type)
                .unwrap_or_else(|_| Part::bytes(bytes.clone()).file_name(attachment.name.clone()));
            let form = Form::new().text("purpose", purpose.clone()).part("file", part);
            self.http()
                .request(Method::POST, self.url_for(&segments))
                .headers(self.multipart_headers())
                .multipart(form)
        };

        let (_, value) = self
            .send_with_retry(build, &Method::POST, &segments, cancellation)
            .await?;
        tracing::info!(name = %attachment.name, size = attachment.size, "uploaded attachment");
        Ok(serde_json::from_value(value)?)
    }
}
