//! Local file attachments and their inline asset-reference encoding.
//!
//! A file is validated (size and MIME allow-list) before it is read into an
//! [`Attachment`]; encoding turns it into a `data:<mime>;base64,<payload>`
//! URI asset reference tagged with the tools allowed to read it.

use std::collections::BTreeSet;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted attachment, in bytes (10 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

pub const ALLOWED_MIME_TYPES: [&str; 11] = [
    "text/plain",
    "text/markdown",
    "application/pdf",
    "application/json",
    "text/csv",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
];

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("file '{name}' is too large ({size} bytes); the maximum is {limit} bytes")]
    Oversize { name: String, size: u64, limit: u64 },

    #[error("file '{name}' has unsupported type '{mime_type}'")]
    DisallowedType { name: String, mime_type: String },

    #[error("failed to read attachment {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Tool allowed to read an attached file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentTool {
    FileSearch,
    CodeInterpreter,
}

/// Set of tool grants applied to every attachment of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentTools(BTreeSet<AttachmentTool>);

impl Default for AttachmentTools {
    /// Grants both tools.
    fn default() -> Self {
        Self::from_iter([AttachmentTool::FileSearch, AttachmentTool::CodeInterpreter])
    }
}

impl FromIterator<AttachmentTool> for AttachmentTools {
    fn from_iter<I: IntoIterator<Item = AttachmentTool>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl AttachmentTools {
    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, tool: AttachmentTool) -> bool {
        self.0.contains(&tool)
    }

    fn to_wire(&self) -> Vec<MessageAttachmentTool> {
        self.0
            .iter()
            .map(|tool| MessageAttachmentTool { kind: *tool })
            .collect()
    }
}

/// A validated, base64-encoded local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    /// Standard base64 of the file bytes, without a data-URI prefix.
    pub payload: String,
}

impl Attachment {
    /// Validates and encodes in-memory file bytes.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, AttachmentError> {
        let name = name.into();
        let mime_type = mime_type.into().trim().to_ascii_lowercase();
        let size = bytes.len() as u64;
        validate(&name, size, &mime_type)?;

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            size,
            mime_type,
            payload: general_purpose::STANDARD.encode(bytes),
        })
    }

    /// Reads a file, inferring its MIME type from the extension.
    ///
    /// Size and type are checked from metadata before the contents are read.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let io_error = |source| AttachmentError::Io {
            path: path.display().to_string(),
            source,
        };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mime_type = mime_type_for_path(path);

        let metadata = tokio::fs::metadata(path).await.map_err(io_error)?;
        validate(&name, metadata.len(), mime_type)?;

        let bytes = tokio::fs::read(path).await.map_err(io_error)?;
        Self::from_bytes(name, mime_type, &bytes)
    }

    /// `data:<mime>;base64,<payload>`.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.payload)
    }

    /// Raw file bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.payload)
    }

    /// Wire attachment reference carrying the inline asset and tool grants.
    pub fn to_message_attachment(&self, tools: &AttachmentTools) -> MessageAttachment {
        MessageAttachment {
            file_id: None,
            data_source: Some(DataSource {
                kind: DataSourceKind::UriAsset,
                uri: self.data_uri(),
            }),
            tools: tools.to_wire(),
        }
    }
}

/// Encodes every attachment with the same tool grants.
pub fn encode_attachments(
    attachments: &[Attachment],
    tools: &AttachmentTools,
) -> Vec<MessageAttachment> {
    attachments
        .iter()
        .map(|attachment| attachment.to_message_attachment(tools))
        .collect()
}

/// Rejects files over [`MAX_ATTACHMENT_BYTES`] or outside [`ALLOWED_MIME_TYPES`].
///
/// Size is checked first, so an oversize file of a disallowed type reports oversize.
pub fn validate(name: &str, size: u64, mime_type: &str) -> Result<(), AttachmentError> {
    if size > MAX_ATTACHMENT_BYTES {
        return Err(AttachmentError::Oversize {
            name: name.to_owned(),
            size,
            limit: MAX_ATTACHMENT_BYTES,
        });
    }

    if !is_allowed_mime_type(mime_type) {
        return Err(AttachmentError::DisallowedType {
            name: name.to_owned(),
            mime_type: mime_type.to_owned(),
        });
    }

    Ok(())
}

pub fn is_allowed_mime_type(mime_type: &str) -> bool {
    ALLOWED_MIME_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(mime_type.trim()))
}

/// MIME type for a file extension; anything unknown maps to `application/octet-stream`.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "csv" => "text/csv",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => FALLBACK_MIME_TYPE,
    }
}

/// Human-readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_owned();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,
    pub tools: Vec<MessageAttachmentTool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAttachmentTool {
    #[serde(rename = "type")]
    pub kind: AttachmentTool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    #[serde(rename = "type")]
    pub kind: DataSourceKind,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    UriAsset,
    IdAsset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_format_matches_display_rules() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(mime_type_for_path(Path::new("Report.PDF")), "application/pdf");
        assert_eq!(mime_type_for_path(Path::new("setup.exe")), FALLBACK_MIME_TYPE);
        assert_eq!(mime_type_for_path(Path::new("README")), FALLBACK_MIME_TYPE);
    }

    #[test]
    fn mime_type_is_stored_normalized() {
        let attachment =
            Attachment::from_bytes("a.png", " Image/PNG ", b"png").expect("attachment");
        assert_eq!(attachment.mime_type, "image/png");
        assert!(attachment.data_uri().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn oversize_wins_over_disallowed_type() {
        let error = validate("big.exe", MAX_ATTACHMENT_BYTES + 1, "application/x-msdownload")
            .expect_err("oversize");
        assert!(matches!(error, AttachmentError::Oversize { .. }));
    }

    #[test]
    fn tool_grants_serialize_in_stable_order() {
        let attachment = Attachment::from_bytes("a.txt", "text/plain", b"hi").expect("attachment");
        let value = serde_json::to_value(attachment.to_message_attachment(&AttachmentTools::default()))
            .expect("serialize");
        assert_eq!(
            value["tools"],
            serde_json::json!([{"type": "file_search"}, {"type": "code_interpreter"}])
        );
        assert_eq!(value["data_source"]["type"], "uri_asset");
        assert_eq!(value["data_source"]["uri"], "data:text/plain;base64,aGk=");
    }
}
