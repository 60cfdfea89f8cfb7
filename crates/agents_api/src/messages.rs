//! Thread messages and assistant reply extraction.
//!
//! Message content arrives either as a plain string or as an ordered list of
//! typed blocks. [`MessageContent::normalize`] flattens both into one string
//! and is total: every shape that deserializes also normalizes.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Stand-in text for non-text content blocks.
pub const NON_TEXT_PLACEHOLDER: &str = "[File]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// Text payload of a `text` block: `{value, annotations}` or a bare string.
///
/// A missing `value` reads as the empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextValue {
    Structured {
        #[serde(default)]
        value: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        annotations: Vec<Value>,
    },
    Plain(String),
}

impl TextValue {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Structured { value, .. } => value,
            Self::Plain(value) => value,
        }
    }
}

/// One typed content block. Every payload field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<TextValue>,
    },
    ImageFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_file: Option<Value>,
    },
    ImageUrl {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<Value>,
    },
    #[serde(other)]
    Other,
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            text: Some(TextValue::Structured {
                value: value.into(),
                annotations: Vec::new(),
            }),
        }
    }

    fn normalized(&self) -> &str {
        match self {
            Self::Text { text } => text.as_ref().map(TextValue::as_str).unwrap_or_default(),
            Self::ImageFile { .. } | Self::ImageUrl { .. } | Self::Other => NON_TEXT_PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Blocks(Vec::new())
    }
}

impl MessageContent {
    /// Flattens content into a single string.
    ///
    /// Text blocks contribute their text, every other block the placeholder;
    /// blocks are joined with `\n` in their original order.
    pub fn normalize(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .map(ContentBlock::normalized)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: MessageContent,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
}

/// `null` reads as the type's default instead of failing the whole message.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ThreadMessage {
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }

    pub fn text(&self) -> String {
        self.content.normalize()
    }
}

/// Most recently created assistant message.
///
/// Selection is not run-scoped: with two runs in flight on one thread the
/// newest assistant message may belong to the other run. Ties on `created_at`
/// keep the earliest position in `messages`.
pub fn latest_assistant_message(messages: &[ThreadMessage]) -> Option<&ThreadMessage> {
    let mut assistants: Vec<&ThreadMessage> = messages
        .iter()
        .filter(|message| message.is_assistant())
        .collect();
    assistants.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    assistants.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(id: &str, role: &str, created_at: i64, content: Value) -> ThreadMessage {
        serde_json::from_value(json!({
            "id": id,
            "role": role,
            "created_at": created_at,
            "content": content,
        }))
        .expect("thread message")
    }

    #[test]
    fn normalize_plain_string_is_identity() {
        assert_eq!(MessageContent::Text("hi".into()).normalize(), "hi");
    }

    #[test]
    fn normalize_empty_block_list_is_empty_string() {
        assert_eq!(MessageContent::Blocks(Vec::new()).normalize(), "");
    }

    #[test]
    fn normalize_mixed_blocks_preserves_order_and_placeholders() {
        let content: MessageContent = serde_json::from_value(json!([
            {"type": "text", "text": {"value": "first", "annotations": []}},
            {"type": "image_file", "image_file": {"file_id": "file_1"}},
            {"type": "text", "text": "second"},
            {"type": "image_url", "image_url": {"url": "https://x.test/a.png"}},
            {"type": "refusal", "refusal": "no"}
        ]))
        .expect("content");

        assert_eq!(content.normalize(), "first\n[File]\nsecond\n[File]\n[File]");
    }

    #[test]
    fn blocks_without_payload_still_normalize() {
        let content: MessageContent = serde_json::from_value(json!([
            {"type": "text"},
            {"type": "text", "text": null},
            {"type": "text", "text": {"annotations": []}},
            {"type": "text", "text": {"value": "hi"}},
            {"type": "image_file"},
            {"type": "image_url", "image_url": null}
        ]))
        .expect("partial blocks");

        assert_eq!(content.normalize(), "\n\n\nhi\n[File]\n[File]");
    }

    #[test]
    fn null_content_reads_as_empty() {
        let message = message("m1", "assistant", 1, Value::Null);
        assert_eq!(message.content, MessageContent::default());
        assert_eq!(message.text(), "");
    }

    #[test]
    fn partial_block_in_user_message_keeps_assistant_reply_reachable() {
        let messages: Vec<ThreadMessage> = serde_json::from_value(json!([
            {"id": "u1", "role": "user", "created_at": 1, "content": [{"type": "image_url"}]},
            {"id": "a1", "role": "assistant", "created_at": 2,
             "content": [{"type": "text", "text": {"value": "Hi there", "annotations": []}}]}
        ]))
        .expect("message list");

        let latest = latest_assistant_message(&messages).expect("assistant");
        assert_eq!(latest.text(), "Hi there");
        assert_eq!(messages[0].text(), "[File]");
    }

    #[test]
    fn latest_assistant_picks_newest_created_at() {
        let messages = vec![
            message("m3", "user", 30, json!("question")),
            message("m1", "assistant", 10, json!("old")),
            message("m2", "assistant", 20, json!("new")),
        ];

        let latest = latest_assistant_message(&messages).expect("assistant");
        assert_eq!(latest.id, "m2");
        assert_eq!(latest.text(), "new");
    }

    #[test]
    fn latest_assistant_is_none_without_assistant_messages() {
        let messages = vec![message("m1", "user", 1, json!("hello"))];
        assert!(latest_assistant_message(&messages).is_none());
    }

    #[test]
    fn latest_assistant_tie_keeps_first_in_server_order() {
        let messages = vec![
            message("a", "assistant", 5, json!("first")),
            message("b", "assistant", 5, json!("second")),
        ];
        assert_eq!(latest_assistant_message(&messages).expect("assistant").id, "a");
    }
}
