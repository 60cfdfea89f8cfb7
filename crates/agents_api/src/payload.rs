use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::attachments::MessageAttachment;

pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 4000;
pub const DEFAULT_MAX_PROMPT_TOKENS: u32 = 16000;

/// Caller overrides for run generation parameters.
///
/// Unset fields fall back to the transport defaults in [`RunOptions::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    pub temperature: Option<f64>,
    pub max_completion_tokens: Option<u32>,
    pub max_prompt_tokens: Option<u32>,
    pub parallel_tool_calls: Option<bool>,
    pub model: Option<String>,
    pub instructions: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl RunOptions {
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_completion_tokens(mut self, tokens: u32) -> Self {
        self.max_completion_tokens = Some(tokens);
        self
    }

    pub fn with_max_prompt_tokens(mut self, tokens: u32) -> Self {
        self.max_prompt_tokens = Some(tokens);
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn insert_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub(crate) fn resolve(&self) -> RunParameters {
        RunParameters {
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_completion_tokens: self
                .max_completion_tokens
                .unwrap_or(DEFAULT_MAX_COMPLETION_TOKENS),
            max_prompt_tokens: self.max_prompt_tokens.unwrap_or(DEFAULT_MAX_PROMPT_TOKENS),
            parallel_tool_calls: self.parallel_tool_calls.unwrap_or(true),
            model: self.model.clone(),
            instructions: self.instructions.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Generation parameters as they go on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    pub temperature: f64,
    pub max_completion_tokens: u32,
    pub max_prompt_tokens: u32,
    pub parallel_tool_calls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

/// One user turn as submitted to a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessageOption {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<MessageAttachment>,
}

impl ThreadMessageOption {
    pub fn user(content: impl Into<String>, attachments: Vec<MessageAttachment>) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.into(),
            attachments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadCreationOptions {
    pub messages: Vec<ThreadMessageOption>,
}

/// Body of `POST /threads/runs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateThreadAndRunRequest {
    pub assistant_id: String,
    pub thread: ThreadCreationOptions,
    #[serde(flatten)]
    pub parameters: RunParameters,
}

impl CreateThreadAndRunRequest {
    pub fn new(
        assistant_id: impl Into<String>,
        message: ThreadMessageOption,
        options: &RunOptions,
    ) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            thread: ThreadCreationOptions {
                messages: vec![message],
            },
            parameters: options.resolve(),
        }
    }
}

/// Body of `POST /threads/{thread_id}/runs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRunRequest {
    pub assistant_id: String,
    #[serde(flatten)]
    pub parameters: RunParameters,
}

impl CreateRunRequest {
    pub fn new(assistant_id: impl Into<String>, options: &RunOptions) -> Self {
        Self {
            assistant_id: assistant_id.into(),
            parameters: options.resolve(),
        }
    }
}

/// `{ "object": "list", "data": [...] }` envelope; a missing `data` array is empty.
#[derive(Debug, Clone, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}
