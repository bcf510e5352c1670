//! Wire types for the model backend.
//!
//! Chat-completions requests are built with `serde_json::json!` at the call
//! site; only the response shapes we actually read are modeled here. The
//! assistants surface (threads, runs, messages, annotations) is typed in
//! full because the retrieval lane walks deep into it.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Assistants
// ---------------------------------------------------------------------------

/// A persistent assistant identity.
#[derive(Debug, Clone, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub tool_resources: ToolResources,
}

impl Assistant {
    /// Whether `vector_store_id` is already bound to the file-search tool.
    pub fn has_vector_store(&self, vector_store_id: &str) -> bool {
        self.tool_resources
            .file_search
            .as_ref()
            .map(|fs| fs.vector_store_ids.iter().any(|id| id == vector_store_id))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolResources {
    #[serde(default)]
    pub file_search: Option<FileSearchResources>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileSearchResources {
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

/// An uploaded file's metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct FileObject {
    pub id: String,
    pub filename: String,
}

/// A conversation thread.
#[derive(Debug, Clone, Deserialize)]
pub struct ThreadObject {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Lifecycle status of an assistant run.
///
/// The backend reports exactly these states; an unlisted status fails
/// deserialization, which surfaces as a malformed-response error rather
/// than being misclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Incomplete,
    Expired,
    Completed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An asynchronous assistant job.
#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
}

// ---------------------------------------------------------------------------
// Messages & annotations
// ---------------------------------------------------------------------------

/// One list page of thread messages, newest first.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    #[serde(default)]
    pub data: Vec<MessageObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageObject {
    pub id: String,
    pub role: String,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl MessageObject {
    /// First text block of the message, if any.
    pub fn text(&self) -> Option<&MessageText> {
        self.content.iter().find_map(|c| match c {
            MessageContent::Text { text } => Some(text),
            MessageContent::Other => None,
        })
    }
}

/// A content block within a message. Only text blocks matter here; image
/// blocks and anything the API adds later fall into `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: MessageText },
    #[serde(other)]
    Other,
}

/// Message text plus the annotation spans attached to it.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageText {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// A citation span within message text.
///
/// `start_index`/`end_index` delimit the placeholder `text` the backend
/// inserted into `value`. The backend does not document whether these are
/// byte or code-point offsets, so consumers verify them against `text`
/// before use.
#[derive(Debug, Clone, Deserialize)]
pub struct Annotation {
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub file_citation: Option<FileCitation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileCitation {
    pub file_id: String,
}
