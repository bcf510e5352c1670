//! Backend traits the invocation lanes are written against.
//!
//! Production has one implementation of each (`backend::openai`); tests
//! substitute in-process doubles to drive the lanes without network.

use std::path::Path;

use async_trait::async_trait;

use crate::backend::types::{Assistant, FileObject, MessageObject, RunObject, ThreadObject};
use crate::errors::InvokeError;

/// Synchronous model operations: chat completions and speech-to-text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One chat completion request.
    ///
    /// `messages` follow the chat-completions wire shape (`role` plus
    /// string-or-parts `content`); the first choice's message text is
    /// returned. `max_tokens` caps the response when set.
    async fn complete(
        &self,
        model: &str,
        messages: &[serde_json::Value],
        max_tokens: Option<u32>,
    ) -> Result<String, InvokeError>;

    /// Transcribe a local audio file to plain text.
    async fn transcribe(&self, model: &str, audio_path: &Path) -> Result<String, InvokeError>;
}

/// Asynchronous assistant operations used by the retrieval lane.
///
/// One method per backend endpoint the lane touches, in call order.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, InvokeError>;

    /// Bind `vector_store_id` to the assistant's file-search tool.
    async fn attach_vector_store(
        &self,
        assistant_id: &str,
        vector_store_id: &str,
    ) -> Result<Assistant, InvokeError>;

    /// Upload a local file scoped for assistant use.
    async fn upload_file(&self, path: &Path) -> Result<FileObject, InvokeError>;

    /// Fetch an uploaded file's metadata (used to display cited filenames).
    async fn retrieve_file(&self, file_id: &str) -> Result<FileObject, InvokeError>;

    /// Open a thread seeded with one user message carrying the question and
    /// a file-search attachment.
    async fn create_thread_with_attachment(
        &self,
        question: &str,
        file_id: &str,
    ) -> Result<ThreadObject, InvokeError>;

    /// Launch a run of `assistant_id` over the thread, overriding the model.
    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        model: &str,
    ) -> Result<RunObject, InvokeError>;

    /// Fetch the current state of a run.
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, InvokeError>;

    /// List the messages a run produced, newest first.
    async fn list_run_messages(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<MessageObject>, InvokeError>;
}
