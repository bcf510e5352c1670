//! Lane for document attachments: file-search retrieval over the
//! assistants surface.
//!
//! One invocation uploads the attachment, opens a thread with the question,
//! starts a run against the configured assistant, waits for it to settle,
//! and rewrites the answer's citations into a readable bibliography.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::backend::base::AssistantBackend;
use crate::blob::resolver::ResolvedFile;
use crate::config::schema::{InvokeDefaults, OpenAiConfig};
use crate::errors::InvokeError;
use crate::invoke::citations;
use crate::invoke::lane::is_supported_document;
use crate::invoke::waiter::wait_for_run;

pub struct RetrievalInvoker {
    backend: Arc<dyn AssistantBackend>,
    assistant_id: Option<String>,
    vector_store_id: Option<String>,
    poll_interval: Duration,
    run_deadline: Duration,
    /// Set once the assistant/vector-store binding has been verified.
    /// Guarded so concurrent first invocations issue at most one update.
    ensured: Mutex<bool>,
}

impl RetrievalInvoker {
    pub fn new(
        backend: Arc<dyn AssistantBackend>,
        openai: &OpenAiConfig,
        defaults: &InvokeDefaults,
    ) -> Self {
        Self {
            backend,
            assistant_id: openai.assistant_id.clone(),
            vector_store_id: openai.vector_store_id.clone(),
            poll_interval: Duration::from_millis(defaults.poll_interval_ms),
            run_deadline: Duration::from_secs(defaults.run_deadline_secs),
            ensured: Mutex::new(false),
        }
    }

    pub async fn invoke(
        &self,
        model: &str,
        question: &str,
        file: &ResolvedFile,
    ) -> Result<String, InvokeError> {
        if !is_supported_document(&file.extension) {
            return Err(InvokeError::UnsupportedFormat {
                extension: file.extension.clone(),
            });
        }
        let assistant_id = self.assistant_id.as_deref().ok_or(InvokeError::MissingConfig {
            name: "OPENAI_ASSISTANT_ID",
        })?;
        let vector_store_id = self
            .vector_store_id
            .as_deref()
            .ok_or(InvokeError::MissingConfig {
                name: "OPENAI_VECTOR_STORE_ID",
            })?;

        self.ensure_vector_store(assistant_id, vector_store_id).await?;

        let uploaded = self.backend.upload_file(&file.local_path).await?;
        debug!(file_id = %uploaded.id, filename = %uploaded.filename, "uploaded attachment");

        let thread = self
            .backend
            .create_thread_with_attachment(question, &uploaded.id)
            .await?;
        let run = self.backend.create_run(&thread.id, assistant_id, model).await?;
        info!(thread_id = %thread.id, run_id = %run.id, model, "started retrieval run");

        let run = wait_for_run(
            self.backend.as_ref(),
            run,
            self.poll_interval,
            self.run_deadline,
        )
        .await?;

        let messages = self.backend.list_run_messages(&run.thread_id, &run.id).await?;
        let text = messages
            .iter()
            .find(|m| m.role == "assistant")
            .and_then(|m| m.text())
            .ok_or_else(|| {
                InvokeError::MalformedResponse("run completed without an assistant text message".into())
            })?;

        let rewritten = citations::apply_markers(&text.value, &text.annotations);
        let mut bibliography = Vec::new();
        for (idx, annotation) in text.annotations.iter().enumerate() {
            if let Some(citation) = &annotation.file_citation {
                let cited = self.backend.retrieve_file(&citation.file_id).await?;
                bibliography.push(format!("[{idx}] {}", cited.filename));
            }
        }
        Ok(citations::assemble_answer(rewritten, &bibliography))
    }

    /// Bind the vector store to the assistant's file-search tool if it
    /// is not already, at most once per invoker.
    async fn ensure_vector_store(
        &self,
        assistant_id: &str,
        vector_store_id: &str,
    ) -> Result<(), InvokeError> {
        let mut ensured = self.ensured.lock().await;
        if *ensured {
            return Ok(());
        }
        let assistant = self.backend.retrieve_assistant(assistant_id).await?;
        if !assistant.has_vector_store(vector_store_id) {
            self.backend
                .attach_vector_store(assistant_id, vector_store_id)
                .await?;
            info!(
                assistant_id,
                vector_store_id, "attached vector store to assistant"
            );
        }
        *ensured = true;
        Ok(())
    }
}
