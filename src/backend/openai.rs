//! OpenAI REST backend.
//!
//! One reqwest client serves both trait surfaces: chat completions and
//! audio transcription for [`ChatBackend`], and the assistants v2 endpoint
//! family (assistants, files, threads, runs, messages) for
//! [`AssistantBackend`]. Every non-success response becomes a typed
//! [`InvokeError::UpstreamStatus`] with the body preserved; nothing here
//! retries.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use crate::backend::base::{AssistantBackend, ChatBackend};
use crate::backend::types::{
    Assistant, FileObject, MessageList, MessageObject, RunObject, ThreadObject,
};
use crate::errors::InvokeError;

pub struct OpenAiBackend {
    api_key: String,
    api_base: String,
    client: Client,
}

impl OpenAiBackend {
    /// Build a backend over `api_base` with one shared HTTP client.
    ///
    /// The timeout applies per request; assistant runs outlive it because
    /// polling issues a fresh request each tick.
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        http_timeout: Duration,
    ) -> Result<Self, InvokeError> {
        let client = Client::builder().timeout(http_timeout).build()?;
        Ok(Self {
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Assistants endpoints require the v2 beta header.
    fn beta_request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.request(method, path)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, InvokeError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(InvokeError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn file_part(path: &Path) -> Result<reqwest::multipart::Part, InvokeError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        Ok(reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(
        &self,
        model: &str,
        messages: &[serde_json::Value],
        max_tokens: Option<u32>,
    ) -> Result<String, InvokeError> {
        let mut body = json!({
            "model": model,
            "messages": messages,
        });
        if let Some(cap) = max_tokens {
            body["max_tokens"] = json!(cap);
        }

        debug!(model, messages = messages.len(), "chat completion request");
        let resp = self
            .request(Method::POST, "/chat/completions")
            .json(&body)
            .send()
            .await?;
        let data: serde_json::Value = Self::read_json(resp).await?;
        extract_message_content(&data)
    }

    async fn transcribe(&self, model: &str, audio_path: &Path) -> Result<String, InvokeError> {
        let form = reqwest::multipart::Form::new()
            .part("file", Self::file_part(audio_path).await?)
            .text("model", model.to_string());

        debug!(model, path = %audio_path.display(), "transcription request");
        let resp = self
            .request(Method::POST, "/audio/transcriptions")
            .multipart(form)
            .send()
            .await?;
        let data: serde_json::Value = Self::read_json(resp).await?;
        data.get("text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                InvokeError::MalformedResponse("transcription response missing text".into())
            })
    }
}

#[async_trait]
impl AssistantBackend for OpenAiBackend {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, InvokeError> {
        let resp = self
            .beta_request(Method::GET, &format!("/assistants/{assistant_id}"))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn attach_vector_store(
        &self,
        assistant_id: &str,
        vector_store_id: &str,
    ) -> Result<Assistant, InvokeError> {
        let body = json!({
            "tool_resources": {
                "file_search": {
                    "vector_store_ids": [vector_store_id],
                }
            }
        });
        let resp = self
            .beta_request(Method::POST, &format!("/assistants/{assistant_id}"))
            .json(&body)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn upload_file(&self, path: &Path) -> Result<FileObject, InvokeError> {
        let form = reqwest::multipart::Form::new()
            .part("file", Self::file_part(path).await?)
            .text("purpose", "assistants");

        debug!(path = %path.display(), "uploading attachment for assistant use");
        let resp = self
            .request(Method::POST, "/files")
            .multipart(form)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn retrieve_file(&self, file_id: &str) -> Result<FileObject, InvokeError> {
        let resp = self
            .request(Method::GET, &format!("/files/{file_id}"))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn create_thread_with_attachment(
        &self,
        question: &str,
        file_id: &str,
    ) -> Result<ThreadObject, InvokeError> {
        let body = json!({
            "messages": [{
                "role": "user",
                "content": question,
                "attachments": [{
                    "file_id": file_id,
                    "tools": [{ "type": "file_search" }],
                }],
            }]
        });
        let resp = self
            .beta_request(Method::POST, "/threads")
            .json(&body)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
        model: &str,
    ) -> Result<RunObject, InvokeError> {
        let body = json!({
            "assistant_id": assistant_id,
            "model": model,
        });
        let resp = self
            .beta_request(Method::POST, &format!("/threads/{thread_id}/runs"))
            .json(&body)
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, InvokeError> {
        let resp = self
            .beta_request(Method::GET, &format!("/threads/{thread_id}/runs/{run_id}"))
            .send()
            .await?;
        Self::read_json(resp).await
    }

    async fn list_run_messages(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<Vec<MessageObject>, InvokeError> {
        let resp = self
            .beta_request(
                Method::GET,
                &format!("/threads/{thread_id}/messages?run_id={run_id}"),
            )
            .send()
            .await?;
        let list: MessageList = Self::read_json(resp).await?;
        Ok(list.data)
    }
}

/// Pull `choices[0].message.content` out of a chat-completions response.
fn extract_message_content(data: &serde_json::Value) -> Result<String, InvokeError> {
    data.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            InvokeError::MalformedResponse(
                "chat completion missing choices[0].message.content".into(),
            )
        })
}
