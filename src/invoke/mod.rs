//! Attachment-aware model invocation.
//!
//! [`Dispatcher`] is the single entry point: it resolves the attachment (if
//! any), classifies it into a lane, and drives the matching invoker. Every
//! lane reports through the same [`InvokeError`] type;
//! [`Dispatcher::invoke_displayable`] flattens failures into answer-shaped
//! strings for surfaces that render whatever they are handed.

pub mod audio;
pub mod citations;
pub mod lane;
pub mod plain;
pub mod retrieval;
pub mod vision;
pub mod waiter;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::base::{AssistantBackend, ChatBackend};
use crate::backend::openai::OpenAiBackend;
use crate::blob::resolver::BlobResolver;
use crate::blob::s3::S3ObjectStore;
use crate::config::schema::{Config, InvokeDefaults, OpenAiConfig};
use crate::errors::InvokeError;
use crate::invoke::lane::Lane;
use crate::invoke::retrieval::RetrievalInvoker;

/// One question for one model, optionally tied to a benchmark attachment.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub question: String,
    pub model: String,
    /// Blob-store key or bare filename of the attachment.
    pub attachment: Option<String>,
}

impl InvocationRequest {
    pub fn new(question: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            model: model.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, key: impl Into<String>) -> Self {
        self.attachment = Some(key.into());
        self
    }
}

/// Routes invocation requests to the lane their attachment calls for.
pub struct Dispatcher {
    chat: Arc<dyn ChatBackend>,
    retrieval: RetrievalInvoker,
    resolver: Option<BlobResolver>,
    defaults: InvokeDefaults,
}

impl Dispatcher {
    pub fn new(
        chat: Arc<dyn ChatBackend>,
        assistant: Arc<dyn AssistantBackend>,
        resolver: Option<BlobResolver>,
        openai: &OpenAiConfig,
        defaults: InvokeDefaults,
    ) -> Self {
        Self {
            chat,
            retrieval: RetrievalInvoker::new(assistant, openai, &defaults),
            resolver,
            defaults,
        }
    }

    /// Production wiring: one OpenAI client behind both backend traits,
    /// and a blob resolver only when S3 is configured.
    pub fn from_config(config: &Config) -> Result<Self, InvokeError> {
        let http_timeout = Duration::from_secs(config.invoke.http_timeout_secs);
        let backend = Arc::new(OpenAiBackend::new(
            config.openai.api_key.clone(),
            config.openai.api_base.clone(),
            http_timeout,
        )?);

        let resolver = match &config.s3 {
            Some(s3) => {
                let client = reqwest::Client::builder().timeout(http_timeout).build()?;
                let store = Arc::new(S3ObjectStore::new(s3.clone(), client));
                Some(BlobResolver::new(store, &config.cache_dir))
            }
            None => None,
        };

        Ok(Self::new(
            backend.clone(),
            backend,
            resolver,
            &config.openai,
            config.invoke.clone(),
        ))
    }

    /// Answer `request`, routing on the attachment's effective extension.
    pub async fn invoke(&self, request: &InvocationRequest) -> Result<String, InvokeError> {
        let Some(key) = &request.attachment else {
            debug!(model = %request.model, "invoking without attachment");
            return plain::invoke(self.chat.as_ref(), &request.model, &request.question).await;
        };

        let resolver = self.resolver.as_ref().ok_or(InvokeError::MissingConfig {
            name: "AWS_S3_BUCKET",
        })?;
        let file = resolver.resolve(key).await?;
        let lane = Lane::classify(&file.extension);
        debug!(
            model = %request.model,
            attachment = %key,
            extension = %file.extension,
            ?lane,
            "invoking with attachment"
        );

        match lane {
            Lane::Audio => {
                audio::invoke(
                    self.chat.as_ref(),
                    &request.model,
                    &self.defaults.transcription_model,
                    &request.question,
                    &file.local_path,
                )
                .await
            }
            Lane::Image => {
                vision::invoke(
                    self.chat.as_ref(),
                    &request.model,
                    &request.question,
                    &file,
                    self.defaults.vision_max_tokens,
                )
                .await
            }
            Lane::Document => self.retrieval.invoke(&request.model, &request.question, &file).await,
        }
    }

    /// Like [`invoke`](Self::invoke), but failures come back as strings an
    /// operator can read next to real answers.
    pub async fn invoke_displayable(&self, request: &InvocationRequest) -> String {
        match self.invoke(request).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(%error, model = %request.model, "invocation failed");
                error.displayable()
            }
        }
    }
}
