//! Lane for audio attachments: transcribe the recording, then answer the
//! question from the transcript with a second chat completion.

use std::path::Path;

use serde_json::json;
use tracing::debug;

use crate::backend::base::ChatBackend;
use crate::errors::InvokeError;

/// System instruction for the follow-up completion over the transcript.
pub const SYSTEM_PROMPT: &str = "You are an assistant answering questions about an audio recording. Base your answer only on the transcript provided in the user's message.";

pub async fn invoke(
    backend: &dyn ChatBackend,
    model: &str,
    transcription_model: &str,
    question: &str,
    audio_path: &Path,
) -> Result<String, InvokeError> {
    let transcript = backend.transcribe(transcription_model, audio_path).await?;
    debug!(chars = transcript.len(), "transcribed audio attachment");

    let messages = [
        json!({ "role": "system", "content": SYSTEM_PROMPT }),
        json!({
            "role": "user",
            "content": format!("{question}\n\nTranscript:\n{transcript}"),
        }),
    ];
    backend.complete(model, &messages, None).await
}
