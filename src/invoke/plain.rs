//! Lane for questions without an attachment: a single chat completion.

use serde_json::json;

use crate::backend::base::ChatBackend;
use crate::errors::InvokeError;

/// System instruction sent with every bare benchmark question.
pub const SYSTEM_PROMPT: &str = "You are an assistant designed to provide clear and accurate answers based on the information in the user's prompt. Use your knowledge to reason through the query and offer concise, relevant, and well-explained responses.";

pub async fn invoke(
    backend: &dyn ChatBackend,
    model: &str,
    question: &str,
) -> Result<String, InvokeError> {
    let messages = [
        json!({ "role": "system", "content": SYSTEM_PROMPT }),
        json!({ "role": "user", "content": question }),
    ];
    backend.complete(model, &messages, None).await
}
