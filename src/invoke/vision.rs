//! Lane for image attachments: one multimodal chat completion with the
//! image inlined as a base64 data URI.

use base64::Engine;
use serde_json::json;

use crate::backend::base::ChatBackend;
use crate::blob::resolver::ResolvedFile;
use crate::errors::InvokeError;

pub async fn invoke(
    backend: &dyn ChatBackend,
    model: &str,
    question: &str,
    image: &ResolvedFile,
    max_tokens: u32,
) -> Result<String, InvokeError> {
    let mime = image_mime(&image.extension).ok_or_else(|| InvokeError::UnsupportedFormat {
        extension: image.extension.clone(),
    })?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.bytes);

    let messages = [json!({
        "role": "user",
        "content": [
            { "type": "text", "text": question },
            {
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{mime};base64,{encoded}"),
                }
            },
        ],
    })];
    backend.complete(model, &messages, Some(max_tokens)).await
}

fn image_mime(extension: &str) -> Option<&'static str> {
    match extension {
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".png" => Some("image/png"),
        ".webp" => Some("image/webp"),
        ".gif" => Some("image/gif"),
        _ => None,
    }
}
