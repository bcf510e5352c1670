//! Domain error types for the invocation layer.
//!
//! Every lane returns a typed [`InvokeError`]; conversion to an
//! answer-shaped display string happens exactly once, at the dispatcher's
//! UI-facing surface. Nothing below that boundary stringifies failures.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Invocation errors
// ---------------------------------------------------------------------------

/// Errors from resolving an attachment or invoking a model backend.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// A credential or identifier required by the chosen lane is absent
    /// from configuration. Raised before any network call.
    #[error("Missing configuration: {name}")]
    MissingConfig { name: &'static str },

    /// The requested blob does not exist in the remote object store.
    /// The raster-substitution step recovers from this; elsewhere it is
    /// fatal for the invocation.
    #[error("Attachment not found in object store: {key}")]
    BlobNotFound { key: String },

    /// Object store failure other than absence (transport, auth, 5xx).
    #[error("Object store request failed: {0}")]
    Blob(String),

    /// The chat/vision backend answered with a non-success HTTP status.
    /// The body is preserved verbatim for diagnosis.
    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    /// An assistant run reached a terminal failure state.
    #[error("Assistant run finished with status: {status}")]
    UpstreamJob { status: String },

    /// The run-completion waiter exhausted its deadline while the run was
    /// still non-terminal.
    #[error("Assistant run still incomplete after {waited_secs}s")]
    Timeout { waited_secs: u64 },

    /// The document lane's allowlist rejected the attachment's extension.
    /// Soft failure: no network call was made.
    #[error("File format {extension} is not supported")]
    UnsupportedFormat { extension: String },

    /// The backend's response parsed but is missing an expected field.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InvokeError {
    /// Render the error as an answer-shaped string for the review surface.
    ///
    /// The evaluator records one answer string per invocation whether the
    /// model answered or the system failed; the prefix keeps the two
    /// distinguishable. Allowlist rejections get the full "call not made"
    /// sentence so an annotator knows no tokens were spent.
    pub fn displayable(&self) -> String {
        match self {
            InvokeError::UnsupportedFormat { extension } => format!(
                "File format {extension} is not supported by the model backend. API call not made."
            ),
            other => format!("Error invoking model API: {other}"),
        }
    }
}
