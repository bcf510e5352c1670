//! Configuration schema for gaiabench.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so a JSON dump of
//! the effective configuration uses camelCase keys while Rust code uses
//! snake_case fields. Values come from the environment (see `loader`); the
//! assembled [`Config`] is passed explicitly to every component that needs
//! it. Nothing reads the environment after construction.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Backend configs
// ---------------------------------------------------------------------------

/// OpenAI backend configuration.
///
/// `assistant_id` and `vector_store_id` are only required by the document
/// (retrieval) lane; they stay optional so audio/image/plain invocations
/// work without them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_store_id: Option<String>,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: default_api_base(),
            assistant_id: None,
            vector_store_id: None,
        }
    }
}

/// S3 object store configuration for attachment blobs.
///
/// `endpoint_url` overrides the AWS endpoint for S3-compatible services
/// (MinIO, LocalStack); when unset, the standard
/// `{bucket}.s3.{region}.amazonaws.com` host is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Config {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Invocation defaults
// ---------------------------------------------------------------------------

/// Tunables applied to every invocation unless a request overrides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvokeDefaults {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_vision_max_tokens")]
    pub vision_max_tokens: u32,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_model() -> String {
    "gpt-4o-mini-2024-07-18".to_string()
}

fn default_vision_max_tokens() -> u32 {
    500
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_run_deadline_secs() -> u64 {
    300
}

fn default_http_timeout_secs() -> u64 {
    60
}

impl Default for InvokeDefaults {
    fn default() -> Self {
        Self {
            model: default_model(),
            vision_max_tokens: default_vision_max_tokens(),
            transcription_model: default_transcription_model(),
            poll_interval_ms: default_poll_interval_ms(),
            run_deadline_secs: default_run_deadline_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Complete gaiabench configuration.
///
/// `s3` is `None` when no AWS variables are present; invocations with an
/// attachment then fail with a configuration error before any network call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Config>,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub invoke: InvokeDefaults,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("resources").join("benchmark_attachments")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            s3: None,
            cache_dir: default_cache_dir(),
            invoke: InvokeDefaults::default(),
        }
    }
}
