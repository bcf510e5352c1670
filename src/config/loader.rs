//! Environment-based configuration loading.
//!
//! The review UI around this crate deploys with credentials in the process
//! environment, so loading means reading a fixed set of variables once and
//! assembling an explicit [`Config`]. Empty variables count as unset,
//! matching how the deployment scripts template them.

use std::path::PathBuf;

use tracing::warn;

use crate::config::schema::{Config, S3Config};
use crate::errors::InvokeError;

const OPENAI_KEY: &str = "OPENAI_KEY";
const OPENAI_API_BASE: &str = "OPENAI_API_BASE";
const OPENAI_ASSISTANT_ID: &str = "OPENAI_ASSISTANT_ID";
const OPENAI_VECTOR_STORE_ID: &str = "OPENAI_VECTOR_STORE_ID";

const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
const AWS_REGION: &str = "AWS_REGION";
const AWS_S3_BUCKET: &str = "AWS_S3_BUCKET";
const AWS_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";

const GAIA_CACHE_DIR: &str = "GAIA_CACHE_DIR";
const GAIA_MODEL: &str = "GAIA_MODEL";
const GAIA_RUN_DEADLINE_SECS: &str = "GAIA_RUN_DEADLINE_SECS";

/// Assemble a [`Config`] from the process environment.
///
/// `OPENAI_KEY` is required (every lane talks to the chat backend). The
/// AWS variable group is all-or-nothing: fully absent leaves `s3` unset,
/// a partial set is an error naming the first missing variable.
pub fn load_from_env() -> Result<Config, InvokeError> {
    from_lookup(|name| std::env::var(name).ok())
}

fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Config, InvokeError> {
    // Empty strings behave as unset.
    let get = |name: &str| get(name).filter(|v| !v.is_empty());

    let mut cfg = Config::default();

    cfg.openai.api_key = get(OPENAI_KEY).ok_or(InvokeError::MissingConfig { name: OPENAI_KEY })?;
    if let Some(base) = get(OPENAI_API_BASE) {
        cfg.openai.api_base = base.trim_end_matches('/').to_string();
    }
    cfg.openai.assistant_id = get(OPENAI_ASSISTANT_ID);
    cfg.openai.vector_store_id = get(OPENAI_VECTOR_STORE_ID);

    cfg.s3 = s3_from_lookup(&get)?;

    if let Some(dir) = get(GAIA_CACHE_DIR) {
        cfg.cache_dir = PathBuf::from(dir);
    }
    if let Some(model) = get(GAIA_MODEL) {
        cfg.invoke.model = model;
    }
    if let Some(raw) = get(GAIA_RUN_DEADLINE_SECS) {
        match raw.parse::<u64>() {
            Ok(secs) => cfg.invoke.run_deadline_secs = secs,
            Err(_) => warn!(
                "Ignoring unparseable {}={:?}; keeping default {}s",
                GAIA_RUN_DEADLINE_SECS, raw, cfg.invoke.run_deadline_secs
            ),
        }
    }

    Ok(cfg)
}

fn s3_from_lookup(
    get: &impl Fn(&str) -> Option<String>,
) -> Result<Option<S3Config>, InvokeError> {
    let required: [&'static str; 4] = [
        AWS_ACCESS_KEY_ID,
        AWS_SECRET_ACCESS_KEY,
        AWS_REGION,
        AWS_S3_BUCKET,
    ];
    let values: Vec<Option<String>> = required.iter().map(|name| get(name)).collect();

    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    for (name, value) in required.iter().zip(&values) {
        if value.is_none() {
            return Err(InvokeError::MissingConfig { name });
        }
    }

    let mut it = values.into_iter().flatten();
    Ok(Some(S3Config {
        access_key_id: it.next().unwrap_or_default(),
        secret_access_key: it.next().unwrap_or_default(),
        region: it.next().unwrap_or_default(),
        bucket: it.next().unwrap_or_default(),
        endpoint_url: get(AWS_ENDPOINT_URL),
    }))
}
