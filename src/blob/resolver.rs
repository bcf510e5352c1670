//! Attachment resolution: remote blob to locally cached file.
//!
//! Benchmark attachments live in an object store keyed by bare filename;
//! test cases reference them through a logical key that may still carry a
//! directory prefix from the dataset export. Resolution normalizes the key
//! to its basename, serves from the local cache when possible, and
//! downloads on miss.
//!
//! Spreadsheet and PDF attachments have a pre-rendered `.png` sibling in
//! the store; on a cache miss for those formats the resolver prefers the
//! rendered image and silently swaps the effective extension.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info};

use crate::blob::store::ObjectStore;
use crate::errors::InvokeError;

/// Formats whose pre-rendered `.png` sibling is preferred on cache miss.
pub const RASTER_SUBSTITUTED_FORMATS: [&str; 2] = [".xlsx", ".pdf"];

/// A locally materialized attachment.
#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub bytes: Vec<u8>,
    pub local_path: PathBuf,
    /// Lowercased extension with leading dot (`".pdf"`), empty when the
    /// filename has none. Reflects the file actually returned, so raster
    /// substitution reports `".png"`.
    pub extension: String,
}

/// Resolves logical attachment keys against a store and a cache directory.
pub struct BlobResolver {
    store: Arc<dyn ObjectStore>,
    cache_dir: PathBuf,
}

impl BlobResolver {
    pub fn new(store: Arc<dyn ObjectStore>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            cache_dir: cache_dir.into(),
        }
    }

    /// Materialize `key` locally and return its content.
    ///
    /// Order: local cache, then the `.png` sibling for raster-substituted
    /// formats, then the object itself. Remote absence is only recoverable
    /// inside the substitution step; everywhere else it propagates as
    /// [`InvokeError::BlobNotFound`].
    pub async fn resolve(&self, key: &str) -> Result<ResolvedFile, InvokeError> {
        let filename = basename(key);
        let extension = extension_of(&filename);

        if RASTER_SUBSTITUTED_FORMATS.contains(&extension.as_str()) {
            // A cached original still wins; only on miss do we go looking
            // for the rendered image.
            if let Some(hit) = self.read_cached(&filename).await? {
                return Ok(hit);
            }
            let png_name = swap_extension_to_png(&filename);
            match self.materialize(&png_name).await {
                Ok(resolved) => {
                    info!(key, substitute = %png_name, "using pre-rendered image for attachment");
                    return Ok(resolved);
                }
                Err(InvokeError::BlobNotFound { .. }) => {
                    debug!(key, "no pre-rendered image, falling back to the original");
                }
                Err(e) => return Err(e),
            }
        }

        self.materialize(&filename).await
    }

    /// Cache-or-download for one concrete filename, no substitution.
    async fn materialize(&self, filename: &str) -> Result<ResolvedFile, InvokeError> {
        if let Some(hit) = self.read_cached(filename).await? {
            return Ok(hit);
        }

        // Probe before fetching so absence never streams an error body.
        if !self.store.head(filename).await? {
            return Err(InvokeError::BlobNotFound {
                key: filename.to_string(),
            });
        }

        let bytes = self.store.get(filename).await?;
        fs::create_dir_all(&self.cache_dir).await?;
        let local_path = self.cache_dir.join(filename);
        fs::write(&local_path, &bytes).await?;
        info!(key = filename, size = bytes.len(), "downloaded attachment into cache");

        Ok(ResolvedFile {
            bytes,
            local_path,
            extension: extension_of(filename),
        })
    }

    async fn read_cached(&self, filename: &str) -> Result<Option<ResolvedFile>, InvokeError> {
        let local_path = self.cache_dir.join(filename);
        match fs::read(&local_path).await {
            Ok(bytes) => {
                debug!(key = filename, "attachment cache hit");
                Ok(Some(ResolvedFile {
                    bytes,
                    local_path,
                    extension: extension_of(filename),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Final path component of a logical key.
pub fn basename(key: &str) -> String {
    key.rsplit('/').next().unwrap_or(key).to_string()
}

/// Lowercased extension with leading dot, or empty when there is none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

fn swap_extension_to_png(filename: &str) -> String {
    Path::new(filename)
        .with_extension("png")
        .to_string_lossy()
        .into_owned()
}
