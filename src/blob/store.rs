//! Object store abstraction for benchmark attachments.
//!
//! The resolver only needs two operations, so the trait stays narrow.
//! Production uses the SigV4-signed S3 client in `blob::s3`; tests inject
//! in-memory doubles.

use async_trait::async_trait;

use crate::errors::InvokeError;

/// Remote store holding the benchmark attachment blobs, keyed by filename.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether `key` exists, without fetching its content.
    ///
    /// Absence is `Ok(false)`; only transport or auth failures are errors.
    async fn head(&self, key: &str) -> Result<bool, InvokeError>;

    /// Fetch the object's bytes.
    ///
    /// An absent key is [`InvokeError::BlobNotFound`], which the resolver's
    /// raster-substitution step treats as recoverable.
    async fn get(&self, key: &str) -> Result<Vec<u8>, InvokeError>;
}
