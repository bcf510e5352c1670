//! S3-backed object store.
//!
//! Talks to the S3 REST API directly with AWS Signature V4 authentication,
//! using pure-Rust crypto (`hmac` + `sha2`) so no C toolchain or vendored
//! AWS SDK is involved. Supports custom endpoints for S3-compatible
//! services (MinIO, LocalStack) via `S3Config::endpoint_url`.
//!
//! Only the two operations the attachment resolver needs are implemented:
//! a signed HEAD (existence probe) and a signed GET (download).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::blob::store::ObjectStore;
use crate::config::schema::S3Config;
use crate::errors::InvokeError;

type HmacSha256 = Hmac<Sha256>;

/// Object store over one S3 bucket, keys addressed bucket-relative.
pub struct S3ObjectStore {
    config: S3Config,
    client: reqwest::Client,
}

/// Headers produced by signing one request.
struct Signature {
    amz_date: String,
    payload_hash: String,
    authorization: String,
}

impl S3ObjectStore {
    pub fn new(config: S3Config, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Scheme and host for the bucket endpoint.
    ///
    /// A custom `endpoint_url` wins (keeping its scheme, so plain-HTTP
    /// MinIO works); otherwise the standard virtual-hosted-style AWS host.
    fn endpoint(&self) -> (&'static str, String) {
        match self.config.endpoint_url.as_deref() {
            Some(endpoint) => {
                let scheme = if endpoint.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                (scheme, host)
            }
            None => (
                "https",
                format!(
                    "{}.s3.{}.amazonaws.com",
                    self.config.bucket, self.config.region
                ),
            ),
        }
    }

    /// Sign a bodyless request with AWS SigV4.
    ///
    /// GET and HEAD both sign the empty-payload hash; the canonical query
    /// string is always empty because object operations carry no params.
    fn sign(&self, method: &str, canonical_uri: &str, host: &str, now: DateTime<Utc>) -> Signature {
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(b"");

        // Header names sorted lexicographically, as SigV4 requires.
        let canonical_headers = format!(
            "host:{host}\nx-amz-content-sha256:{payload_hash}\nx-amz-date:{amz_date}\n"
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";

        let canonical_request = format!(
            "{method}\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.config.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.config.access_key_id, credential_scope, signed_headers, signature
        );

        Signature {
            amz_date,
            payload_hash,
            authorization,
        }
    }

    fn signed_request(&self, method: reqwest::Method, key: &str) -> reqwest::RequestBuilder {
        let (scheme, host) = self.endpoint();
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let canonical_uri = format!("/{encoded_key}");
        let url = format!("{scheme}://{host}{canonical_uri}");

        let sig = self.sign(method.as_str(), &canonical_uri, &host, Utc::now());
        self.client
            .request(method, &url)
            .header("Authorization", &sig.authorization)
            .header("x-amz-content-sha256", &sig.payload_hash)
            .header("x-amz-date", &sig.amz_date)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn head(&self, key: &str) -> Result<bool, InvokeError> {
        let resp = self.signed_request(reqwest::Method::HEAD, key).send().await?;
        let status = resp.status();
        debug!(key, %status, bucket = %self.config.bucket, "S3 HEAD");
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(InvokeError::Blob(format!(
                "S3 HeadObject failed (HTTP {status}) for key '{key}'"
            )))
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, InvokeError> {
        let resp = self.signed_request(reqwest::Method::GET, key).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(InvokeError::BlobNotFound {
                key: key.to_string(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InvokeError::Blob(format!(
                "S3 GetObject failed (HTTP {status}) for key '{key}': {}",
                body.chars().take(500).collect::<String>()
            )));
        }
        let bytes = resp.bytes().await?;
        debug!(key, size = bytes.len(), "S3 GET complete");
        Ok(bytes.to_vec())
    }
}

// ============ AWS SigV4 helpers ============

/// Hex-encoded SHA-256 of `data`.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// HMAC-SHA256 of `data` with `key`.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the SigV4 signing key for a date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{secret_key}").as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode per RFC 3986, as SigV4 canonical requests require.
///
/// Everything except unreserved characters (`A-Z a-z 0-9 - _ . ~`) is
/// percent-encoded.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    result
}
