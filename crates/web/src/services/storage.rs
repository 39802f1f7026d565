//! Object storage client for payment proofs and product images.
//!
//! Talks to a Supabase-storage compatible REST API:
//!
//! - `POST /storage/v1/object/{bucket}/{path}` uploads an object
//! - `POST /storage/v1/object/sign/{bucket}/{path}` returns a signed URL
//! - `DELETE /storage/v1/object/{bucket}` removes objects by path
//! - `/storage/v1/object/public/{bucket}/{path}` serves public buckets
//!
//! Payment proofs live in a private bucket and are only shown to the GOM
//! through short-lived signed URLs. Product images are public.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use gomflow_core::{OrderId, ProfileId};

use crate::config::BackendConfig;

/// Private bucket for buyer payment proofs.
pub const PAYMENT_PROOFS_BUCKET: &str = "payment-proofs";

/// Public bucket for listing images.
pub const PRODUCT_IMAGES_BUCKET: &str = "product-images";

/// Largest accepted upload (5 MiB).
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

const MAX_FILE_NAME_LENGTH: usize = 100;

const NONCE_LENGTH: usize = 12;

/// Errors that can occur when talking to object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Upload rejected before it was sent.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// Client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A file received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Reject empty, oversized or non-image uploads.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidUpload` describing the problem.
    pub fn validate_image(&self) -> Result<(), StorageError> {
        if self.bytes.is_empty() {
            return Err(StorageError::InvalidUpload("file is empty".to_owned()));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StorageError::InvalidUpload(format!(
                "file must be at most {} MB",
                MAX_UPLOAD_BYTES / (1024 * 1024)
            )));
        }
        if !self.content_type.starts_with("image/") {
            return Err(StorageError::InvalidUpload(
                "only image files are accepted".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`.
///
/// Directory components are dropped and the result is never empty.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    let mut result: String = trimmed.chars().take(MAX_FILE_NAME_LENGTH).collect();
    if result.is_empty() {
        result.push_str("upload");
    }
    result
}

/// Object path for a payment proof: `{order_id}/{unix_millis}-{nonce}-{file}`.
///
/// The random nonce keeps two uploads of the same file name apart, since
/// uploads never overwrite.
#[must_use]
pub fn payment_proof_path(order_id: OrderId, at: DateTime<Utc>, file_name: &str) -> String {
    object_path(&order_id.to_string(), at, file_name)
}

/// Object path for a product image: `{gom_id}/{unix_millis}-{nonce}-{file}`.
#[must_use]
pub fn product_image_path(gom_id: ProfileId, at: DateTime<Utc>, file_name: &str) -> String {
    object_path(&gom_id.to_string(), at, file_name)
}

fn object_path(owner: &str, at: DateTime<Utc>, file_name: &str) -> String {
    let mut nonce = Uuid::new_v4().simple().to_string();
    nonce.truncate(NONCE_LENGTH);
    format!(
        "{owner}/{}-{nonce}-{}",
        at.timestamp_millis(),
        sanitize_file_name(file_name)
    )
}

#[derive(Debug, Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

/// Object storage client.
#[derive(Clone)]
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
}

impl StorageClient {
    /// Create a storage client authenticated with the service-role key.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, StorageError> {
        let key = config.service_key.expose_secret();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| StorageError::Config(format!("invalid service key: {e}")))?,
        );
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| StorageError::Config(format!("invalid service key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.endpoint("storage/v1"),
        })
    }

    /// Upload an object, failing if the path already exists.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects the upload.
    #[tracing::instrument(skip(self, file), fields(size = file.bytes.len()))]
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        file: &UploadedFile,
    ) -> Result<(), StorageError> {
        let url = format!("{}/object/{bucket}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, &file.content_type)
            .header("x-upsert", "false")
            .body(file.bytes.clone())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Create a time-limited URL for a private object.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the object does not exist.
    pub async fn signed_url(
        &self,
        bucket: &str,
        path: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let url = format!("{}/object/sign/{bucket}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "expiresIn": ttl.as_secs() }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let signed: SignedUrlResponse = response.json().await?;
        Ok(self.resolve_signed_url(&signed.signed_url))
    }

    /// Delete an object.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API rejects it.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        let response = self.remove_request(bucket, path).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StorageError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Delete an upload whose database record was never written.
    ///
    /// Failures are logged; the caller is already returning an error.
    pub async fn discard(&self, bucket: &str, path: &str) {
        if let Err(e) = self.remove(bucket, path).await {
            tracing::warn!(bucket, path, error = %e, "Failed to delete orphaned upload");
        }
    }

    fn remove_request(&self, bucket: &str, path: &str) -> reqwest::RequestBuilder {
        self.client
            .delete(format!("{}/object/{bucket}", self.base_url))
            .json(&serde_json::json!({ "prefixes": [path] }))
    }

    /// Public URL of an object in a public bucket.
    #[must_use]
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/object/public/{bucket}/{path}", self.base_url)
    }

    /// Signed URLs come back relative to the storage API root.
    fn resolve_signed_url(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            return signed.to_owned();
        }
        format!("{}/{}", self.base_url, signed.trim_start_matches('/'))
    }
}
