//! Asset host client — durable storage for generated and transformed
//! images, via Cloudinary-style signed uploads.
//!
//! Every upload is signed server-side: the secret is folded into a sha256
//! digest over the sorted request params and never transmitted.

use bytes::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::backends::BackendError;

const PROVIDER: &str = "asset-host";
const ASSET_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Computes the upload signature: params sorted by key, joined as
/// `k=v` pairs with `&`, secret appended, sha256 hex digest.
pub fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted: Vec<_> = params.to_vec();
    sorted.sort_by_key(|(key, _)| *key);

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// HTTP client for the asset host upload API.
#[derive(Clone)]
pub struct AssetHostClient {
    http: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl AssetHostClient {
    pub fn new(
        base_url: String,
        cloud_name: String,
        api_key: String,
        api_secret: String,
    ) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(ASSET_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            cloud_name,
            api_key,
            api_secret,
        }
    }

    /// Uploads a base64 data URL (e.g. a freshly generated image) and
    /// returns the durable URL.
    pub async fn upload_data_url(&self, data_url: &str) -> Result<String, BackendError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(&[("timestamp", &timestamp)], &self.api_secret);

        let form = Form::new()
            .text("file", data_url.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        self.upload(form).await
    }

    /// Uploads raw image bytes with a transformation directive applied by
    /// the asset host (background removal, object removal).
    pub async fn upload_bytes(
        &self,
        bytes: Bytes,
        transformation: &str,
    ) -> Result<String, BackendError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("timestamp", &timestamp), ("transformation", transformation)],
            &self.api_secret,
        );

        let form = Form::new()
            .part("file", Part::bytes(bytes.to_vec()).file_name("upload"))
            .text("transformation", transformation.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.api_key.clone())
            .text("signature", signature);

        self.upload(form).await
    }

    async fn upload(&self, form: Form) -> Result<String, BackendError> {
        let response = self
            .http
            .post(format!(
                "{}/v1_1/{}/image/upload",
                self.base_url, self.cloud_name
            ))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::transport(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                provider: PROVIDER,
                status: status.as_u16(),
                detail,
            });
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| BackendError::transport(PROVIDER, e))?;

        debug!("Asset uploaded: {}", uploaded.secure_url);
        Ok(uploaded.secure_url)
    }
}
