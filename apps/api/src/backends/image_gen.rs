//! Text-to-image backend: prompt in, raw image bytes from the generation
//! provider, durable URL out via the asset host.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::multipart::Form;
use reqwest::Client;
use tracing::debug;

use crate::backends::assets::AssetHostClient;
use crate::backends::{Backend, BackendError};
use crate::errors::AppError;
use crate::request::GenerationRequest;

const PROVIDER: &str = "image-generation";
const IMAGE_GEN_TIMEOUT_SECS: u64 = 120;

/// HTTP client for the ClipDrop-style text-to-image API.
#[derive(Clone)]
pub struct ImageGenClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ImageGenClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(IMAGE_GEN_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            api_key,
        }
    }

    /// Submits the prompt and returns the raw PNG bytes.
    pub async fn text_to_image(&self, prompt: &str) -> Result<Vec<u8>, BackendError> {
        let form = Form::new().text("prompt", prompt.to_string());

        let response = self
            .http
            .post(format!("{}/text-to-image/v1", self.base_url))
            .header("x-api-key", &self.api_key)
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

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::transport(PROVIDER, e))?;

        if bytes.is_empty() {
            return Err(BackendError::Empty { provider: PROVIDER });
        }

        debug!("Image generated ({} bytes)", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Encodes raw image bytes as a base64 PNG data URL for upload.
pub fn to_data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

/// Image synthesis backend: generate, encode, upload, return the URL.
pub struct TextToImage {
    image_gen: Arc<ImageGenClient>,
    assets: Arc<AssetHostClient>,
}

impl TextToImage {
    pub fn new(image_gen: Arc<ImageGenClient>, assets: Arc<AssetHostClient>) -> Self {
        Self { image_gen, assets }
    }
}

#[async_trait]
impl Backend for TextToImage {
    fn validate(&self, request: &GenerationRequest) -> Result<(), AppError> {
        match request {
            GenerationRequest::Image { prompt, .. } => {
                if prompt.trim().is_empty() {
                    return Err(AppError::Validation("prompt cannot be empty".to_string()));
                }
                Ok(())
            }
            _ => Err(BackendError::KindMismatch.into()),
        }
    }

    async fn execute(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let GenerationRequest::Image { prompt, .. } = request else {
            return Err(BackendError::KindMismatch);
        };

        let bytes = self.image_gen.text_to_image(prompt).await?;
        self.assets.upload_data_url(&to_data_url(&bytes)).await
    }
}
