//! Image transformation backend — background and object removal, applied
//! by the asset host at upload time via transformation directives.

use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::assets::AssetHostClient;
use crate::backends::{Backend, BackendError};
use crate::errors::AppError;
use crate::request::{validate_upload, GenerationRequest};

/// Built-in effect directive for background removal.
pub const BACKGROUND_REMOVAL_EFFECT: &str = "e_background_removal";

/// Generative-removal directive naming the target object.
pub fn object_removal_effect(object: &str) -> String {
    format!("e_gen_remove:prompt_{object}")
}

/// Transformation backend serving both image-edit kinds. The caller's
/// image goes straight to the asset host; the directive does the work.
pub struct ImageTransform {
    assets: Arc<AssetHostClient>,
}

impl ImageTransform {
    pub fn new(assets: Arc<AssetHostClient>) -> Self {
        Self { assets }
    }
}

#[async_trait]
impl Backend for ImageTransform {
    fn validate(&self, request: &GenerationRequest) -> Result<(), AppError> {
        match request {
            GenerationRequest::BackgroundRemoval { image } => validate_upload(image, "Image"),
            GenerationRequest::ObjectRemoval { image, object } => {
                validate_upload(image, "Image")?;
                if object.trim().is_empty() {
                    return Err(AppError::Validation(
                        "object to remove must be named".to_string(),
                    ));
                }
                Ok(())
            }
            _ => Err(BackendError::KindMismatch.into()),
        }
    }

    async fn execute(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        match request {
            GenerationRequest::BackgroundRemoval { image } => {
                self.assets
                    .upload_bytes(image.clone(), BACKGROUND_REMOVAL_EFFECT)
                    .await
            }
            GenerationRequest::ObjectRemoval { image, object } => {
                self.assets
                    .upload_bytes(image.clone(), &object_removal_effect(object))
                    .await
            }
            _ => Err(BackendError::KindMismatch),
        }
    }
}
