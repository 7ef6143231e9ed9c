//! Backend dispatch table — maps a request kind to one generation backend,
//! normalizing heterogeneous provider APIs into a single result type.
//!
//! ARCHITECTURAL RULE: backends are never retried. Every upstream call is
//! billed; a failure surfaces as `BackendError` and the request ends there.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::errors::AppError;
use crate::request::{GenerationRequest, RequestKind};

pub mod assets;
pub mod completion;
pub mod document;
pub mod image_gen;
pub mod transform;

use assets::AssetHostClient;
use completion::{CompletionClient, TextCompletion};
use document::DocumentReview;
use image_gen::{ImageGenClient, TextToImage};
use transform::ImageTransform;

/// Error from a generation backend. `Timeout` is distinguished from other
/// transport failures so a hung upstream call is diagnosable as such.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{provider} call timed out")]
    Timeout { provider: &'static str },

    #[error("{provider} HTTP error: {source}")]
    Http {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error (status {status}): {detail}")]
    Api {
        provider: &'static str,
        status: u16,
        detail: String,
    },

    #[error("{provider} returned empty content")]
    Empty { provider: &'static str },

    #[error("document text extraction failed: {0}")]
    Extraction(String),

    #[error("request kind not handled by this backend")]
    KindMismatch,
}

impl BackendError {
    /// Maps a reqwest transport error, surfacing deadline expiry as the
    /// distinct `Timeout` sub-reason.
    pub fn transport(provider: &'static str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            BackendError::Timeout { provider }
        } else {
            BackendError::Http { provider, source }
        }
    }
}

/// One generation backend: validates the kind-specific payload, then
/// executes the external call(s) and returns the content string (text or a
/// durable URL). Never partially populated — `Ok` is the full content,
/// `Err` carries the diagnostic.
#[async_trait]
pub trait Backend: Send + Sync {
    fn validate(&self, request: &GenerationRequest) -> Result<(), AppError>;

    async fn execute(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

/// Total dispatch table: every request kind has exactly one backend entry.
pub struct DispatchTable {
    article: Arc<dyn Backend>,
    blog_title: Arc<dyn Backend>,
    image: Arc<dyn Backend>,
    background_removal: Arc<dyn Backend>,
    object_removal: Arc<dyn Backend>,
    resume_review: Arc<dyn Backend>,
}

impl DispatchTable {
    /// Wires the production backends from the provider clients.
    pub fn new(
        completion: CompletionClient,
        image_gen: ImageGenClient,
        assets: AssetHostClient,
    ) -> Self {
        let completion = Arc::new(completion);
        let assets = Arc::new(assets);

        let text = Arc::new(TextCompletion::new(completion.clone()));
        let transform = Arc::new(ImageTransform::new(assets.clone()));

        Self {
            article: text.clone(),
            blog_title: text,
            image: Arc::new(TextToImage::new(Arc::new(image_gen), assets)),
            background_removal: transform.clone(),
            object_removal: transform,
            resume_review: Arc::new(DocumentReview::new(completion)),
        }
    }

    pub fn backend_for(&self, kind: RequestKind) -> &dyn Backend {
        match kind {
            RequestKind::Article => self.article.as_ref(),
            RequestKind::BlogTitle => self.blog_title.as_ref(),
            RequestKind::Image => self.image.as_ref(),
            RequestKind::BackgroundRemoval => self.background_removal.as_ref(),
            RequestKind::ObjectRemoval => self.object_removal.as_ref(),
            RequestKind::ResumeReview => self.resume_review.as_ref(),
        }
    }

    /// Table with every entry pointing at the same backend. Test wiring.
    #[cfg(test)]
    pub fn uniform(backend: Arc<dyn Backend>) -> Self {
        Self {
            article: backend.clone(),
            blog_title: backend.clone(),
            image: backend.clone(),
            background_removal: backend.clone(),
            object_removal: backend.clone(),
            resume_review: backend,
        }
    }
}
