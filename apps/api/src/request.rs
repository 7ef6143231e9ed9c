//! Generation request model — the tagged union every inbound route is
//! normalized into before entering the pipeline.

use bytes::Bytes;

use crate::errors::AppError;

/// Uploaded payloads (images, documents) may not exceed 5 MiB.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Request kind, with its two intrinsic policies: whether the kind is
/// premium-gated and which type string its creations are logged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Article,
    BlogTitle,
    Image,
    BackgroundRemoval,
    ObjectRemoval,
    ResumeReview,
}

impl RequestKind {
    /// Premium gating is a property of the kind, checked before any
    /// validation or external call — never a post-hoc filter.
    pub fn requires_premium(self) -> bool {
        !matches!(self, RequestKind::Article | RequestKind::BlogTitle)
    }

    pub fn creation_type(self) -> &'static str {
        match self {
            RequestKind::Article => "article",
            RequestKind::BlogTitle => "blog-title",
            RequestKind::Image
            | RequestKind::BackgroundRemoval
            | RequestKind::ObjectRemoval => "image",
            RequestKind::ResumeReview => "resume-review",
        }
    }
}

/// One inbound generation request, carrying the kind-specific payload.
#[derive(Debug, Clone)]
pub enum GenerationRequest {
    Article { prompt: String, length: u32 },
    BlogTitle { prompt: String },
    Image { prompt: String, publish: bool },
    BackgroundRemoval { image: Bytes },
    ObjectRemoval { image: Bytes, object: String },
    ResumeReview { document: Bytes },
}

impl GenerationRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            GenerationRequest::Article { .. } => RequestKind::Article,
            GenerationRequest::BlogTitle { .. } => RequestKind::BlogTitle,
            GenerationRequest::Image { .. } => RequestKind::Image,
            GenerationRequest::BackgroundRemoval { .. } => RequestKind::BackgroundRemoval,
            GenerationRequest::ObjectRemoval { .. } => RequestKind::ObjectRemoval,
            GenerationRequest::ResumeReview { .. } => RequestKind::ResumeReview,
        }
    }

    /// The prompt recorded in the creation log: the caller's prompt for
    /// text and image synthesis, a fixed description for uploads.
    pub fn record_prompt(&self) -> String {
        match self {
            GenerationRequest::Article { prompt, .. }
            | GenerationRequest::BlogTitle { prompt }
            | GenerationRequest::Image { prompt, .. } => prompt.clone(),
            GenerationRequest::BackgroundRemoval { .. } => {
                "Remove background from image".to_string()
            }
            GenerationRequest::ObjectRemoval { object, .. } => {
                format!("Removed {object} from the image")
            }
            GenerationRequest::ResumeReview { .. } => "Review the uploaded resume".to_string(),
        }
    }

    pub fn publish(&self) -> bool {
        matches!(self, GenerationRequest::Image { publish: true, .. })
    }
}

/// Checks an uploaded payload: present and at most 5 MiB.
/// Exactly 5 MiB passes; one byte more is rejected.
pub fn validate_upload(payload: &Bytes, label: &str) -> Result<(), AppError> {
    if payload.is_empty() {
        return Err(AppError::Validation(format!("{label} file missing")));
    }
    if payload.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(format!(
            "{label} size exceeds 5MB limit"
        )));
    }
    Ok(())
}
