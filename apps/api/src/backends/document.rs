//! Document review backend — extracts text from an uploaded PDF, then asks
//! the completion provider for a structured critique.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::backends::completion::{CompletionClient, RESUME_REVIEW_MAX_TOKENS};
use crate::backends::{Backend, BackendError};
use crate::errors::AppError;
use crate::request::{validate_upload, GenerationRequest};

/// Builds the single-turn review prompt around the extracted text.
pub fn review_prompt(text: &str) -> String {
    format!(
        "Review this resume and provide constructive feedback on its strengths, \
         weaknesses, and areas for improvement. The resume is as follows:\n\n{text}"
    )
}

/// PDF text extraction is CPU-bound and synchronous, so it runs on a
/// blocking thread. Extraction happens before any billed call; a failure
/// here produces no creation record and no provider traffic.
async fn extract_text(document: Bytes) -> Result<String, BackendError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&document))
        .await
        .map_err(|e| BackendError::Extraction(format!("extraction task failed: {e}")))?
        .map_err(|e| BackendError::Extraction(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(BackendError::Extraction(
            "document contains no extractable text".to_string(),
        ));
    }

    Ok(text)
}

/// Résumé review backend: extract → prompt → completion, capped at 1000
/// output tokens.
pub struct DocumentReview {
    completion: Arc<CompletionClient>,
}

impl DocumentReview {
    pub fn new(completion: Arc<CompletionClient>) -> Self {
        Self { completion }
    }
}

#[async_trait]
impl Backend for DocumentReview {
    fn validate(&self, request: &GenerationRequest) -> Result<(), AppError> {
        match request {
            GenerationRequest::ResumeReview { document } => validate_upload(document, "Resume"),
            _ => Err(BackendError::KindMismatch.into()),
        }
    }

    async fn execute(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let GenerationRequest::ResumeReview { document } = request else {
            return Err(BackendError::KindMismatch);
        };

        let text = extract_text(document.clone()).await?;
        self.completion
            .complete(&review_prompt(&text), RESUME_REVIEW_MAX_TOKENS)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_prompt_wraps_extracted_text() {
        let prompt = review_prompt("Jane Doe\nStaff Engineer");
        assert!(prompt.starts_with("Review this resume"));
        assert!(prompt.ends_with("Jane Doe\nStaff Engineer"));
    }

    #[tokio::test]
    async fn test_extraction_rejects_non_pdf_bytes() {
        let err = extract_text(Bytes::from_static(b"not a pdf")).await.unwrap_err();
        assert!(matches!(err, BackendError::Extraction(_)));
    }
}
