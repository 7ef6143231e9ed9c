//! Axum route handlers for the generation API.
//!
//! Each handler normalizes its body (JSON or multipart) into a
//! `GenerationRequest` and hands off to the pipeline; the `Caller`
//! extractor has already authenticated the request and resolved quota.

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::errors::AppError;
use crate::models::creation::CreationRow;
use crate::pipeline;
use crate::quota::Caller;
use crate::request::GenerationRequest;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ArticleRequest {
    pub prompt: String,
    pub length: u32,
}

#[derive(Debug, Deserialize)]
pub struct BlogTitleRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub publish: bool,
}

#[derive(Debug, Serialize)]
pub struct CreationsResponse {
    pub success: bool,
    pub creations: Vec<CreationRow>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

async fn dispatch(
    state: &AppState,
    caller: &Caller,
    request: GenerationRequest,
) -> Result<Json<Envelope>, AppError> {
    let envelope = pipeline::run(
        state.identity.as_ref(),
        state.store.as_ref(),
        &state.dispatch,
        caller,
        &request,
    )
    .await?;

    Ok(Json(envelope))
}

/// POST /api/ai/generate-article
pub async fn generate_article(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<ArticleRequest>,
) -> Result<Json<Envelope>, AppError> {
    let request = GenerationRequest::Article {
        prompt: body.prompt,
        length: body.length,
    };
    dispatch(&state, &caller, request).await
}

/// POST /api/ai/generate-blog-title
pub async fn generate_blog_title(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<BlogTitleRequest>,
) -> Result<Json<Envelope>, AppError> {
    let request = GenerationRequest::BlogTitle {
        prompt: body.prompt,
    };
    dispatch(&state, &caller, request).await
}

/// POST /api/ai/generate-image
pub async fn generate_image(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<ImageRequest>,
) -> Result<Json<Envelope>, AppError> {
    let request = GenerationRequest::Image {
        prompt: body.prompt,
        publish: body.publish,
    };
    dispatch(&state, &caller, request).await
}

/// POST /api/ai/remove-background (multipart: `image`)
pub async fn remove_background(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<Envelope>, AppError> {
    let fields = read_fields(multipart).await?;
    let request = GenerationRequest::BackgroundRemoval {
        image: fields.require_file("image")?,
    };
    dispatch(&state, &caller, request).await
}

/// POST /api/ai/remove-object (multipart: `image`, `object`)
pub async fn remove_object(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<Envelope>, AppError> {
    let fields = read_fields(multipart).await?;
    let request = GenerationRequest::ObjectRemoval {
        image: fields.require_file("image")?,
        object: fields.require_text("object")?,
    };
    dispatch(&state, &caller, request).await
}

/// POST /api/ai/review-resume (multipart: `resume`)
pub async fn review_resume(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<Envelope>, AppError> {
    let fields = read_fields(multipart).await?;
    let request = GenerationRequest::ResumeReview {
        document: fields.require_file("resume")?,
    };
    dispatch(&state, &caller, request).await
}

/// GET /api/ai/creations
///
/// The caller's creation log, newest first.
pub async fn list_creations(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<CreationsResponse>, AppError> {
    let creations = state
        .store
        .list_for_user(&caller.user_id)
        .await
        .map_err(AppError::Internal)?;

    Ok(Json(CreationsResponse {
        success: true,
        creations,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart plumbing
// ────────────────────────────────────────────────────────────────────────────

/// Multipart parts by field name. Everything is read as bytes; text fields
/// are decoded on demand so parts work with or without a filename.
#[derive(Default)]
struct UploadFields {
    parts: Vec<(String, Bytes)>,
}

impl UploadFields {
    fn require_file(&self, name: &str) -> Result<Bytes, AppError> {
        self.parts
            .iter()
            .find(|(field, _)| field.as_str() == name)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| AppError::Validation(format!("{name} file missing")))
    }

    fn require_text(&self, name: &str) -> Result<String, AppError> {
        let bytes = self
            .parts
            .iter()
            .find(|(field, _)| field.as_str() == name)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| AppError::Validation(format!("{name} field missing")))?;

        String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::Validation(format!("{name} must be valid UTF-8")))
    }
}

async fn read_fields(mut multipart: Multipart) -> Result<UploadFields, AppError> {
    let mut fields = UploadFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read {name}: {e}")))?;
        fields.parts.push((name, bytes));
    }

    Ok(fields)
}
