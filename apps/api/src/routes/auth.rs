//! Caller authentication — replaces a gateway-level auth middleware.
//!
//! Every generation handler takes a `Caller` argument; extracting it
//! verifies the bearer credential with the identity provider and resolves
//! the plan and free-usage counter before the handler body runs. Any
//! failure here is a 401 and the pipeline is never entered.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use crate::errors::AppError;
use crate::quota::{resolve_quota, Caller};
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;

        let user_id = state.identity.verify_token(token).await.map_err(|e| {
            warn!("Token verification failed: {e}");
            AppError::Unauthorized
        })?;

        let usage = resolve_quota(state.identity.as_ref(), &user_id)
            .await
            .map_err(|e| {
                warn!("Quota resolution failed for {user_id}: {e}");
                AppError::Unauthorized
            })?;

        Ok(Caller {
            user_id,
            plan: usage.plan,
            free_usage: usage.free_usage,
        })
    }
}
