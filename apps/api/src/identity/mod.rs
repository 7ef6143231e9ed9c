//! Identity provider adapter — the single point of entry for caller
//! authentication and per-user metadata.
//!
//! The provider owns all cross-request user state: the subscription plan and
//! the free-usage counter both live in its metadata store and are fetched
//! fresh on every request. Nothing here is cached.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const IDENTITY_TIMEOUT_SECS: u64 = 10;

/// Subscription tier controlling feature access and quota enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Premium,
}

impl Plan {
    pub fn is_premium(self) -> bool {
        matches!(self, Plan::Premium)
    }

    /// Anything other than the literal `"premium"` label is the free tier.
    pub fn from_label(label: &str) -> Self {
        if label == "premium" {
            Plan::Premium
        } else {
            Plan::Free
        }
    }
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity token rejected")]
    Unauthenticated,

    #[error("identity provider HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider error (status {status}): {detail}")]
    Api { status: u16, detail: String },
}

/// A user record as returned by the identity provider: the plan label plus
/// the arbitrary key/value store where the free-usage counter lives.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub private_metadata: Value,
}

impl UserRecord {
    pub fn plan(&self) -> Plan {
        self.plan
            .as_deref()
            .map(Plan::from_label)
            .unwrap_or(Plan::Free)
    }

    /// The stored free-usage counter, defaulting to 0 when absent.
    pub fn free_usage(&self) -> i64 {
        self.private_metadata
            .get("free_usage")
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }
}

/// Identity provider interface consumed by the gateway.
///
/// All three calls are independent network round-trips; there is no
/// transactional guarantee between a `get_user` read and a subsequent
/// `update_metadata` write.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a caller credential to a verified user id.
    async fn verify_token(&self, bearer: &str) -> Result<String, IdentityError>;

    /// Fetches the user record, including plan and private metadata.
    async fn get_user(&self, user_id: &str) -> Result<UserRecord, IdentityError>;

    /// Merge-patches the user's private metadata key/value store.
    async fn update_metadata(&self, user_id: &str, patch: Value) -> Result<(), IdentityError>;
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct MetadataPatch {
    private_metadata: Value,
}

/// HTTP implementation against a Clerk-style backend API, authenticated
/// with the server-side secret key.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: String, secret_key: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(IDENTITY_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
            secret_key,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 404 {
            return Err(IdentityError::Unauthenticated);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify_token(&self, bearer: &str) -> Result<String, IdentityError> {
        let response = self
            .http
            .post(format!("{}/v1/tokens/verify", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&VerifyRequest { token: bearer })
            .send()
            .await?;

        let verified: VerifyResponse = Self::check(response).await?.json().await?;
        debug!("Verified caller {}", verified.user_id);
        Ok(verified.user_id)
    }

    async fn get_user(&self, user_id: &str) -> Result<UserRecord, IdentityError> {
        let response = self
            .http
            .get(format!("{}/v1/users/{user_id}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_metadata(&self, user_id: &str, patch: Value) -> Result<(), IdentityError> {
        let response = self
            .http
            .patch(format!("{}/v1/users/{user_id}/metadata", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&MetadataPatch {
                private_metadata: patch,
            })
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}
