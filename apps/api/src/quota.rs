//! Quota ledger — reads and evolves the per-user free-usage counter stored
//! in the identity provider's metadata.
//!
//! The read and the increment are two separate round-trips with no
//! transaction between them, so concurrent requests from one user can race
//! past the limit check. This is a soft limit by design; the provider is not
//! assumed to offer an atomic increment-with-ceiling.

use serde_json::json;
use tracing::debug;

use crate::identity::{IdentityError, IdentityProvider, Plan};

/// Free-plan generations allowed before the gateway starts refusing.
pub const FREE_USAGE_LIMIT: i64 = 10;

/// The caller's resolved identity and quota state for one request.
/// Fetched fresh per request; never cached.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub plan: Plan,
    pub free_usage: i64,
}

impl Caller {
    pub fn limit_reached(&self) -> bool {
        !self.plan.is_premium() && self.free_usage >= FREE_USAGE_LIMIT
    }
}

/// Resolved plan and usage for a user, as read from the identity provider.
#[derive(Debug, Clone)]
pub struct PlanUsage {
    pub plan: Plan,
    pub free_usage: i64,
}

/// Fetches the caller's plan and free-usage counter.
///
/// Premium users are not usage-tracked: their counter is reset to 0 in the
/// metadata store on read. Free users get the counter as stored, defaulting
/// to 0 when absent.
pub async fn resolve_quota(
    provider: &dyn IdentityProvider,
    user_id: &str,
) -> Result<PlanUsage, IdentityError> {
    let user = provider.get_user(user_id).await?;
    let plan = user.plan();

    if plan.is_premium() {
        provider
            .update_metadata(user_id, json!({ "free_usage": 0 }))
            .await?;
        return Ok(PlanUsage {
            plan,
            free_usage: 0,
        });
    }

    Ok(PlanUsage {
        plan,
        free_usage: user.free_usage(),
    })
}

/// Increments the free-usage counter by exactly 1. No-op for premium users.
/// Called only after a fully successful generation.
pub async fn record_usage(
    provider: &dyn IdentityProvider,
    caller: &Caller,
) -> Result<(), IdentityError> {
    if caller.plan.is_premium() {
        return Ok(());
    }

    provider
        .update_metadata(
            &caller.user_id,
            json!({ "free_usage": caller.free_usage + 1 }),
        )
        .await?;

    debug!(
        "Recorded usage for {}: {} -> {}",
        caller.user_id,
        caller.free_usage,
        caller.free_usage + 1
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserRecord;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    struct StubProvider {
        plan: Option<String>,
        metadata: Value,
        updates: Mutex<Vec<(String, Value)>>,
    }

    impl StubProvider {
        fn new(plan: &str, metadata: Value) -> Self {
            Self {
                plan: Some(plan.to_string()),
                metadata,
                updates: Mutex::new(Vec::new()),
            }
        }

        fn updates(&self) -> Vec<(String, Value)> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        async fn verify_token(&self, _bearer: &str) -> Result<String, IdentityError> {
            Ok("user_1".to_string())
        }

        async fn get_user(&self, user_id: &str) -> Result<UserRecord, IdentityError> {
            Ok(UserRecord {
                id: user_id.to_string(),
                plan: self.plan.clone(),
                private_metadata: self.metadata.clone(),
            })
        }

        async fn update_metadata(
            &self,
            user_id: &str,
            patch: Value,
        ) -> Result<(), IdentityError> {
            self.updates
                .lock()
                .unwrap()
                .push((user_id.to_string(), patch));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_premium_resets_counter_on_read() {
        let provider = StubProvider::new("premium", json!({"free_usage": 7}));
        let usage = resolve_quota(&provider, "user_1").await.unwrap();

        assert_eq!(usage.plan, Plan::Premium);
        assert_eq!(usage.free_usage, 0);
        assert_eq!(
            provider.updates(),
            vec![("user_1".to_string(), json!({"free_usage": 0}))]
        );
    }

    #[tokio::test]
    async fn test_free_reads_stored_counter() {
        let provider = StubProvider::new("free", json!({"free_usage": 3}));
        let usage = resolve_quota(&provider, "user_1").await.unwrap();

        assert_eq!(usage.plan, Plan::Free);
        assert_eq!(usage.free_usage, 3);
        assert!(provider.updates().is_empty());
    }

    #[tokio::test]
    async fn test_free_defaults_to_zero_when_absent() {
        let provider = StubProvider::new("free", json!({}));
        let usage = resolve_quota(&provider, "user_1").await.unwrap();

        assert_eq!(usage.free_usage, 0);
        assert!(provider.updates().is_empty());
    }

    #[tokio::test]
    async fn test_record_usage_increments_free_plan() {
        let provider = StubProvider::new("free", json!({"free_usage": 3}));
        let caller = Caller {
            user_id: "user_1".to_string(),
            plan: Plan::Free,
            free_usage: 3,
        };

        record_usage(&provider, &caller).await.unwrap();

        assert_eq!(
            provider.updates(),
            vec![("user_1".to_string(), json!({"free_usage": 4}))]
        );
    }

    #[tokio::test]
    async fn test_record_usage_is_noop_for_premium() {
        let provider = StubProvider::new("premium", json!({}));
        let caller = Caller {
            user_id: "user_1".to_string(),
            plan: Plan::Premium,
            free_usage: 0,
        };

        record_usage(&provider, &caller).await.unwrap();

        assert!(provider.updates().is_empty());
    }

    #[test]
    fn test_limit_reached_boundary() {
        let at_limit = Caller {
            user_id: "user_1".to_string(),
            plan: Plan::Free,
            free_usage: FREE_USAGE_LIMIT,
        };
        let under_limit = Caller {
            free_usage: FREE_USAGE_LIMIT - 1,
            ..at_limit.clone()
        };
        let premium = Caller {
            plan: Plan::Premium,
            free_usage: FREE_USAGE_LIMIT + 5,
            ..at_limit.clone()
        };

        assert!(at_limit.limit_reached());
        assert!(!under_limit.limit_reached());
        assert!(!premium.limit_reached());
    }
}
