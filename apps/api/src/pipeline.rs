//! Gate-and-dispatch pipeline — the chokepoint every generation request
//! passes through.
//!
//! Flow: quota check → plan gate → validate → dispatch → persist →
//! usage accounting → envelope. Authentication and quota resolution happen
//! upstream in the `Caller` extractor; by the time a request reaches this
//! module its identity is already verified.
//!
//! Both refusal paths (quota, plan) fire before any external call. After a
//! successful generation the caller always receives their content:
//! persistence and usage-accounting failures are logged, never surfaced.

use tracing::{error, info, warn};

use crate::backends::DispatchTable;
use crate::envelope::Envelope;
use crate::errors::AppError;
use crate::identity::IdentityProvider;
use crate::quota::{record_usage, Caller};
use crate::request::GenerationRequest;
use crate::store::{CreationStore, NewCreation};

pub async fn run(
    identity: &dyn IdentityProvider,
    store: &dyn CreationStore,
    table: &DispatchTable,
    caller: &Caller,
    request: &GenerationRequest,
) -> Result<Envelope, AppError> {
    let kind = request.kind();

    if caller.limit_reached() {
        info!("Free usage limit reached for {}", caller.user_id);
        return Err(AppError::LimitReached);
    }

    if kind.requires_premium() && !caller.plan.is_premium() {
        info!(
            "Premium-gated request ({}) refused for free-plan user {}",
            kind.creation_type(),
            caller.user_id
        );
        return Err(AppError::PlanRequired);
    }

    let backend = table.backend_for(kind);
    backend.validate(request)?;

    let content = backend.execute(request).await?;

    let prompt = request.record_prompt();
    let creation = NewCreation {
        user_id: &caller.user_id,
        prompt: &prompt,
        content: &content,
        kind: kind.creation_type(),
        publish: request.publish(),
    };
    if let Err(e) = store.append(creation).await {
        // Durability of the log is best-effort relative to user-facing
        // success: the content was already generated and billed.
        error!("Failed to record creation for {}: {e:#}", caller.user_id);
    }

    if let Err(e) = record_usage(identity, caller).await {
        warn!("Failed to update usage counter for {}: {e}", caller.user_id);
    }

    Ok(Envelope::ok(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Backend, BackendError};
    use crate::identity::{IdentityError, Plan, UserRecord};
    use crate::models::creation::CreationRow;
    use async_trait::async_trait;
    use bytes::Bytes;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct StubIdentity {
        updates: Mutex<Vec<(String, Value)>>,
        fail_updates: bool,
    }

    impl StubIdentity {
        fn new() -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
                fail_updates: false,
            }
        }

        fn failing() -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
                fail_updates: true,
            }
        }

        fn updates(&self) -> Vec<(String, Value)> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        async fn verify_token(&self, _bearer: &str) -> Result<String, IdentityError> {
            Ok("user_1".to_string())
        }

        async fn get_user(&self, user_id: &str) -> Result<UserRecord, IdentityError> {
            Ok(UserRecord {
                id: user_id.to_string(),
                plan: None,
                private_metadata: json!({}),
            })
        }

        async fn update_metadata(
            &self,
            user_id: &str,
            patch: Value,
        ) -> Result<(), IdentityError> {
            if self.fail_updates {
                return Err(IdentityError::Api {
                    status: 500,
                    detail: "metadata store down".to_string(),
                });
            }
            self.updates
                .lock()
                .unwrap()
                .push((user_id.to_string(), patch));
            Ok(())
        }
    }

    struct CountingBackend {
        calls: AtomicUsize,
        response: Result<String, ()>,
    }

    impl CountingBackend {
        fn returning(content: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: Ok(content.to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: Err(()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for CountingBackend {
        fn validate(&self, _request: &GenerationRequest) -> Result<(), AppError> {
            Ok(())
        }

        async fn execute(&self, _request: &GenerationRequest) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.response {
                Ok(content) => Ok(content.clone()),
                Err(()) => Err(BackendError::Api {
                    provider: "test",
                    status: 502,
                    detail: "upstream down".to_string(),
                }),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct StoredCreation {
        user_id: String,
        prompt: String,
        content: String,
        kind: String,
        publish: bool,
    }

    struct RecordingStore {
        rows: Mutex<Vec<StoredCreation>>,
        fail: bool,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                rows: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn rows(&self) -> Vec<StoredCreation> {
            self.rows.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CreationStore for RecordingStore {
        async fn append(&self, creation: NewCreation<'_>) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("insert failed");
            }
            self.rows.lock().unwrap().push(StoredCreation {
                user_id: creation.user_id.to_string(),
                prompt: creation.prompt.to_string(),
                content: creation.content.to_string(),
                kind: creation.kind.to_string(),
                publish: creation.publish,
            });
            Ok(())
        }

        async fn list_for_user(&self, _user_id: &str) -> anyhow::Result<Vec<CreationRow>> {
            Ok(Vec::new())
        }
    }

    fn free_caller(free_usage: i64) -> Caller {
        Caller {
            user_id: "user_1".to_string(),
            plan: Plan::Free,
            free_usage,
        }
    }

    fn premium_caller() -> Caller {
        Caller {
            user_id: "user_1".to_string(),
            plan: Plan::Premium,
            free_usage: 0,
        }
    }

    fn article_request() -> GenerationRequest {
        GenerationRequest::Article {
            prompt: "write a haiku".to_string(),
            length: 50,
        }
    }

    #[tokio::test]
    async fn test_free_user_generates_and_accounts_usage() {
        let identity = StubIdentity::new();
        let store = RecordingStore::new();
        let backend = CountingBackend::returning("haiku text");
        let table = DispatchTable::uniform(backend.clone());

        let envelope = run(&identity, &store, &table, &free_caller(3), &article_request())
            .await
            .unwrap();

        assert_eq!(envelope, Envelope::ok("haiku text"));
        assert_eq!(backend.call_count(), 1);
        assert_eq!(
            store.rows(),
            vec![StoredCreation {
                user_id: "user_1".to_string(),
                prompt: "write a haiku".to_string(),
                content: "haiku text".to_string(),
                kind: "article".to_string(),
                publish: false,
            }]
        );
        assert_eq!(
            identity.updates(),
            vec![("user_1".to_string(), json!({"free_usage": 4}))]
        );
    }

    #[tokio::test]
    async fn test_limit_reached_short_circuits_before_backend() {
        let identity = StubIdentity::new();
        let store = RecordingStore::new();
        let backend = CountingBackend::returning("haiku text");
        let table = DispatchTable::uniform(backend.clone());

        let err = run(&identity, &store, &table, &free_caller(10), &article_request())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::LimitReached));
        assert_eq!(backend.call_count(), 0);
        assert!(store.rows().is_empty());
        assert!(identity.updates().is_empty());
    }

    #[tokio::test]
    async fn test_limit_applies_past_the_boundary_too() {
        let identity = StubIdentity::new();
        let store = RecordingStore::new();
        let backend = CountingBackend::returning("haiku text");
        let table = DispatchTable::uniform(backend.clone());

        let err = run(&identity, &store, &table, &free_caller(14), &article_request())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::LimitReached));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_premium_gated_kind_refused_for_free_plan() {
        let identity = StubIdentity::new();
        let store = RecordingStore::new();
        let backend = CountingBackend::returning("https://assets.example/img.png");
        let table = DispatchTable::uniform(backend.clone());
        let request = GenerationRequest::BackgroundRemoval {
            image: Bytes::from_static(b"png"),
        };

        let err = run(&identity, &store, &table, &free_caller(0), &request)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PlanRequired));
        assert_eq!(backend.call_count(), 0);
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_premium_user_counter_never_incremented() {
        let identity = StubIdentity::new();
        let store = RecordingStore::new();
        let backend = CountingBackend::returning("https://assets.example/img.png");
        let table = DispatchTable::uniform(backend.clone());
        let request = GenerationRequest::Image {
            prompt: "a lighthouse at dusk".to_string(),
            publish: true,
        };

        let envelope = run(&identity, &store, &table, &premium_caller(), &request)
            .await
            .unwrap();

        assert!(envelope.success);
        assert!(identity.updates().is_empty());
        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, "image");
        assert!(rows[0].publish);
    }

    #[tokio::test]
    async fn test_object_removal_records_descriptive_prompt() {
        let identity = StubIdentity::new();
        let store = RecordingStore::new();
        let backend = CountingBackend::returning("https://assets.example/clean.png");
        let table = DispatchTable::uniform(backend.clone());
        let request = GenerationRequest::ObjectRemoval {
            image: Bytes::from_static(b"png"),
            object: "car".to_string(),
        };

        let envelope = run(&identity, &store, &table, &premium_caller(), &request)
            .await
            .unwrap();

        assert_eq!(
            envelope.content.as_deref(),
            Some("https://assets.example/clean.png")
        );
        let rows = store.rows();
        assert_eq!(rows[0].prompt, "Removed car from the image");
        assert_eq!(rows[0].kind, "image");
        assert_eq!(rows[0].content, "https://assets.example/clean.png");
    }

    #[tokio::test]
    async fn test_backend_failure_persists_nothing() {
        let identity = StubIdentity::new();
        let store = RecordingStore::new();
        let backend = CountingBackend::failing();
        let table = DispatchTable::uniform(backend.clone());

        let err = run(&identity, &store, &table, &free_caller(3), &article_request())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Backend(_)));
        assert_eq!(backend.call_count(), 1);
        assert!(store.rows().is_empty());
        assert!(identity.updates().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_downgrade_success() {
        let identity = StubIdentity::new();
        let store = RecordingStore::failing();
        let backend = CountingBackend::returning("haiku text");
        let table = DispatchTable::uniform(backend);

        let envelope = run(&identity, &store, &table, &free_caller(3), &article_request())
            .await
            .unwrap();

        assert_eq!(envelope, Envelope::ok("haiku text"));
        // Usage accounting still runs after a persistence failure.
        assert_eq!(
            identity.updates(),
            vec![("user_1".to_string(), json!({"free_usage": 4}))]
        );
    }

    #[tokio::test]
    async fn test_usage_accounting_failure_does_not_downgrade_success() {
        let identity = StubIdentity::failing();
        let store = RecordingStore::new();
        let backend = CountingBackend::returning("haiku text");
        let table = DispatchTable::uniform(backend);

        let envelope = run(&identity, &store, &table, &free_caller(3), &article_request())
            .await
            .unwrap();

        assert_eq!(envelope, Envelope::ok("haiku text"));
        assert_eq!(store.rows().len(), 1);
    }
}
