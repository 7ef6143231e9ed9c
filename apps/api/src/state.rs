use std::sync::Arc;

use crate::backends::DispatchTable;
use crate::identity::IdentityProvider;
use crate::store::CreationStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. Adapters are trait objects so tests can swap in doubles.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn CreationStore>,
    pub dispatch: Arc<DispatchTable>,
}
