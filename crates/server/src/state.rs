//! Application state shared across all request handlers.

use std::collections::HashMap;
use std::sync::Arc;

use orderbridge_core::EventQueue;
use orderbridge_domain::config::TenantConfig;

/// Shared handler state; cheap to clone (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    /// Durable event queue the webhook feeds.
    pub queue: Arc<dyn EventQueue>,
    /// Tenant registry keyed by tenant id.
    tenants: Arc<HashMap<String, TenantConfig>>,
}

impl AppState {
    pub fn new(queue: Arc<dyn EventQueue>, tenants: Vec<TenantConfig>) -> Self {
        let tenants = tenants.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self { queue, tenants: Arc::new(tenants) }
    }

    pub fn tenant(&self, id: &str) -> Option<&TenantConfig> {
        self.tenants.get(id)
    }
}
