//! Audit logger - append-only sink for security-relevant events.

use std::sync::Arc;

use crate::models::AuditEvent;
use crate::store::AuthStore;

/// Audit service writing to the injected store.
#[derive(Clone)]
pub struct AuditService {
    store: Arc<dyn AuthStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Record an event without blocking the request path. Write failures
    /// are logged, never surfaced.
    pub fn log_async(&self, event: AuditEvent) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.insert_audit_event(&event).await {
                tracing::error!(
                    error = %e,
                    event_type = %event.event_type_code,
                    "Failed to write audit event"
                );
            }
        });
    }

    /// Record an event and wait for the write.
    pub async fn log(&self, event: AuditEvent) {
        if let Err(e) = self.store.insert_audit_event(&event).await {
            tracing::error!(
                error = %e,
                event_type = %event.event_type_code,
                "Failed to write audit event"
            );
        }
    }
}
