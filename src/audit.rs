use serde_json::Value;

use crate::{middleware::auth::AuthUser, store::{AuditEntry, Store}};

/// Record an audit entry. Failures are logged and never fail the caller.
pub async fn log_audit(
    store: &dyn Store,
    user: Option<&AuthUser>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) {
    let entry = AuditEntry {
        user_id: user.map(|u| u.user_id),
        action: action.to_string(),
        resource: resource.map(str::to_string),
        metadata,
    };
    if let Err(err) = store.record_audit(entry).await {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
