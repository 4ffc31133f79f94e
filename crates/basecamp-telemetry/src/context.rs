//! Request context for correlation and tracing.
//!
//! A [`RequestContext`] follows an API request as it fans out across the
//! lifecycle/idle/budget engines: every log line and
//! published event emitted while handling that request carries the same
//! `correlation_id`, even across the queued, asynchronous hops a lifecycle
//! command takes through `basecamp-lifecycle`'s per-workspace queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Request context carried across operations for correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Correlation ID shared by every hop of the same logical request.
    pub correlation_id: Uuid,
    /// Parent request ID if this is a sub-request.
    pub parent_id: Option<Uuid>,
    /// Workspace ID this request concerns, if any.
    pub workspace_id: Option<Uuid>,
    /// The authenticated principal, if any.
    pub principal: Option<String>,
    /// When the request started.
    pub started_at: DateTime<Utc>,
    /// Source component that created this context (e.g. `"api"`, `"idle"`).
    pub source: String,
    /// Operation being performed (e.g. `"launch_workspace"`).
    pub operation: Option<String>,
    /// Additional structured metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a new request context.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            workspace_id: None,
            principal: None,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a child context that inherits correlation info — used when
    /// a lifecycle command enqueued by the API hands off to a background
    /// task.
    #[must_use]
    pub fn child(&self, source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            workspace_id: self.workspace_id,
            principal: self.principal.clone(),
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            metadata: self.metadata.clone(),
        }
    }

    /// Set the correlation ID.
    #[must_use]
    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = id;
        self
    }

    /// Attach the workspace this request concerns.
    #[must_use]
    pub fn with_workspace_id(mut self, id: Uuid) -> Self {
        self.workspace_id = Some(id);
        self
    }

    /// Attach the authenticated principal.
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add metadata.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        #[allow(clippy::arithmetic_side_effects)]
        let elapsed = Utc::now() - self.started_at;
        elapsed
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed().num_milliseconds()
    }

    /// Create a tracing span carrying this context's correlation fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            source = %self.source,
            operation = self.operation.as_deref(),
            workspace_id = self.workspace_id.map(|id| id.to_string()),
        )
    }

    /// Whether this context has a parent.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// A short identifier suitable for compact log lines.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.to_string()[..8].to_string()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Guard that logs request start/completion and keeps the context's span
/// entered for its lifetime.
pub struct RequestGuard {
    context: RequestContext,
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter the context's span and log the request's start.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("request started");
        Self { context, span }
    }

    /// The context this guard was created from.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_context_creation() {
        let ctx = RequestContext::new("api");
        assert_eq!(ctx.source, "api");
        assert_eq!(ctx.request_id, ctx.correlation_id);
        assert!(ctx.parent_id.is_none());
        assert!(ctx.workspace_id.is_none());
    }

    #[test]
    fn request_context_builder() {
        let workspace = Uuid::new_v4();
        let correlation = Uuid::new_v4();

        let ctx = RequestContext::new("api")
            .with_correlation_id(correlation)
            .with_workspace_id(workspace)
            .with_principal("alice")
            .with_operation("launch_workspace")
            .with_metadata("region", "us-east-1");

        assert_eq!(ctx.correlation_id, correlation);
        assert_eq!(ctx.workspace_id, Some(workspace));
        assert_eq!(ctx.principal.as_deref(), Some("alice"));
        assert_eq!(ctx.operation.as_deref(), Some("launch_workspace"));
        assert_eq!(ctx.metadata.get("region"), Some(&"us-east-1".to_string()));
    }

    #[test]
    fn child_context_inherits_correlation() {
        let workspace = Uuid::new_v4();
        let parent = RequestContext::new("api").with_workspace_id(workspace);
        let child = parent.child("lifecycle");

        assert_ne!(child.request_id, parent.request_id);
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.parent_id, Some(parent.request_id));
        assert_eq!(child.workspace_id, Some(workspace));
    }

    #[test]
    fn elapsed_is_non_negative_and_grows() {
        let ctx = RequestContext::new("api");
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(ctx.elapsed_ms() >= 5);
    }

    #[test]
    fn short_id_is_eight_chars() {
        let ctx = RequestContext::new("api");
        assert_eq!(ctx.short_id().len(), 8);
    }

    #[test]
    fn serde_roundtrip() {
        let ctx = RequestContext::new("api").with_operation("stop_workspace");
        let json = serde_json::to_string(&ctx).unwrap();
        let back: RequestContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source, "api");
        assert_eq!(back.operation.as_deref(), Some("stop_workspace"));
    }
}
