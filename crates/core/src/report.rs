//! Out-of-band error reporting and the per-request context attached to it.

use async_trait::async_trait;
use serde::Serialize;

/// User attributed to a reported error, when the request carries one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportUser {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Diagnostic context sent along with an unexpected error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub referer: Option<String>,
    pub user: Option<ReportUser>,
    pub action: Option<String>,
}

impl ErrorContext {
    /// Best-effort snapshot of `request`. Lookup failures leave fields empty.
    pub fn capture(request: &dyn RequestContext) -> Self {
        let referer = match request.referer() {
            Ok(referer) => referer,
            Err(e) => {
                tracing::debug!(error = %e, "Request context lookup failed");
                None
            }
        };
        Self {
            referer,
            user: request.user(),
            action: None,
        }
    }
}

/// Ambient per-request metadata, used for diagnostics only.
pub trait RequestContext: Send + Sync {
    fn referer(&self) -> anyhow::Result<Option<String>>;

    fn user(&self) -> Option<ReportUser> {
        None
    }
}

/// Context for invocations made outside of any request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequestContext;

impl RequestContext for NoRequestContext {
    fn referer(&self) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Observability sink for unexpected action errors.
#[async_trait]
pub trait ErrorReporter: Send + Sync {
    async fn capture(&self, error: &anyhow::Error, context: &ErrorContext) -> anyhow::Result<()>;
}

/// Reporter that records errors as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

#[async_trait]
impl ErrorReporter for TracingReporter {
    async fn capture(&self, error: &anyhow::Error, context: &ErrorContext) -> anyhow::Result<()> {
        tracing::error!(
            error = %error,
            action = context.action.as_deref().unwrap_or("anonymous"),
            referer = context.referer.as_deref(),
            user_id = context.user.as_ref().map(|u| u.id.as_str()),
            "Unexpected action error",
        );
        Ok(())
    }
}
