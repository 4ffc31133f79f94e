//! Unified API error type: wraps [`OrchestratorError`] and renders it as
//! an HTTP response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use basecamp_core::error::OrchestratorError;
use serde::Serialize;

/// A request-facing API error. Every route handler's error path funnels
/// through here so the status-code mapping lives in exactly one place.
#[derive(Debug)]
pub struct ApiError(OrchestratorError);

/// Wire shape of an error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remediation_hint: Option<&'static str>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            OrchestratorError::NotFound { .. } => StatusCode::NOT_FOUND,
            OrchestratorError::Conflict { .. } => StatusCode::CONFLICT,
            OrchestratorError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            OrchestratorError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            OrchestratorError::Forbidden { .. } => StatusCode::FORBIDDEN,
            OrchestratorError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
            OrchestratorError::ProviderError { .. } => StatusCode::BAD_GATEWAY,
            OrchestratorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            OrchestratorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "internal error handling request");
        } else {
            tracing::debug!(error = %self.0, code = self.0.code(), "request failed");
        }
        let body = ErrorBody {
            code: self.0.code(),
            message: self.0.to_string(),
            remediation_hint: self.0.remediation_hint(),
        };
        (status, Json(body)).into_response()
    }
}

/// Blanket conversion from any error the component crates expose, since
/// every one of them already implements `Into<OrchestratorError>`. This
/// lets every route handler use `?` directly against
/// `LifecycleResult`/`IdentityResult`/`BudgetResult`/`IdleResult`/
/// `PricingResult`/`ProviderResult`/`TemplateResult`/`StorageResult`
/// without a per-crate conversion at the call site.
impl<E> From<E> for ApiError
where
    E: Into<OrchestratorError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
