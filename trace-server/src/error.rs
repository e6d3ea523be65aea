//! HTTP error mapping.

use std::time::Duration;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use trace_adapters::traits::AdapterError;
use trace_graph::GraphError;
use trace_orchestrator::OrchestratorError;

/// Errors returned by API handlers, rendered as `{"detail": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request was malformed.
    #[error("{0}")]
    BadRequest(String),
    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The model provider is rate limiting us.
    #[error("model provider rate limited the request")]
    RateLimited {
        /// Provider-suggested delay.
        retry_after: Option<Duration>,
    },
    /// The model provider or graph database failed.
    #[error("{0}")]
    Upstream(String),
    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Status code the error renders with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            AdapterError::InvalidRequest { .. } => Self::BadRequest(err.to_string()),
            AdapterError::Configuration { .. } => Self::Internal(err.to_string()),
            AdapterError::Transport { .. } | AdapterError::Response { .. } => {
                Self::Upstream(err.to_string())
            }
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Primitive(_) => Self::BadRequest(err.to_string()),
            GraphError::InvalidConfig { .. } | GraphError::InvalidRecord(_) => {
                Self::Internal(err.to_string())
            }
            GraphError::Connection { .. } | GraphError::Backend { .. } | GraphError::Decode { .. } => {
                Self::Upstream(err.to_string())
            }
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::InvalidRequest { .. } | OrchestratorError::Primitive(_) => {
                Self::BadRequest(err.to_string())
            }
            OrchestratorError::NotFound { .. } => Self::NotFound(err.to_string()),
            OrchestratorError::Adapter(inner) => inner.into(),
            OrchestratorError::Graph(inner) => inner.into(),
        }
    }
}

impl From<trace_primitives::Error> for ApiError {
    fn from(err: trace_primitives::Error) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let retry_after = match &self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        };
        let mut response = (status, Json(json!({ "detail": self.to_string() }))).into_response();
        if let Some(value) = retry_after
            .and_then(|delay| HeaderValue::from_str(&delay.as_secs().to_string()).ok())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_pipeline_errors_to_statuses() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (OrchestratorError::invalid("blank").into(), StatusCode::BAD_REQUEST),
            (
                OrchestratorError::NotFound {
                    what: "decision",
                    id: "dec-1".into(),
                }
                .into(),
                StatusCode::NOT_FOUND,
            ),
            (
                OrchestratorError::Adapter(AdapterError::RateLimited { retry_after: None }).into(),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                OrchestratorError::Adapter(AdapterError::transport("timeout")).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                OrchestratorError::Graph(GraphError::backend("down")).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AdapterError::configuration("no key").into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.status(), status, "{err}");
        }
    }

    #[test]
    fn rate_limits_carry_retry_after() {
        let response = ApiError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "7");
    }
}
