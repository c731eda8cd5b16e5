//! HTTP/JSON transport layer for idlink.
//!
//! The canonical protocol surface is the observation/identity pair: the
//! boundary accepts an observation as a JSON body and returns the
//! consolidated identity envelope. Validation failures are the boundary's
//! to reject; retriable store failures surface as 503 so callers can
//! apply their own retry policy (the engine never retries).

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::IdentityEngine;
use crate::error::IdlinkError;
use crate::identity::IdentityEnvelope;
use crate::observation::Observation;

/// Error body returned on every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Mirrors the HTTP status code.
    pub status_code: u16,
    /// Human-readable failure description.
    pub error: String,
}

/// Liveness probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves traffic.
    pub status: String,
}

/// Builds the identity router over the given engine.
///
/// Routes:
/// - `POST /identify` — reconcile one observation
/// - `GET /healthz` — liveness probe
#[must_use]
pub fn router(engine: Arc<IdentityEngine>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/identify", post(identify))
        .with_state(engine)
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn identify(
    State(engine): State<Arc<IdentityEngine>>,
    Json(observation): Json<Observation>,
) -> Result<Json<IdentityEnvelope>, (StatusCode, Json<ErrorBody>)> {
    let request_id = Uuid::new_v4();

    match engine.reconcile(&observation) {
        Ok(identity) => {
            tracing::info!(
                request_id = %request_id,
                primary = identity.primary_contact_id.get(),
                "identify resolved"
            );
            Ok(Json(IdentityEnvelope::from(identity)))
        }
        Err(err) => {
            let status = status_for(&err);
            tracing::warn!(request_id = %request_id, error = %err, "identify failed");
            Err((
                status,
                Json(ErrorBody {
                    status_code: status.as_u16(),
                    error: err.to_string(),
                }),
            ))
        }
    }
}

fn status_for(err: &IdlinkError) -> StatusCode {
    match err {
        IdlinkError::Validation(_) => StatusCode::BAD_REQUEST,
        IdlinkError::Storage(_) if err.is_retriable() => StatusCode::SERVICE_UNAVAILABLE,
        IdlinkError::Storage(_) | IdlinkError::InvariantViolation { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::storage::StorageError;

    #[test]
    fn test_status_mapping() {
        let rejected = IdlinkError::from(ValidationError::EmptyObservation);
        assert_eq!(status_for(&rejected), StatusCode::BAD_REQUEST);

        let retriable = IdlinkError::from(StorageError::Unavailable("down".to_string()));
        assert_eq!(status_for(&retriable), StatusCode::SERVICE_UNAVAILABLE);

        let conflict =
            IdlinkError::from(StorageError::TransactionConflict("writer".to_string()));
        assert_eq!(status_for(&conflict), StatusCode::SERVICE_UNAVAILABLE);

        let fatal = IdlinkError::invariant("two primaries");
        assert_eq!(status_for(&fatal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            status_code: 400,
            error: "observation must include at least one of email or phoneNumber".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["statusCode"], 400);
        assert!(json["error"].as_str().unwrap().contains("phoneNumber"));
    }
}
