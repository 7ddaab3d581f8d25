use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ProfileRegistry, RegistryError};
use crate::calculation::{CalculationInput, ValidationError};

/// Router exposing profile listing and computation endpoints.
pub fn profile_router(registry: Arc<ProfileRegistry>) -> Router {
    Router::new()
        .route("/api/v1/profiles", get(list_handler))
        .route("/api/v1/profiles/:profile/compute", post(compute_handler))
        .with_state(registry)
}

pub(crate) async fn list_handler(State(registry): State<Arc<ProfileRegistry>>) -> Response {
    (StatusCode::OK, Json(registry.summaries())).into_response()
}

pub(crate) async fn compute_handler(
    State(registry): State<Arc<ProfileRegistry>>,
    Path(profile): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let input = match payload {
        Ok(Json(body)) => CalculationInput::from_json(&body),
        Err(rejection) => {
            let error = ValidationError::new("body", "", rejection.body_text());
            return validation_response(rejection.status(), &error);
        }
    };

    let result = input
        .map_err(RegistryError::from)
        .and_then(|input| registry.compute(&profile, &input));

    match result {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(RegistryError::UnknownProfile(name)) => {
            warn!(profile = %name, "compute requested for unknown profile");
            let payload = json!({
                "error": format!("unknown calculator profile '{name}'"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(RegistryError::Validation(error)) => {
            debug!(%profile, field = %error.field, "calculation rejected");
            validation_response(StatusCode::UNPROCESSABLE_ENTITY, &error)
        }
    }
}

fn validation_response(status: StatusCode, error: &ValidationError) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "field": error.field,
        "value": error.value,
    });
    (status, Json(payload)).into_response()
}
