use crate::api::AppState;
use crate::namespace::{RegistrationError, ValidationError};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Request to register a new namespace
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
}

/// Response for successful namespace registration
#[derive(Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(rename = "namespaceId")]
    pub namespace_id: String,
    pub name: String,
    pub token: String,
}

/// Response for namespace lookup (NO token)
#[derive(Serialize, Deserialize)]
pub struct NamespaceInfo {
    #[serde(rename = "namespaceId")]
    pub namespace_id: String,
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "entityCount")]
    pub entity_count: u64,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create namespace API router
pub fn create_namespace_router(state: AppState) -> Router {
    Router::new()
        .route("/api/namespaces", post(register_namespace))
        .route("/api/namespaces/:name", get(lookup_namespace))
        .with_state(Arc::new(state))
}

/// POST /api/namespaces - Register new namespace
async fn register_namespace(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, NamespaceError> {
    // Check if auth is enabled
    if !state.auth_enabled {
        return Err(NamespaceError::AuthDisabled);
    }

    // Require admin token if configured
    if let Some(ref expected) = state.admin_token {
        let provided = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if provided != Some(expected.as_str()) {
            return Err(NamespaceError::Unauthorized);
        }
    }

    info!(name = %request.name, "Registering namespace");

    // Register namespace
    let namespace = state
        .namespace_registry
        .register(&request.name)
        .map_err(NamespaceError::Registration)?;

    info!(
        namespace_id = %namespace.id,
        name = %namespace.name,
        "Namespace registered successfully"
    );

    Ok(Json(RegisterResponse {
        namespace_id: namespace.id,
        name: namespace.name,
        token: namespace.token,
    }))
}

/// GET /api/namespaces/:name - Lookup namespace (NO token in response)
async fn lookup_namespace(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<NamespaceInfo>, NamespaceError> {
    // Check if auth is enabled
    if !state.auth_enabled {
        return Err(NamespaceError::AuthDisabled);
    }

    // Look up namespace
    let namespace = state
        .namespace_registry
        .lookup_by_name(&name)
        .ok_or(NamespaceError::NotFound)?;

    Ok(Json(NamespaceInfo {
        namespace_id: namespace.id,
        name: namespace.name,
        created_at: namespace.created_at.to_rfc3339(),
        entity_count: namespace.entity_count,
    }))
}

/// Namespace API error types
enum NamespaceError {
    AuthDisabled,
    Unauthorized,
    NotFound,
    Registration(RegistrationError),
}

impl IntoResponse for NamespaceError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            NamespaceError::AuthDisabled => (
                StatusCode::NOT_FOUND,
                "Namespace registration not available (auth disabled)".to_string(),
            ),
            NamespaceError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Admin token required".to_string(),
            ),
            NamespaceError::NotFound => (
                StatusCode::NOT_FOUND,
                "Namespace not found".to_string(),
            ),
            NamespaceError::Registration(e) => match e {
                RegistrationError::InvalidName(validation_error) => {
                    let msg = match validation_error {
                        ValidationError::TooShort => {
                            "Namespace name too short (minimum 3 characters)"
                        }
                        ValidationError::TooLong => {
                            "Namespace name too long (maximum 32 characters)"
                        }
                        ValidationError::InvalidCharacters(ref detail) => detail,
                    };
                    (StatusCode::BAD_REQUEST, msg.to_string())
                }
                RegistrationError::NameAlreadyExists => (
                    StatusCode::CONFLICT,
                    "Namespace name already exists".to_string(),
                ),
                RegistrationError::StoreFailed => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to persist namespace".to_string(),
                ),
            },
        };

        let body = Json(ErrorResponse {
            error: error_message,
        });

        (status, body).into_response()
    }
}
