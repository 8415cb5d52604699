//! External read-only query endpoint.
//!
//! POST-only, API-key authenticated, CORS-open. Dispatches exclusively into
//! the read-only tool registry: the action name must be on the explicit
//! allow-list, so no mutating tool is reachable from here regardless of what
//! a caller sends.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use atelier_core::{new_entity_id, Timestamp};
use atelier_tools::{execute_tool, Locale, ToolContext, ToolName, ToolOutcome, READ_ONLY_ACTIONS};
use axum::{extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// REQUEST / RESPONSE SHAPES
// ============================================================================

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct QueryRequest {
    /// One of the read-only action names.
    pub action: String,
    /// Tool arguments, validated against the tool's schema.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub params: serde_json::Value,
    /// Response locale: "zh" or "en" (default "en").
    pub locale: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QueryResponse {
    pub success: bool,
    pub action: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub meta: QueryMeta,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QueryMeta {
    #[schema(value_type = String)]
    pub timestamp: Timestamp,
    #[schema(value_type = String)]
    pub request_id: Uuid,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/v1/query - execute one read-only action
#[utoipa::path(
    post,
    path = "/api/v1/query",
    tag = "Query",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query result", body = QueryResponse),
        (status = 400, description = "Unknown or non-read-only action", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 500, description = "Query execution failed", body = ApiError),
    ),
    security(
        ("api_key" = [])
    )
)]
pub async fn query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<QueryRequest>,
) -> ApiResult<impl IntoResponse> {
    let api_key = headers.get("x-api-key").and_then(|h| h.to_str().ok());
    if !crate::auth::verify_api_key(&state.auth_config, api_key) {
        return Err(ApiError::invalid_api_key());
    }

    // The action must parse AND be on the read-only allow-list. A write-tool
    // name is as invalid here as an unknown one.
    let valid: Vec<&str> = READ_ONLY_ACTIONS.iter().map(|t| t.as_str()).collect();
    let name = match req.action.parse::<ToolName>() {
        Ok(name) if name.is_read_only() => name,
        _ => return Err(ApiError::invalid_action(&req.action, &valid)),
    };

    let user_id = state
        .config
        .query_user_id
        .ok_or_else(|| ApiError::service_unavailable("No inventory owner configured"))?;

    let locale = Locale::parse(req.locale.as_deref().unwrap_or("en"));
    let mut ctx = ToolContext::new(state.store.clone(), user_id, locale);
    if let Some(ref model) = state.chat_model {
        ctx = ctx.with_expansion_model(model.clone(), state.config.expansion_model_id.clone());
    }

    let params = if req.params.is_null() {
        serde_json::json!({})
    } else {
        req.params
    };

    tracing::debug!(action = %name, "external query");
    match execute_tool(&ctx, name.as_str(), params).await {
        ToolOutcome::Success { data, .. } => Ok(Json(QueryResponse {
            success: true,
            action: name.as_str().to_string(),
            data,
            meta: QueryMeta {
                timestamp: Utc::now(),
                request_id: new_entity_id(),
            },
        })),
        ToolOutcome::Error { message } => Err(ApiError::query_error(message)),
    }
}

/// OPTIONS /api/v1/query - CORS preflight
pub async fn preflight() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthConfig;
    use crate::config::ApiConfig;
    use crate::{app, AppState};
    use atelier_core::new_entity_id;
    use atelier_store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        let mut auth = AuthConfig::default();
        auth.add_api_key("studio_key".to_string());
        let config = ApiConfig {
            query_user_id: Some(new_entity_id()),
            ..Default::default()
        };
        AppState::new(Arc::new(MemoryStore::new()), auth, config, None)
    }

    fn query_request(api_key: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/query")
            .header("content-type", "application/json");
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_api_key_is_401_invalid_api_key() {
        let response = app(test_state())
            .oneshot(query_request(
                None,
                serde_json::json!({"action": "search_artworks"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_API_KEY");
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_401() {
        let response = app(test_state())
            .oneshot(query_request(
                Some("not_the_key"),
                serde_json::json!({"action": "search_artworks"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_write_action_is_400_invalid_action() {
        let response = app(test_state())
            .oneshot(query_request(
                Some("studio_key"),
                serde_json::json!({"action": "export_artworks"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_ACTION");
        let valid = json["details"]["valid_actions"].as_array().unwrap();
        assert_eq!(valid.len(), 5);
        assert!(valid.iter().all(|v| v != "export_artworks"));
    }

    #[tokio::test]
    async fn test_unknown_action_is_400() {
        let response = app(test_state())
            .oneshot(query_request(
                Some("studio_key"),
                serde_json::json!({"action": "drop_all_tables"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_success_envelope_shape() {
        let response = app(test_state())
            .oneshot(query_request(
                Some("studio_key"),
                serde_json::json!({"action": "search_artworks", "params": {"query": "clouds"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["action"], "search_artworks");
        assert!(json["data"]["artworks"].is_array());
        assert!(json["meta"]["timestamp"].is_string());
        assert!(json["meta"]["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_locale_parameter_reaches_the_tool() {
        let response = app(test_state())
            .oneshot(query_request(
                Some("studio_key"),
                serde_json::json!({"action": "get_statistics",
                                   "params": {"stat_type": "overview"},
                                   "locale": "zh"}),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json["data"]["message"].as_str().unwrap().contains("库存"));
    }

    #[tokio::test]
    async fn test_bad_params_are_500_query_error() {
        let response = app(test_state())
            .oneshot(query_request(
                Some("studio_key"),
                serde_json::json!({"action": "get_statistics", "params": {"stat_type": "bogus"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], "QUERY_ERROR");
    }

    #[tokio::test]
    async fn test_options_preflight_is_204() {
        let response = app(test_state())
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/v1/query")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
