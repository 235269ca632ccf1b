//! JSON-RPC request handlers, split by domain.

mod auth;
mod labels;
mod session;

use crate::server::AppState;
use crate::wrapper::wrap_response;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use radlabel_core::{ItemKey, LabelError, Session, ViewMode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

// ============================================================================
// JSON-RPC types
// ============================================================================

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 error structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
            id,
        }
    }

    /// Error response carrying the error kind, so clients can branch without parsing messages.
    pub fn from_error(id: Option<Value>, err: &LabelError) -> Self {
        let mut response = Self::error(id, err.to_rpc_error_code(), err.to_string());
        if let Some(error) = response.error.as_mut() {
            error.data = Some(json!({
                "kind": error_kind(err),
                "user_correctable": err.is_user_correctable(),
            }));
        }
        response
    }
}

fn error_kind(err: &LabelError) -> &'static str {
    match err {
        LabelError::Io { .. } => "io",
        LabelError::Lock { .. } => "lock",
        LabelError::Json { .. } => "json",
        LabelError::StoreCorrupted { .. } => "store_corrupted",
        LabelError::Config { .. } => "config",
        LabelError::AllowListUnavailable { .. } => "allowlist_unavailable",
        LabelError::InvalidModality(_) => "invalid_modality",
        LabelError::InvalidCategory { .. } => "invalid_category",
        LabelError::InvalidParams { .. } => "invalid_params",
        LabelError::NotAuthenticated => "not_authenticated",
        LabelError::Rejected => "rejected",
        LabelError::StaleItem { .. } => "stale_item",
        LabelError::NoCurrentItem => "no_current_item",
        LabelError::LabelNotFound { .. } => "label_not_found",
        LabelError::Other(_) => "other",
    }
}

// ============================================================================
// Parameter extraction helpers
// ============================================================================

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> radlabel_core::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| LabelError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}

/// Extract the required `item_key` parameter.
pub(crate) fn require_item_key(params: &Value) -> radlabel_core::Result<ItemKey> {
    require_str_param(params, "item_key", "itemKey").map(ItemKey::from)
}

/// Authenticate the caller and build the session the request operates on.
///
/// Every labeling method carries `identifier` and `modality`; `view` is
/// optional and defaults to `current`.
pub(crate) fn open_session(state: &AppState, params: &Value) -> radlabel_core::Result<Session> {
    let identifier = get_str_param(params, "identifier", "identifier").unwrap_or_default();
    let modality = require_str_param(params, "modality", "modality")?;
    let view = match get_str_param(params, "view", "view") {
        Some(view) => ViewMode::from_str(view).ok_or_else(|| LabelError::InvalidParams {
            message: format!("Unknown view: {}", view),
        })?,
        None => ViewMode::Current,
    };
    state.api.open_session_with_view(identifier, &modality, view)
}

// ============================================================================
// HTTP endpoints
// ============================================================================

/// Health check endpoint.
pub async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Main JSON-RPC handler.
pub async fn handle_rpc(
    State(state): State<Arc<AppState>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    let method = &request.method;
    let params = request.params.unwrap_or(Value::Object(Default::default()));
    let id = request.id.clone();

    // Params carry reviewer identifiers, so only the method is logged.
    debug!("RPC call: {}", method);

    // Handle built-in methods
    if method == "health_check" {
        return (
            StatusCode::OK,
            Json(JsonRpcResponse::success(
                id,
                json!({"status": "ok", "allowlist": state.api.allowlist_status()}),
            )),
        );
    }

    // Dispatch to API methods
    let span = info_span!("rpc", request_id = %Uuid::new_v4(), method = %method);
    let result = dispatch_method(&state, method, &params)
        .instrument(span.clone())
        .await;

    match result {
        Ok(value) => {
            let wrapped = wrap_response(method, value);
            (StatusCode::OK, Json(JsonRpcResponse::success(id, wrapped)))
        }
        Err(e) => {
            span.in_scope(|| {
                if e.is_user_correctable() {
                    warn!("RPC error for {}: {}", method, e);
                } else {
                    error!("RPC error for {}: {}", method, e);
                }
            });
            (StatusCode::OK, Json(JsonRpcResponse::from_error(id, &e)))
        }
    }
}

// ============================================================================
// Method dispatcher
// ============================================================================

/// Dispatch a method call to the appropriate domain handler.
async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Value,
) -> radlabel_core::Result<Value> {
    match method {
        // Authentication & Catalog
        "authenticate" => auth::authenticate(state, params).await,
        "get_allowlist_status" => auth::get_allowlist_status(state, params).await,
        "list_modalities" => auth::list_modalities(state, params).await,

        // Review Session
        "get_session" => session::get_session(state, params).await,
        "submit_label" => session::submit_label(state, params).await,
        "skip_item" => session::skip_item(state, params).await,
        "drop_item" => session::drop_item(state, params).await,

        // History & Edits
        "get_history" => labels::get_history(state, params).await,
        "update_label" => labels::update_label(state, params).await,
        "update_report_text" => labels::update_report_text(state, params).await,
        "delete_label" => labels::delete_label(state, params).await,

        // Reporting
        "get_progress" => labels::get_progress(state, params).await,
        "get_summary" => labels::get_summary(state, params).await,
        "prune_stale_labels" => labels::prune_stale_labels(state, params).await,

        // Unknown method
        _ => {
            warn!("Method not found: {}", method);
            Err(LabelError::Other(format!("Method not found: {}", method)))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_rpc_response_success() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"data": "test"}));
        assert!(response.error.is_none());
        assert_eq!(response.result, Some(json!({"data": "test"})));
    }

    #[test]
    fn test_json_rpc_response_from_error() {
        let err = LabelError::StaleItem {
            expected: "easy/a.png".into(),
            current: Some("easy/b.png".into()),
        };
        let response = JsonRpcResponse::from_error(Some(json!(7)), &err);
        let error = response.error.unwrap();
        assert_eq!(error.code, -32020);
        assert_eq!(error.data.unwrap()["kind"], "stale_item");
        assert!(response.result.is_none());
    }

    #[test]
    fn test_param_helpers_accept_camel_case() {
        let params = json!({"item_key": "easy/a.png", "reportText": "r"});
        assert_eq!(get_str_param(&params, "report_text", "reportText"), Some("r"));
        assert_eq!(require_item_key(&params).unwrap().as_str(), "easy/a.png");
        assert!(matches!(
            require_str_param(&params, "modality", "modality"),
            Err(LabelError::InvalidParams { .. })
        ));
    }
}
