//! Authentication & catalog handlers.

use super::get_str_param;
use crate::server::AppState;
use radlabel_core::AuthOutcome;
use serde_json::{json, Value};

/// Check an identifier against the allow-list.
///
/// Every outcome is returned as data; the login page renders each differently.
pub async fn authenticate(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let identifier = get_str_param(params, "identifier", "identifier").unwrap_or_default();
    let outcome = state.api.authenticate(identifier);
    let authenticated = matches!(outcome, AuthOutcome::Authenticated { .. });

    let mut response = serde_json::to_value(outcome)?;
    if let Some(obj) = response.as_object_mut() {
        obj.insert("authenticated".to_string(), json!(authenticated));
    }
    Ok(response)
}

pub async fn get_allowlist_status(state: &AppState, _params: &Value) -> radlabel_core::Result<Value> {
    Ok(serde_json::to_value(state.api.allowlist_status())?)
}

pub async fn list_modalities(state: &AppState, _params: &Value) -> radlabel_core::Result<Value> {
    let modalities: Vec<Value> = state
        .api
        .list_modalities()
        .iter()
        .map(|modality| {
            json!({
                "name": modality.as_str(),
                "scheme": state.api.scheme_for(modality),
                "categories": state.api.scheme_for(modality).categories(),
            })
        })
        .collect();
    Ok(Value::Array(modalities))
}
