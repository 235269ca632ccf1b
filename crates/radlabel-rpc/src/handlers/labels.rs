//! History, edit and reporting handlers.

use super::{get_str_param, open_session, require_item_key, require_str_param};
use crate::server::AppState;
use radlabel_core::{Category, LabelUpdate};
use serde_json::{json, Value};

pub async fn get_history(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let history = state.api.history(&session)?;
    Ok(serde_json::to_value(history)?)
}

pub async fn update_label(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let key = require_item_key(params)?;
    let update = LabelUpdate {
        category: Category::from(require_str_param(params, "category", "category")?),
        report_text: require_str_param(params, "report_text", "reportText")?,
        reasoning: get_str_param(params, "reasoning", "reasoning")
            .unwrap_or_default()
            .to_string(),
    };
    let entry = state.api.update_label(&session, &key, update)?;
    Ok(serde_json::to_value(entry)?)
}

pub async fn update_report_text(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let key = require_item_key(params)?;
    let report_text = require_str_param(params, "report_text", "reportText")?;
    let reasoning = get_str_param(params, "reasoning", "reasoning").map(String::from);
    let entry = state
        .api
        .update_report_text(&session, &key, report_text, reasoning)?;
    Ok(serde_json::to_value(entry)?)
}

pub async fn delete_label(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let key = require_item_key(params)?;
    let deleted = state.api.delete_label(&session, &key)?;
    Ok(json!({"deleted": deleted, "item_key": key}))
}

pub async fn get_progress(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    Ok(serde_json::to_value(state.api.progress(&session)?)?)
}

pub async fn get_summary(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    Ok(serde_json::to_value(state.api.summary(&session)?)?)
}

pub async fn prune_stale_labels(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let removed = state.api.prune_stale_labels(&session)?;
    Ok(serde_json::to_value(removed)?)
}
