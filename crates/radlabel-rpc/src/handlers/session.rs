//! Review session handlers.

use super::{get_str_param, open_session, require_str_param};
use crate::server::AppState;
use radlabel_core::{Category, ItemKey, Submission};
use serde_json::Value;

fn optional_item_key(params: &Value) -> Option<ItemKey> {
    get_str_param(params, "item_key", "itemKey").map(ItemKey::from)
}

/// Current state of the session: the item to review, the history page or the summary.
pub async fn get_session(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let response = state.api.session_state(&session)?;
    Ok(serde_json::to_value(response)?)
}

pub async fn submit_label(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let category = require_str_param(params, "category", "category")?;

    let submission = Submission {
        category: Category::from(category),
        report_text: get_str_param(params, "report_text", "reportText").map(String::from),
        reasoning: get_str_param(params, "reasoning", "reasoning")
            .unwrap_or_default()
            .to_string(),
        item_key: optional_item_key(params),
    };
    let response = state.api.submit_label(&session, submission)?;
    Ok(serde_json::to_value(response)?)
}

pub async fn skip_item(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let response = state.api.skip_item(&session, optional_item_key(params))?;
    Ok(serde_json::to_value(response)?)
}

pub async fn drop_item(state: &AppState, params: &Value) -> radlabel_core::Result<Value> {
    let session = open_session(state, params)?;
    let response = state.api.drop_item(&session, optional_item_key(params))?;
    Ok(serde_json::to_value(response)?)
}
