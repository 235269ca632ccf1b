//! Response wrapping for frontend compatibility.
//!
//! The labeling frontend expects every result in the form
//! `{success: bool, ...data}`. Handlers return the raw core values; this
//! module adds the envelope.

use serde_json::{json, Value};

/// Wrap API responses to match the frontend's expected format.
pub fn wrap_response(method: &str, result: Value) -> Value {
    match method {
        // List wrappers
        "list_modalities" => {
            json!({
                "success": true,
                "modalities": if result.is_null() { json!([]) } else { result }
            })
        }

        "get_history" => {
            json!({
                "success": true,
                "history": if result.is_null() { json!([]) } else { result }
            })
        }

        "prune_stale_labels" => {
            json!({
                "success": true,
                "removed": if result.is_null() { json!([]) } else { result }
            })
        }

        // Success mirrors the outcome; a rejection is still a valid response.
        "authenticate" => {
            let authenticated = result
                .get("authenticated")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            merge_success(result, authenticated)
        }

        // All other methods: add success to the returned object
        _ => merge_success(result, true),
    }
}

fn merge_success(result: Value, success: bool) -> Value {
    match result {
        Value::Object(mut obj) => {
            obj.entry("success").or_insert(json!(success));
            Value::Object(obj)
        }
        Value::Null => json!({"success": success}),
        other => json!({"success": success, "result": other}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_history() {
        let history = json!([{"key": "easy/a.png"}]);
        let wrapped = wrap_response("get_history", history);

        assert!(wrapped.get("success").unwrap().as_bool().unwrap());
        assert_eq!(wrapped["history"], json!([{"key": "easy/a.png"}]));
    }

    #[test]
    fn test_wrap_null_list() {
        let wrapped = wrap_response("list_modalities", Value::Null);

        assert!(wrapped.get("success").unwrap().as_bool().unwrap());
        assert_eq!(wrapped.get("modalities").unwrap(), &json!([]));
    }

    #[test]
    fn test_wrap_authenticate_follows_outcome() {
        let wrapped = wrap_response(
            "authenticate",
            json!({"status": "rejected", "authenticated": false}),
        );
        assert_eq!(wrapped["success"], false);
        assert_eq!(wrapped["status"], "rejected");

        let wrapped = wrap_response(
            "authenticate",
            json!({"status": "authenticated", "authenticated": true}),
        );
        assert_eq!(wrapped["success"], true);
    }

    #[test]
    fn test_wrap_object_keeps_fields() {
        let wrapped = wrap_response("get_session", json!({"state": "all_labeled"}));
        assert_eq!(wrapped, json!({"state": "all_labeled", "success": true}));
    }

    #[test]
    fn test_wrap_scalar() {
        let wrapped = wrap_response("get_progress", json!(3));
        assert_eq!(wrapped, json!({"success": true, "result": 3}));
    }
}
