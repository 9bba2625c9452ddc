// Response envelope returned by the worker script endpoints. The remote
// omits `result` on some failures and sends it as `null` on others, so every
// field falls back to its default when missing or null.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treats an explicit `null` the same as a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct UploadResponse {
    #[serde(default, deserialize_with = "null_default")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub errors: Vec<ResponseError>,
    #[serde(default, deserialize_with = "null_default")]
    pub messages: Vec<ResponseError>,
    #[serde(default, deserialize_with = "null_default")]
    pub result: ResponseResult,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct ResponseResult {
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub created_on: String,
    #[serde(default, deserialize_with = "null_default")]
    pub modified_on: String,
    #[serde(default, deserialize_with = "null_default")]
    pub etag: String,
    #[serde(default, deserialize_with = "null_default")]
    pub usage_model: String,
    #[serde(default, deserialize_with = "null_default")]
    pub handlers: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub available_on_subdomain: bool,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseError {
    #[serde(default, deserialize_with = "null_default")]
    pub code: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub message: String,
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_full_envelope() {
        let raw = r#"{
            "success": true,
            "errors": [],
            "messages": [],
            "result": {
                "id": "sf-fn1",
                "created_on": "2023-01-01T00:00:00Z",
                "modified_on": "2023-01-02T00:00:00Z",
                "etag": "abc",
                "usage_model": "bundled",
                "handlers": ["fetch"],
                "available_on_subdomain": true
            }
        }"#;
        let res: UploadResponse = serde_json::from_str(raw).unwrap();
        assert!(res.success);
        assert_eq!(res.result.id, "sf-fn1");
        assert_eq!(res.result.handlers, vec!["fetch".to_string()]);
        assert!(res.result.available_on_subdomain);
    }

    #[test]
    fn failure_without_result_still_decodes() {
        let raw = r#"{"success": false, "errors": [{"code": 10007, "message": "not found"}]}"#;
        let res: UploadResponse = serde_json::from_str(raw).unwrap();
        assert!(!res.success);
        assert_eq!(
            res.errors,
            vec![ResponseError {
                code: 10007,
                message: "not found".into(),
            }]
        );
        assert_eq!(res.result, ResponseResult::default());
    }

    #[test]
    fn null_result_keeps_the_error_list() {
        let raw = r#"{
            "result": null,
            "success": false,
            "errors": [{"code": 10000, "message": "Authentication error"}],
            "messages": []
        }"#;
        let res: UploadResponse = serde_json::from_str(raw).unwrap();
        assert!(!res.success);
        assert_eq!(res.errors.len(), 1);
        assert_eq!(res.errors[0].code, 10000);
        assert_eq!(res.errors[0].message, "Authentication error");
        assert_eq!(res.result, ResponseResult::default());
    }

    #[test]
    fn null_fields_fall_back_to_defaults() {
        let raw = r#"{
            "success": true,
            "errors": null,
            "messages": null,
            "result": {"id": "sf-fn1", "handlers": null, "etag": null}
        }"#;
        let res: UploadResponse = serde_json::from_str(raw).unwrap();
        assert!(res.success);
        assert!(res.errors.is_empty());
        assert!(res.messages.is_empty());
        assert_eq!(res.result.id, "sf-fn1");
        assert!(res.result.handlers.is_empty());
        assert_eq!(res.result.etag, "");
        assert!(!res.result.available_on_subdomain);
    }
}
