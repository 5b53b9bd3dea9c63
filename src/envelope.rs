//! Structured error envelope returned by adapters for failed requests.

use crate::extractor::ParamLocation;
use crate::schema_generator::Schema;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Component name shared by every 400/404/500 response
pub const ERROR_ENVELOPE: &str = "ErrorEnvelope";
pub const VALIDATION_ISSUE: &str = "ValidationIssue";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Short error class, e.g. `ValidationError`
    pub error: String,
    pub message: String,
    pub status_code: u16,
    /// RFC 3339
    pub timestamp: String,
    /// Request path
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<ValidationIssue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Where the offending value came from
    pub source: ParamLocation,
    /// JSON pointer into the offending value
    pub path: String,
    pub message: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(status_code: u16, error: &str, message: &str, path: &str, at: DateTime<Utc>) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            status_code,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            path: path.to_string(),
            issues: None,
        }
    }

    /// A 400 envelope listing validation issues
    pub fn validation(path: &str, issues: Vec<ValidationIssue>, at: DateTime<Utc>) -> Self {
        let message = format!("Request validation failed with {} issue(s)", issues.len());
        Self {
            issues: Some(issues),
            ..Self::new(400, "ValidationError", &message, path, at)
        }
    }
}

fn object(properties: Vec<(&str, Schema)>, required: &[&str]) -> Schema {
    Schema {
        properties: Some(
            properties
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect::<IndexMap<_, _>>(),
        ),
        required: Some(required.iter().map(|s| s.to_string()).collect()),
        ..Schema::typed("object")
    }
}

/// Component schemas for [`ErrorEnvelope`] and [`ValidationIssue`].
pub fn component_schemas() -> Vec<(&'static str, Schema)> {
    let issue = object(
        vec![
            (
                "source",
                Schema {
                    enum_values: Some(vec![
                        json!("path"),
                        json!("query"),
                        json!("header"),
                        json!("cookie"),
                        json!("body"),
                    ]),
                    ..Schema::typed("string")
                },
            ),
            ("path", Schema::typed("string")),
            ("message", Schema::typed("string")),
            ("code", Schema::typed("string")),
            ("expected", Schema::default()),
            ("received", Schema::default()),
        ],
        &["source", "path", "message", "code"],
    );
    let envelope = object(
        vec![
            ("error", Schema::typed("string")),
            ("message", Schema::typed("string")),
            ("statusCode", Schema::typed("integer")),
            (
                "timestamp",
                Schema {
                    format: Some("date-time".to_string()),
                    ..Schema::typed("string")
                },
            ),
            ("path", Schema::typed("string")),
            ("issues", Schema::array(Schema::reference(VALIDATION_ISSUE))),
        ],
        &["error", "message", "statusCode", "timestamp", "path"],
    );
    vec![(ERROR_ENVELOPE, envelope), (VALIDATION_ISSUE, issue)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validation_envelope_serialization() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let envelope = ErrorEnvelope::validation(
            "/users/abc",
            vec![ValidationIssue {
                source: ParamLocation::Path,
                path: "/id".to_string(),
                message: "must be number".to_string(),
                code: "type".to_string(),
                expected: Some(json!("number")),
                received: Some(json!("abc")),
            }],
            at,
        );
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "error": "ValidationError",
                "message": "Request validation failed with 1 issue(s)",
                "statusCode": 400,
                "timestamp": "2024-05-01T12:00:00.000Z",
                "path": "/users/abc",
                "issues": [{
                    "source": "path",
                    "path": "/id",
                    "message": "must be number",
                    "code": "type",
                    "expected": "number",
                    "received": "abc"
                }]
            })
        );
    }

    #[test]
    fn test_not_found_has_no_issues() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let value = serde_json::to_value(ErrorEnvelope::new(404, "NotFound", "No route", "/x", at)).unwrap();
        assert!(value.get("issues").is_none());
    }

    #[test]
    fn test_component_schemas() {
        let components = component_schemas();
        assert_eq!(components[0].0, "ErrorEnvelope");
        let envelope = serde_json::to_value(&components[0].1).unwrap();
        assert_eq!(
            envelope["properties"]["issues"],
            json!({"type": "array", "items": {"$ref": "#/components/schemas/ValidationIssue"}})
        );
        assert_eq!(envelope["required"].as_array().unwrap().len(), 5);
    }
}
