use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestParseError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Valid JSON that is not an object, e.g. `[1, 2]` or `"text"`. Like
    /// invalid JSON, this aborts ingestion for the whole run instead of
    /// turning into an error result for that one line.
    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// One inference request as read from the input, with fields kept in their
/// original order. Unknown fields pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Request(Map<String, Value>);

impl Request {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Parse a single input line.
    pub fn parse(line: &str) -> Result<Self, RequestParseError> {
        match serde_json::from_str::<Value>(line)? {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(RequestParseError::NotAnObject(kind_of(&other))),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of the request without the ignored keys. Keys are matched exactly;
    /// names that are not present are ignored.
    pub fn filtered(&self, ignore_fields: &[String]) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(key, _)| !ignore_fields.iter().any(|ignored| ignored == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl From<Map<String, Value>> for Request {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> Request {
        match value {
            Value::Object(map) => Request::new(map),
            _ => panic!("test request must be an object"),
        }
    }

    #[test]
    fn test_parse_object_line() {
        let req = Request::parse(r#"{"title": "x", "id": 1}"#).unwrap();
        assert_eq!(req.len(), 2);
        assert_eq!(req.get("title"), Some(&json!("x")));
    }

    #[test]
    fn test_parse_keeps_field_order() {
        let req = Request::parse(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<&str> = req.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = Request::parse(r#"{"title": "#).unwrap_err();
        assert!(matches!(err, RequestParseError::Json(_)));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let err = Request::parse("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, RequestParseError::NotAnObject("an array")));
    }

    #[test]
    fn test_filtered_removes_ignored_fields() {
        let req = request(json!({"title": "result_1", "id": 1}));
        let filtered = req.filtered(&["id".to_string()]);
        assert_eq!(Value::Object(filtered), json!({"title": "result_1"}));
        // The original is never mutated.
        assert_eq!(req.get("id"), Some(&json!(1)));
    }

    #[test]
    fn test_filtered_with_empty_ignore_list() {
        let req = request(json!({"title": "result_1", "id": 1}));
        let filtered = req.filtered(&[]);
        assert_eq!(&filtered, req.fields());
    }

    #[test]
    fn test_filtered_ignores_absent_keys() {
        let req = request(json!({"title": "result_1"}));
        let filtered = req.filtered(&["missing".to_string(), "Title".to_string()]);
        assert_eq!(Value::Object(filtered), json!({"title": "result_1"}));
    }
}
