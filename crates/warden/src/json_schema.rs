//! JSON Schema adapter backed by the `jsonschema` crate.
//!
//! Schemas are compiled once, when routes are declared, and shared by every
//! request that uses them.

use jsonschema::Validator;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use warden_core::{Adapter, AdapterResult, BoxFuture, Outcome};

/// A schema document that failed to compile.
#[derive(Debug, Clone, Error)]
#[error("invalid JSON schema: {0}")]
pub struct SchemaCompileError(String);

/// One way in which a value failed its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Human-readable description from the schema validator.
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A compiled JSON Schema.
///
/// Cloning is cheap; the compiled validator is shared.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use warden::json_schema::JsonSchema;
///
/// let schema = JsonSchema::compile(&json!({ "type": "integer" })).unwrap();
/// assert_eq!(schema.source(), &json!({ "type": "integer" }));
///
/// assert!(JsonSchema::compile(&json!({ "type": 12 })).is_err());
/// ```
#[derive(Clone)]
pub struct JsonSchema {
    source: Arc<Value>,
    validator: Arc<Validator>,
}

impl JsonSchema {
    /// Compiles a schema document.
    pub fn compile(schema: &Value) -> Result<Self, SchemaCompileError> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| SchemaCompileError(e.to_string()))?;
        Ok(Self {
            source: Arc::new(schema.clone()),
            validator: Arc::new(validator),
        })
    }

    /// Returns the schema document this was compiled from.
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Collects every issue `instance` has against this schema.
    pub fn issues(&self, instance: &Value) -> Vec<SchemaIssue> {
        self.validator
            .iter_errors(instance)
            .map(|error| SchemaIssue {
                message: error.to_string(),
            })
            .collect()
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Validates `serde_json::Value` payloads against [`JsonSchema`]s.
///
/// The validated value is the input unchanged; JSON Schema only checks.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use warden::json_schema::{JsonSchema, JsonSchemaAdapter};
/// use warden::core::{Adapter, Outcome};
///
/// let schema = JsonSchema::compile(&json!({ "type": "string" })).unwrap();
/// let adapter = JsonSchemaAdapter::new();
///
/// let outcome = tokio_test::block_on(adapter.validate(json!("ok"), &schema)).unwrap();
/// assert_eq!(outcome, Outcome::Valid(json!("ok")));
///
/// let outcome = tokio_test::block_on(adapter.validate(json!(3), &schema)).unwrap();
/// assert!(outcome.is_invalid());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaAdapter {
    max_issues: Option<usize>,
}

impl JsonSchemaAdapter {
    /// Creates an adapter that reports every issue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps how many issues are reported per value.
    #[must_use]
    pub fn max_issues(mut self, limit: usize) -> Self {
        self.max_issues = Some(limit.max(1));
        self
    }
}

impl Adapter<JsonSchema, Value, Vec<SchemaIssue>> for JsonSchemaAdapter {
    fn validate<'a>(
        &'a self,
        data: Value,
        schema: &'a JsonSchema,
    ) -> BoxFuture<'a, AdapterResult<Value, Vec<SchemaIssue>>> {
        let mut issues = schema.issues(&data);
        if let Some(limit) = self.max_issues {
            issues.truncate(limit);
        }
        let outcome = if issues.is_empty() {
            Outcome::Valid(data)
        } else {
            Outcome::Invalid(issues)
        };
        Box::pin(async move { Ok(outcome) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> JsonSchema {
        JsonSchema::compile(&json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer", "minimum": 0 }
            },
            "required": ["name", "age"]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_value_passes_through() {
        let data = json!({"name": "ada", "age": 36});
        let outcome = JsonSchemaAdapter::new()
            .validate(data.clone(), &user_schema())
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Valid(data));
    }

    #[tokio::test]
    async fn test_every_issue_is_reported() {
        let outcome = JsonSchemaAdapter::new()
            .validate(json!({"name": 1, "age": -1}), &user_schema())
            .await
            .unwrap();
        match outcome {
            Outcome::Invalid(issues) => assert_eq!(issues.len(), 2),
            Outcome::Valid(_) => panic!("expected issues"),
        }
    }

    #[tokio::test]
    async fn test_max_issues() {
        let outcome = JsonSchemaAdapter::new()
            .max_issues(1)
            .validate(json!({"name": 1, "age": -1}), &user_schema())
            .await
            .unwrap();
        assert_eq!(outcome.invalid().map(|issues| issues.len()), Some(1));
    }

    #[test]
    fn test_compile_error() {
        let err = JsonSchema::compile(&json!({"minimum": "zero"})).unwrap_err();
        assert!(err.to_string().starts_with("invalid JSON schema"));
    }

    #[test]
    fn test_debug_shows_source() {
        let schema = JsonSchema::compile(&json!({"type": "null"})).unwrap();
        assert!(format!("{schema:?}").contains("null"));
    }
}
