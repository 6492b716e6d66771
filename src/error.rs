use serde::Serialize;
use serde_json::{Value, json};

/// Coarse classification of a failed run, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    MalformedSchema,
    UnrecognizedSchemaShape,
    SchemaParseError,
    QueryExecutionErrors,
    ExecutionFault,
    InvalidVariables,
    Config,
}

/// Every way a validation run can fail. All of them are terminal and map to exit code 1.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("Schema has errors in it")]
    MalformedSchema { errors: Value },

    #[error("Schema does not have errors or data")]
    UnrecognizedSchemaShape,

    #[error("invalid schema: {0}")]
    SchemaParse(String),

    #[error("query returned {count} error(s)")]
    QueryExecutionErrors { count: usize, response: Value },

    #[error("execution fault: {0}")]
    ExecutionFault(String),

    #[error("invalid variables: {0}")]
    InvalidVariables(String),

    #[error("{0}")]
    Config(String),
}

impl CheckError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckError::MalformedSchema { .. } => ErrorKind::MalformedSchema,
            CheckError::UnrecognizedSchemaShape => ErrorKind::UnrecognizedSchemaShape,
            CheckError::SchemaParse(_) => ErrorKind::SchemaParseError,
            CheckError::QueryExecutionErrors { .. } => ErrorKind::QueryExecutionErrors,
            CheckError::ExecutionFault(_) => ErrorKind::ExecutionFault,
            CheckError::InvalidVariables(_) => ErrorKind::InvalidVariables,
            CheckError::Config(_) => ErrorKind::Config,
        }
    }

    /// Structured detail printed after the `ERROR` tag.
    ///
    /// In-band query errors print the execution response itself so the `errors` list is
    /// visible exactly as the engine produced it.
    pub fn payload(&self) -> Value {
        match self {
            CheckError::QueryExecutionErrors { response, .. } => response.clone(),
            CheckError::MalformedSchema { errors } => json!({
                "kind": self.kind(),
                "message": self.to_string(),
                "errors": errors,
            }),
            other => json!({
                "kind": other.kind(),
                "message": other.to_string(),
            }),
        }
    }

    /// The `errors` entries to list in table output, if any.
    pub fn error_entries(&self) -> Vec<Value> {
        let list = match self {
            CheckError::QueryExecutionErrors { response, .. } => response.get("errors"),
            CheckError::MalformedSchema { errors } => Some(errors),
            _ => None,
        };
        match list {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => vec![json!({ "message": self.to_string() })],
            Some(other) => vec![other.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_tags_kind_and_message() {
        let err = CheckError::UnrecognizedSchemaShape;
        assert_eq!(
            err.payload(),
            json!({
                "kind": "UnrecognizedSchemaShape",
                "message": "Schema does not have errors or data"
            })
        );
    }

    #[test]
    fn query_errors_payload_is_the_response() {
        let response = json!({ "data": null, "errors": [{ "message": "boom" }] });
        let err = CheckError::QueryExecutionErrors {
            count: 1,
            response: response.clone(),
        };
        assert_eq!(err.payload(), response);
        assert_eq!(err.error_entries(), vec![json!({ "message": "boom" })]);
    }

    #[test]
    fn malformed_schema_keeps_capture_errors() {
        let err = CheckError::MalformedSchema {
            errors: json!([{ "message": "introspection disabled" }]),
        };
        let payload = err.payload();
        assert_eq!(payload["kind"], "MalformedSchema");
        assert_eq!(payload["errors"][0]["message"], "introspection disabled");
    }

    #[test]
    fn scalar_errors_produce_a_single_table_entry() {
        let err = CheckError::ExecutionFault("resolver panicked".into());
        assert_eq!(
            err.error_entries(),
            vec![json!({ "message": "execution fault: resolver panicked" })]
        );
    }
}
