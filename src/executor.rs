//! Running one GraphQL document against a [`SchemaArtifact`].

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_graphql::{Request, Variables};
use futures::FutureExt;
use serde_json::{Value, json};
use tracing::debug;

use crate::engine::SchemaArtifact;
use crate::error::CheckError;
use crate::ops;

/// A document to run plus its optional variables and operation name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub document: String,
    pub variables: Option<Value>,
    pub operation_name: Option<String>,
}

impl QuerySpec {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            ..Self::default()
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Parses a JSON object of variable values.
    pub fn parse_variables(text: &str) -> Result<Value, CheckError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CheckError::InvalidVariables(format!("not valid JSON: {e}")))?;
        check_variables(&value)?;
        Ok(value)
    }

    fn to_request(&self) -> Result<Request, CheckError> {
        let mut request = Request::new(self.document.clone());
        match &self.variables {
            None | Some(Value::Null) => {}
            Some(vars) => {
                check_variables(vars)?;
                request = request.variables(Variables::from_json(vars.clone()));
            }
        }
        if let Some(name) = &self.operation_name {
            request = request.operation_name(name.clone());
        }
        Ok(request)
    }
}

fn check_variables(value: &Value) -> Result<(), CheckError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(CheckError::InvalidVariables(format!(
            "expected a JSON object, got {value}"
        )))
    }
}

/// The response envelope of one execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub response: Value,
    pub error_count: usize,
}

impl ExecutionResult {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn data(&self) -> Option<&Value> {
        self.response.get("data").filter(|d| !d.is_null())
    }
}

pub trait Execute {
    fn execute(
        &self,
        artifact: &SchemaArtifact,
        query: &QuerySpec,
    ) -> Result<ExecutionResult, CheckError>;
}

/// Executes on a single-threaded runtime, waiting for the one response.
///
/// Panics raised while executing are caught and reported as [`CheckError::ExecutionFault`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineExecutor;

impl Execute for EngineExecutor {
    fn execute(
        &self,
        artifact: &SchemaArtifact,
        query: &QuerySpec,
    ) -> Result<ExecutionResult, CheckError> {
        let request = query.to_request()?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .map_err(|e| CheckError::ExecutionFault(format!("could not start runtime: {e}")))?;

        debug!(
            mocked = artifact.is_mocked(),
            operation = query.operation_name.as_deref().unwrap_or("<default>"),
            "executing query"
        );
        let execution = AssertUnwindSafe(artifact.executable().execute(request)).catch_unwind();
        let response = runtime
            .block_on(execution)
            .map_err(|payload| CheckError::ExecutionFault(panic_message(payload.as_ref())))?;

        let error_count = response.errors.len();
        let response = serde_json::to_value(&response)
            .map_err(|e| CheckError::ExecutionFault(format!("unserializable response: {e}")))?;
        debug!(error_count, "execution finished");
        Ok(ExecutionResult {
            response,
            error_count,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "execution panicked".to_string()
    }
}

/// Introspects an artifact, returning a capture in the same `{"data": ...}` shape the
/// loader accepts.
pub fn introspect(
    executor: &impl Execute,
    artifact: &SchemaArtifact,
) -> Result<Value, CheckError> {
    let query = QuerySpec::new(ops::INTROSPECTION_QUERY)
        .with_operation_name(ops::INTROSPECTION_OPERATION);
    let result = executor.execute(artifact, &query)?;
    if result.has_errors() {
        return Err(CheckError::QueryExecutionErrors {
            count: result.error_count,
            response: result.response,
        });
    }
    Ok(json!({ "data": result.response.get("data").cloned().unwrap_or(Value::Null) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SchemaOrigin;
    use crate::mock::{MockOptions, decorate};
    use crate::sdl::parse_sdl;

    const AUTHOR_SDL: &str =
        "type Author { firstName: String } type Query { author(id: Int!): Author }";

    fn author_artifact() -> SchemaArtifact {
        SchemaArtifact::build(parse_sdl(AUTHOR_SDL).unwrap(), SchemaOrigin::Sdl).unwrap()
    }

    #[test]
    fn typename_query_succeeds() {
        let result = EngineExecutor
            .execute(&author_artifact(), &QuerySpec::new("{ __typename }"))
            .unwrap();
        assert!(!result.has_errors());
        assert_eq!(result.data(), Some(&json!({ "__typename": "Query" })));
    }

    #[test]
    fn unknown_field_is_an_in_band_error() {
        let result = EngineExecutor
            .execute(&author_artifact(), &QuerySpec::new("{ nonexistentField }"))
            .unwrap();
        assert!(result.has_errors());
        let message = result.response["errors"][0]["message"].as_str().unwrap();
        assert!(message.contains("nonexistentField"), "{message}");
    }

    #[test]
    fn mocks_do_not_leak_into_the_undecorated_artifact() {
        let plain = author_artifact();
        let mocked = decorate(&plain, &MockOptions::default()).unwrap();
        let query = QuerySpec::new("{ author(id: 1) { firstName } }");

        let mocked_result = EngineExecutor.execute(&mocked, &query).unwrap();
        assert_eq!(
            mocked_result.data(),
            Some(&json!({ "author": { "firstName": "Hello World" } }))
        );

        let plain_result = EngineExecutor.execute(&plain, &query).unwrap();
        assert_eq!(plain_result.data(), Some(&json!({ "author": null })));
    }

    #[test]
    fn variables_flow_into_execution() {
        let artifact = decorate(&author_artifact(), &MockOptions::default()).unwrap();
        let query = QuerySpec::new("query Q($id: Int!) { author(id: $id) { firstName } }");

        let missing = EngineExecutor.execute(&artifact, &query).unwrap();
        assert!(missing.has_errors());

        let provided = EngineExecutor
            .execute(&artifact, &query.clone().with_variables(json!({ "id": 3 })))
            .unwrap();
        assert!(!provided.has_errors());
    }

    #[test]
    fn operation_name_selects_an_operation() {
        let artifact = author_artifact();
        let query =
            QuerySpec::new("query A { __typename } query B { author(id: 1) { firstName } }");

        let ambiguous = EngineExecutor.execute(&artifact, &query).unwrap();
        assert!(ambiguous.has_errors());

        let picked = EngineExecutor
            .execute(&artifact, &query.clone().with_operation_name("A"))
            .unwrap();
        assert!(!picked.has_errors());
        assert_eq!(picked.data(), Some(&json!({ "__typename": "Query" })));
    }

    #[test]
    fn non_object_variables_are_rejected_before_execution() {
        assert!(matches!(
            QuerySpec::parse_variables("[1, 2]"),
            Err(CheckError::InvalidVariables(_))
        ));
        assert!(matches!(
            QuerySpec::parse_variables("{"),
            Err(CheckError::InvalidVariables(_))
        ));
        let query = QuerySpec::new("{ __typename }").with_variables(json!(5));
        assert!(matches!(
            EngineExecutor.execute(&author_artifact(), &query),
            Err(CheckError::InvalidVariables(_))
        ));
    }

    #[test]
    fn introspection_produces_a_data_capture() {
        let capture = introspect(&EngineExecutor, &author_artifact()).unwrap();
        assert_eq!(capture["data"]["__schema"]["queryType"]["name"], "Query");
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "execution panicked");
    }
}
