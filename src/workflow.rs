//! The validation run: load, optionally mock, execute, classify.

use tracing::debug;

use crate::config::RunConfig;
use crate::engine::SchemaOrigin;
use crate::error::CheckError;
use crate::executor::{Execute, ExecutionResult};
use crate::loader::load_schema;
use crate::mock::decorate;

/// Validates `config.query` against `config.schema`.
///
/// Returns the execution result when the query ran without in-band errors. Schema
/// failures return before `executor` is touched.
pub fn validate(
    config: &RunConfig,
    executor: &impl Execute,
) -> Result<ExecutionResult, CheckError> {
    let artifact = load_schema(&config.schema)?;

    let artifact = match (config.mock.enabled, artifact.origin()) {
        (true, SchemaOrigin::Sdl) => decorate(&artifact, &config.mock)?,
        (true, SchemaOrigin::Introspection) => {
            debug!("mocking only applies to SDL schemas; executing without resolvers");
            artifact
        }
        (false, _) => artifact,
    };

    let result = executor.execute(&artifact, &config.query)?;
    if result.has_errors() {
        return Err(CheckError::QueryExecutionErrors {
            count: result.error_count,
            response: result.response,
        });
    }
    Ok(result)
}
