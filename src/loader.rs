//! Turns a [`SchemaSource`] into a [`SchemaArtifact`].

use serde_json::Value;
use tracing::debug;

use crate::config::SchemaSource;
use crate::engine::{SchemaArtifact, SchemaOrigin};
use crate::error::CheckError;
use crate::introspection::model_from_data;
use crate::model::SchemaModel;
use crate::sdl::parse_sdl;

/// Parses a source into a model without building an executable schema.
///
/// An introspection capture carrying an `errors` member fails as
/// [`CheckError::MalformedSchema`] even if it also has `data`.
pub fn load_model(source: &SchemaSource) -> Result<(SchemaModel, SchemaOrigin), CheckError> {
    match source {
        SchemaSource::Sdl(text) => {
            debug!(bytes = text.len(), "loading SDL schema");
            Ok((parse_sdl(text)?, SchemaOrigin::Sdl))
        }
        SchemaSource::Introspection(text) => {
            debug!(bytes = text.len(), "loading introspection capture");
            let capture: Value = serde_json::from_str(text).map_err(|e| {
                CheckError::SchemaParse(format!("introspection capture is not JSON: {e}"))
            })?;
            let data = classify_capture(&capture)?;
            Ok((model_from_data(data)?, SchemaOrigin::Introspection))
        }
    }
}

pub fn load_schema(source: &SchemaSource) -> Result<SchemaArtifact, CheckError> {
    let (model, origin) = load_model(source)?;
    SchemaArtifact::build(model, origin)
}

/// Returns the `data` member of a capture, or the reason it cannot be used.
pub fn classify_capture(capture: &Value) -> Result<&Value, CheckError> {
    let Some(object) = capture.as_object() else {
        return Err(CheckError::UnrecognizedSchemaShape);
    };
    if let Some(errors) = object.get("errors") {
        return Err(CheckError::MalformedSchema {
            errors: errors.clone(),
        });
    }
    object
        .get("data")
        .ok_or(CheckError::UnrecognizedSchemaShape)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn errors_take_precedence_over_data() {
        let capture = json!({ "data": {}, "errors": [{ "message": "denied" }] });
        let err = classify_capture(&capture).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedSchema);
    }

    #[test]
    fn captures_without_data_or_errors_are_unrecognized() {
        for capture in [json!({ "schema": {} }), json!([1, 2]), json!("text")] {
            assert_eq!(
                classify_capture(&capture).unwrap_err().kind(),
                ErrorKind::UnrecognizedSchemaShape
            );
        }
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let source = SchemaSource::Introspection("{ not json".to_string());
        assert_eq!(
            load_schema(&source).unwrap_err().kind(),
            ErrorKind::SchemaParseError
        );
    }

    #[test]
    fn data_without_schema_is_a_parse_error() {
        let source = SchemaSource::Introspection(r#"{"data": {"other": 1}}"#.to_string());
        assert_eq!(
            load_schema(&source).unwrap_err().kind(),
            ErrorKind::SchemaParseError
        );
    }

    #[test]
    fn sdl_sources_build_sdl_artifacts() {
        let source = SchemaSource::Sdl("type Query { a: Int }".to_string());
        let artifact = load_schema(&source).unwrap();
        assert_eq!(artifact.origin(), SchemaOrigin::Sdl);
    }
}
