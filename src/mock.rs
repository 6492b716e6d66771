//! Placeholder resolvers for schemas that have no backing data source.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::FieldValue;
use async_graphql::{Name, Value as ConstValue};
use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::engine::{Resolution, SchemaArtifact};
use crate::error::CheckError;
use crate::model::{SchemaModel, TypeDef, TypeRef};

pub const MOCK_STRING: &str = "Hello World";
pub const MOCK_INT: i64 = 42;
pub const MOCK_FLOAT: f64 = 4.2;
pub const MOCK_ID: &str = "00000000-0000-4000-8000-000000000000";
pub const DEFAULT_LIST_LENGTH: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct MockOptions {
    pub enabled: bool,
    /// Scalar name to placeholder value, overriding the built-in placeholders.
    pub scalars: IndexMap<String, serde_json::Value>,
    pub list_length: usize,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            scalars: IndexMap::new(),
            list_length: DEFAULT_LIST_LENGTH,
        }
    }
}

impl MockOptions {
    /// Parses `{"ScalarName": <json value>, ...}`.
    pub fn parse_scalar_overrides(
        text: &str,
    ) -> Result<IndexMap<String, serde_json::Value>, CheckError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| CheckError::Config(format!("mock scalar overrides are not JSON: {e}")))?;
        match value {
            serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(CheckError::Config(format!(
                "mock scalar overrides must be a JSON object, got {other}"
            ))),
        }
    }
}

/// Returns a new artifact whose fields all resolve to placeholders.
///
/// `artifact` is left untouched and keeps its own resolvers.
pub fn decorate(
    artifact: &SchemaArtifact,
    options: &MockOptions,
) -> Result<SchemaArtifact, CheckError> {
    let plan = MockPlan::new(artifact.shared_model(), options)?;
    debug!(
        list_length = plan.list_length,
        overrides = plan.scalars.len(),
        "decorating schema with mocks"
    );
    artifact.with_resolution(Resolution::Mock(Arc::new(plan)))
}

/// Opaque parent value for mocked objects; child fields are mocked on demand.
#[derive(Debug)]
struct MockRecord;

pub(crate) struct MockPlan {
    model: Arc<SchemaModel>,
    scalars: HashMap<String, ConstValue>,
    list_length: usize,
}

impl MockPlan {
    fn new(model: Arc<SchemaModel>, options: &MockOptions) -> Result<Self, CheckError> {
        let mut scalars = HashMap::new();
        for (name, value) in &options.scalars {
            check_override(&model, name, value)?;
            let value = ConstValue::from_json(value.clone())
                .map_err(|e| CheckError::Config(format!("mock value for {name}: {e}")))?;
            scalars.insert(name.clone(), value);
        }

        for ty in model.types.values() {
            if let TypeDef::Interface(_) | TypeDef::Union(_) = ty
                && model.possible_types(ty.name()).is_empty()
            {
                warn!(
                    name = ty.name(),
                    "no object type implements this {}; its fields cannot be mocked",
                    ty.kind()
                );
            }
        }

        Ok(Self {
            model,
            scalars,
            list_length: options.list_length,
        })
    }

    pub(crate) fn value_for<'a>(
        &self,
        ty: &TypeRef,
    ) -> async_graphql::Result<Option<FieldValue<'a>>> {
        match ty {
            TypeRef::NonNull(inner) => self.value_for(inner),
            TypeRef::List(inner) => {
                let items = (0..self.list_length)
                    .map(|_| {
                        Ok(self
                            .value_for(inner)?
                            .unwrap_or_else(|| FieldValue::value(ConstValue::Null)))
                    })
                    .collect::<async_graphql::Result<Vec<_>>>()?;
                Ok(Some(FieldValue::list(items)))
            }
            TypeRef::Named(name) => self.named_value(name),
        }
    }

    fn named_value<'a>(&self, name: &str) -> async_graphql::Result<Option<FieldValue<'a>>> {
        if let Some(value) = self.scalars.get(name) {
            return Ok(Some(FieldValue::value(value.clone())));
        }
        Ok(match self.model.get(name) {
            None => builtin_placeholder(name).map(FieldValue::value),
            Some(TypeDef::Scalar(_)) => {
                Some(FieldValue::value(ConstValue::String(MOCK_STRING.to_string())))
            }
            Some(TypeDef::Enum(e)) => e
                .values
                .keys()
                .next()
                .map(|v| FieldValue::value(ConstValue::Enum(Name::new(v)))),
            Some(TypeDef::Object(_)) => Some(FieldValue::owned_any(MockRecord)),
            Some(TypeDef::Interface(_) | TypeDef::Union(_)) => {
                let Some(concrete) = self.model.possible_types(name).first().copied() else {
                    return Err(async_graphql::Error::new(format!(
                        "cannot mock {name}: no object type implements it"
                    )));
                };
                Some(FieldValue::owned_any(MockRecord).with_type(concrete.to_string()))
            }
            Some(TypeDef::InputObject(_)) => None,
        })
    }
}

/// Overrides must name a scalar, and built-in scalars keep their JSON kind.
fn check_override(
    model: &SchemaModel,
    name: &str,
    value: &serde_json::Value,
) -> Result<(), CheckError> {
    let fits = match name {
        "Int" => value.as_i64().is_some_and(|n| i32::try_from(n).is_ok()),
        "Float" => value.is_number(),
        "String" => value.is_string(),
        "Boolean" => value.is_boolean(),
        "ID" => value.is_string() || value.is_i64() || value.is_u64(),
        _ => match model.get(name) {
            Some(TypeDef::Scalar(_)) => true,
            Some(other) => {
                return Err(CheckError::Config(format!(
                    "mock override for {name}: only scalars can be overridden, found `{} {name}`",
                    other.kind()
                )));
            }
            None => {
                debug!(scalar = name, "mock override names a type this schema does not use");
                true
            }
        },
    };
    if fits {
        Ok(())
    } else {
        Err(CheckError::Config(format!(
            "mock override for {name} does not fit the scalar: {value}"
        )))
    }
}

fn builtin_placeholder(name: &str) -> Option<ConstValue> {
    match name {
        "Int" => Some(ConstValue::from(MOCK_INT)),
        "Float" => serde_json::Number::from_f64(MOCK_FLOAT).map(ConstValue::Number),
        "String" => Some(ConstValue::String(MOCK_STRING.to_string())),
        "Boolean" => Some(ConstValue::Boolean(true)),
        "ID" => Some(ConstValue::String(MOCK_ID.to_string())),
        _ => None,
    }
}
