//! Introspection captures (`{"data": {"__schema": ...}}`) as a [`SchemaModel`].

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::CheckError;
use crate::literal::parse_literal;
use crate::model::{
    Deprecation, EnumDef, EnumValueDef, FieldDef, InputObjectDef, InputValueDef, ObjectDef,
    ScalarDef, SchemaModel, TypeDef, TypeRef, UnionDef, is_builtin_scalar,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
    List,
    NonNull,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionData {
    #[serde(rename = "__schema")]
    pub schema: IntrospectionSchema,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionSchema {
    pub query_type: NamedTypeRef,
    pub mutation_type: Option<NamedTypeRef>,
    pub subscription_type: Option<NamedTypeRef>,
    pub types: Vec<FullType>,
}

#[derive(Debug, Deserialize)]
pub struct NamedTypeRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullType {
    pub kind: TypeKind,
    pub name: String,
    pub description: Option<String>,
    pub fields: Option<Vec<IntrospectionField>>,
    pub input_fields: Option<Vec<IntrospectionInputValue>>,
    pub interfaces: Option<Vec<IntrospectionTypeRef>>,
    pub enum_values: Option<Vec<IntrospectionEnumValue>>,
    pub possible_types: Option<Vec<IntrospectionTypeRef>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionField {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<IntrospectionInputValue>,
    #[serde(rename = "type")]
    pub ty: IntrospectionTypeRef,
    #[serde(default)]
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionInputValue {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub ty: IntrospectionTypeRef,
    pub default_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionEnumValue {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_deprecated: bool,
    pub deprecation_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionTypeRef {
    pub kind: TypeKind,
    pub name: Option<String>,
    pub of_type: Option<Box<IntrospectionTypeRef>>,
}

/// Rebuilds a schema model from the `data` member of a capture.
pub fn model_from_data(data: &Value) -> Result<SchemaModel, CheckError> {
    let data = IntrospectionData::deserialize(data)
        .map_err(|e| CheckError::SchemaParse(format!("invalid introspection data: {e}")))?;
    let schema = data.schema;

    let mut types = IndexMap::new();
    for full in &schema.types {
        if full.name.starts_with("__") || is_builtin_scalar(&full.name) {
            continue;
        }
        let def = convert_full_type(full)?;
        types.insert(full.name.clone(), def);
    }

    let model = SchemaModel {
        query_type: schema.query_type.name,
        mutation_type: schema.mutation_type.map(|t| t.name),
        subscription_type: schema.subscription_type.map(|t| t.name),
        types,
    };
    model.check_roots().map_err(CheckError::SchemaParse)?;
    debug!(types = model.types.len(), "rebuilt schema from introspection");
    Ok(model)
}

fn convert_full_type(full: &FullType) -> Result<TypeDef, CheckError> {
    let name = full.name.clone();
    let description = full.description.clone();
    Ok(match full.kind {
        TypeKind::Scalar => TypeDef::Scalar(ScalarDef { name, description }),
        TypeKind::Object | TypeKind::Interface => {
            let object = ObjectDef {
                interfaces: named_list(&name, full.interfaces.as_deref())?
                    .into_iter()
                    .collect(),
                fields: convert_fields(&name, required(&name, "fields", &full.fields)?)?,
                name,
                description,
            };
            if full.kind == TypeKind::Object {
                TypeDef::Object(object)
            } else {
                TypeDef::Interface(object)
            }
        }
        TypeKind::Union => TypeDef::Union(UnionDef {
            members: named_list(&name, full.possible_types.as_deref())?
                .into_iter()
                .collect(),
            name,
            description,
        }),
        TypeKind::Enum => TypeDef::Enum(EnumDef {
            values: required(&name, "enumValues", &full.enum_values)?
                .iter()
                .map(|v| {
                    (
                        v.name.clone(),
                        EnumValueDef {
                            name: v.name.clone(),
                            description: v.description.clone(),
                            deprecation: deprecation(v.is_deprecated, &v.deprecation_reason),
                        },
                    )
                })
                .collect(),
            name,
            description,
        }),
        TypeKind::InputObject => TypeDef::InputObject(InputObjectDef {
            fields: convert_input_values(
                &name,
                required(&name, "inputFields", &full.input_fields)?,
            )?,
            name,
            description,
        }),
        TypeKind::List | TypeKind::NonNull => {
            return Err(CheckError::SchemaParse(format!(
                "type {name} has wrapper kind {:?} at top level",
                full.kind
            )));
        }
    })
}

fn required<'a, T>(
    owner: &str,
    member: &str,
    value: &'a Option<Vec<T>>,
) -> Result<&'a [T], CheckError> {
    value
        .as_deref()
        .ok_or_else(|| CheckError::SchemaParse(format!("type {owner} is missing {member}")))
}

fn named_list(
    owner: &str,
    refs: Option<&[IntrospectionTypeRef]>,
) -> Result<Vec<String>, CheckError> {
    refs.unwrap_or_default()
        .iter()
        .map(|r| {
            r.name.clone().ok_or_else(|| {
                CheckError::SchemaParse(format!("type {owner} references an unnamed type"))
            })
        })
        .collect()
}

fn convert_fields(
    owner: &str,
    fields: &[IntrospectionField],
) -> Result<IndexMap<String, FieldDef>, CheckError> {
    let mut out = IndexMap::new();
    for field in fields.iter().filter(|f| !f.name.starts_with("__")) {
        let def = FieldDef {
            name: field.name.clone(),
            description: field.description.clone(),
            args: convert_input_values(&format!("{owner}.{}", field.name), &field.args)?,
            ty: type_ref_from_introspection(&field.ty)?,
            deprecation: deprecation(field.is_deprecated, &field.deprecation_reason),
        };
        out.insert(field.name.clone(), def);
    }
    Ok(out)
}

fn convert_input_values(
    owner: &str,
    values: &[IntrospectionInputValue],
) -> Result<IndexMap<String, InputValueDef>, CheckError> {
    let mut out = IndexMap::new();
    for v in values {
        let default_value = v
            .default_value
            .as_deref()
            .map(parse_literal)
            .transpose()
            .map_err(|e| {
                CheckError::SchemaParse(format!("bad default for {owner}({}): {e}", v.name))
            })?;
        out.insert(
            v.name.clone(),
            InputValueDef {
                name: v.name.clone(),
                description: v.description.clone(),
                ty: type_ref_from_introspection(&v.ty)?,
                default_value,
            },
        );
    }
    Ok(out)
}

fn deprecation(is_deprecated: bool, reason: &Option<String>) -> Deprecation {
    if is_deprecated {
        Deprecation::Deprecated {
            reason: reason.clone(),
        }
    } else {
        Deprecation::Active
    }
}

fn type_ref_from_introspection(ty: &IntrospectionTypeRef) -> Result<TypeRef, CheckError> {
    let inner = || {
        ty.of_type.as_deref().ok_or_else(|| {
            CheckError::SchemaParse(format!("{:?} type reference is missing ofType", ty.kind))
        })
    };
    Ok(match ty.kind {
        TypeKind::NonNull => TypeRef::NonNull(Box::new(type_ref_from_introspection(inner()?)?)),
        TypeKind::List => TypeRef::List(Box::new(type_ref_from_introspection(inner()?)?)),
        _ => TypeRef::Named(ty.name.clone().ok_or_else(|| {
            CheckError::SchemaParse("named type reference is missing its name".to_string())
        })?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn named(kind: &str, name: &str) -> Value {
        json!({ "kind": kind, "name": name, "ofType": null })
    }

    fn author_data() -> Value {
        json!({
            "__schema": {
                "queryType": { "name": "Query" },
                "mutationType": null,
                "subscriptionType": null,
                "types": [
                    {
                        "kind": "OBJECT", "name": "Query", "description": null,
                        "fields": [{
                            "name": "author", "description": null,
                            "args": [{
                                "name": "id", "description": null, "defaultValue": null,
                                "type": { "kind": "NON_NULL", "name": null, "ofType": named("SCALAR", "Int") }
                            }],
                            "type": named("OBJECT", "Author"),
                            "isDeprecated": false, "deprecationReason": null
                        }],
                        "inputFields": null, "interfaces": [], "enumValues": null, "possibleTypes": null
                    },
                    {
                        "kind": "OBJECT", "name": "Author", "description": null,
                        "fields": [{
                            "name": "firstName", "description": null, "args": [],
                            "type": named("SCALAR", "String"),
                            "isDeprecated": false, "deprecationReason": null
                        }],
                        "inputFields": null, "interfaces": [], "enumValues": null, "possibleTypes": null
                    },
                    { "kind": "SCALAR", "name": "Int", "description": null },
                    { "kind": "SCALAR", "name": "String", "description": null },
                    {
                        "kind": "OBJECT", "name": "__Type", "description": null,
                        "fields": [], "interfaces": []
                    }
                ]
            }
        })
    }

    #[test]
    fn rebuilds_author_schema() {
        let model = model_from_data(&author_data()).unwrap();
        assert_eq!(model.query_type, "Query");
        assert_eq!(model.types.keys().collect::<Vec<_>>(), vec!["Query", "Author"]);

        let Some(TypeDef::Object(query)) = model.get("Query") else {
            panic!("Query should be an object type");
        };
        assert_eq!(
            query.fields["author"].args["id"].ty,
            TypeRef::non_null(TypeRef::named("Int"))
        );
    }

    #[test]
    fn parses_default_value_literals() {
        let mut data = author_data();
        data["__schema"]["types"][0]["fields"][0]["args"][0]["defaultValue"] = json!("7");
        let model = model_from_data(&data).unwrap();
        let Some(TypeDef::Object(query)) = model.get("Query") else {
            panic!("Query should be an object type");
        };
        assert_eq!(
            query.fields["author"].args["id"].default_value,
            Some(async_graphql::Value::from(7))
        );
    }

    #[test]
    fn rejects_structurally_invalid_payloads() {
        assert!(matches!(
            model_from_data(&json!({ "nope": true })),
            Err(CheckError::SchemaParse(_))
        ));

        let mut dangling = author_data();
        dangling["__schema"]["types"][0]["fields"][0]["type"] =
            json!({ "kind": "NON_NULL", "name": null, "ofType": null });
        assert!(matches!(
            model_from_data(&dangling),
            Err(CheckError::SchemaParse(_))
        ));

        let mut missing_root = author_data();
        missing_root["__schema"]["queryType"]["name"] = json!("Root");
        assert!(matches!(
            model_from_data(&missing_root),
            Err(CheckError::SchemaParse(_))
        ));
    }
}
