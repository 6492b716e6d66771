//! Schema definition language: parsing into a [`SchemaModel`] and rendering one back.

use graphql_parser::schema::{
    Definition, Directive, Document, EnumValue, Field, InputValue, Type, TypeDefinition,
    TypeExtension, Value,
};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::error::CheckError;
use crate::literal::to_const_value;
use crate::model::{
    Deprecation, EnumDef, EnumValueDef, FieldDef, InputObjectDef, InputValueDef, ObjectDef,
    ScalarDef, SchemaModel, TypeDef, TypeRef, UnionDef, is_builtin_scalar,
};

const DEFAULT_DEPRECATION_REASON: &str = "No longer supported";

pub fn parse_sdl(text: &str) -> Result<SchemaModel, CheckError> {
    let doc: Document<String> = graphql_parser::parse_schema(text)
        .map_err(|e| CheckError::SchemaParse(format!("SDL syntax error: {e}")))?;

    let mut roots = (None, None, None);
    let mut types: IndexMap<String, TypeDef> = IndexMap::new();
    let mut extensions = Vec::new();

    for def in &doc.definitions {
        match def {
            Definition::SchemaDefinition(schema) => {
                roots = (
                    schema.query.clone(),
                    schema.mutation.clone(),
                    schema.subscription.clone(),
                );
            }
            Definition::TypeDefinition(ty) => {
                let converted = convert_type_definition(ty)?;
                let name = converted.name().to_string();
                if is_builtin_scalar(&name) {
                    debug!(%name, "skipping redeclared built-in scalar");
                    continue;
                }
                if types.insert(name.clone(), converted).is_some() {
                    return Err(CheckError::SchemaParse(format!(
                        "type {name} is defined more than once"
                    )));
                }
            }
            Definition::TypeExtension(ext) => extensions.push(ext),
            Definition::DirectiveDefinition(directive) => {
                warn!(name = %directive.name, "ignoring directive definition");
            }
        }
    }

    for ext in extensions {
        apply_extension(&mut types, ext)?;
    }

    let (query, mutation, subscription) = roots;
    let query_type = query.unwrap_or_else(|| "Query".to_string());
    let mutation_type = mutation.or_else(|| {
        types
            .contains_key("Mutation")
            .then(|| "Mutation".to_string())
    });
    let subscription_type = subscription.or_else(|| {
        types
            .contains_key("Subscription")
            .then(|| "Subscription".to_string())
    });

    let model = SchemaModel {
        query_type,
        mutation_type,
        subscription_type,
        types,
    };
    model.check_roots().map_err(CheckError::SchemaParse)?;
    debug!(types = model.types.len(), "parsed SDL schema");
    Ok(model)
}

fn convert_type_definition(ty: &TypeDefinition<String>) -> Result<TypeDef, CheckError> {
    Ok(match ty {
        TypeDefinition::Scalar(s) => TypeDef::Scalar(ScalarDef {
            name: s.name.clone(),
            description: s.description.clone(),
        }),
        TypeDefinition::Object(o) => TypeDef::Object(ObjectDef {
            name: o.name.clone(),
            description: o.description.clone(),
            interfaces: o.implements_interfaces.iter().cloned().collect(),
            fields: convert_fields(&o.name, &o.fields)?,
        }),
        TypeDefinition::Interface(i) => TypeDef::Interface(ObjectDef {
            name: i.name.clone(),
            description: i.description.clone(),
            interfaces: i.implements_interfaces.iter().cloned().collect(),
            fields: convert_fields(&i.name, &i.fields)?,
        }),
        TypeDefinition::Union(u) => TypeDef::Union(UnionDef {
            name: u.name.clone(),
            description: u.description.clone(),
            members: u.types.iter().cloned().collect(),
        }),
        TypeDefinition::Enum(e) => TypeDef::Enum(EnumDef {
            name: e.name.clone(),
            description: e.description.clone(),
            values: convert_enum_values(&e.values),
        }),
        TypeDefinition::InputObject(i) => TypeDef::InputObject(InputObjectDef {
            name: i.name.clone(),
            description: i.description.clone(),
            fields: convert_input_values(&i.name, &i.fields)?,
        }),
    })
}

fn apply_extension(
    types: &mut IndexMap<String, TypeDef>,
    ext: &TypeExtension<String>,
) -> Result<(), CheckError> {
    let name = match ext {
        TypeExtension::Scalar(s) => &s.name,
        TypeExtension::Object(o) => &o.name,
        TypeExtension::Interface(i) => &i.name,
        TypeExtension::Union(u) => &u.name,
        TypeExtension::Enum(e) => &e.name,
        TypeExtension::InputObject(i) => &i.name,
    };
    let target = types.get_mut(name).ok_or_else(|| {
        CheckError::SchemaParse(format!("cannot extend undefined type {name}"))
    })?;

    match (target, ext) {
        (TypeDef::Scalar(_), TypeExtension::Scalar(_)) => {}
        (TypeDef::Object(o), TypeExtension::Object(e)) => {
            o.interfaces.extend(e.implements_interfaces.iter().cloned());
            merge_fields(&mut o.fields, convert_fields(name, &e.fields)?, name)?;
        }
        (TypeDef::Interface(i), TypeExtension::Interface(e)) => {
            merge_fields(&mut i.fields, convert_fields(name, &e.fields)?, name)?;
        }
        (TypeDef::Union(u), TypeExtension::Union(e)) => {
            u.members.extend(e.types.iter().cloned());
        }
        (TypeDef::Enum(en), TypeExtension::Enum(e)) => {
            merge_fields(&mut en.values, convert_enum_values(&e.values), name)?;
        }
        (TypeDef::InputObject(i), TypeExtension::InputObject(e)) => {
            merge_fields(&mut i.fields, convert_input_values(name, &e.fields)?, name)?;
        }
        (target, _) => {
            return Err(CheckError::SchemaParse(format!(
                "extension of {name} does not match its kind ({})",
                target.kind()
            )));
        }
    }
    Ok(())
}

fn merge_fields<V>(
    into: &mut IndexMap<String, V>,
    from: IndexMap<String, V>,
    owner: &str,
) -> Result<(), CheckError> {
    for (key, value) in from {
        if into.contains_key(&key) {
            return Err(CheckError::SchemaParse(format!(
                "{owner}.{key} is defined more than once"
            )));
        }
        into.insert(key, value);
    }
    Ok(())
}

fn convert_fields(
    owner: &str,
    fields: &[Field<String>],
) -> Result<IndexMap<String, FieldDef>, CheckError> {
    let mut out = IndexMap::new();
    for field in fields {
        let def = FieldDef {
            name: field.name.clone(),
            description: field.description.clone(),
            args: convert_input_values(&format!("{owner}.{}", field.name), &field.arguments)?,
            ty: type_ref_from_sdl_type(&field.field_type),
            deprecation: deprecation_from_directives(&field.directives),
        };
        out.insert(field.name.clone(), def);
    }
    Ok(out)
}

fn convert_input_values(
    owner: &str,
    values: &[InputValue<String>],
) -> Result<IndexMap<String, InputValueDef>, CheckError> {
    let mut out = IndexMap::new();
    for v in values {
        let default_value = v
            .default_value
            .as_ref()
            .map(to_const_value)
            .transpose()
            .map_err(|e| {
                CheckError::SchemaParse(format!("bad default for {owner}({}): {e}", v.name))
            })?;
        out.insert(
            v.name.clone(),
            InputValueDef {
                name: v.name.clone(),
                description: v.description.clone(),
                ty: type_ref_from_sdl_type(&v.value_type),
                default_value,
            },
        );
    }
    Ok(out)
}

fn convert_enum_values(values: &[EnumValue<String>]) -> IndexMap<String, EnumValueDef> {
    values
        .iter()
        .map(|v| {
            (
                v.name.clone(),
                EnumValueDef {
                    name: v.name.clone(),
                    description: v.description.clone(),
                    deprecation: deprecation_from_directives(&v.directives),
                },
            )
        })
        .collect()
}

fn deprecation_from_directives(directives: &[Directive<String>]) -> Deprecation {
    let Some(directive) = directives.iter().find(|d| d.name == "deprecated") else {
        return Deprecation::Active;
    };
    let reason = directive
        .arguments
        .iter()
        .find(|(name, _)| name == "reason")
        .and_then(|(_, v)| match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_DEPRECATION_REASON.to_string());
    Deprecation::Deprecated {
        reason: Some(reason),
    }
}

fn type_ref_from_sdl_type(ty: &Type<String>) -> TypeRef {
    match ty {
        Type::NamedType(n) => TypeRef::Named(n.clone()),
        Type::ListType(inner) => TypeRef::List(Box::new(type_ref_from_sdl_type(inner))),
        Type::NonNullType(inner) => TypeRef::NonNull(Box::new(type_ref_from_sdl_type(inner))),
    }
}

pub fn render_sdl(model: &SchemaModel) -> String {
    let mut out = String::new();

    let mut roots = format!("schema {{ query: {}", model.query_type);
    if let Some(m) = &model.mutation_type {
        roots.push_str(&format!(" mutation: {m}"));
    }
    if let Some(s) = &model.subscription_type {
        roots.push_str(&format!(" subscription: {s}"));
    }
    roots.push_str(" }\n\n");
    out.push_str(&roots);

    for ty in model.types.values() {
        render_description(&mut out, "", ty_description(ty));
        match ty {
            TypeDef::Scalar(s) => out.push_str(&format!("scalar {}\n\n", s.name)),
            TypeDef::Object(o) | TypeDef::Interface(o) => {
                out.push_str(&format!("{} {}", ty.kind(), o.name));
                if !o.interfaces.is_empty() {
                    let list = o.interfaces.iter().cloned().collect::<Vec<_>>().join(" & ");
                    out.push_str(&format!(" implements {list}"));
                }
                out.push_str(" {\n");
                for field in o.fields.values() {
                    render_description(&mut out, "  ", field.description.as_deref());
                    out.push_str(&format!(
                        "  {}{}: {}{}\n",
                        field.name,
                        render_args(&field.args),
                        field.ty,
                        render_deprecation(&field.deprecation)
                    ));
                }
                out.push_str("}\n\n");
            }
            TypeDef::Union(u) => {
                let rhs = u.members.iter().cloned().collect::<Vec<_>>().join(" | ");
                out.push_str(&format!("union {} = {rhs}\n\n", u.name));
            }
            TypeDef::Enum(e) => {
                out.push_str(&format!("enum {} {{\n", e.name));
                for value in e.values.values() {
                    render_description(&mut out, "  ", value.description.as_deref());
                    out.push_str(&format!(
                        "  {}{}\n",
                        value.name,
                        render_deprecation(&value.deprecation)
                    ));
                }
                out.push_str("}\n\n");
            }
            TypeDef::InputObject(i) => {
                out.push_str(&format!("input {} {{\n", i.name));
                for field in i.fields.values() {
                    render_description(&mut out, "  ", field.description.as_deref());
                    out.push_str(&format!("  {}\n", render_input_value(field)));
                }
                out.push_str("}\n\n");
            }
        }
    }

    out.truncate(out.trim_end().len());
    out.push('\n');
    out
}

fn ty_description(ty: &TypeDef) -> Option<&str> {
    match ty {
        TypeDef::Scalar(s) => s.description.as_deref(),
        TypeDef::Object(o) | TypeDef::Interface(o) => o.description.as_deref(),
        TypeDef::Union(u) => u.description.as_deref(),
        TypeDef::Enum(e) => e.description.as_deref(),
        TypeDef::InputObject(i) => i.description.as_deref(),
    }
}

fn render_description(out: &mut String, indent: &str, description: Option<&str>) {
    let Some(text) = description else {
        return;
    };
    let escaped = text.replace("\"\"\"", "\\\"\"\"");
    out.push_str(&format!("{indent}\"\"\"\n"));
    for line in escaped.lines() {
        out.push_str(&format!("{indent}{line}\n"));
    }
    out.push_str(&format!("{indent}\"\"\"\n"));
}

fn render_args(args: &IndexMap<String, InputValueDef>) -> String {
    if args.is_empty() {
        return String::new();
    }
    let parts = args
        .values()
        .map(render_input_value)
        .collect::<Vec<_>>()
        .join(", ");
    format!("({parts})")
}

fn render_input_value(v: &InputValueDef) -> String {
    match &v.default_value {
        Some(default) => format!("{}: {} = {default}", v.name, v.ty),
        None => format!("{}: {}", v.name, v.ty),
    }
}

fn render_deprecation(deprecation: &Deprecation) -> String {
    match deprecation {
        Deprecation::Active => String::new(),
        Deprecation::Deprecated { reason: None } => " @deprecated".to_string(),
        Deprecation::Deprecated {
            reason: Some(reason),
        } => {
            let quoted = serde_json::to_string(reason).unwrap_or_else(|_| "\"\"".to_string());
            format!(" @deprecated(reason: {quoted})")
        }
    }
}

/// Names referenced by the model that no type definition provides.
pub fn undefined_references(model: &SchemaModel) -> IndexSet<String> {
    let mut missing = IndexSet::new();
    let mut check = |name: &str| {
        if !is_builtin_scalar(name) && !model.types.contains_key(name) {
            missing.insert(name.to_string());
        }
    };
    for ty in model.types.values() {
        match ty {
            TypeDef::Object(o) | TypeDef::Interface(o) => {
                o.interfaces.iter().for_each(|i| check(i));
                for field in o.fields.values() {
                    check(field.ty.base_name());
                    field.args.values().for_each(|a| check(a.ty.base_name()));
                }
            }
            TypeDef::Union(u) => u.members.iter().for_each(|m| check(m)),
            TypeDef::InputObject(i) => i.fields.values().for_each(|f| check(f.ty.base_name())),
            TypeDef::Scalar(_) | TypeDef::Enum(_) => {}
        }
    }
    missing
}
