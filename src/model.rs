//! Resolver-free description of a GraphQL schema.
//!
//! Both SDL documents and introspection captures are normalised into a [`SchemaModel`]
//! before an executable schema is built from it. Maps keep declaration order, but
//! equality between two models ignores it.

use std::fmt;

use async_graphql::Value as ConstValue;
use indexmap::{IndexMap, IndexSet};

pub const BUILTIN_SCALARS: &[&str] = &["String", "Int", "Float", "Boolean", "ID"];

pub fn is_builtin_scalar(name: &str) -> bool {
    BUILTIN_SCALARS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// The named type at the bottom of any list/non-null wrappers.
    pub fn base_name(&self) -> &str {
        match self {
            TypeRef::Named(n) => n,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(n) => write!(f, "{n}"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Deprecation {
    #[default]
    Active,
    Deprecated {
        reason: Option<String>,
    },
}

impl Deprecation {
    pub fn reason(&self) -> Option<&str> {
        match self {
            Deprecation::Active => None,
            Deprecation::Deprecated { reason } => reason.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<ConstValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub args: IndexMap<String, InputValueDef>,
    pub ty: TypeRef,
    pub deprecation: Deprecation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
    pub deprecation: Deprecation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub interfaces: IndexSet<String>,
    pub fields: IndexMap<String, FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDef {
    pub name: String,
    pub description: Option<String>,
    pub members: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: IndexMap<String, EnumValueDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, InputValueDef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
}

/// A named type definition. Interfaces share the object shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Scalar(ScalarDef),
    Object(ObjectDef),
    Interface(ObjectDef),
    Union(UnionDef),
    Enum(EnumDef),
    InputObject(InputObjectDef),
}

impl TypeDef {
    pub fn name(&self) -> &str {
        match self {
            TypeDef::Scalar(s) => &s.name,
            TypeDef::Object(o) | TypeDef::Interface(o) => &o.name,
            TypeDef::Union(u) => &u.name,
            TypeDef::Enum(e) => &e.name,
            TypeDef::InputObject(i) => &i.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TypeDef::Scalar(_) => "scalar",
            TypeDef::Object(_) => "type",
            TypeDef::Interface(_) => "interface",
            TypeDef::Union(_) => "union",
            TypeDef::Enum(_) => "enum",
            TypeDef::InputObject(_) => "input",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaModel {
    pub query_type: String,
    pub mutation_type: Option<String>,
    pub subscription_type: Option<String>,
    pub types: IndexMap<String, TypeDef>,
}

impl SchemaModel {
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Concrete object types a value of `name` may take at runtime, in declaration order.
    pub fn possible_types(&self, name: &str) -> Vec<&str> {
        match self.types.get(name) {
            Some(TypeDef::Object(o)) => vec![o.name.as_str()],
            Some(TypeDef::Union(u)) => u.members.iter().map(String::as_str).collect(),
            Some(TypeDef::Interface(_)) => self
                .types
                .values()
                .filter_map(|t| match t {
                    TypeDef::Object(o) if o.interfaces.contains(name) => Some(o.name.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Checks the root operation types exist and are object types.
    pub fn check_roots(&self) -> Result<(), String> {
        let roots = std::iter::once(("query", Some(&self.query_type)))
            .chain([
                ("mutation", self.mutation_type.as_ref()),
                ("subscription", self.subscription_type.as_ref()),
            ])
            .filter_map(|(op, name)| name.map(|n| (op, n)));

        for (op, name) in roots {
            match self.types.get(name) {
                Some(TypeDef::Object(_)) => {}
                Some(other) => {
                    return Err(format!(
                        "{op} root type {name} must be an object type, found {}",
                        other.kind()
                    ));
                }
                None => return Err(format!("{op} root type {name} is not defined")),
            }
        }
        Ok(())
    }
}
