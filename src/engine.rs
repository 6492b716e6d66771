//! Executable schemas built from a [`SchemaModel`] with the `async-graphql` dynamic API.

use std::fmt;
use std::sync::Arc;

use async_graphql::dynamic::{
    self, Enum, EnumItem, Field, FieldFuture, FieldValue, InputObject, InputValue, Interface,
    InterfaceField, Object, Scalar, Subscription, SubscriptionField, SubscriptionFieldFuture,
    Union,
};
use futures::stream;
use tracing::{debug, warn};

use crate::error::CheckError;
use crate::mock::MockPlan;
use crate::model::{
    Deprecation, EnumDef, FieldDef, InputObjectDef, InputValueDef, ObjectDef, ScalarDef,
    SchemaModel, TypeDef, TypeRef, UnionDef,
};
use crate::sdl::undefined_references;

/// Where the schema description came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaOrigin {
    Sdl,
    Introspection,
}

/// How every field of the executable schema produces its value.
#[derive(Clone)]
pub(crate) enum Resolution {
    /// No resolvers: every field resolves to `null`.
    Null,
    Mock(Arc<MockPlan>),
}

impl Resolution {
    fn resolve<'a>(&self, ty: &TypeRef) -> async_graphql::Result<Option<FieldValue<'a>>> {
        match self {
            Resolution::Null => Ok(None),
            Resolution::Mock(plan) => plan.value_for(ty),
        }
    }
}

/// An in-memory executable schema plus the model it was built from.
///
/// Artifacts are immutable; decorating one with mocks produces a new artifact that shares
/// the model but not the executable schema.
#[derive(Clone)]
pub struct SchemaArtifact {
    model: Arc<SchemaModel>,
    origin: SchemaOrigin,
    mocked: bool,
    schema: dynamic::Schema,
}

impl SchemaArtifact {
    pub fn build(model: SchemaModel, origin: SchemaOrigin) -> Result<Self, CheckError> {
        let model = Arc::new(model);
        let schema = build_schema(&model, &Resolution::Null)?;
        Ok(Self {
            model,
            origin,
            mocked: false,
            schema,
        })
    }

    pub(crate) fn with_resolution(&self, resolution: Resolution) -> Result<Self, CheckError> {
        let schema = build_schema(&self.model, &resolution)?;
        Ok(Self {
            model: Arc::clone(&self.model),
            origin: self.origin,
            mocked: matches!(resolution, Resolution::Mock(_)),
            schema,
        })
    }

    pub fn model(&self) -> &SchemaModel {
        &self.model
    }

    pub(crate) fn shared_model(&self) -> Arc<SchemaModel> {
        Arc::clone(&self.model)
    }

    pub fn origin(&self) -> SchemaOrigin {
        self.origin
    }

    pub fn is_mocked(&self) -> bool {
        self.mocked
    }

    pub fn executable(&self) -> &dynamic::Schema {
        &self.schema
    }
}

impl fmt::Debug for SchemaArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaArtifact")
            .field("query_type", &self.model.query_type)
            .field("types", &self.model.types.len())
            .field("origin", &self.origin)
            .field("mocked", &self.mocked)
            .finish()
    }
}

fn build_schema(
    model: &SchemaModel,
    resolution: &Resolution,
) -> Result<dynamic::Schema, CheckError> {
    let missing = undefined_references(model);
    if !missing.is_empty() {
        let names = missing.into_iter().collect::<Vec<_>>().join(", ");
        return Err(CheckError::SchemaParse(format!(
            "schema references undefined types: {names}"
        )));
    }
    if let Some(subscription) = &model.subscription_type {
        debug!(%subscription, "subscription root is kept for introspection only");
    }

    let mut builder = dynamic::Schema::build(
        &model.query_type,
        model.mutation_type.as_deref(),
        model.subscription_type.as_deref(),
    );
    for ty in model.types.values() {
        builder = match ty {
            TypeDef::Scalar(s) => builder.register(scalar(s)),
            TypeDef::Object(o) if model.subscription_type.as_deref() == Some(o.name.as_str()) => {
                builder.register(subscription(o, resolution))
            }
            TypeDef::Object(o) => builder.register(object(o, resolution)),
            TypeDef::Interface(i) => builder.register(interface(i)),
            TypeDef::Union(u) => builder.register(union(u)),
            TypeDef::Enum(e) => builder.register(enumeration(e)),
            TypeDef::InputObject(i) => builder.register(input_object(i)),
        };
    }

    let schema = builder
        .finish()
        .map_err(|e| CheckError::SchemaParse(e.to_string()))?;
    debug!(types = model.types.len(), "built executable schema");
    Ok(schema)
}

fn engine_type_ref(ty: &TypeRef) -> dynamic::TypeRef {
    match ty {
        TypeRef::Named(n) => dynamic::TypeRef::named(n.clone()),
        TypeRef::List(inner) => dynamic::TypeRef::List(Box::new(engine_type_ref(inner))),
        TypeRef::NonNull(inner) => dynamic::TypeRef::NonNull(Box::new(engine_type_ref(inner))),
    }
}

fn scalar(def: &ScalarDef) -> Scalar {
    let mut scalar = Scalar::new(&def.name);
    if let Some(d) = &def.description {
        scalar = scalar.description(d);
    }
    scalar
}

fn object(def: &ObjectDef, resolution: &Resolution) -> Object {
    let mut object = Object::new(&def.name);
    if let Some(d) = &def.description {
        object = object.description(d);
    }
    for name in &def.interfaces {
        object = object.implement(name);
    }
    for field in def.fields.values() {
        object = object.field(resolved_field(field, resolution));
    }
    object
}

fn resolved_field(def: &FieldDef, resolution: &Resolution) -> Field {
    let resolution = resolution.clone();
    let ty = def.ty.clone();
    let mut field = Field::new(&def.name, engine_type_ref(&def.ty), move |_ctx| {
        let value = resolution.resolve(&ty);
        FieldFuture::new(async move { value })
    });
    if let Some(d) = &def.description {
        field = field.description(d);
    }
    if let Deprecation::Deprecated { reason } = &def.deprecation {
        field = field.deprecation(reason.as_deref());
    }
    for arg in def.args.values() {
        field = field.argument(input_value(arg));
    }
    field
}

/// Subscription fields yield at most one item, the field's resolved value.
fn subscription(def: &ObjectDef, resolution: &Resolution) -> Subscription {
    let mut subscription = Subscription::new(&def.name);
    if let Some(d) = &def.description {
        subscription = subscription.description(d);
    }
    if !def.interfaces.is_empty() {
        warn!(
            subscription = %def.name,
            "interfaces on the subscription root are not represented in the executable schema"
        );
    }
    for def in def.fields.values() {
        let resolution = resolution.clone();
        let ty = def.ty.clone();
        let mut field = SubscriptionField::new(&def.name, engine_type_ref(&def.ty), move |_ctx| {
            let value = resolution.resolve(&ty);
            SubscriptionFieldFuture::new(async move {
                let items = value?.into_iter().map(Ok::<_, async_graphql::Error>);
                Ok::<_, async_graphql::Error>(stream::iter(items))
            })
        });
        if let Some(d) = &def.description {
            field = field.description(d);
        }
        if let Deprecation::Deprecated { reason } = &def.deprecation {
            field = field.deprecation(reason.as_deref());
        }
        for arg in def.args.values() {
            field = field.argument(input_value(arg));
        }
        subscription = subscription.field(field);
    }
    subscription
}

fn interface(def: &ObjectDef) -> Interface {
    let mut interface = Interface::new(&def.name);
    if let Some(d) = &def.description {
        interface = interface.description(d);
    }
    for name in &def.interfaces {
        interface = interface.implement(name);
    }
    for def in def.fields.values() {
        let mut field = InterfaceField::new(&def.name, engine_type_ref(&def.ty));
        if let Some(d) = &def.description {
            field = field.description(d);
        }
        if let Deprecation::Deprecated { reason } = &def.deprecation {
            field = field.deprecation(reason.as_deref());
        }
        for arg in def.args.values() {
            field = field.argument(input_value(arg));
        }
        interface = interface.field(field);
    }
    interface
}

fn union(def: &UnionDef) -> Union {
    let mut union = Union::new(&def.name);
    if let Some(d) = &def.description {
        union = union.description(d);
    }
    for member in &def.members {
        union = union.possible_type(member);
    }
    union
}

fn enumeration(def: &EnumDef) -> Enum {
    let mut enumeration = Enum::new(&def.name);
    if let Some(d) = &def.description {
        enumeration = enumeration.description(d);
    }
    for value in def.values.values() {
        let mut item = EnumItem::new(&value.name);
        if let Some(d) = &value.description {
            item = item.description(d);
        }
        if let Deprecation::Deprecated { reason } = &value.deprecation {
            item = item.deprecation(reason.as_deref());
        }
        enumeration = enumeration.item(item);
    }
    enumeration
}

fn input_object(def: &InputObjectDef) -> InputObject {
    let mut input = InputObject::new(&def.name);
    if let Some(d) = &def.description {
        input = input.description(d);
    }
    for field in def.fields.values() {
        input = input.field(input_value(field));
    }
    input
}

fn input_value(def: &InputValueDef) -> InputValue {
    let mut value = InputValue::new(&def.name, engine_type_ref(&def.ty));
    if let Some(d) = &def.description {
        value = value.description(d);
    }
    if let Some(default) = &def.default_value {
        value = value.default_value(default.clone());
    }
    value
}
