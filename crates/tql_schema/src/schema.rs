//! Schema definition for tql.
//!
//! Types refer to each other by name, so recursive and mutually recursive
//! types need no special handling. A [`Schema`] is immutable once built.

use crate::resolver::{
    AsyncFnResolver, Context, FnResolver, Resolver, ResolverArgs, ResolverInfo, ResolverResult,
};
use crate::scalar;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tql_core::error::CoercionError;
use tql_core::Value;

/// Output coercion function of a scalar.
pub type SerializeFn = Arc<dyn Fn(&Value) -> Result<Value, CoercionError> + Send + Sync>;

/// Input coercion function of a scalar.
pub type ParseValueFn = Arc<dyn Fn(&Value) -> Result<Value, CoercionError> + Send + Sync>;

/// Maps a runtime value of an abstract type to the name of its object type.
pub type ResolveTypeFn = Arc<dyn Fn(&Value, &Context) -> Option<String> + Send + Sync>;

/// A GraphQL schema.
#[derive(Debug, Clone)]
pub struct Schema {
    query_type: String,
    mutation_type: Option<String>,
    types: IndexMap<String, TypeDef>,
    /// Interface name to the objects implementing it, in declaration order.
    implementations: IndexMap<String, Vec<String>>,
}

impl Schema {
    /// Returns a builder with the built-in scalars registered.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    /// Returns the name of the query root type.
    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    /// Returns the name of the mutation root type, if any.
    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    /// Gets a type by name.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Gets an object type by name.
    pub fn object(&self, name: &str) -> Option<&ObjectDef> {
        match self.types.get(name) {
            Some(TypeDef::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Returns the fields of an object or interface type.
    pub fn fields_of(&self, type_name: &str) -> Option<&IndexMap<String, FieldDef>> {
        self.types.get(type_name).and_then(TypeDef::fields)
    }

    /// Looks up a field of an object or interface type.
    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDef> {
        self.fields_of(type_name)?.get(field_name)
    }

    /// Returns the object types an abstract type can resolve to.
    ///
    /// For an object type this is the type itself.
    pub fn possible_types(&self, type_name: &str) -> Vec<&str> {
        match self.types.get(type_name) {
            Some(TypeDef::Object(object)) => vec![object.name.as_str()],
            Some(TypeDef::Union(union)) => union.members.iter().map(String::as_str).collect(),
            Some(TypeDef::Interface(_)) => self
                .implementations
                .get(type_name)
                .map(|objects| objects.iter().map(String::as_str).collect())
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Returns true if `object_name` is a member of the abstract type
    /// `abstract_name`, i.e. a selection on the abstract type may apply to it.
    pub fn is_possible_type(&self, abstract_name: &str, object_name: &str) -> bool {
        match self.types.get(abstract_name) {
            Some(TypeDef::Union(union)) => union.members.iter().any(|m| m == object_name),
            Some(TypeDef::Interface(_)) => self
                .implementations
                .get(abstract_name)
                .is_some_and(|objects| objects.iter().any(|o| o == object_name)),
            _ => false,
        }
    }

    /// Returns true if some object type is possible for both composite types.
    pub fn do_types_overlap(&self, a: &str, b: &str) -> bool {
        if a == b {
            return true;
        }
        let b_types = self.possible_types(b);
        self.possible_types(a).iter().any(|t| b_types.contains(t))
    }

    /// Returns true if a value of type `sub` may be used where `sup` is expected.
    pub fn is_type_sub_type_of(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        match (sub, sup) {
            (TypeRef::NonNull(sub), TypeRef::NonNull(sup)) => self.is_type_sub_type_of(sub, sup),
            (_, TypeRef::NonNull(_)) => false,
            (TypeRef::NonNull(sub), sup) => self.is_type_sub_type_of(sub, sup),
            (TypeRef::List(sub), TypeRef::List(sup)) => self.is_type_sub_type_of(sub, sup),
            (_, TypeRef::List(_)) | (TypeRef::List(_), _) => false,
            (TypeRef::Named(sub), TypeRef::Named(sup)) => {
                sub == sup || self.is_possible_type(sup, sub)
            }
        }
    }

    /// Returns true for scalar and enum types.
    pub fn is_leaf_type(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(TypeDef::is_leaf)
    }

    /// Returns true for object, interface and union types.
    pub fn is_composite_type(&self, name: &str) -> bool {
        self.types.get(name).is_some_and(TypeDef::is_composite)
    }

    /// Input types are the leaf types and wrappers around them.
    pub fn is_input_type(&self, ty: &TypeRef) -> bool {
        self.is_leaf_type(ty.named_type())
    }
}

/// A type definition.
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// A leaf type with custom coercion.
    Scalar(ScalarDef),
    /// A concrete type with fields.
    Object(ObjectDef),
    /// An abstract type with fields, implemented by objects.
    Interface(InterfaceDef),
    /// An abstract type over a set of objects.
    Union(UnionDef),
    /// A leaf type with a fixed set of values.
    Enum(EnumDef),
}

impl TypeDef {
    /// Returns the type name.
    pub fn name(&self) -> &str {
        match self {
            Self::Scalar(s) => &s.name,
            Self::Object(o) => &o.name,
            Self::Interface(i) => &i.name,
            Self::Union(u) => &u.name,
            Self::Enum(e) => &e.name,
        }
    }

    /// Returns the fields of object and interface types.
    pub fn fields(&self) -> Option<&IndexMap<String, FieldDef>> {
        match self {
            Self::Object(o) => Some(&o.fields),
            Self::Interface(i) => Some(&i.fields),
            _ => None,
        }
    }

    /// Returns true for scalar and enum types.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Scalar(_) | Self::Enum(_))
    }

    /// Returns true for types that take a selection set.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Interface(_) | Self::Union(_))
    }
}

impl From<ScalarDef> for TypeDef {
    fn from(def: ScalarDef) -> Self {
        Self::Scalar(def)
    }
}

impl From<ObjectDef> for TypeDef {
    fn from(def: ObjectDef) -> Self {
        Self::Object(def)
    }
}

impl From<InterfaceDef> for TypeDef {
    fn from(def: InterfaceDef) -> Self {
        Self::Interface(def)
    }
}

impl From<UnionDef> for TypeDef {
    fn from(def: UnionDef) -> Self {
        Self::Union(def)
    }
}

impl From<EnumDef> for TypeDef {
    fn from(def: EnumDef) -> Self {
        Self::Enum(def)
    }
}

/// Scalar type definition.
#[derive(Clone)]
pub struct ScalarDef {
    pub name: String,
    pub description: Option<String>,
    serialize: SerializeFn,
    parse_value: ParseValueFn,
}

impl ScalarDef {
    /// Creates a custom scalar that passes values through unchanged.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            serialize: Arc::new(|value| Ok(value.clone())),
            parse_value: Arc::new(|value| Ok(value.clone())),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the output coercion function.
    #[must_use]
    pub fn with_serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CoercionError> + Send + Sync + 'static,
    {
        self.serialize = Arc::new(f);
        self
    }

    /// Sets the input coercion function.
    #[must_use]
    pub fn with_parse_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CoercionError> + Send + Sync + 'static,
    {
        self.parse_value = Arc::new(f);
        self
    }

    /// Coerces a resolved value into this scalar's output representation.
    pub fn serialize(&self, value: &Value) -> Result<Value, CoercionError> {
        (self.serialize)(value)
    }

    /// Coerces an input value (variable or argument) into this scalar.
    pub fn parse_value(&self, value: &Value) -> Result<Value, CoercionError> {
        (self.parse_value)(value)
    }
}

impl fmt::Debug for ScalarDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarDef")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Object type definition.
#[derive(Debug, Clone)]
pub struct ObjectDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub implements: Vec<String>,
}

impl ObjectDef {
    /// Creates an object type without fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            implements: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Declares an implemented interface.
    #[must_use]
    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.implements.push(interface.into());
        self
    }
}

/// Interface type definition.
#[derive(Clone)]
pub struct InterfaceDef {
    pub name: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDef>,
    pub resolve_type: Option<ResolveTypeFn>,
}

impl InterfaceDef {
    /// Creates an interface type without fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            fields: IndexMap::new(),
            resolve_type: None,
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Sets the function mapping runtime values to object type names.
    #[must_use]
    pub fn resolve_type<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Context) -> Option<String> + Send + Sync + 'static,
    {
        self.resolve_type = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for InterfaceDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceDef")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("has_resolve_type", &self.resolve_type.is_some())
            .finish_non_exhaustive()
    }
}

/// Union type definition.
#[derive(Clone)]
pub struct UnionDef {
    pub name: String,
    pub description: Option<String>,
    pub members: Vec<String>,
    pub resolve_type: Option<ResolveTypeFn>,
}

impl UnionDef {
    /// Creates a union type without members.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            members: Vec::new(),
            resolve_type: None,
        }
    }

    /// Adds a member object type.
    #[must_use]
    pub fn member(mut self, object: impl Into<String>) -> Self {
        self.members.push(object.into());
        self
    }

    /// Sets the function mapping runtime values to member type names.
    ///
    /// Without one, the value's `"__typename"` property names its type.
    #[must_use]
    pub fn resolve_type<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Context) -> Option<String> + Send + Sync + 'static,
    {
        self.resolve_type = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for UnionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionDef")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("has_resolve_type", &self.resolve_type.is_some())
            .finish_non_exhaustive()
    }
}

/// Enum type definition.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub description: Option<String>,
    pub values: Vec<EnumValueDef>,
}

impl EnumDef {
    /// Creates an enum type without values.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            values: Vec::new(),
        }
    }

    /// Adds a value.
    #[must_use]
    pub fn value(mut self, name: impl Into<String>) -> Self {
        self.values.push(EnumValueDef {
            name: name.into(),
            description: None,
        });
        self
    }

    /// Returns true if `name` is one of the values.
    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.name == name)
    }
}

/// Enum value definition.
#[derive(Debug, Clone)]
pub struct EnumValueDef {
    pub name: String,
    pub description: Option<String>,
}

/// Field definition.
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: IndexMap<String, ArgumentDef>,
    pub resolver: Option<Arc<dyn Resolver>>,
}

impl FieldDef {
    /// Creates a field resolved by the default property resolver.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            arguments: IndexMap::new(),
            resolver: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an argument.
    #[must_use]
    pub fn argument(mut self, argument: ArgumentDef) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    /// Sets the resolver.
    #[must_use]
    pub fn resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Sets a sync function as the resolver.
    #[must_use]
    pub fn resolve_fn<F>(self, f: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        self.resolver(FnResolver::new(f))
    }

    /// Sets an async function as the resolver.
    #[must_use]
    pub fn resolve_async<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Value, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        self.resolver(AsyncFnResolver::new(f))
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("arguments", &self.arguments)
            .field("has_resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

/// Argument definition.
#[derive(Debug, Clone)]
pub struct ArgumentDef {
    pub name: String,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<Value>,
}

impl ArgumentDef {
    /// Creates a new argument without a default value.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            description: None,
            ty,
            default_value: None,
        }
    }

    /// Sets the value used when the argument is not provided.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Required arguments are non-null and have no default.
    pub fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

/// Type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    /// Creates a reference to a named type.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Wraps a type in a list.
    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }

    /// Wraps a type in a non-null marker.
    pub fn non_null(inner: TypeRef) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// Shorthand for `NonNull(Named(name))`.
    pub fn named_non_null(name: impl Into<String>) -> Self {
        Self::non_null(Self::named(name))
    }

    /// Returns true if the outermost wrapper is NonNull.
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// Returns true for a list, nullable or not.
    pub fn is_list(&self) -> bool {
        matches!(self.unwrap_non_null(), Self::List(_))
    }

    /// Strips one NonNull wrapper, if present.
    pub fn unwrap_non_null(&self) -> &TypeRef {
        match self {
            Self::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Returns the wrapped type of a List or NonNull.
    pub fn inner(&self) -> Option<&TypeRef> {
        match self {
            Self::List(inner) | Self::NonNull(inner) => Some(inner),
            Self::Named(_) => None,
        }
    }

    /// Returns the name of the innermost named type.
    pub fn named_type(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.named_type(),
        }
    }

    fn has_double_non_null(&self) -> bool {
        match self {
            Self::NonNull(inner) if inner.is_non_null() => true,
            Self::List(inner) | Self::NonNull(inner) => inner.has_double_non_null(),
            Self::Named(_) => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

impl<'a> From<&graphql_parser::query::Type<'a, String>> for TypeRef {
    fn from(ty: &graphql_parser::query::Type<'a, String>) -> Self {
        use graphql_parser::query::Type;
        match ty {
            Type::NamedType(name) => Self::Named(name.clone()),
            Type::ListType(inner) => Self::list(inner.as_ref().into()),
            Type::NonNullType(inner) => Self::non_null(inner.as_ref().into()),
        }
    }
}

/// An invalid schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No query root type was set.
    #[error("Query root type must be provided.")]
    MissingQueryType,

    /// A field, argument or member names a type that was never added.
    #[error("Unknown type \"{name}\" referenced by {referenced_by}.")]
    UnknownType { name: String, referenced_by: String },

    /// A root type is not an object type.
    #[error("{role} type \"{name}\" must be an Object type.")]
    NotAnObjectType { name: String, role: String },

    /// An object implements something other than an interface.
    #[error("Type \"{name}\" implemented by \"{object}\" must be an Interface type.")]
    NotAnInterface { name: String, object: String },

    /// An argument has a composite type.
    #[error("The type of {location} must be an input type but got \"{ty}\".")]
    NotAnInputType { location: String, ty: String },

    /// A type reference like `String!!`.
    #[error("The type of {location} wraps a non-null type in another non-null type: \"{ty}\".")]
    DoubleNonNull { location: String, ty: String },

    /// Two types were added under the same name.
    #[error("Type \"{0}\" is defined more than once.")]
    DuplicateType(String),
}

/// Schema builder.
#[derive(Debug)]
pub struct SchemaBuilder {
    query_type: Option<String>,
    mutation_type: Option<String>,
    types: IndexMap<String, TypeDef>,
    added: FxHashSet<String>,
    duplicates: Vec<String>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Creates a new schema builder.
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        for def in scalar::built_in_scalars() {
            types.insert(def.name.clone(), TypeDef::Scalar(def));
        }
        Self {
            query_type: None,
            mutation_type: None,
            types,
            added: FxHashSet::default(),
            duplicates: Vec::new(),
        }
    }

    /// Sets the query type.
    #[must_use]
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = Some(name.into());
        self
    }

    /// Sets the mutation type.
    #[must_use]
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    /// Adds a type. Built-in scalars may be replaced once.
    #[must_use]
    pub fn add_type(mut self, type_def: impl Into<TypeDef>) -> Self {
        let type_def = type_def.into();
        let name = type_def.name().to_string();
        if !self.added.insert(name.clone()) {
            self.duplicates.push(name.clone());
        }
        self.types.insert(name, type_def);
        self
    }

    /// Checks the type references and builds the schema.
    pub fn build(self) -> Result<Schema, SchemaError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(SchemaError::DuplicateType(name));
        }

        let query_type = self.query_type.ok_or(SchemaError::MissingQueryType)?;
        check_root(&self.types, &query_type, "Query")?;
        if let Some(mutation_type) = &self.mutation_type {
            check_root(&self.types, mutation_type, "Mutation")?;
        }

        let mut implementations: IndexMap<String, Vec<String>> = IndexMap::new();
        for type_def in self.types.values() {
            match type_def {
                TypeDef::Object(object) => {
                    check_fields(&self.types, &object.name, &object.fields)?;
                    for interface in &object.implements {
                        match self.types.get(interface) {
                            Some(TypeDef::Interface(_)) => implementations
                                .entry(interface.clone())
                                .or_default()
                                .push(object.name.clone()),
                            Some(_) => {
                                return Err(SchemaError::NotAnInterface {
                                    name: interface.clone(),
                                    object: object.name.clone(),
                                })
                            }
                            None => {
                                return Err(SchemaError::UnknownType {
                                    name: interface.clone(),
                                    referenced_by: format!("\"{}\"", object.name),
                                })
                            }
                        }
                    }
                }
                TypeDef::Interface(interface) => {
                    check_fields(&self.types, &interface.name, &interface.fields)?;
                }
                TypeDef::Union(union) => {
                    for member in &union.members {
                        match self.types.get(member) {
                            Some(TypeDef::Object(_)) => {}
                            Some(_) => {
                                return Err(SchemaError::NotAnObjectType {
                                    name: member.clone(),
                                    role: format!("Union \"{}\" member", union.name),
                                })
                            }
                            None => {
                                return Err(SchemaError::UnknownType {
                                    name: member.clone(),
                                    referenced_by: format!("\"{}\"", union.name),
                                })
                            }
                        }
                    }
                }
                TypeDef::Scalar(_) | TypeDef::Enum(_) => {}
            }
        }

        Ok(Schema {
            query_type,
            mutation_type: self.mutation_type,
            types: self.types,
            implementations,
        })
    }
}

fn check_root(
    types: &IndexMap<String, TypeDef>,
    name: &str,
    role: &str,
) -> Result<(), SchemaError> {
    match types.get(name) {
        Some(TypeDef::Object(_)) => Ok(()),
        Some(_) => Err(SchemaError::NotAnObjectType {
            name: name.to_string(),
            role: role.to_string(),
        }),
        None => Err(SchemaError::UnknownType {
            name: name.to_string(),
            referenced_by: format!("the {role} root"),
        }),
    }
}

fn check_fields(
    types: &IndexMap<String, TypeDef>,
    type_name: &str,
    fields: &IndexMap<String, FieldDef>,
) -> Result<(), SchemaError> {
    for field in fields.values() {
        let location = format!("\"{type_name}.{}\"", field.name);
        check_type_ref(types, &field.ty, &location)?;

        for argument in field.arguments.values() {
            let location = format!("\"{type_name}.{}({}:)\"", field.name, argument.name);
            check_type_ref(types, &argument.ty, &location)?;
            if !types.get(argument.ty.named_type()).is_some_and(TypeDef::is_leaf) {
                return Err(SchemaError::NotAnInputType {
                    location,
                    ty: argument.ty.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn check_type_ref(
    types: &IndexMap<String, TypeDef>,
    ty: &TypeRef,
    location: &str,
) -> Result<(), SchemaError> {
    if ty.has_double_non_null() {
        return Err(SchemaError::DoubleNonNull {
            location: location.to_string(),
            ty: ty.to_string(),
        });
    }
    if !types.contains_key(ty.named_type()) {
        return Err(SchemaError::UnknownType {
            name: ty.named_type().to_string(),
            referenced_by: location.to_string(),
        });
    }
    Ok(())
}
