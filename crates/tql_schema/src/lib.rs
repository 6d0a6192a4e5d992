//! Type system model for tql.
//!
//! This crate provides:
//! - `schema`: Type definitions, type references and the schema builder
//! - `scalar`: Built-in scalars
//! - `coercion`: Leaf output coercion and input value coercion
//! - `resolver`: Resolver trait, resolver arguments and request context

pub mod coercion;
pub mod resolver;
pub mod scalar;
pub mod schema;

pub use coercion::{coerce_argument_values, coerce_input_value, coerce_leaf, value_from_ast};
pub use resolver::{
    AsyncFnResolver, Context, DefaultResolver, FnResolver, Resolver, ResolverArgs, ResolverFuture,
    ResolverInfo, ResolverResult,
};
pub use schema::{
    ArgumentDef, EnumDef, EnumValueDef, FieldDef, InterfaceDef, ObjectDef, ResolveTypeFn,
    ScalarDef, Schema, SchemaBuilder, SchemaError, TypeDef, TypeRef, UnionDef,
};
