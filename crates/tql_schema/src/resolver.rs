//! Field resolvers.
//!
//! A resolver maps `(parent, args, ctx, info)` to a future of the field's
//! raw value. The executor completes that value against the field's type.

use crate::schema::TypeRef;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tql_core::{ExecutionPath, FieldError, Map, Value};

/// Request-scoped data shared by every resolver of one execution.
///
/// Entries are keyed by their type, so each type holds at most one value.
#[derive(Clone, Default)]
pub struct Context {
    entries: FxHashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Stores a value and returns the context.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.insert(value);
        self
    }

    /// Returns the value of type `T`, if one was stored.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }

    /// Returns the value of type `T`, or a field error naming the type.
    pub fn require<T: Any + Send + Sync>(&self) -> Result<&T, FieldError> {
        self.get::<T>().ok_or_else(|| {
            FieldError::new(format!(
                "Context has no value of type {}.",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Coerced argument values of a field.
///
/// Arguments with a default value are always present; optional arguments
/// without one are present only when the query supplied them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverArgs(Map);

impl ResolverArgs {
    /// Creates empty resolver args.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value of an argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Deserializes an argument, treating absence and null alike.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        match self.0.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => serde_json::from_value(value.clone()).ok(),
        }
    }

    /// Deserializes an argument the resolver cannot do without.
    pub fn require<T: DeserializeOwned>(&self, name: &str) -> Result<T, FieldError> {
        let value = self
            .0
            .get(name)
            .ok_or_else(|| FieldError::new(format!("Argument \"{name}\" was not provided.")))?;
        serde_json::from_value(value.clone())
            .map_err(|err| FieldError::new(format!("Argument \"{name}\" is malformed: {err}")))
    }

    /// Returns true if the argument is present, even as null.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns true if no argument is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the arguments as a map.
    pub fn as_map(&self) -> &Map {
        &self.0
    }

    /// Consumes the args, returning the map.
    pub fn into_map(self) -> Map {
        self.0
    }
}

impl From<Map> for ResolverArgs {
    fn from(args: Map) -> Self {
        Self(args)
    }
}

/// Where in the operation a field is being resolved.
#[derive(Debug, Clone)]
pub struct ResolverInfo {
    /// The field's name, not its alias.
    pub field_name: String,
    /// The object type that declares the field.
    pub parent_type: String,
    /// The field's declared type.
    pub return_type: TypeRef,
    /// Response path of the field.
    pub path: ExecutionPath,
}

impl ResolverInfo {
    /// Creates info for a field at the root path.
    pub fn new(
        field_name: impl Into<String>,
        parent_type: impl Into<String>,
        return_type: TypeRef,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            parent_type: parent_type.into(),
            return_type,
            path: ExecutionPath::root(),
        }
    }

    /// Sets the response path.
    #[must_use]
    pub fn with_path(mut self, path: ExecutionPath) -> Self {
        self.path = path;
        self
    }

    /// Returns the `Parent.field` coordinate.
    pub fn coordinate(&self) -> String {
        format!("{}.{}", self.parent_type, self.field_name)
    }
}

/// The outcome of a resolver: a raw value, or a raised failure.
pub type ResolverResult = Result<Value, FieldError>;

/// A boxed resolver future.
pub type ResolverFuture<'a> = Pin<Box<dyn Future<Output = ResolverResult> + Send + 'a>>;

/// Resolves the raw value of a field.
pub trait Resolver: Send + Sync {
    /// Returns a future of the field's raw value.
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a>;
}

type SyncResolverFn =
    dyn Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult + Send + Sync;

/// Adapts a synchronous closure.
pub struct FnResolver(Box<SyncResolverFn>);

impl FnResolver {
    /// Creates a resolver from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &ResolverArgs, &Context, &ResolverInfo) -> ResolverResult
            + Send
            + Sync
            + 'static,
    {
        Self(Box::new(f))
    }
}

impl Resolver for FnResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        // Runs on first poll, inside the executor's panic guard.
        Box::pin(async move { (self.0)(parent, args, ctx, info) })
    }
}

type AsyncResolverFn = dyn Fn(Value, ResolverArgs, Context, ResolverInfo) -> ResolverFuture<'static>
    + Send
    + Sync;

/// Adapts an async closure. The closure receives owned copies of its inputs,
/// so its future may outlive the call.
pub struct AsyncFnResolver(Box<AsyncResolverFn>);

impl AsyncFnResolver {
    /// Creates a resolver from a closure returning a future.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, ResolverArgs, Context, ResolverInfo) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResolverResult> + Send + 'static,
    {
        Self(Box::new(
            move |parent, args, ctx, info| -> ResolverFuture<'static> {
                Box::pin(f(parent, args, ctx, info))
            },
        ))
    }
}

impl Resolver for AsyncFnResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        args: &'a ResolverArgs,
        ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        (self.0)(parent.clone(), args.clone(), ctx.clone(), info.clone())
    }
}

/// Reads the property named after the field from an object parent.
///
/// Any other parent yields null.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl Resolver for DefaultResolver {
    fn resolve<'a>(
        &'a self,
        parent: &'a Value,
        _args: &'a ResolverArgs,
        _ctx: &'a Context,
        info: &'a ResolverInfo,
    ) -> ResolverFuture<'a> {
        let value = parent
            .get(info.field_name.as_str())
            .cloned()
            .unwrap_or(Value::Null);
        Box::pin(std::future::ready(Ok(value)))
    }
}
