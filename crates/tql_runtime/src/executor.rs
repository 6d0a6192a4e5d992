//! Query execution for tql.
//!
//! Fields are completed depth-first. Sibling fields and list items may be
//! resolved concurrently, but their values and errors are assembled in
//! selection order, so a response never depends on resolver timing.
//!
//! A failure is recorded once, by the nearest enclosing field or list item,
//! and that position becomes null. When the position is non-null the null
//! propagates to its parent instead.

use crate::collect::{FieldNode, GroupedFields};
use crate::config::ExecutorConfig;
use crate::response::{QueryDocument, Request, Response};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use graphql_parser::query::{Definition, FragmentDefinition};
use rustc_hash::FxHashMap;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tql_core::error::CoercionError;
use tql_core::{format_error, ExecutionPath, Failure, GraphError, Map, SourceLocation, Value};
use tql_schema::coercion::{coerce_argument_values, coerce_leaf};
use tql_schema::{
    Context, DefaultResolver, FieldDef, Resolver, ResolverArgs, ResolverInfo, Schema, TypeDef,
    TypeRef,
};
use tql_semantic::{coerce_variable_values, select_operation, validate_operation, OperationKind};
use tracing::{debug, trace, warn};

/// Why a position produced no value.
#[derive(Debug)]
enum Halt {
    /// A failure not yet recorded.
    Raised(Failure),
    /// A null propagating out of a non-null position. Already recorded.
    Null,
}

impl From<Failure> for Halt {
    fn from(failure: Failure) -> Self {
        Self::Raised(failure)
    }
}

type Completion = Result<Value, Halt>;

/// The query executor.
#[derive(Debug, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    /// Creates an executor with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor with a configuration.
    pub fn with_config(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Validates a request and executes it.
    ///
    /// A request that fails validation yields a response with errors and no
    /// data. Otherwise every failure raised during execution is reported
    /// alongside the data.
    #[tracing::instrument(skip_all, fields(operation = request.operation_name.as_deref()))]
    pub async fn execute(&self, schema: &Schema, request: &Request, ctx: &Context) -> Response {
        let errors = validate_operation(
            schema,
            &request.document,
            request.operation_name.as_deref(),
            &request.variables,
        );
        if !errors.is_empty() {
            debug!(error_count = errors.len(), "request rejected");
            return Response::errors(errors);
        }

        self.execute_validated(schema, request, ctx).await
    }

    /// Executes a request whose document is known to be valid.
    ///
    /// The operation is still selected and its variables coerced, so a
    /// request error is reported the same way as in [`Executor::execute`].
    pub async fn execute_validated(
        &self,
        schema: &Schema,
        request: &Request,
        ctx: &Context,
    ) -> Response {
        let operation =
            match select_operation(&request.document, request.operation_name.as_deref()) {
                Ok(operation) => operation,
                Err(failure) => return Response::errors(vec![format_error(failure, [], None)]),
            };

        let root_type = match operation.kind {
            OperationKind::Query => Some(schema.query_type()),
            OperationKind::Mutation => schema.mutation_type(),
            OperationKind::Subscription => None,
        };
        let Some(root_type) = root_type else {
            let failure = Failure::Validation(format!(
                "Schema is not configured to execute {} operation.",
                operation.kind
            ));
            let location = SourceLocation::from(operation.position);
            return Response::errors(vec![format_error(failure, [location], None)]);
        };

        let variables =
            match coerce_variable_values(schema, operation.variable_definitions, &request.variables)
            {
                Ok(variables) => variables,
                Err(errors) => return Response::errors(errors),
            };

        debug!(kind = %operation.kind, root_type, "executing operation");

        let exec = ExecutionContext::new(schema, &request.document, variables, ctx, &self.config);
        let fields = exec.collect_fields(root_type, [operation.selection_set]);
        // Root mutation fields run one after another, in document order.
        let serial = operation.kind == OperationKind::Mutation;

        let mut errors = Vec::new();
        let data = exec
            .execute_fields(
                root_type,
                &request.root_value,
                &ExecutionPath::root(),
                fields,
                serial,
                &mut errors,
            )
            .await
            .unwrap_or(Value::Null);

        debug!(error_count = errors.len(), "operation finished");
        Response {
            data: Some(data),
            errors,
        }
    }
}

/// State shared by every field of one operation.
pub(crate) struct ExecutionContext<'e> {
    pub(crate) schema: &'e Schema,
    pub(crate) fragments: FxHashMap<&'e str, &'e FragmentDefinition<'static, String>>,
    pub(crate) variables: Map,
    ctx: &'e Context,
    config: &'e ExecutorConfig,
}

impl<'e> ExecutionContext<'e> {
    pub(crate) fn new(
        schema: &'e Schema,
        document: &'e QueryDocument,
        variables: Map,
        ctx: &'e Context,
        config: &'e ExecutorConfig,
    ) -> Self {
        let fragments = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
                Definition::Operation(_) => None,
            })
            .collect();

        Self {
            schema,
            fragments,
            variables,
            ctx,
            config,
        }
    }

    /// Executes grouped fields against a parent value.
    ///
    /// Each field collects its errors separately and they are appended in
    /// selection order once every field has finished.
    async fn execute_fields(
        &self,
        parent_type: &str,
        parent: &Value,
        path: &ExecutionPath,
        fields: GroupedFields<'e>,
        serial: bool,
        errors: &mut Vec<GraphError>,
    ) -> Completion {
        let limit = if serial { 1 } else { self.config.concurrency() };

        let fields = fields.into_iter().filter_map(|(key, nodes)| {
            let name = nodes.first()?.name.as_str();
            let def = if name == "__typename" {
                None
            } else {
                // Validation rejects unknown fields, so this only skips them.
                Some(self.schema.field(parent_type, name)?)
            };
            Some((key, nodes, def))
        });

        let results: Vec<(String, Completion, Vec<GraphError>)> =
            stream::iter(fields.map(|(key, nodes, def)| async move {
                let field_path = path.key(key.as_str());
                let mut field_errors = Vec::new();
                let result = self
                    .execute_field(parent_type, def, parent, &field_path, &nodes, &mut field_errors)
                    .await;
                (key, result, field_errors)
            }))
            .buffered(limit)
            .boxed()
            .collect()
            .await;

        let mut data = Map::new();
        let mut nulled = false;
        for (key, result, field_errors) in results {
            errors.extend(field_errors);
            match result {
                Ok(value) => {
                    data.insert(key, value);
                }
                Err(_) => nulled = true,
            }
        }

        if nulled {
            Err(Halt::Null)
        } else {
            Ok(Value::Object(data))
        }
    }

    /// Executes one field and catches whatever its completion raised.
    async fn execute_field(
        &self,
        parent_type: &str,
        def: Option<&'e FieldDef>,
        parent: &Value,
        path: &ExecutionPath,
        nodes: &[&'e FieldNode],
        errors: &mut Vec<GraphError>,
    ) -> Completion {
        let Some(def) = def else {
            return Ok(Value::String(parent_type.to_string()));
        };

        match self
            .resolve_and_complete(parent_type, def, parent, path, nodes, errors)
            .await
        {
            Ok(value) => Ok(value),
            Err(halt) => catch(halt, &def.ty, nodes, path, errors),
        }
    }

    async fn resolve_and_complete(
        &self,
        parent_type: &str,
        def: &'e FieldDef,
        parent: &Value,
        path: &ExecutionPath,
        nodes: &[&'e FieldNode],
        errors: &mut Vec<GraphError>,
    ) -> Completion {
        let Some(node) = nodes.first() else {
            return Ok(Value::Null);
        };

        let args = coerce_argument_values(self.schema, def, &node.arguments, &self.variables)
            .map_err(Failure::from)?;
        let info = ResolverInfo::new(def.name.as_str(), parent_type, def.ty.clone())
            .with_path(path.clone());

        let value = self
            .resolve_field_value(def, parent, &ResolverArgs::from(args), &info)
            .await?;

        self.complete_value(&def.ty, nodes, &info, path, value, errors)
            .await
    }

    /// Calls the field's resolver, bounded by the configured deadline.
    async fn resolve_field_value(
        &self,
        def: &FieldDef,
        parent: &Value,
        args: &ResolverArgs,
        info: &ResolverInfo,
    ) -> Result<Value, Failure> {
        let resolver: &dyn Resolver = match &def.resolver {
            Some(resolver) => resolver.as_ref(),
            None => &DefaultResolver,
        };
        // Built on first poll, inside the panic guard.
        let resolved = async move { resolver.resolve(parent, args, self.ctx, info).await };

        let guarded = async {
            if !self.config.catch_panics {
                return resolved.await.map_err(Failure::from);
            }
            match AssertUnwindSafe(resolved).catch_unwind().await {
                Ok(result) => result.map_err(Failure::from),
                Err(payload) => {
                    let message = panic_message(payload.as_ref(), info);
                    warn!(field = %info.coordinate(), %message, "resolver panicked");
                    Err(Failure::Panicked(message))
                }
            }
        };

        let result = match self.config.field_timeout() {
            Some(deadline) => match tokio::time::timeout(deadline, guarded).await {
                Ok(result) => result,
                Err(_) => {
                    let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                    warn!(field = %info.coordinate(), timeout_ms, "resolver timed out");
                    Err(Failure::Cancelled {
                        field: info.coordinate(),
                        timeout_ms,
                    })
                }
            },
            None => guarded.await,
        };

        if let Err(Failure::Resolver(error)) = &result {
            trace!(field = %info.coordinate(), %error, "resolver failed");
        }
        result
    }

    /// Shapes a resolved value according to its declared type.
    fn complete_value<'f>(
        &'f self,
        ty: &'f TypeRef,
        nodes: &'f [&'e FieldNode],
        info: &'f ResolverInfo,
        path: &'f ExecutionPath,
        value: Value,
        errors: &'f mut Vec<GraphError>,
    ) -> BoxFuture<'f, Completion> {
        async move {
            match ty {
                TypeRef::NonNull(inner) => {
                    let value = self
                        .complete_value(inner, nodes, info, path, value, errors)
                        .await?;
                    if value.is_null() {
                        return Err(Failure::NullViolation {
                            field: info.coordinate(),
                        }
                        .into());
                    }
                    Ok(value)
                }
                _ if value.is_null() => Ok(Value::Null),
                TypeRef::List(item_type) => {
                    self.complete_list(item_type, nodes, info, path, value, errors)
                        .await
                }
                TypeRef::Named(name) => {
                    self.complete_named(name, nodes, info, path, value, errors)
                        .await
                }
            }
        }
        .boxed()
    }

    /// Completes each item of a list. A failed item nulls only itself unless
    /// the item type is non-null.
    async fn complete_list(
        &self,
        item_type: &TypeRef,
        nodes: &[&'e FieldNode],
        info: &ResolverInfo,
        path: &ExecutionPath,
        value: Value,
        errors: &mut Vec<GraphError>,
    ) -> Completion {
        let items = match value {
            Value::Array(items) => items,
            other => {
                let message = format!(
                    "Expected Iterable, but did not find one for field \"{}\".",
                    info.coordinate()
                );
                return Err(Failure::Coercion(CoercionError::new(message, other)).into());
            }
        };

        let results: Vec<(Completion, Vec<GraphError>)> =
            stream::iter(items.into_iter().enumerate().map(|(index, item)| async move {
                let item_path = path.index(index);
                let mut item_errors = Vec::new();
                let result = match self
                    .complete_value(item_type, nodes, info, &item_path, item, &mut item_errors)
                    .await
                {
                    Ok(value) => Ok(value),
                    Err(halt) => catch(halt, item_type, nodes, &item_path, &mut item_errors),
                };
                (result, item_errors)
            }))
            .buffered(self.config.concurrency())
            .collect()
            .await;

        let mut completed = Vec::with_capacity(results.len());
        let mut nulled = false;
        for (result, item_errors) in results {
            errors.extend(item_errors);
            match result {
                Ok(value) => completed.push(value),
                Err(_) => nulled = true,
            }
        }

        if nulled {
            Err(Halt::Null)
        } else {
            Ok(Value::Array(completed))
        }
    }

    async fn complete_named(
        &self,
        name: &str,
        nodes: &[&'e FieldNode],
        info: &ResolverInfo,
        path: &ExecutionPath,
        value: Value,
        errors: &mut Vec<GraphError>,
    ) -> Completion {
        match self.schema.get_type(name) {
            Some(TypeDef::Scalar(_) | TypeDef::Enum(_)) => coerce_leaf(self.schema, name, &value)
                .map_err(|error| Halt::Raised(Failure::Coercion(error))),
            Some(TypeDef::Object(object)) => {
                self.complete_object(&object.name, nodes, path, &value, errors)
                    .await
            }
            Some(TypeDef::Interface(_) | TypeDef::Union(_)) => {
                let object_type = self.resolve_abstract_type(name, &value, info)?;
                self.complete_object(object_type, nodes, path, &value, errors)
                    .await
            }
            None => {
                let message = format!("Unknown type \"{name}\".");
                Err(Failure::Coercion(CoercionError::new(message, value)).into())
            }
        }
    }

    /// Completes the merged sub-selections of every node of the field.
    async fn complete_object(
        &self,
        object_type: &str,
        nodes: &[&'e FieldNode],
        path: &ExecutionPath,
        value: &Value,
        errors: &mut Vec<GraphError>,
    ) -> Completion {
        let selection_sets = nodes.iter().map(|&node| &node.selection_set);
        let fields = self.collect_fields(object_type, selection_sets);
        self.execute_fields(object_type, value, path, fields, false, errors)
            .await
    }

    /// Determines the object type of a value of an abstract type.
    ///
    /// Uses the type's `resolve_type` function when it has one, and the
    /// value's `__typename` property otherwise.
    fn resolve_abstract_type(
        &self,
        abstract_type: &str,
        value: &Value,
        info: &ResolverInfo,
    ) -> Result<&'e str, Failure> {
        let schema = self.schema;
        let resolve_type = match schema.get_type(abstract_type) {
            Some(TypeDef::Interface(interface)) => interface.resolve_type.as_ref(),
            Some(TypeDef::Union(union)) => union.resolve_type.as_ref(),
            _ => None,
        };

        let runtime_type = match resolve_type {
            Some(resolve_type) => resolve_type(value, self.ctx),
            None => value
                .get("__typename")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        let Some(runtime_type) = runtime_type else {
            return Err(Failure::AbstractResolution(format!(
                "Abstract type \"{abstract_type}\" must resolve to an Object type at runtime \
                 for field \"{}\". Either the \"{abstract_type}\" type should provide a \
                 \"resolveType\" function or each possible type should provide an \"isTypeOf\" \
                 function.",
                info.coordinate()
            )));
        };

        let Some(object) = schema.object(&runtime_type) else {
            let message = if schema.get_type(&runtime_type).is_some() {
                format!(
                    "Abstract type \"{abstract_type}\" was resolved to a non-object type \"{runtime_type}\"."
                )
            } else {
                format!(
                    "Abstract type \"{abstract_type}\" was resolved to a type \"{runtime_type}\" \
                     that does not exist inside the schema."
                )
            };
            return Err(Failure::AbstractResolution(message));
        };

        if !schema.is_possible_type(abstract_type, &object.name) {
            return Err(Failure::AbstractResolution(format!(
                "Runtime Object type \"{runtime_type}\" is not a possible type for \"{abstract_type}\"."
            )));
        }
        Ok(object.name.as_str())
    }
}

/// Records a raised failure at `path` and nulls the position, or propagates
/// the null when `ty` is non-null.
fn catch(
    halt: Halt,
    ty: &TypeRef,
    nodes: &[&FieldNode],
    path: &ExecutionPath,
    errors: &mut Vec<GraphError>,
) -> Completion {
    if let Halt::Raised(failure) = halt {
        let locations = nodes.iter().map(|node| SourceLocation::from(node.position));
        errors.push(format_error(failure, locations, Some(path.clone())));
    }

    if ty.is_non_null() {
        Err(Halt::Null)
    } else {
        Ok(Value::Null)
    }
}

fn panic_message(payload: &(dyn Any + Send), info: &ResolverInfo) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        format!("Resolver for field \"{}\" panicked.", info.coordinate())
    }
}
