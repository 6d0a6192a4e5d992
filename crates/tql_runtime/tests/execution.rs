//! Integration tests for query execution.

use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tql_runtime::{
    Context, Executor, ExecutorConfig, FieldError, Request, Response, Schema, Value,
};
use tql_schema::{
    ArgumentDef, FieldDef, InterfaceDef, ObjectDef, SchemaBuilder, TypeRef, UnionDef,
};

async fn run(schema: &Schema, request: Request) -> Response {
    Executor::new().execute(schema, &request, &Context::new()).await
}

fn query_schema(fields: Vec<FieldDef>) -> Schema {
    let query = fields
        .into_iter()
        .fold(ObjectDef::new("Query"), ObjectDef::field);
    SchemaBuilder::new()
        .query_type("Query")
        .add_type(query)
        .build()
        .unwrap()
}

fn pet_schema(union: UnionDef) -> Schema {
    SchemaBuilder::new()
        .query_type("Query")
        .add_type(
            ObjectDef::new("Dog")
                .field(FieldDef::new("name", TypeRef::named("String")))
                .field(FieldDef::new("barks", TypeRef::named("Boolean"))),
        )
        .add_type(
            ObjectDef::new("Cat")
                .field(FieldDef::new("name", TypeRef::named("String")))
                .field(FieldDef::new("meows", TypeRef::named("Boolean"))),
        )
        .add_type(union)
        .add_type(
            ObjectDef::new("Query")
                .field(FieldDef::new("pet", TypeRef::named("Pet")))
                .field(FieldDef::new("pets", TypeRef::list(TypeRef::named("Pet")))),
        )
        .build()
        .unwrap()
}

/// Test that a failing field does not affect its siblings.
#[tokio::test]
async fn test_sibling_failure_isolation() {
    let schema = query_schema(vec![
        FieldDef::new("s1", TypeRef::named("String")),
        FieldDef::new("s2", TypeRef::named("String"))
            .resolve_fn(|_, _, _, _| Err(FieldError::new("boom"))),
        FieldDef::new("s3", TypeRef::named("String")),
    ]);
    let request = Request::parse("{ s1 s2 s3 }")
        .unwrap()
        .with_root_value(json!({"s1": "one", "s2": "two", "s3": "three"}));

    let response = run(&schema, request).await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": {"s1": "one", "s2": null, "s3": "three"},
            "errors": [{
                "message": "boom",
                "locations": [{"line": 1, "column": 6}],
                "path": ["s2"],
            }],
        })
    );
}

/// Test that raised extensions are copied verbatim.
#[tokio::test]
async fn test_extensions_passthrough() {
    let schema = query_schema(vec![
        FieldDef::new("secret", TypeRef::named("String")).resolve_fn(|_, _, _, _| {
            Err(FieldError::new("denied")
                .with_extension("code", "FORBIDDEN")
                .with_extension("retry", json!({"after": 30})))
        }),
        FieldDef::new("plain", TypeRef::named("String"))
            .resolve_fn(|_, _, _, _| Err(FieldError::new("no extensions"))),
    ]);

    let response = run(&schema, Request::parse("{ secret plain }").unwrap()).await;

    assert_eq!(response.errors.len(), 2);
    assert_eq!(
        response.to_json()["errors"][0],
        json!({
            "message": "denied",
            "locations": [{"line": 1, "column": 3}],
            "path": ["secret"],
            "extensions": {"code": "FORBIDDEN", "retry": {"after": 30}},
        })
    );
    assert!(response.errors[1].extensions.is_none());
}

/// Test union members resolved by `__typename`.
#[tokio::test]
async fn test_union_resolution_by_typename() {
    let schema = pet_schema(UnionDef::new("Pet").member("Dog").member("Cat"));
    let request = Request::parse(
        "{ pets { __typename ... on Dog { barks } ... on Cat { meows } } }",
    )
    .unwrap()
    .with_root_value(json!({
        "pets": [
            {"__typename": "Dog", "name": "Rex", "barks": true},
            {"__typename": "Cat", "name": "Tom", "meows": false},
        ],
    }));

    let response = run(&schema, request).await;

    assert!(!response.has_errors());
    assert_eq!(
        response.data,
        Some(json!({
            "pets": [
                {"__typename": "Dog", "barks": true},
                {"__typename": "Cat", "meows": false},
            ],
        }))
    );
}

/// Test union members resolved by a `resolve_type` function.
#[tokio::test]
async fn test_union_resolution_by_function() {
    let union = UnionDef::new("Pet")
        .member("Dog")
        .member("Cat")
        .resolve_type(|value, _| {
            let kind = if value.get("barks").is_some() { "Dog" } else { "Cat" };
            Some(kind.to_string())
        });
    let schema = pet_schema(union);
    let request = Request::parse("{ pet { __typename ... on Cat { name } } }")
        .unwrap()
        .with_root_value(json!({"pet": {"name": "Tom", "meows": true}}));

    let response = run(&schema, request).await;

    assert_eq!(
        response.data,
        Some(json!({"pet": {"__typename": "Cat", "name": "Tom"}}))
    );
}

/// Test abstract types that cannot be resolved to a member.
#[tokio::test]
async fn test_abstract_resolution_failures() {
    let schema = pet_schema(UnionDef::new("Pet").member("Dog").member("Cat"));
    let cases = [
        (
            json!({"name": "Rex"}),
            "Abstract type \"Pet\" must resolve to an Object type at runtime for field \"Query.pet\". \
             Either the \"Pet\" type should provide a \"resolveType\" function or each possible type should provide an \"isTypeOf\" function.",
        ),
        (
            json!({"__typename": "Bird"}),
            "Abstract type \"Pet\" was resolved to a type \"Bird\" that does not exist inside the schema.",
        ),
        (
            json!({"__typename": "Query"}),
            "Runtime Object type \"Query\" is not a possible type for \"Pet\".",
        ),
        (
            json!({"__typename": "String"}),
            "Abstract type \"Pet\" was resolved to a non-object type \"String\".",
        ),
    ];

    for (pet, message) in cases {
        let request = Request::parse("{ pet { __typename } }")
            .unwrap()
            .with_root_value(json!({ "pet": pet }));

        let response = run(&schema, request).await;

        assert_eq!(response.data, Some(json!({"pet": null})));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(response.errors[0].message, message);
    }
}

/// Test interface resolution and field merging.
#[tokio::test]
async fn test_interface_resolution() {
    let schema = SchemaBuilder::new()
        .query_type("Query")
        .add_type(
            InterfaceDef::new("Node")
                .field(FieldDef::new("id", TypeRef::named_non_null("ID")))
                .resolve_type(|value, _| {
                    value.get("kind").and_then(Value::as_str).map(str::to_string)
                }),
        )
        .add_type(
            ObjectDef::new("User")
                .implements("Node")
                .field(FieldDef::new("id", TypeRef::named_non_null("ID")))
                .field(FieldDef::new("name", TypeRef::named("String"))),
        )
        .add_type(
            ObjectDef::new("Post")
                .implements("Node")
                .field(FieldDef::new("id", TypeRef::named_non_null("ID")))
                .field(FieldDef::new("title", TypeRef::named("String"))),
        )
        .add_type(
            ObjectDef::new("Query")
                .field(FieldDef::new("nodes", TypeRef::list(TypeRef::named("Node")))),
        )
        .build()
        .unwrap();

    let request = Request::parse(
        "{ nodes { id ... on User { name } } nodes { ... on Post { title } } }",
    )
    .unwrap()
    .with_root_value(json!({
        "nodes": [
            {"kind": "User", "id": 1, "name": "Ada"},
            {"kind": "Post", "id": "p1", "title": "Hello"},
        ],
    }));

    let response = run(&schema, request).await;

    assert!(!response.has_errors());
    assert_eq!(
        response.data,
        Some(json!({
            "nodes": [
                {"id": "1", "name": "Ada"},
                {"id": "p1", "title": "Hello"},
            ],
        }))
    );
}

/// Test that an invalid list item nulls only that item.
#[tokio::test]
async fn test_nullable_list_item_failure() {
    let schema = query_schema(vec![FieldDef::new(
        "ooops",
        TypeRef::list(TypeRef::named("String")),
    )]);
    let request = Request::parse("{ ooops }")
        .unwrap()
        .with_root_value(json!({"ooops": ["ok", {"hey": "wrong non String value"}]}));

    let response = run(&schema, request).await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": {"ooops": ["ok", null]},
            "errors": [{
                "message": "String cannot represent value: { hey: \"wrong non String value\" }",
                "locations": [{"line": 1, "column": 3}],
                "path": ["ooops", 1],
            }],
        })
    );
}

/// Test that an invalid non-null list item nulls the whole list.
#[tokio::test]
async fn test_non_null_list_item_failure() {
    let schema = query_schema(vec![FieldDef::new(
        "ooops",
        TypeRef::list(TypeRef::named_non_null("String")),
    )]);
    let request = Request::parse("{ ooops }")
        .unwrap()
        .with_root_value(json!({"ooops": ["ok", {"hey": "wrong non String value"}]}));

    let response = run(&schema, request).await;

    assert_eq!(response.data, Some(json!({"ooops": null})));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.to_json()["errors"][0]["path"],
        json!(["ooops", 1])
    );
}

/// Test that a non-array value for a list field fails the field.
#[tokio::test]
async fn test_expected_iterable() {
    let schema = query_schema(vec![FieldDef::new(
        "tags",
        TypeRef::list(TypeRef::named("String")),
    )]);
    let request = Request::parse("{ tags }")
        .unwrap()
        .with_root_value(json!({"tags": "not a list"}));

    let response = run(&schema, request).await;

    assert_eq!(response.data, Some(json!({"tags": null})));
    insta::assert_snapshot!(
        response.errors[0].message,
        @r#"Expected Iterable, but did not find one for field "Query.tags"."#
    );
}

/// Test that unknown fields are rejected before execution.
#[tokio::test]
async fn test_unknown_field() {
    let schema = query_schema(vec![FieldDef::new("known", TypeRef::named("String"))]);

    let response = run(&schema, Request::parse("{ known nope }").unwrap()).await;

    assert_eq!(
        response.to_json(),
        json!({
            "errors": [{
                "message": "Cannot query field \"nope\" on type \"Query\".",
                "locations": [{"line": 1, "column": 9}],
            }],
        })
    );
}

/// Test that a missing required variable is a request error.
#[tokio::test]
async fn test_missing_required_variable() {
    let schema = query_schema(vec![FieldDef::new("echo", TypeRef::named("String"))
        .argument(ArgumentDef::new("text", TypeRef::named("String")))]);
    let request = Request::parse("query Q($q: String!) { echo(text: $q) }").unwrap();

    let response = run(&schema, request).await;

    assert_eq!(
        response.to_json(),
        json!({
            "errors": [{
                "message": "Variable \"$q\" of required type \"String!\" was not provided.",
                "locations": [{"line": 1, "column": 9}],
            }],
        })
    );
}

/// Test that a missing variable is reported next to document errors.
#[tokio::test]
async fn test_missing_variable_with_unknown_field() {
    let schema = query_schema(vec![FieldDef::new("echo", TypeRef::named("String"))
        .argument(ArgumentDef::new("text", TypeRef::named("String")))]);
    let request = Request::parse("query Q($q: String!) { echo(text: $q) nope }").unwrap();

    let response = run(&schema, request).await;

    assert_eq!(
        response.to_json(),
        json!({
            "errors": [
                {
                    "message": "Cannot query field \"nope\" on type \"Query\".",
                    "locations": [{"line": 1, "column": 39}],
                },
                {
                    "message": "Variable \"$q\" of required type \"String!\" was not provided.",
                    "locations": [{"line": 1, "column": 9}],
                },
            ],
        })
    );
}

/// Test that a null at a non-null root field nulls the data.
#[tokio::test]
async fn test_null_bubbles_to_root() {
    let schema = query_schema(vec![
        FieldDef::new("fine", TypeRef::named("String")),
        FieldDef::new("required", TypeRef::named_non_null("String")),
    ]);
    let request = Request::parse("{ fine required }")
        .unwrap()
        .with_root_value(json!({"fine": "yes"}));

    let response = run(&schema, request).await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": null,
            "errors": [{
                "message": "Cannot return null for non-nullable field Query.required.",
                "locations": [{"line": 1, "column": 8}],
                "path": ["required"],
            }],
        })
    );
}

/// Test that a null bubbles to the nearest nullable field.
#[tokio::test]
async fn test_null_bubbles_to_nullable_parent() {
    let schema = SchemaBuilder::new()
        .query_type("Query")
        .add_type(
            ObjectDef::new("User")
                .field(FieldDef::new("name", TypeRef::named_non_null("String")))
                .field(FieldDef::new("email", TypeRef::named("String"))),
        )
        .add_type(
            ObjectDef::new("Query")
                .field(FieldDef::new("user", TypeRef::named("User")))
                .field(FieldDef::new("count", TypeRef::named("Int"))),
        )
        .build()
        .unwrap();
    let request = Request::parse("{ user { name email } count }")
        .unwrap()
        .with_root_value(json!({"user": {"email": "a@b.c"}, "count": 3}));

    let response = run(&schema, request).await;

    assert_eq!(response.data, Some(json!({"user": null, "count": 3})));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].message,
        "Cannot return null for non-nullable field User.name."
    );
    assert_eq!(
        response.to_json()["errors"][0]["path"],
        json!(["user", "name"])
    );
}

/// Test that a null crossing several non-null fields is recorded once and
/// keeps the errors of its siblings.
#[tokio::test]
async fn test_null_bubbles_through_non_null_ancestors() {
    let schema = SchemaBuilder::new()
        .query_type("Query")
        .add_type(
            ObjectDef::new("B").field(
                FieldDef::new("c", TypeRef::named_non_null("String"))
                    .resolve_fn(|_, _, _, _| Err(FieldError::new("c failed"))),
            ),
        )
        .add_type(ObjectDef::new("A").field(FieldDef::new("b", TypeRef::named_non_null("B"))))
        .add_type(
            ObjectDef::new("Query")
                .field(FieldDef::new("a", TypeRef::named_non_null("A")))
                .field(
                    FieldDef::new("other", TypeRef::named("String"))
                        .resolve_fn(|_, _, _, _| Err(FieldError::new("other failed"))),
                ),
        )
        .build()
        .unwrap();
    let request = Request::parse("{ a { b { c } } other }")
        .unwrap()
        .with_root_value(json!({"a": {"b": {}}}));

    let response = run(&schema, request).await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": null,
            "errors": [
                {
                    "message": "c failed",
                    "locations": [{"line": 1, "column": 11}],
                    "path": ["a", "b", "c"],
                },
                {
                    "message": "other failed",
                    "locations": [{"line": 1, "column": 17}],
                    "path": ["other"],
                },
            ],
        })
    );
}

/// Test that nested resolvers do not run below a null object.
#[tokio::test]
async fn test_null_object_skips_nested_resolvers() {
    let schema = SchemaBuilder::new()
        .query_type("Query")
        .add_type(
            ObjectDef::new("User").field(
                FieldDef::new("name", TypeRef::named("String"))
                    .resolve_fn(|_, _, _, _| Err(FieldError::new("must not run"))),
            ),
        )
        .add_type(ObjectDef::new("Query").field(FieldDef::new("user", TypeRef::named("User"))))
        .build()
        .unwrap();

    let response = run(&schema, Request::parse("{ user { name } }").unwrap()).await;

    assert_eq!(response.to_json(), json!({"data": {"user": null}}));
}

/// Test argument literals, defaults, and variables.
#[tokio::test]
async fn test_arguments() {
    let schema = query_schema(vec![FieldDef::new("greet", TypeRef::named("String"))
        .argument(ArgumentDef::new("name", TypeRef::named("String")).default_value(json!("world")))
        .resolve_fn(|_, args, _, _| {
            let name: String = args.require("name")?;
            Ok(json!(format!("hello {name}")))
        })]);
    let request = Request::parse(
        "query Q($n: String, $m: String = \"max\") { a: greet b: greet(name: \"rex\") c: greet(name: $n) d: greet(name: $m) }",
    )
    .unwrap()
    .with_variable("n", "sam");

    let response = run(&schema, request).await;

    assert_eq!(
        response.to_json(),
        json!({
            "data": {
                "a": "hello world",
                "b": "hello rex",
                "c": "hello sam",
                "d": "hello max",
            },
        })
    );
}

/// Test `@skip` and `@include`.
#[tokio::test]
async fn test_skip_and_include() {
    let schema = query_schema(vec![
        FieldDef::new("a", TypeRef::named("Int")),
        FieldDef::new("b", TypeRef::named("Int")),
        FieldDef::new("c", TypeRef::named("Int")),
    ]);
    let request = Request::parse(
        "query Q($yes: Boolean!) { a @include(if: $yes) b @skip(if: $yes) ... @include(if: false) { c } }",
    )
    .unwrap()
    .with_variable("yes", true)
    .with_root_value(json!({"a": 1, "b": 2, "c": 3}));

    let response = run(&schema, request).await;

    assert_eq!(response.to_json(), json!({"data": {"a": 1}}));
}

/// Test that a resolver exceeding its deadline is cancelled.
#[tokio::test]
async fn test_resolver_timeout() {
    let schema = query_schema(vec![
        FieldDef::new("slow", TypeRef::named("String")).resolve_async(|_, _, _, _| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!("too late"))
        }),
        FieldDef::new("fast", TypeRef::named("String"))
            .resolve_async(|_, _, _, _| async { Ok(json!("done")) }),
    ]);
    let executor = Executor::with_config(ExecutorConfig::default().with_field_timeout_ms(20));
    let request = Request::parse("{ slow fast }").unwrap();

    let response = executor.execute(&schema, &request, &Context::new()).await;

    assert_eq!(response.data, Some(json!({"slow": null, "fast": "done"})));
    assert_eq!(
        response.errors[0].message,
        "Field \"Query.slow\" was cancelled after exceeding the 20ms deadline."
    );
}

/// Test that a panicking resolver becomes a field error.
#[tokio::test]
async fn test_resolver_panic_is_caught() {
    let schema = query_schema(vec![
        FieldDef::new("boom", TypeRef::named("String"))
            .resolve_fn(|_, _, _, _| panic!("kaboom")),
        FieldDef::new("fine", TypeRef::named("String"))
            .resolve_fn(|_, _, _, _| Ok(json!("ok"))),
    ]);

    let response = run(&schema, Request::parse("{ boom fine }").unwrap()).await;

    assert_eq!(response.data, Some(json!({"boom": null, "fine": "ok"})));
    assert_eq!(response.errors[0].message, "kaboom");
    assert_eq!(
        response.to_json()["errors"][0]["path"],
        json!(["boom"])
    );
}

/// Test that a resolver panicking before it returns a future is caught.
#[tokio::test]
async fn test_eager_resolver_panic_is_caught() {
    let schema = query_schema(vec![
        FieldDef::new("boom", TypeRef::named("String")).resolve_async(|_, _, _, _| {
            let slots: Vec<i32> = Vec::new();
            let _ = slots[3];
            async { Ok(json!("never")) }
        }),
        FieldDef::new("fine", TypeRef::named("String"))
            .resolve_fn(|_, _, _, _| Ok(json!("ok"))),
    ]);

    let response = run(&schema, Request::parse("{ boom fine }").unwrap()).await;

    assert_eq!(response.data, Some(json!({"boom": null, "fine": "ok"})));
    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].message.starts_with("index out of bounds"));
    assert_eq!(
        response.to_json()["errors"][0]["path"],
        json!(["boom"])
    );
}

fn ordering_schema(log: &Arc<Mutex<Vec<&'static str>>>) -> Schema {
    let record = |name: &'static str, delay: u64| {
        let log = Arc::clone(log);
        FieldDef::new(name, TypeRef::named("Int")).resolve_async(move |_, _, _, _| {
            let log = Arc::clone(&log);
            async move {
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                let mut log = log.lock().unwrap();
                log.push(name);
                Ok(json!(log.len()))
            }
        })
    };

    SchemaBuilder::new()
        .query_type("Query")
        .mutation_type("Mutation")
        .add_type(
            ObjectDef::new("Query")
                .field(record("first", 30))
                .field(record("second", 0)),
        )
        .add_type(
            ObjectDef::new("Mutation")
                .field(record("first", 30))
                .field(record("second", 0)),
        )
        .build()
        .unwrap()
}

/// Test that root mutation fields run one after another.
#[tokio::test]
async fn test_mutation_fields_run_serially() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = ordering_schema(&log);

    let response = run(&schema, Request::parse("mutation { first second }").unwrap()).await;

    assert_eq!(response.data, Some(json!({"first": 1, "second": 2})));
    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
}

/// Test that query fields resolve concurrently but keep selection order.
#[tokio::test]
async fn test_query_fields_keep_selection_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let schema = ordering_schema(&log);

    let response = run(&schema, Request::parse("{ first second }").unwrap()).await;

    assert_eq!(response.data, Some(json!({"first": 2, "second": 1})));
    let keys: Vec<_> = response.data.unwrap().as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["first", "second"]);
}

/// Test that errors are ordered depth-first regardless of completion order.
#[tokio::test]
async fn test_error_order_is_depth_first() {
    let schema = query_schema(vec![FieldDef::new(
        "items",
        TypeRef::list(TypeRef::named("Int")),
    )
    .resolve_async(|_, _, _, _| async { Ok(json!(["x", 1, "y"])) })]);

    let response = run(&schema, Request::parse("{ items }").unwrap()).await;

    assert_eq!(response.data, Some(json!({"items": [null, 1, null]})));
    let paths: Vec<_> = response
        .errors
        .iter()
        .map(|error| serde_json::to_value(&error.path).unwrap())
        .collect();
    assert_eq!(paths, vec![json!(["items", 0]), json!(["items", 2])]);
}

/// Test selecting one of several operations by name.
#[tokio::test]
async fn test_named_operation_selection() {
    let schema = query_schema(vec![
        FieldDef::new("a", TypeRef::named("Int")),
        FieldDef::new("b", TypeRef::named("Int")),
    ]);
    let source = "query A { a } query B { b }";

    let request = Request::parse(source)
        .unwrap()
        .with_operation_name("B")
        .with_root_value(json!({"a": 1, "b": 2}));
    assert_eq!(run(&schema, request).await.data, Some(json!({"b": 2})));

    let response = run(&schema, Request::parse(source).unwrap()).await;
    assert!(response.data.is_none());
    assert_eq!(
        response.errors[0].message,
        "Must provide operation name if query contains multiple operations."
    );
}
