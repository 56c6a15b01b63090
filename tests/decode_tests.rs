//! Eager decode behavior: strict shapes, union selectors, error collection.

use std::sync::Arc;

use jsonplan::catalog::{Catalog, ClassDef, FormatterDef, PropertyDef};
use jsonplan::error::{DecodeError, PlanError, TransformError};
use jsonplan::{Config, Engine, Value};
use pretty_assertions::assert_eq;

fn engine_with(catalog: Catalog) -> Engine {
    Engine::builder(Arc::new(catalog)).build()
}

fn point_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Point")
            .property(PropertyDef::new("x", "int"))
            .property(PropertyDef::new("y", "int")),
    );
    catalog
}

#[test]
fn test_missing_wire_fields_are_skipped() {
    let engine = engine_with(point_catalog());
    let decoded = engine
        .decode("Point", br#"{"y": 2, "extra": true}"#, &Config::new())
        .unwrap();
    assert!(decoded.is_complete());
    assert_eq!(decoded.value, Value::object("Point", vec![("y", Value::Int(2))]));
}

#[test]
fn test_shape_error_carries_path_and_aborts() {
    let engine = engine_with(point_catalog());
    match engine.decode("list<Point>", br#"[{"x":1,"y":2},{"x":[],"y":4}]"#, &Config::new()) {
        Err(PlanError::Decode(DecodeError::UnexpectedType { path, expected, actual })) => {
            assert_eq!(path, "$[1].x");
            assert_eq!(expected, "int");
            assert_eq!(actual, "list");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_partial_decode_collects_per_element_errors() {
    let engine = engine_with(point_catalog());
    let doc = br#"[
        {"x": 1, "y": 1},
        {"x": "bad", "y": 2},
        {"x": 3, "y": 3},
        {"x": 4, "y": {}}
    ]"#;
    let config = Config::new().collecting_errors();
    let result = engine.decode("list<Point>", doc, &config).unwrap();

    assert_eq!(result.errors.len(), 2);
    let seq = result.value.as_seq().unwrap();
    assert_eq!(seq.len(), 4);
    // Bad fields are dropped; their elements survive.
    assert_eq!(seq[0], Value::object("Point", vec![("x", Value::Int(1)), ("y", Value::Int(1))]));
    assert_eq!(seq[1], Value::object("Point", vec![("y", Value::Int(2))]));
    assert_eq!(seq[3], Value::object("Point", vec![("x", Value::Int(4))]));
}

#[test]
fn test_whole_element_failure_leaves_null_sentinel() {
    let engine = engine_with(Catalog::new());
    let config = Config::new().collecting_errors();
    let result = engine.decode("list<int>", br#"[1, true, 3]"#, &config).unwrap();
    assert_eq!(
        result.value,
        Value::Seq(vec![Value::Int(1), Value::Null, Value::Int(3)])
    );
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn test_union_needs_selector_and_coerces_when_selected() {
    let engine = engine_with(Catalog::new());

    match engine.decode("list<int|string>", br#"[1,"2","3"]"#, &Config::new()) {
        Err(PlanError::Decode(DecodeError::AmbiguousUnion { union, .. })) => {
            assert_eq!(union, "int|string");
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let config = Config::new().with_selector("int|string", "int");
    let result = engine
        .decode("list<int|string>", br#"[1,"2","3"]"#, &config)
        .unwrap();
    assert_eq!(
        result.value,
        Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    let config = Config::new().with_selector("int|string", "float");
    match engine.decode("list<int|string>", br#"[1]"#, &config) {
        Err(PlanError::Decode(DecodeError::UnknownUnionMember { member, .. })) => {
            assert_eq!(member, "float");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_nullable_decodes_without_selector() {
    let engine = engine_with(point_catalog());
    let config = Config::new();
    let result = engine.decode("?Point", b"null", &config).unwrap();
    assert_eq!(result.value, Value::Null);

    let result = engine.decode("?Point", br#"{"x":1,"y":2}"#, &config).unwrap();
    assert_eq!(
        result.value,
        Value::object("Point", vec![("x", Value::Int(1)), ("y", Value::Int(2))])
    );
}

#[test]
fn test_formatter_runs_backward_on_decode() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Event").property(PropertyDef::new("level", "int").formatter("level_name")),
    );
    let engine = Engine::builder(Arc::new(catalog))
        .formatter(FormatterDef::pure(
            "level_name",
            jsonplan::Type::int(),
            jsonplan::Type::string(),
            Arc::new(|value, _| match value.as_int() {
                Some(0) => Ok(Value::Str("info".into())),
                _ => Ok(Value::Str("error".into())),
            }),
            Arc::new(|value, _| match value.as_str() {
                Some("info") => Ok(Value::Int(0)),
                Some(_) => Ok(Value::Int(1)),
                None => Err(TransformError::new("level_name", "expected string")),
            }),
        ))
        .build();

    let result = engine
        .decode("Event", br#"{"level":"info"}"#, &Config::new())
        .unwrap();
    assert_eq!(result.value, Value::object("Event", vec![("level", Value::Int(0))]));
}

#[test]
fn test_generic_class_substitutes_arguments() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Pair")
            .param("A")
            .param("B")
            .property(PropertyDef::new("first", "A"))
            .property(PropertyDef::new("second", "list<B>")),
    );
    let engine = engine_with(catalog);
    let result = engine
        .decode(
            "Pair<int,string>",
            br#"{"first": 1, "second": ["a", "b"]}"#,
            &Config::new(),
        )
        .unwrap();
    assert_eq!(
        result.value,
        Value::object(
            "Pair",
            vec![
                ("first", Value::Int(1)),
                (
                    "second",
                    Value::Seq(vec![Value::Str("a".into()), Value::Str("b".into())])
                ),
            ]
        )
    );
}

#[test]
fn test_recursive_document_decodes_through_ghosts() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Tree")
            .property(PropertyDef::new("label", "string"))
            .property(PropertyDef::new("child", "?Tree")),
    );
    let engine = engine_with(catalog);
    let doc = br#"{"label": "root", "child": {"label": "leaf", "child": null}}"#;
    let result = engine.decode("Tree", doc, &Config::new()).unwrap();
    assert_eq!(
        result.value,
        Value::object(
            "Tree",
            vec![
                ("label", Value::Str("root".into())),
                (
                    "child",
                    Value::object(
                        "Tree",
                        vec![("label", Value::Str("leaf".into())), ("child", Value::Null)]
                    )
                ),
            ]
        )
    );
}

#[test]
fn test_malformed_document_aborts_even_when_collecting() {
    let engine = engine_with(Catalog::new());
    let config = Config::new().collecting_errors();
    match engine.decode("list<int>", br#"[1, 2"#, &config) {
        Err(PlanError::Decode(DecodeError::MalformedDocument { .. })) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}
