//! Encode executor behavior through the engine surface.

use std::sync::Arc;

use jsonplan::catalog::{Catalog, ClassDef, FormatterDef, PropertyDef};
use jsonplan::error::{EncodeError, PlanError, TransformError};
use jsonplan::{Config, Engine, Value};
use pretty_assertions::assert_eq;

fn engine_with(catalog: Catalog) -> Engine {
    Engine::builder(Arc::new(catalog)).build()
}

fn encode(engine: &Engine, ty: &str, value: &Value, config: &Config) -> Result<String, PlanError> {
    let bytes = engine.encode_to_vec(ty, value, config)?;
    Ok(String::from_utf8(bytes).unwrap())
}

#[test]
fn test_encode_nested_document() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Order")
            .property(PropertyDef::new("id", "int"))
            .property(PropertyDef::new("tags", "list<string>"))
            .property(PropertyDef::new("totals", "dict<string,float>"))
            .property(PropertyDef::new("note", "?string")),
    );
    let engine = engine_with(catalog);

    let value = Value::object(
        "Order",
        vec![
            ("id", Value::Int(7)),
            (
                "tags",
                Value::Seq(vec![Value::Str("new".into()), Value::Str("rush".into())]),
            ),
            ("totals", Value::map(vec![("net", Value::Float(9.5))])),
            ("note", Value::Null),
        ],
    );
    assert_eq!(
        encode(&engine, "Order", &value, &Config::new()).unwrap(),
        r#"{"id":7,"tags":["new","rush"],"totals":{"net":9.5},"note":null}"#
    );
}

#[test]
fn test_group_filter_keeps_declaration_order() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Report")
            .property(PropertyDef::new("a", "int").group("one"))
            .property(PropertyDef::new("b", "int").group("one").group("two"))
            .property(PropertyDef::new("c", "int").group("two").group("three")),
    );
    let engine = engine_with(catalog);
    let value = Value::object(
        "Report",
        vec![
            ("a", Value::Int(1)),
            ("b", Value::Int(2)),
            ("c", Value::Int(3)),
        ],
    );

    let config = Config::new().with_group("one");
    assert_eq!(
        encode(&engine, "Report", &value, &config).unwrap(),
        r#"{"a":1,"b":2}"#
    );

    // No configured groups means no filtering.
    assert_eq!(
        encode(&engine, "Report", &value, &Config::new()).unwrap(),
        r#"{"a":1,"b":2,"c":3}"#
    );
}

#[test]
fn test_group_filter_does_not_affect_decode() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Report")
            .property(PropertyDef::new("a", "int").group("one"))
            .property(PropertyDef::new("c", "int").group("two")),
    );
    let engine = engine_with(catalog);

    let config = Config::new().with_group("one");
    let decoded = engine
        .decode("Report", br#"{"a":1,"c":3}"#, &config)
        .unwrap();
    assert_eq!(
        decoded.value,
        Value::object("Report", vec![("a", Value::Int(1)), ("c", Value::Int(3))])
    );
}

#[test]
fn test_formatter_runs_forward_on_encode() {
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
                Some(_) => Ok(Value::Str("error".into())),
                None => Err(TransformError::new("level_name", "expected int")),
            }),
            Arc::new(|value, _| match value.as_str() {
                Some("info") => Ok(Value::Int(0)),
                Some(_) => Ok(Value::Int(1)),
                None => Err(TransformError::new("level_name", "expected string")),
            }),
        ))
        .build();

    let value = Value::object("Event", vec![("level", Value::Int(0))]);
    assert_eq!(
        encode(&engine, "Event", &value, &Config::new()).unwrap(),
        r#"{"level":"info"}"#
    );
}

#[test]
fn test_union_encode_by_runtime_shape() {
    let engine = engine_with(Catalog::new());
    let config = Config::new();
    assert_eq!(
        encode(&engine, "list<int|string>", &Value::Seq(vec![
            Value::Int(1),
            Value::Str("two".into()),
        ]), &config)
        .unwrap(),
        r#"[1,"two"]"#
    );
}

#[test]
fn test_type_mismatch_carries_wire_path() {
    let mut catalog = Catalog::new();
    catalog.add_class(ClassDef::new("Point").property(PropertyDef::new("x", "int")));
    let engine = engine_with(catalog);
    let value = Value::object("Point", vec![("x", Value::Str("oops".into()))]);

    match engine.encode_to_vec("Point", &value, &Config::new()) {
        Err(PlanError::Encode(EncodeError::TypeMismatch { path, expected, .. })) => {
            assert_eq!(path, "$.x");
            assert_eq!(expected, "int");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_recursive_value_past_depth_is_circular() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Tree")
            .property(PropertyDef::new("label", "string"))
            .property(PropertyDef::new("child", "?Tree")),
    );
    let engine = engine_with(catalog);

    fn tree(depth: usize) -> Value {
        let mut fields = vec![("label", Value::Str(format!("n{depth}")))];
        if depth > 0 {
            fields.push(("child", tree(depth - 1)));
        }
        Value::object("Tree", fields)
    }

    let shallow = Config::new().with_max_depth(3);
    assert!(engine.encode_to_vec("Tree", &tree(2), &shallow).is_ok());

    match engine.encode_to_vec("Tree", &tree(10), &shallow) {
        Err(PlanError::Encode(EncodeError::CircularReference { identity, .. })) => {
            assert_eq!(identity, "Tree");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}
