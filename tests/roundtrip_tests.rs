//! Encode/decode round trips over representative documents.

use std::sync::Arc;

use jsonplan::catalog::{Catalog, ClassDef, FormatterDef, PropertyDef};
use jsonplan::error::TransformError;
use jsonplan::types::ScalarKind;
use jsonplan::{Config, Engine, Type, Value};
use pretty_assertions::assert_eq;

fn roundtrip(engine: &Engine, ty: &str, value: &Value, config: &Config) {
    let encoded = engine.encode_to_vec(ty, value, config).unwrap();
    let decoded = engine.decode(ty, &encoded, config).unwrap();
    assert!(decoded.is_complete());
    assert_eq!(&decoded.value, value);
}

#[test]
fn test_scalar_and_collection_round_trips() {
    let engine = Engine::builder(Arc::new(Catalog::new())).build();
    let config = Config::new();

    roundtrip(&engine, "int", &Value::Int(-42), &config);
    roundtrip(&engine, "float", &Value::Float(2.75), &config);
    roundtrip(&engine, "string", &Value::Str("héllo \"world\"".into()), &config);
    roundtrip(&engine, "bool", &Value::Bool(false), &config);
    roundtrip(
        &engine,
        "list<list<int>>",
        &Value::Seq(vec![
            Value::Seq(vec![Value::Int(1), Value::Int(2)]),
            Value::Seq(vec![]),
        ]),
        &config,
    );
    roundtrip(
        &engine,
        "dict<string,string>",
        &Value::map(vec![("a", Value::Str("x".into())), ("b,c", Value::Str("y".into()))]),
        &config,
    );
}

#[test]
fn test_nested_object_round_trip() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Address")
            .property(PropertyDef::new("city", "string"))
            .property(PropertyDef::new("zip", "?string")),
    );
    catalog.add_class(
        ClassDef::new("Person")
            .property(PropertyDef::new("name", "string"))
            .property(PropertyDef::new("age", "int"))
            .property(PropertyDef::new("addresses", "list<Address>")),
    );
    let engine = Engine::builder(Arc::new(catalog)).build();

    let value = Value::object(
        "Person",
        vec![
            ("name", Value::Str("Ada".into())),
            ("age", Value::Int(36)),
            (
                "addresses",
                Value::Seq(vec![
                    Value::object(
                        "Address",
                        vec![
                            ("city", Value::Str("London".into())),
                            ("zip", Value::Null),
                        ],
                    ),
                    Value::object("Address", vec![("city", Value::Str("Turin".into()))]),
                ]),
            ),
        ],
    );
    roundtrip(&engine, "Person", &value, &Config::new());
}

#[test]
fn test_formatter_round_trip_is_lossless() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("Job").property(PropertyDef::new("attempts", "int").formatter("stringify")),
    );
    let engine = Engine::builder(Arc::new(catalog))
        .formatter(FormatterDef::pure(
            "stringify",
            Type::int(),
            Type::string(),
            Arc::new(|value, _| match value.as_int() {
                Some(i) => Ok(Value::Str(i.to_string())),
                None => Err(TransformError::new("stringify", "expected int")),
            }),
            Arc::new(|value, _| match value.as_str().map(str::parse) {
                Some(Ok(i)) => Ok(Value::Int(i)),
                _ => Err(TransformError::new("stringify", "expected digit string")),
            }),
        ))
        .build();
    let config = Config::new();

    let value = Value::object("Job", vec![("attempts", Value::Int(12))]);
    let encoded = engine.encode_to_vec("Job", &value, &config).unwrap();
    // Wire side carries the formatter's output type.
    assert_eq!(encoded, br#"{"attempts":"12"}"#);
    let decoded = engine.decode("Job", &encoded, &config).unwrap();
    assert_eq!(decoded.value, value);
}

#[test]
fn test_renamed_property_round_trip() {
    let mut catalog = Catalog::new();
    catalog.add_class(
        ClassDef::new("User")
            .property(PropertyDef::new("full_name", "string").rename("fullName")),
    );
    let engine = Engine::builder(Arc::new(catalog)).build();
    let config = Config::new();

    let value = Value::object("User", vec![("full_name", Value::Str("Grace".into()))]);
    let encoded = engine.encode_to_vec("User", &value, &config).unwrap();
    assert_eq!(encoded, br#"{"fullName":"Grace"}"#);
    let decoded = engine.decode("User", &encoded, &config).unwrap();
    assert_eq!(decoded.value, value);
}

#[test]
fn test_enum_round_trip() {
    let mut catalog = Catalog::new();
    catalog.add_enum("Color", Some(ScalarKind::Str));
    catalog.add_class(ClassDef::new("Pixel").property(PropertyDef::new("color", "Color")));
    let engine = Engine::builder(Arc::new(catalog)).build();

    let value = Value::object("Pixel", vec![("color", Value::Str("red".into()))]);
    roundtrip(&engine, "Pixel", &value, &Config::new());
}

#[test]
fn test_pure_enum_passes_through_int_or_string() {
    let mut catalog = Catalog::new();
    catalog.add_enum("Status", None);
    catalog.add_class(ClassDef::new("Job").property(PropertyDef::new("status", "Status")));
    let engine = Engine::builder(Arc::new(catalog)).build();
    let config = Config::new();

    roundtrip(
        &engine,
        "Job",
        &Value::object("Job", vec![("status", Value::Str("queued".into()))]),
        &config,
    );
    roundtrip(
        &engine,
        "Job",
        &Value::object("Job", vec![("status", Value::Int(2))]),
        &config,
    );
}

#[test]
fn test_union_round_trip_with_selector() {
    let engine = Engine::builder(Arc::new(Catalog::new())).build();
    let config = Config::new().with_selector("int|string", "string");

    let value = Value::Seq(vec![Value::Str("a".into()), Value::Str("b".into())]);
    roundtrip(&engine, "list<int|string>", &value, &config);
}
