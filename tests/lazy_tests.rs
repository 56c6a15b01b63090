//! Lazy decode: boundary splitting and on-demand element instantiation.

use std::sync::Arc;

use jsonplan::catalog::{Catalog, ClassDef, PropertyDef};
use jsonplan::codec::split_list;
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
fn test_split_list_is_byte_exact() {
    let doc = br#"[1,[2,3],"a,b"]"#;
    let boundaries = split_list(doc, 0, doc.len()).unwrap();
    let slices: Vec<&[u8]> = boundaries.iter().map(|b| b.slice(doc)).collect();
    assert_eq!(slices, vec![&b"1"[..], &b"[2,3]"[..], &b"\"a,b\""[..]]);
}

#[test]
fn test_lazy_list_of_objects() {
    let engine = engine_with(point_catalog());
    let doc = br#"[{"x": 1, "y": 1}, {"x": 2, "y": 2}, {"x": 3, "y": 3}]"#;
    let lazy = engine
        .decode_lazy("list<Point>", doc, &Config::new())
        .unwrap();
    let list = lazy.as_list().unwrap();
    assert_eq!(list.len(), 3);

    let second = list.get(1).unwrap().unwrap();
    assert_eq!(
        second,
        &Value::object("Point", vec![("x", Value::Int(2)), ("y", Value::Int(2))])
    );
    // Memoized: a second access yields the same allocation.
    assert!(std::ptr::eq(second, list.get(1).unwrap().unwrap()));
    assert_eq!(list.get(3).unwrap(), None);
}

#[test]
fn test_lazy_matches_eager() {
    let engine = engine_with(point_catalog());
    let doc = br#"[{"x": 1, "y": 1}, {"x": 2, "y": 2}]"#;
    let config = Config::new();

    let eager = engine.decode("list<Point>", doc, &config).unwrap().value;
    let lazy = engine.decode_lazy("list<Point>", doc, &config).unwrap();
    assert_eq!(lazy.materialize().unwrap(), eager);
}

#[test]
fn test_lazy_dict_by_key() {
    let engine = engine_with(point_catalog());
    let doc = br#"{"origin": {"x": 0, "y": 0}, "unit": {"x": 1, "y": 1}}"#;
    let lazy = engine
        .decode_lazy("dict<string,Point>", doc, &Config::new())
        .unwrap();
    let dict = lazy.as_dict().unwrap();

    assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["origin", "unit"]);
    assert_eq!(
        dict.get("unit").unwrap(),
        Some(&Value::object(
            "Point",
            vec![("x", Value::Int(1)), ("y", Value::Int(1))]
        ))
    );
    assert_eq!(dict.get("nope").unwrap(), None);
}

#[test]
fn test_lazy_object_field_access() {
    let mut catalog = point_catalog();
    catalog.add_class(
        ClassDef::new("Segment")
            .property(PropertyDef::new("from", "Point"))
            .property(PropertyDef::new("to", "Point")),
    );
    let engine = engine_with(catalog);
    let doc = br#"{"from": {"x": 0, "y": 0}, "to": {"x": 5, "y": 5}}"#;
    let lazy = engine
        .decode_lazy("Segment", doc, &Config::new())
        .unwrap();
    let segment = lazy.as_object().unwrap();

    assert_eq!(segment.class(), "Segment");
    assert_eq!(
        segment.get("to").unwrap(),
        Some(&Value::object(
            "Point",
            vec![("x", Value::Int(5)), ("y", Value::Int(5))]
        ))
    );
    assert_eq!(segment.get("unknown").unwrap(), None);
}

#[test]
fn test_lazy_bad_element_fails_only_when_touched() {
    let engine = engine_with(Catalog::new());
    let doc = br#"[1, "nope", 3]"#;
    let lazy = engine
        .decode_lazy("list<int>", doc, &Config::new())
        .unwrap();
    let list = lazy.as_list().unwrap();

    assert_eq!(list.get(0).unwrap(), Some(&Value::Int(1)));
    assert_eq!(list.get(2).unwrap(), Some(&Value::Int(3)));
    assert!(list.get(1).is_err());
}

#[test]
fn test_lazy_structural_failure_is_immediate() {
    let engine = engine_with(Catalog::new());
    assert!(engine
        .decode_lazy("list<int>", br#"[1, 2"#, &Config::new())
        .is_err());
}
