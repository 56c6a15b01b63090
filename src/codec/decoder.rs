//! Eager plan-driven decoding. The decoder walks a compiled node tree
//! against a parsed `serde_json::Value`, producing a native `Value` and,
//! under `collect_errors`, a list of per-element recoveries.

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::config::Config;
use crate::error::DecodeError;
use crate::plan::{
    Accessor, CollectionNode, CompositeNode, Node, ObjectNode, Phase, PlanSource, ScalarNode,
};
use crate::types::{ScalarKind, Type};
use crate::value::{ObjectValue, Value};

/// The outcome of a decode. Without `collect_errors` the error list is
/// always empty and the first failure aborts the call instead.
#[derive(Debug)]
pub struct PartialResult {
    pub value: Value,
    pub errors: Vec<DecodeError>,
}

impl PartialResult {
    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decodes `doc` against the compiled `node`. Ghost object nodes are
/// resolved through `plans` as they are reached.
pub fn decode(
    node: &Node,
    doc: &Json,
    config: &Config,
    plans: &dyn PlanSource,
) -> Result<PartialResult, DecodeError> {
    let mut decoder = Decoder {
        config,
        plans,
        path: String::from("$"),
        errors: Vec::new(),
    };
    let value = decoder.node(node, doc)?;
    Ok(PartialResult {
        value,
        errors: decoder.errors,
    })
}

struct Decoder<'a> {
    config: &'a Config,
    plans: &'a dyn PlanSource,
    path: String,
    errors: Vec<DecodeError>,
}

impl Decoder<'_> {
    fn node(&mut self, node: &Node, doc: &Json) -> Result<Value, DecodeError> {
        match node {
            Node::Scalar(scalar) => self.scalar(scalar, doc, false),
            Node::Collection(collection) => self.collection(collection, doc),
            Node::Composite(composite) => self.composite(composite, doc),
            Node::Object(object) => self.object(object, doc),
        }
    }

    /// `lenient` enables scalar coercion (digit strings to numbers, numbers
    /// to strings) for selector-chosen union members.
    fn scalar(&mut self, node: &ScalarNode, doc: &Json, lenient: bool) -> Result<Value, DecodeError> {
        let kind = match &node.ty {
            Type::Scalar(kind) => *kind,
            Type::Enum { backing, .. } => match backing {
                Some(kind) => *kind,
                None => match doc {
                    Json::Number(n) if n.is_i64() => ScalarKind::Int,
                    Json::String(_) => ScalarKind::Str,
                    other => return Err(self.unexpected("int or string", other)),
                },
            },
            other => return Err(self.unexpected(&other.canonical(), doc)),
        };
        match (kind, doc) {
            (ScalarKind::Null, Json::Null) => Ok(Value::Null),
            (ScalarKind::Bool, Json::Bool(b)) => Ok(Value::Bool(*b)),
            (ScalarKind::Int, Json::Number(n)) if n.is_i64() => {
                Ok(Value::Int(n.as_i64().unwrap_or_default()))
            }
            (ScalarKind::Float, Json::Number(n)) => {
                Ok(Value::Float(n.as_f64().unwrap_or_default()))
            }
            (ScalarKind::Str, Json::String(s)) => Ok(Value::Str(s.clone())),
            (ScalarKind::Int, Json::String(s)) if lenient => match s.parse::<i64>() {
                Ok(i) => Ok(Value::Int(i)),
                Err(_) => Err(self.unexpected(kind.name(), doc)),
            },
            (ScalarKind::Float, Json::String(s)) if lenient => match s.parse::<f64>() {
                Ok(f) => Ok(Value::Float(f)),
                Err(_) => Err(self.unexpected(kind.name(), doc)),
            },
            (ScalarKind::Str, Json::Number(n)) if lenient => Ok(Value::Str(n.to_string())),
            (_, other) => Err(self.unexpected(kind.name(), other)),
        }
    }

    fn collection(&mut self, node: &CollectionNode, doc: &Json) -> Result<Value, DecodeError> {
        if node.ordered {
            let items = match doc {
                Json::Array(items) => items,
                other => return Err(self.unexpected("list", other)),
            };
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let mark = self.enter_index(index);
                let decoded = self.node(&node.element, item);
                self.path.truncate(mark);
                match decoded {
                    Ok(value) => out.push(value),
                    Err(err) if self.recoverable(&err) => {
                        // Sentinel keeps surviving elements at their index.
                        self.errors.push(err);
                        out.push(Value::Null);
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(Value::Seq(out))
        } else {
            let entries = match doc {
                Json::Object(entries) => entries,
                other => return Err(self.unexpected("dict", other)),
            };
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                let mark = self.enter_field(key);
                let decoded = self.entry(node, key, item);
                self.path.truncate(mark);
                match decoded {
                    Ok(value) => {
                        out.insert(key.clone(), value);
                    }
                    Err(err) if self.recoverable(&err) => {
                        // Failed entries are dropped, not replaced.
                        self.errors.push(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(Value::Map(out))
        }
    }

    fn entry(&mut self, node: &CollectionNode, key: &str, item: &Json) -> Result<Value, DecodeError> {
        if let Some(key_node) = &node.key {
            // Non-trivial key types (enums and the like) are validated
            // against the key text; the map itself keeps string keys.
            self.node(key_node, &Json::String(key.to_string()))?;
        }
        self.node(&node.element, item)
    }

    fn composite(&mut self, node: &CompositeNode, doc: &Json) -> Result<Value, DecodeError> {
        if doc.is_null() && node.nullable {
            return Ok(Value::Null);
        }
        if node.members.len() == 1 {
            return self.node(&node.members[0], doc);
        }

        let union = node.ty.canonical();
        let member = match self.config.union_selector.get(&union) {
            Some(member) => member.clone(),
            None => {
                return Err(DecodeError::AmbiguousUnion {
                    path: self.path.clone(),
                    union,
                })
            }
        };
        let selected = node
            .members
            .iter()
            .find(|m| m.ty().canonical() == member)
            .ok_or(DecodeError::UnknownUnionMember { union, member })?;

        match selected {
            Node::Scalar(scalar) => self.scalar(scalar, doc, true),
            other => self.node(other, doc),
        }
    }

    fn object(&mut self, node: &ObjectNode, doc: &Json) -> Result<Value, DecodeError> {
        if node.ghost {
            let resolved = self.plans.resolve(&node.ty, self.config, Phase::Decode)?;
            return self.node(&resolved, doc);
        }

        let entries = match doc {
            Json::Object(entries) => entries,
            other => return Err(self.unexpected(&node.identity, other)),
        };

        let mut fields = IndexMap::with_capacity(node.properties.len());
        for property in &node.properties {
            let wire = match entries.get(&property.wire_name) {
                Some(wire) => wire,
                // Missing wire fields keep their default; nothing to decode.
                None => continue,
            };
            let mark = self.enter_field(&property.wire_name);
            let decoded = self.property(property, wire);
            self.path.truncate(mark);
            match decoded {
                Ok(value) => {
                    fields.insert(property.declared_name.clone(), value);
                }
                Err(err) if self.recoverable(&err) => {
                    self.errors.push(err);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(Value::Object(ObjectValue {
            class: node.identity.clone(),
            fields,
        }))
    }

    fn property(
        &mut self,
        property: &crate::plan::Property,
        wire: &Json,
    ) -> Result<Value, DecodeError> {
        let decoded = self.node(&property.node, wire)?;
        match &property.accessor {
            Accessor::Write(write) => Ok(write(decoded, self.config)?),
            // Encode-phase accessor in a decode plan cannot happen; plans
            // are keyed by phase.
            Accessor::Read(_) => Ok(decoded),
        }
    }

    fn recoverable(&self, err: &DecodeError) -> bool {
        self.config.collect_errors && err.is_recoverable()
    }

    fn enter_field(&mut self, name: &str) -> usize {
        let mark = self.path.len();
        self.path.push('.');
        self.path.push_str(name);
        mark
    }

    fn enter_index(&mut self, index: usize) -> usize {
        let mark = self.path.len();
        self.path.push('[');
        self.path.push_str(&index.to_string());
        self.path.push(']');
        mark
    }

    fn unexpected(&self, expected: &str, actual: &Json) -> DecodeError {
        DecodeError::UnexpectedType {
            path: self.path.clone(),
            expected: expected.to_string(),
            actual: json_type_name(actual).to_string(),
        }
    }
}

pub(crate) fn json_type_name(doc: &Json) -> &'static str {
    match doc {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_i64() || n.is_u64() => "int",
        Json::Number(_) => "float",
        Json::String(_) => "string",
        Json::Array(_) => "list",
        Json::Object(_) => "dict",
    }
}
