//! Plan-driven JSON encoding. The encoder walks a compiled node tree
//! against a runtime `Value`, streaming text into any `io::Write`.

use std::io;

use crate::config::Config;
use crate::error::EncodeError;
use crate::plan::{
    Accessor, CollectionNode, CompositeNode, Node, ObjectNode, Phase, PlanSource, ScalarNode,
};
use crate::types::{ScalarKind, Type};
use crate::value::Value;

/// Encodes `value` against the compiled `node`, writing JSON to `out`.
/// Ghost object nodes are resolved through `plans` as they are reached.
pub fn encode<W: io::Write>(
    node: &Node,
    value: &Value,
    out: &mut W,
    config: &Config,
    plans: &dyn PlanSource,
) -> Result<(), EncodeError> {
    let mut encoder = Encoder {
        out,
        config,
        plans,
        path: String::from("$"),
        ghost_depth: 0,
    };
    encoder.node(node, value)
}

struct Encoder<'a, W: io::Write> {
    out: &'a mut W,
    config: &'a Config,
    plans: &'a dyn PlanSource,
    path: String,
    ghost_depth: usize,
}

impl<W: io::Write> Encoder<'_, W> {
    fn node(&mut self, node: &Node, value: &Value) -> Result<(), EncodeError> {
        match node {
            Node::Scalar(scalar) => self.scalar(scalar, value),
            Node::Collection(collection) => self.collection(collection, value),
            Node::Composite(composite) => self.composite(composite, value),
            Node::Object(object) => self.object(object, value),
        }
    }

    fn scalar(&mut self, node: &ScalarNode, value: &Value) -> Result<(), EncodeError> {
        let kind = match &node.ty {
            Type::Scalar(kind) => *kind,
            // Backing-less enums pass through whichever scalar they carry.
            Type::Enum { backing, .. } => match backing {
                Some(kind) => *kind,
                None => match value {
                    Value::Int(_) => ScalarKind::Int,
                    Value::Str(_) => ScalarKind::Str,
                    other => return Err(self.mismatch("int or string", other)),
                },
            },
            other => return Err(self.mismatch(&other.canonical(), value)),
        };
        match (kind, value) {
            (ScalarKind::Null, Value::Null) => self.raw(b"null"),
            (ScalarKind::Bool, Value::Bool(b)) => self.raw(if *b { b"true" } else { b"false" }),
            (ScalarKind::Int, Value::Int(i)) => self.json_int(*i),
            (ScalarKind::Float, Value::Float(f)) => {
                if !f.is_finite() {
                    return Err(EncodeError::TypeMismatch {
                        path: self.path.clone(),
                        expected: "finite float".to_string(),
                        actual: "non-finite float".to_string(),
                    });
                }
                self.json_float(*f)
            }
            (ScalarKind::Float, Value::Int(i)) => self.json_float(*i as f64),
            (ScalarKind::Str, Value::Str(s)) => self.json_str(s),
            (_, other) => Err(self.mismatch(kind.name(), other)),
        }
    }

    fn collection(&mut self, node: &CollectionNode, value: &Value) -> Result<(), EncodeError> {
        if node.ordered {
            let items = match value.as_seq() {
                Some(items) => items,
                None => return Err(self.mismatch("list", value)),
            };
            self.raw(b"[")?;
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    self.raw(b",")?;
                }
                let mark = self.enter_index(index);
                let result = self.node(&node.element, item);
                self.path.truncate(mark);
                result?;
            }
            self.raw(b"]")
        } else {
            let entries = match value.as_map() {
                Some(entries) => entries,
                None => return Err(self.mismatch("dict", value)),
            };
            self.raw(b"{")?;
            for (index, (key, item)) in entries.iter().enumerate() {
                if index > 0 {
                    self.raw(b",")?;
                }
                self.json_str(key)?;
                self.raw(b":")?;
                let mark = self.enter_field(key);
                let result = self.node(&node.element, item);
                self.path.truncate(mark);
                result?;
            }
            self.raw(b"}")
        }
    }

    fn composite(&mut self, node: &CompositeNode, value: &Value) -> Result<(), EncodeError> {
        if value.is_null() {
            if node.nullable {
                return self.raw(b"null");
            }
            return Err(EncodeError::NoUnionMember {
                path: self.path.clone(),
                union: node.ty.canonical(),
            });
        }
        // Members are sorted deterministically at build time; the first
        // shape match wins.
        for member in &node.members {
            if shape_matches(member, value) {
                return self.node(member, value);
            }
        }
        Err(EncodeError::NoUnionMember {
            path: self.path.clone(),
            union: node.ty.canonical(),
        })
    }

    fn object(&mut self, node: &ObjectNode, value: &Value) -> Result<(), EncodeError> {
        if node.ghost {
            self.ghost_depth += 1;
            if self.ghost_depth > self.config.max_depth {
                return Err(EncodeError::CircularReference {
                    identity: node.identity.clone(),
                    depth: self.ghost_depth,
                });
            }
            let resolved = self.plans.resolve(&node.ty, self.config, Phase::Encode)?;
            let result = self.node(&resolved, value);
            self.ghost_depth -= 1;
            return result;
        }

        if value.as_object().is_none() && value.as_map().is_none() {
            return Err(self.mismatch(&node.identity, value));
        }

        self.raw(b"{")?;
        let mut first = true;
        for property in &node.properties {
            let field = match &property.accessor {
                Accessor::Read(read) => read(value, self.config)?,
                // Decode-phase accessor in an encode plan cannot happen;
                // plans are keyed by phase.
                Accessor::Write(_) => None,
            };
            let field = match field {
                Some(field) => field,
                // Absent fields are skipped, not encoded as null.
                None => continue,
            };
            if !first {
                self.raw(b",")?;
            }
            first = false;
            self.json_str(&property.wire_name)?;
            self.raw(b":")?;
            let mark = self.enter_field(&property.wire_name);
            let result = self.node(&property.node, &field);
            self.path.truncate(mark);
            result?;
        }
        self.raw(b"}")
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    fn json_int(&mut self, value: i64) -> Result<(), EncodeError> {
        serde_json::to_writer(&mut *self.out, &value).map_err(io::Error::from)?;
        Ok(())
    }

    fn json_float(&mut self, value: f64) -> Result<(), EncodeError> {
        serde_json::to_writer(&mut *self.out, &value).map_err(io::Error::from)?;
        Ok(())
    }

    fn json_str(&mut self, value: &str) -> Result<(), EncodeError> {
        serde_json::to_writer(&mut *self.out, value).map_err(io::Error::from)?;
        Ok(())
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

    fn mismatch(&self, expected: &str, actual: &Value) -> EncodeError {
        EncodeError::TypeMismatch {
            path: self.path.clone(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }
}

/// Runtime shape test used to pick a union member. Object members match on
/// class identity when the value carries one.
fn shape_matches(node: &Node, value: &Value) -> bool {
    match node {
        Node::Scalar(scalar) => match &scalar.ty {
            Type::Scalar(ScalarKind::Null) => value.is_null(),
            Type::Scalar(ScalarKind::Bool) => matches!(value, Value::Bool(_)),
            Type::Scalar(ScalarKind::Int) => matches!(value, Value::Int(_)),
            Type::Scalar(ScalarKind::Float) => matches!(value, Value::Float(_) | Value::Int(_)),
            Type::Scalar(ScalarKind::Str) => matches!(value, Value::Str(_)),
            Type::Enum { backing, .. } => match backing {
                Some(ScalarKind::Str) => matches!(value, Value::Str(_)),
                Some(ScalarKind::Int) => matches!(value, Value::Int(_)),
                Some(ScalarKind::Float) => matches!(value, Value::Float(_) | Value::Int(_)),
                Some(ScalarKind::Bool) => matches!(value, Value::Bool(_)),
                Some(ScalarKind::Null) => value.is_null(),
                None => matches!(value, Value::Int(_) | Value::Str(_)),
            },
            _ => false,
        },
        Node::Collection(collection) => {
            if collection.ordered {
                matches!(value, Value::Seq(_))
            } else {
                matches!(value, Value::Map(_))
            }
        }
        Node::Object(object) => match value {
            Value::Object(obj) => obj.class == object.identity,
            Value::Map(_) => true,
            _ => false,
        },
        // Composite members are flattened at build time.
        Node::Composite(_) => false,
    }
}
