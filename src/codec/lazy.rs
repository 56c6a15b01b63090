//! Lazy decoding. The document is split into boundaries up front; each
//! element is decoded eagerly, but only on first access, then memoized.
//! Views borrow the backing buffer, so the caller keeps it alive for the
//! lifetime of the lazy value.

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use serde_json::Value as Json;

use crate::config::Config;
use crate::error::DecodeError;
use crate::plan::{Node, Phase, PlanSource};
use crate::value::{ObjectValue, Value};

use super::decoder;
use super::splitter::{self, Boundary};

/// A lazily decoded document. Scalar roots decode immediately; containers
/// defer their elements behind memoizing cells. Views are single-threaded
/// by construction.
pub enum LazyValue<'a> {
    Scalar(Value),
    List(LazyList<'a>),
    Dict(LazyDict<'a>),
    Object(LazyObject<'a>),
}

/// Builds a lazy view of `buf` for the compiled `node`. Splitting happens
/// now; element decoding happens on access.
pub fn decode_lazy<'a>(
    node: &Node,
    buf: &'a [u8],
    config: Config,
    plans: &'a dyn PlanSource,
) -> Result<LazyValue<'a>, DecodeError> {
    match node {
        Node::Collection(collection) if collection.ordered => {
            let items = splitter::split_list(buf, 0, buf.len())?
                .into_iter()
                .map(|boundary| (boundary, OnceCell::new()))
                .collect();
            Ok(LazyValue::List(LazyList {
                buf,
                element: (*collection.element).clone(),
                items,
                config,
                plans,
            }))
        }
        Node::Collection(collection) => {
            let entries = splitter::split_dict(buf, 0, buf.len())?
                .into_iter()
                .map(|(key, boundary)| (key, boundary, OnceCell::new()))
                .collect();
            Ok(LazyValue::Dict(LazyDict {
                buf,
                element: (*collection.element).clone(),
                entries,
                config,
                plans,
            }))
        }
        Node::Object(object) if object.ghost => {
            let resolved = plans.resolve(&object.ty, &config, Phase::Decode)?;
            decode_lazy(&resolved, buf, config, plans)
        }
        Node::Object(object) => {
            let boundaries: HashMap<String, Boundary> = splitter::split_dict(buf, 0, buf.len())?
                .into_iter()
                .collect();
            let cells = object.properties.iter().map(|_| OnceCell::new()).collect();
            Ok(LazyValue::Object(LazyObject {
                buf,
                node: object.clone(),
                boundaries,
                cells,
                config,
                plans,
            }))
        }
        Node::Composite(composite) => {
            if composite.nullable && is_null_document(buf) {
                return Ok(LazyValue::Scalar(Value::Null));
            }
            if composite.members.len() == 1 {
                return decode_lazy(&composite.members[0], buf, config, plans);
            }
            match selected_member(composite, &config)? {
                // Container members stay lazy; scalar members (with their
                // lenient coercion) go through the eager path.
                member @ (Node::Collection(_) | Node::Object(_)) => {
                    decode_lazy(member, buf, config, plans)
                }
                _ => eager(node, buf, 0, buf.len(), &config, plans).map(LazyValue::Scalar),
            }
        }
        Node::Scalar(_) => eager(node, buf, 0, buf.len(), &config, plans).map(LazyValue::Scalar),
    }
}

impl LazyValue<'_> {
    /// Forces every deferred element and returns the fully decoded value.
    pub fn materialize(&self) -> Result<Value, DecodeError> {
        match self {
            LazyValue::Scalar(value) => Ok(value.clone()),
            LazyValue::List(list) => list.materialize(),
            LazyValue::Dict(dict) => dict.materialize(),
            LazyValue::Object(object) => object.materialize(),
        }
    }

    pub fn as_list(&self) -> Option<&LazyList<'_>> {
        match self {
            LazyValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&LazyDict<'_>> {
        match self {
            LazyValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&LazyObject<'_>> {
        match self {
            LazyValue::Object(object) => Some(object),
            _ => None,
        }
    }
}

/// Deferred list elements keyed by position.
pub struct LazyList<'a> {
    buf: &'a [u8],
    element: Node,
    items: Vec<(Boundary, OnceCell<Value>)>,
    config: Config,
    plans: &'a dyn PlanSource,
}

impl LazyList<'_> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Decodes the element at `index` on first access and memoizes it.
    pub fn get(&self, index: usize) -> Result<Option<&Value>, DecodeError> {
        let (boundary, cell) = match self.items.get(index) {
            Some(item) => item,
            None => return Ok(None),
        };
        let value = cell.get_or_try_init(|| {
            eager(
                &self.element,
                self.buf,
                boundary.offset,
                boundary.length,
                &self.config,
                self.plans,
            )
        })?;
        Ok(Some(value))
    }

    pub fn materialize(&self) -> Result<Value, DecodeError> {
        let mut out = Vec::with_capacity(self.items.len());
        for index in 0..self.items.len() {
            if let Some(value) = self.get(index)? {
                out.push(value.clone());
            }
        }
        Ok(Value::Seq(out))
    }
}

/// Deferred dict entries keyed by decoded key.
pub struct LazyDict<'a> {
    buf: &'a [u8],
    element: Node,
    entries: Vec<(String, Boundary, OnceCell<Value>)>,
    config: Config,
    plans: &'a dyn PlanSource,
}

impl LazyDict<'_> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _, _)| key.as_str())
    }

    pub fn get(&self, key: &str) -> Result<Option<&Value>, DecodeError> {
        let entry = self.entries.iter().find(|(k, _, _)| k == key);
        let (_, boundary, cell) = match entry {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let value = cell.get_or_try_init(|| {
            eager(
                &self.element,
                self.buf,
                boundary.offset,
                boundary.length,
                &self.config,
                self.plans,
            )
        })?;
        Ok(Some(value))
    }

    pub fn materialize(&self) -> Result<Value, DecodeError> {
        let mut out = IndexMap::with_capacity(self.entries.len());
        for (key, _, _) in &self.entries {
            if let Some(value) = self.get(key)? {
                out.insert(key.clone(), value.clone());
            }
        }
        Ok(Value::Map(out))
    }
}

/// Deferred object fields, addressed by declared property name.
pub struct LazyObject<'a> {
    buf: &'a [u8],
    node: crate::plan::ObjectNode,
    boundaries: HashMap<String, Boundary>,
    cells: Vec<OnceCell<Value>>,
    config: Config,
    plans: &'a dyn PlanSource,
}

impl LazyObject<'_> {
    pub fn class(&self) -> &str {
        &self.node.identity
    }

    /// Decodes one field on first access. `Ok(None)` means the property is
    /// not in the plan or its wire field is absent from the document.
    pub fn get(&self, name: &str) -> Result<Option<&Value>, DecodeError> {
        let index = match self
            .node
            .properties
            .iter()
            .position(|p| p.declared_name == name)
        {
            Some(index) => index,
            None => return Ok(None),
        };
        let property = &self.node.properties[index];
        let boundary = match self.boundaries.get(&property.wire_name) {
            Some(boundary) => *boundary,
            None => return Ok(None),
        };
        let value = self.cells[index].get_or_try_init(|| -> Result<Value, DecodeError> {
            let decoded = eager(
                &property.node,
                self.buf,
                boundary.offset,
                boundary.length,
                &self.config,
                self.plans,
            )?;
            match &property.accessor {
                crate::plan::Accessor::Write(write) => Ok(write(decoded, &self.config)?),
                crate::plan::Accessor::Read(_) => Ok(decoded),
            }
        })?;
        Ok(Some(value))
    }

    pub fn materialize(&self) -> Result<Value, DecodeError> {
        let mut fields = IndexMap::with_capacity(self.node.properties.len());
        for property in &self.node.properties {
            if let Some(value) = self.get(&property.declared_name)? {
                fields.insert(property.declared_name.clone(), value.clone());
            }
        }
        Ok(Value::Object(ObjectValue {
            class: self.node.identity.clone(),
            fields,
        }))
    }
}

/// Parses one fragment and runs the eager decoder over it. Parse failures
/// surface as malformed-document errors at the fragment's absolute offset.
fn eager(
    node: &Node,
    buf: &[u8],
    offset: usize,
    length: usize,
    config: &Config,
    plans: &dyn PlanSource,
) -> Result<Value, DecodeError> {
    let fragment = &buf[offset..offset + length];
    let parsed: Json =
        serde_json::from_slice(fragment).map_err(|err| DecodeError::MalformedDocument {
            offset,
            message: err.to_string(),
        })?;
    Ok(decoder::decode(node, &parsed, config, plans)?.value)
}

fn selected_member<'n>(
    composite: &'n crate::plan::CompositeNode,
    config: &Config,
) -> Result<&'n Node, DecodeError> {
    let union = composite.ty.canonical();
    let member = match config.union_selector.get(&union) {
        Some(member) => member.clone(),
        None => {
            return Err(DecodeError::AmbiguousUnion {
                path: String::from("$"),
                union,
            })
        }
    };
    composite
        .members
        .iter()
        .find(|m| m.ty().canonical() == member)
        .ok_or(DecodeError::UnknownUnionMember { union, member })
}

fn is_null_document(buf: &[u8]) -> bool {
    let trimmed = buf
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|start| {
            let end = buf.len()
                - buf
                    .iter()
                    .rev()
                    .position(|b| !b.is_ascii_whitespace())
                    .unwrap_or(0);
            &buf[start..end]
        })
        .unwrap_or(b"");
    trimmed == b"null"
}
