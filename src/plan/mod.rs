//! The compiled execution plan: node trees, build context, hooks and the
//! plan cache.

pub(crate) mod builder;
pub mod cache;
pub mod hooks;

pub use cache::{PlanCache, PlanKey};
pub use hooks::{Hook, HookSet, PropertyOverride, TypeOverride};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{BuildError, TransformError};
use crate::types::Type;
use crate::value::Value;

/// Which executor a plan is compiled for. Encode and decode plans differ
/// (group filtering is encode-only and accessors run in opposite
/// directions), so the phase is part of the plan-cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Encode,
    Decode,
}

/// Reads a property's wire-side value out of an enclosing object value.
/// Returns `None` when the field is absent (the property is skipped).
pub type ReadFn = Arc<
    dyn Fn(&Value, &Config) -> std::result::Result<Option<Value>, TransformError> + Send + Sync,
>;

/// Turns a decoded wire-side value into the native field value.
pub type WriteFn =
    Arc<dyn Fn(Value, &Config) -> std::result::Result<Value, TransformError> + Send + Sync>;

/// The accessor composed for a property at build time. The variant matches
/// the plan's phase.
#[derive(Clone)]
pub enum Accessor {
    Read(ReadFn),
    Write(WriteFn),
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Read(_) => f.write_str("Accessor::Read"),
            Accessor::Write(_) => f.write_str("Accessor::Write"),
        }
    }
}

/// One property of an object node.
#[derive(Debug, Clone)]
pub struct Property {
    pub wire_name: String,
    pub declared_name: String,
    pub node: Node,
    pub accessor: Accessor,
}

// Structural equality ignores accessors (closures have no useful equality).
impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.wire_name == other.wire_name
            && self.declared_name == other.declared_name
            && self.node == other.node
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarNode {
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionNode {
    pub ty: Type,
    /// Key node, built only when the key type is not a trivial int/string
    /// scalar.
    pub key: Option<Box<Node>>,
    pub element: Box<Node>,
    pub ordered: bool,
}

/// A flattened union. Members never contain another composite, and are
/// sorted Collection < Object < Scalar for deterministic member selection.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeNode {
    pub ty: Type,
    /// Folded `null` union member.
    pub nullable: bool,
    pub members: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    pub ty: Type,
    pub identity: String,
    pub properties: Vec<Property>,
    /// A ghost marks an identity already expanded earlier on the build path
    /// (or a depth cutoff). Its property list is empty; executors resolve it
    /// through the plan cache as a forward reference.
    pub ghost: bool,
}

/// The intermediate representation produced by the builder and walked by the
/// executors. Owned by the plan-cache entry that produced it; executors
/// borrow it read-only.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(ScalarNode),
    Collection(CollectionNode),
    Composite(CompositeNode),
    Object(ObjectNode),
}

impl Node {
    pub fn ty(&self) -> &Type {
        match self {
            Node::Scalar(n) => &n.ty,
            Node::Collection(n) => &n.ty,
            Node::Composite(n) => &n.ty,
            Node::Object(n) => &n.ty,
        }
    }

    /// Sort rank for composite members: Collection < Object < Scalar.
    pub(crate) fn kind_rank(&self) -> u8 {
        match self {
            Node::Collection(_) => 0,
            Node::Object(_) => 1,
            Node::Scalar(_) => 2,
            Node::Composite(_) => 3,
        }
    }
}

/// Strongly-typed context threaded through loaders, hooks and the builder.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The original top-level type of the build call, for generic binding
    /// resolution.
    pub original: Type,
    pub phase: Phase,
    /// Current expansion depth along the build path.
    pub depth: usize,
    /// Identities currently being expanded on this path, with their counts.
    pub in_progress: HashMap<String, usize>,
    /// Generic bindings: identity -> template parameter -> concrete type.
    pub bindings: HashMap<String, HashMap<String, Type>>,
}

impl BuildContext {
    pub fn new(original: Type, phase: Phase) -> Self {
        BuildContext {
            original,
            phase,
            depth: 0,
            in_progress: HashMap::new(),
            bindings: HashMap::new(),
        }
    }

    /// The concrete type bound to `param` within `identity`, if any.
    pub fn binding(&self, identity: &str, param: &str) -> Option<&Type> {
        self.bindings.get(identity).and_then(|m| m.get(param))
    }
}

/// Resolves a (type, config, phase) triple into a cached plan. Implemented
/// by the engine; executors use it to resolve ghost nodes at runtime.
pub trait PlanSource: Send + Sync {
    fn resolve(
        &self,
        ty: &Type,
        config: &Config,
        phase: Phase,
    ) -> std::result::Result<Arc<Node>, BuildError>;
}
