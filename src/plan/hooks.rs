//! Build-time extension points. Hooks are consulted while the node tree is
//! compiled, so their overrides are baked into the cached plan; they must be
//! pure functions of the identity and build context.

use std::sync::Arc;

use crate::metadata::PropertyMetadata;
use crate::types::Type;

use super::{BuildContext, ReadFn};

/// Replaces the type the builder is about to expand.
#[derive(Debug, Clone)]
pub struct TypeOverride {
    pub ty: Type,
}

/// Overrides applied to one property before its child node is built.
#[derive(Default, Clone)]
pub struct PropertyOverride {
    pub wire_name: Option<String>,
    pub ty: Option<Type>,
    /// Replacement for the base field access; the formatter chain still
    /// applies on top.
    pub read: Option<ReadFn>,
}

pub trait Hook: Send + Sync {
    fn on_type(&self, _ty: &Type, _ctx: &BuildContext) -> Option<TypeOverride> {
        None
    }

    fn on_property(
        &self,
        _identity: &str,
        _meta: &PropertyMetadata,
        _ctx: &BuildContext,
    ) -> Option<PropertyOverride> {
        None
    }
}

/// Hooks in registration order; the first non-empty override for an identity
/// wins and later hooks are not consulted.
#[derive(Default, Clone)]
pub struct HookSet {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookSet {
    pub fn new() -> Self {
        HookSet::default()
    }

    pub fn push(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn type_override(&self, ty: &Type, ctx: &BuildContext) -> Option<TypeOverride> {
        self.hooks.iter().find_map(|h| h.on_type(ty, ctx))
    }

    pub fn property_override(
        &self,
        identity: &str,
        meta: &PropertyMetadata,
        ctx: &BuildContext,
    ) -> Option<PropertyOverride> {
        self.hooks
            .iter()
            .find_map(|h| h.on_property(identity, meta, ctx))
    }
}
