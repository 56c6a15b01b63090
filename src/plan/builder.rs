//! Recursively turns a `Type` (plus property metadata and hooks) into a
//! `Node` tree, with cycle/depth guarding and per-object memoization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{ClassCatalog, FormatterArgs, FormatterDef, RuntimeService, ServiceLocator};
use crate::config::Config;
use crate::error::BuildError;
use crate::metadata::{PropertyLoader, PropertyMetadata};
use crate::types::{ScalarKind, Type};

use super::cache::{PlanCache, PlanKey};
use super::hooks::HookSet;
use super::{
    Accessor, BuildContext, CollectionNode, CompositeNode, Node, ObjectNode, Phase, Property,
    ReadFn, ScalarNode, WriteFn,
};

/// One build pass over a type, borrowing the engine's collaborators.
pub(crate) struct Builder<'a> {
    pub catalog: &'a dyn ClassCatalog,
    pub loader: &'a dyn PropertyLoader,
    pub hooks: &'a HookSet,
    pub formatters: &'a HashMap<String, FormatterDef>,
    pub services: &'a dyn ServiceLocator,
    pub cache: &'a PlanCache,
    pub config: &'a Config,
}

/// A formatter with its runtime-service parameters already resolved.
type ResolvedFormatter = (FormatterDef, Vec<Arc<dyn RuntimeService>>);

impl Builder<'_> {
    pub fn build(&self, ty: &Type, ctx: &mut BuildContext) -> Result<Node, BuildError> {
        let ty = match self.hooks.type_override(ty, ctx) {
            Some(ov) => ov.ty,
            None => ty.clone(),
        };

        match &ty {
            Type::Union(members) => self.build_union(&ty, members, ctx),
            Type::Collection {
                key,
                value,
                ordered,
            } => {
                let key_node = match key.as_ref() {
                    Type::Scalar(ScalarKind::Int) | Type::Scalar(ScalarKind::Str) => None,
                    other => Some(Box::new(self.build(other, ctx)?)),
                };
                let element = Box::new(self.build(value, ctx)?);
                Ok(Node::Collection(CollectionNode {
                    ty: ty.clone(),
                    key: key_node,
                    element,
                    ordered: *ordered,
                }))
            }
            Type::Object { .. } => self.build_object(&ty, ctx),
            Type::Scalar(_) | Type::Enum { .. } => Ok(Node::Scalar(ScalarNode { ty: ty.clone() })),
            Type::Template(param) => Err(BuildError::UnboundTemplate {
                identity: ctx.original.canonical(),
                parameter: param.clone(),
            }),
        }
    }

    fn build_union(
        &self,
        ty: &Type,
        members: &[Type],
        ctx: &mut BuildContext,
    ) -> Result<Node, BuildError> {
        // Flatten nested unions and fold null members into a flag.
        let mut flat: Vec<Type> = Vec::new();
        let mut nullable = false;
        let mut pending: Vec<&Type> = members.iter().collect();
        while !pending.is_empty() {
            let mut next = Vec::new();
            for m in pending {
                match m {
                    Type::Union(inner) => next.extend(inner.iter()),
                    Type::Scalar(ScalarKind::Null) => nullable = true,
                    other => {
                        if !flat.contains(other) {
                            flat.push(other.clone());
                        }
                    }
                }
            }
            pending = next;
        }

        // A union of exactly one resolved member degenerates to that member.
        if flat.len() == 1 && !nullable {
            return self.build(&flat[0], ctx);
        }

        let mut nodes = Vec::with_capacity(flat.len());
        for member in &flat {
            nodes.push(self.build(member, ctx)?);
        }
        nodes.sort_by(|a, b| {
            a.kind_rank()
                .cmp(&b.kind_rank())
                .then_with(|| a.ty().canonical().cmp(&b.ty().canonical()))
        });

        Ok(Node::Composite(CompositeNode {
            ty: ty.clone(),
            nullable,
            members: nodes,
        }))
    }

    fn build_object(&self, ty: &Type, ctx: &mut BuildContext) -> Result<Node, BuildError> {
        let (identity, args) = match ty {
            Type::Object { identity, args } => (identity.clone(), args.clone()),
            _ => unreachable!("build_object called with a non-object type"),
        };

        let key = PlanKey {
            type_sig: ty.canonical(),
            config_sig: self.config.signature(),
            phase: ctx.phase,
        };
        if let Some(hit) = self.cache.get(&key) {
            return Ok((*hit).clone());
        }

        // Cycle or depth cutoff: emit a ghost forward reference, resolved
        // through the plan cache at execution time.
        let cycling = ctx.in_progress.get(&identity).copied().unwrap_or(0) > 0;
        if cycling || ctx.depth >= self.config.max_depth {
            return Ok(Node::Object(ObjectNode {
                ty: ty.clone(),
                identity,
                properties: Vec::new(),
                ghost: true,
            }));
        }

        let class = self
            .catalog
            .class(&identity)
            .ok_or_else(|| BuildError::UnknownClass(identity.clone()))?;
        if !class.params.is_empty() {
            let binding: HashMap<String, Type> = class
                .params
                .iter()
                .cloned()
                .zip(args.iter().cloned())
                .collect();
            ctx.bindings.insert(identity.clone(), binding);
        }

        *ctx.in_progress.entry(identity.clone()).or_insert(0) += 1;
        ctx.depth += 1;

        let metas = self.loader.load(&identity, self.config, ctx)?;
        let mut properties = Vec::with_capacity(metas.len());
        for (_, mut meta) in metas {
            let mut read_override: Option<ReadFn> = None;
            if let Some(ov) = self.hooks.property_override(&identity, &meta, ctx) {
                if let Some(wire) = ov.wire_name {
                    meta.wire_name = wire;
                }
                if let Some(new_ty) = ov.ty {
                    meta.ty = new_ty;
                }
                read_override = ov.read;
            }

            let node = self.build(&meta.ty, ctx)?;
            let accessor = self.compose_accessor(&meta, read_override, ctx.phase)?;
            properties.push(Property {
                wire_name: meta.wire_name,
                declared_name: meta.declared_name,
                node,
                accessor,
            });
        }

        ctx.depth -= 1;
        if let Some(count) = ctx.in_progress.get_mut(&identity) {
            *count -= 1;
        }

        let node = Node::Object(ObjectNode {
            ty: ty.clone(),
            identity,
            properties,
            ghost: false,
        });
        // Memoize the subtree; ghosts are path artifacts and are never cached.
        self.cache.insert(key, Arc::new(node.clone()));
        Ok(node)
    }

    /// Resolve the formatter chain (failing fast on missing runtime
    /// services) and compose the property accessor for the given phase.
    fn compose_accessor(
        &self,
        meta: &PropertyMetadata,
        read_override: Option<ReadFn>,
        phase: Phase,
    ) -> Result<Accessor, BuildError> {
        let mut chain: Vec<ResolvedFormatter> = Vec::with_capacity(meta.formatters.len());
        for name in &meta.formatters {
            let def = self
                .formatters
                .get(name)
                .ok_or_else(|| BuildError::UnknownFormatter(name.clone()))?
                .clone();
            let mut services = Vec::with_capacity(def.parameters.len());
            for param in &def.parameters {
                let svc = self.services.locate(name, param).ok_or_else(|| {
                    BuildError::MissingRuntimeService {
                        formatter: name.clone(),
                        parameter: param.clone(),
                    }
                })?;
                services.push(svc);
            }
            chain.push((def, services));
        }

        match phase {
            Phase::Encode => {
                let base: ReadFn = match read_override {
                    Some(read) => read,
                    None => {
                        let declared = meta.declared_name.clone();
                        Arc::new(move |value, _config| Ok(value.get(&declared).cloned()))
                    }
                };
                let read: ReadFn = Arc::new(move |value, config| {
                    let mut current = match base(value, config)? {
                        Some(v) => v,
                        None => return Ok(None),
                    };
                    for (def, services) in &chain {
                        let args = FormatterArgs { config, services };
                        current = (def.forward)(&current, &args)?;
                    }
                    Ok(Some(current))
                });
                Ok(Accessor::Read(read))
            }
            Phase::Decode => {
                let write: WriteFn = Arc::new(move |value, config| {
                    let mut current = value;
                    for (def, services) in chain.iter().rev() {
                        let args = FormatterArgs { config, services };
                        current = (def.backward)(&current, &args)?;
                    }
                    Ok(current)
                });
                Ok(Accessor::Write(write))
            }
        }
    }
}
