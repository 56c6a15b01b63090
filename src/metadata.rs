//! The property metadata pipeline: a decorator chain of loaders that turns a
//! class identity into the ordered list of properties to (de)serialize.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::catalog::{ClassCatalog, FormatterDef};
use crate::config::Config;
use crate::error::BuildError;
use crate::parser::TypeParser;
use crate::plan::{BuildContext, Phase};
use crate::types::Type;

/// Metadata for one property, immutable once the pipeline has produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMetadata {
    pub declared_name: String,
    pub wire_name: String,
    pub ty: Type,
    /// Formatter chain, innermost first.
    pub formatters: Vec<String>,
    pub groups: BTreeSet<String>,
}

/// Ordered map from wire name to metadata. The keys double as the reverse
/// (wire name -> declared name) mapping used on decode.
pub type PropertyMap = IndexMap<String, PropertyMetadata>;

/// One stage of the pipeline. Implementations are decorators over an inner
/// loader so each rule is independently testable against a stub.
pub trait PropertyLoader: Send + Sync {
    fn load(
        &self,
        identity: &str,
        config: &Config,
        ctx: &BuildContext,
    ) -> Result<PropertyMap, BuildError>;
}

/// Base loader: reflects a class's declared properties in declaration order,
/// wire name = declared name, no formatters.
pub struct BaseLoader {
    catalog: Arc<dyn ClassCatalog>,
    parser: Arc<TypeParser>,
}

impl BaseLoader {
    pub fn new(catalog: Arc<dyn ClassCatalog>, parser: Arc<TypeParser>) -> Self {
        BaseLoader { catalog, parser }
    }
}

impl PropertyLoader for BaseLoader {
    fn load(
        &self,
        identity: &str,
        _config: &Config,
        _ctx: &BuildContext,
    ) -> Result<PropertyMap, BuildError> {
        let class = self
            .catalog
            .class(identity)
            .ok_or_else(|| BuildError::UnknownClass(identity.to_string()))?;

        let mut out = PropertyMap::new();
        for def in &class.properties {
            let ty = self.parser.parse_in(&def.type_decl, &class.params)?;
            out.insert(
                def.name.clone(),
                PropertyMetadata {
                    declared_name: def.name.clone(),
                    wire_name: def.name.clone(),
                    ty,
                    formatters: Vec::new(),
                    groups: def.groups.clone(),
                },
            );
        }
        Ok(out)
    }
}

/// Rename loader: overrides wire names from an explicit rule table keyed by
/// `Identity::declared_name`, falling back to the catalog-declared rename.
pub struct RenameLoader {
    inner: Box<dyn PropertyLoader>,
    catalog: Arc<dyn ClassCatalog>,
    rules: HashMap<String, String>,
}

impl RenameLoader {
    pub fn new(
        inner: Box<dyn PropertyLoader>,
        catalog: Arc<dyn ClassCatalog>,
        rules: HashMap<String, String>,
    ) -> Self {
        RenameLoader {
            inner,
            catalog,
            rules,
        }
    }

    fn wire_name_for(&self, identity: &str, declared: &str) -> Option<String> {
        let key = format!("{}::{}", identity, declared);
        if let Some(name) = self.rules.get(&key) {
            return Some(name.clone());
        }
        self.catalog
            .class(identity)
            .and_then(|c| c.properties.iter().find(|p| p.name == declared))
            .and_then(|p| p.rename.clone())
    }
}

impl PropertyLoader for RenameLoader {
    fn load(
        &self,
        identity: &str,
        config: &Config,
        ctx: &BuildContext,
    ) -> Result<PropertyMap, BuildError> {
        let inner = self.inner.load(identity, config, ctx)?;
        let mut out = PropertyMap::with_capacity(inner.len());
        for (_, mut meta) in inner {
            if let Some(wire) = self.wire_name_for(identity, &meta.declared_name) {
                meta.wire_name = wire;
            }
            out.insert(meta.wire_name.clone(), meta);
        }
        Ok(out)
    }
}

/// Formatter loader: attaches the catalog-declared formatter reference and
/// retypes the property to the formatter's wire-side type.
pub struct FormatterLoader {
    inner: Box<dyn PropertyLoader>,
    catalog: Arc<dyn ClassCatalog>,
    formatters: Arc<HashMap<String, FormatterDef>>,
}

impl FormatterLoader {
    pub fn new(
        inner: Box<dyn PropertyLoader>,
        catalog: Arc<dyn ClassCatalog>,
        formatters: Arc<HashMap<String, FormatterDef>>,
    ) -> Self {
        FormatterLoader {
            inner,
            catalog,
            formatters,
        }
    }
}

impl PropertyLoader for FormatterLoader {
    fn load(
        &self,
        identity: &str,
        config: &Config,
        ctx: &BuildContext,
    ) -> Result<PropertyMap, BuildError> {
        let mut map = self.inner.load(identity, config, ctx)?;
        let class = match self.catalog.class(identity) {
            Some(c) => c,
            None => return Ok(map),
        };

        for meta in map.values_mut() {
            let declared = class
                .properties
                .iter()
                .find(|p| p.name == meta.declared_name);
            let Some(name) = declared.and_then(|p| p.formatter.clone()) else {
                continue;
            };
            let def = self
                .formatters
                .get(&name)
                .ok_or_else(|| BuildError::UnknownFormatter(name.clone()))?;
            meta.formatters.push(name);
            // The node for this property is built against the wire side.
            meta.ty = def.output.clone();
        }
        Ok(map)
    }
}

/// Group filter (encode only): drops properties whose declared groups do not
/// intersect the configured groups. No configured groups means no filtering.
pub struct GroupFilterLoader {
    inner: Box<dyn PropertyLoader>,
}

impl GroupFilterLoader {
    pub fn new(inner: Box<dyn PropertyLoader>) -> Self {
        GroupFilterLoader { inner }
    }
}

impl PropertyLoader for GroupFilterLoader {
    fn load(
        &self,
        identity: &str,
        config: &Config,
        ctx: &BuildContext,
    ) -> Result<PropertyMap, BuildError> {
        let mut map = self.inner.load(identity, config, ctx)?;
        if ctx.phase != Phase::Encode || config.groups.is_empty() {
            return Ok(map);
        }
        map.retain(|_, meta| meta.groups.intersection(&config.groups).next().is_some());
        Ok(map)
    }
}

/// Generic substitution loader: replaces template parameters inside property
/// types with the concrete types bound for the enclosing identity.
pub struct GenericLoader {
    inner: Box<dyn PropertyLoader>,
}

impl GenericLoader {
    pub fn new(inner: Box<dyn PropertyLoader>) -> Self {
        GenericLoader { inner }
    }

    fn substitute(ty: &Type, identity: &str, ctx: &BuildContext) -> Result<Type, BuildError> {
        match ty {
            Type::Template(param) => {
                ctx.binding(identity, param)
                    .cloned()
                    .ok_or_else(|| BuildError::UnboundTemplate {
                        identity: identity.to_string(),
                        parameter: param.clone(),
                    })
            }
            Type::Union(members) => {
                let members = members
                    .iter()
                    .map(|m| Self::substitute(m, identity, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Union(members))
            }
            Type::Collection {
                key,
                value,
                ordered,
            } => Ok(Type::Collection {
                key: Box::new(Self::substitute(key, identity, ctx)?),
                value: Box::new(Self::substitute(value, identity, ctx)?),
                ordered: *ordered,
            }),
            Type::Object { identity: id, args } => {
                let args = args
                    .iter()
                    .map(|a| Self::substitute(a, identity, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Object {
                    identity: id.clone(),
                    args,
                })
            }
            other => Ok(other.clone()),
        }
    }
}

impl PropertyLoader for GenericLoader {
    fn load(
        &self,
        identity: &str,
        config: &Config,
        ctx: &BuildContext,
    ) -> Result<PropertyMap, BuildError> {
        let mut map = self.inner.load(identity, config, ctx)?;
        for meta in map.values_mut() {
            meta.ty = Self::substitute(&meta.ty, identity, ctx)?;
        }
        Ok(map)
    }
}
