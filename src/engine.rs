//! The engine wires the catalog, loader chain, hooks, formatter table and
//! plan cache together and exposes the encode/decode entry points.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::catalog::{ClassCatalog, FormatterDef, NoServices, ServiceLocator};
use crate::codec::{self, LazyValue, PartialResult};
use crate::config::Config;
use crate::error::{BuildError, DecodeError, Result, TypeError};
use crate::metadata::{
    BaseLoader, FormatterLoader, GenericLoader, GroupFilterLoader, PropertyLoader, RenameLoader,
};
use crate::parser::TypeParser;
use crate::plan::builder::Builder;
use crate::plan::{BuildContext, Hook, HookSet, Node, Phase, PlanCache, PlanKey, PlanSource};
use crate::types::Type;
use crate::value::Value;

/// Compiles types into plans and runs the executors over them. One engine
/// holds one plan cache; plans built through it live as long as it does.
pub struct Engine {
    catalog: Arc<dyn ClassCatalog>,
    parser: Arc<TypeParser>,
    loader: Box<dyn PropertyLoader>,
    hooks: HookSet,
    formatters: Arc<HashMap<String, FormatterDef>>,
    services: Arc<dyn ServiceLocator>,
    cache: PlanCache,
}

impl Engine {
    pub fn builder(catalog: Arc<dyn ClassCatalog>) -> EngineBuilder {
        EngineBuilder::new(catalog)
    }

    /// Parses a type expression against the engine's catalog.
    pub fn parse_type(&self, input: &str) -> std::result::Result<Type, TypeError> {
        self.parser.parse(input)
    }

    /// Compiles (or fetches from cache) the plan for a type.
    pub fn build_node(&self, ty: &Type, config: &Config, phase: Phase) -> Result<Arc<Node>> {
        Ok(self.resolve(ty, config, phase)?)
    }

    /// Encodes `value` as the given type expression, writing JSON to `out`.
    pub fn encode<W: io::Write>(
        &self,
        type_expr: &str,
        value: &Value,
        out: &mut W,
        config: &Config,
    ) -> Result<()> {
        let ty = self.parse_type(type_expr)?;
        let node = self.resolve(&ty, config, Phase::Encode)?;
        codec::encode(&node, value, out, config, self)?;
        Ok(())
    }

    pub fn encode_to_vec(&self, type_expr: &str, value: &Value, config: &Config) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(type_expr, value, &mut out, config)?;
        Ok(out)
    }

    /// Eagerly decodes a JSON document as the given type expression. The
    /// returned error list is non-empty only under `collect_errors`.
    pub fn decode(&self, type_expr: &str, buf: &[u8], config: &Config) -> Result<PartialResult> {
        let ty = self.parse_type(type_expr)?;
        let node = self.resolve(&ty, config, Phase::Decode)?;
        let parsed: Json = serde_json::from_slice(buf).map_err(document_error)?;
        Ok(codec::decode(&node, &parsed, config, self)?)
    }

    /// Reads the whole stream, then decodes it eagerly.
    pub fn decode_reader<R: io::Read>(
        &self,
        type_expr: &str,
        mut reader: R,
        config: &Config,
    ) -> Result<PartialResult> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(DecodeError::from)?;
        self.decode(type_expr, &buf, config)
    }

    /// Builds a lazy view over `buf`. The view borrows both the buffer and
    /// the engine, decoding elements on first access.
    pub fn decode_lazy<'a>(
        &'a self,
        type_expr: &str,
        buf: &'a [u8],
        config: &Config,
    ) -> Result<LazyValue<'a>> {
        let ty = self.parse_type(type_expr)?;
        let node = self.resolve(&ty, config, Phase::Decode)?;
        Ok(codec::decode_lazy(&node, buf, config.clone(), self)?)
    }

    /// How many plans the engine has compiled so far.
    pub fn cached_plans(&self) -> usize {
        self.cache.len()
    }
}

impl PlanSource for Engine {
    fn resolve(
        &self,
        ty: &Type,
        config: &Config,
        phase: Phase,
    ) -> std::result::Result<Arc<Node>, BuildError> {
        let key = PlanKey {
            type_sig: ty.canonical(),
            config_sig: config.signature(),
            phase,
        };
        self.cache.get_or_build(key, || {
            let builder = Builder {
                catalog: self.catalog.as_ref(),
                loader: self.loader.as_ref(),
                hooks: &self.hooks,
                formatters: &self.formatters,
                services: self.services.as_ref(),
                cache: &self.cache,
                config,
            };
            let mut ctx = BuildContext::new(ty.clone(), phase);
            builder.build(ty, &mut ctx)
        })
    }
}

/// Best-effort byte offset out of a serde_json parse error. The parser
/// reports line/column; for the single-line documents the splitter hands
/// over, the column is the offset.
fn document_error(err: serde_json::Error) -> DecodeError {
    DecodeError::MalformedDocument {
        offset: err.column().saturating_sub(1),
        message: err.to_string(),
    }
}

/// Assembles an engine. The default loader chain is base discovery,
/// renames, formatters, group filtering and generic substitution; tests can
/// swap in a replacement chain wholesale.
pub struct EngineBuilder {
    catalog: Arc<dyn ClassCatalog>,
    formatters: HashMap<String, FormatterDef>,
    hooks: HookSet,
    rename_rules: HashMap<String, String>,
    services: Arc<dyn ServiceLocator>,
    loader: Option<Box<dyn PropertyLoader>>,
}

impl EngineBuilder {
    pub fn new(catalog: Arc<dyn ClassCatalog>) -> Self {
        EngineBuilder {
            catalog,
            formatters: HashMap::new(),
            hooks: HookSet::new(),
            rename_rules: HashMap::new(),
            services: Arc::new(NoServices),
            loader: None,
        }
    }

    pub fn formatter(mut self, def: FormatterDef) -> Self {
        self.formatters.insert(def.name.clone(), def);
        self
    }

    pub fn hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Renames one property on the wire, overriding any catalog-declared
    /// rename for it.
    pub fn rename(
        mut self,
        class: impl Into<String>,
        property: impl Into<String>,
        wire_name: impl Into<String>,
    ) -> Self {
        let key = format!("{}::{}", class.into(), property.into());
        self.rename_rules.insert(key, wire_name.into());
        self
    }

    pub fn services(mut self, services: Arc<dyn ServiceLocator>) -> Self {
        self.services = services;
        self
    }

    /// Replaces the default loader chain entirely.
    pub fn loader(mut self, loader: Box<dyn PropertyLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn build(self) -> Engine {
        let parser = Arc::new(TypeParser::new(self.catalog.clone()));
        let formatters = Arc::new(self.formatters);
        let loader = match self.loader {
            Some(loader) => loader,
            None => {
                let base = BaseLoader::new(self.catalog.clone(), parser.clone());
                let rename =
                    RenameLoader::new(Box::new(base), self.catalog.clone(), self.rename_rules);
                let formatter =
                    FormatterLoader::new(Box::new(rename), self.catalog.clone(), formatters.clone());
                let groups = GroupFilterLoader::new(Box::new(formatter));
                Box::new(GenericLoader::new(Box::new(groups)))
            }
        };
        Engine {
            catalog: self.catalog,
            parser,
            loader,
            hooks: self.hooks,
            formatters,
            services: self.services,
            cache: PlanCache::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ClassDef, PropertyDef};
    use pretty_assertions::assert_eq;

    fn point_engine() -> Engine {
        let mut catalog = Catalog::new();
        catalog.add_class(
            ClassDef::new("Point")
                .property(PropertyDef::new("x", "int"))
                .property(PropertyDef::new("y", "int")),
        );
        Engine::builder(Arc::new(catalog)).build()
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let engine = point_engine();
        let config = Config::new();
        let value = Value::object("Point", vec![("x", Value::Int(1)), ("y", Value::Int(2))]);

        let encoded = engine.encode_to_vec("Point", &value, &config).unwrap();
        assert_eq!(encoded, br#"{"x":1,"y":2}"#);

        let decoded = engine.decode("Point", &encoded, &config).unwrap();
        assert!(decoded.is_complete());
        assert_eq!(decoded.value, value);
    }

    #[test]
    fn test_plans_are_cached_per_phase() {
        let engine = point_engine();
        let config = Config::new();
        let value = Value::object("Point", vec![("x", Value::Int(1))]);

        engine.encode_to_vec("Point", &value, &config).unwrap();
        engine.encode_to_vec("Point", &value, &config).unwrap();
        assert_eq!(engine.cached_plans(), 1);

        engine.decode("Point", br#"{"x":1}"#, &config).unwrap();
        assert_eq!(engine.cached_plans(), 2);
    }

    #[test]
    fn test_document_parse_failure_is_malformed() {
        let engine = point_engine();
        let err = engine
            .decode("Point", b"{\"x\": nope}", &Config::new())
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::PlanError::Decode(DecodeError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn test_rename_rule_applies() {
        let mut catalog = Catalog::new();
        catalog.add_class(ClassDef::new("User").property(PropertyDef::new("name", "string")));
        let engine = Engine::builder(Arc::new(catalog))
            .rename("User", "name", "user_name")
            .build();
        let value = Value::object("User", vec![("name", Value::Str("ada".into()))]);
        let encoded = engine
            .encode_to_vec("User", &value, &Config::new())
            .unwrap();
        assert_eq!(encoded, br#"{"user_name":"ada"}"#);
    }
}
