//! Contracts for external collaborators: class/property discovery, formatter
//! definitions and the runtime-service locator.
//!
//! The engine never inspects language-runtime metadata itself; it consumes
//! these capability interfaces. `Catalog` and `ServiceMap` are the in-memory
//! reference implementations used by consumers and tests.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::config::Config;
use crate::error::TransformError;
use crate::types::{ScalarKind, Type};
use crate::value::Value;

/// Declared shape of one property, as supplied by the discovery service.
#[derive(Debug, Clone)]
pub struct PropertyDef {
    pub name: String,
    /// Declared type, in the type-expression grammar.
    pub type_decl: String,
    /// Serialization groups this property belongs to.
    pub groups: BTreeSet<String>,
    /// Attribute-declared wire name, if any.
    pub rename: Option<String>,
    /// Attached formatter reference, if any.
    pub formatter: Option<String>,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, type_decl: impl Into<String>) -> Self {
        PropertyDef {
            name: name.into(),
            type_decl: type_decl.into(),
            groups: BTreeSet::new(),
            rename: None,
            formatter: None,
        }
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn rename(mut self, wire_name: impl Into<String>) -> Self {
        self.rename = Some(wire_name.into());
        self
    }

    pub fn formatter(mut self, name: impl Into<String>) -> Self {
        self.formatter = Some(name.into());
        self
    }
}

/// A declared class: identity, generic parameters and ordered properties.
#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: String,
    /// Generic template parameter names, in declaration order.
    pub params: Vec<String>,
    /// Properties in declaration order.
    pub properties: Vec<PropertyDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        ClassDef {
            name: name.into(),
            params: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn property(mut self, def: PropertyDef) -> Self {
        self.properties.push(def);
        self
    }
}

/// A declared enumeration and its wire backing.
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    /// Backing scalar kind, or `None` for pure enums, whose wire form is
    /// whichever int or string the case carries.
    pub backing: Option<ScalarKind>,
}

/// The property/attribute discovery service.
pub trait ClassCatalog: Send + Sync {
    fn class(&self, identity: &str) -> Option<&ClassDef>;
    fn enumeration(&self, identity: &str) -> Option<&EnumDef>;
}

/// In-memory catalog, the reference implementation of the discovery contract.
#[derive(Default)]
pub struct Catalog {
    classes: HashMap<String, ClassDef>,
    enums: HashMap<String, EnumDef>,
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn add_class(&mut self, def: ClassDef) -> &mut Self {
        self.classes.insert(def.name.clone(), def);
        self
    }

    pub fn add_enum(&mut self, name: impl Into<String>, backing: Option<ScalarKind>) -> &mut Self {
        let name = name.into();
        self.enums.insert(name.clone(), EnumDef { name, backing });
        self
    }
}

impl ClassCatalog for Catalog {
    fn class(&self, identity: &str) -> Option<&ClassDef> {
        self.classes.get(identity)
    }

    fn enumeration(&self, identity: &str) -> Option<&EnumDef> {
        self.enums.get(identity)
    }
}

/// A runtime capability injected into a formatter besides the value and the
/// shared configuration.
pub trait RuntimeService: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// The runtime-service locator: resolves a formatter's non-value, non-config
/// parameter into a capability. Resolution happens at plan-build time so a
/// mis-wired formatter fails fast.
pub trait ServiceLocator: Send + Sync {
    fn locate(&self, formatter: &str, parameter: &str) -> Option<Arc<dyn RuntimeService>>;
}

/// In-memory locator keyed by `formatter::parameter`.
#[derive(Default)]
pub struct ServiceMap {
    entries: HashMap<String, Arc<dyn RuntimeService>>,
}

impl ServiceMap {
    pub fn new() -> Self {
        ServiceMap::default()
    }

    pub fn insert(
        &mut self,
        formatter: impl AsRef<str>,
        parameter: impl AsRef<str>,
        service: Arc<dyn RuntimeService>,
    ) -> &mut Self {
        let key = format!("{}::{}", formatter.as_ref(), parameter.as_ref());
        self.entries.insert(key, service);
        self
    }
}

impl ServiceLocator for ServiceMap {
    fn locate(&self, formatter: &str, parameter: &str) -> Option<Arc<dyn RuntimeService>> {
        self.entries.get(&format!("{}::{}", formatter, parameter)).cloned()
    }
}

/// Locator that resolves nothing; the default when no services are wired.
pub struct NoServices;

impl ServiceLocator for NoServices {
    fn locate(&self, _formatter: &str, _parameter: &str) -> Option<Arc<dyn RuntimeService>> {
        None
    }
}

/// Arguments handed to a formatter closure alongside the value.
pub struct FormatterArgs<'a> {
    pub config: &'a Config,
    /// Services resolved at build time, in the order declared by
    /// `FormatterDef::parameters`.
    pub services: &'a [Arc<dyn RuntimeService>],
}

/// A pure transform applied by a formatter in one direction.
pub type FormatterFn = Arc<
    dyn Fn(&Value, &FormatterArgs<'_>) -> std::result::Result<Value, TransformError>
        + Send
        + Sync,
>;

/// An opaque formatter reference: identity, declared types and the transform
/// closures. The engine stores and composes these; it never inspects them.
///
/// `input` is the native-side type and `output` the wire-side type; `forward`
/// maps native to wire (encode) and `backward` wire to native (decode).
#[derive(Clone)]
pub struct FormatterDef {
    pub name: String,
    pub input: Type,
    pub output: Type,
    /// Extra runtime-service parameter names, resolved at build time.
    pub parameters: Vec<String>,
    pub forward: FormatterFn,
    pub backward: FormatterFn,
}

impl FormatterDef {
    /// A formatter with no extra runtime-service parameters.
    pub fn pure(
        name: impl Into<String>,
        input: Type,
        output: Type,
        forward: FormatterFn,
        backward: FormatterFn,
    ) -> Self {
        FormatterDef {
            name: name.into(),
            input,
            output,
            parameters: Vec::new(),
            forward,
            backward,
        }
    }
}

impl std::fmt::Debug for FormatterDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatterDef")
            .field("name", &self.name)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
