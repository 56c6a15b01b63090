use std::collections::{BTreeMap, BTreeSet};

/// Immutable per-call options recognized by the engine.
///
/// The canonical `signature()` participates in plan-cache keys, so every
/// field that can change the shape of a built plan must be reflected there.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum object-expansion depth before the builder emits a ghost node.
    pub max_depth: usize,
    /// Serialization groups requested for encode; empty means no filtering.
    pub groups: BTreeSet<String>,
    /// Union disambiguation: canonical union string -> canonical member string.
    pub union_selector: BTreeMap<String, String>,
    /// Collect recoverable decode errors into a `PartialResult` instead of
    /// aborting on the first one.
    pub collect_errors: bool,
    /// Advisory: the caller intends to defer decoding of nested elements
    /// until first access. Laziness itself is selected by calling
    /// [`Engine::decode_lazy`](crate::Engine::decode_lazy); the flag lets a
    /// config be passed through layers that decide which entry point to use.
    pub lazy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_depth: 32,
            groups: BTreeSet::new(),
            union_selector: BTreeMap::new(),
            collect_errors: false,
            lazy: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_selector(mut self, union: impl Into<String>, member: impl Into<String>) -> Self {
        self.union_selector.insert(union.into(), member.into());
        self
    }

    pub fn collecting_errors(mut self) -> Self {
        self.collect_errors = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Canonical configuration string used in plan-cache keys. Collections
    /// are BTree-backed, so the output is deterministic. `lazy` is excluded:
    /// it never changes the shape of a built plan, so eager and lazy callers
    /// share cache entries.
    pub fn signature(&self) -> String {
        let groups: Vec<&str> = self.groups.iter().map(String::as_str).collect();
        let selectors: Vec<String> = self
            .union_selector
            .iter()
            .map(|(u, m)| format!("{}=>{}", u, m))
            .collect();
        format!(
            "depth={};groups={};selector={};collect={}",
            self.max_depth,
            groups.join(","),
            selectors.join(","),
            self.collect_errors as u8,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_deterministic() {
        let a = Config::new()
            .with_group("b")
            .with_group("a")
            .with_selector("int|string", "int");
        let b = Config::new()
            .with_group("a")
            .with_group("b")
            .with_selector("int|string", "int");
        assert_eq!(a.signature(), b.signature());
        assert_eq!(
            a.signature(),
            "depth=32;groups=a,b;selector=int|string=>int;collect=0"
        );
    }

    #[test]
    fn test_signature_reflects_options() {
        let plain = Config::new();
        assert_ne!(plain.signature(), plain.clone().collecting_errors().signature());
        assert_ne!(plain.signature(), plain.clone().with_max_depth(2).signature());
    }

    #[test]
    fn test_lazy_flag_does_not_fork_plans() {
        let plain = Config::new();
        assert_eq!(plain.signature(), plain.clone().lazy().signature());
    }
}
