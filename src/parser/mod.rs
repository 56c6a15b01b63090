//! Type-expression parsing: grammar with nullable marker `?`, union
//! separator `|` and generic diamond syntax `Name<K,V>`.

pub mod grammar;
pub mod lexer;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::catalog::ClassCatalog;
use crate::error::TypeError;
use crate::types::Type;

pub use grammar::parse_type;

/// Memoizing front door for the type grammar.
///
/// Parsing is pure per catalog, so results are cached by input string (plus
/// the enclosing template-parameter list when present).
pub struct TypeParser {
    catalog: Arc<dyn ClassCatalog>,
    cache: Mutex<HashMap<String, Type>>,
}

impl TypeParser {
    pub fn new(catalog: Arc<dyn ClassCatalog>) -> Self {
        TypeParser {
            catalog,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Parse a top-level type expression.
    pub fn parse(&self, input: &str) -> Result<Type, TypeError> {
        self.parse_in(input, &[])
    }

    /// Parse a type expression inside the template scope of a class.
    pub fn parse_in(&self, input: &str, params: &[String]) -> Result<Type, TypeError> {
        let key = if params.is_empty() {
            input.to_string()
        } else {
            format!("{}\u{1}{}", params.join(","), input)
        };

        if let Some(hit) = self.cache.lock().expect("type parse cache poisoned").get(&key) {
            return Ok(hit.clone());
        }

        let ty = grammar::parse_type(input, self.catalog.as_ref(), params)?;
        self.cache
            .lock()
            .expect("type parse cache poisoned")
            .insert(key, ty.clone());
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_parse_is_memoized() {
        let parser = TypeParser::new(Arc::new(Catalog::new()));
        let a = parser.parse("list<int>").unwrap();
        let b = parser.parse("list<int>").unwrap();
        assert_eq!(a, b);
        assert_eq!(parser.cache.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_template_scope_is_part_of_the_key() {
        let parser = TypeParser::new(Arc::new(Catalog::new()));
        let t = parser.parse_in("T", &["T".to_string()]).unwrap();
        assert_eq!(t, Type::Template("T".into()));
        assert!(parser.parse("T").is_err());
    }
}
