use crate::catalog::ClassCatalog;
use crate::error::TypeError;
use crate::types::{ScalarKind, Type};

use super::lexer::{Lexer, Token};

/// Parse a type expression against a class catalog.
///
/// `params` is the template-parameter list of the enclosing class, if any;
/// a bare name matching one of them parses to `Type::Template`.
pub fn parse_type(
    input: &str,
    catalog: &dyn ClassCatalog,
    params: &[String],
) -> Result<Type, TypeError> {
    let mut parser = Parser {
        input,
        lexer: Lexer::new(input),
        catalog,
        params,
    };
    let ty = parser.union()?;
    let trailing = parser.lexer.next_token();
    if trailing.token != Token::Eof {
        return Err(parser.unexpected(&trailing.token, "end of input"));
    }
    Ok(ty)
}

struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    catalog: &'a dyn ClassCatalog,
    params: &'a [String],
}

impl<'a> Parser<'a> {
    fn malformed(&self, message: impl Into<String>) -> TypeError {
        TypeError::Malformed {
            input: self.input.to_string(),
            message: message.into(),
        }
    }

    fn unexpected(&self, found: &Token, expected: &str) -> TypeError {
        self.malformed(format!("expected {}, found {:?}", expected, found))
    }

    /// union := item ('|' item)*
    fn union(&mut self) -> Result<Type, TypeError> {
        let mut members = vec![self.item()?];
        while self.lexer.peek_token().token == Token::Pipe {
            self.lexer.next_token();
            members.push(self.item()?);
        }
        Ok(fold_union(members))
    }

    /// item := '?'? name generic?
    fn item(&mut self) -> Result<Type, TypeError> {
        let nullable = if self.lexer.peek_token().token == Token::Question {
            self.lexer.next_token();
            true
        } else {
            false
        };

        let tok = self.lexer.next_token();
        let name = match tok.token {
            Token::Name(n) => n,
            other => return Err(self.unexpected(&other, "a type name")),
        };

        let args = if self.lexer.peek_token().token == Token::Lt {
            self.generic_args()?
        } else {
            Vec::new()
        };

        let ty = self.resolve(&name, args)?;
        Ok(if nullable { Type::nullable(ty) } else { ty })
    }

    /// generic := '<' union (',' union)* '>'
    fn generic_args(&mut self) -> Result<Vec<Type>, TypeError> {
        self.lexer.next_token(); // consume '<'
        let mut args = vec![self.union()?];
        loop {
            let tok = self.lexer.next_token();
            match tok.token {
                Token::Comma => args.push(self.union()?),
                Token::Gt => return Ok(args),
                Token::Eof => return Err(self.malformed("unbalanced '<': missing '>'")),
                other => return Err(self.unexpected(&other, "',' or '>'")),
            }
        }
    }

    fn resolve(&mut self, name: &str, args: Vec<Type>) -> Result<Type, TypeError> {
        let scalar = match name {
            "null" => Some(ScalarKind::Null),
            "bool" => Some(ScalarKind::Bool),
            "int" => Some(ScalarKind::Int),
            "float" => Some(ScalarKind::Float),
            "string" => Some(ScalarKind::Str),
            _ => None,
        };
        if let Some(kind) = scalar {
            self.expect_arity(name, 0, args.len())?;
            return Ok(Type::Scalar(kind));
        }

        match name {
            "list" => {
                self.expect_arity(name, 1, args.len())?;
                let mut args = args;
                Ok(Type::list(args.remove(0)))
            }
            "dict" => {
                self.expect_arity(name, 2, args.len())?;
                let mut args = args;
                let key = args.remove(0);
                Ok(Type::dict(key, args.remove(0)))
            }
            // A single-argument collection generic defaults its key to int.
            "array" => match args.len() {
                1 => {
                    let mut args = args;
                    Ok(Type::list(args.remove(0)))
                }
                2 => {
                    let mut args = args;
                    let key = args.remove(0);
                    Ok(Type::dict(key, args.remove(0)))
                }
                n => Err(TypeError::GenericArity {
                    identity: name.to_string(),
                    expected: 2,
                    found: n,
                }),
            },
            "union" => {
                if args.len() < 2 {
                    return Err(TypeError::GenericArity {
                        identity: name.to_string(),
                        expected: 2,
                        found: args.len(),
                    });
                }
                Ok(fold_union(args))
            }
            _ => {
                if self.params.iter().any(|p| p == name) {
                    self.expect_arity(name, 0, args.len())?;
                    return Ok(Type::Template(name.to_string()));
                }
                if let Some(def) = self.catalog.enumeration(name) {
                    self.expect_arity(name, 0, args.len())?;
                    return Ok(Type::Enum {
                        identity: def.name.clone(),
                        backing: def.backing,
                    });
                }
                if let Some(def) = self.catalog.class(name) {
                    self.expect_arity(name, def.params.len(), args.len())?;
                    return Ok(Type::Object {
                        identity: def.name.clone(),
                        args,
                    });
                }
                Err(TypeError::Unknown(name.to_string()))
            }
        }
    }

    fn expect_arity(&self, identity: &str, expected: usize, found: usize) -> Result<(), TypeError> {
        if expected == found {
            Ok(())
        } else {
            Err(TypeError::GenericArity {
                identity: identity.to_string(),
                expected,
                found,
            })
        }
    }
}

/// Flatten nested unions, drop duplicates, and degenerate singletons.
fn fold_union(members: Vec<Type>) -> Type {
    let mut flat: Vec<Type> = Vec::with_capacity(members.len());
    for m in members {
        match m {
            Type::Union(inner) => {
                for t in inner {
                    if !flat.contains(&t) {
                        flat.push(t);
                    }
                }
            }
            other => {
                if !flat.contains(&other) {
                    flat.push(other);
                }
            }
        }
    }
    if flat.len() == 1 {
        flat.swap_remove(0)
    } else {
        Type::Union(flat)
    }
}
