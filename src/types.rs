use std::fmt;

/// The kind of a scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Null => "null",
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Str => "string",
        }
    }
}

/// A declared value type.
///
/// Types are immutable; the canonical string form (the `Display` impl) is
/// the identity used for plan-cache and union-selector keys. Nullability is
/// always a two-member union with the `null` scalar, never a flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Scalar(ScalarKind),
    /// An enumerated type; `backing` is the wire representation, or `None`
    /// for pure enums (serialized by case name).
    Enum {
        identity: String,
        backing: Option<ScalarKind>,
    },
    Union(Vec<Type>),
    /// A homogeneous collection. `ordered = true` is a list, `false` a dict.
    /// The key type is always present (defaulted to int for bare lists).
    Collection {
        key: Box<Type>,
        value: Box<Type>,
        ordered: bool,
    },
    /// An object-graph type with its concrete generic arguments.
    Object { identity: String, args: Vec<Type> },
    /// An unbound generic parameter of an enclosing class. Only valid between
    /// parsing and generic substitution; reaching the builder unbound is an
    /// error.
    Template(String),
}

impl Type {
    pub fn null() -> Type {
        Type::Scalar(ScalarKind::Null)
    }

    pub fn boolean() -> Type {
        Type::Scalar(ScalarKind::Bool)
    }

    pub fn int() -> Type {
        Type::Scalar(ScalarKind::Int)
    }

    pub fn float() -> Type {
        Type::Scalar(ScalarKind::Float)
    }

    pub fn string() -> Type {
        Type::Scalar(ScalarKind::Str)
    }

    pub fn list(value: Type) -> Type {
        Type::Collection {
            key: Box::new(Type::int()),
            value: Box::new(value),
            ordered: true,
        }
    }

    pub fn dict(key: Type, value: Type) -> Type {
        Type::Collection {
            key: Box::new(key),
            value: Box::new(value),
            ordered: false,
        }
    }

    pub fn object(identity: impl Into<String>) -> Type {
        Type::Object {
            identity: identity.into(),
            args: Vec::new(),
        }
    }

    /// Wrap `inner` in a two-member union with `null`.
    pub fn nullable(inner: Type) -> Type {
        if inner.is_nullable() {
            return inner;
        }
        match inner {
            Type::Union(mut members) => {
                members.push(Type::null());
                Type::Union(members)
            }
            other => Type::Union(vec![other, Type::null()]),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Type::Collection { .. })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Type::Collection { ordered: true, .. })
    }

    pub fn is_dict(&self) -> bool {
        matches!(self, Type::Collection { ordered: false, .. })
    }

    /// The key and value types of a collection.
    pub fn element_types(&self) -> Option<(&Type, &Type)> {
        match self {
            Type::Collection { key, value, .. } => Some((key, value)),
            _ => None,
        }
    }

    /// The class identity of an object type.
    pub fn class_identity(&self) -> Option<&str> {
        match self {
            Type::Object { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Whether this type admits `null` (is the null scalar, or a union
    /// containing it at any nesting level).
    pub fn is_nullable(&self) -> bool {
        match self {
            Type::Scalar(ScalarKind::Null) => true,
            Type::Union(members) => members.iter().any(Type::is_nullable),
            _ => false,
        }
    }

    /// The canonical string form (same as `Display`).
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Scalar(kind) => f.write_str(kind.name()),
            Type::Enum { identity, .. } => f.write_str(identity),
            Type::Union(members) => {
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    write!(f, "{}", m)?;
                }
                Ok(())
            }
            Type::Collection {
                key,
                value,
                ordered,
            } => {
                if *ordered {
                    write!(f, "list<{}>", value)
                } else {
                    write!(f, "dict<{},{}>", key, value)
                }
            }
            Type::Object { identity, args } => {
                f.write_str(identity)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            Type::Template(name) => f.write_str(name),
        }
    }
}
