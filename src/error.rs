/// Errors from the type-expression parser.
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
    #[error("malformed type '{input}': {message}")]
    Malformed { input: String, message: String },

    #[error("generic arity mismatch for '{identity}': declared {expected} parameter(s), got {found} argument(s)")]
    GenericArity {
        identity: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown type '{0}'")]
    Unknown(String),
}

/// Errors raised while compiling a node tree.
///
/// Build errors indicate a programming or configuration mistake and are
/// never recovered; they abort the whole build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("unknown class '{0}'")]
    UnknownClass(String),

    #[error("unknown formatter '{0}'")]
    UnknownFormatter(String),

    #[error("missing runtime service '{parameter}' required by formatter '{formatter}'")]
    MissingRuntimeService {
        formatter: String,
        parameter: String,
    },

    #[error("unbound template parameter '{parameter}' in '{identity}'")]
    UnboundTemplate { identity: String, parameter: String },
}

/// A formatter rejected a value while an accessor chain was running.
#[derive(Debug, thiserror::Error)]
#[error("formatter '{formatter}' failed: {message}")]
pub struct TransformError {
    pub formatter: String,
    pub message: String,
}

impl TransformError {
    pub fn new(formatter: impl Into<String>, message: impl Into<String>) -> Self {
        TransformError {
            formatter: formatter.into(),
            message: message.into(),
        }
    }
}

/// Errors from the encode executor.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("circular reference through '{identity}' at depth {depth}")]
    CircularReference { identity: String, depth: usize },

    #[error("type mismatch at '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("no member of union '{union}' matches the value at '{path}'")]
    NoUnionMember { path: String, union: String },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the decode executors (eager, partial and lazy).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected type at '{path}': expected {expected}, got {actual}")]
    UnexpectedType {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("ambiguous union '{union}' at '{path}': no selector configured")]
    AmbiguousUnion { path: String, union: String },

    #[error("union selector for '{union}' names unknown member '{member}'")]
    UnknownUnionMember { union: String, member: String },

    #[error("malformed document at offset {offset}: {message}")]
    MalformedDocument { offset: usize, message: String },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Whether `collect_errors` may recover from this error at the current
    /// element and continue. Document-level desyncs and configuration gaps
    /// always abort.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecodeError::UnexpectedType { .. } | DecodeError::Transform(_)
        )
    }
}

/// Top-level error type that wraps all sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type alias for jsonplan operations.
pub type Result<T> = std::result::Result<T, PlanError>;
