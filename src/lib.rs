//! jsonplan: a typed data-model compiler and JSON codec.
//!
//! Class definitions (from a catalog) and type expressions like
//! `list<?Point>` are compiled into cached execution plans; the executors
//! then encode native values to JSON, decode JSON eagerly (optionally
//! collecting per-element errors into a partial result), or decode lazily
//! through boundary-split views that only materialize the elements you
//! touch.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use jsonplan::catalog::{Catalog, ClassDef, PropertyDef};
//! use jsonplan::{Config, Engine, Value};
//!
//! let mut catalog = Catalog::new();
//! catalog.add_class(
//!     ClassDef::new("Point")
//!         .property(PropertyDef::new("x", "int"))
//!         .property(PropertyDef::new("y", "int")),
//! );
//!
//! let engine = Engine::builder(Arc::new(catalog)).build();
//! let config = Config::new();
//! let point = Value::object("Point", vec![
//!     ("x", Value::Int(1)),
//!     ("y", Value::Int(2)),
//! ]);
//!
//! let encoded = engine.encode_to_vec("Point", &point, &config).unwrap();
//! assert_eq!(encoded, br#"{"x":1,"y":2}"#);
//!
//! let decoded = engine.decode("Point", &encoded, &config).unwrap();
//! assert_eq!(decoded.value, point);
//! ```

pub mod catalog;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod parser;
pub mod plan;
pub mod types;
pub mod value;

pub use codec::{LazyValue, PartialResult};
pub use config::Config;
pub use engine::{Engine, EngineBuilder};
pub use error::{PlanError, Result};
pub use types::Type;
pub use value::Value;
