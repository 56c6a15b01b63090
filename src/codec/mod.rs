//! Plan executors: JSON encoding, eager decoding, boundary splitting and
//! lazy decode views.

pub mod decoder;
pub mod encoder;
pub mod lazy;
pub mod splitter;

pub use decoder::{decode, PartialResult};
pub use encoder::encode;
pub use lazy::{decode_lazy, LazyDict, LazyList, LazyObject, LazyValue};
pub use splitter::{split_dict, split_list, Boundary};
