//! Reader and writer for the Java object serialization stream format
//! (stream magic `0xACED`, version `0x0005`).
//!
//! [raw] holds the wire grammar: stream tags, class descriptors, objects,
//! arrays, strings, and the custom-writer strategies used by the collection
//! classes. [structured] holds read-only views over the decoded tree, most
//! notably its JSON projection.

pub mod errors;
pub mod handle;
pub mod raw;
pub mod structured;

mod utilities;

pub use crate::errors::{Error, Result};
pub use crate::raw::{
	deserialize_stream, deserialize_stream_with, serialize_entity, serialize_entity_with, Value,
};
pub use crate::structured::projection::project;
