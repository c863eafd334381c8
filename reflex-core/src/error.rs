//! Error Types
//!
//! "Nothing to do" situations (tracking with no active computation,
//! triggering a key nobody depends on) are silent no-ops and never surface
//! here. Only failures of the underlying data operation are reported.

use thiserror::Error;

use crate::value::PropertyKey;

pub type Result<T> = std::result::Result<T, ReactiveError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReactiveError {
    /// Write or delete on a frozen target.
    #[error("cannot modify property `{key}` of a frozen object")]
    Frozen { key: PropertyKey },

    /// A named (non-index) key used on an array.
    #[error("property key `{key}` is not a valid array index")]
    InvalidKey { key: PropertyKey },

    /// Property access through a value that is not an object.
    #[error("cannot access property `{key}` of a non-object value")]
    NotAnObject { key: PropertyKey },

    #[error("invalid engine configuration: {0}")]
    Config(String),
}
