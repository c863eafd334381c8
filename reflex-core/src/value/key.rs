//! Property Keys
//!
//! Objects are keyed by name, arrays by index. A name that parses as a
//! non-negative integer is treated as an index when it addresses an array,
//! so `"0"` and `0` reach the same slot.

use std::fmt;
use std::sync::Arc;

/// A property key on an object or array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// A named property (`obj.name`).
    Name(Arc<str>),
    /// An array slot (`arr[3]`).
    Index(usize),
}

impl PropertyKey {
    /// The key used by cells for their single `value` field.
    pub fn value() -> Self {
        Self::Name(Arc::from("value"))
    }

    /// Interpret this key as an array index, if it is one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Name(name) => parse_index(name),
        }
    }

    /// Canonical form used for registry lookups, so `"0"` and `0` share
    /// one dependency set.
    pub fn normalized(self) -> Self {
        match self.as_index() {
            Some(index) => Self::Index(index),
            None => self,
        }
    }

    /// Normalize to the form an object stores: indices become names.
    pub(crate) fn to_name(&self) -> Arc<str> {
        match self {
            Self::Name(name) => Arc::clone(name),
            Self::Index(index) => Arc::from(index.to_string()),
        }
    }
}

/// Canonical array index: digits only, no leading zeros (except "0").
fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || (name.len() > 1 && name.starts_with('0')) {
        return None;
    }
    if !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        Self::Name(Arc::from(name))
    }
}

impl From<String> for PropertyKey {
    fn from(name: String) -> Self {
        Self::Name(Arc::from(name))
    }
}

impl From<Arc<str>> for PropertyKey {
    fn from(name: Arc<str>) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}
