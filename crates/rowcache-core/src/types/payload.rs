//! Cacheable result values.
//!
//! [`Payload`] is the shape the cache stores losslessly with its own binary
//! format: scalars, ordered lists and key-ordered maps. Anything else goes
//! through the native fallback, see [`crate::encoding::Native`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scalar::Scalar;

/// A result value that can be stored in the cache.
///
/// # Example
///
/// ```
/// use rowcache_core::Payload;
///
/// let row = Payload::map([("id", Payload::from(10)), ("name", Payload::from("Volvo"))]);
/// let rows = Payload::List(vec![row]);
/// assert_eq!(rows.as_list().map(<[Payload]>::len), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Null/missing value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered list of values
    List(Vec<Payload>),
    /// Map ordered by key
    Map(BTreeMap<String, Payload>),
}

impl Payload {
    /// Build a map payload from key/value pairs.
    #[must_use]
    pub fn map<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Payload)>,
        K: Into<String>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the list elements, if this is a `List`.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Payload]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map, if this is a `Map`.
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, Payload>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key, if this is a `Map`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Payload> {
        self.as_map().and_then(|m| m.get(key))
    }
}

impl From<Scalar> for Payload {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Null => Self::Null,
            Scalar::Bool(b) => Self::Bool(b),
            Scalar::Int(i) => Self::Int(i),
            Scalar::Float(f) => Self::Float(f),
            Scalar::String(s) => Self::String(s),
        }
    }
}

impl From<bool> for Payload {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Payload {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Payload {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Payload {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(items: Vec<Payload>) -> Self {
        Self::List(items)
    }
}

impl From<BTreeMap<String, Payload>> for Payload {
    fn from(map: BTreeMap<String, Payload>) -> Self {
        Self::Map(map)
    }
}
