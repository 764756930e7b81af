//! Scalar values: bound parameters and predicate operands.
//!
//! # Example
//!
//! ```
//! use rowcache_core::Scalar;
//!
//! let id: Scalar = 10i64.into();
//! assert_eq!(id.as_int(), Some(10));
//! assert_eq!(id.row_id().as_deref(), Some("10"));
//!
//! // Integral floats render like the integer they equal
//! assert_eq!(Scalar::from(10.0f64).row_id().as_deref(), Some("10"));
//! assert_eq!(Scalar::Null.row_id(), None);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single scalar value as supplied by the statement description provider.
///
/// Scalars appear as bound parameters (hashed into the cache key) and as
/// predicate operands (inspected for primary-key row identification).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// SQL `NULL`
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl Scalar {
    /// Returns `true` if this is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `String`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render this scalar as a row identifier for tag construction.
    ///
    /// `Null` never identifies a row and yields `None`. Floats with no
    /// fractional part render like the equal integer so that `10` and `10.0`
    /// address the same row tag.
    #[must_use]
    pub fn row_id(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
                    // Exact: the magnitude check keeps the value inside i64's
                    // contiguous integer range.
                    #[allow(clippy::cast_possible_truncation)]
                    Some((*f as i64).to_string())
                } else if f.is_finite() {
                    Some(f.to_string())
                } else {
                    None
                }
            }
            Self::String(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Scalar {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
