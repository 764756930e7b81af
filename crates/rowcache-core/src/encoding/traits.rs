//! Encoding traits shared by both payload formats.

use crate::CoreError;

/// Format version for encoded values.
///
/// Embedded in the header of every encoded value; values written with a
/// different version decode as [`Decoded::Undecodable`].
pub const FORMAT_VERSION: u8 = 1;

/// Header marker for the structured [`Payload`](crate::types::Payload) format.
pub(crate) const MARKER_STRUCTURED: u8 = 0x01;

/// Header marker for the native (serde JSON) format.
pub(crate) const MARKER_NATIVE: u8 = 0x02;

/// A trait for types that can be encoded to bytes.
pub trait Encoder: Sized {
    /// Encode this value to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails (e.g., a string longer than 4 GiB).
    fn encode(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::new();
        self.encode_to(&mut buf)?;
        Ok(buf)
    }

    /// Encode this value into a pre-allocated buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), CoreError>;
}

/// The outcome of decoding a stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// The bytes decoded to a value.
    Value(T),
    /// The bytes are corrupt, truncated, or in another format or version.
    Undecodable,
}

impl<T> Decoded<T> {
    /// Convert into an `Option`, discarding the undecodable case.
    #[must_use]
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Undecodable => None,
        }
    }

    /// Returns `true` if decoding failed.
    #[must_use]
    pub const fn is_undecodable(&self) -> bool {
        matches!(self, Self::Undecodable)
    }
}

/// A value the cache can store and load.
///
/// Implemented by [`Payload`](crate::types::Payload) (structured format) and
/// by [`Native<T>`](super::Native) for any serde type.
pub trait CacheValue: Sized {
    /// Encode the value, header included.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded.
    fn encode_value(&self) -> Result<Vec<u8>, CoreError>;

    /// Decode a value previously produced by [`CacheValue::encode_value`].
    fn decode_value(bytes: &[u8]) -> Decoded<Self>;
}
