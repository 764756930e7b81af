//! Native fallback format for values outside the [`Payload`](crate::types::Payload) shape.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::traits::{CacheValue, Decoded, FORMAT_VERSION, MARKER_NATIVE};
use crate::CoreError;

/// Wraps any serde type so it can be cached.
///
/// ```
/// use rowcache_core::encoding::{CacheValue, Decoded, Native};
///
/// #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// struct Car { id: i64, name: String }
///
/// let car = Native(Car { id: 1, name: "Volvo".into() });
/// let bytes = car.encode_value().unwrap();
/// assert_eq!(Native::<Car>::decode_value(&bytes), Decoded::Value(car));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Native<T>(pub T);

impl<T> Native<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> CacheValue for Native<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode_value(&self) -> Result<Vec<u8>, CoreError> {
        let mut buf = vec![MARKER_NATIVE, FORMAT_VERSION];
        serde_json::to_writer(&mut buf, &self.0)
            .map_err(|e| CoreError::encoding(format!("native encoding failed: {e}")))?;
        Ok(buf)
    }

    fn decode_value(bytes: &[u8]) -> Decoded<Self> {
        match bytes {
            [MARKER_NATIVE, FORMAT_VERSION, body @ ..] => {
                serde_json::from_slice(body)
                    .map_or(Decoded::Undecodable, |value| Decoded::Value(Self(value)))
            }
            _ => Decoded::Undecodable,
        }
    }
}
