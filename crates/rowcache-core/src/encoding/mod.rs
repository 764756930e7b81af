//! Serialization of cached values.
//!
//! This module turns result values into bytes for the shared store and back.
//!
//! # Formats
//!
//! Every encoded value starts with a 2-byte header: a format marker and the
//! [`FORMAT_VERSION`].
//!
//! - **Structured** ([`Payload`](crate::types::Payload)): a compact, type-tagged
//!   binary format that round-trips scalars, ordered lists and key-ordered maps
//!   losslessly.
//! - **Native** ([`Native`]): any serde type, stored as JSON. Used for values
//!   outside the structured shape.
//!
//! # Decoding never fails loudly
//!
//! A cached payload can be half-written, written by an incompatible version, or
//! written in the other format. Decoding therefore returns [`Decoded`] instead
//! of a `Result`: corrupt input yields [`Decoded::Undecodable`] and the caller
//! treats it as a cache miss.
//!
//! # Example
//!
//! ```
//! use rowcache_core::encoding::{CacheValue, Decoded};
//! use rowcache_core::Payload;
//!
//! let value = Payload::List(vec![Payload::Int(1), Payload::from("two")]);
//! let bytes = value.encode_value().unwrap();
//! assert_eq!(Payload::decode_value(&bytes), Decoded::Value(value));
//!
//! assert_eq!(Payload::decode_value(b"garbage"), Decoded::Undecodable);
//! ```

mod native;
mod payload;
mod traits;


pub use native::Native;
pub use payload::decode_payload;
pub use traits::{CacheValue, Decoded, Encoder, FORMAT_VERSION};
