//! Core data types.
//!
//! - [`Scalar`] - bound parameters and predicate operands
//! - [`Statement`] - structured statement descriptions ([`TableRef`], [`Predicate`])
//! - [`Payload`] - cacheable result values

mod payload;
mod scalar;
mod statement;

pub use payload::Payload;
pub use scalar::Scalar;
pub use statement::{
    ConnectionId, Connective, DeclaredKind, Operator, Predicate, Statement, StatementKind,
    TableRef,
};
