//! Type system for PFA documents.
//!
//! - [`Type`]: concrete Avro types (plus first-class function types)
//! - [`Type::accepts`]: the structural compatibility relation
//! - [`schema`]: Avro-JSON type parsing and serialization
//! - [`Pattern`] / [`SignatureSet`]: wildcard-bearing signature descriptors
//!   and first-match resolution against call-site argument types
//!
//! Wildcards live only in `Pattern`; a `Type` is always concrete, so a
//! resolved program can never carry an unbound wildcard.

mod accepts;
mod pattern;
pub mod schema;
mod signature;
mod ty;

pub use pattern::{Pattern, WildId};
pub use schema::{NameGenerator, SchemaParser, TypeRegistry};
pub use signature::{Resolved, Sig, SignatureSet};
pub use ty::{EnumType, FcnType, Field, FixedType, RecordType, Type};

#[cfg(test)]
mod tests;
