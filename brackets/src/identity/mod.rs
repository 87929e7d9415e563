//! External identifiers for stages.
//!
//! Callers may name a stage with an opaque string. The mapping is an explicit
//! one-to-one table created with the stage and persisted next to it; internal
//! IDs are never derived from the string.

pub mod mapper;
pub mod table;

pub use mapper::IdentityMapper;
pub use table::IdentityTable;
