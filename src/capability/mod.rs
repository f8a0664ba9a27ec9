//! Pluggable per-resource-kind capability table.
//!
//! Each resource kind the engine can handle is described by one immutable
//! [`KindCapabilities`] record: the permission requests it needs, an optional
//! watch-source factory and optional delete/restart/read/search operations.
//! The engine treats the table as a fixed lookup supplied at construction —
//! a missing entry or a missing operation is an optional/None check, never a
//! crash.

mod object;
mod table;
pub use object::*;
pub use table::*;

#[cfg(test)]
mod table_test;
