//! The target graph: arena storage and the resolution driver.
//!
//! Targets are owned by a flat [`BuildGraph`] arena keyed by label.
//! [`resolve_all`] mutates the arena single-threaded until every target is
//! `Resolved`; from then on the graph is only read, which is what makes the
//! query engine in [`crate::resolved`] safe to instantiate per-thread over
//! shared borrows.

mod arena;
mod driver;

pub use arena::{BuildGraph, TargetId, ToolchainId};
pub use driver::{resolve_all, ResolveError, ResolveFailure};
