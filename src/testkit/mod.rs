//! Test kit - reference implementations of the two collaborator seams.
//!
//! The binding consumes an observable engine and a host view library
//! through capability traits; this module ships a minimal, correct
//! implementation of each so the crate's own test-suite (and a downstream
//! host's) can exercise the full lifecycle without either real
//! collaborator:
//!
//! - [`TestEngine`] / [`ObservableCell`] - dependency-tracking cells with
//!   equality-gated writes and at-most-one invalidation per cycle
//! - [`TestHost`] - a retained-mode host driving mounts, scheduled update
//!   flushes, store-scope propagation and unmounts over `V = String`
//!
//! These are reference implementations for tests and examples, not
//! production collaborators.

mod engine;
mod host;

pub use engine::{ObservableCell, TestEngine};
pub use host::{HostId, TestHost};
