//! Application layer - Composition root.
//!
//! Wires ports and adapters into a ready-to-use real-time runtime.

mod runtime;

pub use runtime::{RealtimeRuntime, RuntimeError};
