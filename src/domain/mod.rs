//! Domain layer - real-time session vocabulary with no I/O.

pub mod foundation;
pub mod realtime;
