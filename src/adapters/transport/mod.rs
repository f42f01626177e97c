//! Push transport adapters.
//!
//! - `SseTransport` - Server-Sent Events over reqwest (production)
//! - `InMemoryTransport` - Scriptable streams (testing)

mod in_memory;
mod sse;

pub use in_memory::InMemoryTransport;
pub use sse::{SseConfig, SseTransport, DEFAULT_STREAM_PATH, SESSION_ID_PLACEHOLDER};
