//! Live measurement path for warpscope
//!
//! Process-wide shared state for a profiling session: the correlation
//! map linking asynchronously issued device operations to their
//! host-side identity and timing, and the buffer channels moving
//! device-generated instrumentation records into host memory without
//! stalling the instrumented kernel.
//!
//! The GPU runtime binding is an external collaborator; it drives this
//! crate through `insert`/`lookup`/`kernel_update`/`delete` on
//! [`CorrelationMap`] and `alloc`/`produce`/`process`/`free` on
//! [`BufferChannel`]. Callback handlers run on runtime-managed threads
//! and must not block for long, so every critical section here is short
//! and the producer/consumer handoff is an atomic balance counter, not a
//! lock.

pub mod channel;
pub mod config;
pub mod context;
pub mod correlation;

// Re-export the measurement surface
pub use channel::{
    balance_settled, Buffer, BufferChannel, BufferHead, ChannelError, RecordKind, RecordSink,
};
pub use config::{ChannelConfig, GrowthPolicy};
pub use context::{InternalScope, ThreadContext};
pub use correlation::{CorrelationEntry, CorrelationId, CorrelationMap, ExternalId};
