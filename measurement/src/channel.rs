//! Transport buffers for device-generated instrumentation records
//!
//! Producers check buffers out of a channel-scoped pool, the device
//! fills them, and a consumer drains and returns them. An externally
//! supplied atomic balance counter, rather than a lock, tells the consumer
//! when every outstanding producer write has landed, so the host never
//! blocks the device's asynchronous stream to reclaim a buffer.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use warpscope_shared::types::record::PatchRecord;

use crate::config::{ChannelConfig, GrowthPolicy};
use crate::context::ThreadContext;

/// Channel ids stamp buffers so a buffer cannot be freed into a pool it
/// was not allocated from.
static NEXT_CHANNEL_ID: AtomicU64 = AtomicU64::new(1);

/// Instrumentation stream type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    MemoryAccess,
    Timing,
}

/// Provenance attached to a checked-out buffer by `produce`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferHead {
    /// Host thread that issued the instrumented launch
    pub thread_id: u32,

    /// Loaded cubin the kernel came from
    pub cubin_id: u32,

    /// Module instance within the cubin
    pub mod_id: u32,

    /// Kernel index within the module
    pub kernel_id: i32,

    /// Host-side logical operation id for correlation
    pub host_op_id: u64,

    /// Instrumentation stream this buffer belongs to
    pub kind: RecordKind,

    /// Records the device reported writing
    pub num_records: usize,

    /// Whether the producing stream is asynchronous
    pub is_async: bool,
}

/// Errors from channel operations
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("buffer pool exhausted ({outstanding} buffers outstanding)")]
    Exhausted { outstanding: usize },

    #[error("buffer from channel {buffer_channel} cannot be freed into channel {channel}")]
    ForeignBuffer { buffer_channel: u64, channel: u64 },

    #[error("record processing re-entered from an internal region")]
    Reentered,
}

/// A fixed-capacity transport buffer owned by one channel
#[derive(Debug)]
pub struct Buffer {
    channel_id: u64,
    capacity: usize,
    head: Option<BufferHead>,
    records: Vec<PatchRecord>,
}

impl Buffer {
    fn new(channel_id: u64, capacity: usize) -> Self {
        Self {
            channel_id,
            capacity,
            head: None,
            records: Vec::with_capacity(capacity),
        }
    }

    /// Provenance set by the last `produce`, if any.
    pub fn head(&self) -> Option<&BufferHead> {
        self.head.as_ref()
    }

    /// Records written so far.
    pub fn records(&self) -> &[PatchRecord] {
        &self.records
    }

    /// Payload region for the device-side writer.
    pub fn records_mut(&mut self) -> &mut Vec<PatchRecord> {
        &mut self.records
    }

    /// Fixed record capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attach provenance and mark the buffer outstanding.
    ///
    /// The balance increment uses release ordering: a consumer that
    /// observes it with an acquire load also observes the head and
    /// records written before it. The producer side is called from
    /// GPU-triggered context and never blocks on the host draining.
    pub fn produce(&mut self, head: BufferHead, balance: &AtomicU32) {
        debug!(
            host_op_id = head.host_op_id,
            num_records = head.num_records,
            "buffer produced"
        );
        self.head = Some(head);
        balance.fetch_add(1, Ordering::Release);
    }
}

/// Downstream consumer of drained records
pub trait RecordSink: Send + Sync {
    /// Handle one drained buffer's records.
    fn consume(&self, head: &BufferHead, records: &[PatchRecord]);
}

#[derive(Debug)]
struct Pool {
    free: Vec<Buffer>,
    allocated: usize,
}

/// Channel-scoped buffer pool with a configured drain sink.
///
/// One channel per logical stream; buffers allocated here must be freed
/// here. The free list mutex is held only for push/pop, never across
/// record production or sink processing.
pub struct BufferChannel {
    id: u64,
    config: ChannelConfig,
    sink: Arc<dyn RecordSink>,
    pool: Mutex<Pool>,
    freed: Condvar,
}

impl BufferChannel {
    /// Create a channel with a validated configuration and a drain sink.
    pub fn new(config: ChannelConfig, sink: Arc<dyn RecordSink>) -> anyhow::Result<Self> {
        config.validate()?;
        Ok(Self {
            id: NEXT_CHANNEL_ID.fetch_add(1, Ordering::Relaxed),
            config,
            sink,
            pool: Mutex::new(Pool {
                free: Vec::new(),
                allocated: 0,
            }),
            freed: Condvar::new(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Check a buffer out of the pool.
    ///
    /// Pops the free list when possible and grows the pool while below
    /// the ceiling. Once the ceiling is reached the growth policy
    /// decides: `Block` waits for a `free`, `Grow` allocates anyway.
    pub fn alloc(&self) -> Buffer {
        let mut pool = self.pool.lock();
        loop {
            if let Some(buffer) = pool.free.pop() {
                return buffer;
            }
            if pool.allocated < self.config.pool_ceiling {
                pool.allocated += 1;
                return Buffer::new(self.id, self.config.records_per_buffer);
            }
            match self.config.growth {
                GrowthPolicy::Grow => {
                    warn!(
                        channel = self.id,
                        allocated = pool.allocated,
                        "pool ceiling reached, growing"
                    );
                    pool.allocated += 1;
                    return Buffer::new(self.id, self.config.records_per_buffer);
                }
                GrowthPolicy::Block => {
                    self.freed.wait(&mut pool);
                }
            }
        }
    }

    /// Non-blocking `alloc`.
    ///
    /// Reports exhaustion instead of waiting, leaving the producer the
    /// decision to drop the record batch or block on `alloc`.
    pub fn try_alloc(&self) -> Result<Buffer, ChannelError> {
        let mut pool = self.pool.lock();
        if let Some(buffer) = pool.free.pop() {
            return Ok(buffer);
        }
        if pool.allocated < self.config.pool_ceiling
            || self.config.growth == GrowthPolicy::Grow
        {
            pool.allocated += 1;
            return Ok(Buffer::new(self.id, self.config.records_per_buffer));
        }
        Err(ChannelError::Exhausted {
            outstanding: pool.allocated,
        })
    }

    /// Drain a completed buffer into the configured sink.
    ///
    /// Called once the device signals that all records for the buffer
    /// have landed. Does not return the buffer to the pool. Refused when
    /// the calling thread is already inside an internal region: a sink
    /// that re-entered the instrumented runtime would otherwise recurse
    /// into its own drain path.
    pub fn process(&self, ctx: &ThreadContext, buffer: &Buffer) -> Result<(), ChannelError> {
        let _scope = ctx.enter_internal().ok_or(ChannelError::Reentered)?;
        let Some(head) = buffer.head() else {
            debug!(channel = self.id, "process on unproduced buffer, nothing to drain");
            return Ok(());
        };
        self.sink.consume(head, buffer.records());
        Ok(())
    }

    /// Return a buffer to its owning channel and retire its balance.
    ///
    /// A buffer from another channel is rejected without touching the
    /// free list or the balance; ownership is channel-scoped, not
    /// global. The balance decrement uses release ordering, pairing
    /// with the acquire load in [`balance_settled`]: whoever observes
    /// the counter at zero also observes the buffer fully drained and
    /// reusable.
    pub fn free(&self, mut buffer: Buffer, balance: &AtomicU32) -> Result<(), ChannelError> {
        if buffer.channel_id != self.id {
            return Err(ChannelError::ForeignBuffer {
                buffer_channel: buffer.channel_id,
                channel: self.id,
            });
        }
        buffer.head = None;
        buffer.records.clear();
        {
            let mut pool = self.pool.lock();
            pool.free.push(buffer);
        }
        self.freed.notify_one();
        balance.fetch_sub(1, Ordering::Release);
        Ok(())
    }

    /// Buffers currently checked out of the pool.
    pub fn outstanding(&self) -> usize {
        let pool = self.pool.lock();
        pool.allocated - pool.free.len()
    }
}

/// Whether every produced buffer counted on `balance` has been freed.
///
/// The acquire load pairs with the release increments in `produce` and
/// decrements in `free`; once this returns true, all record writes
/// behind those operations are visible to the caller.
pub fn balance_settled(balance: &AtomicU32) -> bool {
    balance.load(Ordering::Acquire) == 0
}
