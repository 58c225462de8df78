//! Bulk sinks: streaming targets for encoded CSV lines.
//!
//! A sink never commits. Completing the channel with [`LineSink::finish`]
//! only makes the rows part of the destination's open transaction.

pub mod buffer;
pub mod copy_in;

pub use buffer::CopyBuffer;
pub use copy_in::CopyInSink;

use crate::error::TransferResult;

/// Default number of buffered bytes before a chunk is sent (64 KiB).
pub const DEFAULT_FLUSH_BYTES: usize = 64 * 1024;

#[allow(async_fn_in_trait)]
pub trait LineSink {
    /// Accept one complete encoded line.
    async fn write_line(&mut self, line: &[u8]) -> TransferResult<()>;

    /// Flush pending bytes and complete the channel. Returns the number of
    /// rows the destination reports as loaded.
    async fn finish(self) -> TransferResult<u64>;

    /// Abandon the channel; the destination discards everything sent so far.
    async fn abort(self, reason: &str);
}
