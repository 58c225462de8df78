/// Bounded byte buffer that batches encoded lines into `CopyData` chunks.
///
/// The buffer is drained whenever it reaches the flush threshold, so it never
/// holds more than `flush_bytes` plus one line.
#[derive(Debug)]
pub struct CopyBuffer {
    bytes: Vec<u8>,
    flush_bytes: usize,
}

// Upper bound on the up-front allocation; larger thresholds grow on demand.
const MAX_PREALLOCATED: usize = 1024 * 1024;

impl CopyBuffer {
    pub fn new(flush_bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(flush_bytes.min(MAX_PREALLOCATED)),
            flush_bytes,
        }
    }

    /// Append a line; returns `true` once the buffer should be flushed.
    pub fn push(&mut self, line: &[u8]) -> bool {
        self.bytes.extend_from_slice(line);
        self.bytes.len() >= self.flush_bytes
    }

    pub fn pending(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drop pending bytes, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
