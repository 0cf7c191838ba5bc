// [libs/infra/emit/src/batch.rs]
//! Batch Buffer: a fixed-capacity accumulator, safe for many producers and
//! one consumer. Deliberately a `Mutex<Vec<String>>` rather than an mpsc
//! channel so `add` can express "refuse, caller forces a flush and
//! retries" instead of a channel's own backpressure semantics.

use parking_lot::Mutex;

use crate::errors::BufferFull;

struct Inner {
    lines: Vec<String>,
    bytes: usize,
}

pub struct BatchBuffer {
    max_lines: usize,
    max_bytes: usize,
    inner: Mutex<Inner>,
}

impl BatchBuffer {
    pub fn new(max_lines: usize, max_bytes: usize) -> Self {
        Self {
            max_lines,
            max_bytes,
            inner: Mutex::new(Inner {
                lines: Vec::new(),
                bytes: 0,
            }),
        }
    }

    /// Returns `Err(BufferFull)` without storing `line` when either bound
    /// would be exceeded. The caller is expected to force a flush and
    /// retry once.
    pub fn add(&self, line: String) -> Result<(), BufferFull> {
        let mut inner = self.inner.lock();
        let would_be_lines = inner.lines.len() + 1;
        let would_be_bytes = inner.bytes + line.len();
        if would_be_lines > self.max_lines || would_be_bytes > self.max_bytes {
            return Err(BufferFull {
                lines: inner.lines.len(),
                bytes: inner.bytes,
            });
        }
        inner.bytes = would_be_bytes;
        inner.lines.push(line);
        Ok(())
    }

    /// Atomically returns and clears the accumulated lines.
    pub fn flush(&self) -> Vec<String> {
        let mut inner = self.inner.lock();
        inner.bytes = 0;
        std::mem::take(&mut inner.lines)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
