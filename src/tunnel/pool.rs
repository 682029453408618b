//! Shared pool of fixed-size frame buffers
//!
//! Buffers are handed out as [`PooledBuffer`] handles which return
//! themselves to the pool when dropped. The pool only saves allocations;
//! behavior is identical with pooling disabled.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, OnceLock};

/// Default buffer size (128 KB - one maximum frame plus overhead)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Maximum number of idle buffers kept by the global pool
pub const DEFAULT_MAX_BUFFERS: usize = 256;

struct Inner {
    free: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
    max_buffers: usize,
}

/// A thread-safe pool of equally sized byte buffers
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("buffer_size", &self.inner.buffer_size)
            .field("max_buffers", &self.inner.max_buffers)
            .field("idle", &self.idle())
            .finish()
    }
}

impl BufferPool {
    /// Create a pool of `buffer_size`-byte buffers keeping at most
    /// `max_buffers` idle
    pub fn new(buffer_size: usize, max_buffers: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                free: Mutex::new(Vec::with_capacity(max_buffers.min(64))),
                buffer_size,
                max_buffers,
            }),
        }
    }

    /// Process-wide pool with default sizing
    pub fn global() -> &'static BufferPool {
        static GLOBAL: OnceLock<BufferPool> = OnceLock::new();
        GLOBAL.get_or_init(|| BufferPool::new(DEFAULT_BUFFER_SIZE, DEFAULT_MAX_BUFFERS))
    }

    /// A pool that never retains buffers
    pub fn disabled() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE, 0)
    }

    /// Number of idle buffers currently held
    pub fn idle(&self) -> usize {
        self.inner.free.lock().len()
    }

    /// Take a buffer, allocating if none is idle
    ///
    /// Contents of a reused buffer are unspecified.
    pub fn acquire(&self) -> PooledBuffer {
        let buf = self
            .inner
            .free
            .lock()
            .pop()
            .unwrap_or_else(|| vec![0u8; self.inner.buffer_size]);

        PooledBuffer {
            buf,
            pool: self.inner.clone(),
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::global().clone()
    }
}

/// A buffer on loan from a [`BufferPool`]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<Inner>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        if buf.len() != self.pool.buffer_size {
            return;
        }

        let mut free = self.pool.free.lock();
        if free.len() < self.pool.max_buffers {
            free.push(buf);
        }
    }
}
