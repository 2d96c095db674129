//! Buffer Pool
//!
//! Scratch buffers used to flatten multi-segment payloads before a store write.

use std::ops::Deref;

use parking_lot::Mutex;

use crate::cache::Payload;

/// Buffers kept around for reuse once returned.
const MAX_POOLED_BUFFERS: usize = 16;

/// Buffers larger than this are dropped instead of pooled.
const MAX_POOLED_CAPACITY: usize = 1024 * 1024;

// == Buffer Pool ==
/// Pool of reusable byte buffers shared by all operations of a cache.
#[derive(Debug, Default)]
pub struct BufferPool {
    free: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrows a cleared buffer with at least `capacity` bytes reserved.
    pub fn rent(&self, capacity: usize) -> PooledBuffer<'_> {
        let mut buf = self.free.lock().pop().unwrap_or_default();
        buf.clear();
        buf.reserve(capacity);
        PooledBuffer {
            pool: self,
            buf: Some(buf),
        }
    }

    /// Number of buffers currently waiting for reuse.
    pub fn available(&self) -> usize {
        self.free.lock().len()
    }

    fn give_back(&self, buf: Vec<u8>) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        let mut free = self.free.lock();
        if free.len() < MAX_POOLED_BUFFERS {
            free.push(buf);
        }
    }

    /// Presents `payload` as one slice, leasing a scratch buffer only when it has several segments.
    pub fn contiguous<'a>(&'a self, payload: &'a Payload) -> Contiguous<'a> {
        match payload.segments() {
            [] => Contiguous::Borrowed(&[]),
            [single] => Contiguous::Borrowed(single.as_ref()),
            segments => {
                let mut lease = self.rent(payload.len());
                for segment in segments {
                    lease.extend_from_slice(segment);
                }
                Contiguous::Leased(lease)
            }
        }
    }
}

// == Pooled Buffer ==
/// Buffer on loan from a [`BufferPool`]; returned on drop.
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<Vec<u8>>,
}

impl PooledBuffer<'_> {
    fn extend_from_slice(&mut self, bytes: &[u8]) {
        if let Some(buf) = self.buf.as_mut() {
            buf.extend_from_slice(bytes);
        }
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.give_back(buf);
        }
    }
}

// == Contiguous View ==
/// A payload viewed as a single slice.
#[derive(Debug)]
pub enum Contiguous<'a> {
    /// The payload already was one segment
    Borrowed(&'a [u8]),
    /// Segments were copied into a leased buffer
    Leased(PooledBuffer<'a>),
}

impl Contiguous<'_> {
    pub fn is_leased(&self) -> bool {
        matches!(self, Contiguous::Leased(_))
    }
}

impl Deref for Contiguous<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Contiguous::Borrowed(bytes) => *bytes,
            Contiguous::Leased(lease) => &**lease,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_single_segment_is_borrowed() {
        let pool = BufferPool::new();
        let payload = Payload::single(Bytes::from_static(b"abc"));

        let view = pool.contiguous(&payload);
        assert!(!view.is_leased());
        assert_eq!(&*view, b"abc");
        drop(view);

        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_multi_segment_is_leased_and_returned() {
        let pool = BufferPool::new();
        let payload = Payload::from_segments(vec![
            Bytes::from_static(b"ab"),
            Bytes::from_static(b"cd"),
        ]);

        {
            let view = pool.contiguous(&payload);
            assert!(view.is_leased());
            assert_eq!(&*view, b"abcd");
            assert_eq!(pool.available(), 0);
        }

        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_rented_buffer_is_reused_and_cleared() {
        let pool = BufferPool::new();
        let first = Payload::from_segments(vec![
            Bytes::from_static(b"xxxx"),
            Bytes::from_static(b"yyyy"),
        ]);
        drop(pool.contiguous(&first));

        let second =
            Payload::from_segments(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")]);
        let view = pool.contiguous(&second);
        assert_eq!(&*view, b"ab");
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_oversized_buffers_not_pooled() {
        let pool = BufferPool::new();
        drop(pool.rent(MAX_POOLED_CAPACITY + 1));
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = BufferPool::new();
        let leases: Vec<_> = (0..MAX_POOLED_BUFFERS + 4).map(|_| pool.rent(8)).collect();
        drop(leases);
        assert_eq!(pool.available(), MAX_POOLED_BUFFERS);
    }
}
