//! Fixed-capacity circular byte queue staging raw bytes between interrupt-level
//! transport code and task-level protocol code.
//!
//! One slot is always left unused so that an empty channel (`write == read`)
//! can be told apart from a full one. Capacity is the storage length, which
//! must be a power of two; the channel holds at most `capacity - 1` bytes.
//!
//! Cursor updates run inside an [`embassy_sync::blocking_mutex::Mutex`]. Pick
//! [`CriticalSectionRawMutex`](embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex)
//! when one side is an interrupt handler, and
//! [`NoopRawMutex`](embassy_sync::blocking_mutex::raw::NoopRawMutex) when both
//! ends live in the same task.
use core::cell::RefCell;

use embassy_sync::blocking_mutex::{raw::RawMutex, Mutex};
use embassy_sync::signal::Signal;

use crate::error::ChannelError;

/// Written into the stream where an overwrite insert discarded old data.
pub const OVERWRITE_MARKER: &[u8] = b" ~ ";

//==================================================================================Ring
/// Cursor state and storage. Only touched while the channel lock is held.
struct Ring<'a> {
    storage: Option<&'a mut [u8]>,
    write: usize,
    read: usize,
    mask: usize,
    overrun: bool,
}

impl<'a> Ring<'a> {
    const fn empty() -> Self {
        Self {
            storage: None,
            write: 0,
            read: 0,
            mask: 0,
            overrun: false,
        }
    }

    fn gauge(&self) -> usize {
        self.write.wrapping_sub(self.read) & self.mask
    }

    fn space(&self) -> usize {
        self.mask - self.gauge()
    }

    /// Copy `data` at the write cursor. Caller guarantees `data.len() <= space()`.
    fn copy_in(&mut self, data: &[u8]) {
        let Some(storage) = self.storage.as_deref_mut() else {
            return;
        };
        let start = self.write;
        let first = (storage.len() - start).min(data.len());
        storage[start..start + first].copy_from_slice(&data[..first]);
        storage[..data.len() - first].copy_from_slice(&data[first..]);
        self.write = (start + data.len()) & self.mask;
    }

    /// Drop up to `count` of the oldest bytes.
    fn discard(&mut self, count: usize) {
        let count = count.min(self.gauge());
        self.read = (self.read + count) & self.mask;
    }

    fn insert(&mut self, bytes: &[u8], overwrite: bool) -> usize {
        if self.storage.is_none() || bytes.is_empty() {
            return 0;
        }

        // Never more than capacity - 1: keep the head when truncating, the
        // tail (newest data) when overwriting.
        let mut data = bytes;
        if data.len() > self.mask {
            data = if overwrite {
                &data[data.len() - self.mask..]
            } else {
                &data[..self.mask]
            };
        }

        let space = self.space();
        if data.len() > space {
            if overwrite {
                // Discard, mark the discontinuity, then insert. The marker shrinks
                // when it cannot fit next to the new data.
                let marker_len = OVERWRITE_MARKER.len().min(self.mask - data.len());
                self.discard(data.len() + marker_len - space);
                self.copy_in(&OVERWRITE_MARKER[..marker_len]);
                self.overrun = true;
            } else {
                data = &data[..space];
            }
        }

        self.copy_in(data);
        data.len()
    }

    fn insert_byte(&mut self, byte: u8) {
        let mask = self.mask;
        let Some(storage) = self.storage.as_deref_mut() else {
            return;
        };
        let next = (self.write + 1) & mask;
        if next == self.read {
            self.overrun = true;
        } else {
            storage[self.write] = byte;
            self.write = next;
        }
    }

    fn extract(&mut self, out: &mut [u8]) -> usize {
        let count = out.len().min(self.gauge());
        let Some(storage) = self.storage.as_deref() else {
            return 0;
        };
        if count == 0 {
            return 0;
        }
        let start = self.read;
        let first = (storage.len() - start).min(count);
        out[..first].copy_from_slice(&storage[start..start + first]);
        out[first..count].copy_from_slice(&storage[..count - first]);
        self.read = (start + count) & self.mask;
        count
    }

    fn extract_byte(&mut self) -> Option<u8> {
        let storage = self.storage.as_deref()?;
        if self.read == self.write {
            return None;
        }
        let byte = storage[self.read];
        self.read = (self.read + 1) & self.mask;
        Some(byte)
    }
}

//==================================================================================ByteChannel
/// Bounded circular byte queue over caller-provided storage.
pub struct ByteChannel<'a, M: RawMutex> {
    ring: Mutex<M, RefCell<Ring<'a>>>,
    watermark: usize,
    filled: Signal<M, ()>,
    drained: Signal<M, ()>,
}

impl<'a, M: RawMutex> ByteChannel<'a, M> {
    /// Create a channel over `storage`, whose length must be a power of two of at least 2.
    pub fn new(storage: &'a mut [u8]) -> Result<Self, ChannelError> {
        let len = storage.len();
        if len < 2 || !len.is_power_of_two() {
            return Err(ChannelError::InvalidCapacity { len });
        }

        Ok(Self {
            ring: Mutex::new(RefCell::new(Ring {
                storage: Some(storage),
                write: 0,
                read: 0,
                mask: len - 1,
                overrun: false,
            })),
            watermark: 1,
            filled: Signal::new(),
            drained: Signal::new(),
        })
    }

    /// Channel without storage: inserts are dropped, extracts yield nothing.
    pub const fn disabled() -> Self {
        Self {
            ring: Mutex::new(RefCell::new(Ring::empty())),
            watermark: 1,
            filled: Signal::new(),
            drained: Signal::new(),
        }
    }

    /// Fill level at which [`wait_watermark`](Self::wait_watermark) wakes up (default 1).
    pub fn with_watermark(mut self, level: usize) -> Self {
        self.watermark = level.max(1);
        self
    }

    #[inline]
    fn with_ring<R>(&self, f: impl FnOnce(&mut Ring<'a>) -> R) -> R {
        self.ring.lock(|ring| f(&mut ring.borrow_mut()))
    }

    /// Whether the channel has backing storage.
    pub fn is_enabled(&self) -> bool {
        self.with_ring(|ring| ring.storage.is_some())
    }

    /// Storage length (0 when disabled). The channel holds at most `capacity() - 1` bytes.
    pub fn capacity(&self) -> usize {
        self.with_ring(|ring| ring.storage.as_ref().map_or(0, |_| ring.mask + 1))
    }

    /// Number of readable bytes.
    pub fn gauge(&self) -> usize {
        self.with_ring(|ring| ring.gauge())
    }

    /// Number of bytes that can be inserted without overwriting.
    pub fn space(&self) -> usize {
        self.with_ring(|ring| ring.space())
    }

    /// Insert `bytes` and return how many were accepted.
    ///
    /// Without `overwrite` the request is truncated to the free space and old
    /// contents are preserved. With `overwrite` the oldest bytes are discarded
    /// to make room, an [`OVERWRITE_MARKER`] is written where the stream was cut,
    /// and the overrun flag is raised; the newest `min(len, capacity - 1)` bytes
    /// of the request always end up readable.
    pub fn insert(&self, bytes: &[u8], overwrite: bool) -> usize {
        let (accepted, gauge) = self.with_ring(|ring| {
            let accepted = ring.insert(bytes, overwrite);
            (accepted, ring.gauge())
        });
        self.notify_filled(gauge);
        accepted
    }

    /// Single-byte insert for interrupt context. A full channel drops the byte
    /// and raises the overrun flag.
    pub fn insert_byte(&self, byte: u8) {
        let gauge = self.with_ring(|ring| {
            ring.insert_byte(byte);
            ring.gauge()
        });
        self.notify_filled(gauge);
    }

    /// Move up to `out.len()` bytes into `out`, returning the count.
    pub fn extract(&self, out: &mut [u8]) -> usize {
        let count = self.with_ring(|ring| ring.extract(out));
        if count > 0 {
            self.drained.signal(());
        }
        count
    }

    /// Single-byte extract for interrupt context.
    pub fn extract_byte(&self) -> Option<u8> {
        let byte = self.with_ring(|ring| ring.extract_byte());
        if byte.is_some() {
            self.drained.signal(());
        }
        byte
    }

    /// Drop every unread byte.
    pub fn flush(&self) {
        self.with_ring(|ring| ring.read = ring.write);
        self.drained.signal(());
    }

    /// Return and clear the overrun flag.
    pub fn take_overrun(&self) -> bool {
        self.with_ring(|ring| core::mem::take(&mut ring.overrun))
    }

    /// Wait until the fill level reaches the watermark.
    pub async fn wait_watermark(&self) {
        loop {
            if self.gauge() >= self.watermark {
                return;
            }
            self.filled.wait().await;
        }
    }

    /// Wait until at least `needed` bytes (clamped to `capacity - 1`) can be inserted.
    /// Returns immediately on a disabled channel.
    pub async fn wait_space(&self, needed: usize) {
        loop {
            let (enabled, space, mask) =
                self.with_ring(|ring| (ring.storage.is_some(), ring.space(), ring.mask));
            if !enabled || space >= needed.min(mask) {
                return;
            }
            self.drained.wait().await;
        }
    }

    /// Wait until the consumer has read everything.
    pub async fn wait_empty(&self) {
        loop {
            if self.gauge() == 0 {
                return;
            }
            self.drained.wait().await;
        }
    }

    fn notify_filled(&self, gauge: usize) {
        if gauge >= self.watermark {
            self.filled.signal(());
        }
    }
}
