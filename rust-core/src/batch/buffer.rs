//! Slot-partitioned buffers shared between the controller and the workers
//!
//! A `SlotBuffer` is one contiguous allocation split into equally sized
//! slots. Each worker writes only its own slot, so no element-level locking
//! is needed; the coordinator's completion barrier is what orders those
//! writes against the controller's reads.

use std::cell::UnsafeCell;

use crate::error::{Result, SpectrumError};

/// Allocate `len` copies of `value`, reporting exhaustion instead of aborting
pub(crate) fn try_filled_vec<T: Clone>(what: &'static str, len: usize, value: T) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| SpectrumError::AllocFailed { what, len })?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Contiguous buffer of `slots × slot_len` elements
pub struct SlotBuffer<T> {
    data: Box<[UnsafeCell<T>]>,
    slots: usize,
    slot_len: usize,
}

// Slots are disjoint; callers of the unsafe accessors uphold exclusivity.
unsafe impl<T: Send> Sync for SlotBuffer<T> {}

impl<T: Clone> SlotBuffer<T> {
    /// Allocate a buffer with every element set to `fill`
    pub fn new(what: &'static str, slots: usize, slot_len: usize, fill: T) -> Result<Self> {
        let len = slots
            .checked_mul(slot_len)
            .ok_or(SpectrumError::AllocFailed { what, len: usize::MAX })?;

        let data: Vec<UnsafeCell<T>> = {
            let mut v = Vec::new();
            v.try_reserve_exact(len)
                .map_err(|_| SpectrumError::AllocFailed { what, len })?;
            v.extend((0..len).map(|_| UnsafeCell::new(fill.clone())));
            v
        };

        Ok(Self {
            data: data.into_boxed_slice(),
            slots,
            slot_len,
        })
    }
}

impl<T> SlotBuffer<T> {
    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn slot_len(&self) -> usize {
        self.slot_len
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Mutable view of one slot
    ///
    /// # Safety
    /// No other reference to this slot (shared or mutable) may be alive, and
    /// no whole-buffer view may be alive, for the lifetime of the result.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slot_mut(&self, slot: usize) -> &mut [T] {
        assert!(slot < self.slots, "slot {} out of range ({} slots)", slot, self.slots);
        let start = slot * self.slot_len;
        let ptr = UnsafeCell::raw_get(self.data.as_ptr().add(start));
        std::slice::from_raw_parts_mut(ptr, self.slot_len)
    }

    /// Shared view of the whole buffer
    ///
    /// # Safety
    /// No slot may be mutably borrowed for the lifetime of the result.
    pub unsafe fn as_slice(&self) -> &[T] {
        let ptr = UnsafeCell::raw_get(self.data.as_ptr());
        std::slice::from_raw_parts(ptr, self.data.len())
    }
}
