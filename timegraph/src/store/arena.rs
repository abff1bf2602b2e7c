//! Append-only, address-stable storage shared by one writer and many readers.
//!
//! Elements live in geometrically growing segments (8, 16, 32, ... slots).
//! A segment is allocated once and never moved, so a `&T` handed out by
//! [`Arena::get`] stays valid for as long as the arena is borrowed, no
//! matter how many elements are appended afterwards.
//!
//! ```text
//! segments[0]: [ 0 ..  7]
//! segments[1]: [ 8 .. 23]
//! segments[2]: [24 .. 55]
//! ...
//! ```
//!
//! Publication: the writer fills a slot, then bumps `len` with `Release`.
//! Readers load `len` with `Acquire` and only touch slots below it, so a
//! reader either sees a complete element or does not see it at all.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::domain::StoreError;

const FIRST_SEGMENT_BITS: u32 = 3;
const FIRST_SEGMENT_LEN: usize = 1 << FIRST_SEGMENT_BITS;
const SEGMENT_COUNT: usize = (usize::BITS - FIRST_SEGMENT_BITS) as usize;

type Segment<T> = Box<[OnceLock<T>]>;

/// Why an append did not store its element.
#[derive(Debug)]
pub(crate) enum PushError {
    /// Another writer filled the slot first (single-writer contract broken)
    Occupied,
    Store(StoreError),
}

impl From<StoreError> for PushError {
    fn from(err: StoreError) -> Self {
        PushError::Store(err)
    }
}

pub struct Arena<T> {
    segments: [OnceLock<Segment<T>>; SEGMENT_COUNT],
    len: AtomicUsize,
}

impl<T> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// Number of published elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `value` and return its index.
    ///
    /// Must only be called by the arena's single writer.
    pub(crate) fn push(&self, value: T) -> Result<usize, PushError> {
        let index = self.len.load(Ordering::Relaxed);
        let (segment, offset) = locate(index).ok_or(StoreError::CapacityExhausted)?;

        let slots = match self.segments[segment].get() {
            Some(slots) => slots,
            None => {
                let fresh = allocate_segment(FIRST_SEGMENT_LEN << segment)?;
                self.segments[segment].get_or_init(move || fresh)
            }
        };

        slots[offset].set(value).map_err(|_| PushError::Occupied)?;
        self.len.store(index + 1, Ordering::Release);
        Ok(index)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len() {
            return None;
        }
        let (segment, offset) = locate(index)?;
        self.segments[segment].get()?.get(offset)?.get()
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.len().checked_sub(1).and_then(|index| self.get(index))
    }

    /// Iterate over the elements published when the call was made.
    ///
    /// Elements appended while iterating are not visited; calling `iter`
    /// again picks them up.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Map a flat index to `(segment, offset)`; `None` once the index space is spent.
fn locate(index: usize) -> Option<(usize, usize)> {
    let biased = index.checked_add(FIRST_SEGMENT_LEN)?;
    let segment = (usize::BITS - 1 - biased.leading_zeros() - FIRST_SEGMENT_BITS) as usize;
    Some((segment, biased - (FIRST_SEGMENT_LEN << segment)))
}

fn allocate_segment<T>(len: usize) -> Result<Segment<T>, StoreError> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(len)?;
    slots.resize_with(len, OnceLock::new);
    Ok(slots.into_boxed_slice())
}
