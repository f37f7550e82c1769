//! Bump allocator over a caller-owned byte region.
//!
//! An [`Arena`] hands out [`Block`]s, offset/length views into its region.
//! Nothing is ever freed individually: the whole region is released at once
//! with [`Arena::reset`]. Blocks obtained before a reset must not be used
//! after it; they still index into the region, but the bytes they see belong
//! to whoever allocated them next.

use log::{debug, trace};
use std::mem;
use thiserror::Error;

const ALIGN: usize = mem::size_of::<usize>();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("zero-sized allocations are not allowed")]
    ZeroSize,
    #[error("arena exhausted: requested {requested} bytes, {available} available")]
    Exhausted { requested: usize, available: usize },
}

/// A region of an [`Arena`], identified by its offset and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    offset: usize,
    len: usize,
}

impl Block {
    pub(crate) fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Bump-pointer allocator.
///
/// `Arena::default()` is the absent arena: zero capacity, always empty, and
/// every allocation fails.
#[derive(Debug, Default)]
pub struct Arena<'m> {
    region: &'m mut [u8],
    used: usize,
}

/// Bytes needed to move `address` up to the next pointer-aligned address.
fn padding_for(address: usize) -> usize {
    let misalignment = address & (ALIGN - 1);
    if misalignment == 0 { 0 } else { ALIGN - misalignment }
}

/// Rounds `size` down to a multiple of the pointer size.
pub(crate) fn align_down(size: usize) -> usize {
    size - (size & (ALIGN - 1))
}

impl<'m> Arena<'m> {
    pub fn new(region: &'m mut [u8]) -> Self {
        Self { region, used: 0 }
    }

    /// Reserves `size` bytes, pointer-aligned.
    ///
    /// The allocation fails when its end would reach the end of the region,
    /// so the last byte of the region is never handed out.
    pub fn allocate(&mut self, size: usize) -> Result<Block, ArenaError> {
        if size == 0 {
            return Err(ArenaError::ZeroSize);
        }

        let address = self.region.as_ptr() as usize + self.used;
        let start = self.used + padding_for(address);
        let exhausted = ArenaError::Exhausted {
            requested: size,
            available: self.available(),
        };
        let end = start.checked_add(size).ok_or(exhausted)?;
        if end >= self.region.len() {
            debug!(
                "arena exhausted: {size} bytes requested, {} of {} used",
                self.used,
                self.region.len()
            );
            return Err(exhausted);
        }

        trace!("arena: allocated {size} bytes at offset {start}");
        self.used = end;
        Ok(Block::new(start, size))
    }

    /// Releases every allocation in O(1). Stale bytes are left in place.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    /// Like [`Arena::reset`], but zeroes the whole region first.
    pub fn wipe(&mut self) {
        self.region.fill(0);
        self.used = 0;
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn available(&self) -> usize {
        self.region.len() - self.used
    }

    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// # Panics
    ///
    /// Panics if `block` was not produced by this arena.
    pub fn bytes(&self, block: Block) -> &[u8] {
        &self.region[block.offset..block.offset + block.len]
    }

    /// # Panics
    ///
    /// Panics if `block` was not produced by this arena.
    pub fn bytes_mut(&mut self, block: Block) -> &mut [u8] {
        &mut self.region[block.offset..block.offset + block.len]
    }

    /// The whole backing region, including bytes not yet allocated.
    pub(crate) fn region(&self) -> &[u8] {
        self.region
    }
}
