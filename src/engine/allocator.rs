//! Block-granular bump allocator backing all entity component storage.
//!
//! This module implements the [`Allocator`], which owns an ordered list of
//! fixed-size, zero-initialized memory blocks and hands out byte ranges from
//! them with a simple bump cursor.
//!
//! # Storage model
//!
//! Internally the allocator stores its blocks as:
//!
//! ```text
//! Vec<Box<[u64]>>
//! ```
//!
//! Blocks are declared in bytes (`block_size`) but backed by `u64` words so
//! every block base — and therefore every range the allocator hands out — is
//! 8-byte aligned. The layout calculator keeps component offsets at their
//! natural alignment within a record, so typed reads through a block never
//! observe a misaligned address (component alignment is capped at
//! [`MAX_COMPONENT_ALIGN`] by the registry).
//!
//! # Allocation discipline
//!
//! - A single request never spans two blocks.
//! - A request of zero bytes, or of more than `block_size` bytes, is
//!   rejected.
//! - The cursor advances by the requested size rounded up to 8, so the next
//!   range starts aligned. When the remaining space in the current block is
//!   insufficient, a new zero-filled block is appended and the request is
//!   served from its start.
//! - Individual requests are never reclaimed. Removal is modeled above this
//!   layer via collection free-slot reuse; the memory itself is released
//!   only when the allocator is dropped.
//!
//! # Invariants
//!
//! - Ranges returned for successful requests never overlap within a block,
//!   and `offset + size <= block_size` always holds.
//! - Block base pointers are stable for the allocator's lifetime: growing
//!   the block list moves the `Box` handles, not the heap buffers they own.
//! - Fresh blocks are fully zeroed, so a newly placed record starts from
//!   all-zero bytes before its components are constructed in place.

use log::debug;

use crate::engine::error::AllocationError;
use crate::engine::types::{BlockIndex, DataLocation};


/// Maximum component alignment the allocator guarantees.
///
/// Blocks are backed by `u64` words and the bump cursor stays 8-aligned, so
/// anything up to 8 is honored. The registry rejects component types above
/// this at registration time.
pub const MAX_COMPONENT_ALIGN: usize = 8;

#[inline]
const fn round_up_to_words(bytes: usize) -> usize {
    (bytes + 7) / 8
}

/// Owns the raw memory blocks all entity records live in.
///
/// See the module documentation for the allocation discipline. The allocator
/// is deliberately dumb: templates and collections above it decide *what* a
/// range means; the allocator only guarantees the ranges are disjoint,
/// aligned, and zero-initialized on first use.
#[derive(Debug)]
pub struct Allocator {
    blocks: Vec<Box<[u64]>>,
    block_size: usize,
    current_block: BlockIndex,
    cursor: usize,
}

impl Allocator {
    /// Creates an allocator with the given block size in bytes.
    ///
    /// The first block is allocated and zero-filled immediately.
    ///
    /// # Errors
    /// Returns [`AllocationError::ZeroBlockSize`] if `block_size == 0`; the
    /// block size is a configuration value and a zero block can never serve
    /// a request.
    pub fn new(block_size: usize) -> Result<Self, AllocationError> {
        if block_size == 0 {
            return Err(AllocationError::ZeroBlockSize);
        }

        let first = vec![0u64; round_up_to_words(block_size)].into_boxed_slice();
        debug!("allocator created with block size {block_size}");

        Ok(Self {
            blocks: vec![first],
            block_size,
            current_block: 0,
            cursor: 0,
        })
    }

    /// Requests a byte range of `size` bytes.
    ///
    /// Returns the location of the range within the block list. The range
    /// starts 8-aligned and lies entirely within one block.
    ///
    /// # Errors
    /// * [`AllocationError::ZeroSizedRequest`] for `size == 0`.
    /// * [`AllocationError::RequestTooLarge`] for `size > block_size`.
    pub fn request(&mut self, size: usize) -> Result<DataLocation, AllocationError> {
        if size == 0 {
            return Err(AllocationError::ZeroSizedRequest);
        }
        if size > self.block_size {
            return Err(AllocationError::RequestTooLarge {
                requested: size,
                block_size: self.block_size,
            });
        }

        if self.cursor + size > self.block_size {
            self.blocks
                .push(vec![0u64; round_up_to_words(self.block_size)].into_boxed_slice());
            self.current_block = self.blocks.len() - 1;
            self.cursor = 0;
            debug!(
                "allocator grew to {} blocks ({} bytes each)",
                self.blocks.len(),
                self.block_size
            );
        }

        let location = DataLocation { block: self.current_block, offset: self.cursor };
        self.cursor += round_up_to_words(size) * 8;
        // An aligned advance may step the cursor just past the block end;
        // the overflow check above only compares against the raw size.
        self.cursor = self.cursor.min(self.block_size);
        Ok(location)
    }

    /// Returns the bytes of a block, if it exists.
    #[inline]
    pub fn block(&self, index: BlockIndex) -> Option<&[u8]> {
        self.blocks.get(index).map(|words| {
            // Blocks are sized in whole words; expose exactly block_size bytes.
            unsafe { std::slice::from_raw_parts(words.as_ptr() as *const u8, self.block_size) }
        })
    }

    /// Number of blocks currently allocated.
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Configured size of one block in bytes.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Index of the block the bump cursor currently points into.
    #[inline]
    pub fn current_block(&self) -> BlockIndex {
        self.current_block
    }

    /// Byte offset of the bump cursor within the current block.
    #[inline]
    pub fn current_offset(&self) -> usize {
        self.cursor
    }

    /// Base pointer of a block for raw component access.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds; internal callers only pass
    /// locations previously returned by [`Allocator::request`].
    #[inline]
    pub(crate) fn block_ptr(&self, index: BlockIndex) -> *const u8 {
        self.blocks[index].as_ptr() as *const u8
    }

    /// Mutable base pointer of a block for raw component access.
    #[inline]
    pub(crate) fn block_ptr_mut(&mut self, index: BlockIndex) -> *mut u8 {
        self.blocks[index].as_mut_ptr() as *mut u8
    }

    /// Copies `size` bytes from one location to another.
    ///
    /// Used during entity migration to move surviving component bytes from
    /// an old template slot into a new one. Source and destination slots are
    /// distinct allocator ranges and never overlap.
    pub(crate) fn copy_bytes(&mut self, from: DataLocation, to: DataLocation, size: usize) {
        debug_assert!(from.offset + size <= self.block_size);
        debug_assert!(to.offset + size <= self.block_size);
        debug_assert!(from != to);

        let src = unsafe { self.block_ptr(from.block).add(from.offset) };
        let dst = unsafe { self.block_ptr_mut(to.block).add(to.offset) };
        unsafe { std::ptr::copy_nonoverlapping(src, dst, size) };
    }
}
