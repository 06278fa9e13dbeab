//! Core ECS identifiers, capacity constants, and the component signature bitset.
//!
//! This module defines the **fundamental types and bit layouts** shared by
//! every subsystem of the storage engine: the allocator, the layout
//! calculator, templates, component groups, and the context orchestrator.
//!
//! ## Design Philosophy
//!
//! The engine is built around:
//!
//! - **Dense slab storage** addressed by `(block, offset)` pairs,
//! - **Bitset-based signatures** identifying component sets,
//! - **Stable numeric identifiers** for components and entities,
//! - **No heap allocation** in signature operations.
//!
//! ## Signatures
//!
//! A [`Signature`] is a fixed-width bit vector over the component-type id
//! space. Two signatures are equal iff they denote the same set of component
//! types, independent of the order in which bits were set. Signatures carry a
//! strict total order (word-lexicographic) so they can key a `BTreeMap`,
//! which is how templates and component groups are looked up.
//!
//! ## Capacity
//!
//! Component-type ids are assigned densely from zero, bounded by
//! [`MAX_COMPONENT_TYPES`]. The bound exists so a signature stays a small,
//! copyable value with O(word count) operations.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};


/// Compact identifier for a registered component type.
pub type ComponentTypeId = u16;
/// Monotonically increasing entity identifier. Never reused.
pub type EntityId = u64;
/// Index of an entity slot within a collection slab. One byte, so a
/// collection never holds more than 256 entities.
pub type SlotId = u8;
/// Index of a memory block inside the allocator.
pub type BlockIndex = usize;

/// Upper bound on distinct component types per context.
pub const MAX_COMPONENT_TYPES: usize = 128;
/// Number of `u64` words in a [`Signature`].
pub const SIGNATURE_WORDS: usize = (MAX_COMPONENT_TYPES + 63) / 64;
/// Hard cap on entities per collection slab, dictated by [`SlotId`] width.
pub const MAX_ENTITIES_PER_COLLECTION: usize = 256;

const _: [(); 1] = [(); (MAX_COMPONENT_TYPES % 64 == 0) as usize];

/// Byte address of one entity record (or one component) inside the
/// allocator's block list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataLocation {
    /// Allocator block holding the bytes.
    pub block: BlockIndex,
    /// Byte offset from the start of that block.
    pub offset: usize,
}

impl DataLocation {
    /// Returns this location shifted forward by `bytes`.
    #[inline]
    pub fn advanced(self, bytes: usize) -> Self {
        Self { block: self.block, offset: self.offset + bytes }
    }
}

/// Fixed-width bitset identifying a set of component types.
///
/// Equality is set equality; ordering is word-lexicographic and exists only
/// so signatures can key ordered maps. All operations are O(word count).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Signature {
    words: [u64; SIGNATURE_WORDS],
}

impl Signature {
    /// Creates an all-zero signature.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signature with the given component bits set.
    ///
    /// Duplicate ids collapse to a single bit.
    pub fn from_ids(component_ids: &[ComponentTypeId]) -> Self {
        let mut signature = Self::default();
        signature.set_all(component_ids);
        signature
    }

    /// Sets the bit for `component_id`.
    #[inline]
    pub fn set(&mut self, component_id: ComponentTypeId) {
        debug_assert!((component_id as usize) < MAX_COMPONENT_TYPES);
        self.words[(component_id as usize) / 64] |= 1u64 << ((component_id as usize) % 64);
    }

    /// Sets every bit in `component_ids`.
    #[inline]
    pub fn set_all(&mut self, component_ids: &[ComponentTypeId]) {
        for &component_id in component_ids {
            self.set(component_id);
        }
    }

    /// Clears the bit for `component_id`.
    #[inline]
    pub fn unset(&mut self, component_id: ComponentTypeId) {
        debug_assert!((component_id as usize) < MAX_COMPONENT_TYPES);
        self.words[(component_id as usize) / 64] &= !(1u64 << ((component_id as usize) % 64));
    }

    /// Clears every bit in `component_ids`.
    #[inline]
    pub fn unset_all(&mut self, component_ids: &[ComponentTypeId]) {
        for &component_id in component_ids {
            self.unset(component_id);
        }
    }

    /// Returns `true` if the bit for `component_id` is set.
    #[inline]
    pub fn is_set(&self, component_id: ComponentTypeId) -> bool {
        (self.words[(component_id as usize) / 64] >> ((component_id as usize) % 64)) & 1 == 1
    }

    /// Returns `true` if the bit for `component_id` is clear.
    #[inline]
    pub fn is_unset(&self, component_id: ComponentTypeId) -> bool {
        !self.is_set(component_id)
    }

    /// Returns `true` if at least one bit is set.
    #[inline]
    pub fn is_any_set(&self) -> bool {
        self.words.iter().any(|&word| word != 0)
    }

    /// Returns `true` if no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.is_any_set()
    }

    /// Returns `true` if every bit of `other` is also set in `self`.
    ///
    /// This is the superset test used for group membership: an entity
    /// belongs to a group iff `entity_signature.contains_all(&group_signature)`.
    #[inline]
    pub fn contains_all(&self, other: &Signature) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(mine, theirs)| (mine & theirs) == *theirs)
    }

    /// Number of set bits.
    #[inline]
    pub fn count(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates over set component ids in ascending order.
    pub fn iter_ids(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * 64;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some((base + tz) as ComponentTypeId)
            })
        })
    }
}

impl BitAnd for Signature {
    type Output = Signature;

    #[inline]
    fn bitand(self, rhs: Signature) -> Signature {
        let mut out = Signature::default();
        for (index, word) in out.words.iter_mut().enumerate() {
            *word = self.words[index] & rhs.words[index];
        }
        out
    }
}

impl BitOr for Signature {
    type Output = Signature;

    #[inline]
    fn bitor(self, rhs: Signature) -> Signature {
        let mut out = Signature::default();
        for (index, word) in out.words.iter_mut().enumerate() {
            *word = self.words[index] | rhs.words[index];
        }
        out
    }
}

impl Not for Signature {
    type Output = Signature;

    #[inline]
    fn not(self) -> Signature {
        let mut out = Signature::default();
        for (index, word) in out.words.iter_mut().enumerate() {
            *word = !self.words[index];
        }
        out
    }
}

impl fmt::Display for Signature {
    /// Renders the signature as a bit string, lowest component id first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in 0..MAX_COMPONENT_TYPES {
            f.write_str(if self.is_set(id as ComponentTypeId) { "1" } else { "0" })?;
        }
        Ok(())
    }
}
