use std::ops::Range;

use crate::error::CoreError;

/// Alignement de chaque allocation, en octets.
pub const ARENA_ALIGN: usize = 16;

/// Round `size` up to the next multiple of [`ARENA_ALIGN`].
///
/// # Example
/// ```
/// use es_core::arena::align_up;
/// assert_eq!(align_up(0), 0);
/// assert_eq!(align_up(1), 16);
/// assert_eq!(align_up(32), 32);
/// ```
#[inline(always)]
#[must_use]
pub const fn align_up(size: usize) -> usize {
    (size + (ARENA_ALIGN - 1)) & !(ARENA_ALIGN - 1)
}

/// Handle vers une région de l'arena.
///
/// Ne contient aucun pointeur : un offset, une longueur et la génération
/// de l'arena au moment de l'allocation. Toute lecture après un `reset`
/// est détectée et refusée.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArenaSlice {
    offset: usize,
    len: usize,
    generation: u64,
}

impl ArenaSlice {
    /// Requested length in bytes (not the aligned footprint).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for zero-sized allocations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Generation this handle was issued in.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Bump allocator pour la mémoire transitoire d'une frame.
///
/// Un seul bloc possédé, alloué à la construction et jamais agrandi.
/// `reset` rembobine le curseur en O(1) et incrémente la génération,
/// ce qui invalide tous les handles émis auparavant.
///
/// # Example
/// ```
/// use es_core::arena::FrameArena;
/// let mut arena = FrameArena::new(64).unwrap();
/// let a = arena.allocate(10).unwrap();
/// assert_eq!(arena.used(), 16);
/// arena.reset();
/// assert!(arena.slice(&a).is_err());
/// ```
pub struct FrameArena {
    block: Vec<u8>,
    used: usize,
    generation: u64,
}

impl FrameArena {
    /// Create an arena of at least `capacity` bytes (rounded up to the alignment).
    ///
    /// # Errors
    /// Returns [`CoreError::ArenaAllocation`] if the block cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self, CoreError> {
        let bytes = align_up(capacity);
        let mut block = Vec::new();
        block
            .try_reserve_exact(bytes)
            .map_err(|_| CoreError::ArenaAllocation { bytes })?;
        block.resize(bytes, 0);
        Ok(Self {
            block,
            used: 0,
            generation: 0,
        })
    }

    /// Reserve `size` bytes, 16-byte aligned.
    ///
    /// Never partially satisfies a request: on failure the cursor is untouched.
    ///
    /// # Errors
    /// Returns [`CoreError::ArenaExhausted`] if the remaining capacity is insufficient.
    pub fn allocate(&mut self, size: usize) -> Result<ArenaSlice, CoreError> {
        let footprint = align_up(size);
        let remaining = self.remaining();
        if footprint > remaining {
            return Err(CoreError::ArenaExhausted {
                requested: footprint,
                remaining,
            });
        }
        let slice = ArenaSlice {
            offset: self.used,
            len: size,
            generation: self.generation,
        };
        self.used += footprint;
        Ok(slice)
    }

    /// Rewind the cursor. Every handle issued before this call becomes stale.
    #[inline]
    pub fn reset(&mut self) {
        self.used = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Free the block. Consumes the arena, so it can only happen once.
    pub fn release(self) {
        log::debug!(
            "FrameArena libérée : {} octets, {} générations",
            self.block.len(),
            self.generation
        );
    }

    /// Read access to an allocation.
    ///
    /// # Errors
    /// Returns [`CoreError::StaleAllocation`] if the arena was reset since `slice` was issued.
    pub fn slice(&self, slice: &ArenaSlice) -> Result<&[u8], CoreError> {
        self.check(slice)?;
        Ok(&self.block[slice.range()])
    }

    /// Write access to an allocation.
    ///
    /// # Errors
    /// Returns [`CoreError::StaleAllocation`] if the arena was reset since `slice` was issued.
    pub fn slice_mut(&mut self, slice: &ArenaSlice) -> Result<&mut [u8], CoreError> {
        self.check(slice)?;
        Ok(&mut self.block[slice.range()])
    }

    /// Write access to several allocations at once.
    ///
    /// Distinct allocations never overlap; passing the same handle twice does.
    ///
    /// # Errors
    /// Returns [`CoreError::StaleAllocation`] if any handle predates the last reset,
    /// [`CoreError::OverlappingAllocations`] if two handles alias.
    pub fn slices_mut<const N: usize>(
        &mut self,
        slices: [&ArenaSlice; N],
    ) -> Result<[&mut [u8]; N], CoreError> {
        for s in slices {
            self.check(s)?;
        }
        let ranges = slices.map(ArenaSlice::range);
        self.block
            .get_disjoint_mut(ranges)
            .map_err(|_| CoreError::OverlappingAllocations)
    }

    /// Total capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.block.len()
    }

    /// Bytes consumed since the last reset (aligned footprints).
    #[must_use]
    pub fn used(&self) -> usize {
        self.used
    }

    /// Bytes still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.block.len() - self.used
    }

    /// Current generation (number of resets so far).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn check(&self, slice: &ArenaSlice) -> Result<(), CoreError> {
        if slice.generation == self.generation {
            Ok(())
        } else {
            Err(CoreError::StaleAllocation {
                allocated: slice.generation,
                current: self.generation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_and_contiguous() {
        let mut arena = FrameArena::new(128).unwrap();
        let a = arena.allocate(3).unwrap();
        let b = arena.allocate(17).unwrap();
        assert_eq!(a.offset, 0);
        assert_eq!(b.offset, 16);
        assert_eq!(b.len(), 17);
        assert_eq!(arena.used(), 48);
        assert_eq!(arena.used() % ARENA_ALIGN, 0);
    }

    #[test]
    fn exhaustion_never_partially_allocates() {
        let mut arena = FrameArena::new(32).unwrap();
        arena.allocate(16).unwrap();
        let err = arena.allocate(20).unwrap_err();
        assert_eq!(
            err,
            CoreError::ArenaExhausted {
                requested: 32,
                remaining: 16
            }
        );
        assert_eq!(arena.used(), 16);
        assert!(arena.allocate(16).is_ok());
        assert_eq!(arena.remaining(), 0);
    }

    #[test]
    fn reset_invalidates_previous_handles() {
        let mut arena = FrameArena::new(64).unwrap();
        let old = arena.allocate(8).unwrap();
        arena.slice_mut(&old).unwrap().fill(7);
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.generation(), 1);
        assert_eq!(
            arena.slice(&old).unwrap_err(),
            CoreError::StaleAllocation {
                allocated: 0,
                current: 1
            }
        );
        let fresh = arena.allocate(8).unwrap();
        assert!(arena.slice(&fresh).is_ok());
    }

    #[test]
    fn slices_mut_returns_disjoint_regions() {
        let mut arena = FrameArena::new(64).unwrap();
        let a = arena.allocate(4).unwrap();
        let b = arena.allocate(4).unwrap();
        {
            let [sa, sb] = arena.slices_mut([&a, &b]).unwrap();
            sa.fill(1);
            sb.fill(2);
        }
        assert_eq!(arena.slice(&a).unwrap(), &[1, 1, 1, 1]);
        assert_eq!(arena.slice(&b).unwrap(), &[2, 2, 2, 2]);
    }

    #[test]
    fn slices_mut_rejects_stale_handles() {
        let mut arena = FrameArena::new(64).unwrap();
        let a = arena.allocate(4).unwrap();
        arena.reset();
        let b = arena.allocate(4).unwrap();
        assert!(arena.slices_mut([&a, &b]).is_err());
    }

    #[test]
    fn slices_mut_rejects_aliased_handles() {
        let mut arena = FrameArena::new(64).unwrap();
        let a = arena.allocate(4).unwrap();
        assert_eq!(
            arena.slices_mut([&a, &a]).unwrap_err(),
            CoreError::OverlappingAllocations
        );
    }

    #[test]
    fn oversized_block_is_an_error_not_an_abort() {
        let bytes = usize::MAX - ARENA_ALIGN + 1;
        assert_eq!(
            FrameArena::new(bytes).err(),
            Some(CoreError::ArenaAllocation { bytes })
        );
    }

    #[test]
    fn capacity_is_rounded_to_alignment() {
        let arena = FrameArena::new(17).unwrap();
        assert_eq!(arena.capacity(), 32);
    }
}
