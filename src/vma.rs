use std::ops::Range;

use log::debug;

use crate::constants::*;
use crate::error::{MemError, MemResult};
use crate::region::{FreeList, Region};

/// Round `bytes` up to a whole number of pages.
///
/// Fails with `AddressOutOfRange` when the rounded value does not fit in a `usize`.
#[inline]
pub fn align_up(bytes: usize) -> MemResult<usize> {
    bytes
        .checked_next_multiple_of(PAGE_SIZE)
        .ok_or(MemError::AddressOutOfRange(bytes))
}

/// One contiguous area of a virtual address space.
///
/// `start <= frontier <= end` always holds; `end` and `frontier` only move up.
#[derive(Debug, Clone)]
pub struct Vma {
    pub id: usize,
    pub start: usize,
    pub end: usize,
    pub frontier: usize,
    pub free_list: FreeList,
}

impl Vma {
    pub fn new(id: usize, start: usize, merge_threshold: usize) -> Self {
        Vma {
            id,
            start,
            end: start,
            frontier: start,
            free_list: FreeList::new(merge_threshold),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    // An empty area still claims its start byte, so a sibling cannot be
    // placed or grown across the point this one will grow from.
    fn intersects(&self, lo: usize, hi: usize) -> bool {
        lo < self.end.max(self.start + 1) && self.start < hi
    }
}

/// Outcome of a growth step: the VMA's old and new upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthInfo {
    pub vma_id: usize,
    pub old_end: usize,
    pub new_end: usize,
    pub increment: usize,
}

impl GrowthInfo {
    /// The freshly covered range
    pub fn range(&self) -> Region {
        Region::new(self.old_end, self.new_end)
    }

    /// Page numbers that need backing storage
    pub fn pages(&self) -> Range<usize> {
        (self.old_end >> OFFSET_BITS)..(self.new_end >> OFFSET_BITS)
    }
}

/// The VMAs of one address space, in creation order
#[derive(Debug, Clone)]
pub struct VmaList {
    areas: Vec<Vma>,
    merge_threshold: usize,
}

impl VmaList {
    pub fn new(merge_threshold: usize) -> Self {
        VmaList {
            areas: Vec::new(),
            merge_threshold,
        }
    }

    pub fn get(&self, id: usize) -> Option<&Vma> {
        self.areas.iter().find(|vma| vma.id == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Vma> {
        self.areas.iter_mut().find(|vma| vma.id == id)
    }

    pub fn require(&self, id: usize) -> MemResult<&Vma> {
        self.get(id).ok_or(MemError::UnknownVma(id))
    }

    pub fn require_mut(&mut self, id: usize) -> MemResult<&mut Vma> {
        self.get_mut(id).ok_or(MemError::UnknownVma(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vma> {
        self.areas.iter()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Create an empty area starting at the page-aligned address `start`.
    pub fn add(&mut self, id: usize, start: usize) -> MemResult<&Vma> {
        if start % PAGE_SIZE != 0 {
            return Err(MemError::MisalignedVma(start));
        }
        if start >= MAX_ADDRESS {
            return Err(MemError::AddressOutOfRange(start));
        }
        if self.get(id).is_some() {
            return Err(MemError::DuplicateVma(id));
        }
        if self.areas.iter().any(|vma| vma.intersects(start, start + 1)) {
            return Err(MemError::OverlapDetected {
                vma_id: id,
                lo: start,
                hi: start,
            });
        }

        self.areas.push(Vma::new(id, start, self.merge_threshold));
        debug!("vma {}: created at {:#x}", id, start);
        Ok(&self.areas[self.areas.len() - 1])
    }

    /// Fails if `[lo, hi)` is malformed, `vma_id` is unknown, or the range
    /// touches any other area of this list.
    pub fn validate_no_overlap(&self, vma_id: usize, lo: usize, hi: usize) -> MemResult<()> {
        if lo >= hi {
            return Err(MemError::MalformedRange { lo, hi });
        }
        self.require(vma_id)?;

        let clash = self
            .areas
            .iter()
            .filter(|vma| vma.id != vma_id)
            .any(|vma| vma.intersects(lo, hi));
        if clash {
            return Err(MemError::OverlapDetected { vma_id, lo, hi });
        }
        Ok(())
    }

    /// Page-aligned increment for a request of `requested` bytes.
    ///
    /// Free capacity already held in regions at or above the merge threshold
    /// is subtracted first; if that covers the request, one page is still added.
    pub fn growth_increment(&self, vma_id: usize, requested: usize) -> MemResult<usize> {
        let vma = self.require(vma_id)?;
        let free = vma.free_list.counted_capacity();

        if requested <= free {
            Ok(PAGE_SIZE)
        } else {
            align_up(requested - free)
        }
    }

    /// Check that `vma_id` can grow by `increment` bytes without changing anything.
    pub fn plan_extend(&self, vma_id: usize, increment: usize) -> MemResult<GrowthInfo> {
        let vma = self.require(vma_id)?;
        let old_end = vma.end;
        let new_end = old_end.saturating_add(increment);

        if new_end > MAX_ADDRESS {
            return Err(MemError::AddressOutOfRange(new_end));
        }
        self.validate_no_overlap(vma_id, vma.frontier, new_end)?;

        Ok(GrowthInfo {
            vma_id,
            old_end,
            new_end,
            increment,
        })
    }

    /// Commit a planned growth: move `end` and `frontier` up and enlist the
    /// new range as free.
    pub fn apply_growth(&mut self, info: &GrowthInfo) -> MemResult<()> {
        let vma = self.require_mut(info.vma_id)?;
        if vma.end != info.old_end {
            return Err(MemError::MalformedRange {
                lo: vma.end,
                hi: info.new_end,
            });
        }

        vma.free_list.release(info.range())?;
        vma.end = info.new_end;
        vma.frontier = info.new_end;
        Ok(())
    }
}
