use std::fmt;

use crate::error::{MemError, MemResult};

/// Half-open byte range `[lo, hi)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub lo: usize,
    pub hi: usize,
}

impl Region {
    pub const fn new(lo: usize, hi: usize) -> Self {
        Region { lo, hi }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hi.saturating_sub(self.lo)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lo >= self.hi
    }

    /// Overlapping or sharing an endpoint
    #[inline]
    pub fn touches(&self, other: &Region) -> bool {
        self.lo <= other.hi && other.lo <= self.hi
    }

    /// Sharing at least one byte
    #[inline]
    pub fn overlaps(&self, other: &Region) -> bool {
        self.lo < other.hi && other.lo < self.hi
    }

    pub fn union(&self, other: &Region) -> Region {
        Region::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.lo, self.hi)
    }
}

/// Free byte ranges of one VMA, kept sorted by `hi`.
///
/// Two touching regions are merged only if one of them is at least
/// `merge_threshold` bytes long; smaller fragments stay separate.
#[derive(Debug, Clone)]
pub struct FreeList {
    regions: Vec<Region>,
    merge_threshold: usize,
}

impl FreeList {
    pub fn new(merge_threshold: usize) -> Self {
        FreeList {
            regions: Vec::new(),
            merge_threshold,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn merge_threshold(&self) -> usize {
        self.merge_threshold
    }

    /// Free bytes held in regions large enough to take part in merging
    pub fn counted_capacity(&self) -> usize {
        self.regions
            .iter()
            .map(Region::len)
            .filter(|&len| len >= self.merge_threshold)
            .sum()
    }

    /// Carve `size` bytes from the low end of the first region that can hold them.
    pub fn find_fit(&mut self, size: usize) -> Option<Region> {
        let idx = self.regions.iter().position(|r| r.len() >= size)?;
        let found = self.regions[idx];
        let carved = Region::new(found.lo, found.lo + size);

        if carved.hi < found.hi {
            self.regions[idx].lo = carved.hi;
        } else if idx + 1 == self.regions.len() {
            // tail node stays as a zero-length placeholder
            self.regions[idx].lo = found.hi;
        } else {
            self.regions.remove(idx);
        }
        Some(carved)
    }

    /// Return `range` to the list and merge it with its neighbours.
    pub fn release(&mut self, range: Region) -> MemResult<()> {
        if range.lo >= range.hi {
            return Err(MemError::MalformedRange {
                lo: range.lo,
                hi: range.hi,
            });
        }

        let pos = self.regions.partition_point(|r| r.hi <= range.hi);
        self.regions.insert(pos, range);
        self.merge_pass();
        Ok(())
    }

    /// Remove every free byte inside `range`, splitting regions that straddle it.
    pub fn carve(&mut self, range: Region) {
        let mut kept = Vec::with_capacity(self.regions.len() + 1);
        for region in self.regions.drain(..) {
            if !region.overlaps(&range) {
                kept.push(region);
                continue;
            }
            if region.lo < range.lo {
                kept.push(Region::new(region.lo, range.lo));
            }
            if range.hi < region.hi {
                kept.push(Region::new(range.hi, region.hi));
            }
        }
        self.regions = kept;
    }

    fn mergeable(&self, a: &Region, b: &Region) -> bool {
        a.touches(b) && (a.len() >= self.merge_threshold || b.len() >= self.merge_threshold)
    }

    // Repeat until no pair qualifies: a merge can lift a region over the
    // threshold and make it mergeable with a fragment it skipped before.
    fn merge_pass(&mut self) {
        'scan: loop {
            for i in 0..self.regions.len() {
                for j in i + 1..self.regions.len() {
                    if self.mergeable(&self.regions[i], &self.regions[j]) {
                        // j has the larger hi, so the union keeps its slot
                        self.regions[j] = self.regions[i].union(&self.regions[j]);
                        self.regions.remove(i);
                        continue 'scan;
                    }
                }
            }
            break;
        }
    }
}
