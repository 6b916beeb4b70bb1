use std::collections::VecDeque;
use std::ops::Range;

use log::{debug, warn};

use crate::error::{MemError, MemResult};
use crate::memory::{PhysicalStore, copy_frame};
use crate::page_table::{PageTable, PageTableEntry};

/// Resident pages in the order they became resident; the front is the next victim
#[derive(Debug, Clone, Default)]
pub struct ResidentQueue {
    pages: VecDeque<usize>,
}

impl ResidentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, pgn: usize) {
        self.pages.push_back(pgn);
    }

    /// The page that has been resident longest
    pub fn oldest(&self) -> Option<usize> {
        self.pages.front().copied()
    }

    pub fn pop_oldest(&mut self) -> Option<usize> {
        self.pages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.iter().copied()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagerStats {
    pub page_faults: u64,
    pub evictions: u64,
}

/// Page table plus FIFO bookkeeping for one address space.
///
/// RAM and swap are shared by every address space, so they are passed in
/// by the caller rather than owned here.
#[derive(Debug, Clone, Default)]
pub struct Pager {
    table: PageTable,
    resident: ResidentQueue,
    stats: PagerStats,
}

impl Pager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &PageTable {
        &self.table
    }

    pub fn resident(&self) -> &ResidentQueue {
        &self.resident
    }

    pub fn stats(&self) -> PagerStats {
        self.stats
    }

    /// Make `pgn` resident and return its RAM frame.
    ///
    /// A swapped page takes a free RAM frame when one exists; otherwise the
    /// oldest resident page is written to a fresh swap slot and its frame is
    /// reused. Victim lookup and slot allocation both happen before any
    /// entry or queue is touched, so their failures leave no trace.
    pub fn ensure_resident<S>(&mut self, ram: &mut S, swap: &mut S, pgn: usize) -> MemResult<usize>
    where
        S: PhysicalStore + ?Sized,
    {
        let target_slot = match self.table.get(pgn)? {
            PageTableEntry::Resident { frame } => return Ok(frame),
            PageTableEntry::Swapped { slot } => slot,
            PageTableEntry::Absent => return Err(MemError::UnmappedPage(pgn)),
        };

        if ram.free_frame_count() > 0 {
            let frame = ram.alloc_free_frame()?;
            if let Err(err) = copy_frame(&*swap, target_slot, ram, frame) {
                ram.release_frame(frame)?;
                return Err(err);
            }
            swap.release_frame(target_slot)?;
            self.table.set(pgn, PageTableEntry::Resident { frame })?;
            self.resident.push(pgn);
            self.stats.page_faults += 1;
            debug!(
                "fault: page {} swapped in from slot {} to free frame {}",
                pgn, target_slot, frame
            );
            return Ok(frame);
        }

        // Step 1: pick the victim without dequeuing it yet
        let victim_pgn = self.resident.oldest().ok_or(MemError::NoVictim)?;
        let PageTableEntry::Resident { frame: victim_frame } = self.table.get(victim_pgn)? else {
            return Err(MemError::NoVictim);
        };
        if !ram.contains_frame(victim_frame) {
            return Err(MemError::InvalidFrame(victim_frame));
        }
        if !swap.contains_frame(target_slot) {
            return Err(MemError::InvalidFrame(target_slot));
        }

        // Step 2: room on the swap device for the victim
        let victim_slot = swap.alloc_free_frame()?;

        // Steps 3-4: victim out, target in
        copy_frame(&*ram, victim_frame, swap, victim_slot)?;
        copy_frame(&*swap, target_slot, ram, victim_frame)?;
        swap.release_frame(target_slot)?;

        // Step 5: both entries flip together
        self.resident.pop_oldest();
        self.table.set(victim_pgn, PageTableEntry::Swapped { slot: victim_slot })?;
        self.table.set(pgn, PageTableEntry::Resident { frame: victim_frame })?;

        // Step 6
        self.resident.push(pgn);

        self.stats.page_faults += 1;
        self.stats.evictions += 1;
        debug!(
            "fault: page {} -> frame {}, evicted page {} to slot {}",
            pgn, victim_frame, victim_pgn, victim_slot
        );
        Ok(victim_frame)
    }

    /// Give every page in `pages` zeroed backing storage: a RAM frame while
    /// RAM lasts, a swap slot after that. Capacity is checked up front.
    pub fn map_pages<S>(&mut self, ram: &mut S, swap: &mut S, pages: Range<usize>) -> MemResult<()>
    where
        S: PhysicalStore + ?Sized,
    {
        let needed = pages.len();
        self.check_capacity(ram, swap, needed)?;

        for pgn in pages {
            if self.table.get(pgn)?.is_mapped() {
                warn!("map: page {} already mapped, keeping existing backing", pgn);
                continue;
            }
            match ram.alloc_free_frame() {
                Ok(frame) => {
                    ram.clear_frame(frame)?;
                    self.table.set(pgn, PageTableEntry::Resident { frame })?;
                    self.resident.push(pgn);
                }
                Err(_) => {
                    let slot = swap.alloc_free_frame()?;
                    swap.clear_frame(slot)?;
                    self.table.set(pgn, PageTableEntry::Swapped { slot })?;
                }
            }
        }
        Ok(())
    }

    /// Fails with `FramesExhausted` unless RAM and swap together can back `pages` more pages
    pub fn check_capacity<S>(&self, ram: &S, swap: &S, pages: usize) -> MemResult<()>
    where
        S: PhysicalStore + ?Sized,
    {
        if ram.free_frame_count() + swap.free_frame_count() < pages {
            return Err(MemError::FramesExhausted { pages });
        }
        Ok(())
    }

    /// Return every frame and slot this table holds to its pool.
    ///
    /// Walks the full page-number range; absent entries are skipped.
    /// Returns how many frames and slots were released.
    pub fn release_all<S>(&mut self, ram: &mut S, swap: &mut S) -> usize
    where
        S: PhysicalStore + ?Sized,
    {
        let mut released = 0;
        for (pgn, entry) in self.table.iter() {
            let result = match entry {
                PageTableEntry::Resident { frame } => ram.release_frame(frame),
                PageTableEntry::Swapped { slot } => swap.release_frame(slot),
                PageTableEntry::Absent => continue,
            };
            match result {
                Ok(()) => released += 1,
                Err(err) => warn!("teardown: page {} ({}): {}", pgn, entry, err),
            }
        }
        self.table.clear();
        self.resident.clear();
        released
    }
}
