use std::fmt;

use crate::constants::*;
use crate::error::{MemError, MemResult};

/// State of one virtual page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageTableEntry {
    /// Never mapped
    #[default]
    Absent,
    /// Backed by a RAM frame
    Resident { frame: usize },
    /// Evicted to (or created on) the swap device
    Swapped { slot: usize },
}

impl PageTableEntry {
    #[inline]
    pub fn is_present(&self) -> bool {
        matches!(self, PageTableEntry::Resident { .. })
    }

    #[inline]
    pub fn is_mapped(&self) -> bool {
        !matches!(self, PageTableEntry::Absent)
    }

    /// Pack into the 32-bit layout used by page-table dumps
    pub fn to_raw(&self) -> u32 {
        match *self {
            PageTableEntry::Absent => 0,
            PageTableEntry::Resident { frame } => {
                (1 << PTE_PRESENT_BIT) | (frame as u32 & PTE_FPN_MASK)
            }
            PageTableEntry::Swapped { slot } => {
                (1 << PTE_SWAPPED_BIT) | ((slot as u32 & PTE_SWPOFF_MASK) << PTE_SWPOFF_SHIFT)
            }
        }
    }

    /// Decode the packed layout
    pub fn from_raw(raw: u32) -> Self {
        if raw & (1 << PTE_PRESENT_BIT) != 0 {
            PageTableEntry::Resident {
                frame: (raw & PTE_FPN_MASK) as usize,
            }
        } else if raw & (1 << PTE_SWAPPED_BIT) != 0 {
            PageTableEntry::Swapped {
                slot: ((raw >> PTE_SWPOFF_SHIFT) & PTE_SWPOFF_MASK) as usize,
            }
        } else {
            PageTableEntry::Absent
        }
    }
}

impl fmt::Display for PageTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageTableEntry::Absent => write!(f, "absent"),
            PageTableEntry::Resident { frame } => write!(f, "frame {}", frame),
            PageTableEntry::Swapped { slot } => write!(f, "swap {}", slot),
        }
    }
}

/// Single-level page table covering every page number of the address space
#[derive(Debug, Clone)]
pub struct PageTable {
    entries: Vec<PageTableEntry>,
}

impl PageTable {
    pub fn new() -> Self {
        PageTable {
            entries: vec![PageTableEntry::Absent; MAX_PGN],
        }
    }

    pub fn get(&self, pgn: usize) -> MemResult<PageTableEntry> {
        self.entries
            .get(pgn)
            .copied()
            .ok_or(MemError::AddressOutOfRange(pgn << OFFSET_BITS))
    }

    pub fn set(&mut self, pgn: usize, entry: PageTableEntry) -> MemResult<()> {
        let slot = self
            .entries
            .get_mut(pgn)
            .ok_or(MemError::AddressOutOfRange(pgn << OFFSET_BITS))?;
        *slot = entry;
        Ok(())
    }

    /// Iterate over every page number with its entry, mapped or not
    pub fn iter(&self) -> impl Iterator<Item = (usize, PageTableEntry)> + '_ {
        self.entries.iter().copied().enumerate()
    }

    /// Only the entries that have a frame or slot
    pub fn mapped(&self) -> impl Iterator<Item = (usize, PageTableEntry)> + '_ {
        self.iter().filter(|(_, entry)| entry.is_mapped())
    }

    pub fn resident_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_present()).count()
    }

    pub fn clear(&mut self) {
        self.entries.fill(PageTableEntry::Absent);
    }

    /// One line per mapped page: page number, packed entry, decoded state
    pub fn dump(&self) -> Vec<String> {
        self.mapped()
            .map(|(pgn, entry)| format!("{:05}: {:08x} ({})", pgn, entry.to_raw(), entry))
            .collect()
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}
