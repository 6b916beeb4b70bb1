use crate::constants::*;
use crate::error::{MemError, MemResult};
use crate::fault::Pager;
use crate::memory::{PhysicalStore, frame_to_address};

/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: usize,
    pub page: usize,
    pub offset: usize,
}

impl VirtualAddress {
    /// Decompose a raw VA into its components, ignoring bits above the address width
    pub fn from_raw(va: usize) -> Self {
        let page = (va >> OFFSET_BITS) & PGN_MASK;
        let offset = va & OFFSET_MASK;

        VirtualAddress { va, page, offset }
    }

    /// Like `from_raw`, but rejects addresses outside the virtual address space
    pub fn new(va: usize) -> MemResult<Self> {
        if va >= MAX_ADDRESS {
            return Err(MemError::AddressOutOfRange(va));
        }
        Ok(Self::from_raw(va))
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VA({:#x}) = (page={}, offset={})",
            self.va, self.page, self.offset
        )
    }
}

/// Translate a virtual address to a physical RAM address, faulting the page
/// in from swap first if it is not resident.
///
/// Any fault-handler failure comes back as `TranslationFailure`.
pub fn translate<S>(
    pager: &mut Pager,
    ram: &mut S,
    swap: &mut S,
    va: &VirtualAddress,
) -> MemResult<usize>
where
    S: PhysicalStore + ?Sized,
{
    // Step 1: make sure the page has a RAM frame
    let frame = pager
        .ensure_resident(ram, swap, va.page)
        .map_err(|err| MemError::translation(va.va, err))?;

    // Step 2: PA = frame << FRAME_SHIFT + offset
    Ok(frame_to_address(frame) + va.offset)
}
