//! Per-process address space: VMAs, symbol table and pager tied together.
//!
//! Every method that touches memory takes the shared RAM and swap stores as
//! arguments; the engine owns those and hands them in under its lock.

use log::{debug, warn};

use crate::config::EngineConfig;
use crate::constants::*;
use crate::error::{MemError, MemResult};
use crate::fault::Pager;
use crate::memory::PhysicalStore;
use crate::region::Region;
use crate::symbol::{Binding, SymbolTable};
use crate::translation::{self, VirtualAddress};
use crate::vma::{GrowthInfo, Vma, VmaList, align_up};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpaceStats {
    pub page_faults: u64,
    pub evictions: u64,
    pub grows: u64,
    /// Allocations that had to bind at the old frontier after growing
    pub fallback_binds: u64,
}

#[derive(Debug, Clone)]
pub struct AddressSpace {
    vmas: VmaList,
    symbols: SymbolTable,
    pager: Pager,
    grows: u64,
    fallback_binds: u64,
}

impl AddressSpace {
    /// A fresh space holding only the empty default VMA at address 0
    pub fn new(config: &EngineConfig) -> MemResult<Self> {
        let mut vmas = VmaList::new(config.merge_threshold);
        vmas.add(DEFAULT_VMA, 0)?;

        Ok(AddressSpace {
            vmas,
            symbols: SymbolTable::new(config.symbol_slots),
            pager: Pager::new(),
            grows: 0,
            fallback_binds: 0,
        })
    }

    pub fn vmas(&self) -> &VmaList {
        &self.vmas
    }

    pub fn get_vma(&self, vma_id: usize) -> Option<&Vma> {
        self.vmas.get(vma_id)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn stats(&self) -> SpaceStats {
        let pager = self.pager.stats();
        SpaceStats {
            page_faults: pager.page_faults,
            evictions: pager.evictions,
            grows: self.grows,
            fallback_binds: self.fallback_binds,
        }
    }

    pub fn add_vma(&mut self, vma_id: usize, start: usize) -> MemResult<()> {
        self.vmas.add(vma_id, start)?;
        Ok(())
    }

    pub fn validate_no_overlap(&self, vma_id: usize, lo: usize, hi: usize) -> MemResult<()> {
        self.vmas.validate_no_overlap(vma_id, lo, hi)
    }

    /// Grow `vma_id` far enough to serve a request of `requested` bytes.
    pub fn grow<S>(
        &mut self,
        vma_id: usize,
        requested: usize,
        ram: &mut S,
        swap: &mut S,
    ) -> MemResult<GrowthInfo>
    where
        S: PhysicalStore + ?Sized,
    {
        let increment = self.vmas.growth_increment(vma_id, requested)?;
        self.extend(vma_id, increment, ram, swap)
    }

    /// Grow `vma_id` by exactly `increment` bytes and back the new pages.
    ///
    /// Range, overlap and frame capacity are all checked before the VMA or
    /// the page table changes.
    pub fn extend<S>(
        &mut self,
        vma_id: usize,
        increment: usize,
        ram: &mut S,
        swap: &mut S,
    ) -> MemResult<GrowthInfo>
    where
        S: PhysicalStore + ?Sized,
    {
        let info = self.vmas.plan_extend(vma_id, increment)?;
        self.pager.map_pages(ram, swap, info.pages())?;
        self.vmas.apply_growth(&info)?;
        self.grows += 1;

        debug!(
            "vma {}: grew by {} to [{:#x}, {:#x})",
            vma_id, info.increment, self.vmas.require(vma_id)?.start, info.new_end
        );
        Ok(info)
    }

    /// Bind `region_id` to `size` fresh bytes of `vma_id` and return the start address.
    pub fn allocate<S>(
        &mut self,
        vma_id: usize,
        region_id: usize,
        size: usize,
        ram: &mut S,
        swap: &mut S,
    ) -> MemResult<usize>
    where
        S: PhysicalStore + ?Sized,
    {
        self.symbols.get(region_id)?;
        if size == 0 {
            return Err(MemError::ZeroSize);
        }

        let fit = self.vmas.require_mut(vma_id)?.free_list.find_fit(size);
        let region = match fit {
            Some(region) => region,
            None => {
                debug!("vma {}: {}", vma_id, MemError::NoFreeFit { size });
                let info = self.grow(vma_id, size, ram, swap)?;
                let retry = self.vmas.require_mut(vma_id)?.free_list.find_fit(size);
                match retry {
                    Some(region) => region,
                    None => self.fallback_region(&info, size, ram, swap)?,
                }
            }
        };

        let previous = self.symbols.bind(region_id, Binding { vma_id, region })?;
        if let Some(old) = previous {
            self.vmas.require_mut(old.vma_id)?.free_list.release(old.region)?;
            debug!("region {}: rebound, released {}", region_id, old.region);
        }

        debug!("region {}: bound to {} in vma {}", region_id, region, vma_id);
        Ok(region.lo)
    }

    // Growth did not yield a fit: bind at the frontier as it was before
    // growing, extending once more if the grown range falls short.
    fn fallback_region<S>(
        &mut self,
        info: &GrowthInfo,
        size: usize,
        ram: &mut S,
        swap: &mut S,
    ) -> MemResult<Region>
    where
        S: PhysicalStore + ?Sized,
    {
        let region = Region::new(info.old_end, info.old_end + size);
        warn!(
            "vma {}: no fit for {} bytes after growth, binding at {}",
            info.vma_id, size, region
        );

        let end = self.vmas.require(info.vma_id)?.end;
        if region.hi > end {
            self.extend(info.vma_id, align_up(region.hi - end)?, ram, swap)?;
        }

        self.vmas.require_mut(info.vma_id)?.free_list.carve(region);
        self.fallback_binds += 1;
        Ok(region)
    }

    /// Unbind `region_id` and return its range to the VMA's free list.
    pub fn free(&mut self, region_id: usize) -> MemResult<Region> {
        let binding = self.symbols.bound(region_id)?;
        self.vmas
            .require_mut(binding.vma_id)?
            .free_list
            .release(binding.region)?;
        self.symbols.unbind(region_id)?;

        debug!("region {}: freed {}", region_id, binding.region);
        Ok(binding.region)
    }

    /// Virtual address of byte `offset` inside the range bound to `region_id`
    pub fn resolve(&self, region_id: usize, offset: usize) -> MemResult<usize> {
        let binding = self.symbols.bound(region_id)?;
        let len = binding.region.len();
        if offset >= len {
            return Err(MemError::OffsetOutOfRange {
                region_id,
                offset,
                len,
            });
        }
        Ok(binding.region.lo + offset)
    }

    /// Physical RAM address of `addr`, faulting its page in if needed
    pub fn translate<S>(&mut self, addr: usize, ram: &mut S, swap: &mut S) -> MemResult<usize>
    where
        S: PhysicalStore + ?Sized,
    {
        let va = VirtualAddress::new(addr)?;
        translation::translate(&mut self.pager, ram, swap, &va)
    }

    pub fn read<S>(
        &mut self,
        region_id: usize,
        offset: usize,
        ram: &mut S,
        swap: &mut S,
    ) -> MemResult<u8>
    where
        S: PhysicalStore + ?Sized,
    {
        let addr = self.resolve(region_id, offset)?;
        let phys = self.translate(addr, ram, swap)?;
        ram.read_byte(phys)
    }

    pub fn write<S>(
        &mut self,
        region_id: usize,
        offset: usize,
        value: u8,
        ram: &mut S,
        swap: &mut S,
    ) -> MemResult<()>
    where
        S: PhysicalStore + ?Sized,
    {
        let addr = self.resolve(region_id, offset)?;
        let phys = self.translate(addr, ram, swap)?;
        ram.write_byte(phys, value)
    }

    /// Hand every frame and slot back to the shared pools.
    pub fn release_all<S>(&mut self, ram: &mut S, swap: &mut S) -> usize
    where
        S: PhysicalStore + ?Sized,
    {
        self.pager.release_all(ram, swap)
    }

    pub fn page_table_dump(&self) -> Vec<String> {
        self.pager.table().dump()
    }
}
