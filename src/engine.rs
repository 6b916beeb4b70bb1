//! The process-wide memory engine.
//!
//! All state (both frame pools and every address space) sits behind one
//! `spin::Mutex`. Each public method locks it once for the whole call,
//! page-fault service included, so calls on unrelated processes also
//! exclude each other. A per-space lock would allow more parallelism; the
//! single lock keeps every call trivially serializable.

use std::collections::BTreeMap;

use log::info;
use spin::Mutex;

use crate::address_space::{AddressSpace, SpaceStats};
use crate::config::EngineConfig;
use crate::constants::*;
use crate::error::{MemError, MemResult};
use crate::memory::{MemPhy, PhysicalStore, copy_frame};
use crate::vma::{GrowthInfo, align_up};

pub type Pid = u32;

struct EngineState<S> {
    config: EngineConfig,
    ram: S,
    swap: S,
    spaces: BTreeMap<Pid, AddressSpace>,
}

pub struct MemoryEngine<S: PhysicalStore = MemPhy> {
    state: Mutex<EngineState<S>>,
}

impl MemoryEngine<MemPhy> {
    /// Engine with zeroed in-memory RAM and swap sized by `config`
    pub fn new(config: EngineConfig) -> MemResult<Self> {
        config.validate()?;
        let ram = MemPhy::ram(config.ram_frames);
        let swap = MemPhy::swap(config.swap_frames);
        Self::with_stores(config, ram, swap)
    }

    /// Non-zero RAM bytes as `(physical address, value)`
    pub fn ram_dump(&self) -> Vec<(usize, u8)> {
        self.state.lock().ram.dump()
    }
}

impl<S: PhysicalStore> MemoryEngine<S> {
    /// Engine over caller-provided stores. `config`'s pool sizes are
    /// replaced by the stores' actual frame counts.
    pub fn with_stores(config: EngineConfig, ram: S, swap: S) -> MemResult<Self> {
        let config = config
            .with_ram_frames(ram.frame_count())
            .with_swap_frames(swap.frame_count());
        config.validate()?;

        Ok(MemoryEngine {
            state: Mutex::new(EngineState {
                config,
                ram,
                swap,
                spaces: BTreeMap::new(),
            }),
        })
    }

    pub fn config(&self) -> EngineConfig {
        self.state.lock().config
    }

    /// Create an address space for `pid` holding the empty default VMA.
    pub fn spawn(&self, pid: Pid) -> MemResult<()> {
        let mut state = self.state.lock();
        if state.spaces.contains_key(&pid) {
            return Err(MemError::DuplicateProcess(pid));
        }
        let space = AddressSpace::new(&state.config)?;
        state.spaces.insert(pid, space);
        info!("process {}: address space created", pid);
        Ok(())
    }

    /// Tear down `pid`'s address space; returns how many frames and slots came back.
    pub fn exit(&self, pid: Pid) -> MemResult<usize> {
        let mut guard = self.state.lock();
        let EngineState { ram, swap, spaces, .. } = &mut *guard;
        let mut space = spaces.remove(&pid).ok_or(MemError::UnknownProcess(pid))?;
        let released = space.release_all(ram, swap);
        info!("process {}: exited, released {} frames", pid, released);
        Ok(released)
    }

    pub fn processes(&self) -> Vec<Pid> {
        self.state.lock().spaces.keys().copied().collect()
    }

    pub fn add_vma(&self, pid: Pid, vma_id: usize, start: usize) -> MemResult<()> {
        self.with_space_mut(pid, |space, _, _| space.add_vma(vma_id, start))
    }

    /// Bind `region_id` to `size` bytes of the default VMA; returns the address.
    pub fn allocate(&self, pid: Pid, size: usize, region_id: usize) -> MemResult<usize> {
        self.allocate_in(pid, DEFAULT_VMA, region_id, size)
    }

    pub fn allocate_in(
        &self,
        pid: Pid,
        vma_id: usize,
        region_id: usize,
        size: usize,
    ) -> MemResult<usize> {
        self.with_space_mut(pid, |space, ram, swap| {
            space.allocate(vma_id, region_id, size, ram, swap)
        })
    }

    pub fn deallocate(&self, pid: Pid, region_id: usize) -> MemResult<()> {
        self.with_space_mut(pid, |space, _, _| space.free(region_id).map(|_| ()))
    }

    pub fn read(&self, pid: Pid, region_id: usize, offset: usize) -> MemResult<u8> {
        self.with_space_mut(pid, |space, ram, swap| space.read(region_id, offset, ram, swap))
    }

    pub fn write(&self, pid: Pid, value: u8, region_id: usize, offset: usize) -> MemResult<()> {
        self.with_space_mut(pid, |space, ram, swap| {
            space.write(region_id, offset, value, ram, swap)
        })
    }

    /// Virtual to physical translation for `pid`, faulting the page in if needed
    pub fn translate(&self, pid: Pid, addr: usize) -> MemResult<usize> {
        self.with_space_mut(pid, |space, ram, swap| space.translate(addr, ram, swap))
    }

    /// Increase-limit opcode: grow `vma_id` by `size` bytes rounded up to whole pages.
    pub fn increase_limit(&self, pid: Pid, vma_id: usize, size: usize) -> MemResult<GrowthInfo> {
        self.with_space_mut(pid, |space, ram, swap| {
            space.extend(vma_id, align_up(size)?, ram, swap)
        })
    }

    /// Swap opcode: copy RAM frame `ram_frame` into swap slot `swap_slot`.
    pub fn swap_page(&self, ram_frame: usize, swap_slot: usize) -> MemResult<()> {
        let mut guard = self.state.lock();
        let EngineState { ram, swap, .. } = &mut *guard;
        copy_frame(&*ram, ram_frame, swap, swap_slot)
    }

    /// Raw read of RAM at a physical address
    pub fn io_read(&self, phys: usize) -> MemResult<u8> {
        self.state.lock().ram.read_byte(phys)
    }

    /// Raw write of RAM at a physical address
    pub fn io_write(&self, phys: usize, value: u8) -> MemResult<()> {
        self.state.lock().ram.write_byte(phys, value)
    }

    pub fn stats(&self, pid: Pid) -> MemResult<SpaceStats> {
        self.with_space(pid, |space| space.stats())
    }

    pub fn page_table_dump(&self, pid: Pid) -> MemResult<Vec<String>> {
        self.with_space(pid, |space| space.page_table_dump())
    }

    pub fn free_ram_frames(&self) -> usize {
        self.state.lock().ram.free_frame_count()
    }

    pub fn free_swap_frames(&self) -> usize {
        self.state.lock().swap.free_frame_count()
    }

    /// Run `f` against `pid`'s address space under the lock.
    pub fn with_space<R>(&self, pid: Pid, f: impl FnOnce(&AddressSpace) -> R) -> MemResult<R> {
        let state = self.state.lock();
        let space = state.spaces.get(&pid).ok_or(MemError::UnknownProcess(pid))?;
        Ok(f(space))
    }

    fn with_space_mut<R>(
        &self,
        pid: Pid,
        f: impl FnOnce(&mut AddressSpace, &mut S, &mut S) -> MemResult<R>,
    ) -> MemResult<R> {
        let mut guard = self.state.lock();
        let EngineState { ram, swap, spaces, .. } = &mut *guard;
        let space = spaces.get_mut(&pid).ok_or(MemError::UnknownProcess(pid))?;
        f(space, ram, swap)
    }
}
