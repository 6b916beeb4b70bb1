use std::collections::VecDeque;
use std::fmt;

use crate::constants::*;
use crate::error::{MemError, MemResult};

/// Byte-addressed frame pool the engine reads from and writes to.
///
/// RAM and the swap device are two instances of the same shape.
pub trait PhysicalStore {
    /// Number of frames the store holds
    fn frame_count(&self) -> usize;

    /// Number of frames currently free
    fn free_frame_count(&self) -> usize;

    fn read_byte(&self, address: usize) -> MemResult<u8>;

    fn write_byte(&mut self, address: usize, value: u8) -> MemResult<()>;

    /// Take a free frame out of the pool
    fn alloc_free_frame(&mut self) -> MemResult<usize>;

    /// Return a frame to the pool
    fn release_frame(&mut self, frame: usize) -> MemResult<()>;

    #[inline]
    fn contains_frame(&self, frame: usize) -> bool {
        frame < self.frame_count()
    }

    /// Zero a frame's contents
    fn clear_frame(&mut self, frame: usize) -> MemResult<()> {
        if !self.contains_frame(frame) {
            return Err(MemError::InvalidFrame(frame));
        }
        let base = frame_to_address(frame);
        for offset in 0..FRAME_SIZE {
            self.write_byte(base + offset, 0)?;
        }
        Ok(())
    }
}

/// Calculate the starting address of a frame
#[inline]
pub fn frame_to_address(frame: usize) -> usize {
    frame << FRAME_SHIFT
}

/// Copy one whole frame from `src` into a frame of `dst`.
///
/// Both frame numbers are checked before any byte moves, so a failed copy
/// leaves `dst` untouched.
pub fn copy_frame<S, D>(src: &S, src_frame: usize, dst: &mut D, dst_frame: usize) -> MemResult<()>
where
    S: PhysicalStore + ?Sized,
    D: PhysicalStore + ?Sized,
{
    if !src.contains_frame(src_frame) {
        return Err(MemError::InvalidFrame(src_frame));
    }
    if !dst.contains_frame(dst_frame) {
        return Err(MemError::InvalidFrame(dst_frame));
    }

    let src_base = frame_to_address(src_frame);
    let dst_base = frame_to_address(dst_frame);
    for offset in 0..FRAME_SIZE {
        let value = src.read_byte(src_base + offset)?;
        dst.write_byte(dst_base + offset, value)?;
    }
    Ok(())
}

/// Tracks which frames are available for allocation
#[derive(Debug, Clone)]
pub struct FreeFrameList {
    free: VecDeque<usize>,
    occupied: Vec<bool>,
}

impl FreeFrameList {
    /// All `count` frames start out free, handed out lowest first
    pub fn new(count: usize) -> Self {
        FreeFrameList {
            free: (0..count).collect(),
            occupied: vec![false; count],
        }
    }

    pub fn allocate(&mut self) -> Option<usize> {
        let frame = self.free.pop_front()?;
        self.occupied[frame] = true;
        Some(frame)
    }

    /// Put a frame back at the tail. Returns false for unknown or already free frames.
    pub fn release(&mut self, frame: usize) -> bool {
        match self.occupied.get_mut(frame) {
            Some(slot) if *slot => {
                *slot = false;
                self.free.push_back(frame);
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.occupied.len()
    }
}

/// Which pool a store plays; decides the exhaustion error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Ram,
    Swap,
}

/// In-memory frame pool used for both RAM and swap
pub struct MemPhy {
    kind: StoreKind,
    data: Vec<u8>,
    frames: FreeFrameList,
}

impl MemPhy {
    /// Create a zeroed store of `frames` frames
    pub fn new(kind: StoreKind, frames: usize) -> Self {
        MemPhy {
            kind,
            data: vec![0u8; frames * FRAME_SIZE],
            frames: FreeFrameList::new(frames),
        }
    }

    pub fn ram(frames: usize) -> Self {
        Self::new(StoreKind::Ram, frames)
    }

    pub fn swap(frames: usize) -> Self {
        Self::new(StoreKind::Swap, frames)
    }

    /// Every non-zero byte as `(address, value)`, lowest address first
    pub fn dump(&self) -> Vec<(usize, u8)> {
        self.data
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value != 0)
            .map(|(address, &value)| (address, value))
            .collect()
    }
}

impl PhysicalStore for MemPhy {
    fn frame_count(&self) -> usize {
        self.frames.capacity()
    }

    fn free_frame_count(&self) -> usize {
        self.frames.free_count()
    }

    #[inline]
    fn read_byte(&self, address: usize) -> MemResult<u8> {
        self.data
            .get(address)
            .copied()
            .ok_or(MemError::PhysicalOutOfRange(address))
    }

    #[inline]
    fn write_byte(&mut self, address: usize, value: u8) -> MemResult<()> {
        let cell = self
            .data
            .get_mut(address)
            .ok_or(MemError::PhysicalOutOfRange(address))?;
        *cell = value;
        Ok(())
    }

    fn alloc_free_frame(&mut self) -> MemResult<usize> {
        self.frames.allocate().ok_or(match self.kind {
            StoreKind::Ram => MemError::RamExhausted,
            StoreKind::Swap => MemError::SwapExhausted,
        })
    }

    fn release_frame(&mut self, frame: usize) -> MemResult<()> {
        if self.frames.release(frame) {
            Ok(())
        } else {
            Err(MemError::InvalidFrame(frame))
        }
    }

    fn clear_frame(&mut self, frame: usize) -> MemResult<()> {
        if !self.contains_frame(frame) {
            return Err(MemError::InvalidFrame(frame));
        }
        let base = frame_to_address(frame);
        self.data[base..base + FRAME_SIZE].fill(0);
        Ok(())
    }
}

impl fmt::Debug for MemPhy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemPhy")
            .field("kind", &self.kind)
            .field("frames", &self.frames.capacity())
            .field("free", &self.frames.free_count())
            .finish()
    }
}
