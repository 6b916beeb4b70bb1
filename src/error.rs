//! Error kinds surfaced by the memory engine.

use thiserror::Error;

use crate::constants::FAILURE_STATUS;

/// Every failure the engine can report. Nothing in the engine panics or
/// aborts the calling process; each entry point hands one of these back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    #[error("region id {0} is outside the symbol table")]
    InvalidRegionId(usize),

    #[error("region id {0} is not bound to any range")]
    UnboundRegion(usize),

    #[error("malformed range [{lo}, {hi})")]
    MalformedRange { lo: usize, hi: usize },

    #[error("no free region can hold {size} bytes")]
    NoFreeFit { size: usize },

    #[error("range [{lo}, {hi}) of vma {vma_id} overlaps a sibling area")]
    OverlapDetected { vma_id: usize, lo: usize, hi: usize },

    #[error("no resident page available for eviction")]
    NoVictim,

    #[error("swap device has no free slot")]
    SwapExhausted,

    #[error("translation of address {addr:#x} failed: {source}")]
    TranslationFailure {
        addr: usize,
        #[source]
        source: Box<MemError>,
    },

    #[error("vma {0} does not exist")]
    UnknownVma(usize),

    #[error("vma {0} already exists")]
    DuplicateVma(usize),

    #[error("vma start {0:#x} is not page aligned")]
    MisalignedVma(usize),

    #[error("page {0} has neither a frame nor a swap slot")]
    UnmappedPage(usize),

    #[error("offset {offset} is outside region {region_id} of {len} bytes")]
    OffsetOutOfRange {
        region_id: usize,
        offset: usize,
        len: usize,
    },

    #[error("allocation size must be non-zero")]
    ZeroSize,

    #[error("address {0:#x} exceeds the virtual address space")]
    AddressOutOfRange(usize),

    #[error("physical address {0:#x} is outside the store")]
    PhysicalOutOfRange(usize),

    #[error("frame {0} is not a valid allocated frame")]
    InvalidFrame(usize),

    #[error("ram has no free frame")]
    RamExhausted,

    #[error("ram and swap together cannot back {pages} more pages")]
    FramesExhausted { pages: usize },

    #[error("process {0} is not registered")]
    UnknownProcess(u32),

    #[error("process {0} is already registered")]
    DuplicateProcess(u32),

    #[error("unknown memory opcode {0}")]
    UnknownMemOp(u32),

    #[error("value {0} does not fit in a byte")]
    InvalidByte(usize),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type MemResult<T> = Result<T, MemError>;

impl MemError {
    /// Wrap a fault-handler failure seen while translating `addr`.
    pub fn translation(addr: usize, source: MemError) -> Self {
        MemError::TranslationFailure {
            addr,
            source: Box::new(source),
        }
    }

    /// The innermost error kind, looking through `TranslationFailure`.
    pub fn root(&self) -> &MemError {
        match self {
            MemError::TranslationFailure { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Boundary status code for a call result: the success value (or `0`)
/// when it worked, `-1` when it failed.
pub trait Status {
    fn status(&self) -> i64;
}

impl Status for MemResult<()> {
    fn status(&self) -> i64 {
        match self {
            Ok(()) => 0,
            Err(_) => FAILURE_STATUS as i64,
        }
    }
}

impl Status for MemResult<usize> {
    fn status(&self) -> i64 {
        match self {
            Ok(value) => *value as i64,
            Err(_) => FAILURE_STATUS as i64,
        }
    }
}

impl Status for MemResult<u8> {
    fn status(&self) -> i64 {
        match self {
            Ok(value) => *value as i64,
            Err(_) => FAILURE_STATUS as i64,
        }
    }
}
