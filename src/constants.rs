pub const ADDRESS_BITS: u32 = 22;
pub const OFFSET_BITS: u32 = 8;
pub const PGN_BITS: u32 = ADDRESS_BITS - OFFSET_BITS;

pub const PAGE_SIZE: usize = 1 << OFFSET_BITS;
pub const FRAME_SIZE: usize = PAGE_SIZE;
pub const FRAME_SHIFT: u32 = OFFSET_BITS;
pub const MAX_PGN: usize = 1 << PGN_BITS;
pub const MAX_ADDRESS: usize = 1 << ADDRESS_BITS;

pub const OFFSET_MASK: usize = (1 << OFFSET_BITS) - 1;
pub const PGN_MASK: usize = (1 << PGN_BITS) - 1;

// symbol table slots; valid region ids are [0, MAX_SYM)
pub const MAX_SYM: usize = 30;

// free regions smaller than this are never merged with each other
pub const MIN_MERGE_SIZE: usize = 256;

pub const DEFAULT_VMA: usize = 0;
pub const DEFAULT_RAM_FRAMES: usize = 4096;
pub const DEFAULT_SWAP_FRAMES: usize = 16384;

// packed PTE layout (dump format)
pub const PTE_PRESENT_BIT: u32 = 31;
pub const PTE_SWAPPED_BIT: u32 = 30;
pub const PTE_FPN_BITS: u32 = 13;
pub const PTE_FPN_MASK: u32 = (1 << PTE_FPN_BITS) - 1;
pub const PTE_SWPOFF_SHIFT: u32 = 5;
pub const PTE_SWPOFF_BITS: u32 = 21;
pub const PTE_SWPOFF_MASK: u32 = (1 << PTE_SWPOFF_BITS) - 1;

pub const MAX_RAM_FRAMES: usize = 1 << PTE_FPN_BITS;
pub const MAX_SWAP_FRAMES: usize = 1 << PTE_SWPOFF_BITS;

pub const FAILURE_STATUS: i32 = -1;
