pub mod address_space;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod fault;
pub mod io;
pub mod memory;
pub mod page_table;
pub mod region;
pub mod symbol;
pub mod sys_mem;
pub mod translation;
pub mod vma;

// Re-export commonly used items for convenience
pub use address_space::{AddressSpace, SpaceStats};
pub use config::EngineConfig;
pub use constants::*;
pub use engine::{MemoryEngine, Pid};
pub use error::{MemError, MemResult, Status};
pub use memory::{MemPhy, PhysicalStore};
pub use page_table::PageTableEntry;
pub use region::{FreeList, Region};
pub use sys_mem::MemOp;
pub use translation::VirtualAddress;
