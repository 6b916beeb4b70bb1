//! Opcodes of the generic memory-operation call.
//!
//! The dispatcher that switches on these lives with the caller; the engine
//! only exposes one method per opcode.

use std::fmt;

use crate::error::MemError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemOp {
    /// Reserved, accepted as a no-op
    Map = 0,
    /// Grow a VMA by a byte count
    IncreaseLimit = 1,
    /// Copy a RAM frame to a swap slot
    Swap = 2,
    IoRead = 3,
    IoWrite = 4,
}

impl MemOp {
    pub const ALL: [MemOp; 5] = [
        MemOp::Map,
        MemOp::IncreaseLimit,
        MemOp::Swap,
        MemOp::IoRead,
        MemOp::IoWrite,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            MemOp::Map => "map",
            MemOp::IncreaseLimit => "increase-limit",
            MemOp::Swap => "swap",
            MemOp::IoRead => "io-read",
            MemOp::IoWrite => "io-write",
        }
    }
}

impl TryFrom<u32> for MemOp {
    type Error = MemError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        MemOp::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or(MemError::UnknownMemOp(code))
    }
}

impl fmt::Display for MemOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
