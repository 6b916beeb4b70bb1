use crate::constants::*;
use crate::error::{MemError, MemResult};

/// Sizing knobs for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of RAM frames in the shared pool
    pub ram_frames: usize,
    /// Number of swap slots in the shared pool
    pub swap_frames: usize,
    /// Free regions are merged only when at least one side reaches this size
    pub merge_threshold: usize,
    /// Number of region ids per address space
    pub symbol_slots: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            ram_frames: DEFAULT_RAM_FRAMES,
            swap_frames: DEFAULT_SWAP_FRAMES,
            merge_threshold: MIN_MERGE_SIZE,
            symbol_slots: MAX_SYM,
        }
    }

    pub fn with_ram_frames(mut self, frames: usize) -> Self {
        self.ram_frames = frames;
        self
    }

    pub fn with_swap_frames(mut self, frames: usize) -> Self {
        self.swap_frames = frames;
        self
    }

    pub fn with_merge_threshold(mut self, bytes: usize) -> Self {
        self.merge_threshold = bytes;
        self
    }

    pub fn with_symbol_slots(mut self, slots: usize) -> Self {
        self.symbol_slots = slots;
        self
    }

    /// Total RAM capacity in bytes
    pub fn ram_bytes(&self) -> usize {
        self.ram_frames * FRAME_SIZE
    }

    /// Total swap capacity in bytes
    pub fn swap_bytes(&self) -> usize {
        self.swap_frames * FRAME_SIZE
    }

    /// Reject pools that are empty or too large for the packed PTE fields.
    pub fn validate(&self) -> MemResult<()> {
        if self.ram_frames == 0 || self.ram_frames > MAX_RAM_FRAMES {
            return Err(MemError::InvalidConfig(format!(
                "ram_frames must be in 1..={}, got {}",
                MAX_RAM_FRAMES, self.ram_frames
            )));
        }
        if self.swap_frames == 0 || self.swap_frames > MAX_SWAP_FRAMES {
            return Err(MemError::InvalidConfig(format!(
                "swap_frames must be in 1..={}, got {}",
                MAX_SWAP_FRAMES, self.swap_frames
            )));
        }
        if self.symbol_slots == 0 {
            return Err(MemError::InvalidConfig(
                "symbol_slots must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.ram_frames, 4096);
        assert_eq!(config.ram_bytes(), 1 << 20); // 4096 * 256
        assert_eq!(config.swap_bytes(), 1 << 22);
        assert_eq!(config.merge_threshold, 256);
        assert_eq!(config.symbol_slots, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::new()
            .with_ram_frames(4)
            .with_swap_frames(64)
            .with_merge_threshold(0)
            .with_symbol_slots(8);

        assert_eq!(config.ram_frames, 4);
        assert_eq!(config.swap_frames, 64);
        assert_eq!(config.merge_threshold, 0);
        assert_eq!(config.symbol_slots, 8);
    }

    #[test]
    fn test_validate_rejects_bad_pools() {
        assert!(EngineConfig::new().with_ram_frames(0).validate().is_err());
        assert!(EngineConfig::new().with_swap_frames(0).validate().is_err());
        assert!(
            EngineConfig::new()
                .with_ram_frames(MAX_RAM_FRAMES + 1)
                .validate()
                .is_err()
        );
        assert!(EngineConfig::new().with_symbol_slots(0).validate().is_err());
    }
}
