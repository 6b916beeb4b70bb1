use crate::error::{MemError, MemResult};
use crate::region::Region;

/// A region id's current range and the VMA it was carved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub vma_id: usize,
    pub region: Region,
}

/// Fixed-size table from caller-chosen region ids to bound ranges
#[derive(Debug, Clone)]
pub struct SymbolTable {
    slots: Vec<Option<Binding>>,
}

impl SymbolTable {
    pub fn new(slots: usize) -> Self {
        SymbolTable {
            slots: vec![None; slots],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// The slot for `region_id`, bound or not
    pub fn get(&self, region_id: usize) -> MemResult<Option<Binding>> {
        self.slots
            .get(region_id)
            .copied()
            .ok_or(MemError::InvalidRegionId(region_id))
    }

    /// The binding for `region_id`, failing if the slot is empty
    pub fn bound(&self, region_id: usize) -> MemResult<Binding> {
        self.get(region_id)?
            .ok_or(MemError::UnboundRegion(region_id))
    }

    /// Bind `region_id`, handing back whatever it was bound to before.
    pub fn bind(&mut self, region_id: usize, binding: Binding) -> MemResult<Option<Binding>> {
        let slot = self
            .slots
            .get_mut(region_id)
            .ok_or(MemError::InvalidRegionId(region_id))?;
        Ok(slot.replace(binding))
    }

    pub fn unbind(&mut self, region_id: usize) -> MemResult<Binding> {
        let slot = self
            .slots
            .get_mut(region_id)
            .ok_or(MemError::InvalidRegionId(region_id))?;
        slot.take().ok_or(MemError::UnboundRegion(region_id))
    }

    /// Bound ids in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (usize, Binding)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.map(|binding| (id, binding)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(lo: usize, hi: usize) -> Binding {
        Binding {
            vma_id: 0,
            region: Region::new(lo, hi),
        }
    }

    #[test]
    fn test_new_table_is_unbound() {
        let table = SymbolTable::new(30);
        assert_eq!(table.capacity(), 30);
        assert_eq!(table.get(0), Ok(None));
        assert_eq!(table.get(29), Ok(None));
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn test_ids_outside_table() {
        let mut table = SymbolTable::new(30);
        assert_eq!(table.get(30), Err(MemError::InvalidRegionId(30)));
        assert_eq!(table.bind(30, binding(0, 1)), Err(MemError::InvalidRegionId(30)));
        assert_eq!(table.unbind(99), Err(MemError::InvalidRegionId(99)));
    }

    #[test]
    fn test_bind_and_unbind() {
        let mut table = SymbolTable::new(4);
        assert_eq!(table.bind(2, binding(0, 100)), Ok(None));
        assert_eq!(table.bound(2), Ok(binding(0, 100)));

        // Rebinding returns the old range
        assert_eq!(table.bind(2, binding(100, 150)), Ok(Some(binding(0, 100))));

        assert_eq!(table.unbind(2), Ok(binding(100, 150)));
        assert_eq!(table.bound(2), Err(MemError::UnboundRegion(2)));
    }

    #[test]
    fn test_double_unbind() {
        let mut table = SymbolTable::new(4);
        table.bind(1, binding(0, 10)).unwrap();
        table.unbind(1).unwrap();
        assert_eq!(table.unbind(1), Err(MemError::UnboundRegion(1)));
    }

    #[test]
    fn test_iter_lists_bound_ids() {
        let mut table = SymbolTable::new(4);
        table.bind(3, binding(0, 10)).unwrap();
        table.bind(1, binding(10, 20)).unwrap();

        let ids: Vec<usize> = table.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
