//! Machinery blocker reservations.
//!
//! Each pod reserves the cell behind its bed for its machinery. The
//! reservation is a plain record owned by the registry; map placement is the
//! host's business.

use serde::{Deserialize, Serialize};

use crate::PodId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    North,
    East,
    South,
    West,
}

/// Cell occupied by the machinery of a pod at `position` facing `rotation`.
pub fn blocker_cell(position: Cell, rotation: Rotation) -> Cell {
    let (dx, dz) = match rotation {
        Rotation::North => (0, -1),
        Rotation::East => (-1, 0),
        Rotation::South => (0, 1),
        Rotation::West => (1, 0),
    };
    Cell::new(position.x + dx, position.y, position.z + dz)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockerReservation {
    pub cell: Cell,
    pub owner: PodId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockerRegistry {
    reservations: Vec<BlockerReservation>,
}

impl BlockerRegistry {
    /// Reserve `cell` for `owner`. A reservation already sitting on the cell
    /// (left over from a previous placement) is replaced and returned.
    pub fn reserve(&mut self, cell: Cell, owner: PodId) -> Option<BlockerReservation> {
        let displaced = self
            .reservations
            .iter()
            .position(|r| r.cell == cell)
            .map(|idx| self.reservations.swap_remove(idx));
        self.reservations.push(BlockerReservation { cell, owner });
        displaced
    }

    /// Release every reservation held by `owner`.
    pub fn release(&mut self, owner: &PodId) -> Vec<BlockerReservation> {
        let (released, kept) = self
            .reservations
            .drain(..)
            .partition(|r| &r.owner == owner);
        self.reservations = kept;
        released
    }

    pub fn owner_at(&self, cell: Cell) -> Option<&PodId> {
        self.reservations
            .iter()
            .find(|r| r.cell == cell)
            .map(|r| &r.owner)
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(id: &str) -> PodId {
        PodId(id.to_string())
    }

    #[test]
    fn blocker_sits_behind_the_bed_for_each_rotation() {
        let origin = Cell::new(10, 0, 10);
        assert_eq!(blocker_cell(origin, Rotation::North), Cell::new(10, 0, 9));
        assert_eq!(blocker_cell(origin, Rotation::East), Cell::new(9, 0, 10));
        assert_eq!(blocker_cell(origin, Rotation::South), Cell::new(10, 0, 11));
        assert_eq!(blocker_cell(origin, Rotation::West), Cell::new(11, 0, 10));
    }

    #[test]
    fn reserve_replaces_stale_reservation_on_same_cell() {
        let mut registry = BlockerRegistry::default();
        let cell = Cell::new(1, 0, 1);
        assert!(registry.reserve(cell, pod("pod_0001")).is_none());

        let displaced = registry.reserve(cell, pod("pod_0002")).unwrap();
        assert_eq!(displaced.owner, pod("pod_0001"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.owner_at(cell), Some(&pod("pod_0002")));
    }

    #[test]
    fn release_only_drops_the_owners_reservations() {
        let mut registry = BlockerRegistry::default();
        registry.reserve(Cell::new(0, 0, 0), pod("pod_0001"));
        registry.reserve(Cell::new(5, 0, 0), pod("pod_0002"));

        let released = registry.release(&pod("pod_0001"));
        assert_eq!(released.len(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.owner_at(Cell::new(0, 0, 0)).is_none());
        assert!(registry.release(&pod("pod_0001")).is_empty());
    }
}
