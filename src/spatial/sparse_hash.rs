//! Sparse cell index for radius queries over grid positions

use ahash::AHashMap;

use crate::core::types::{DistanceMetric, EntityId, GridLocation};

/// Sparse hash of occupied cells for neighbour scans
#[derive(Debug, Clone, Default)]
pub struct SparseHashGrid {
    cells: AHashMap<GridLocation, Vec<EntityId>>,
}

impl SparseHashGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn insert(&mut self, entity: EntityId, loc: GridLocation) {
        self.cells.entry(loc).or_default().push(entity);
    }

    pub fn remove(&mut self, entity: EntityId, loc: GridLocation) {
        if let Some(cell) = self.cells.get_mut(&loc) {
            cell.retain(|&e| e != entity);
            if cell.is_empty() {
                self.cells.remove(&loc);
            }
        }
    }

    pub fn relocate(&mut self, entity: EntityId, from: GridLocation, to: GridLocation) {
        if from != to {
            self.remove(entity, from);
            self.insert(entity, to);
        }
    }

    /// Entities occupying a single cell
    pub fn at(&self, loc: GridLocation) -> &[EntityId] {
        self.cells.get(&loc).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities within `radius` of `center`, ascending by id
    pub fn query_radius(
        &self,
        center: GridLocation,
        radius: u32,
        metric: DistanceMetric,
    ) -> Vec<EntityId> {
        let r = radius as i64;
        let side = (2 * r + 1) as u64;
        let window = side.saturating_mul(side);
        let mut found: Vec<EntityId> = if window > self.cells.len() as u64 {
            // Sparse world: cheaper to walk the occupied cells
            self.cells
                .iter()
                .filter(|(loc, _)| metric.within(&center, loc, radius))
                .flat_map(|(_, ids)| ids.iter().copied())
                .collect()
        } else {
            let mut ids = Vec::new();
            for dr in -r..=r {
                for dc in -r..=r {
                    let (Ok(row), Ok(col)) = (
                        i32::try_from(center.r as i64 + dr),
                        i32::try_from(center.c as i64 + dc),
                    ) else {
                        continue;
                    };
                    let loc = GridLocation::new(row, col);
                    if metric.within(&center, &loc, radius) {
                        ids.extend_from_slice(self.at(loc));
                    }
                }
            }
            ids
        };
        found.sort_unstable();
        found
    }
}
