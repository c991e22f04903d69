//! Territory resolution
//!
//! A cell belongs to the collective with the nearest covering source.
//! Coverage and distance both use squared Euclidean distance. On an exact
//! tie the configured yielding collective drops out; if that does not leave
//! a single winner the cell is contested and carries no territory.

use std::collections::BTreeMap;

use crate::core::types::{CollectiveId, GridLocation};
use crate::spatial::Grid;

/// One aligned AOE source that projects territory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerritorySource {
    pub location: GridLocation,
    pub radius: u32,
    pub collective: CollectiveId,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerritoryResolver {
    pub yield_on_tie: Option<CollectiveId>,
}

impl TerritoryResolver {
    pub fn new(yield_on_tie: Option<CollectiveId>) -> Self {
        Self { yield_on_tie }
    }

    pub fn resolve(&self, sources: &[TerritorySource], cell: GridLocation) -> Option<CollectiveId> {
        let mut nearest: BTreeMap<CollectiveId, u64> = BTreeMap::new();
        for source in sources {
            let d = source.location.distance_sq(&cell);
            let r = source.radius as u64;
            if d > r * r {
                continue;
            }
            nearest
                .entry(source.collective)
                .and_modify(|best| *best = (*best).min(d))
                .or_insert(d);
        }

        let closest = *nearest.values().min()?;
        let mut contenders: Vec<CollectiveId> = nearest
            .into_iter()
            .filter(|&(_, d)| d == closest)
            .map(|(c, _)| c)
            .collect();
        if contenders.len() > 1 {
            if let Some(yielding) = self.yield_on_tie {
                contenders.retain(|&c| c != yielding);
            }
        }
        match contenders.as_slice() {
            [winner] => Some(*winner),
            _ => None,
        }
    }

    pub fn grid(&self, sources: &[TerritorySource], height: usize, width: usize) -> Grid<Option<CollectiveId>> {
        let mut grid = Grid::new(height, width);
        for cell in grid.locations().collect::<Vec<_>>() {
            grid.set(cell, self.resolve(sources, cell));
        }
        grid
    }
}
