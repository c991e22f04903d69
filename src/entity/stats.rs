//! Cumulative stat trackers

use serde::{Deserialize, Serialize};

use crate::core::types::StatId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsTracker {
    values: Vec<f64>,
}

impl StatsTracker {
    pub fn new(stat_count: usize) -> Self {
        Self {
            values: vec![0.0; stat_count],
        }
    }

    #[inline]
    pub fn get(&self, stat: StatId) -> f64 {
        self.values.get(stat.0 as usize).copied().unwrap_or(0.0)
    }

    pub fn add(&mut self, stat: StatId, delta: f64) {
        if let Some(value) = self.values.get_mut(stat.0 as usize) {
            *value += delta;
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
