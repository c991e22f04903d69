//! Dense row-major grid for per-cell derived features

use crate::core::types::GridLocation;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T: Clone + Default> {
    pub height: usize,
    pub width: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> Grid<T> {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            data: vec![T::default(); width * height],
        }
    }

    #[inline]
    fn offset(&self, loc: GridLocation) -> Option<usize> {
        if loc.r < 0 || loc.c < 0 {
            return None;
        }
        let (r, c) = (loc.r as usize, loc.c as usize);
        (r < self.height && c < self.width).then_some(r * self.width + c)
    }

    #[inline]
    pub fn get(&self, loc: GridLocation) -> Option<&T> {
        self.offset(loc).map(|i| &self.data[i])
    }

    #[inline]
    pub fn set(&mut self, loc: GridLocation, value: T) {
        if let Some(i) = self.offset(loc) {
            self.data[i] = value;
        }
    }

    /// Every cell location in row-major order
    pub fn locations(&self) -> impl Iterator<Item = GridLocation> {
        let width = self.width;
        (0..self.height).flat_map(move |r| {
            (0..width).map(move |c| GridLocation::new(r as i32, c as i32))
        })
    }
}
