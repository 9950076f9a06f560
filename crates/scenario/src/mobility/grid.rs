//! Row-first grid placement.

use crate::config::GridLayout;
use netsim_types::Vector;

/// Places the n-th node at column `n % grid_width`, row `n / grid_width`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPositionAllocator {
    pub min_x: f64,
    pub min_y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub grid_width: u32,
}

impl GridPositionAllocator {
    pub fn new(min_x: f64, min_y: f64, delta_x: f64, delta_y: f64, grid_width: u32) -> Self {
        Self {
            min_x,
            min_y,
            delta_x,
            delta_y,
            grid_width: grid_width.max(1),
        }
    }

    /// Grid starting at (1, 1) with the layout's spacing in both directions.
    pub fn for_layout(layout: &GridLayout) -> Self {
        Self::new(1.0, 1.0, layout.spacing, layout.spacing, layout.cols)
    }

    /// Position of the node with the given index.
    pub fn position(&self, index: u32) -> Vector {
        let col = index % self.grid_width;
        let row = index / self.grid_width;
        Vector::planar(
            self.min_x + self.delta_x * f64::from(col),
            self.min_y + self.delta_y * f64::from(row),
        )
    }

    /// Positions of the first `count` nodes.
    pub fn positions(&self, count: u32) -> impl Iterator<Item = Vector> + '_ {
        (0..count).map(|index| self.position(index))
    }
}
