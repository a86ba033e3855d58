//! Dense cell grid for one map.
//!
//! The grid is a flat, row-major `Vec` of [`MapCell`]s allocated once when the
//! map is created. It knows nothing about entity kinds or observers; it only
//! keeps membership lists and validates coordinates. Out-of-bounds lookups
//! return `None` (or `false`) and are never fatal.

mod cell;

pub use cell::{CellFlags, MapCell};

use crate::types::{EntityId, Point};

/// Width × height cells, one per integer coordinate.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    width: u32,
    height: u32,
    cells: Vec<MapCell>,
}

impl SpatialGrid {
    /// Allocates every cell of a `width` × `height` map.
    pub fn new(width: u32, height: u32) -> Self {
        let count = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![MapCell::default(); count],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        self.index(point).is_some()
    }

    fn index(&self, point: Point) -> Option<usize> {
        let x = u32::try_from(point.x).ok()?;
        let y = u32::try_from(point.y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    /// Returns the cell at `point`, or `None` outside the map.
    pub fn cell(&self, point: Point) -> Option<&MapCell> {
        self.index(point).map(|index| &self.cells[index])
    }

    pub(crate) fn cell_mut(&mut self, point: Point) -> Option<&mut MapCell> {
        self.index(point).map(move |index| &mut self.cells[index])
    }

    /// Appends `id` to the cell at `point`. Returns `false` outside the map.
    pub fn place(&mut self, id: EntityId, point: Point) -> bool {
        match self.cell_mut(point) {
            Some(cell) => {
                cell.push(id);
                true
            }
            None => false,
        }
    }

    /// Removes `id` from the cell at `point`.
    pub fn remove(&mut self, id: EntityId, point: Point) -> bool {
        self.cell_mut(point).is_some_and(|cell| cell.remove(id))
    }

    /// Empties every cell and clears all flags.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// In-bounds points of the square window of `radius` around `center`,
    /// row-major.
    pub fn window(&self, center: Point, radius: u32) -> impl Iterator<Item = Point> + '_ {
        let radius = i64::from(radius);
        let x0 = (i64::from(center.x) - radius).max(0);
        let x1 = (i64::from(center.x) + radius).min(i64::from(self.width) - 1);
        let y0 = (i64::from(center.y) - radius).max(0);
        let y1 = (i64::from(center.y) + radius).min(i64::from(self.height) - 1);
        // an empty column range must also empty the row range
        let y1 = if x0 > x1 { y0 - 1 } else { y1 };

        (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| Point::new(x as i32, y as i32)))
    }

    /// Number of cells holding at least one entity.
    pub fn occupied_cells(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_empty()).count()
    }
}
