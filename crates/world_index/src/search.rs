//! # Point Search
//!
//! Finds free coordinates near a center for placement and item drops.
//!
//! Candidates are visited in a fixed, hand-written spiral: the 8 neighbours of
//! ring 1, then 16 cells of ring 2, 24 of ring 3 and 32 of ring 4. Inside each
//! ring the axis cells come first, then cells increasingly far off-axis, with
//! the corners last, so earlier candidates are never farther (in Euclidean
//! terms) than later ones of the same ring. That order is the tie-break for
//! both searches.
//!
//! - [`PointSearchEngine::valid_points`] returns the first unblocked candidates.
//! - [`PointSearchEngine::drop_points`] spreads drops over the least crowded
//!   candidates, counting occupants lazily and never rescanning a blocked one.

use crate::types::{MapId, Point};

/// Terrain collaborator: whether a coordinate is physically impassable.
pub trait BlockingOracle: Send + Sync {
    fn is_blocked(&self, map: MapId, point: Point) -> bool;
}

impl<F> BlockingOracle for F
where
    F: Fn(MapId, Point) -> bool + Send + Sync,
{
    fn is_blocked(&self, map: MapId, point: Point) -> bool {
        self(map, point)
    }
}

/// Terrain with nothing blocked.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenTerrain;

impl BlockingOracle for OpenTerrain {
    fn is_blocked(&self, _map: MapId, _point: Point) -> bool {
        false
    }
}

/// Outermost ring visited by the search.
pub const MAX_SEARCH_RING: u32 = 4;

/// Candidate offsets in search order: rings 1 to 4, 80 cells.
#[rustfmt::skip]
pub const SEARCH_OFFSETS: [(i8, i8); 80] = [
    // ring 1
    (0, -1), (1, 0), (0, 1), (-1, 0),
    (1, -1), (1, 1), (-1, 1), (-1, -1),
    // ring 2
    (0, -2), (2, 0), (0, 2), (-2, 0),
    (1, -2), (2, 1), (-1, 2), (-2, -1), (-1, -2), (2, -1), (1, 2), (-2, 1),
    (2, -2), (2, 2), (-2, 2), (-2, -2),
    // ring 3
    (0, -3), (3, 0), (0, 3), (-3, 0),
    (1, -3), (3, 1), (-1, 3), (-3, -1), (-1, -3), (3, -1), (1, 3), (-3, 1),
    (2, -3), (3, 2), (-2, 3), (-3, -2), (-2, -3), (3, -2), (2, 3), (-3, 2),
    (3, -3), (3, 3), (-3, 3), (-3, -3),
    // ring 4
    (0, -4), (4, 0), (0, 4), (-4, 0),
    (1, -4), (4, 1), (-1, 4), (-4, -1), (-1, -4), (4, -1), (1, 4), (-4, 1),
    (2, -4), (4, 2), (-2, 4), (-4, -2), (-2, -4), (4, -2), (2, 4), (-4, 2),
    (3, -4), (4, 3), (-3, 4), (-4, -3), (-3, -4), (4, -3), (3, 4), (-4, 3),
    (4, -4), (4, 4), (-4, 4), (-4, -4),
];

/// Candidate `index` around `center`; `None` past the edge of the `i32` plane.
fn candidate(center: Point, index: usize) -> Option<Point> {
    let (dx, dy) = SEARCH_OFFSETS[index];
    center.checked_offset(i32::from(dx), i32::from(dy))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Unscanned,
    Blocked,
    Occupied(Point, usize),
}

/// Ring-order point search.
#[derive(Debug, Clone, Copy)]
pub struct PointSearchEngine {
    drop_stack_limit: usize,
}

impl PointSearchEngine {
    /// `drop_stack_limit` is the occupancy at which a drop candidate is full.
    pub fn new(drop_stack_limit: usize) -> Self {
        Self { drop_stack_limit }
    }

    pub fn drop_stack_limit(&self) -> usize {
        self.drop_stack_limit
    }

    /// Up to `max` candidates for which `is_open` holds, nearest ring first.
    pub fn valid_points<F>(&self, center: Point, max: usize, mut is_open: F) -> Vec<Point>
    where
        F: FnMut(Point) -> bool,
    {
        (0..SEARCH_OFFSETS.len())
            .filter_map(|index| candidate(center, index))
            .filter(|point| is_open(*point))
            .take(max)
            .collect()
    }

    /// Up to `max` spread-out drop coordinates.
    ///
    /// `occupancy` returns `None` for a blocked coordinate, otherwise the
    /// number of occupants already there; it is called at most once per
    /// candidate. Every output slot takes the least occupied candidate below
    /// the stack limit (earliest in ring order on ties) and then counts one
    /// more occupant there, so repeated slots fan out over empty cells before
    /// stacking. The search stops early once no candidate qualifies.
    pub fn drop_points<F>(&self, center: Point, max: usize, mut occupancy: F) -> Vec<Point>
    where
        F: FnMut(Point) -> Option<usize>,
    {
        let mut candidates = [Candidate::Unscanned; SEARCH_OFFSETS.len()];
        let mut points = Vec::with_capacity(max.min(SEARCH_OFFSETS.len()));

        while points.len() < max {
            let mut best: Option<(usize, Point, usize)> = None;

            for (index, state) in candidates.iter_mut().enumerate() {
                let (point, count) = match *state {
                    Candidate::Blocked => continue,
                    Candidate::Occupied(point, count) => (point, count),
                    Candidate::Unscanned => {
                        let scanned = candidate(center, index)
                            .and_then(|point| occupancy(point).map(|count| (point, count)));
                        match scanned {
                            Some((point, count)) => {
                                *state = Candidate::Occupied(point, count);
                                (point, count)
                            }
                            None => {
                                *state = Candidate::Blocked;
                                continue;
                            }
                        }
                    }
                };

                if count >= self.drop_stack_limit {
                    continue;
                }
                if best.map_or(true, |(_, _, lowest)| count < lowest) {
                    best = Some((index, point, count));
                    if count == 0 {
                        // nothing can beat an empty cell earlier in ring order
                        break;
                    }
                }
            }

            let Some((index, point, count)) = best else {
                break;
            };
            candidates[index] = Candidate::Occupied(point, count + 1);
            points.push(point);
        }

        points
    }
}
