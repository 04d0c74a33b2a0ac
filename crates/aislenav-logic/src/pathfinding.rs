//! Four-directional shortest-path search over the walkability matrix.
//!
//! The venue grid collapses to a binary matrix (walkable / impassable,
//! uniform unit cost) and A* with a Manhattan heuristic runs on it. No
//! diagonals. Unwalkable endpoints and unreachable goals return `None` —
//! route failure is a value, never a panic.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::GridPos;
use crate::grid::VenueGrid;

/// Binary traversability snapshot of a venue.
#[derive(Debug, Clone)]
pub struct WalkabilityGrid {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl WalkabilityGrid {
    /// All-walkable grid, for synthetic layouts in tests and harnesses.
    pub fn open(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![true; rows * cols],
        }
    }

    pub fn from_venue(venue: &VenueGrid) -> Self {
        let (rows, cols) = (venue.rows(), venue.cols());
        let cells = (0..rows)
            .flat_map(|r| (0..cols).map(move |c| GridPos::new(r, c)))
            .map(|p| venue.is_walkable(p))
            .collect();
        Self { rows, cols, cells }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Mark a cell impassable.
    pub fn block(&mut self, pos: GridPos) {
        if pos.row < self.rows && pos.col < self.cols {
            self.cells[pos.row * self.cols + pos.col] = false;
        }
    }

    pub fn is_walkable(&self, pos: GridPos) -> bool {
        pos.row < self.rows && pos.col < self.cols && self.cells[pos.row * self.cols + pos.col]
    }

    fn index(&self, pos: GridPos) -> usize {
        pos.row * self.cols + pos.col
    }

    fn pos(&self, index: usize) -> GridPos {
        GridPos::new(index / self.cols, index % self.cols)
    }
}

/// Open-set entry. Ordered so the BinaryHeap pops the lowest f-score,
/// ties broken by g then index for a deterministic expansion.
#[derive(PartialEq, Eq)]
struct OpenNode {
    f: usize,
    g: usize,
    index: usize,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then(other.g.cmp(&self.g))
            .then(other.index.cmp(&self.index))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* from `start` to `goal`. The returned path includes both endpoints in
/// traversal order with no duplicate consecutive cells.
pub fn find_path(grid: &WalkabilityGrid, start: GridPos, goal: GridPos) -> Option<Vec<GridPos>> {
    if !grid.is_walkable(start) || !grid.is_walkable(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let size = grid.rows * grid.cols;
    let start_i = grid.index(start);
    let goal_i = grid.index(goal);

    let mut g_score = vec![usize::MAX; size];
    let mut came_from = vec![usize::MAX; size];
    let mut open = BinaryHeap::new();

    g_score[start_i] = 0;
    open.push(OpenNode {
        f: start.manhattan(goal),
        g: 0,
        index: start_i,
    });

    while let Some(node) = open.pop() {
        if node.index == goal_i {
            return Some(reconstruct(grid, &came_from, goal_i));
        }
        if node.g > g_score[node.index] {
            continue; // stale heap entry
        }

        let here = grid.pos(node.index);
        for next in neighbors(grid, here) {
            let next_i = grid.index(next);
            let tentative = node.g + 1;
            if tentative < g_score[next_i] {
                g_score[next_i] = tentative;
                came_from[next_i] = node.index;
                open.push(OpenNode {
                    f: tentative + next.manhattan(goal),
                    g: tentative,
                    index: next_i,
                });
            }
        }
    }

    None
}

/// Walkable four-neighbors in fixed N, S, W, E order.
fn neighbors(grid: &WalkabilityGrid, pos: GridPos) -> impl Iterator<Item = GridPos> + '_ {
    let north = pos.row.checked_sub(1).map(|r| GridPos::new(r, pos.col));
    let south = Some(GridPos::new(pos.row + 1, pos.col));
    let west = pos.col.checked_sub(1).map(|c| GridPos::new(pos.row, c));
    let east = Some(GridPos::new(pos.row, pos.col + 1));
    [north, south, west, east]
        .into_iter()
        .flatten()
        .filter(|&p| grid.is_walkable(p))
}

fn reconstruct(grid: &WalkabilityGrid, came_from: &[usize], goal: usize) -> Vec<GridPos> {
    let mut path = Vec::new();
    let mut current = goal;
    while current != usize::MAX {
        path.push(grid.pos(current));
        current = came_from[current];
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Rect;

    #[test]
    fn test_straight_corridor() {
        let grid = WalkabilityGrid::open(1, 6);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(0, 5)).unwrap();
        assert_eq!(path.len(), 6);
        assert_eq!(path[0], GridPos::new(0, 0));
        assert_eq!(path[5], GridPos::new(0, 5));
    }

    #[test]
    fn test_same_cell() {
        let grid = WalkabilityGrid::open(3, 3);
        let p = GridPos::new(1, 1);
        assert_eq!(find_path(&grid, p, p), Some(vec![p]));
    }

    #[test]
    fn test_shortest_length_is_manhattan_when_open() {
        let grid = WalkabilityGrid::open(8, 8);
        let start = GridPos::new(1, 2);
        let goal = GridPos::new(6, 7);
        let path = find_path(&grid, start, goal).unwrap();
        assert_eq!(path.len(), start.manhattan(goal) + 1);
    }

    #[test]
    fn test_detour_around_wall() {
        // Vertical wall with a gap at the bottom.
        let mut grid = WalkabilityGrid::open(5, 5);
        for r in 0..4 {
            grid.block(GridPos::new(r, 2));
        }
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(0, 4)).unwrap();
        assert!(path.contains(&GridPos::new(4, 2)));
        assert!(path.iter().all(|&p| grid.is_walkable(p)));
    }

    #[test]
    fn test_no_duplicate_consecutive_and_4_connected() {
        let mut grid = WalkabilityGrid::open(6, 6);
        grid.block(GridPos::new(2, 2));
        grid.block(GridPos::new(2, 3));
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(5, 5)).unwrap();
        for pair in path.windows(2) {
            assert_ne!(pair[0], pair[1]);
            assert_eq!(pair[0].manhattan(pair[1]), 1);
        }
    }

    #[test]
    fn test_unreachable_goal() {
        let mut grid = WalkabilityGrid::open(5, 5);
        // Wall off the right half completely.
        for r in 0..5 {
            grid.block(GridPos::new(r, 2));
        }
        assert_eq!(
            find_path(&grid, GridPos::new(0, 0), GridPos::new(0, 4)),
            None
        );
    }

    #[test]
    fn test_unwalkable_endpoints() {
        let mut grid = WalkabilityGrid::open(4, 4);
        grid.block(GridPos::new(0, 0));
        assert_eq!(
            find_path(&grid, GridPos::new(0, 0), GridPos::new(3, 3)),
            None
        );
        assert_eq!(
            find_path(&grid, GridPos::new(3, 3), GridPos::new(0, 0)),
            None
        );
        // Out of bounds is unwalkable, not a panic.
        assert_eq!(
            find_path(&grid, GridPos::new(0, 1), GridPos::new(9, 9)),
            None
        );
    }

    #[test]
    fn test_from_venue_walkability() {
        let mut v = VenueGrid::new(6, 6, 0.5);
        v.place_obstacle(Rect::new(0, 2, 5, 1)).unwrap();
        v.place_beacon(GridPos::new(5, 2)).unwrap();
        let grid = WalkabilityGrid::from_venue(&v);

        // Beacon cells stay traversable; the only path runs through one.
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(0, 5)).unwrap();
        assert!(path.contains(&GridPos::new(5, 2)));
    }

    #[test]
    fn test_path_never_enters_stall_or_item() {
        let mut v = VenueGrid::new(6, 6, 0.5);
        let stall = v.place_stall(Rect::new(1, 1, 4, 2), "Wall").unwrap();
        v.place_item(Rect::new(1, 1, 1, 2), "Jam", Some(stall)).unwrap();
        let grid = WalkabilityGrid::from_venue(&v);
        let path = find_path(&grid, GridPos::new(0, 0), GridPos::new(5, 5)).unwrap();
        for p in &path {
            assert!(v.is_walkable(*p), "path entered non-walkable {:?}", p);
        }
    }
}
