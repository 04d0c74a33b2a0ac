//! Venue occupancy grid — placement rules, classification, name resolution.
//!
//! The grid is the factual ground truth of the venue. Every cell carries
//! exactly one [`CellKind`], and that classification is the sole authority
//! for walkability and signal-attenuation queries. Placement operations
//! validate fully before mutating: a rejected placement leaves the grid
//! byte-for-byte in its prior state.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::GridPos;
use crate::ids::{item_ids, stall_ids, ItemId, StallId, TargetKind};

/// Classification of a single grid cell. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    /// Open floor, traversable.
    Pathway,
    /// Generic obstruction (wall, pillar, shelf backing).
    Obstacle,
    /// A pathway cell hosting a radio beacon. Still traversable.
    Beacon,
    /// Part of a named stall's footprint.
    Stall(StallId),
    /// Part of a named item's display area (always atop a stall/obstacle).
    Item(ItemId),
}

impl CellKind {
    /// Traversable by the cart and eligible for a fingerprint.
    pub fn is_walkable(self) -> bool {
        matches!(self, CellKind::Pathway | CellKind::Beacon)
    }

    /// Whether a cell attenuates a radio line crossing it.
    pub fn obstructs_signal(self) -> bool {
        !self.is_walkable()
    }
}

/// A placement rectangle: top-left corner plus extent, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Rect {
    pub fn new(row: usize, col: usize, rows: usize, cols: usize) -> Self {
        Self {
            row,
            col,
            rows,
            cols,
        }
    }

    /// Row-major iterator over the covered cells.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        let (row, col, cols) = (self.row, self.col, self.cols);
        (0..self.rows).flat_map(move |dr| (0..cols).map(move |dc| GridPos::new(row + dr, col + dc)))
    }

    pub fn contains(&self, pos: GridPos) -> bool {
        pos.row >= self.row
            && pos.row < self.row + self.rows
            && pos.col >= self.col
            && pos.col < self.col + self.cols
    }

    /// Fractional center of the rectangle.
    pub fn centroid(&self) -> (f64, f64) {
        (
            self.row as f64 + self.rows as f64 / 2.0,
            self.col as f64 + self.cols as f64 / 2.0,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{}) size {}×{}",
            self.row, self.col, self.rows, self.cols
        )
    }
}

/// Why a placement was rejected. The grid is unchanged in every case.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacementError {
    /// Rectangle extends past the grid edge (or has zero extent).
    OutOfBounds { rect: Rect, rows: usize, cols: usize },
    /// A covered cell already carries an incompatible classification.
    Occupied { rect: Rect, found: CellKind },
    /// Items may only sit on stall or obstacle cells, never bare pathway.
    InvalidItemBase { rect: Rect, found: CellKind },
    /// Item was pinned to a stall but a covered cell belongs elsewhere.
    WrongStall {
        rect: Rect,
        expected: StallId,
        found: CellKind,
    },
    /// Beacons go on pathway cells only.
    NotPathway { pos: GridPos, found: CellKind },
    /// The reserved stall id band is used up.
    StallIdsExhausted,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::OutOfBounds { rect, rows, cols } => {
                write!(f, "rectangle {} out of bounds for {}×{} grid", rect, rows, cols)
            }
            PlacementError::Occupied { rect, found } => {
                write!(f, "rectangle {} overlaps existing {:?}", rect, found)
            }
            PlacementError::InvalidItemBase { rect, found } => {
                write!(
                    f,
                    "item rectangle {} covers {:?}; items need stall or obstacle cells",
                    rect, found
                )
            }
            PlacementError::WrongStall {
                rect,
                expected,
                found,
            } => {
                write!(
                    f,
                    "item rectangle {} pinned to stall {} but covers {:?}",
                    rect, expected, found
                )
            }
            PlacementError::NotPathway { pos, found } => {
                write!(
                    f,
                    "beacon cell ({},{}) is {:?}, not a pathway",
                    pos.row, pos.col, found
                )
            }
            PlacementError::StallIdsExhausted => write!(f, "reserved stall id range exhausted"),
        }
    }
}

impl std::error::Error for PlacementError {}

/// A resolved navigation target — item or stall, by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRef {
    Item(ItemId),
    Stall(StallId),
}

impl TargetRef {
    pub fn kind(self) -> TargetKind {
        match self {
            TargetRef::Item(_) => TargetKind::Item,
            TargetRef::Stall(_) => TargetKind::Stall,
        }
    }
}

/// Stall registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StallInfo {
    pub name: String,
    pub bounds: Rect,
}

/// Item registry entry. One item may cover several disjoint areas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInfo {
    pub name: String,
}

/// The venue: a `rows × cols` grid of classified cells plus the named
/// regions placed on it. Built once by a sequence of placements, then
/// treated as immutable by the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueGrid {
    rows: usize,
    cols: usize,
    cell_size_m: f64,
    cells: Vec<CellKind>,
    stalls: HashMap<StallId, StallInfo>,
    items: HashMap<ItemId, ItemInfo>,
    /// ItemId → covered cells, in placement order.
    item_cells: HashMap<ItemId, Vec<GridPos>>,
    /// Beacon positions in placement order. The order defines the index of
    /// each beacon within every signal vector.
    beacons: Vec<GridPos>,
    /// Lowercase name → id, maintained at placement time.
    stall_index: HashMap<String, StallId>,
    item_index: HashMap<String, ItemId>,
    next_stall_id: StallId,
    next_item_id: ItemId,
}

impl VenueGrid {
    /// An all-pathway grid of the given dimensions.
    pub fn new(rows: usize, cols: usize, cell_size_m: f64) -> Self {
        Self {
            rows,
            cols,
            cell_size_m,
            cells: vec![CellKind::Pathway; rows * cols],
            stalls: HashMap::new(),
            items: HashMap::new(),
            item_cells: HashMap::new(),
            beacons: Vec::new(),
            stall_index: HashMap::new(),
            item_index: HashMap::new(),
            next_stall_id: stall_ids::FIRST,
            next_item_id: item_ids::FIRST,
        }
    }

    /// Construct from physical dimensions: `width_m × height_m` floor at
    /// `cell_size_m` meters per cell.
    pub fn from_dimensions(width_m: f64, height_m: f64, cell_size_m: f64) -> Self {
        let cols = (width_m / cell_size_m) as usize;
        let rows = (height_m / cell_size_m) as usize;
        Self::new(rows, cols, cell_size_m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size_m(&self) -> f64 {
        self.cell_size_m
    }

    pub fn beacons(&self) -> &[GridPos] {
        &self.beacons
    }

    pub fn stall(&self, id: StallId) -> Option<&StallInfo> {
        self.stalls.get(&id)
    }

    pub fn item(&self, id: ItemId) -> Option<&ItemInfo> {
        self.items.get(&id)
    }

    fn index_of(&self, pos: GridPos) -> Option<usize> {
        (pos.row < self.rows && pos.col < self.cols).then(|| pos.row * self.cols + pos.col)
    }

    /// O(1) classification lookup. `None` outside the grid.
    pub fn classify(&self, pos: GridPos) -> Option<CellKind> {
        self.index_of(pos).map(|i| self.cells[i])
    }

    /// True iff the cell is `Pathway` or `Beacon`.
    pub fn is_walkable(&self, pos: GridPos) -> bool {
        self.classify(pos).is_some_and(CellKind::is_walkable)
    }

    /// Row-major iterator over all walkable cells. The fixed order is what
    /// makes fingerprint builds and KNN tie-breaks reproducible.
    pub fn walkable_positions(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.rows)
            .flat_map(move |r| (0..self.cols).map(move |c| GridPos::new(r, c)))
            .filter(|&p| self.is_walkable(p))
    }

    fn check_bounds(&self, rect: Rect) -> Result<(), PlacementError> {
        let fits = rect.rows > 0
            && rect.cols > 0
            && rect.row + rect.rows <= self.rows
            && rect.col + rect.cols <= self.cols;
        if fits {
            Ok(())
        } else {
            Err(PlacementError::OutOfBounds {
                rect,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    fn fill(&mut self, rect: Rect, kind: CellKind) {
        for pos in rect.cells() {
            let i = pos.row * self.cols + pos.col;
            self.cells[i] = kind;
        }
    }

    /// Place an obstacle rectangle over pathway cells.
    pub fn place_obstacle(&mut self, rect: Rect) -> Result<(), PlacementError> {
        self.check_bounds(rect)?;
        for pos in rect.cells() {
            let found = self.cells[pos.row * self.cols + pos.col];
            if found != CellKind::Pathway {
                return Err(PlacementError::Occupied { rect, found });
            }
        }
        self.fill(rect, CellKind::Obstacle);
        Ok(())
    }

    /// Place a named stall rectangle over pathway cells.
    pub fn place_stall(&mut self, rect: Rect, name: &str) -> Result<StallId, PlacementError> {
        self.check_bounds(rect)?;
        if self.next_stall_id > stall_ids::LAST {
            return Err(PlacementError::StallIdsExhausted);
        }
        for pos in rect.cells() {
            let found = self.cells[pos.row * self.cols + pos.col];
            if found != CellKind::Pathway {
                return Err(PlacementError::Occupied { rect, found });
            }
        }

        let id = self.next_stall_id;
        self.next_stall_id += 1;
        self.fill(rect, CellKind::Stall(id));
        self.stalls.insert(
            id,
            StallInfo {
                name: name.to_string(),
                bounds: rect,
            },
        );
        self.stall_index.insert(name.to_lowercase(), id);
        Ok(id)
    }

    /// Place a named item rectangle atop stall or obstacle cells.
    ///
    /// With `stall` given, every covered cell must belong to that stall.
    /// Re-placing a known name extends the existing item rather than
    /// allocating a new id.
    pub fn place_item(
        &mut self,
        rect: Rect,
        name: &str,
        stall: Option<StallId>,
    ) -> Result<ItemId, PlacementError> {
        self.check_bounds(rect)?;
        for pos in rect.cells() {
            let found = self.cells[pos.row * self.cols + pos.col];
            match (found, stall) {
                (CellKind::Stall(sid), Some(expected)) if sid != expected => {
                    return Err(PlacementError::WrongStall {
                        rect,
                        expected,
                        found,
                    });
                }
                (CellKind::Stall(_), _) | (CellKind::Obstacle, None) => {}
                (CellKind::Obstacle, Some(expected)) => {
                    return Err(PlacementError::WrongStall {
                        rect,
                        expected,
                        found,
                    });
                }
                _ => return Err(PlacementError::InvalidItemBase { rect, found }),
            }
        }

        let id = match self.item_index.get(&name.to_lowercase()) {
            Some(&id) => id,
            None => {
                let id = self.next_item_id;
                self.next_item_id += 1;
                self.items.insert(
                    id,
                    ItemInfo {
                        name: name.to_string(),
                    },
                );
                self.item_index.insert(name.to_lowercase(), id);
                id
            }
        };
        self.fill(rect, CellKind::Item(id));
        self.item_cells.entry(id).or_default().extend(rect.cells());
        Ok(id)
    }

    /// Place a beacon on a pathway cell. Returns the beacon's index within
    /// every signal vector.
    pub fn place_beacon(&mut self, pos: GridPos) -> Result<usize, PlacementError> {
        let rect = Rect::new(pos.row, pos.col, 1, 1);
        self.check_bounds(rect)?;
        let found = self.cells[pos.row * self.cols + pos.col];
        if found != CellKind::Pathway {
            return Err(PlacementError::NotPathway { pos, found });
        }
        self.cells[pos.row * self.cols + pos.col] = CellKind::Beacon;
        self.beacons.push(pos);
        Ok(self.beacons.len() - 1)
    }

    /// Resolve a spoken/typed name, case-insensitively. Items win over
    /// stalls when both carry the same name.
    pub fn find_target(&self, name: &str) -> Option<TargetRef> {
        let key = name.to_lowercase();
        if let Some(&id) = self.item_index.get(&key) {
            return Some(TargetRef::Item(id));
        }
        self.stall_index.get(&key).map(|&id| TargetRef::Stall(id))
    }

    /// Case-insensitive item lookup.
    pub fn find_item(&self, name: &str) -> Option<ItemId> {
        self.item_index.get(&name.to_lowercase()).copied()
    }

    /// Case-insensitive stall lookup.
    pub fn find_stall(&self, name: &str) -> Option<StallId> {
        self.stall_index.get(&name.to_lowercase()).copied()
    }

    /// Display name of a resolved target.
    pub fn target_name(&self, target: TargetRef) -> Option<&str> {
        match target {
            TargetRef::Item(id) => self.items.get(&id).map(|i| i.name.as_str()),
            TargetRef::Stall(id) => self.stalls.get(&id).map(|s| s.name.as_str()),
        }
    }

    /// Footprint cells of a target. For stalls this is the full bounds
    /// rectangle — cells overwritten by items still belong to the stall's
    /// physical footprint.
    pub fn target_cells(&self, target: TargetRef) -> Vec<GridPos> {
        match target {
            TargetRef::Item(id) => self.item_cells.get(&id).cloned().unwrap_or_default(),
            TargetRef::Stall(id) => self
                .stalls
                .get(&id)
                .map(|s| s.bounds.cells().collect())
                .unwrap_or_default(),
        }
    }

    /// Footprint bounds used for centroid computation. Items use the
    /// bounding box of their covered cells.
    pub fn target_centroid(&self, target: TargetRef) -> Option<(f64, f64)> {
        let cells = self.target_cells(target);
        if cells.is_empty() {
            return None;
        }
        let n = cells.len() as f64;
        let row = cells.iter().map(|p| p.row as f64).sum::<f64>() / n;
        let col = cells.iter().map(|p| p.col as f64).sum::<f64>() / n;
        Some((row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue_10x10() -> VenueGrid {
        VenueGrid::new(10, 10, 0.5)
    }

    #[test]
    fn test_new_grid_all_pathway() {
        let v = venue_10x10();
        assert_eq!(v.classify(GridPos::new(0, 0)), Some(CellKind::Pathway));
        assert_eq!(v.classify(GridPos::new(9, 9)), Some(CellKind::Pathway));
        assert_eq!(v.classify(GridPos::new(10, 0)), None);
        assert_eq!(v.walkable_positions().count(), 100);
    }

    #[test]
    fn test_from_dimensions() {
        let v = VenueGrid::from_dimensions(50.0, 30.0, 0.5);
        assert_eq!(v.cols(), 100);
        assert_eq!(v.rows(), 60);
    }

    #[test]
    fn test_obstacle_placement_and_classify() {
        let mut v = venue_10x10();
        v.place_obstacle(Rect::new(2, 3, 2, 4)).unwrap();
        assert_eq!(v.classify(GridPos::new(2, 3)), Some(CellKind::Obstacle));
        assert_eq!(v.classify(GridPos::new(3, 6)), Some(CellKind::Obstacle));
        assert_eq!(v.classify(GridPos::new(4, 3)), Some(CellKind::Pathway));
        assert!(!v.is_walkable(GridPos::new(2, 3)));
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut v = venue_10x10();
        let err = v.place_obstacle(Rect::new(8, 8, 4, 4)).unwrap_err();
        assert!(matches!(err, PlacementError::OutOfBounds { .. }));
        // Zero extent is also out of bounds.
        assert!(v.place_obstacle(Rect::new(1, 1, 0, 3)).is_err());
    }

    #[test]
    fn test_stall_then_item_then_overlap_rejected() {
        // Stall, item atop it, then an overlapping stall fails and leaves
        // everything untouched.
        let mut v = venue_10x10();
        let dairy = v.place_stall(Rect::new(0, 0, 3, 3), "Dairy").unwrap();
        let milk = v
            .place_item(Rect::new(0, 0, 2, 3), "Milk", Some(dairy))
            .unwrap();

        let before = v.clone();
        let err = v.place_stall(Rect::new(1, 1, 3, 3), "X").unwrap_err();
        assert!(matches!(err, PlacementError::Occupied { .. }));
        assert_eq!(v.cells, before.cells);
        assert_eq!(v.stalls.len(), 1);

        assert_eq!(v.classify(GridPos::new(0, 0)), Some(CellKind::Item(milk)));
        assert_eq!(v.classify(GridPos::new(2, 0)), Some(CellKind::Stall(dairy)));
    }

    #[test]
    fn test_item_needs_stall_or_obstacle_base() {
        let mut v = venue_10x10();
        let err = v.place_item(Rect::new(5, 5, 1, 1), "Apples", None).unwrap_err();
        assert!(matches!(err, PlacementError::InvalidItemBase { .. }));

        v.place_obstacle(Rect::new(5, 5, 1, 2)).unwrap();
        assert!(v.place_item(Rect::new(5, 5, 1, 2), "Apples", None).is_ok());
    }

    #[test]
    fn test_item_pinned_to_wrong_stall() {
        let mut v = venue_10x10();
        let a = v.place_stall(Rect::new(0, 0, 2, 2), "A").unwrap();
        let b = v.place_stall(Rect::new(4, 4, 2, 2), "B").unwrap();
        assert_ne!(a, b);
        let err = v
            .place_item(Rect::new(4, 4, 1, 1), "Bread", Some(a))
            .unwrap_err();
        assert!(matches!(err, PlacementError::WrongStall { .. }));
    }

    #[test]
    fn test_item_id_reused_by_name() {
        let mut v = venue_10x10();
        v.place_obstacle(Rect::new(0, 0, 1, 4)).unwrap();
        let first = v.place_item(Rect::new(0, 0, 1, 2), "Rice", None).unwrap();
        let second = v.place_item(Rect::new(0, 2, 1, 2), "rice", None).unwrap();
        assert_eq!(first, second);
        assert_eq!(v.target_cells(TargetRef::Item(first)).len(), 4);
    }

    #[test]
    fn test_beacon_ordering_and_pathway_rule() {
        let mut v = venue_10x10();
        assert_eq!(v.place_beacon(GridPos::new(1, 1)).unwrap(), 0);
        assert_eq!(v.place_beacon(GridPos::new(8, 8)).unwrap(), 1);
        assert_eq!(
            v.beacons(),
            &[GridPos::new(1, 1), GridPos::new(8, 8)]
        );
        // A beacon cell stays walkable but rejects a second beacon.
        assert!(v.is_walkable(GridPos::new(1, 1)));
        assert!(matches!(
            v.place_beacon(GridPos::new(1, 1)),
            Err(PlacementError::NotPathway { .. })
        ));

        v.place_obstacle(Rect::new(4, 4, 1, 1)).unwrap();
        assert!(v.place_beacon(GridPos::new(4, 4)).is_err());
    }

    #[test]
    fn test_name_resolution_case_insensitive() {
        let mut v = venue_10x10();
        let stall = v.place_stall(Rect::new(0, 0, 2, 2), "Produce").unwrap();
        let item = v
            .place_item(Rect::new(0, 0, 1, 1), "Avocado", Some(stall))
            .unwrap();

        assert_eq!(v.find_target("PRODUCE"), Some(TargetRef::Stall(stall)));
        assert_eq!(v.find_target("avocado"), Some(TargetRef::Item(item)));
        assert_eq!(v.find_target("durian"), None);
    }

    #[test]
    fn test_item_shadows_stall_with_same_name() {
        let mut v = venue_10x10();
        let stall = v.place_stall(Rect::new(0, 0, 2, 2), "Bakery").unwrap();
        let item = v
            .place_item(Rect::new(0, 0, 1, 1), "Bakery", Some(stall))
            .unwrap();
        assert_eq!(v.find_target("bakery"), Some(TargetRef::Item(item)));
    }

    #[test]
    fn test_stall_id_exhaustion() {
        let mut v = VenueGrid::new(1, 200, 0.5);
        for i in 0..50usize {
            v.place_stall(Rect::new(0, i, 1, 1), &format!("S{}", i)).unwrap();
        }
        let err = v.place_stall(Rect::new(0, 60, 1, 1), "overflow").unwrap_err();
        assert_eq!(err, PlacementError::StallIdsExhausted);
    }

    #[test]
    fn test_walkable_positions_row_major() {
        let mut v = VenueGrid::new(2, 2, 1.0);
        v.place_obstacle(Rect::new(0, 1, 1, 1)).unwrap();
        let cells: Vec<_> = v.walkable_positions().collect();
        assert_eq!(
            cells,
            vec![GridPos::new(0, 0), GridPos::new(1, 0), GridPos::new(1, 1)]
        );
    }
}
