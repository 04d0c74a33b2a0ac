//! Approachable positions — walkable cells adjacent to a target's footprint.
//!
//! Items and stalls are never walkable, so routing aims at one of the
//! pathway cells bordering them. `canonical_approach` picks a single
//! representative: filtered by an optional side hint, then nearest the
//! candidate centroid (or the footprint centroid without a hint), ties
//! broken by smallest row then smallest column.

use serde::{Deserialize, Serialize};

use crate::geometry::GridPos;
use crate::grid::{CellKind, TargetRef, VenueGrid};

/// The four cardinal sides of a footprint, named for the direction stepped
/// from a footprint cell to its neighbor (north = decreasing row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    North,
    South,
    West,
    East,
}

fn neighbor(venue: &VenueGrid, pos: GridPos, side: Side) -> Option<GridPos> {
    let (row, col) = match side {
        Side::North => (pos.row.checked_sub(1)?, pos.col),
        Side::South => (pos.row + 1, pos.col),
        Side::West => (pos.row, pos.col.checked_sub(1)?),
        Side::East => (pos.row, pos.col + 1),
    };
    let p = GridPos::new(row, col);
    (row < venue.rows() && col < venue.cols()).then_some(p)
}

/// Collect `(cell, side)` candidates around a footprint. Only plain
/// `Pathway` neighbors qualify — beacon cells are kept clear.
fn candidates(venue: &VenueGrid, target: TargetRef) -> Vec<(GridPos, Side)> {
    let mut found = Vec::new();
    for cell in venue.target_cells(target) {
        for side in [Side::North, Side::South, Side::West, Side::East] {
            if let Some(p) = neighbor(venue, cell, side) {
                if venue.classify(p) == Some(CellKind::Pathway) && !found.contains(&(p, side)) {
                    found.push((p, side));
                }
            }
        }
    }
    found
}

/// All distinct approachable cells for a target, sorted by row then column.
pub fn approachable_cells(venue: &VenueGrid, target: TargetRef) -> Vec<GridPos> {
    let mut cells: Vec<GridPos> = candidates(venue, target).into_iter().map(|(p, _)| p).collect();
    cells.sort();
    cells.dedup();
    cells
}

/// The canonical approach cell for a target, honoring an optional side hint.
///
/// Returns `None` when the footprint is empty or fully enclosed.
pub fn canonical_approach(
    venue: &VenueGrid,
    target: TargetRef,
    preferred: Option<Side>,
) -> Option<GridPos> {
    let all = candidates(venue, target);
    if all.is_empty() {
        return None;
    }

    // Side hint filters first; an empty filtered set falls back to all
    // candidates with the footprint centroid as reference.
    if let Some(side) = preferred {
        let filtered: Vec<GridPos> = all
            .iter()
            .filter(|(_, s)| *s == side)
            .map(|(p, _)| *p)
            .collect();
        if !filtered.is_empty() {
            let n = filtered.len() as f64;
            let cr = filtered.iter().map(|p| p.row as f64).sum::<f64>() / n;
            let cc = filtered.iter().map(|p| p.col as f64).sum::<f64>() / n;
            return nearest(&filtered, cr, cc);
        }
    }

    let (cr, cc) = venue.target_centroid(target)?;
    let cells: Vec<GridPos> = all.into_iter().map(|(p, _)| p).collect();
    nearest(&cells, cr, cc)
}

fn nearest(cells: &[GridPos], row: f64, col: f64) -> Option<GridPos> {
    cells
        .iter()
        .copied()
        .min_by(|a, b| {
            let da = sq_dist(*a, row, col);
            let db = sq_dist(*b, row, col);
            da.partial_cmp(&db)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        })
}

fn sq_dist(p: GridPos, row: f64, col: f64) -> f64 {
    let dr = p.row as f64 - row;
    let dc = p.col as f64 - col;
    dr * dr + dc * dc
}
