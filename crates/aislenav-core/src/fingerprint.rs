//! Precomputed signal fingerprints for every walkable cell.
//!
//! Built once after the venue is finalized: a row-major sweep over
//! walkable cells, one simulated sample each. The fixed entry order is
//! load-bearing — KNN breaks distance ties by table order, and seeded
//! rebuilds must consume noise draws in the same sequence.

use serde::{Deserialize, Serialize};

use aislenav_logic::geometry::GridPos;
use aislenav_logic::grid::VenueGrid;
use aislenav_logic::signal::SignalSample;

use crate::simulator::SignalSimulator;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintStore {
    entries: Vec<(GridPos, SignalSample)>,
    beacon_count: usize,
}

impl FingerprintStore {
    /// Sweep the venue and simulate one sample per walkable cell. Costs
    /// O(walkable × beacons) simulate calls; there is no incremental
    /// update — any venue change means a full rebuild.
    pub fn build(venue: &VenueGrid, simulator: &mut SignalSimulator) -> Self {
        let positions: Vec<GridPos> = venue.walkable_positions().collect();
        let entries = positions
            .into_iter()
            .map(|pos| (pos, simulator.observe(venue, pos)))
            .collect();
        Self {
            entries,
            beacon_count: venue.beacons().len(),
        }
    }

    /// Exact-key lookup; cells between fingerprints are not interpolated.
    pub fn get(&self, pos: GridPos) -> Option<&SignalSample> {
        self.entries
            .iter()
            .find(|(p, _)| *p == pos)
            .map(|(_, sample)| sample)
    }

    /// All entries in build order, for the KNN estimator.
    pub fn entries(&self) -> &[(GridPos, SignalSample)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn beacon_count(&self) -> usize {
        self.beacon_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aislenav_logic::grid::Rect;
    use aislenav_logic::signal::RadioParams;

    fn small_venue() -> VenueGrid {
        let mut v = VenueGrid::new(6, 6, 0.5);
        v.place_obstacle(Rect::new(2, 2, 2, 2)).unwrap();
        v.place_beacon(GridPos::new(0, 0)).unwrap();
        v.place_beacon(GridPos::new(5, 5)).unwrap();
        v
    }

    #[test]
    fn test_covers_exactly_walkable_cells() {
        let v = small_venue();
        let mut sim = SignalSimulator::new(RadioParams::default(), 1);
        let store = FingerprintStore::build(&v, &mut sim);

        // 36 cells minus the 4-cell obstacle; beacon cells included.
        assert_eq!(store.len(), 32);
        assert!(store.get(GridPos::new(0, 0)).is_some());
        assert!(store.get(GridPos::new(2, 2)).is_none());
        assert!(store.entries().iter().all(|(p, _)| v.is_walkable(*p)));
    }

    #[test]
    fn test_sample_width_matches_beacons() {
        let v = small_venue();
        let mut sim = SignalSimulator::new(RadioParams::default(), 1);
        let store = FingerprintStore::build(&v, &mut sim);
        assert_eq!(store.beacon_count(), 2);
        assert!(store.entries().iter().all(|(_, s)| s.len() == 2));
    }

    #[test]
    fn test_build_order_row_major() {
        let v = small_venue();
        let mut sim = SignalSimulator::new(RadioParams::default(), 1);
        let store = FingerprintStore::build(&v, &mut sim);
        let positions: Vec<GridPos> = store.entries().iter().map(|(p, _)| *p).collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_seeded_rebuild_is_identical() {
        let v = small_venue();
        let noisy = RadioParams {
            noise_std_dev_db: 2.5,
            ..RadioParams::default()
        };
        let mut sim_a = SignalSimulator::new(noisy, 31);
        let mut sim_b = SignalSimulator::new(noisy, 31);
        let a = FingerprintStore::build(&v, &mut sim_a);
        let b = FingerprintStore::build(&v, &mut sim_b);
        assert_eq!(a, b);
    }
}
