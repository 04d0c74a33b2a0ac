//! Noise-free signal propagation math.
//!
//! A simplified log-distance path-loss model: received strength falls off
//! with `10·n·log10(d)` and loses a fixed number of dB for every obstructed
//! cell the straight beacon→cell line crosses. The noisy simulator in the
//! engine crate layers Gaussian noise on top of [`ideal_strength`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{line_cells, GridPos};
use crate::grid::VenueGrid;

/// Radio propagation constants. Defaults match the reference venue tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadioParams {
    /// Strength right at the transmitter, dBm.
    pub reference_dbm: f64,
    /// Path-loss exponent `n` (2.0 free space, higher indoors).
    pub path_loss_exponent: f64,
    /// dB lost per obstructed cell on the line of sight.
    pub obstacle_attenuation_db: f64,
    /// Standard deviation of the Gaussian measurement noise, dB.
    pub noise_std_dev_db: f64,
    /// Floor below which a receiver reports nothing useful, dBm.
    pub min_detectable_dbm: f64,
}

impl Default for RadioParams {
    fn default() -> Self {
        Self {
            reference_dbm: -30.0,
            path_loss_exponent: 2.8,
            obstacle_attenuation_db: 4.0,
            noise_std_dev_db: 0.2,
            min_detectable_dbm: -95.0,
        }
    }
}

/// An ordered vector of signal strengths, one per beacon, indexed exactly
/// like `VenueGrid::beacons`. Samples are only comparable when produced
/// against the same venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSample(Vec<f64>);

/// Two samples of different lengths were compared — an integration error,
/// always surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionMismatch {
    pub expected: usize,
    pub found: usize,
}

impl fmt::Display for DimensionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "signal vector length mismatch: expected {}, found {}",
            self.expected, self.found
        )
    }
}

impl std::error::Error for DimensionMismatch {}

impl SignalSample {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Euclidean distance in signal-strength space.
    pub fn distance(&self, other: &SignalSample) -> Result<f64, DimensionMismatch> {
        if self.0.len() != other.0.len() {
            return Err(DimensionMismatch {
                expected: self.0.len(),
                found: other.0.len(),
            });
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Ok(sum.sqrt())
    }
}

/// Free-space path loss in dB at `distance_m` meters.
pub fn path_loss_db(distance_m: f64, exponent: f64) -> f64 {
    10.0 * exponent * distance_m.log10()
}

/// Count cells on the beacon→target line that attenuate the signal.
/// Endpoints are excluded; the rasterized set is direction-independent.
pub fn count_obstructions(venue: &VenueGrid, a: GridPos, b: GridPos) -> usize {
    let line = line_cells(a, b);
    if line.len() <= 2 {
        return 0;
    }
    line[1..line.len() - 1]
        .iter()
        .filter(|&&p| venue.classify(p).is_some_and(|k| k.obstructs_signal()))
        .count()
}

/// Expected (noise-free) received strength at `cell` from `beacon`.
///
/// Within half a cell of the beacon the log term degenerates, so the
/// reference strength is returned outright. Otherwise the result is clamped
/// below at the detection floor.
pub fn ideal_strength(
    venue: &VenueGrid,
    params: &RadioParams,
    beacon: GridPos,
    cell: GridPos,
) -> f64 {
    let distance_m = beacon.distance_cells(cell) * venue.cell_size_m();
    if distance_m < venue.cell_size_m() / 2.0 {
        return params.reference_dbm;
    }
    // Sub-meter distances make the log term negative; the loss floors at
    // zero so no cell ever reads above the reference.
    let loss = path_loss_db(distance_m, params.path_loss_exponent).max(0.0);
    let attenuation =
        count_obstructions(venue, beacon, cell) as f64 * params.obstacle_attenuation_db;
    (params.reference_dbm - loss - attenuation).max(params.min_detectable_dbm)
}
