//! Weighted k-nearest-neighbor location estimation.
//!
//! Matches an observed signal vector against the fingerprint table and
//! averages the grid coordinates of the `k` closest entries, optionally
//! weighting each neighbor by inverse signal distance. The result is a
//! fractional grid coordinate — snapping to a cell is the caller's call.

use std::cmp::Ordering;
use std::fmt;

use crate::geometry::{FracPos, GridPos};
use crate::signal::{DimensionMismatch, SignalSample};

/// Guards the inverse-distance weight against division by zero.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// A position estimate. `degraded` is set when the weighted path fell back
/// to the unweighted mean because every neighbor weight vanished — a
/// reportable condition, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub pos: FracPos,
    pub degraded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EstimateError {
    /// The fingerprint table has no entries — nothing to match against.
    EmptyFingerprint,
    /// Observed vector and a stored fingerprint differ in length.
    DimensionMismatch(DimensionMismatch),
    /// `k` must be at least 1.
    InvalidK { k: usize },
}

impl fmt::Display for EstimateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimateError::EmptyFingerprint => write!(f, "fingerprint table is empty"),
            EstimateError::DimensionMismatch(e) => e.fmt(f),
            EstimateError::InvalidK { k } => write!(f, "invalid neighbor count k={}", k),
        }
    }
}

impl std::error::Error for EstimateError {}

impl From<DimensionMismatch> for EstimateError {
    fn from(e: DimensionMismatch) -> Self {
        EstimateError::DimensionMismatch(e)
    }
}

/// Estimate a position from `observed` against the fingerprint `entries`.
///
/// `k` larger than the table is silently clamped. The sort is stable, so
/// equal distances keep table order — for a fixed table the result is
/// exactly reproducible.
pub fn estimate(
    observed: &SignalSample,
    entries: &[(GridPos, SignalSample)],
    k: usize,
    weighted: bool,
) -> Result<Estimate, EstimateError> {
    if k == 0 {
        return Err(EstimateError::InvalidK { k });
    }
    if entries.is_empty() {
        return Err(EstimateError::EmptyFingerprint);
    }

    let mut ranked: Vec<(GridPos, f64)> = Vec::with_capacity(entries.len());
    for (pos, sample) in entries {
        ranked.push((*pos, observed.distance(sample)?));
    }
    ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let nearest = &ranked[..k.min(ranked.len())];

    if !weighted {
        return Ok(Estimate {
            pos: coordinate_mean(nearest),
            degraded: false,
        });
    }

    let mut sum_row = 0.0;
    let mut sum_col = 0.0;
    let mut sum_w = 0.0;
    for (pos, dist) in nearest {
        let w = 1.0 / (dist + WEIGHT_EPSILON);
        sum_row += pos.row as f64 * w;
        sum_col += pos.col as f64 * w;
        sum_w += w;
    }

    if sum_w == 0.0 {
        // All weights vanished numerically. Fall back to the plain mean of
        // the same neighbors; the caller logs this as degraded mode.
        return Ok(Estimate {
            pos: coordinate_mean(nearest),
            degraded: true,
        });
    }

    Ok(Estimate {
        pos: FracPos::new(sum_row / sum_w, sum_col / sum_w),
        degraded: false,
    })
}

fn coordinate_mean(neighbors: &[(GridPos, f64)]) -> FracPos {
    let n = neighbors.len() as f64;
    let row = neighbors.iter().map(|(p, _)| p.row as f64).sum::<f64>() / n;
    let col = neighbors.iter().map(|(p, _)| p.col as f64).sum::<f64>() / n;
    FracPos::new(row, col)
}
