//! Noisy received-signal-strength simulation.
//!
//! Wraps the noise-free propagation math from `aislenav-logic::signal`
//! with Gaussian measurement noise. This is the only source of randomness
//! in the simulation: every (beacon, cell) strength and every observed
//! cart reading flows through [`SignalSimulator::simulate`].

use aislenav_logic::geometry::GridPos;
use aislenav_logic::grid::VenueGrid;
use aislenav_logic::signal::{count_obstructions, path_loss_db, RadioParams, SignalSample};

use crate::noise::NoiseGenerator;

#[derive(Debug)]
pub struct SignalSimulator {
    params: RadioParams,
    noise: NoiseGenerator,
    seed: u64,
}

impl SignalSimulator {
    /// Seed 0 means non-deterministic; any other value reproduces exactly.
    pub fn new(params: RadioParams, seed: u64) -> Self {
        Self {
            params,
            noise: NoiseGenerator::new(seed),
            seed,
        }
    }

    pub fn params(&self) -> &RadioParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulated received strength at `cell` from the beacon at `beacon`.
    ///
    /// Within half a cell of the beacon the log-distance term degenerates,
    /// so the reference strength is returned with reduced noise and no
    /// floor clamp. Everywhere else: reference − path loss − obstruction
    /// attenuation + noise, clamped below at the detection floor.
    pub fn simulate(&mut self, venue: &VenueGrid, beacon: GridPos, cell: GridPos) -> f64 {
        let distance_m = beacon.distance_cells(cell) * venue.cell_size_m();
        if distance_m < venue.cell_size_m() / 2.0 {
            return self.params.reference_dbm
                + self.noise.gaussian_db(self.params.noise_std_dev_db / 3.0);
        }

        let loss = path_loss_db(distance_m, self.params.path_loss_exponent).max(0.0);
        let attenuation = count_obstructions(venue, beacon, cell) as f64
            * self.params.obstacle_attenuation_db;
        let noise = self.noise.gaussian_db(self.params.noise_std_dev_db);

        (self.params.reference_dbm - loss - attenuation + noise).max(self.params.min_detectable_dbm)
    }

    /// Observe the full signal vector at `pos`, one reading per beacon in
    /// beacon order.
    pub fn observe(&mut self, venue: &VenueGrid, pos: GridPos) -> SignalSample {
        let values = venue
            .beacons()
            .iter()
            .map(|&beacon| self.simulate(venue, beacon, pos))
            .collect();
        SignalSample::new(values)
    }
}
