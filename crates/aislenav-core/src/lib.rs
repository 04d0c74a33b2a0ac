//! AisleNav Core - Indoor Positioning and Navigation Engine
//!
//! Drives one positioning+routing cycle over a venue built with
//! `aislenav-logic`: simulate noisy beacon signals, fingerprint the
//! walkable area once, estimate the cart's position per observation, and
//! route it to named targets. All mutable simulation state lives in
//! [`engine::NavigationEngine`]; presentation, speech, and input layers
//! talk to it only through [`engine::Snapshot`] and resolved
//! [`engine::TargetQuery`] values.
//!
//! # Example
//!
//! ```rust,no_run
//! use aislenav_core::prelude::*;
//! use aislenav_logic::geometry::GridPos;
//! use aislenav_logic::grid::{Rect, VenueGrid};
//! use aislenav_logic::ids::TargetKind;
//! use aislenav_logic::signal::RadioParams;
//!
//! let mut venue = VenueGrid::new(20, 30, 0.5);
//! let stall = venue.place_stall(Rect::new(4, 4, 6, 2), "Dairy").unwrap();
//! venue.place_item(Rect::new(4, 4, 3, 2), "Milk", Some(stall)).unwrap();
//! venue.place_beacon(GridPos::new(1, 1)).unwrap();
//! venue.place_beacon(GridPos::new(18, 28)).unwrap();
//!
//! let simulator = SignalSimulator::new(RadioParams::default(), 42);
//! let mut engine = NavigationEngine::new(venue, simulator, Tuning::default());
//!
//! engine.place_cart(GridPos::new(15, 5)).unwrap();
//! engine.request_target(&TargetQuery::item("Milk"));
//! while engine.state() == EngineState::Moving {
//!     let snapshot = engine.step_movement();
//!     println!("{}", snapshot.status);
//! }
//! ```

pub mod engine;
pub mod fingerprint;
pub mod noise;
pub mod persistence;
pub mod simulator;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::engine::{EngineState, NavigationEngine, Snapshot, TargetQuery, Tuning};
    pub use crate::fingerprint::FingerprintStore;
    pub use crate::simulator::SignalSimulator;
}
