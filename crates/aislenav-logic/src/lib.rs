//! Pure positioning and routing logic for AisleNav.
//!
//! This crate contains all engine-independent algorithms: the venue grid
//! model, signal-propagation math, nearest-neighbor location estimation,
//! and grid pathfinding. Functions take plain data and return results,
//! making them unit-testable and portable — the simulation engine in
//! `aislenav-core` layers noise, state, and persistence on top.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`approach`] | Approachable pathway cells around stalls and items |
//! | [`geometry`] | Grid positions, distances, Bresenham rasterization |
//! | [`grid`] | Venue occupancy grid, placement rules, name resolution |
//! | [`ids`] | Reserved id ranges for stalls and items |
//! | [`knn`] | Weighted k-nearest-neighbor location estimation |
//! | [`pathfinding`] | Four-directional A* over the walkability matrix |
//! | [`signal`] | Log-distance path loss and obstruction attenuation |

pub mod approach;
pub mod geometry;
pub mod grid;
pub mod ids;
pub mod knn;
pub mod pathfinding;
pub mod signal;
