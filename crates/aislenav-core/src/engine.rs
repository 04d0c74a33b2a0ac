//! Navigation engine - owns all mutable simulation state.
//!
//! One instance drives the whole positioning+routing cycle: place the cart,
//! observe noisy signals, estimate position, plan a route to a named target,
//! and step the cart along it with relocalization at every cell. External
//! collaborators never reach inside — the presentation layer reads
//! [`Snapshot`]s, the speech layer hands over resolved [`TargetQuery`]s,
//! and manual placement supplies a walkable cell to [`NavigationEngine::place_cart`].
//!
//! Runtime estimate and route failures are absorbed here into snapshot
//! status; only misuse (placing the cart on a shelf) surfaces as an error.

use std::fmt;

use serde::{Deserialize, Serialize};

use aislenav_logic::approach;
use aislenav_logic::geometry::{FracPos, GridPos};
use aislenav_logic::grid::{TargetRef, VenueGrid};
use aislenav_logic::ids::TargetKind;
use aislenav_logic::knn;
use aislenav_logic::pathfinding::{find_path, WalkabilityGrid};

use crate::fingerprint::FingerprintStore;
use crate::persistence::{self, SaveError};
use crate::simulator::SignalSimulator;

/// Locator tuning: neighbor count and weighting mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    pub k: usize,
    pub weighted: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            k: 3,
            weighted: true,
        }
    }
}

/// Engine state machine. `Routing` is transient — a successful target
/// request passes through it and lands in `Moving` before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Located,
    Routing,
    Moving,
}

/// A resolved navigation request from the speech/keyword collaborator.
/// The engine never sees raw transcribed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetQuery {
    pub kind: TargetKind,
    pub name: String,
}

impl TargetQuery {
    pub fn item(name: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Item,
            name: name.into(),
        }
    }

    pub fn stall(name: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Stall,
            name: name.into(),
        }
    }
}

/// Read-only state snapshot handed to the presentation collaborator after
/// every state-affecting call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: EngineState,
    pub actual: Option<GridPos>,
    pub estimated: Option<FracPos>,
    /// Localization error in meters, when an estimate exists.
    pub error_m: Option<f64>,
    pub target: Option<String>,
    /// Remaining route in traversal order; `route_index` cells already
    /// visited.
    pub route: Vec<GridPos>,
    pub route_index: usize,
    pub status: String,
}

/// The cart was handed a non-walkable cell. The placement collaborator
/// pre-validates, so this is surfaced rather than absorbed into status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    NotWalkable { pos: GridPos },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotWalkable { pos } => {
                write!(f, "cell ({},{}) is not walkable", pos.row, pos.col)
            }
        }
    }
}

impl std::error::Error for EngineError {}

#[derive(Debug, Clone)]
struct CartState {
    actual: GridPos,
    estimated: Option<FracPos>,
    error_m: Option<f64>,
}

#[derive(Debug)]
pub struct NavigationEngine {
    venue: VenueGrid,
    simulator: SignalSimulator,
    store: FingerprintStore,
    tuning: Tuning,
    state: EngineState,
    cart: Option<CartState>,
    target: Option<String>,
    route: Vec<GridPos>,
    /// Index of the next route cell to visit.
    route_index: usize,
    status: String,
}

impl NavigationEngine {
    /// Build the engine around a finalized venue. Fingerprints the whole
    /// walkable area once, up front.
    pub fn new(venue: VenueGrid, mut simulator: SignalSimulator, tuning: Tuning) -> Self {
        let store = FingerprintStore::build(&venue, &mut simulator);
        log::info!(
            "fingerprinted {} cells against {} beacons",
            store.len(),
            store.beacon_count()
        );
        Self {
            venue,
            simulator,
            store,
            tuning,
            state: EngineState::Idle,
            cart: None,
            target: None,
            route: Vec::new(),
            route_index: 0,
            status: "venue ready, no cart placed".to_string(),
        }
    }

    /// Reassemble an engine from persisted parts. The fingerprint store is
    /// taken as-is, not rebuilt.
    pub(crate) fn from_parts(
        venue: VenueGrid,
        simulator: SignalSimulator,
        store: FingerprintStore,
        tuning: Tuning,
    ) -> Self {
        Self {
            venue,
            simulator,
            store,
            tuning,
            state: EngineState::Idle,
            cart: None,
            target: None,
            route: Vec::new(),
            route_index: 0,
            status: "venue restored, no cart placed".to_string(),
        }
    }

    pub fn venue(&self) -> &VenueGrid {
        &self.venue
    }

    pub fn store(&self) -> &FingerprintStore {
        &self.store
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    pub fn simulator(&self) -> &SignalSimulator {
        &self.simulator
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Current read-only state for the presentation collaborator.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            actual: self.cart.as_ref().map(|c| c.actual),
            estimated: self.cart.as_ref().and_then(|c| c.estimated),
            error_m: self.cart.as_ref().and_then(|c| c.error_m),
            target: self.target.clone(),
            route: self.route.clone(),
            route_index: self.route_index,
            status: self.status.clone(),
        }
    }

    /// Place (or teleport) the cart on a walkable cell and relocalize.
    /// Any active target or route is abandoned.
    pub fn place_cart(&mut self, pos: GridPos) -> Result<Snapshot, EngineError> {
        if !self.venue.is_walkable(pos) {
            return Err(EngineError::NotWalkable { pos });
        }
        self.target = None;
        self.route.clear();
        self.route_index = 0;
        self.relocalize(pos);
        self.state = EngineState::Located;
        Ok(self.snapshot())
    }

    /// Observe a fresh signal vector at `pos` and run the locator.
    /// Locator failure is reported through status, never propagated — the
    /// cart keeps its authoritative position with no estimate.
    fn relocalize(&mut self, pos: GridPos) {
        let observed = self.simulator.observe(&self.venue, pos);
        match knn::estimate(
            &observed,
            self.store.entries(),
            self.tuning.k,
            self.tuning.weighted,
        ) {
            Ok(est) => {
                let error_m = est.pos.distance_cells(pos) * self.venue.cell_size_m();
                if est.degraded {
                    log::warn!("weighted KNN degraded to unweighted mean at ({},{})", pos.row, pos.col);
                    self.status = format!("located (degraded), error {:.2} m", error_m);
                } else {
                    self.status = format!("located, error {:.2} m", error_m);
                }
                self.cart = Some(CartState {
                    actual: pos,
                    estimated: Some(est.pos),
                    error_m: Some(error_m),
                });
            }
            Err(e) => {
                log::warn!("localization failed at ({},{}): {}", pos.row, pos.col, e);
                self.status = format!("localization failed: {}", e);
                self.cart = Some(CartState {
                    actual: pos,
                    estimated: None,
                    error_m: None,
                });
            }
        }
    }

    /// Request navigation to a named item or stall.
    ///
    /// On success the engine passes through `Routing` into `Moving`. On any
    /// failure — unknown name, fully enclosed target, no path — it stays
    /// `Located` and reports through status.
    pub fn request_target(&mut self, query: &TargetQuery) -> Snapshot {
        let cart = match (&self.state, &self.cart) {
            (EngineState::Located, Some(cart)) => cart.clone(),
            (EngineState::Idle, _) | (_, None) => {
                self.status = "no cart placed, cannot navigate".to_string();
                return self.snapshot();
            }
            _ => {
                self.status = "already navigating, step or re-place the cart first".to_string();
                return self.snapshot();
            }
        };

        let resolved = match query.kind {
            TargetKind::Item => self.venue.find_item(&query.name).map(TargetRef::Item),
            TargetKind::Stall => self.venue.find_stall(&query.name).map(TargetRef::Stall),
        };
        let Some(target_ref) = resolved else {
            self.status = format!("unknown target \"{}\"", query.name);
            return self.snapshot();
        };
        let display_name = self
            .venue
            .target_name(target_ref)
            .unwrap_or(query.name.as_str())
            .to_string();

        let candidates = approach::approachable_cells(&self.venue, target_ref);
        if candidates.is_empty() {
            self.status = format!("no approachable cell for \"{}\"", display_name);
            return self.snapshot();
        }

        // Nearest the current estimate; the sorted candidate list makes
        // equal distances resolve to the smallest row, then column.
        let reference = cart.estimated.unwrap_or_else(|| cart.actual.into());
        let mut goal = candidates[0];
        let mut best = reference.distance_cells(goal);
        for &c in &candidates[1..] {
            let d = reference.distance_cells(c);
            if d < best {
                best = d;
                goal = c;
            }
        }

        // Plan from the rounded estimate; an estimate that rounds into a
        // shelf falls back to the true position.
        let start = cart
            .estimated
            .map(|e| e.rounded())
            .filter(|&p| self.venue.is_walkable(p))
            .unwrap_or(cart.actual);

        let walk = WalkabilityGrid::from_venue(&self.venue);
        match find_path(&walk, start, goal) {
            Some(path) => {
                self.state = EngineState::Routing;
                log::debug!(
                    "routed to \"{}\": {} cells from ({},{})",
                    display_name,
                    path.len(),
                    start.row,
                    start.col
                );
                self.target = Some(display_name.clone());
                self.route = path;
                self.route_index = 0;
                self.state = EngineState::Moving;
                self.status = format!("navigating to \"{}\"", display_name);
            }
            None => {
                self.status = format!("no route to \"{}\"", display_name);
                log::info!("route not found to \"{}\"", display_name);
            }
        }
        self.snapshot()
    }

    /// Advance one cell along the active route and relocalize there.
    ///
    /// The driving loop controls pacing; cancelling between steps leaves
    /// `actual` and the route mutually consistent. Exhausting the route
    /// returns to `Located` with target and route cleared.
    pub fn step_movement(&mut self) -> Snapshot {
        if self.state != EngineState::Moving {
            return self.snapshot();
        }

        if self.route_index < self.route.len() {
            let next = self.route[self.route_index];
            self.route_index += 1;
            self.relocalize(next);
        }

        if self.route_index >= self.route.len() {
            let arrived = self.target.take().unwrap_or_default();
            self.route.clear();
            self.route_index = 0;
            self.state = EngineState::Located;
            self.status = format!("arrived at \"{}\"", arrived);
            log::info!("arrived at \"{}\"", arrived);
        }
        self.snapshot()
    }

    /// Persist venue, radio parameters, tuning, and fingerprints. The cart
    /// is transient and not saved.
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), SaveError> {
        persistence::save_engine(
            writer,
            &self.venue,
            self.simulator.params(),
            self.tuning,
            &self.store,
        )
    }

    /// Restore an engine saved with [`NavigationEngine::save`]. `seed`
    /// reseeds the noise generator (0 = entropy).
    pub fn load<R: std::io::Read>(reader: R, seed: u64) -> Result<Self, SaveError> {
        let loaded = persistence::load_engine(reader)?;
        Ok(Self::from_parts(
            loaded.venue,
            SignalSimulator::new(loaded.params, seed),
            loaded.fingerprints,
            loaded.tuning,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aislenav_logic::grid::Rect;
    use aislenav_logic::signal::RadioParams;

    /// 12×12 venue: border walls, a stall with one item, two beacons.
    fn demo_engine() -> NavigationEngine {
        let mut v = VenueGrid::new(12, 12, 0.5);
        v.place_obstacle(Rect::new(0, 0, 1, 12)).unwrap();
        v.place_obstacle(Rect::new(11, 0, 1, 12)).unwrap();
        v.place_obstacle(Rect::new(1, 0, 10, 1)).unwrap();
        v.place_obstacle(Rect::new(1, 11, 10, 1)).unwrap();
        let dairy = v.place_stall(Rect::new(4, 4, 3, 2), "Dairy").unwrap();
        v.place_item(Rect::new(4, 4, 1, 2), "Milk", Some(dairy)).unwrap();
        v.place_beacon(GridPos::new(1, 1)).unwrap();
        v.place_beacon(GridPos::new(10, 10)).unwrap();
        v.place_beacon(GridPos::new(1, 10)).unwrap();

        let params = RadioParams {
            noise_std_dev_db: 0.0,
            ..RadioParams::default()
        };
        NavigationEngine::new(v, SignalSimulator::new(params, 42), Tuning::default())
    }

    #[test]
    fn test_starts_idle() {
        let engine = demo_engine();
        let snap = engine.snapshot();
        assert_eq!(snap.state, EngineState::Idle);
        assert_eq!(snap.actual, None);
        assert!(snap.route.is_empty());
    }

    #[test]
    fn test_place_cart_locates() {
        let mut engine = demo_engine();
        let snap = engine.place_cart(GridPos::new(9, 2)).unwrap();
        assert_eq!(snap.state, EngineState::Located);
        assert_eq!(snap.actual, Some(GridPos::new(9, 2)));
        let est = snap.estimated.expect("noise-free estimate");
        // Zero noise and an exact fingerprint: the estimate should sit on
        // or right next to the true cell.
        assert!(est.distance_cells(GridPos::new(9, 2)) < 2.0);
        assert!(snap.error_m.is_some());
    }

    #[test]
    fn test_place_cart_rejects_shelf() {
        let mut engine = demo_engine();
        let err = engine.place_cart(GridPos::new(4, 4)).unwrap_err();
        assert_eq!(
            err,
            EngineError::NotWalkable {
                pos: GridPos::new(4, 4)
            }
        );
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_request_without_cart() {
        let mut engine = demo_engine();
        let snap = engine.request_target(&TargetQuery::item("Milk"));
        assert_eq!(snap.state, EngineState::Idle);
        assert!(snap.status.contains("no cart"));
    }

    #[test]
    fn test_request_unknown_target() {
        let mut engine = demo_engine();
        engine.place_cart(GridPos::new(9, 2)).unwrap();
        let snap = engine.request_target(&TargetQuery::item("Caviar"));
        assert_eq!(snap.state, EngineState::Located);
        assert!(snap.status.contains("unknown target"));
    }

    #[test]
    fn test_request_and_walk_to_item() {
        let mut engine = demo_engine();
        engine.place_cart(GridPos::new(9, 2)).unwrap();
        let snap = engine.request_target(&TargetQuery::item("Milk"));
        assert_eq!(snap.state, EngineState::Moving);
        assert_eq!(snap.target.as_deref(), Some("Milk"));
        assert!(!snap.route.is_empty());

        let goal = *snap.route.last().unwrap();
        assert!(engine.venue().is_walkable(goal));

        let mut steps = 0;
        while engine.state() == EngineState::Moving {
            engine.step_movement();
            steps += 1;
            assert!(steps < 100, "movement did not terminate");
        }
        let done = engine.snapshot();
        assert_eq!(done.state, EngineState::Located);
        assert_eq!(done.actual, Some(goal));
        assert_eq!(done.target, None);
        assert!(done.route.is_empty());
        assert!(done.status.contains("arrived"));
    }

    #[test]
    fn test_goal_is_adjacent_to_item() {
        let mut engine = demo_engine();
        engine.place_cart(GridPos::new(9, 2)).unwrap();
        let snap = engine.request_target(&TargetQuery::item("Milk"));
        let goal = *snap.route.last().unwrap();
        // Item covers (4,4)-(4,5); the goal borders one of those cells.
        let adjacent = [GridPos::new(4, 4), GridPos::new(4, 5)]
            .iter()
            .any(|c| goal.manhattan(*c) == 1);
        assert!(adjacent, "goal {:?} not adjacent to the item", goal);
    }

    #[test]
    fn test_stall_query_does_not_match_item_name() {
        let mut engine = demo_engine();
        engine.place_cart(GridPos::new(9, 2)).unwrap();
        let snap = engine.request_target(&TargetQuery::stall("Milk"));
        assert!(snap.status.contains("unknown target"));
        let snap = engine.request_target(&TargetQuery::stall("Dairy"));
        assert_eq!(snap.state, EngineState::Moving);
    }

    #[test]
    fn test_enclosed_cart_reports_route_not_found() {
        // A cart sealed off from the target keeps state Located and
        // reports, rather than failing hard.
        let mut v = VenueGrid::new(12, 12, 0.5);
        let dairy = v.place_stall(Rect::new(1, 1, 2, 2), "Dairy").unwrap();
        v.place_item(Rect::new(1, 1, 1, 2), "Milk", Some(dairy)).unwrap();
        v.place_beacon(GridPos::new(0, 0)).unwrap();
        v.place_beacon(GridPos::new(11, 11)).unwrap();
        // Box in the lower-right corner cell (10,10)..(11,11) minus walls.
        v.place_obstacle(Rect::new(9, 9, 1, 3)).unwrap();
        v.place_obstacle(Rect::new(10, 8, 2, 1)).unwrap();

        let params = RadioParams {
            noise_std_dev_db: 0.0,
            ..RadioParams::default()
        };
        let mut engine =
            NavigationEngine::new(v, SignalSimulator::new(params, 7), Tuning::default());
        engine.place_cart(GridPos::new(10, 10)).unwrap();

        let snap = engine.request_target(&TargetQuery::item("Milk"));
        assert_eq!(snap.state, EngineState::Located);
        assert!(snap.status.contains("no route"), "status: {}", snap.status);
        assert!(snap.route.is_empty());
        assert_eq!(snap.target, None);
    }

    #[test]
    fn test_step_outside_moving_is_noop() {
        let mut engine = demo_engine();
        let before = engine.snapshot();
        let after = engine.step_movement();
        assert_eq!(before, after);
    }

    #[test]
    fn test_replace_cart_abandons_route() {
        let mut engine = demo_engine();
        engine.place_cart(GridPos::new(9, 2)).unwrap();
        engine.request_target(&TargetQuery::item("Milk"));
        assert_eq!(engine.state(), EngineState::Moving);

        let snap = engine.place_cart(GridPos::new(2, 9)).unwrap();
        assert_eq!(snap.state, EngineState::Located);
        assert_eq!(snap.target, None);
        assert!(snap.route.is_empty());
    }

    #[test]
    fn test_route_and_actual_consistent_each_step() {
        let mut engine = demo_engine();
        engine.place_cart(GridPos::new(9, 2)).unwrap();
        engine.request_target(&TargetQuery::stall("Dairy"));
        while engine.state() == EngineState::Moving {
            let snap = engine.step_movement();
            if snap.state == EngineState::Moving {
                // The cart sits on the last visited route cell.
                assert_eq!(snap.actual, Some(snap.route[snap.route_index - 1]));
            }
        }
    }
}
