//! Reserved id ranges for venue entities.
//!
//! Stalls and items draw from disjoint numeric ranges so a cell id is
//! unambiguous about what covers it. Ids are allocated at placement time
//! and never reused.

use serde::{Deserialize, Serialize};

pub type StallId = u16;
pub type ItemId = u16;

/// Stall ids occupy a small reserved band; running past it is a placement
/// error, not a wraparound.
pub mod stall_ids {
    use super::StallId;
    pub const FIRST: StallId = 50;
    pub const LAST: StallId = 99;
}

/// Item ids start above the stall band and grow without an upper bound.
pub mod item_ids {
    use super::ItemId;
    pub const FIRST: ItemId = 100;
}

/// Which kind of named entity a navigation target refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Item,
    Stall,
}
