//! Save/Load functionality for the positioning engine.
//!
//! Uses bincode for an opaque binary snapshot of the venue, radio
//! parameters, locator tuning, and the prebuilt fingerprint store. The
//! cart is transient runtime state and is not persisted — a restored
//! engine starts `Idle` and waits for the next placement.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use aislenav_logic::grid::VenueGrid;
use aislenav_logic::signal::RadioParams;

use crate::engine::Tuning;
use crate::fingerprint::FingerprintStore;

/// Version number for the save format (increment when the format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of everything an engine needs to come back up.
#[derive(Serialize, Deserialize)]
struct SaveData {
    version: u32,
    venue: VenueGrid,
    params: RadioParams,
    tuning: Tuning,
    fingerprints: FingerprintStore,
}

/// Persisted parts, ready to reassemble into an engine.
pub struct LoadedEngine {
    pub venue: VenueGrid,
    pub params: RadioParams,
    pub tuning: Tuning,
    pub fingerprints: FingerprintStore,
}

/// Write a complete engine snapshot.
pub fn save_engine<W: Write>(
    writer: W,
    venue: &VenueGrid,
    params: &RadioParams,
    tuning: Tuning,
    fingerprints: &FingerprintStore,
) -> Result<(), SaveError> {
    let data = SaveData {
        version: SAVE_VERSION,
        venue: venue.clone(),
        params: *params,
        tuning,
        fingerprints: fingerprints.clone(),
    };
    bincode::serialize_into(writer, &data)?;
    Ok(())
}

/// Read a snapshot written by [`save_engine`].
pub fn load_engine<R: Read>(reader: R) -> Result<LoadedEngine, SaveError> {
    let data: SaveData = bincode::deserialize_from(reader)?;

    if data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }

    Ok(LoadedEngine {
        venue: data.venue,
        params: data.params,
        tuning: data.tuning,
        fingerprints: data.fingerprints,
    })
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
        }
    }
}

impl std::error::Error for SaveError {}
