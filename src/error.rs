//! Errors raised while loading, building or running a simulation.

use crate::topology::SegmentId;

/// A specialised result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Any error that aborts a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network topology cannot be turned into a valid set of junctions.
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),
    /// A schedule refers to a step outside of the simulated horizon.
    #[error("{what} references step {index}, but the horizon is {horizon} steps")]
    BoundaryIndex {
        what: String,
        index: usize,
        horizon: usize,
    },
    /// The topology source is missing or malformed.
    #[error("import error: {0}")]
    Import(String),
    #[error("import error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export error: {0}")]
    Csv(#[from] csv::Error),
    /// The settings are inconsistent.
    #[error("config error: {field}: {message}")]
    Config { field: String, message: String },
    /// A time step produced a non-finite occupancy.
    #[error("solver produced a non-finite occupancy in cell {cell} at t = {second}s")]
    Solver { second: u64, cell: usize },
    /// The simulation is not in a state that allows running it.
    #[error("simulation cannot run from the {state} state")]
    NotRunnable { state: &'static str },
}

/// Ways in which the cell adjacency can fail to describe valid junctions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TopologyError {
    #[error("no junction classification for cell {cell}")]
    NoClassification { cell: usize },
    #[error("cell {cell} matches several junction shapes: {matches}")]
    AmbiguousClassification { cell: usize, matches: String },
    #[error("link from cell {from} to cell {to} is part of both a merge and a diverge")]
    EdgeConflict { from: usize, to: usize },
    #[error("cell {cell} should be a {expected} cell according to its segment")]
    BoundaryMismatch { cell: usize, expected: &'static str },
    #[error("segment {referenced_by:?} references unknown segment {segment:?}")]
    UnknownSegment {
        segment: SegmentId,
        referenced_by: SegmentId,
    },
    #[error("segment {segment:?} has invalid split priorities")]
    InvalidPriorities { segment: SegmentId },
}

impl Error {
    /// Creates a config error for the given field.
    pub(crate) fn config(field: &str, message: impl Into<String>) -> Self {
        Self::Config {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
