//! A macroscopic traffic simulation based on the Cell Transmission Model.
//!
//! Road segments are split into cells which exchange flow every time step,
//! subject to capacity and backward-wave constraints. Two solver strategies
//! are provided: a graph of explicit cell and junction entities, and a
//! vectorized form over a dense or sparse adjacency matrix. Both produce
//! the same results.
//!
//! ```no_run
//! use ctm_sim::{Settings, Simulation, Strategy, Topology};
//! # fn main() -> ctm_sim::Result<()> {
//! let topology = Topology::from_json_file("network.json".as_ref())?;
//! let mut sim = Simulation::from_topology(&topology, &Settings::default(), Strategy::VectorSparse)?;
//! let frames = sim.run()?;
//! println!("{} frames recorded", frames.len());
//! # Ok(())
//! # }
//! ```

pub use classify::{Junction, JunctionKind};
pub use config::{CtmConstants, Settings, SimOptions};
pub use engine::{CellState, FlowEngine, Strategy};
pub use error::{Error, Result, TopologyError};
pub use network::{Network, SegmentCells};
pub use recorder::{Frame, Recorder, SegmentFrame, SegmentLayout, SegmentSeries};
pub use schedule::{Schedule, ScheduleSpec};
pub use simulation::{RunState, Simulation};
use slotmap::{new_key_type, SlotMap};
pub use topology::{Segment, SegmentId, Topology};

pub mod classify;
mod config;
pub mod conformance;
pub mod discretize;
mod engine;
mod error;
pub mod export;
pub mod flow;
pub mod graph;
mod network;
mod recorder;
pub mod runner;
mod schedule;
mod simulation;
mod topology;
mod util;
pub mod vector;

new_key_type! {
    /// Unique ID of a [graph::Cell].
    pub struct CellId;
    /// Unique ID of a [graph::Link].
    pub struct JunctionId;
}

type CellSet = SlotMap<CellId, graph::Cell>;
type LinkSet = SlotMap<JunctionId, graph::Link>;
