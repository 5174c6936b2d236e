//! Splitting segments into cells.

use std::ops::Range;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::{CtmConstants, Settings};
use crate::error::{Error, Result};
use crate::schedule::Schedule;
use crate::topology::{Segment, SegmentId};
use crate::util::{kmh_to_ms, per_hour_to_per_step};

/// Whether a cell sits on the edge of the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Boundary {
    Interior,
    /// Vehicles enter the network here.
    Inflow,
    /// Vehicles leave the network here.
    Outflow,
}

/// The static description of a single cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellSpec {
    /// The segment the cell belongs to.
    pub segment: SegmentId,
    /// The position of the segment in the network's segment list.
    pub segment_index: usize,
    /// The position of the cell within its segment.
    pub position: usize,
    /// The length of the cell in m.
    pub length: f64,
    /// The free-flow speed in m/s.
    pub velocity_free: f64,
    /// The ratio of congestion wave speed to free-flow speed.
    pub delta: f64,
    pub boundary: Boundary,
    pub initial_occupancy: f64,
}

/// The capacities of a cell for a given lane count.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellCapacity {
    pub lanes: u32,
    /// The number of vehicles that fit in the cell.
    pub max_vehicle: f64,
    /// The most vehicles that can cross the cell boundary in one time step.
    pub max_flow: f64,
}

/// The cells of one segment, along with its parameter schedules.
#[derive(Clone, Debug)]
pub struct DiscretizedSegment {
    pub id: SegmentId,
    /// The global index of the first cell.
    pub first: usize,
    pub cells: Vec<CellSpec>,
    /// Ordinary links between consecutive cells, as global `(from, to)` indices.
    pub links: Vec<(usize, usize)>,
    pub lanes: Schedule<u32>,
    /// The border inflow in vehicles per time step, if the segment is a source.
    pub inflow: Option<Schedule<f64>>,
}

/// Turns segments into chains of cells.
///
/// Cells are sized so that a vehicle travelling at the free-flow speed
/// crosses exactly one cell per time step.
#[derive(Clone, Copy, Debug)]
pub struct CellDiscretizer {
    time_step: f64,
    horizon: usize,
    constants: CtmConstants,
}

impl CellDiscretizer {
    /// The fewest cells a segment is split into.
    pub const MIN_CELLS: usize = 2;

    /// Creates a discretizer for the given settings.
    pub fn new(settings: &Settings) -> Self {
        Self {
            time_step: settings.simulation.time_step as f64,
            horizon: settings.simulation.total_steps,
            constants: settings.constants,
        }
    }

    /// The length of a cell in m for the given free-flow speed in km/h.
    pub fn cell_length(&self, velocity_free: f64) -> f64 {
        kmh_to_ms(velocity_free) * self.time_step
    }

    /// The number of cells the segment is split into.
    pub fn cell_count(&self, segment: &Segment) -> usize {
        let count = (segment.length / self.cell_length(segment.velocity_free)).ceil() as usize;
        usize::max(Self::MIN_CELLS, count)
    }

    /// Splits a segment into cells.
    ///
    /// # Parameters
    /// * `id` - The ID of the segment.
    /// * `segment_index` - The position of the segment in the network.
    /// * `segment` - The segment to split.
    /// * `first` - The global index of the segment's first cell.
    pub fn discretize(
        &self,
        id: SegmentId,
        segment_index: usize,
        segment: &Segment,
        first: usize,
    ) -> Result<DiscretizedSegment> {
        let what = |field: &str| format!("segment {} {field}", id.0);

        let lanes = segment.lanes.build(self.horizon, &what("lanes"))?;
        let inflow = match (&segment.border_flow, segment.predecessors.is_empty()) {
            (Some(flow), true) => {
                let flow = flow.build(self.horizon, &what("border_flow"))?;
                Some(flow.map(|f| per_hour_to_per_step(f, self.time_step)))
            }
            (None, true) => {
                return Err(Error::Import(format!(
                    "segment {} has no predecessors and no border flow",
                    id.0
                )))
            }
            (_, false) => None,
        };

        let count = self.cell_count(segment);
        let velocity_free = kmh_to_ms(segment.velocity_free);
        let length = self.cell_length(segment.velocity_free);
        let delta = self.constants.wave_coefficient / velocity_free;

        let cells = (0..count)
            .map(|position| {
                let boundary = if position == 0 && segment.predecessors.is_empty() {
                    Boundary::Inflow
                } else if position == count - 1 && segment.successors.is_empty() {
                    Boundary::Outflow
                } else {
                    Boundary::Interior
                };
                CellSpec {
                    segment: id,
                    segment_index,
                    position,
                    length,
                    velocity_free,
                    delta,
                    boundary,
                    initial_occupancy: segment.initial_occupancy,
                }
            })
            .collect();

        let links = (first..first + count).tuple_windows().collect();

        Ok(DiscretizedSegment {
            id,
            first,
            cells,
            links,
            lanes,
            inflow,
        })
    }

    /// The capacities of a cell with the given number of lanes.
    pub fn capacity(&self, cell: &CellSpec, lanes: u32) -> CellCapacity {
        CellCapacity {
            lanes,
            max_vehicle: cell.length * lanes as f64 / self.constants.car_length,
            max_flow: per_hour_to_per_step(self.constants.flow_per_lane * lanes as f64, self.time_step),
        }
    }
}

impl DiscretizedSegment {
    /// The global indices of the segment's cells.
    pub fn range(&self) -> Range<usize> {
        self.first..self.first + self.cells.len()
    }
}
