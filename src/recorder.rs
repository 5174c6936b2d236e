//! Snapshots of the cell state taken during a run, and views of them per segment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::CellState;
use crate::network::Network;
use crate::topology::SegmentId;

/// The state of every cell at one logged instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// The simulated time in s.
    pub second: u64,
    /// The parameter step the frame falls in.
    pub step: usize,
    pub cells: CellState,
}

/// Where the cells of a segment sit in a frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentLayout {
    pub id: SegmentId,
    pub name: Option<String>,
    pub first: usize,
    pub count: usize,
    /// The length of each cell in m.
    pub cell_length: f64,
    pub predecessors: Vec<SegmentId>,
    pub successors: Vec<SegmentId>,
}

/// The cells of one segment at one logged instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentFrame {
    pub second: u64,
    pub occupancy: Vec<f64>,
    pub flow: Vec<f64>,
    pub inflow: Vec<f64>,
    pub outflow: Vec<f64>,
    pub max_vehicle: Vec<f64>,
    pub lanes: Vec<u32>,
}

/// Everything recorded about one segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSeries {
    pub id: SegmentId,
    pub name: Option<String>,
    pub predecessors: Vec<SegmentId>,
    pub successors: Vec<SegmentId>,
    pub cell_length: f64,
    pub frames: Vec<SegmentFrame>,
}

impl SegmentSeries {
    /// The occupancy of each cell as a percentage of its capacity, per frame.
    /// Cells without capacity report zero.
    pub fn relative_occupancy(&self) -> Vec<Vec<f64>> {
        self.frames
            .iter()
            .map(|frame| {
                frame
                    .occupancy
                    .iter()
                    .zip(&frame.max_vehicle)
                    .map(|(&occupancy, &max)| if max > 0.0 { 100.0 * occupancy / max } else { 0.0 })
                    .collect()
            })
            .collect()
    }

    /// The density of each cell in veh/km, per frame.
    pub fn density(&self) -> Vec<Vec<f64>> {
        let km = self.cell_length / 1000.0;
        self.frames
            .iter()
            .map(|frame| frame.occupancy.iter().map(|&o| o / km).collect())
            .collect()
    }
}

/// Collects frames during a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Recorder {
    segments: Vec<SegmentLayout>,
    frames: Vec<Frame>,
}

impl Recorder {
    /// Creates an empty recorder for the network.
    pub fn new(network: &Network) -> Self {
        let segments = network
            .segments()
            .iter()
            .map(|segment| SegmentLayout {
                id: segment.id,
                name: segment.name.clone(),
                first: segment.first,
                count: segment.count,
                cell_length: network.cells()[segment.first].length,
                predecessors: segment.predecessors.to_vec(),
                successors: segment.successors.to_vec(),
            })
            .collect();
        Self {
            segments,
            frames: Vec::with_capacity(network.settings().simulation.frame_count()),
        }
    }

    /// Stores a snapshot.
    pub fn record(&mut self, second: u64, step: usize, cells: CellState) {
        log::debug!("Snapshot at t = {}s", second);
        self.frames.push(Frame { second, step, cells });
    }

    /// Every recorded frame, in time order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The number of recorded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The layout of every segment.
    pub fn segments(&self) -> &[SegmentLayout] {
        &self.segments
    }

    /// The occupancy of every cell, one row per frame.
    pub fn occupancy_matrix(&self) -> Vec<Vec<f64>> {
        self.frames.iter().map(|f| f.cells.occupancy.clone()).collect()
    }

    /// The recorded series of one segment.
    pub fn segment_series(&self, id: SegmentId) -> Option<SegmentSeries> {
        self.segments.iter().find(|s| s.id == id).map(|layout| self.series(layout))
    }

    /// The recorded series of every segment.
    pub fn series_by_segment(&self) -> BTreeMap<SegmentId, SegmentSeries> {
        self.segments.iter().map(|layout| (layout.id, self.series(layout))).collect()
    }

    fn series(&self, layout: &SegmentLayout) -> SegmentSeries {
        let range = layout.first..layout.first + layout.count;
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                let cells = &frame.cells;
                SegmentFrame {
                    second: frame.second,
                    occupancy: cells.occupancy[range.clone()].to_vec(),
                    flow: cells.flow[range.clone()].to_vec(),
                    inflow: cells.inflow[range.clone()].to_vec(),
                    outflow: cells.outflow[range.clone()].to_vec(),
                    max_vehicle: cells.max_vehicle[range.clone()].to_vec(),
                    lanes: cells.lanes[range.clone()].to_vec(),
                }
            })
            .collect();
        SegmentSeries {
            id: layout.id,
            name: layout.name.clone(),
            predecessors: layout.predecessors.clone(),
            successors: layout.successors.clone(),
            cell_length: layout.cell_length,
            frames,
        }
    }
}
