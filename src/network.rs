//! The network aggregate shared by every strategy.

use std::collections::HashMap;
use std::ops::Range;

use arrayvec::ArrayVec;

use crate::classify::{Adjacency, Classification, Junction, JunctionClassifier, SplitTable};
use crate::config::Settings;
use crate::discretize::{Boundary, CellCapacity, CellDiscretizer, CellSpec};
use crate::error::{Error, Result, TopologyError};
use crate::schedule::Schedule;
use crate::topology::{SegmentId, Topology};

/// How far a pair of priorities may stray from summing to one.
const PRIORITY_TOLERANCE: f64 = 1e-9;

/// The cells making up one segment.
#[derive(Clone, Debug)]
pub struct SegmentCells {
    pub id: SegmentId,
    pub name: Option<String>,
    /// The global index of the first cell.
    pub first: usize,
    /// The number of cells.
    pub count: usize,
    pub predecessors: ArrayVec<SegmentId, 2>,
    pub successors: ArrayVec<SegmentId, 2>,
    /// The lane count, per step.
    pub lanes: Schedule<u32>,
    /// The border inflow in vehicles per time step, per step.
    pub inflow: Option<Schedule<f64>>,
}

impl SegmentCells {
    /// The global indices of the segment's cells.
    pub fn range(&self) -> Range<usize> {
        self.first..self.first + self.count
    }

    pub fn first_cell(&self) -> usize {
        self.first
    }

    pub fn last_cell(&self) -> usize {
        self.first + self.count - 1
    }
}

/// A discretized and classified road network.
///
/// Cells are numbered densely in ascending segment ID order. Every strategy
/// is loaded from the same `Network`, so cell indices agree between them.
#[derive(Clone, Debug)]
pub struct Network {
    settings: Settings,
    discretizer: CellDiscretizer,
    segments: Vec<SegmentCells>,
    segment_index: HashMap<SegmentId, usize>,
    cells: Vec<CellSpec>,
    adjacency: Adjacency,
    splits: SplitTable,
    classification: Classification,
}

impl Network {
    /// Discretizes and classifies a topology.
    ///
    /// The topology's own options, if any, replace the simulation options of `settings`.
    pub fn build(topology: &Topology, settings: &Settings) -> Result<Self> {
        let settings = topology.effective_settings(settings);
        settings.validate()?;
        topology.check()?;

        let discretizer = CellDiscretizer::new(&settings);
        let mut segments = Vec::with_capacity(topology.segments.len());
        let mut cells = vec![];
        let mut links = vec![];

        for (index, (&id, segment)) in topology.segments.iter().enumerate() {
            let discretized = discretizer.discretize(id, index, segment, cells.len())?;
            links.extend_from_slice(&discretized.links);
            segments.push(SegmentCells {
                id,
                name: segment.name.clone(),
                first: discretized.first,
                count: discretized.cells.len(),
                predecessors: segment.predecessors.clone(),
                successors: segment.successors.clone(),
                lanes: discretized.lanes,
                inflow: discretized.inflow,
            });
            cells.extend(discretized.cells);
        }

        let segment_index: HashMap<_, _> = segments.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
        let lookup = |id: SegmentId, referenced_by: SegmentId| {
            segment_index
                .get(&id)
                .map(|&i| &segments[i])
                .ok_or(TopologyError::UnknownSegment {
                    segment: id,
                    referenced_by,
                })
        };

        // Links between segments, from either side of the relation
        let mut splits = SplitTable::default();
        for segment in &segments {
            for &succ in &segment.successors {
                links.push((segment.last_cell(), lookup(succ, segment.id)?.first_cell()));
            }
            for &pred in &segment.predecessors {
                links.push((lookup(pred, segment.id)?.last_cell(), segment.first_cell()));
            }

            let spec = &topology.segments[&segment.id];
            if let Some(priorities) = spec.diverge_priorities {
                check_priorities(segment.id, priorities)?;
                if let [a, b] = segment.successors.as_slice() {
                    let from = segment.last_cell();
                    splits.set_diverge(from, lookup(*a, segment.id)?.first_cell(), priorities[0]);
                    splits.set_diverge(from, lookup(*b, segment.id)?.first_cell(), priorities[1]);
                } else {
                    log::warn!("Segment {} has diverge priorities but no diverge", segment.id.0);
                }
            }
            if let Some(priorities) = spec.merge_priorities {
                check_priorities(segment.id, priorities)?;
                if let [a, b] = segment.predecessors.as_slice() {
                    let to = segment.first_cell();
                    splits.set_merge(lookup(*a, segment.id)?.last_cell(), to, priorities[0]);
                    splits.set_merge(lookup(*b, segment.id)?.last_cell(), to, priorities[1]);
                } else {
                    log::warn!("Segment {} has merge priorities but no merge", segment.id.0);
                }
            }
        }

        let adjacency = Adjacency::new(cells.len(), links);
        let boundaries: Vec<_> = cells.iter().map(|c| c.boundary).collect();
        let classification = JunctionClassifier::new(&boundaries, &splits).classify(&adjacency)?;

        log::info!(
            "Built network with {} segments, {} cells and {} junctions",
            segments.len(),
            cells.len(),
            classification.junctions.len()
        );

        Ok(Self {
            settings,
            discretizer,
            segments,
            segment_index,
            cells,
            adjacency,
            splits,
            classification,
        })
    }

    /// The settings the network was built with, including topology overrides.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The segments, in ascending ID order.
    pub fn segments(&self) -> &[SegmentCells] {
        &self.segments
    }

    /// Gets a segment by its ID.
    pub fn segment(&self, id: SegmentId) -> Option<&SegmentCells> {
        self.segment_index.get(&id).map(|&i| &self.segments[i])
    }

    /// Every cell, by index.
    pub fn cells(&self) -> &[CellSpec] {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The link relation between cells.
    pub fn adjacency(&self) -> &Adjacency {
        &self.adjacency
    }

    /// The merge and diverge priorities.
    pub fn splits(&self) -> &SplitTable {
        &self.splits
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn junctions(&self) -> &[Junction] {
        &self.classification.junctions
    }

    /// The boundary flag of every cell.
    pub fn boundaries(&self) -> Vec<Boundary> {
        self.cells.iter().map(|c| c.boundary).collect()
    }

    /// The capacities of a cell during the given step.
    pub fn capacity(&self, cell: usize, step: usize) -> CellCapacity {
        let spec = &self.cells[cell];
        let lanes = self.segments[spec.segment_index].lanes.at(step);
        self.discretizer.capacity(spec, lanes)
    }

    /// The vehicles offered to a border-in cell per time step during the
    /// given step. Zero for every other cell.
    pub fn border_inflow(&self, cell: usize, step: usize) -> f64 {
        let spec = &self.cells[cell];
        match (&self.segments[spec.segment_index].inflow, spec.boundary) {
            (Some(inflow), Boundary::Inflow) => inflow.at(step),
            _ => 0.0,
        }
    }

    /// The occupancy each cell starts the run with.
    pub fn initial_occupancy(&self) -> Vec<f64> {
        self.cells.iter().map(|c| c.initial_occupancy).collect()
    }
}

fn check_priorities(segment: SegmentId, priorities: [f64; 2]) -> Result<()> {
    let valid = priorities.iter().all(|p| p.is_finite() && *p > 0.0)
        && (priorities[0] + priorities[1] - 1.0).abs() <= PRIORITY_TOLERANCE;
    if valid {
        Ok(())
    } else {
        Err(Error::Topology(TopologyError::InvalidPriorities { segment }))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::classify::JunctionKind;
    use crate::topology::Segment;
    use assert_approx_eq::assert_approx_eq;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.simulation.total_steps = 2;
        settings
    }

    fn merge_topology() -> Topology {
        let mut topology = Topology::new();
        topology
            .add_segment(0, Segment::new(100.0, 1, 100.0).with_border_flow(1800.0).with_successors(&[2]))
            .add_segment(1, Segment::new(100.0, 1, 100.0).with_border_flow(1800.0).with_successors(&[2]))
            .add_segment(2, Segment::new(100.0, 1, 100.0).with_predecessors(&[0, 1]));
        topology
    }

    #[test]
    fn builds_merge() {
        let network = Network::build(&merge_topology(), &settings()).unwrap();
        // 100 m at 27.8 m/s is 4 cells each
        assert_eq!(network.cell_count(), 12);
        assert_eq!(network.segment(SegmentId(2)).unwrap().range(), 8..12);
        assert!(network.junctions().contains(&Junction::Merge {
            from: [3, 7],
            to: 8,
            priorities: [0.5, 0.5]
        }));
        assert_eq!(network.classification().counts()[&JunctionKind::BorderIn], 2);
        assert_approx_eq!(network.border_inflow(0, 0), 0.5);
        assert_eq!(network.border_inflow(1, 0), 0.0);
    }

    #[test]
    fn missing_successor_side_is_a_boundary_mismatch() {
        let mut topology = merge_topology();
        for id in [0, 1] {
            topology.segments.get_mut(&SegmentId(id)).unwrap().successors.clear();
        }
        let err = Network::build(&topology, &settings()).unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::BoundaryMismatch {
                cell: 3,
                expected: "border-out"
            })
        ));
    }

    #[test]
    fn missing_predecessor_side_is_a_boundary_mismatch() {
        let mut topology = Topology::new();
        topology
            .add_segment(0, Segment::new(100.0, 1, 100.0).with_border_flow(0.0).with_successors(&[1]))
            .add_segment(1, Segment::new(100.0, 1, 100.0).with_border_flow(0.0));
        let err = Network::build(&topology, &settings()).unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::BoundaryMismatch { cell: 4, .. })
        ));
    }

    #[test]
    fn custom_merge_priorities() {
        let mut topology = merge_topology();
        topology.segments.get_mut(&SegmentId(2)).unwrap().merge_priorities = Some([0.7, 0.3]);
        let network = Network::build(&topology, &settings()).unwrap();
        assert!(network.junctions().contains(&Junction::Merge {
            from: [3, 7],
            to: 8,
            priorities: [0.7, 0.3]
        }));
    }

    #[test]
    fn priorities_must_sum_to_one() {
        let mut topology = merge_topology();
        topology.segments.get_mut(&SegmentId(2)).unwrap().merge_priorities = Some([0.7, 0.7]);
        let err = Network::build(&topology, &settings()).unwrap_err();
        assert!(matches!(
            err,
            Error::Topology(TopologyError::InvalidPriorities { segment: SegmentId(2) })
        ));
    }

    #[test]
    fn capacity_follows_lane_schedule() {
        use crate::schedule::ScheduleSpec;

        let mut topology = Topology::new();
        topology.add_segment(
            0,
            Segment::new(100.0, ScheduleSpec::overrides([(0, 2), (1, 1)]), 100.0).with_border_flow(0.0),
        );
        let network = Network::build(&topology, &settings()).unwrap();
        assert_eq!(network.capacity(0, 0).lanes, 2);
        assert_eq!(network.capacity(0, 1).lanes, 1);
        assert_approx_eq!(network.capacity(0, 1).max_flow, 0.5);
    }
}
