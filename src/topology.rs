//! The road network as it is handed to the engine: a set of segments and
//! the options of the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::config::{Settings, SimOptions};
use crate::error::{Error, Result, TopologyError};
use crate::schedule::ScheduleSpec;

/// The identifier of a road segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(pub u32);

/// A stretch of road between two junctions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Segment {
    /// A human readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The length of the segment in m.
    pub length: f64,
    /// The number of lanes, per step.
    pub lanes: ScheduleSpec<u32>,
    /// The free-flow speed in km/h.
    pub velocity_free: f64,
    /// The segments feeding into this one.
    #[serde(default, alias = "predecessor")]
    pub predecessors: ArrayVec<SegmentId, 2>,
    /// The segments this one feeds into.
    #[serde(default, alias = "successor")]
    pub successors: ArrayVec<SegmentId, 2>,
    /// The inflow entering the network at this segment in veh/h, per step.
    /// Required when the segment has no predecessors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_flow: Option<ScheduleSpec<f64>>,
    /// Priorities of the two predecessors where they merge into this segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_priorities: Option<[f64; 2]>,
    /// Priorities of the two successors where this segment splits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diverge_priorities: Option<[f64; 2]>,
    /// The number of vehicles in each cell when the run starts.
    #[serde(default)]
    pub initial_occupancy: f64,
}

/// A road network together with the options it should be simulated with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topology {
    /// Overrides the simulation options of the settings, if present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SimOptions>,
    /// The segments of the network.
    pub segments: BTreeMap<SegmentId, Segment>,
}

impl Segment {
    /// Creates a segment with no neighbours and no border flow.
    ///
    /// # Parameters
    /// * `length` - The length in m.
    /// * `lanes` - The lane count schedule.
    /// * `velocity_free` - The free-flow speed in km/h.
    pub fn new(length: f64, lanes: impl Into<ScheduleSpec<u32>>, velocity_free: f64) -> Self {
        Self {
            name: None,
            length,
            lanes: lanes.into(),
            velocity_free,
            predecessors: ArrayVec::new(),
            successors: ArrayVec::new(),
            border_flow: None,
            merge_priorities: None,
            diverge_priorities: None,
            initial_occupancy: 0.0,
        }
    }

    /// Sets the name of the segment.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the predecessors of the segment.
    ///
    /// # Panics
    /// Panics if more than two predecessors are given.
    pub fn with_predecessors(mut self, ids: &[u32]) -> Self {
        assert!(ids.len() <= 2, "A segment has at most two predecessors");
        self.predecessors = ids.iter().map(|&id| SegmentId(id)).collect();
        self
    }

    /// Sets the successors of the segment.
    ///
    /// # Panics
    /// Panics if more than two successors are given.
    pub fn with_successors(mut self, ids: &[u32]) -> Self {
        assert!(ids.len() <= 2, "A segment has at most two successors");
        self.successors = ids.iter().map(|&id| SegmentId(id)).collect();
        self
    }

    /// Sets the border inflow schedule in veh/h.
    pub fn with_border_flow(mut self, flow: impl Into<ScheduleSpec<f64>>) -> Self {
        self.border_flow = Some(flow.into());
        self
    }

    /// Sets the merge priorities, in predecessor order.
    pub fn with_merge_priorities(mut self, priorities: [f64; 2]) -> Self {
        self.merge_priorities = Some(priorities);
        self
    }

    /// Sets the diverge priorities, in successor order.
    pub fn with_diverge_priorities(mut self, priorities: [f64; 2]) -> Self {
        self.diverge_priorities = Some(priorities);
        self
    }

    /// Sets the number of vehicles initially in each cell.
    pub fn with_initial_occupancy(mut self, occupancy: f64) -> Self {
        self.initial_occupancy = occupancy;
        self
    }
}

impl Topology {
    /// Creates an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a segment, replacing any previous segment with the same ID.
    pub fn add_segment(&mut self, id: u32, segment: Segment) -> &mut Self {
        self.segments.insert(SegmentId(id), segment);
        self
    }

    /// Parses a topology from a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let topology: Self = serde_json::from_str(s)?;
        topology.check()?;
        Ok(topology)
    }

    /// Parses a topology from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Import(format!("cannot read \"{}\": {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    /// Serializes the topology as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The settings to run this topology with.
    pub fn effective_settings(&self, base: &Settings) -> Settings {
        let mut settings = base.clone();
        if let Some(options) = self.options {
            settings.simulation = options;
        }
        settings
    }

    /// Checks the segment set for problems that do not need discretization
    /// to detect.
    pub fn check(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(Error::Import("topology has no segments".into()));
        }
        for (&id, segment) in &self.segments {
            if !(segment.length.is_finite() && segment.length > 0.0) {
                return Err(Error::Import(format!("segment {} has a non-positive length", id.0)));
            }
            if !(segment.velocity_free.is_finite() && segment.velocity_free > 0.0) {
                return Err(Error::Import(format!(
                    "segment {} has a non-positive free-flow velocity",
                    id.0
                )));
            }
            if segment.predecessors.is_empty() && segment.border_flow.is_none() {
                return Err(Error::Import(format!(
                    "segment {} has no predecessors and no border flow",
                    id.0
                )));
            }
            for &other in segment.predecessors.iter().chain(&segment.successors) {
                if !self.segments.contains_key(&other) {
                    return Err(TopologyError::UnknownSegment {
                        segment: other,
                        referenced_by: id,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}
