use smallvec::SmallVec;

use crate::classify::Junction;
use crate::discretize::{CellCapacity, CellSpec};
use crate::{flow, CellId, JunctionId, LinkSet};

/// A cell of the graph strategy.
#[derive(Clone, Debug)]
pub struct Cell {
    /// The cell ID.
    id: CellId,
    /// The index of the cell in the network.
    index: usize,
    /// The ratio of congestion wave speed to free-flow speed.
    delta: f64,
    /// The capacities for the current step.
    capacity: CellCapacity,
    /// The number of vehicles in the cell.
    occupancy: f64,
    /// The links feeding this cell.
    links_in: SmallVec<[JunctionId; 2]>,
    /// The links this cell feeds.
    links_out: SmallVec<[JunctionId; 2]>,
    /// Vehicles that entered during the last time step.
    inflow: f64,
    /// Vehicles that left during the last time step.
    outflow: f64,
}

impl Cell {
    /// Creates a new cell.
    pub(crate) fn new(id: CellId, index: usize, spec: &CellSpec, capacity: CellCapacity) -> Self {
        Self {
            id,
            index,
            delta: spec.delta,
            capacity,
            occupancy: spec.initial_occupancy,
            links_in: SmallVec::new(),
            links_out: SmallVec::new(),
            inflow: 0.0,
            outflow: 0.0,
        }
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    /// The index of the cell in the network.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn occupancy(&self) -> f64 {
        self.occupancy
    }

    pub fn lanes(&self) -> u32 {
        self.capacity.lanes
    }

    pub fn max_vehicle(&self) -> f64 {
        self.capacity.max_vehicle
    }

    pub fn max_flow(&self) -> f64 {
        self.capacity.max_flow
    }

    /// Vehicles that entered the cell during the last time step.
    pub fn inflow(&self) -> f64 {
        self.inflow
    }

    /// Vehicles that left the cell during the last time step.
    pub fn outflow(&self) -> f64 {
        self.outflow
    }

    /// The most the cell can send downstream this time step.
    pub fn send(&self) -> f64 {
        flow::send(self.capacity.max_flow, self.occupancy)
    }

    /// The most the cell can accept from upstream this time step.
    pub fn receive(&self) -> f64 {
        flow::receive(
            self.capacity.max_flow,
            self.delta,
            self.capacity.max_vehicle,
            self.occupancy,
        )
    }

    /// The links feeding this cell.
    pub fn links_in(&self) -> &[JunctionId] {
        &self.links_in
    }

    /// The links this cell feeds.
    pub fn links_out(&self) -> &[JunctionId] {
        &self.links_out
    }

    pub(crate) fn add_link_in(&mut self, link: JunctionId) {
        self.links_in.push(link);
    }

    pub(crate) fn add_link_out(&mut self, link: JunctionId) {
        self.links_out.push(link);
    }

    /// Sets the capacities for a new step, returning the number of
    /// vehicles that no longer fit.
    pub(crate) fn set_capacity(&mut self, capacity: CellCapacity) -> f64 {
        self.capacity = capacity;
        let excess = f64::max(0.0, self.occupancy - capacity.max_vehicle);
        if excess > 0.0 {
            self.occupancy = capacity.max_vehicle;
        }
        excess
    }

    /// Collects the resolved flows of the adjacent links and updates the
    /// occupancy. Returns false if the new occupancy is not finite.
    pub(crate) fn apply_flows(&mut self, links: &LinkSet) -> bool {
        self.inflow = self.links_in.iter().map(|id| links[*id].inflow_to(self.id)).sum();
        let available = self.occupancy + self.inflow;
        self.outflow = self
            .links_out
            .iter()
            .map(|id| {
                let link = &links[*id];
                let flow = link.outflow_from(self.id);
                match link.junction() {
                    Junction::BorderOut { .. } => flow::border_out(flow, available),
                    _ => flow,
                }
            })
            .sum();
        let occupancy = flow::next_occupancy(self.occupancy, self.inflow, self.outflow);
        if !occupancy.is_finite() {
            return false;
        }
        self.occupancy = occupancy.clamp(0.0, self.capacity.max_vehicle);
        true
    }

    /// The resolved flow through the cell.
    pub fn flow(&self) -> f64 {
        self.inflow.min(self.outflow).min(self.capacity.max_flow)
    }
}
