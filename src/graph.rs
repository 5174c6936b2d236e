//! The graph strategy: every cell and junction is an entity in an arena,
//! and each time step runs in two phases.

pub use cell::Cell;
pub use link::Link;

use crate::classify::Junction;
use crate::engine::{CellState, FlowEngine, Strategy};
use crate::error::{Error, Result};
use crate::network::Network;
use crate::{CellId, CellSet, JunctionId, LinkSet};

mod cell;
mod link;

/// Solves the network one junction at a time.
#[derive(Clone, Debug)]
pub struct GraphEngine {
    /// The cells of the network.
    cells: CellSet,
    /// The junctions between cells.
    links: LinkSet,
    /// The cell IDs, by network index.
    order: Vec<CellId>,
}

impl GraphEngine {
    /// Creates the cells and links of a network.
    pub fn new(network: &Network) -> Self {
        let mut cells = CellSet::with_capacity_and_key(network.cell_count());
        let order: Vec<CellId> = network
            .cells()
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let capacity = network.capacity(index, 0);
                cells.insert_with_key(|id| Cell::new(id, index, spec, capacity))
            })
            .collect();

        let mut links = LinkSet::with_capacity_and_key(network.junctions().len());
        for junction in network.junctions() {
            let junction = junction.map_cells(|index| order[index]);
            let (upstream, downstream) = (junction.upstream(), junction.downstream());
            let link_id = links.insert_with_key(|id| Link::new(id, junction));
            for cell in upstream {
                cells[cell].add_link_out(link_id);
            }
            for cell in downstream {
                cells[cell].add_link_in(link_id);
            }
        }

        Self { cells, links, order }
    }

    /// Gets the cell at the given network index.
    pub fn cell(&self, index: usize) -> &Cell {
        &self.cells[self.order[index]]
    }

    /// Gets a cell by its ID.
    pub fn get_cell(&self, id: CellId) -> &Cell {
        &self.cells[id]
    }

    /// Gets a link by its ID.
    pub fn link(&self, id: JunctionId) -> &Link {
        &self.links[id]
    }

    /// Returns an iterator over the cells, in network order.
    pub fn iter_cells(&self) -> impl Iterator<Item = &Cell> {
        self.order.iter().map(|id| &self.cells[*id])
    }

    /// Returns an iterator over all the links.
    pub fn iter_links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Resolves the flow across every link from the occupancies as they
    /// stand at the start of the step.
    fn resolve_links(&mut self) {
        for link in self.links.values_mut() {
            link.resolve(&self.cells);
        }
    }

    /// Applies the resolved flows to every cell.
    fn apply_flows(&mut self, second: u64) -> Result<()> {
        for id in &self.order {
            let cell = &mut self.cells[*id];
            if !cell.apply_flows(&self.links) {
                return Err(Error::Solver {
                    second,
                    cell: cell.index(),
                });
            }
        }
        Ok(())
    }
}

impl FlowEngine for GraphEngine {
    fn strategy(&self) -> Strategy {
        Strategy::Graph
    }

    fn refresh(&mut self, network: &Network, step: usize) -> f64 {
        let mut dropped = 0.0;
        for (index, id) in self.order.iter().enumerate() {
            dropped += self.cells[*id].set_capacity(network.capacity(index, step));
        }
        for link in self.links.values_mut() {
            if let Junction::BorderIn { to } = *link.junction() {
                let supply = network.border_inflow(self.cells[to].index(), step);
                link.set_supply(supply);
            }
        }
        dropped
    }

    fn advance(&mut self, second: u64) -> Result<()> {
        self.resolve_links();
        self.apply_flows(second)
    }

    fn snapshot(&self) -> CellState {
        let mut state = CellState::with_capacity(self.order.len());
        for cell in self.iter_cells() {
            state.occupancy.push(cell.occupancy());
            state.inflow.push(cell.inflow());
            state.outflow.push(cell.outflow());
            state.flow.push(cell.flow());
            state.max_vehicle.push(cell.max_vehicle());
            state.lanes.push(cell.lanes());
        }
        state
    }
}
