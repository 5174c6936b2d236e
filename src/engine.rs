//! The contract every solver strategy fulfils.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::GraphEngine;
use crate::network::Network;
use crate::vector::{DenseMatrix, SparseMatrix, VectorEngine};

/// The state of every cell at one instant, indexed by cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    /// Vehicles in the cell.
    pub occupancy: Vec<f64>,
    /// Vehicles that entered the cell during the last time step.
    pub inflow: Vec<f64>,
    /// Vehicles that left the cell during the last time step.
    pub outflow: Vec<f64>,
    /// The resolved flow through the cell, `min(inflow, outflow, max_flow)`.
    pub flow: Vec<f64>,
    pub max_vehicle: Vec<f64>,
    pub lanes: Vec<u32>,
}

impl CellState {
    /// Creates an empty state for `count` cells.
    pub fn with_capacity(count: usize) -> Self {
        Self {
            occupancy: Vec::with_capacity(count),
            inflow: Vec::with_capacity(count),
            outflow: Vec::with_capacity(count),
            flow: Vec::with_capacity(count),
            max_vehicle: Vec::with_capacity(count),
            lanes: Vec::with_capacity(count),
        }
    }

    /// The number of cells.
    pub fn len(&self) -> usize {
        self.occupancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy.is_empty()
    }

    /// The total number of vehicles in the network.
    pub fn total_occupancy(&self) -> f64 {
        self.occupancy.iter().sum()
    }
}

/// A solver that advances the cells of a [`Network`] through time.
///
/// Implementations keep their own copy of the cell state; the network is
/// only consulted when step-dependent parameters change.
pub trait FlowEngine {
    /// The strategy this engine implements.
    fn strategy(&self) -> Strategy;

    /// Applies the lane counts and border inflows of the given step,
    /// clamping occupancies to the new capacities.
    ///
    /// Returns the number of vehicles removed by the clamp.
    fn refresh(&mut self, network: &Network, step: usize) -> f64;

    /// Resolves every junction and updates every occupancy once.
    ///
    /// # Parameters
    /// * `second` - The simulated time, used in error reports.
    fn advance(&mut self, second: u64) -> Result<()>;

    /// Copies out the current state of every cell.
    fn snapshot(&self) -> CellState;
}

/// The available solver strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Explicit cells and junctions in arenas.
    Graph,
    /// Whole-array operations over a dense adjacency matrix.
    VectorDense,
    /// Whole-array operations over a sparse adjacency matrix.
    VectorSparse,
}

impl Strategy {
    /// Every strategy, graph first.
    pub const ALL: [Strategy; 3] = [Strategy::Graph, Strategy::VectorDense, Strategy::VectorSparse];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Graph => "graph",
            Strategy::VectorDense => "vector-dense",
            Strategy::VectorSparse => "vector-sparse",
        }
    }

    /// Creates an engine of this strategy for the network.
    pub fn load(self, network: &Network) -> Result<Box<dyn FlowEngine>> {
        Ok(match self {
            Strategy::Graph => Box::new(GraphEngine::new(network)),
            Strategy::VectorDense => Box::new(VectorEngine::<DenseMatrix>::new(network)?),
            Strategy::VectorSparse => Box::new(VectorEngine::<SparseMatrix>::new(network)?),
        })
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| Error::config("strategy", format!("unknown strategy \"{s}\"")))
    }
}
