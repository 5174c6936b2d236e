//! The vectorized strategy: every cell quantity is an array indexed by cell,
//! and junctions are resolved with matrix-vector products against the cell
//! adjacency matrix and a few selector matrices.

use ndarray::{Array1, Zip};

use crate::classify::{DegreeSource, Junction, JunctionClassifier, JunctionKind};
use crate::engine::{CellState, FlowEngine, Strategy};
use crate::error::{Error, Result};
use crate::flow;
use crate::network::Network;

pub use dense::DenseMatrix;
pub use sparse::SparseMatrix;

mod dense;
mod sparse;

/// A square matrix over cells holding only zeros and ones.
///
/// Rows are downstream cells and columns upstream cells, so the row of a
/// cell lists its inputs and the column lists its outputs.
pub trait CellMatrix: DegreeSource + Sized {
    /// The strategy an engine over this matrix type implements.
    const STRATEGY: Strategy;

    /// Creates an `n` × `n` matrix with a one at every `(row, col)` position.
    fn from_positions(n: usize, positions: &[(usize, usize)]) -> Self;

    /// Computes `M·x`.
    fn mul_vec(&self, x: &Array1<f64>) -> Array1<f64>;

    /// Computes `Mᵀ·x`.
    fn mul_vec_transposed(&self, x: &Array1<f64>) -> Array1<f64>;
}

/// Solves the network with whole-array operations.
#[derive(Clone, Debug)]
pub struct VectorEngine<M> {
    /// `A[to][from] = 1` for every link.
    adjacency: M,
    /// `P[a][c] = 1` where `a` and `c` merge into the same cell.
    partner: M,
    /// `D[a][b] = 1` where `b` is the first (second) branch of a diverge out of `a`.
    branches: [M; 2],
    /// The kind of junction each cell feeds into.
    outgoing: Vec<JunctionKind>,
    /// The merge priority of each merge input, zero elsewhere.
    priority: Array1<f64>,
    /// The diverge share of each diverge branch, one elsewhere.
    share: Array1<f64>,
    delta: Array1<f64>,
    max_vehicle: Array1<f64>,
    max_flow: Array1<f64>,
    lanes: Vec<u32>,
    /// Vehicles offered per time step to each border-in cell.
    supply: Array1<f64>,
    occupancy: Array1<f64>,
    inflow: Array1<f64>,
    outflow: Array1<f64>,
}

impl<M: CellMatrix> VectorEngine<M> {
    /// Builds the matrices of a network and classifies its cells from them.
    pub fn new(network: &Network) -> Result<Self> {
        let n = network.cell_count();
        let links: Vec<_> = network.adjacency().edges().iter().map(|&(from, to)| (to, from)).collect();
        let adjacency = M::from_positions(n, &links);

        let boundaries = network.boundaries();
        let classification = JunctionClassifier::new(&boundaries, network.splits()).classify(&adjacency)?;

        let mut outgoing = vec![JunctionKind::Ordinary; n];
        let mut priority = Array1::zeros(n);
        let mut share = Array1::ones(n);
        let mut partners = vec![];
        let mut branches = [vec![], vec![]];
        for junction in &classification.junctions {
            match *junction {
                Junction::Ordinary { from, .. } => outgoing[from] = JunctionKind::Ordinary,
                Junction::Merge {
                    from: [a, c],
                    priorities,
                    ..
                } => {
                    outgoing[a] = JunctionKind::Merge;
                    outgoing[c] = JunctionKind::Merge;
                    priority[a] = priorities[0];
                    priority[c] = priorities[1];
                    partners.extend([(a, c), (c, a)]);
                }
                Junction::Diverge { from, to, priorities } => {
                    outgoing[from] = JunctionKind::Diverge;
                    for i in 0..2 {
                        share[to[i]] = priorities[i];
                        branches[i].push((from, to[i]));
                    }
                }
                Junction::BorderIn { .. } => {}
                Junction::BorderOut { from } => outgoing[from] = JunctionKind::BorderOut,
            }
        }

        let capacities: Vec<_> = (0..n).map(|cell| network.capacity(cell, 0)).collect();
        Ok(Self {
            adjacency,
            partner: M::from_positions(n, &partners),
            branches: branches.map(|positions| M::from_positions(n, &positions)),
            outgoing,
            priority,
            share,
            delta: network.cells().iter().map(|c| c.delta).collect(),
            max_vehicle: capacities.iter().map(|c| c.max_vehicle).collect(),
            max_flow: capacities.iter().map(|c| c.max_flow).collect(),
            lanes: capacities.iter().map(|c| c.lanes).collect(),
            supply: Array1::zeros(n),
            occupancy: Array1::from(network.initial_occupancy()),
            inflow: Array1::zeros(n),
            outflow: Array1::zeros(n),
        })
    }

    /// The current occupancy of every cell.
    pub fn occupancy(&self) -> &Array1<f64> {
        &self.occupancy
    }

    /// The kind of junction each cell feeds into.
    pub fn outgoing(&self) -> &[JunctionKind] {
        &self.outgoing
    }

    /// The flow out of every cell for the current occupancies. Exit cells
    /// get the sink's offer, capped in [`FlowEngine::advance`].
    fn resolve_flows(&self) -> Array1<f64> {
        let send = Zip::from(&self.max_flow)
            .and(&self.occupancy)
            .map_collect(|&max_flow, &occupancy| flow::send(max_flow, occupancy));
        let receive = Zip::from(&self.max_flow)
            .and(&self.delta)
            .and(&self.max_vehicle)
            .and(&self.occupancy)
            .map_collect(|&max_flow, &delta, &max_vehicle, &occupancy| {
                flow::receive(max_flow, delta, max_vehicle, occupancy)
            });

        // The supply of each cell's downstream neighbour
        let downstream = self.adjacency.mul_vec_transposed(&receive);

        let ordinary = Zip::from(&send)
            .and(&downstream)
            .map_collect(|&send, &receive| flow::ordinary(send, receive));

        let partner_send = self.partner.mul_vec(&send);
        let merge = Zip::from(&send)
            .and(&partner_send)
            .and(&downstream)
            .and(&self.priority)
            .map_collect(|&own, &partner, &receive, &priority| {
                if flow::merge_unconstrained(own, partner, receive) {
                    own
                } else {
                    flow::merge_share(own, partner, receive, priority)
                }
            });

        let scaled = &receive / &self.share;
        let [first, second] = &self.branches;
        let receive_b = first.mul_vec(&scaled);
        let receive_c = second.mul_vec(&scaled);
        let diverge = Zip::from(&send)
            .and(&receive_b)
            .and(&receive_c)
            .map_collect(|&send, &b, &c| flow::diverge_total(send, b, c));

        self.outgoing
            .iter()
            .enumerate()
            .map(|(cell, kind)| match kind {
                JunctionKind::Merge => merge[cell],
                JunctionKind::Diverge => diverge[cell],
                JunctionKind::BorderOut => self.max_flow[cell],
                JunctionKind::Ordinary | JunctionKind::BorderIn => ordinary[cell],
            })
            .collect()
    }
}

impl<M: CellMatrix> FlowEngine for VectorEngine<M> {
    fn strategy(&self) -> Strategy {
        M::STRATEGY
    }

    fn refresh(&mut self, network: &Network, step: usize) -> f64 {
        let mut dropped = 0.0;
        for cell in 0..self.lanes.len() {
            let capacity = network.capacity(cell, step);
            self.lanes[cell] = capacity.lanes;
            self.max_vehicle[cell] = capacity.max_vehicle;
            self.max_flow[cell] = capacity.max_flow;
            self.supply[cell] = network.border_inflow(cell, step);

            let excess = f64::max(0.0, self.occupancy[cell] - capacity.max_vehicle);
            if excess > 0.0 {
                self.occupancy[cell] = capacity.max_vehicle;
            }
            dropped += excess;
        }
        dropped
    }

    fn advance(&mut self, second: u64) -> Result<()> {
        let outflow = self.resolve_flows();
        let border = Zip::from(&self.supply)
            .and(&self.max_flow)
            .map_collect(|&supply, &max_flow| flow::border_in(supply, max_flow));
        let inflow = &self.share * &self.adjacency.mul_vec(&outflow) + &border;

        // Exit cells feed nothing, so their outflow can be capped after inflow
        let mut outflow = outflow;
        for (cell, kind) in self.outgoing.iter().enumerate() {
            if *kind == JunctionKind::BorderOut {
                let available = self.occupancy[cell] + inflow[cell];
                outflow[cell] = flow::border_out(outflow[cell], available);
            }
        }

        let mut occupancy = Zip::from(&self.occupancy)
            .and(&inflow)
            .and(&outflow)
            .map_collect(|&occupancy, &inflow, &outflow| flow::next_occupancy(occupancy, inflow, outflow));
        if let Some(cell) = occupancy.iter().position(|o| !o.is_finite()) {
            return Err(Error::Solver { second, cell });
        }
        occupancy.zip_mut_with(&self.max_vehicle, |o, &max_vehicle| *o = o.clamp(0.0, max_vehicle));

        self.occupancy = occupancy;
        self.inflow = inflow;
        self.outflow = outflow;
        Ok(())
    }

    fn snapshot(&self) -> CellState {
        let flow = Zip::from(&self.inflow)
            .and(&self.outflow)
            .and(&self.max_flow)
            .map_collect(|&inflow, &outflow, &max_flow| inflow.min(outflow).min(max_flow));
        CellState {
            occupancy: self.occupancy.to_vec(),
            inflow: self.inflow.to_vec(),
            outflow: self.outflow.to_vec(),
            flow: flow.to_vec(),
            max_vehicle: self.max_vehicle.to_vec(),
            lanes: self.lanes.clone(),
        }
    }
}
