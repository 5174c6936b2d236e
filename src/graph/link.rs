use crate::classify::Junction;
use crate::{flow, CellId, CellSet, JunctionId};

/// A junction between cells, holding the flows resolved for the current
/// time step.
#[derive(Clone, Debug)]
pub struct Link {
    /// The link ID.
    id: JunctionId,
    /// The shape of the junction and the cells it connects.
    junction: Junction<CellId>,
    /// Vehicles offered by the outside world per time step. Border-in only.
    supply: f64,
    /// The flow leaving each upstream cell.
    outflow: [f64; 2],
    /// The flow entering each downstream cell.
    inflow: [f64; 2],
}

impl Link {
    /// Creates a new link.
    pub(crate) fn new(id: JunctionId, junction: Junction<CellId>) -> Self {
        Self {
            id,
            junction,
            supply: 0.0,
            outflow: [0.0; 2],
            inflow: [0.0; 2],
        }
    }

    pub fn id(&self) -> JunctionId {
        self.id
    }

    pub fn junction(&self) -> &Junction<CellId> {
        &self.junction
    }

    /// Sets the vehicles per time step offered to a border-in link.
    pub(crate) fn set_supply(&mut self, supply: f64) {
        self.supply = supply;
    }

    /// Resolves the flows across the link from the current cell states.
    pub(crate) fn resolve(&mut self, cells: &CellSet) {
        let (outflow, inflow) = match self.junction {
            Junction::Ordinary { from, to } => {
                let flow = flow::ordinary(cells[from].send(), cells[to].receive());
                ([flow, 0.0], [flow, 0.0])
            }
            Junction::Merge {
                from: [a, c],
                to,
                priorities,
            } => {
                let [flow_a, flow_c] =
                    flow::merge(cells[a].send(), cells[c].send(), cells[to].receive(), priorities);
                ([flow_a, flow_c], [flow_a + flow_c, 0.0])
            }
            Junction::Diverge {
                from,
                to: [b, c],
                priorities,
            } => {
                let flow = flow::diverge(cells[from].send(), cells[b].receive(), cells[c].receive(), priorities);
                ([flow.total, 0.0], flow.branches)
            }
            Junction::BorderIn { to } => {
                let flow = flow::border_in(self.supply, cells[to].max_flow());
                ([0.0; 2], [flow, 0.0])
            }
            // The sink's offer; the cell caps it once its inflow is known
            Junction::BorderOut { from } => ([cells[from].max_flow(), 0.0], [0.0; 2]),
        };
        self.outflow = outflow;
        self.inflow = inflow;
    }

    /// The resolved flow into the given cell.
    pub fn inflow_to(&self, cell: CellId) -> f64 {
        self.junction
            .downstream()
            .iter()
            .zip(self.inflow)
            .filter(|(id, _)| **id == cell)
            .map(|(_, flow)| flow)
            .sum()
    }

    /// The resolved flow out of the given cell. For a border-out link this
    /// is the sink's offer rather than the flow the cell realizes.
    pub fn outflow_from(&self, cell: CellId) -> f64 {
        self.junction
            .upstream()
            .iter()
            .zip(self.outflow)
            .filter(|(id, _)| **id == cell)
            .map(|(_, flow)| flow)
            .sum()
    }
}
