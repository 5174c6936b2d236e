//! Classification of the cell adjacency into typed junctions.

use std::collections::HashMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::discretize::Boundary;
use crate::error::TopologyError;

/// The neighbours of a cell, in ascending index order.
pub type Neighbours = SmallVec<[usize; 2]>;

/// Structural queries over a cell adjacency relation.
///
/// Implemented by [`Adjacency`] for the graph strategy and by the adjacency
/// matrices of the vectorized strategy, so that every strategy classifies
/// its own representation with the same rules.
pub trait DegreeSource {
    /// The number of cells.
    fn cell_count(&self) -> usize;

    /// The cells with a link into `cell`.
    fn upstream(&self, cell: usize) -> Neighbours;

    /// The cells `cell` has a link into.
    fn downstream(&self, cell: usize) -> Neighbours;

    fn in_degree(&self, cell: usize) -> usize {
        self.upstream(cell).len()
    }

    fn out_degree(&self, cell: usize) -> usize {
        self.downstream(cell).len()
    }
}

/// A cell adjacency relation stored as neighbour lists.
#[derive(Clone, Debug, Default)]
pub struct Adjacency {
    upstream: Vec<Neighbours>,
    downstream: Vec<Neighbours>,
    edges: Vec<(usize, usize)>,
}

impl Adjacency {
    /// Creates the adjacency of `cell_count` cells from `(from, to)` links.
    /// Duplicate links are ignored.
    pub fn new(cell_count: usize, links: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut adjacency = Self {
            upstream: vec![Neighbours::new(); cell_count],
            downstream: vec![Neighbours::new(); cell_count],
            edges: vec![],
        };
        for (from, to) in links {
            adjacency.insert(from, to);
        }
        adjacency
    }

    /// Adds a link, returning false if it was already present.
    pub fn insert(&mut self, from: usize, to: usize) -> bool {
        let down = &mut self.downstream[from];
        if down.contains(&to) {
            return false;
        }
        let at = down.partition_point(|&c| c < to);
        down.insert(at, to);
        let up = &mut self.upstream[to];
        let at = up.partition_point(|&c| c < from);
        up.insert(at, from);
        self.edges.push((from, to));
        true
    }

    /// Every link, in insertion order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }
}

impl DegreeSource for Adjacency {
    fn cell_count(&self) -> usize {
        self.upstream.len()
    }

    fn upstream(&self, cell: usize) -> Neighbours {
        self.upstream[cell].clone()
    }

    fn downstream(&self, cell: usize) -> Neighbours {
        self.downstream[cell].clone()
    }

    fn in_degree(&self, cell: usize) -> usize {
        self.upstream[cell].len()
    }

    fn out_degree(&self, cell: usize) -> usize {
        self.downstream[cell].len()
    }
}

/// The five shapes of junction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JunctionKind {
    Ordinary,
    Merge,
    Diverge,
    BorderIn,
    BorderOut,
}

impl JunctionKind {
    pub fn name(self) -> &'static str {
        match self {
            JunctionKind::Ordinary => "ordinary",
            JunctionKind::Merge => "merge",
            JunctionKind::Diverge => "diverge",
            JunctionKind::BorderIn => "border-in",
            JunctionKind::BorderOut => "border-out",
        }
    }
}

/// A typed relation between cells.
///
/// Generic over the way cells are referred to: dense indices by default,
/// arena keys in the graph strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Junction<C = usize> {
    /// One cell feeding another.
    Ordinary { from: C, to: C },
    /// Two cells feeding one, with the priority of each input.
    Merge {
        from: [C; 2],
        to: C,
        priorities: [f64; 2],
    },
    /// One cell feeding two, with the share of each output.
    Diverge {
        from: C,
        to: [C; 2],
        priorities: [f64; 2],
    },
    /// Vehicles entering the network.
    BorderIn { to: C },
    /// Vehicles leaving the network.
    BorderOut { from: C },
}

impl<C: Copy> Junction<C> {
    /// The shape of the junction.
    pub fn kind(&self) -> JunctionKind {
        match self {
            Junction::Ordinary { .. } => JunctionKind::Ordinary,
            Junction::Merge { .. } => JunctionKind::Merge,
            Junction::Diverge { .. } => JunctionKind::Diverge,
            Junction::BorderIn { .. } => JunctionKind::BorderIn,
            Junction::BorderOut { .. } => JunctionKind::BorderOut,
        }
    }

    /// The cells feeding the junction.
    pub fn upstream(&self) -> SmallVec<[C; 2]> {
        match *self {
            Junction::Ordinary { from, .. } => smallvec::smallvec![from],
            Junction::Merge { from, .. } => SmallVec::from_buf(from),
            Junction::Diverge { from, .. } => smallvec::smallvec![from],
            Junction::BorderIn { .. } => SmallVec::new(),
            Junction::BorderOut { from } => smallvec::smallvec![from],
        }
    }

    /// The cells fed by the junction.
    pub fn downstream(&self) -> SmallVec<[C; 2]> {
        match *self {
            Junction::Ordinary { to, .. } => smallvec::smallvec![to],
            Junction::Merge { to, .. } => smallvec::smallvec![to],
            Junction::Diverge { to, .. } => SmallVec::from_buf(to),
            Junction::BorderIn { to } => smallvec::smallvec![to],
            Junction::BorderOut { .. } => SmallVec::new(),
        }
    }

    /// Converts the cell references of the junction.
    pub fn map_cells<D>(&self, mut f: impl FnMut(C) -> D) -> Junction<D> {
        match *self {
            Junction::Ordinary { from, to } => Junction::Ordinary {
                from: f(from),
                to: f(to),
            },
            Junction::Merge {
                from,
                to,
                priorities,
            } => Junction::Merge {
                from: [f(from[0]), f(from[1])],
                to: f(to),
                priorities,
            },
            Junction::Diverge {
                from,
                to,
                priorities,
            } => Junction::Diverge {
                from: f(from),
                to: [f(to[0]), f(to[1])],
                priorities,
            },
            Junction::BorderIn { to } => Junction::BorderIn { to: f(to) },
            Junction::BorderOut { from } => Junction::BorderOut { from: f(from) },
        }
    }
}

/// The priorities of merging and diverging links, keyed by `(from, to)`.
/// Links without an entry get an even split.
#[derive(Clone, Debug, Default)]
pub struct SplitTable {
    merge: HashMap<(usize, usize), f64>,
    diverge: HashMap<(usize, usize), f64>,
}

impl SplitTable {
    /// The share of a link with no explicit priority.
    pub const EVEN: f64 = 0.5;

    pub fn set_merge(&mut self, from: usize, to: usize, priority: f64) {
        self.merge.insert((from, to), priority);
    }

    pub fn set_diverge(&mut self, from: usize, to: usize, priority: f64) {
        self.diverge.insert((from, to), priority);
    }

    /// The priority of `from` at the merge into `to`.
    pub fn merge(&self, from: usize, to: usize) -> f64 {
        self.merge.get(&(from, to)).copied().unwrap_or(Self::EVEN)
    }

    /// The share of the diverge out of `from` that goes into `to`.
    pub fn diverge(&self, from: usize, to: usize) -> f64 {
        self.diverge.get(&(from, to)).copied().unwrap_or(Self::EVEN)
    }
}

/// The result of classifying a network.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    /// The shape each cell takes part in.
    pub roles: Vec<JunctionKind>,
    /// Every junction of the network.
    pub junctions: Vec<Junction>,
}

impl Classification {
    /// The number of junctions of each kind.
    pub fn counts(&self) -> HashMap<JunctionKind, usize> {
        self.junctions.iter().map(Junction::kind).counts()
    }
}

/// Assigns each cell and link a junction shape from the in- and out-degrees
/// of the adjacency.
pub struct JunctionClassifier<'a> {
    boundaries: &'a [Boundary],
    splits: &'a SplitTable,
}

impl<'a> JunctionClassifier<'a> {
    /// Creates a classifier.
    ///
    /// # Parameters
    /// * `boundaries` - The boundary flag of each cell, as set by the discretizer.
    /// * `splits` - The merge and diverge priorities.
    pub fn new(boundaries: &'a [Boundary], splits: &'a SplitTable) -> Self {
        Self { boundaries, splits }
    }

    /// The shape a single cell takes part in.
    pub fn role<S: DegreeSource + ?Sized>(source: &S, cell: usize) -> Result<JunctionKind, TopologyError> {
        let in_degree = source.in_degree(cell);
        let out_degree = source.out_degree(cell);
        if in_degree > 2 || out_degree > 2 {
            return Err(TopologyError::NoClassification { cell });
        }

        let shapes = [
            (JunctionKind::Diverge, out_degree == 2),
            (JunctionKind::Merge, in_degree == 2),
            (JunctionKind::BorderIn, in_degree == 0),
            (JunctionKind::BorderOut, out_degree == 0 && in_degree > 0),
            (JunctionKind::Ordinary, in_degree == 1 && out_degree == 1),
        ];
        let matches: SmallVec<[JunctionKind; 2]> =
            shapes.iter().filter(|(_, hit)| *hit).map(|(kind, _)| *kind).collect();

        match matches.as_slice() {
            [] => Err(TopologyError::NoClassification { cell }),
            [kind] => Ok(*kind),
            _ => Err(TopologyError::AmbiguousClassification {
                cell,
                matches: matches.iter().map(|k| k.name()).join(", "),
            }),
        }
    }

    /// Classifies every cell and link of the adjacency.
    pub fn classify<S: DegreeSource + ?Sized>(&self, source: &S) -> Result<Classification, TopologyError> {
        let count = source.cell_count();
        let roles = (0..count)
            .map(|cell| Self::role(source, cell))
            .collect::<Result<Vec<_>, _>>()?;

        for (cell, (&role, &boundary)) in roles.iter().zip(self.boundaries).enumerate() {
            let expected = match boundary {
                Boundary::Inflow => JunctionKind::BorderIn,
                Boundary::Outflow => JunctionKind::BorderOut,
                Boundary::Interior => role,
            };
            let stray_border = boundary == Boundary::Interior
                && matches!(role, JunctionKind::BorderIn | JunctionKind::BorderOut);
            if role != expected || stray_border {
                return Err(TopologyError::BoundaryMismatch {
                    cell,
                    expected: match boundary {
                        Boundary::Inflow => "border-in",
                        Boundary::Outflow => "border-out",
                        Boundary::Interior => "interior",
                    },
                });
            }
        }

        let mut junctions = Vec::with_capacity(count);
        for (cell, &role) in roles.iter().enumerate() {
            match role {
                JunctionKind::BorderIn => junctions.push(Junction::BorderIn { to: cell }),
                JunctionKind::BorderOut => junctions.push(Junction::BorderOut { from: cell }),
                JunctionKind::Merge => {
                    let up = source.upstream(cell);
                    let from = [up[0], up[1]];
                    junctions.push(Junction::Merge {
                        from,
                        to: cell,
                        priorities: from.map(|f| self.splits.merge(f, cell)),
                    });
                }
                JunctionKind::Diverge => {
                    let down = source.downstream(cell);
                    let to = [down[0], down[1]];
                    if let Some(&target) = to.iter().find(|&&t| source.in_degree(t) == 2) {
                        return Err(TopologyError::EdgeConflict { from: cell, to: target });
                    }
                    junctions.push(Junction::Diverge {
                        from: cell,
                        to,
                        priorities: to.map(|t| self.splits.diverge(cell, t)),
                    });
                }
                JunctionKind::Ordinary => {}
            }

            // Single outgoing links not absorbed by a merge
            if source.out_degree(cell) == 1 {
                let to = source.downstream(cell)[0];
                if source.in_degree(to) == 1 {
                    junctions.push(Junction::Ordinary { from: cell, to });
                }
            }
        }

        Ok(Classification { roles, junctions })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn classify(count: usize, links: &[(usize, usize)]) -> Result<Classification, TopologyError> {
        let adjacency = Adjacency::new(count, links.iter().copied());
        let boundaries: Vec<_> = (0..count)
            .map(|c| match (adjacency.in_degree(c), adjacency.out_degree(c)) {
                (0, _) => Boundary::Inflow,
                (_, 0) => Boundary::Outflow,
                _ => Boundary::Interior,
            })
            .collect();
        JunctionClassifier::new(&boundaries, &SplitTable::default()).classify(&adjacency)
    }

    #[test]
    fn chain() {
        let result = classify(3, &[(0, 1), (1, 2)]).unwrap();
        use JunctionKind::*;
        assert_eq!(result.roles, vec![BorderIn, Ordinary, BorderOut]);
        assert_eq!(
            result.junctions,
            vec![
                Junction::BorderIn { to: 0 },
                Junction::Ordinary { from: 0, to: 1 },
                Junction::Ordinary { from: 1, to: 2 },
                Junction::BorderOut { from: 2 },
            ]
        );
    }

    #[test]
    fn merge_partners_are_ordered() {
        // 3 -> 4 <- 1, with 0 -> 1 and 2 -> 3 feeding them
        let result = classify(6, &[(0, 1), (2, 3), (3, 4), (1, 4), (4, 5)]).unwrap();
        assert_eq!(result.roles[4], JunctionKind::Merge);
        assert!(result.junctions.contains(&Junction::Merge {
            from: [1, 3],
            to: 4,
            priorities: [0.5, 0.5]
        }));
        assert_eq!(result.counts()[&JunctionKind::Merge], 1);
        assert_eq!(result.counts()[&JunctionKind::Ordinary], 3);
    }

    #[test]
    fn diverge_uses_split_table() {
        let adjacency = Adjacency::new(5, [(0, 1), (1, 2), (1, 3), (3, 4)]);
        let boundaries = [
            Boundary::Inflow,
            Boundary::Interior,
            Boundary::Outflow,
            Boundary::Interior,
            Boundary::Outflow,
        ];
        let mut splits = SplitTable::default();
        splits.set_diverge(1, 2, 0.25);
        splits.set_diverge(1, 3, 0.75);
        let result = JunctionClassifier::new(&boundaries, &splits).classify(&adjacency).unwrap();
        assert!(result.junctions.contains(&Junction::Diverge {
            from: 1,
            to: [2, 3],
            priorities: [0.25, 0.75]
        }));
    }

    #[test]
    fn merge_and_diverge_in_one_cell_is_ambiguous() {
        let err = classify(6, &[(0, 2), (1, 2), (2, 3), (2, 4), (3, 5)]).unwrap_err();
        assert!(matches!(err, TopologyError::AmbiguousClassification { cell: 2, .. }));
    }

    #[test]
    fn three_inputs_have_no_classification() {
        let err = classify(5, &[(0, 3), (1, 3), (2, 3), (3, 4)]).unwrap_err();
        assert_eq!(err, TopologyError::NoClassification { cell: 3 });
    }

    #[test]
    fn diverge_into_merge_is_a_conflict() {
        // 1 splits into 2 and 3; 3 is also fed by 4
        let err = classify(7, &[(0, 1), (1, 2), (1, 3), (4, 3), (5, 4), (3, 6)]).unwrap_err();
        assert_eq!(err, TopologyError::EdgeConflict { from: 1, to: 3 });
    }

    #[test]
    fn boundary_flags_must_agree() {
        let adjacency = Adjacency::new(3, [(0, 1), (1, 2)]);
        let boundaries = [Boundary::Interior, Boundary::Interior, Boundary::Outflow];
        let err = JunctionClassifier::new(&boundaries, &SplitTable::default())
            .classify(&adjacency)
            .unwrap_err();
        assert_eq!(
            err,
            TopologyError::BoundaryMismatch {
                cell: 0,
                expected: "interior"
            }
        );
    }

    #[test]
    fn duplicate_links_are_ignored() {
        let mut adjacency = Adjacency::new(2, [(0, 1)]);
        assert!(!adjacency.insert(0, 1));
        assert_eq!(adjacency.edges(), &[(0, 1)]);
        assert_eq!(adjacency.in_degree(1), 1);
    }
}
