//! Cross-checking strategies against each other.

use serde::Serialize;

use crate::engine::{CellState, Strategy};
use crate::error::{Error, Result};
use crate::network::Network;
use crate::recorder::Recorder;
use crate::simulation::Simulation;
use crate::util::relative_difference;

/// The relative tolerance strategies are expected to agree within.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// The most mismatches a report keeps.
const MAX_REPORTED: usize = 16;

/// A recorded quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Quantity {
    Occupancy,
    Inflow,
    Outflow,
    Flow,
    /// The number of recorded frames. `cell` is unused.
    Frames,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [Quantity::Occupancy, Quantity::Inflow, Quantity::Outflow, Quantity::Flow];

    fn values(self, state: &CellState) -> &[f64] {
        match self {
            Quantity::Occupancy => &state.occupancy,
            Quantity::Inflow => &state.inflow,
            Quantity::Outflow => &state.outflow,
            Quantity::Flow => &state.flow,
            Quantity::Frames => &[],
        }
    }
}

/// A value on which a strategy disagrees with the reference strategy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mismatch {
    pub strategy: Strategy,
    pub second: u64,
    pub cell: usize,
    pub quantity: Quantity,
    pub expected: f64,
    pub actual: f64,
}

/// The outcome of a comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConformanceReport {
    /// The strategy every other one was compared against.
    pub reference: Strategy,
    /// The strategies compared against the reference.
    pub compared: Vec<Strategy>,
    pub tolerance: f64,
    /// The largest relative difference seen.
    pub max_deviation: f64,
    /// The number of values outside the tolerance.
    pub mismatch_count: usize,
    /// The first few values outside the tolerance.
    pub mismatches: Vec<Mismatch>,
}

impl ConformanceReport {
    /// Whether every strategy agreed with the reference.
    pub fn is_conformant(&self) -> bool {
        self.mismatch_count == 0
    }
}

/// Runs every strategy on the network and compares each against the first.
///
/// # Parameters
/// * `network` - The network to simulate.
/// * `strategies` - The strategies to compare; must not be empty.
/// * `tolerance` - The relative tolerance, see [`DEFAULT_TOLERANCE`].
pub fn compare(network: &Network, strategies: &[Strategy], tolerance: f64) -> Result<ConformanceReport> {
    let recordings = strategies
        .iter()
        .map(|&strategy| {
            let mut sim = Simulation::new(network.clone(), strategy)?;
            sim.run()?;
            Ok((strategy, sim.into_recorder()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut recordings = recordings.into_iter();
    let (reference, expected) = recordings
        .next()
        .ok_or_else(|| Error::config("strategies", "nothing to compare"))?;

    let mut report = ConformanceReport {
        reference,
        compared: vec![],
        tolerance,
        max_deviation: 0.0,
        mismatch_count: 0,
        mismatches: vec![],
    };
    for (strategy, actual) in recordings {
        report.compared.push(strategy);
        compare_recordings(strategy, &expected, &actual, &mut report);
    }

    if report.is_conformant() {
        log::info!(
            "{} conforms to {} (max deviation {:e})",
            report.compared.iter().map(|s| s.name()).collect::<Vec<_>>().join(", "),
            reference,
            report.max_deviation
        );
    } else {
        log::warn!("{} values deviate from {}", report.mismatch_count, reference);
    }
    Ok(report)
}

fn compare_recordings(strategy: Strategy, expected: &Recorder, actual: &Recorder, report: &mut ConformanceReport) {
    for (want, got) in expected.frames().iter().zip(actual.frames()) {
        for quantity in Quantity::ALL {
            let values = quantity.values(&want.cells).iter().zip(quantity.values(&got.cells));
            for (cell, (&a, &b)) in values.enumerate() {
                let deviation = relative_difference(a, b);
                if deviation > report.tolerance || deviation.is_nan() {
                    report.mismatch_count += 1;
                    if report.mismatches.len() < MAX_REPORTED {
                        report.mismatches.push(Mismatch {
                            strategy,
                            second: want.second,
                            cell,
                            quantity,
                            expected: a,
                            actual: b,
                        });
                    }
                }
                report.max_deviation = f64::max(report.max_deviation, deviation);
            }
        }
    }

    let (want, got) = (expected.len(), actual.len());
    if want != got {
        let extra = if want > got { expected } else { actual };
        let second = extra.frames()[want.min(got)].second;
        report.mismatch_count += 1;
        if report.mismatches.len() < MAX_REPORTED {
            report.mismatches.push(Mismatch {
                strategy,
                second,
                cell: 0,
                quantity: Quantity::Frames,
                expected: want as f64,
                actual: got as f64,
            });
        }
        report.max_deviation = f64::max(report.max_deviation, relative_difference(want as f64, got as f64));
    }
}
