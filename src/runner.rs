//! Running a topology with several strategies in turn.

use std::time::{Duration, Instant};

use crate::config::Settings;
use crate::engine::Strategy;
use crate::error::Result;
use crate::recorder::Recorder;
use crate::simulation::Simulation;
use crate::topology::Topology;

/// The result of running one strategy.
#[derive(Debug)]
pub struct RunOutcome {
    pub strategy: Strategy,
    /// Wall time spent building and running.
    pub elapsed: Duration,
    /// The recorded frames, or why the run failed.
    pub result: Result<Recorder>,
}

impl RunOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Builds and runs the topology once per strategy.
///
/// A failing strategy is logged and skipped; the remaining strategies still run.
pub fn run_strategies(topology: &Topology, settings: &Settings, strategies: &[Strategy]) -> Vec<RunOutcome> {
    strategies
        .iter()
        .map(|&strategy| {
            let start = Instant::now();
            let result = run_one(topology, settings, strategy);
            let elapsed = start.elapsed();
            match &result {
                Ok(recorder) => log::info!(
                    "Strategy {} finished in {:.3}s with {} frames",
                    strategy,
                    elapsed.as_secs_f64(),
                    recorder.len()
                ),
                Err(err) => log::error!("Strategy {} failed: {}", strategy, err),
            }
            RunOutcome {
                strategy,
                elapsed,
                result,
            }
        })
        .collect()
}

fn run_one(topology: &Topology, settings: &Settings, strategy: Strategy) -> Result<Recorder> {
    log::info!("Running strategy {}", strategy);
    let mut sim = Simulation::from_topology(topology, settings, strategy)?;
    sim.run()?;
    Ok(sim.into_recorder())
}
