use std::fmt;

use crate::config::{Settings, SimOptions};
use crate::engine::{CellState, FlowEngine, Strategy};
use crate::error::{Error, Result};
use crate::network::Network;
use crate::recorder::Recorder;
use crate::topology::Topology;

/// The lifecycle of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Built, but no time step taken yet.
    Idle,
    Running,
    /// The whole horizon was simulated.
    Finished,
    /// A time step failed; no further steps are taken.
    Failed,
}

impl RunState {
    pub fn name(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Finished => "finished",
            RunState::Failed => "failed",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A traffic simulation.
pub struct Simulation {
    /// The network being simulated.
    network: Network,
    /// The solver.
    engine: Box<dyn FlowEngine>,
    /// The snapshots taken so far.
    recorder: Recorder,
    /// Where the run is in its lifecycle.
    state: RunState,
    /// The simulated time of the next time step in s.
    second: u64,
    /// The timing of the run.
    options: SimOptions,
}

impl Simulation {
    /// Creates a simulation of the network using the given strategy.
    pub fn new(network: Network, strategy: Strategy) -> Result<Self> {
        let engine = strategy.load(&network)?;
        Ok(Self {
            options: network.settings().simulation,
            recorder: Recorder::new(&network),
            network,
            engine,
            state: RunState::Idle,
            second: 0,
        })
    }

    /// Builds the network of a topology and creates a simulation of it.
    pub fn from_topology(topology: &Topology, settings: &Settings, strategy: Strategy) -> Result<Self> {
        Self::new(Network::build(topology, settings)?, strategy)
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn strategy(&self) -> Strategy {
        self.engine.strategy()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The simulated time of the next time step in s.
    pub fn second(&self) -> u64 {
        self.second
    }

    /// The snapshots taken so far.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Consumes the simulation, returning its snapshots.
    pub fn into_recorder(self) -> Recorder {
        self.recorder
    }

    /// The current state of every cell.
    pub fn snapshot(&self) -> CellState {
        self.engine.snapshot()
    }

    /// Advances the simulation by one time step.
    ///
    /// Returns `false` once the horizon has been reached.
    pub fn tick(&mut self) -> Result<bool> {
        match self.state {
            RunState::Finished | RunState::Failed => {
                return Err(Error::NotRunnable {
                    state: self.state.name(),
                })
            }
            RunState::Idle => self.state = RunState::Running,
            RunState::Running => {}
        }
        if self.second >= self.options.horizon_seconds() {
            self.state = RunState::Finished;
            return Ok(false);
        }

        if let Err(err) = self.step() {
            self.state = RunState::Failed;
            return Err(err);
        }

        self.second += self.options.time_step as u64;
        if self.second >= self.options.horizon_seconds() {
            self.state = RunState::Finished;
        }
        Ok(true)
    }

    /// Runs the simulation to the end of the horizon.
    pub fn run(&mut self) -> Result<&Recorder> {
        if matches!(self.state, RunState::Finished | RunState::Failed) {
            return Err(Error::NotRunnable {
                state: self.state.name(),
            });
        }
        while self.state != RunState::Finished {
            self.tick()?;
        }
        Ok(&self.recorder)
    }

    /// Refreshes parameters and records a snapshot where due, then solves
    /// one time step.
    fn step(&mut self) -> Result<()> {
        let t = self.second;
        let interval = self.options.step_interval as u64;
        let step = (t / interval) as usize;

        if t % interval == 0 {
            log::debug!("Refreshing parameters for step {} at t = {}s", step, t);
            let dropped = self.engine.refresh(&self.network, step);
            if dropped > 0.0 {
                log::warn!("Removed {:.3} vehicles exceeding capacity at step {}", dropped, step);
            }
        }
        if t % self.options.logging_interval as u64 == 0 {
            self.recorder.record(t, step, self.engine.snapshot());
        }
        self.engine.advance(t)
    }
}
