//! Global simulation options and model constants.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Settings shared by every strategy. Load from TOML with
/// [`Settings::from_toml_file`] or start from [`Settings::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Timing of the simulation.
    pub simulation: SimOptions,
    /// Constants of the traffic model.
    pub constants: CtmConstants,
}

/// Timing of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimOptions {
    /// Number of parameter steps (e.g. hours) to simulate.
    pub total_steps: usize,
    /// Length of one parameter step in seconds.
    pub step_interval: u32,
    /// Length of one flow update in seconds.
    pub time_step: u32,
    /// Seconds between two recorded snapshots.
    pub logging_interval: u32,
}

/// Constants of the cell transmission model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CtmConstants {
    /// Space occupied by one vehicle in a jam, in m.
    pub car_length: f64,
    /// Capacity of a single lane in veh/h.
    pub flow_per_lane: f64,
    /// Speed of the backward congestion wave in m/s.
    pub wave_coefficient: f64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            total_steps: 24,
            step_interval: 3600,
            time_step: 1,
            logging_interval: 3600,
        }
    }
}

impl Default for CtmConstants {
    fn default() -> Self {
        Self {
            car_length: 6.0,
            flow_per_lane: 1800.0,
            wave_coefficient: 18.5,
        }
    }
}

impl SimOptions {
    /// The total simulated time in seconds.
    pub fn horizon_seconds(&self) -> u64 {
        self.total_steps as u64 * self.step_interval as u64
    }

    /// The number of snapshots a full run records.
    pub fn frame_count(&self) -> usize {
        let interval = self.logging_interval.max(1) as u64;
        ((self.horizon_seconds() + interval - 1) / interval) as usize
    }
}

impl Settings {
    /// Parses settings from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: Self = toml::from_str(s).map_err(|e| Error::config("toml", e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config("settings", format!("cannot read \"{}\": {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Checks that the settings describe a runnable simulation.
    pub fn validate(&self) -> Result<()> {
        let s = &self.simulation;
        if s.total_steps == 0 {
            return Err(Error::config("simulation.total_steps", "must be > 0"));
        }
        if s.time_step == 0 {
            return Err(Error::config("simulation.time_step", "must be > 0"));
        }
        if s.step_interval == 0 || s.step_interval % s.time_step != 0 {
            return Err(Error::config(
                "simulation.step_interval",
                "must be a positive multiple of simulation.time_step",
            ));
        }
        if s.logging_interval == 0 || s.logging_interval % s.time_step != 0 {
            return Err(Error::config(
                "simulation.logging_interval",
                "must be a positive multiple of simulation.time_step",
            ));
        }

        let c = &self.constants;
        for (field, value) in [
            ("constants.car_length", c.car_length),
            ("constants.flow_per_lane", c.flow_per_lane),
            ("constants.wave_coefficient", c.wave_coefficient),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::config(field, "must be a positive number"));
            }
        }
        Ok(())
    }
}
