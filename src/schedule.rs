//! Step-indexed parameter schedules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A schedule as written in a topology document.
///
/// Step keys are zero-based step indices. They are kept as strings so that
/// both JSON object keys and integer-like keys from other formats parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScheduleSpec<T> {
    /// The same value for every step.
    Constant(T),
    /// Sparse `{step: value}` overrides.
    Overrides(BTreeMap<String, T>),
    /// Sparse overrides as a list of single-entry maps.
    OverrideList(Vec<BTreeMap<String, T>>),
}

/// A dense, forward-filled schedule with one value per step.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule<T> {
    values: Vec<T>,
}

impl<T> From<T> for ScheduleSpec<T> {
    fn from(value: T) -> Self {
        ScheduleSpec::Constant(value)
    }
}

impl<T: Copy> ScheduleSpec<T> {
    /// Creates a spec from `(step, value)` overrides.
    pub fn overrides(entries: impl IntoIterator<Item = (usize, T)>) -> Self {
        ScheduleSpec::Overrides(
            entries
                .into_iter()
                .map(|(step, value)| (step.to_string(), value))
                .collect(),
        )
    }

    /// Expands the spec into a schedule covering `horizon` steps.
    ///
    /// `what` names the schedule in error messages.
    pub fn build(&self, horizon: usize, what: &str) -> Result<Schedule<T>> {
        match self {
            ScheduleSpec::Constant(value) => Schedule::constant(*value, horizon),
            ScheduleSpec::Overrides(map) => {
                let entries = map
                    .iter()
                    .map(|(key, value)| Ok((parse_step(key, what)?, *value)))
                    .collect::<Result<Vec<_>>>()?;
                Schedule::from_overrides(entries, horizon, what)
            }
            ScheduleSpec::OverrideList(list) => {
                let entries = list
                    .iter()
                    .flatten()
                    .map(|(key, value)| Ok((parse_step(key, what)?, *value)))
                    .collect::<Result<Vec<_>>>()?;
                Schedule::from_overrides(entries, horizon, what)
            }
        }
    }
}

impl<T: Copy> Schedule<T> {
    /// Creates a schedule holding `value` for every step.
    pub fn constant(value: T, horizon: usize) -> Result<Self> {
        if horizon == 0 {
            return Err(Error::config("simulation.total_steps", "must be > 0"));
        }
        Ok(Self {
            values: vec![value; horizon],
        })
    }

    /// Creates a schedule by forward-filling sparse overrides.
    ///
    /// Steps before the first override take the first override's value.
    /// Later entries for the same step replace earlier ones.
    pub fn from_overrides(
        entries: impl IntoIterator<Item = (usize, T)>,
        horizon: usize,
        what: &str,
    ) -> Result<Self> {
        if horizon == 0 {
            return Err(Error::config("simulation.total_steps", "must be > 0"));
        }
        let overrides: BTreeMap<usize, T> = entries.into_iter().collect();
        if let Some((&index, _)) = overrides.range(horizon..).next() {
            return Err(Error::BoundaryIndex {
                what: what.to_string(),
                index,
                horizon,
            });
        }
        let mut current = *overrides
            .values()
            .next()
            .ok_or_else(|| Error::Import(format!("{what} has no values")))?;

        let values = (0..horizon)
            .map(|step| {
                if let Some(value) = overrides.get(&step) {
                    current = *value;
                }
                current
            })
            .collect();
        Ok(Self { values })
    }

    /// Gets the value at the given step. Steps past the horizon hold the last value.
    pub fn at(&self, step: usize) -> T {
        self.values[usize::min(step, self.values.len() - 1)]
    }

    /// The number of steps covered by the schedule.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the schedule covers no steps. Never true for a built schedule.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value of every step.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Converts every value of the schedule.
    pub fn map<U>(&self, f: impl Fn(T) -> U) -> Schedule<U> {
        Schedule {
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }
}

fn parse_step(key: &str, what: &str) -> Result<usize> {
    key.trim()
        .parse()
        .map_err(|_| Error::Import(format!("{what}: \"{key}\" is not a step index")))
}
