//! The binary configuration a chain is currently at.

use num_traits::ToPrimitive;

use crate::errors::{Result, SamplerError};

/// Current configuration plus its population count `K`.
///
/// Only the sweep engine mutates a `ChainState`, and it does so through
/// [`ChainState::set_pair`], which keeps the count in step with the vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainState {
    x: Vec<bool>,
    population: usize,
}

impl ChainState {
    pub fn new(x: Vec<bool>) -> Self {
        let population = x.iter().filter(|&&b| b).count();
        Self { x, population }
    }

    /// Reads a host vector where `1` marks an active variable and anything
    /// else an inactive one.
    pub fn from_numeric<T: ToPrimitive>(values: &[T]) -> Result<Self> {
        let x = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.to_f64().map(|f| f == 1.0).ok_or_else(|| {
                    SamplerError::config("initial state", format!("entry {i} is not numeric"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(x))
    }

    /// All variables inactive.
    pub fn zeros(dim: usize) -> Self {
        Self::new(vec![false; dim])
    }

    pub fn dim(&self) -> usize {
        self.x.len()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.x
    }

    pub fn population(&self) -> usize {
        self.population
    }

    pub fn is_active(&self, var: usize) -> bool {
        self.x[var]
    }

    /// Overwrites two variables and adjusts the population count.
    pub fn set_pair(&mut self, k: usize, l: usize, xk: bool, xl: bool) {
        for (var, value) in [(k, xk), (l, xl)] {
            match (self.x[var], value) {
                (false, true) => self.population += 1,
                (true, false) => self.population -= 1,
                _ => {}
            }
            self.x[var] = value;
        }
    }

    /// Recounts the active entries and compares with the tracked count.
    pub fn check_population(&self) -> Result<()> {
        let counted = self.x.iter().filter(|&&b| b).count();
        if counted != self.population {
            return Err(SamplerError::Invariant(format!(
                "population count {} but {counted} variables are active",
                self.population
            )));
        }
        Ok(())
    }

    /// The configuration as `0.0` / `1.0`.
    pub fn to_f64(&self) -> Vec<f64> {
        self.x.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()
    }

    pub fn into_inner(self) -> Vec<bool> {
        self.x
    }
}
