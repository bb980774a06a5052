/*!
Results of a finished run.

The statistics vector has `d(d+3)/2 + 1` entries laid out contiguously:

| range                 | content                                   |
|-----------------------|-------------------------------------------|
| `0 .. d`              | `P(x_i = 1)` for each variable            |
| `d .. d + P`          | `P(x_k = 1, x_l = 1)` for each pair, in pair-table order |
| `d + P .. d + P + d + 1` | `P(K = k)` for population counts `k = 0..=d` |
*/

use ndarray::{s, Array1, Array2, ArrayView1};
use serde::Serialize;

use crate::errors::Result;
use crate::model::{num_pairs, PairTable};
use crate::stats::{EnergyMoments, RunningStatistics};

/// Everything a completed run hands back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplerOutput {
    dim: usize,
    statistics: Array1<f64>,
    final_state: Vec<bool>,
    energy: EnergyMoments,
    sweeps_averaged: usize,
    seed: Option<u64>,
}

impl SamplerOutput {
    pub(crate) fn assemble(
        dim: usize,
        running: RunningStatistics,
        final_state: Vec<bool>,
        seed: Option<u64>,
    ) -> Self {
        let energy = running.energy();
        let sweeps_averaged = running.sweeps();
        Self {
            dim,
            statistics: Array1::from(running.into_means()),
            final_state,
            energy,
            sweeps_averaged,
            seed,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The whole statistics vector.
    pub fn statistics(&self) -> ArrayView1<'_, f64> {
        self.statistics.view()
    }

    pub fn single_rates(&self) -> ArrayView1<'_, f64> {
        self.statistics.slice(s![..self.dim])
    }

    pub fn pair_rates(&self) -> ArrayView1<'_, f64> {
        self.statistics
            .slice(s![self.dim..self.dim + num_pairs(self.dim)])
    }

    pub fn population_histogram(&self) -> ArrayView1<'_, f64> {
        self.statistics
            .slice(s![self.dim + num_pairs(self.dim)..])
    }

    /// Configuration the chain ended in.
    pub fn final_state(&self) -> &[bool] {
        &self.final_state
    }

    pub fn final_state_f64(&self) -> Vec<f64> {
        self.final_state
            .iter()
            .map(|&b| if b { 1.0 } else { 0.0 })
            .collect()
    }

    /// `(E[E], E[E²])` over the collected sweeps.
    pub fn energy(&self) -> EnergyMoments {
        self.energy
    }

    pub fn energy_variance(&self) -> f64 {
        self.energy.variance()
    }

    /// Number of sweeps the estimates average over.
    pub fn sweeps_averaged(&self) -> usize {
        self.sweeps_averaged
    }

    /// Seed of the variate stream, when the run was driven by a seeded source.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Symmetric `d × d` matrix of `P(x_k = 1, x_l = 1) - P(x_k = 1) P(x_l = 1)`,
    /// with the single-variable variances on the diagonal.
    pub fn covariance(&self, pairs: &PairTable) -> Array2<f64> {
        let m = self.single_rates();
        let pair_rates = self.pair_rates();
        let mut cov = Array2::<f64>::zeros((self.dim, self.dim));
        for i in 0..self.dim {
            cov[[i, i]] = m[i] * (1.0 - m[i]);
        }
        for (p, (k, l)) in pairs.iter().enumerate() {
            let c = pair_rates[p] - m[k] * m[l];
            cov[[k, l]] = c;
            cov[[l, k]] = c;
        }
        cov
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
