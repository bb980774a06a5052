//! Accumulation of per-sweep tallies into long-run averages.
//!
//! Sweeps after burn-in are summed into a [`BlockAccumulator`]. Every
//! `block_size` sweeps the [`AveragingController`] folds the block into the
//! [`RunningStatistics`] with the weighted-mean update
//!
//! ```text
//! mean_i = ((i - n_block) · mean_{i - n_block} + block_sum) / i
//! ```
//!
//! and clears the block, so the stored values stay on the scale of a mean no
//! matter how long the chain runs while still being the exact average over
//! all sweeps folded so far.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, SamplerError};
use crate::sweep::SweepTally;

/// Sweeps per statistics flush unless configured otherwise.
pub const DEFAULT_BLOCK_SIZE: usize = 100;

/// First and second moment of the energy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyMoments {
    /// `E[E]`
    pub mean: f64,
    /// `E[E²]`
    pub mean_sq: f64,
}

impl EnergyMoments {
    /// `E[E²] - E[E]²`
    pub fn variance(&self) -> f64 {
        self.mean_sq - self.mean * self.mean
    }
}

/// Sums of sweep tallies over the current block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAccumulator {
    sums: Vec<f64>,
    energy: f64,
    energy_sq: f64,
    sweeps: usize,
}

impl BlockAccumulator {
    pub fn new(num_all: usize) -> Self {
        Self {
            sums: vec![0.0; num_all],
            energy: 0.0,
            energy_sq: 0.0,
            sweeps: 0,
        }
    }

    pub fn add(&mut self, tally: &SweepTally) {
        self.sums
            .iter_mut()
            .zip(&tally.rates)
            .for_each(|(s, r)| *s += r);
        self.energy += tally.energy;
        self.energy_sq += tally.energy_sq;
        self.sweeps += 1;
    }

    pub fn reset(&mut self) {
        self.sums.iter_mut().for_each(|v| *v = 0.0);
        self.energy = 0.0;
        self.energy_sq = 0.0;
        self.sweeps = 0;
    }

    /// Sweeps added since the last reset.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    pub fn sums(&self) -> &[f64] {
        &self.sums
    }
}

/// Averages over every sweep folded so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningStatistics {
    means: Vec<f64>,
    energy: EnergyMoments,
    sweeps: usize,
}

impl RunningStatistics {
    pub fn new(num_all: usize) -> Self {
        Self {
            means: vec![0.0; num_all],
            energy: EnergyMoments::default(),
            sweeps: 0,
        }
    }

    /// Merges a block; afterwards the means cover `sweeps() + block.sweeps()` sweeps.
    pub fn fold(&mut self, block: &BlockAccumulator) {
        if block.sweeps == 0 {
            return;
        }
        let previous = self.sweeps as f64;
        let total = (self.sweeps + block.sweeps) as f64;
        self.means
            .iter_mut()
            .zip(&block.sums)
            .for_each(|(m, s)| *m = (previous * *m + s) / total);
        self.energy.mean = (previous * self.energy.mean + block.energy) / total;
        self.energy.mean_sq = (previous * self.energy.mean_sq + block.energy_sq) / total;
        self.sweeps += block.sweeps;
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn energy(&self) -> EnergyMoments {
        self.energy
    }

    /// Sweeps the averages are taken over.
    pub fn sweeps(&self) -> usize {
        self.sweeps
    }

    pub fn into_means(self) -> Vec<f64> {
        self.means
    }
}

/// Decides when the current block is folded into the running averages.
#[derive(Debug, Clone)]
pub struct AveragingController {
    block_size: usize,
    block: BlockAccumulator,
    running: RunningStatistics,
    sweep: usize,
}

impl AveragingController {
    pub fn new(num_all: usize, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(SamplerError::config(
                "block size",
                "statistics must be flushed at least every sweep",
            ));
        }
        Ok(Self {
            block_size,
            block: BlockAccumulator::new(num_all),
            running: RunningStatistics::new(num_all),
            sweep: 0,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Post-burn-in sweeps recorded so far.
    pub fn sweeps_recorded(&self) -> usize {
        self.sweep
    }

    pub fn running(&self) -> &RunningStatistics {
        &self.running
    }

    /// Adds one sweep. Returns `true` when this sweep closed a block and the
    /// block was folded into the running averages.
    pub fn record(&mut self, tally: &SweepTally) -> bool {
        self.sweep += 1;
        self.block.add(tally);
        if self.sweep % self.block_size != 0 {
            return false;
        }
        self.flush();
        debug!(
            sweep = self.sweep,
            energy_mean = self.running.energy.mean,
            "folded statistics block"
        );
        true
    }

    fn flush(&mut self) {
        self.running.fold(&self.block);
        self.block.reset();
    }

    /// Final averages. With `fold_partial` an unfinished trailing block is
    /// folded in as well; otherwise those sweeps are dropped.
    pub fn finish(mut self, fold_partial: bool) -> RunningStatistics {
        if fold_partial && self.block.sweeps() > 0 {
            debug!(sweeps = self.block.sweeps(), "folding trailing partial block");
            self.flush();
        }
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tally(rates: Vec<f64>, energy: f64) -> SweepTally {
        SweepTally {
            rates,
            energy,
            energy_sq: energy * energy,
            variable_visits: Vec::new(),
            pair_visits: Vec::new(),
        }
    }

    #[test]
    fn block_folding_gives_plain_mean() {
        let mut ctl = AveragingController::new(2, 3).unwrap();
        let values: Vec<f64> = (1..=9).map(|v| v as f64).collect();
        for (i, &v) in values.iter().enumerate() {
            let folded = ctl.record(&tally(vec![v, 2.0 * v], -v));
            assert_eq!(folded, (i + 1) % 3 == 0);
        }
        let stats = ctl.finish(true);
        assert_eq!(stats.sweeps(), 9);
        assert_abs_diff_eq!(stats.means()[0], 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.means()[1], 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.energy().mean, -5.0, epsilon = 1e-12);
        let mean_sq = values.iter().map(|v| v * v).sum::<f64>() / 9.0;
        assert_abs_diff_eq!(stats.energy().mean_sq, mean_sq, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.energy().variance(), mean_sq - 25.0, epsilon = 1e-12);
    }

    #[test]
    fn partial_block_is_optional() {
        let build = || {
            let mut ctl = AveragingController::new(1, 4).unwrap();
            for v in [1.0, 1.0, 1.0, 1.0, 5.0, 5.0] {
                ctl.record(&tally(vec![v], 0.0));
            }
            ctl
        };
        let dropped = build().finish(false);
        assert_eq!(dropped.sweeps(), 4);
        assert_abs_diff_eq!(dropped.means()[0], 1.0);

        let folded = build().finish(true);
        assert_eq!(folded.sweeps(), 6);
        assert_abs_diff_eq!(folded.means()[0], 14.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn nothing_recorded_means_zeros() {
        let ctl = AveragingController::new(3, 100).unwrap();
        let stats = ctl.finish(true);
        assert_eq!(stats.means(), &[0.0, 0.0, 0.0]);
        assert_eq!(stats.energy(), EnergyMoments::default());
    }

    #[test]
    fn block_resets_after_fold() {
        let mut ctl = AveragingController::new(1, 2).unwrap();
        ctl.record(&tally(vec![3.0], 1.0));
        assert_eq!(ctl.block.sweeps(), 1);
        ctl.record(&tally(vec![3.0], 1.0));
        assert_eq!(ctl.block.sweeps(), 0);
        assert_eq!(ctl.block.sums(), &[0.0]);
        assert_eq!(ctl.sweeps_recorded(), 2);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        assert!(AveragingController::new(4, 0).is_err());
    }
}
