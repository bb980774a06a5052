/*!
# Pairwise block-Gibbs sampler

Runs one Markov chain over binary vectors distributed as a pairwise
maximum-entropy model (see [`crate::model`]) and returns the averaged
statistics of the chain after burn-in.

A run proceeds as follows:

1. The running energy is computed from scratch for the initial configuration.
2. `burn_in` sweeps are performed; their tallies only feed the running energy.
3. `n_samples` sweeps follow. Their tallies are accumulated in blocks of
   `block_size` sweeps; at the end of every block the block is folded into the
   running averages, the energy is recomputed from scratch to remove drift of
   the incremental updates, and the population count is re-verified.
4. The averages, the final configuration and the energy moments are returned.

## Example

```rust
use pairwise_maxent::config::SamplerConfig;
use pairwise_maxent::model::PairwiseModel;
use pairwise_maxent::sampler::PairwiseGibbs;
use pairwise_maxent::state::ChainState;

let model = PairwiseModel::canonical(vec![0.0, 0.0], vec![0.0], vec![0.0; 3]).unwrap();
let config = SamplerConfig::new(1000, 100).set_seed(42);
let sampler = PairwiseGibbs::new(model, ChainState::zeros(2), config).unwrap();

let out = sampler.run().unwrap();
assert_eq!(out.statistics().len(), 6);
assert!((out.single_rates()[0] - 0.5).abs() < 0.1);
assert_eq!(out.seed(), Some(42));
```
*/

use std::sync::atomic::{AtomicBool, Ordering};

use num_traits::ToPrimitive;
use tracing::{debug, info};

use crate::config::SamplerConfig;
use crate::core::{sweep_progress, MarkovChain};
use crate::errors::{Result, SamplerError};
use crate::model::PairwiseModel;
use crate::output::SamplerOutput;
use crate::state::ChainState;
use crate::stats::AveragingController;
use crate::sweep::{SweepEngine, SweepTally};
use crate::uniform::{SeededUniforms, UniformSource};

/// A single chain: its state, its running energy and its variate source.
#[derive(Debug, Clone)]
pub struct PairwiseChain<'m, U> {
    engine: SweepEngine<'m>,
    state: ChainState,
    energy: f64,
    rng: U,
}

impl<'m, U: UniformSource> PairwiseChain<'m, U> {
    pub fn new(model: &'m PairwiseModel, state: ChainState, rng: U) -> Result<Self> {
        if state.dim() != model.dim() {
            return Err(SamplerError::config(
                "initial state",
                format!("has {} entries, model has d = {}", state.dim(), model.dim()),
            ));
        }
        let energy = model.recompute_energy(state.as_slice())?;
        Ok(Self {
            engine: SweepEngine::new(model),
            state,
            energy,
            rng,
        })
    }

    /// Incrementally tracked energy of the current state.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Replaces the tracked energy with a full recomputation and returns the
    /// absolute drift that was removed.
    pub fn resync_energy(&mut self) -> Result<f64> {
        let exact = self
            .engine
            .model()
            .recompute_energy(self.state.as_slice())?;
        let drift = (exact - self.energy).abs();
        self.energy = exact;
        Ok(drift)
    }

    pub fn into_parts(self) -> (ChainState, U) {
        (self.state, self.rng)
    }
}

impl<'m, U: UniformSource> MarkovChain for PairwiseChain<'m, U> {
    type State = ChainState;

    fn step(&mut self) -> Result<&SweepTally> {
        self.engine
            .sweep(&mut self.state, &mut self.energy, &mut self.rng)
    }

    fn current_state(&self) -> &ChainState {
        &self.state
    }
}

/// Sampler for one model, one starting configuration and one run length.
#[derive(Debug, Clone)]
pub struct PairwiseGibbs {
    /// The model sampled from.
    pub model: PairwiseModel,
    /// Configuration every run starts from.
    pub initial_state: ChainState,
    /// Run length and bookkeeping settings.
    pub config: SamplerConfig,
}

impl PairwiseGibbs {
    pub fn new(model: PairwiseModel, initial_state: ChainState, config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        if initial_state.dim() != model.dim() {
            return Err(SamplerError::config(
                "initial state",
                format!(
                    "has {} entries, model has d = {}",
                    initial_state.dim(),
                    model.dim()
                ),
            ));
        }
        Ok(Self {
            model,
            initial_state,
            config,
        })
    }

    /// Sets the seed used by [`PairwiseGibbs::run`].
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Runs the chain with a `SmallRng` stream seeded from the configuration
    /// (or from entropy when no seed is configured).
    pub fn run(&self) -> Result<SamplerOutput> {
        let rng = self.seeded_source();
        let seed = rng.seed();
        self.drive(rng, Some(seed), None)
    }

    /// Like [`PairwiseGibbs::run`], but stops with
    /// [`SamplerError::Cancelled`] once `cancel` is set.
    pub fn run_with_cancel(&self, cancel: &AtomicBool) -> Result<SamplerOutput> {
        let rng = self.seeded_source();
        let seed = rng.seed();
        self.drive(rng, Some(seed), Some(cancel))
    }

    /// Runs the chain on a caller-supplied variate stream.
    pub fn run_with_source<U: UniformSource>(&self, rng: U) -> Result<SamplerOutput> {
        self.drive(rng, None, None)
    }

    fn seeded_source(&self) -> SeededUniforms {
        match self.config.seed {
            Some(seed) => SeededUniforms::new(seed),
            None => SeededUniforms::from_entropy(),
        }
    }

    fn drive<U: UniformSource>(
        &self,
        rng: U,
        seed: Option<u64>,
        cancel: Option<&AtomicBool>,
    ) -> Result<SamplerOutput> {
        let config = &self.config;
        let mut chain = PairwiseChain::new(&self.model, self.initial_state.clone(), rng)?;
        let mut averages = AveragingController::new(self.model.num_all(), config.block_size)?;
        let pb = sweep_progress(config.total_sweeps(), config.show_progress);

        info!(
            dim = self.model.dim(),
            n_samples = config.n_samples,
            burn_in = config.burn_in,
            block_size = config.block_size,
            seed = ?seed,
            "starting pairwise Gibbs run"
        );

        for sweep in 0..config.total_sweeps() {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                pb.abandon_with_message("cancelled");
                info!(sweep, "pairwise Gibbs run cancelled");
                return Err(SamplerError::Cancelled { sweep });
            }

            let tally = chain.step()?;
            if sweep < config.burn_in {
                if sweep + 1 == config.burn_in {
                    chain.current_state().check_population()?;
                    debug!(energy = chain.energy(), "burn-in complete");
                }
            } else if averages.record(tally) {
                let drift = chain.resync_energy()?;
                chain.current_state().check_population()?;
                debug!(
                    sweep = averages.sweeps_recorded(),
                    drift,
                    energy = chain.energy(),
                    "energy recomputed at flush"
                );
            }
            pb.inc(1);
        }
        pb.finish_with_message("Done!");

        let running = averages.finish(config.fold_partial_block);
        let (state, _) = chain.into_parts();
        info!(
            sweeps_averaged = running.sweeps(),
            energy_mean = running.energy().mean,
            "pairwise Gibbs run finished"
        );
        Ok(SamplerOutput::assemble(
            self.model.dim(),
            running,
            state.into_inner(),
            seed,
        ))
    }
}

/// Runs a sampler straight from host arrays.
///
/// `pairs` holds `2·P` indices (all first members, then all second members),
/// `neighbors` holds `d - 1` pair indices per variable, and `x0` marks active
/// variables with `1`.
#[allow(clippy::too_many_arguments)]
pub fn sample_flat<T: ToPrimitive>(
    n_samples: usize,
    burn_in: usize,
    dim: usize,
    x0: &[T],
    pairs: &[T],
    neighbors: &[T],
    h: &[f64],
    j: &[f64],
    l: &[f64],
    seed: Option<u64>,
) -> Result<SamplerOutput> {
    let model = PairwiseModel::from_flat(dim, pairs, neighbors, h, j, l)?;
    let mut config = SamplerConfig::new(n_samples, burn_in);
    config.seed = seed;
    PairwiseGibbs::new(model, ChainState::from_numeric(x0)?, config)?.run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::run_chain;
    use crate::uniform::{Recorder, Replay};
    use approx::assert_abs_diff_eq;

    fn model(dim: usize) -> PairwiseModel {
        let h: Vec<f64> = (0..dim).map(|i| 0.2 * i as f64 - 0.4).collect();
        let j: Vec<f64> = (0..crate::model::num_pairs(dim))
            .map(|p| if p % 3 == 0 { 0.6 } else { -0.3 })
            .collect();
        let l: Vec<f64> = (0..=dim).map(|k| -0.1 * k as f64).collect();
        PairwiseModel::canonical(h, j, l).unwrap()
    }

    #[test]
    fn rejects_wrong_initial_length() {
        let err = PairwiseGibbs::new(model(4), ChainState::zeros(3), SamplerConfig::default())
            .unwrap_err();
        assert!(matches!(err, SamplerError::Config { what: "initial state", .. }));
    }

    #[test]
    fn seeded_runs_repeat() {
        let sampler = PairwiseGibbs::new(
            model(5),
            ChainState::zeros(5),
            SamplerConfig::new(300, 50).set_seed(77),
        )
        .unwrap();
        let a = sampler.run().unwrap();
        let b = sampler.run().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.sweeps_averaged(), 300);
    }

    #[test]
    fn recorded_stream_replays_run() {
        let sampler = PairwiseGibbs::new(
            model(4),
            ChainState::new(vec![true, false, false, true]),
            SamplerConfig::new(250, 20).with_block_size(50),
        )
        .unwrap();

        let mut recorder = Recorder::new(SeededUniforms::new(5));
        let first = sampler.run_with_source(&mut recorder).unwrap();
        let replayed = sampler
            .run_with_source(Replay::new(recorder.into_draws()).unwrap())
            .unwrap();
        assert_eq!(first, replayed);
    }

    #[test]
    fn trailing_partial_block_is_dropped_unless_folded() {
        let config = SamplerConfig::new(250, 10).set_seed(9);
        let dropped = PairwiseGibbs::new(model(4), ChainState::zeros(4), config.clone())
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(dropped.sweeps_averaged(), 200);

        let folded = PairwiseGibbs::new(
            model(4),
            ChainState::zeros(4),
            config.with_fold_partial_block(true),
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(folded.sweeps_averaged(), 250);
        assert_eq!(folded.final_state(), dropped.final_state());
    }

    #[test]
    fn short_run_without_full_block_reports_zeros() {
        let out = PairwiseGibbs::new(
            model(3),
            ChainState::zeros(3),
            SamplerConfig::new(40, 5).set_seed(2),
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(out.sweeps_averaged(), 0);
        assert!(out.statistics().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn cancellation_returns_no_results() {
        let sampler = PairwiseGibbs::new(
            model(3),
            ChainState::zeros(3),
            SamplerConfig::new(100, 10).set_seed(1),
        )
        .unwrap();
        let cancel = AtomicBool::new(true);
        let err = sampler.run_with_cancel(&cancel).unwrap_err();
        assert!(matches!(err, SamplerError::Cancelled { sweep: 0 }));

        let go = AtomicBool::new(false);
        assert!(sampler.run_with_cancel(&go).is_ok());
    }

    #[test]
    fn resync_removes_only_rounding_drift() {
        let m = model(6);
        let mut chain = PairwiseChain::new(&m, ChainState::zeros(6), SeededUniforms::new(3)).unwrap();
        run_chain(&mut chain, 200).unwrap();
        let drift = chain.resync_energy().unwrap();
        assert!(drift < 1e-9, "drift {drift}");
        assert_abs_diff_eq!(
            chain.energy(),
            m.energy(chain.current_state().as_slice()).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn flat_entry_point_matches_structured_one() {
        let pairs = [0.0, 1.0];
        let neighbors = [0.0, 0.0];
        let out = sample_flat(
            200,
            10,
            2,
            &[1.0, 0.0],
            &pairs,
            &neighbors,
            &[0.0, 0.0],
            &[0.0],
            &[0.0, 0.0, 0.0],
            Some(4),
        )
        .unwrap();

        let model = PairwiseModel::canonical(vec![0.0, 0.0], vec![0.0], vec![0.0; 3]).unwrap();
        let expected = PairwiseGibbs::new(
            model,
            ChainState::new(vec![true, false]),
            SamplerConfig::new(200, 10).set_seed(4),
        )
        .unwrap()
        .run()
        .unwrap();
        assert_eq!(out, expected);
    }
}
