/*!
One sweep of the block-Gibbs sampler.

A sweep visits every pair `(k, l)` of the pair table exactly once, in an order
that is reshuffled before each sweep, and resamples `(x_k, x_l)` jointly from
its conditional distribution given all other variables. The running energy
is updated from the partial energies of the visited pair only.

While sweeping, the engine tallies what the chain looked like after every
pair update. With `d` variables and `P = d(d-1)/2` pairs, each variable is
visited `d - 1` times and each pair once per sweep, so the tallies are turned
into per-visit rates by dividing singles by `d - 1` and the population-count
histogram and energy sums by `P`.
*/

use rand::seq::SliceRandom;
use tracing::trace;

use crate::conditional::{PairConfig, PairEnergies};
use crate::errors::Result;
use crate::model::PairwiseModel;
use crate::state::ChainState;
use crate::uniform::{UniformBits, UniformSource};

/// What one sweep saw, in the layout of the statistics vector.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepTally {
    /// `d` single rates, `P` pair indicators, `d + 1` population-count bins.
    pub rates: Vec<f64>,
    /// Mean running energy over the pair updates of the sweep.
    pub energy: f64,
    /// Mean squared running energy over the pair updates of the sweep.
    pub energy_sq: f64,
    /// How often each variable was part of an updated pair.
    pub variable_visits: Vec<usize>,
    /// How often each pair was updated.
    pub pair_visits: Vec<usize>,
}

impl SweepTally {
    fn new(dim: usize, num_pairs: usize, num_all: usize) -> Self {
        Self {
            rates: vec![0.0; num_all],
            energy: 0.0,
            energy_sq: 0.0,
            variable_visits: vec![0; dim],
            pair_visits: vec![0; num_pairs],
        }
    }

    fn reset(&mut self) {
        self.rates.iter_mut().for_each(|v| *v = 0.0);
        self.energy = 0.0;
        self.energy_sq = 0.0;
        self.variable_visits.iter_mut().for_each(|v| *v = 0);
        self.pair_visits.iter_mut().for_each(|v| *v = 0);
    }
}

/// Performs sweeps over a fixed model, reusing its buffers between sweeps.
#[derive(Debug, Clone)]
pub struct SweepEngine<'m> {
    model: &'m PairwiseModel,
    order: Vec<usize>,
    tally: SweepTally,
}

impl<'m> SweepEngine<'m> {
    pub fn new(model: &'m PairwiseModel) -> Self {
        let num_pairs = model.num_pairs();
        Self {
            model,
            order: (0..num_pairs).collect(),
            tally: SweepTally::new(model.dim(), num_pairs, model.num_all()),
        }
    }

    pub fn model(&self) -> &'m PairwiseModel {
        self.model
    }

    /// Visiting order used by the most recent sweep.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Tallies of the most recent sweep.
    pub fn tally(&self) -> &SweepTally {
        &self.tally
    }

    /// Resamples pair `pair_idx` and moves `energy` along with the state.
    pub fn update_pair<U: UniformSource + ?Sized>(
        &self,
        pair_idx: usize,
        state: &mut ChainState,
        energy: &mut f64,
        rng: &mut U,
    ) -> Result<PairConfig> {
        let (k, l) = self.model.pairs().pair(pair_idx);
        let partial = PairEnergies::evaluate(self.model, state, pair_idx)?;
        let before = PairConfig::from_bits(state.is_active(k), state.is_active(l));

        let probs = partial.probabilities()?;
        let after = probs.draw(rng.next_open01());
        let (xk, xl) = after.bits();
        state.set_pair(k, l, xk, xl);

        *energy += partial.get(after) - partial.get(before);
        Ok(after)
    }

    /// Runs one full sweep and returns its per-visit tallies.
    pub fn sweep<U: UniformSource + ?Sized>(
        &mut self,
        state: &mut ChainState,
        energy: &mut f64,
        rng: &mut U,
    ) -> Result<&SweepTally> {
        let dim = self.model.dim();
        let num_pairs = self.model.num_pairs();
        let hist = dim + num_pairs;

        SliceRandom::shuffle(&mut self.order[..], &mut UniformBits::new(rng));
        self.tally.reset();

        for pos in 0..num_pairs {
            let pair_idx = self.order[pos];
            let (k, l) = self.model.pairs().pair(pair_idx);
            let config = self.update_pair(pair_idx, state, energy, rng)?;
            let (xk, xl) = config.bits();

            let tally = &mut self.tally;
            tally.variable_visits[k] += 1;
            tally.variable_visits[l] += 1;
            tally.pair_visits[pair_idx] += 1;
            if xk {
                tally.rates[k] += 1.0;
            }
            if xl {
                tally.rates[l] += 1.0;
            }
            if xk && xl {
                tally.rates[dim + pair_idx] += 1.0;
            }
            tally.rates[hist + state.population()] += 1.0;
            tally.energy += *energy;
            tally.energy_sq += *energy * *energy;
        }

        let visits_per_variable = (dim - 1) as f64;
        let visits = num_pairs as f64;
        let tally = &mut self.tally;
        tally.rates[..dim]
            .iter_mut()
            .for_each(|v| *v /= visits_per_variable);
        tally.rates[hist..].iter_mut().for_each(|v| *v /= visits);
        tally.energy /= visits;
        tally.energy_sq /= visits;

        trace!(energy = *energy, population = state.population(), "sweep done");
        Ok(&self.tally)
    }
}
