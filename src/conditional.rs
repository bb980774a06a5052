//! Joint conditional distribution of one variable pair given the rest.

use crate::errors::{Result, SamplerError};
use crate::model::PairwiseModel;
use crate::state::ChainState;

/// One of the four joint states of a pair `(x_k, x_l)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairConfig {
    /// `(0, 0)`
    Neither,
    /// `(0, 1)`
    SecondOnly,
    /// `(1, 0)`
    FirstOnly,
    /// `(1, 1)`
    Both,
}

impl PairConfig {
    pub const ALL: [PairConfig; 4] = [
        PairConfig::Neither,
        PairConfig::SecondOnly,
        PairConfig::FirstOnly,
        PairConfig::Both,
    ];

    pub fn from_bits(xk: bool, xl: bool) -> Self {
        match (xk, xl) {
            (false, false) => PairConfig::Neither,
            (false, true) => PairConfig::SecondOnly,
            (true, false) => PairConfig::FirstOnly,
            (true, true) => PairConfig::Both,
        }
    }

    pub fn bits(self) -> (bool, bool) {
        match self {
            PairConfig::Neither => (false, false),
            PairConfig::SecondOnly => (false, true),
            PairConfig::FirstOnly => (true, false),
            PairConfig::Both => (true, true),
        }
    }

    /// `2·x_k + x_l`
    pub fn index(self) -> usize {
        let (xk, xl) = self.bits();
        2 * usize::from(xk) + usize::from(xl)
    }

    /// How many of the two variables are active.
    pub fn active(self) -> usize {
        let (xk, xl) = self.bits();
        usize::from(xk) + usize::from(xl)
    }
}

/// Partial energies of the four joint states, indexed by [`PairConfig::index`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairEnergies(pub [f64; 4]);

impl PairEnergies {
    /// Evaluates the partial energies of pair `pair_idx` with everything
    /// outside the pair held at `state`.
    ///
    /// Only terms that can change with `(x_k, x_l)` enter: the singles of
    /// the pair, the couplings to active variables outside the pair, the
    /// coupling inside the pair, and `L` at the resulting population count.
    pub fn evaluate(model: &PairwiseModel, state: &ChainState, pair_idx: usize) -> Result<Self> {
        let (k, l) = model.pairs().pair(pair_idx);
        let x = state.as_slice();
        let own = usize::from(x[k]) + usize::from(x[l]);
        let rest = state.population().checked_sub(own).ok_or_else(|| {
            SamplerError::Invariant(format!(
                "population count {} smaller than the {own} active members of pair {pair_idx}",
                state.population()
            ))
        })?;

        let h = &model.potentials().h;
        let j_kl = model.potentials().j[pair_idx];
        let field_k = model.coupling_field(k, pair_idx, x);
        let field_l = model.coupling_field(l, pair_idx, x);
        let l0 = model.population_weight(rest)?;
        let l1 = model.population_weight(rest + 1)?;
        let l2 = model.population_weight(rest + 2)?;

        Ok(Self([
            l0,
            h[l] + field_l + l1,
            h[k] + field_k + l1,
            h[k] + h[l] + field_k + field_l + j_kl + l2,
        ]))
    }

    pub fn get(&self, config: PairConfig) -> f64 {
        self.0[config.index()]
    }

    /// Normalized probabilities `exp(E_c - max) / Σ exp(E - max)`.
    ///
    /// Shifting by the maximum keeps the largest term at `exp(0) = 1`, so the
    /// normalizer is at least one whatever the magnitude of the energies.
    pub fn probabilities(&self) -> Result<PairProbabilities> {
        let max = self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut p = self.0.map(|e| (e - max).exp());
        let total: f64 = p.iter().sum();
        if !total.is_finite() || total < 1.0 {
            return Err(SamplerError::Invariant(format!(
                "pair energies {:?} cannot be normalized",
                self.0
            )));
        }
        p.iter_mut().for_each(|v| *v /= total);
        Ok(PairProbabilities(p))
    }
}

/// Conditional distribution over the four joint states of a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairProbabilities(pub [f64; 4]);

impl PairProbabilities {
    pub fn get(&self, config: PairConfig) -> f64 {
        self.0[config.index()]
    }

    /// Maps one uniform variate to a joint state.
    ///
    /// Cumulative intervals from zero are taken in the order `(1,0)`, `(1,1)`,
    /// `(0,1)`, `(0,0)`. Changing the order leaves the distribution intact but
    /// not the sample path produced by a given variate stream.
    pub fn draw(&self, u: f64) -> PairConfig {
        let [p00, _, p10, p11] = self.0;
        let xk = u <= p10 + p11;
        let xl = !(p10 > u || u > 1.0 - p00);
        PairConfig::from_bits(xk, xl)
    }
}
