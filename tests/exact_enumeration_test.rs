//! Compares sampler estimates against moments computed by enumerating all
//! `2^d` configurations of small models, and checks the chain invariants that
//! must hold at every statistics flush.

use pairwise_maxent::core::MarkovChain;
use pairwise_maxent::model::{num_pairs, PairwiseModel};
use pairwise_maxent::sampler::{PairwiseChain, PairwiseGibbs};
use pairwise_maxent::state::ChainState;
use pairwise_maxent::stats::AveragingController;
use pairwise_maxent::uniform::{SeededUniforms, UniformSource};
use pairwise_maxent::SamplerConfig;

/// Exact statistics vector (singles, pairs, population histogram) plus energy moments.
fn exact_statistics(model: &PairwiseModel) -> (Vec<f64>, f64, f64) {
    let dim = model.dim();
    let mut stats = vec![0.0; model.num_all()];
    let (mut z, mut e1, mut e2) = (0.0, 0.0, 0.0);
    for mask in 0u32..(1 << dim) {
        let x: Vec<bool> = (0..dim).map(|i| mask & (1 << i) != 0).collect();
        let energy = model.energy(&x).unwrap();
        let w = energy.exp();
        z += w;
        e1 += w * energy;
        e2 += w * energy * energy;
        for i in 0..dim {
            if x[i] {
                stats[i] += w;
            }
        }
        for (p, (k, l)) in model.pairs().iter().enumerate() {
            if x[k] && x[l] {
                stats[dim + p] += w;
            }
        }
        let count = x.iter().filter(|&&b| b).count();
        stats[dim + num_pairs(dim) + count] += w;
    }
    stats.iter_mut().for_each(|v| *v /= z);
    (stats, e1 / z, e2 / z)
}

fn random_model(dim: usize, seed: u64) -> PairwiseModel {
    let mut rng = SeededUniforms::new(seed);
    let h = (0..dim).map(|_| 1.5 * (rng.next_open01() - 0.6)).collect();
    let j = (0..num_pairs(dim))
        .map(|_| 1.2 * (rng.next_open01() - 0.5))
        .collect();
    let l = (0..=dim).map(|_| 0.8 * (rng.next_open01() - 0.5)).collect();
    PairwiseModel::canonical(h, j, l).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE_SIZE: usize = 20_000;
    const BURNIN: usize = 500;
    const SEED: u64 = 1234;

    #[test]
    fn test_matches_enumeration() {
        for (dim, model_seed) in [(3usize, 5u64), (4, 6), (5, 7)] {
            let model = random_model(dim, model_seed);
            let (exact, e_mean, e_sq) = exact_statistics(&model);
            let out = PairwiseGibbs::new(
                model,
                ChainState::zeros(dim),
                SamplerConfig::new(SAMPLE_SIZE, BURNIN).set_seed(SEED),
            )
            .unwrap()
            .run()
            .unwrap();

            for (i, (&got, &want)) in out.statistics().iter().zip(&exact).enumerate() {
                assert!(
                    (got - want).abs() < 0.02,
                    "d = {dim}, entry {i}: sampled {got}, exact {want}"
                );
            }
            assert_abs_diff_eq!(out.energy().mean, e_mean, epsilon = 0.05);
            assert_abs_diff_eq!(out.energy().mean_sq, e_sq, epsilon = 0.3);
        }
    }

    #[test]
    fn test_zero_model_rates_independent_of_start() {
        let dim = 6;
        let model = PairwiseModel::canonical(
            vec![0.0; dim],
            vec![0.0; num_pairs(dim)],
            vec![0.0; dim + 1],
        )
        .unwrap();
        for start in [vec![false; dim], vec![true; dim]] {
            let out = PairwiseGibbs::new(
                model.clone(),
                ChainState::new(start),
                SamplerConfig::new(5_000, 100).set_seed(SEED),
            )
            .unwrap()
            .run()
            .unwrap();
            for &rate in out.single_rates().iter() {
                assert_abs_diff_eq!(rate, 0.5, epsilon = 0.02);
            }
            for &rate in out.pair_rates().iter() {
                assert_abs_diff_eq!(rate, 0.25, epsilon = 0.03);
            }
        }
    }

    /// At every flush the tracked energy agrees with a full recomputation and
    /// the population count agrees with the vector.
    #[test]
    fn test_invariants_at_flush_boundaries() {
        let dim = 9;
        let model = random_model(dim, 99);
        let mut chain =
            PairwiseChain::new(&model, ChainState::zeros(dim), SeededUniforms::new(SEED)).unwrap();
        let mut averages = AveragingController::new(model.num_all(), 100).unwrap();

        for _ in 0..2_000 {
            let tally = chain.step().unwrap();
            assert!(tally.pair_visits.iter().all(|&v| v == 1));
            assert!(tally.variable_visits.iter().all(|&v| v == dim - 1));
            if averages.record(tally) {
                let state = chain.current_state();
                state.check_population().unwrap();
                let exact = model.triangular_energy(state.as_slice()).unwrap();
                assert_abs_diff_eq!(chain.energy(), exact, epsilon = 1e-9);
                assert!(chain.resync_energy().unwrap() < 1e-9);
            }
        }
        assert_eq!(averages.running().sweeps(), 2_000);
    }

    /// Scaling every weight far beyond `exp` range must not break sampling.
    #[test]
    fn test_extreme_weights_stay_finite() {
        let dim = 4;
        let model = PairwiseModel::canonical(
            vec![800.0, -900.0, 750.0, -1000.0],
            vec![1e3, -1e3, 500.0, 0.0, -700.0, 2e3],
            vec![0.0, 1e3, -1e3, 0.0, 500.0],
        )
        .unwrap();
        let out = PairwiseGibbs::new(
            model,
            ChainState::zeros(dim),
            SamplerConfig::new(300, 10).set_seed(SEED),
        )
        .unwrap()
        .run()
        .unwrap();
        assert!(out.statistics().iter().all(|v| v.is_finite()));
        assert_abs_diff_eq!(out.population_histogram().sum(), 1.0, epsilon = 1e-9);
    }
}
