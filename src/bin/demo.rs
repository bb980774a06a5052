//! A small demo: samples a few pairwise maximum-entropy models and prints the
//! estimated rates next to what the model implies.

use pairwise_maxent::config::SamplerConfig;
use pairwise_maxent::model::{num_pairs, PairwiseModel};
use pairwise_maxent::sampler::PairwiseGibbs;
use pairwise_maxent::state::ChainState;
use pairwise_maxent::uniform::{SeededUniforms, UniformSource};
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Main entry point: an independent pair, a strongly coupled pair, and a
/// random 12-variable model with a population-count potential.
fn main() -> Result<(), Box<dyn Error>> {
    const ITERATIONS: usize = 10_000;
    const BURNIN: usize = 1_000;
    const SEED: u64 = 42;
    const DIM: usize = 12;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = SamplerConfig::new(ITERATIONS, BURNIN).set_seed(SEED);

    // Zero weights: every configuration of the pair is equally likely.
    let free = PairwiseModel::canonical(vec![0.0, 0.0], vec![0.0], vec![0.0; 3])?;
    let out = PairwiseGibbs::new(free, ChainState::zeros(2), config.clone())?.run()?;
    println!("independent pair");
    println!("  single rates:   {:.3}", out.single_rates());
    println!("  pair rate:      {:.3}  (exact 0.25)", out.pair_rates()[0]);
    println!("  population:     {:.3}  (exact [0.25, 0.5, 0.25])", out.population_histogram());

    // J = 10 makes (1, 1) dominate.
    let coupled = PairwiseModel::canonical(vec![0.0, 0.0], vec![10.0], vec![0.0; 3])?;
    let out = PairwiseGibbs::new(coupled, ChainState::zeros(2), config.clone())?.run()?;
    let z = 3.0 + 10f64.exp();
    println!("coupled pair");
    println!("  pair rate:      {:.5}  (exact {:.5})", out.pair_rates()[0], 10f64.exp() / z);
    println!("  population:     {:.5}", out.population_histogram());

    // Random model: sparse activity from negative h, a mild population penalty.
    let mut rng = SeededUniforms::new(SEED);
    let h: Vec<f64> = (0..DIM).map(|_| -1.5 + rng.next_open01()).collect();
    let j: Vec<f64> = (0..num_pairs(DIM))
        .map(|_| 0.8 * (rng.next_open01() - 0.5))
        .collect();
    let l: Vec<f64> = (0..=DIM).map(|k| -0.05 * (k * k) as f64).collect();
    let model = PairwiseModel::canonical(h, j, l)?;
    let pairs = model.pairs().clone();
    let sampler = PairwiseGibbs::new(model, ChainState::zeros(DIM), config.with_progress(true))?;
    let out = sampler.run()?;

    info!(sweeps = out.sweeps_averaged(), "random model sampled");
    println!("random model (d = {DIM})");
    println!("  single rates:   {:.3}", out.single_rates());
    println!("  population:     {:.3}", out.population_histogram());
    println!(
        "  energy:         mean {:.3}, variance {:.3}",
        out.energy().mean,
        out.energy_variance()
    );
    let cov = out.covariance(&pairs);
    let strongest = pairs
        .iter()
        .map(|(k, l)| ((k, l), cov[[k, l]]))
        .fold(((0, 1), 0.0f64), |best, cur| {
            if cur.1.abs() > best.1.abs() {
                cur
            } else {
                best
            }
        });
    println!(
        "  strongest covariance: {:?} = {:.4}",
        strongest.0, strongest.1
    );
    println!("  final state:    {:?}", out.final_state_f64());

    Ok(())
}
