//! Block-Gibbs sampling from pairwise maximum-entropy models over binary
//! vectors, with a population-count potential, and accumulation of the
//! statistics needed to fit or validate such models.

pub mod conditional;
pub mod config;
pub mod core;
pub mod errors;
pub mod io;
pub mod model;
pub mod output;
pub mod sampler;
pub mod state;
pub mod stats;
pub mod sweep;
pub mod uniform;

pub use config::SamplerConfig;
pub use errors::{Result, SamplerError};
pub use model::{NeighborMap, PairTable, PairwiseModel, Potentials};
pub use output::SamplerOutput;
pub use sampler::{sample_flat, PairwiseChain, PairwiseGibbs};
pub use state::ChainState;
pub use stats::{EnergyMoments, DEFAULT_BLOCK_SIZE};
pub use uniform::{SeededUniforms, UniformSource};
