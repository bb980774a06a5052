use serde::{Deserialize, Serialize};

use crate::errors::{Result, SamplerError};
use crate::stats::DEFAULT_BLOCK_SIZE;

/// Run-length and bookkeeping settings for one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Sweeps whose statistics are collected.
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    /// Sweeps run before collection starts.
    #[serde(default = "default_burn_in")]
    pub burn_in: usize,
    /// Sweeps per statistics flush (energy is also recomputed at every flush).
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Seed for the variate stream; drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Show a progress bar over all sweeps.
    #[serde(default)]
    pub show_progress: bool,
    /// Fold sweeps after the last full block into the results instead of
    /// dropping them.
    #[serde(default = "default_fold_partial_block")]
    pub fold_partial_block: bool,
}

fn default_n_samples() -> usize {
    1000
}

fn default_burn_in() -> usize {
    100
}

fn default_block_size() -> usize {
    DEFAULT_BLOCK_SIZE
}

fn default_fold_partial_block() -> bool {
    false
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            n_samples: default_n_samples(),
            burn_in: default_burn_in(),
            block_size: default_block_size(),
            seed: None,
            show_progress: false,
            fold_partial_block: default_fold_partial_block(),
        }
    }
}

impl SamplerConfig {
    pub fn new(n_samples: usize, burn_in: usize) -> Self {
        Self {
            n_samples,
            burn_in,
            ..Self::default()
        }
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn with_fold_partial_block(mut self, fold: bool) -> Self {
        self.fold_partial_block = fold;
        self
    }

    /// Total number of sweeps, burn-in included.
    pub fn total_sweeps(&self) -> usize {
        self.burn_in + self.n_samples
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(SamplerError::config("block size", "must be at least 1"));
        }
        Ok(())
    }

    /// Parses a JSON object; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_defaults() {
        let config = SamplerConfig::from_json_str(r#"{ "n_samples": 500, "seed": 9 }"#).unwrap();
        assert_eq!(config.n_samples, 500);
        assert_eq!(config.burn_in, 100);
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.seed, Some(9));
        assert!(!config.fold_partial_block);
        assert!(!config.show_progress);
    }

    #[test]
    fn json_rejects_zero_block() {
        let err = SamplerConfig::from_json_str(r#"{ "block_size": 0 }"#).unwrap_err();
        assert!(matches!(err, SamplerError::Config { .. }));
        assert!(matches!(
            SamplerConfig::from_json_str("{ not json").unwrap_err(),
            SamplerError::Json(_)
        ));
    }

    #[test]
    fn builders_compose() {
        let config = SamplerConfig::new(10, 2).set_seed(1).with_block_size(5);
        assert_eq!(config.total_sweeps(), 12);
        assert_eq!(config.block_size, 5);
        assert_eq!(config.seed, Some(1));
    }
}
