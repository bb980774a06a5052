//! Error type shared by every stage of a sampling run.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SamplerError>;

/// Everything that can stop a run.
///
/// Configuration problems are reported before the first sweep. Invariant
/// violations are internal-consistency failures and abort the run; a run
/// that aborts never hands back partial statistics.
#[derive(Debug, Error)]
pub enum SamplerError {
    /// Malformed tables, inconsistent lengths or an unusable sampler setting.
    #[error("invalid {what}: {detail}")]
    Config {
        /// Which input was rejected.
        what: &'static str,
        /// Human readable description of the problem.
        detail: String,
    },

    /// The chain reached a state that should be impossible.
    #[error("internal invariant violated: {0}")]
    Invariant(String),

    /// A cooperative cancellation request was observed between sweeps.
    #[error("run cancelled before sweep {sweep}")]
    Cancelled {
        /// Index of the sweep that would have run next (0-based, burn-in included).
        sweep: usize,
    },

    /// Failure while parsing a JSON configuration.
    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure while writing results.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    /// Failure while encoding CSV output.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl SamplerError {
    pub(crate) fn config(what: &'static str, detail: impl Into<String>) -> Self {
        SamplerError::Config {
            what,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_input() {
        let err = SamplerError::config("pair table", "pair 3 repeats (0, 1)");
        assert_eq!(err.to_string(), "invalid pair table: pair 3 repeats (0, 1)");
    }

    #[test]
    fn cancelled_reports_sweep() {
        let err = SamplerError::Cancelled { sweep: 17 };
        assert!(err.to_string().contains("17"));
    }
}
