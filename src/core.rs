use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::errors::Result;
use crate::sweep::SweepTally;

pub trait MarkovChain {
    /// Type of the configuration the chain moves through.
    type State: ?Sized;

    /// Does one iteration of the chain (one full sweep), returning what the
    /// sweep observed.
    fn step(&mut self) -> Result<&SweepTally>;

    /// Get the current state without stepping.
    fn current_state(&self) -> &Self::State;
}

/// Runs `n_steps` iterations and discards their tallies.
pub fn run_chain<M: MarkovChain>(chain: &mut M, n_steps: usize) -> Result<()> {
    for _ in 0..n_steps {
        chain.step()?;
    }
    Ok(())
}

/// Progress bar over `len` sweeps; drawn to a hidden target unless `visible`.
pub fn sweep_progress(len: usize, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_prefix("Sweeps");
    pb
}
