/*!
Sources of uniform variates on the open interval (0, 1).

Every random decision a chain makes (the visiting order of each sweep as well
as the pair draws) is derived from a single stream of such variates, so a run
is a deterministic function of its model, its initial state and that stream.
Recording the stream with [`Recorder`] and feeding it back through [`Replay`]
reproduces a run exactly.

Permutations are drawn with [`rand::seq::SliceRandom`], fed through
[`UniformBits`] so that they consume the same stream as the pair draws.
*/

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng, RngCore, SeedableRng};
use rand_distr::Open01;

use crate::errors::{Result, SamplerError};

const TWO_POW_32: f64 = 4_294_967_296.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

/// A stream of independent `U(0, 1)` variates.
pub trait UniformSource {
    /// Next variate, strictly between 0 and 1.
    fn next_open01(&mut self) -> f64;

    /// Puts `items` into a uniformly random order, drawing from this stream.
    fn shuffle(&mut self, items: &mut [usize]) {
        SliceRandom::shuffle(items, &mut UniformBits::new(self));
    }
}

impl<U: UniformSource + ?Sized> UniformSource for &mut U {
    fn next_open01(&mut self) -> f64 {
        (**self).next_open01()
    }
}

impl UniformSource for SmallRng {
    fn next_open01(&mut self) -> f64 {
        self.sample(Open01)
    }
}

/// Exposes a [`UniformSource`] as a [`RngCore`], one variate per word.
///
/// The high bits of each word are the binary expansion of the variate.
#[derive(Debug)]
pub struct UniformBits<'a, U: ?Sized> {
    source: &'a mut U,
}

impl<'a, U: UniformSource + ?Sized> UniformBits<'a, U> {
    pub fn new(source: &'a mut U) -> Self {
        Self { source }
    }
}

impl<U: UniformSource + ?Sized> RngCore for UniformBits<'_, U> {
    fn next_u32(&mut self) -> u32 {
        ((*self.source).next_open01() * TWO_POW_32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        ((*self.source).next_open01() * TWO_POW_64) as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let word = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// `SmallRng`-backed source with a known seed.
#[derive(Debug, Clone)]
pub struct SeededUniforms {
    seed: u64,
    rng: SmallRng,
}

impl SeededUniforms {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Seeds from the thread-local entropy source; the seed stays readable
    /// through [`SeededUniforms::seed`] so the run can be replayed.
    pub fn from_entropy() -> Self {
        Self::new(thread_rng().gen::<u64>())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl UniformSource for SeededUniforms {
    fn next_open01(&mut self) -> f64 {
        self.rng.next_open01()
    }
}

/// Passes variates through from an inner source and keeps a copy of each.
#[derive(Debug, Clone)]
pub struct Recorder<S> {
    inner: S,
    draws: Vec<f64>,
}

impl<S: UniformSource> Recorder<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            draws: Vec::new(),
        }
    }

    pub fn draws(&self) -> &[f64] {
        &self.draws
    }

    pub fn into_draws(self) -> Vec<f64> {
        self.draws
    }
}

impl<S: UniformSource> UniformSource for Recorder<S> {
    fn next_open01(&mut self) -> f64 {
        let u = self.inner.next_open01();
        self.draws.push(u);
        u
    }
}

/// Feeds back a fixed sequence of variates, cycling when it runs out.
#[derive(Debug, Clone)]
pub struct Replay {
    draws: Vec<f64>,
    pos: usize,
}

impl Replay {
    /// Fails if `draws` is empty or holds a value outside (0, 1).
    pub fn new(draws: Vec<f64>) -> Result<Self> {
        if draws.is_empty() {
            return Err(SamplerError::config("replay", "needs at least one variate"));
        }
        if let Some((pos, u)) = draws
            .iter()
            .enumerate()
            .find(|(_, u)| !(**u > 0.0 && **u < 1.0))
        {
            return Err(SamplerError::config(
                "replay",
                format!("variate {pos} = {u} is outside (0, 1)"),
            ));
        }
        Ok(Self { draws, pos: 0 })
    }

    /// Number of variates handed out so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl UniformSource for Replay {
    fn next_open01(&mut self) -> f64 {
        let u = self.draws[self.pos % self.draws.len()];
        self.pos += 1;
        u
    }
}
