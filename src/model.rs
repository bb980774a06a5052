/*!
Model parameters for a pairwise maximum-entropy distribution over binary vectors.

The unnormalized log-probability of a configuration `x ∈ {0,1}^d` is

```text
E(x) = Σ_i h_i x_i + Σ_{k<l} J_kl x_k x_l + L_{K(x)},     K(x) = Σ_i x_i
```

The pairwise terms are addressed through a [`PairTable`] (which two variables
each weight in `J` couples) and a [`NeighborMap`] (which pairwise terms each
variable takes part in). Both are flat tables built once and never mutated.

# Examples

```rust
use pairwise_maxent::model::PairwiseModel;

// Three variables, lexicographic pair order (0,1), (0,2), (1,2).
let model = PairwiseModel::canonical(
    vec![0.5, -0.5, 0.0],
    vec![1.0, 0.0, 2.0],
    vec![0.0, 0.0, 0.0, -1.0],
)
.unwrap();
assert_eq!(model.num_pairs(), 3);
assert_eq!(model.num_all(), 10);

// x = (1, 0, 1): h_0 + h_2 + J_02 + L_2
let e = model.energy(&[true, false, true]).unwrap();
assert!((e - 0.5).abs() < 1e-12);
```
*/

use num_traits::ToPrimitive;
use std::collections::HashSet;

use crate::errors::{Result, SamplerError};

/// Number of unordered pairs between `dim` variables.
pub fn num_pairs(dim: usize) -> usize {
    dim * dim.saturating_sub(1) / 2
}

/// Length of the statistics vector: `dim` singles, `num_pairs(dim)` pairs and
/// `dim + 1` population-count bins.
pub fn num_all(dim: usize) -> usize {
    dim * (dim + 3) / 2 + 1
}

/// Position of the pair `(k, l)`, `k < l`, in the lexicographic pair ordering.
pub fn triangular_index(dim: usize, k: usize, l: usize) -> usize {
    debug_assert!(k < l && l < dim);
    k * dim - k * (k + 1) / 2 + (l - k - 1)
}

fn to_index<T: ToPrimitive>(what: &'static str, pos: usize, value: &T) -> Result<usize> {
    let as_float = value.to_f64().ok_or_else(|| {
        SamplerError::config(what, format!("entry {pos} is not representable as a number"))
    })?;
    if as_float < 0.0 || as_float.fract() != 0.0 {
        return Err(SamplerError::config(
            what,
            format!("entry {pos} = {as_float} is not a non-negative integer"),
        ));
    }
    value.to_usize().ok_or_else(|| {
        SamplerError::config(what, format!("entry {pos} = {as_float} does not fit an index"))
    })
}

/// Member variables `(k, l)` of every pairwise term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairTable {
    dim: usize,
    first: Vec<usize>,
    second: Vec<usize>,
}

impl PairTable {
    /// Builds and validates a table from explicit pairs.
    ///
    /// Every unordered pair of the `dim` variables must appear exactly once.
    pub fn new(dim: usize, pairs: &[(usize, usize)]) -> Result<Self> {
        if dim < 2 {
            return Err(SamplerError::config(
                "dimension",
                format!("need at least 2 variables, got {dim}"),
            ));
        }
        let expected = num_pairs(dim);
        if pairs.len() != expected {
            return Err(SamplerError::config(
                "pair table",
                format!("expected {expected} pairs for d = {dim}, got {}", pairs.len()),
            ));
        }

        let mut seen = HashSet::with_capacity(expected);
        for (idx, &(k, l)) in pairs.iter().enumerate() {
            if k >= dim || l >= dim {
                return Err(SamplerError::config(
                    "pair table",
                    format!("pair {idx} = ({k}, {l}) references a variable outside 0..{dim}"),
                ));
            }
            if k == l {
                return Err(SamplerError::config(
                    "pair table",
                    format!("pair {idx} couples variable {k} with itself"),
                ));
            }
            if !seen.insert((k.min(l), k.max(l))) {
                return Err(SamplerError::config(
                    "pair table",
                    format!("pair {idx} = ({k}, {l}) appears more than once"),
                ));
            }
        }

        Ok(Self {
            dim,
            first: pairs.iter().map(|p| p.0).collect(),
            second: pairs.iter().map(|p| p.1).collect(),
        })
    }

    /// Lexicographic table `(0,1), (0,2), ..., (d-2,d-1)`.
    pub fn canonical(dim: usize) -> Result<Self> {
        let pairs: Vec<(usize, usize)> = (0..dim)
            .flat_map(|k| (k + 1..dim).map(move |l| (k, l)))
            .collect();
        Self::new(dim, &pairs)
    }

    /// Reads the host layout: `2·num_pairs` numbers, all first members
    /// followed by all second members.
    pub fn from_flat<T: ToPrimitive>(dim: usize, flat: &[T]) -> Result<Self> {
        let n = num_pairs(dim);
        if flat.len() != 2 * n {
            return Err(SamplerError::config(
                "pair table",
                format!("expected {} entries for d = {dim}, got {}", 2 * n, flat.len()),
            ));
        }
        let pairs = (0..n)
            .map(|p| {
                Ok((
                    to_index("pair table", p, &flat[p])?,
                    to_index("pair table", p + n, &flat[p + n])?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(dim, &pairs)
    }

    /// Number of variables the table was built for.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.first.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty()
    }

    /// Members of pair `idx`, or `None` when out of range.
    pub fn get(&self, idx: usize) -> Option<(usize, usize)> {
        Some((*self.first.get(idx)?, *self.second.get(idx)?))
    }

    /// Members of pair `idx`.
    ///
    /// # Panics
    /// If `idx >= self.len()`.
    pub fn pair(&self, idx: usize) -> (usize, usize) {
        (self.first[idx], self.second[idx])
    }

    /// The member of pair `idx` that is not `var`.
    pub fn partner(&self, idx: usize, var: usize) -> usize {
        if self.first[idx] == var {
            self.second[idx]
        } else {
            self.first[idx]
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.first.iter().copied().zip(self.second.iter().copied())
    }

    /// Whether pair `p` is `(k, l)` with `k < l` and `p == triangular_index(d, k, l)`.
    pub fn is_triangular(&self) -> bool {
        self.iter()
            .enumerate()
            .all(|(p, (k, l))| k < l && triangular_index(self.dim, k, l) == p)
    }

    /// Host layout of the table (inverse of [`PairTable::from_flat`]).
    pub fn to_flat(&self) -> Vec<usize> {
        self.first.iter().chain(self.second.iter()).copied().collect()
    }
}

/// For each variable, the `d - 1` pair indices it takes part in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborMap {
    dim: usize,
    entries: Vec<usize>,
}

impl NeighborMap {
    /// Derives the map from a pair table, listing pair indices in ascending order.
    pub fn from_pairs(pairs: &PairTable) -> Self {
        let dim = pairs.dim();
        let mut lists = vec![Vec::with_capacity(dim - 1); dim];
        for (p, (k, l)) in pairs.iter().enumerate() {
            lists[k].push(p);
            lists[l].push(p);
        }
        Self {
            dim,
            entries: lists.concat(),
        }
    }

    /// Reads the host layout (`d·(d-1)` numbers, `d - 1` per variable) and
    /// checks it against `pairs`.
    pub fn from_flat<T: ToPrimitive>(pairs: &PairTable, flat: &[T]) -> Result<Self> {
        let dim = pairs.dim();
        let width = dim - 1;
        if flat.len() != dim * width {
            return Err(SamplerError::config(
                "neighbor map",
                format!("expected {} entries for d = {dim}, got {}", dim * width, flat.len()),
            ));
        }
        let entries = flat
            .iter()
            .enumerate()
            .map(|(pos, v)| to_index("neighbor map", pos, v))
            .collect::<Result<Vec<_>>>()?;

        let map = Self { dim, entries };
        map.validate(pairs)?;
        Ok(map)
    }

    /// Checks the map against `pairs`: every variable lists `d - 1` distinct
    /// pairs, each of which contains it.
    pub fn validate(&self, pairs: &PairTable) -> Result<()> {
        let dim = pairs.dim();
        if self.dim != dim || self.entries.len() != dim * (dim - 1) {
            return Err(SamplerError::config(
                "neighbor map",
                format!("built for d = {}, pair table has d = {dim}", self.dim),
            ));
        }
        for var in 0..dim {
            let mut seen = HashSet::with_capacity(dim - 1);
            for &p in self.neighbors(var) {
                let (k, l) = pairs.get(p).ok_or_else(|| {
                    SamplerError::config(
                        "neighbor map",
                        format!("variable {var} lists pair {p}, but there are only {} pairs", pairs.len()),
                    )
                })?;
                if k != var && l != var {
                    return Err(SamplerError::config(
                        "neighbor map",
                        format!("variable {var} lists pair {p} = ({k}, {l}) which does not contain it"),
                    ));
                }
                if !seen.insert(p) {
                    return Err(SamplerError::config(
                        "neighbor map",
                        format!("variable {var} lists pair {p} twice"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Pair indices containing `var`.
    pub fn neighbors(&self, var: usize) -> &[usize] {
        let width = self.dim - 1;
        &self.entries[var * width..(var + 1) * width]
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Host layout of the map.
    pub fn as_flat(&self) -> &[usize] {
        &self.entries
    }
}

/// Weight vectors `h` (singles), `J` (pairs) and `L` (population count).
#[derive(Debug, Clone, PartialEq)]
pub struct Potentials {
    pub h: Vec<f64>,
    pub j: Vec<f64>,
    pub l: Vec<f64>,
}

impl Potentials {
    pub fn new(h: Vec<f64>, j: Vec<f64>, l: Vec<f64>) -> Self {
        Self { h, j, l }
    }

    /// All-zero weights for `dim` variables: the uniform distribution.
    pub fn zeros(dim: usize) -> Self {
        Self {
            h: vec![0.0; dim],
            j: vec![0.0; num_pairs(dim)],
            l: vec![0.0; dim + 1],
        }
    }
}

/// Immutable parameters of one model. Safe to share between chains.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseModel {
    pairs: PairTable,
    neighbors: NeighborMap,
    potentials: Potentials,
    triangular: bool,
}

impl PairwiseModel {
    /// Assembles a model, checking that the neighbor map belongs to the pair
    /// table and that the weights have the right lengths and are finite.
    pub fn new(pairs: PairTable, neighbors: NeighborMap, potentials: Potentials) -> Result<Self> {
        let dim = pairs.dim();
        neighbors.validate(&pairs)?;
        check_len("h", potentials.h.len(), dim)?;
        check_len("J", potentials.j.len(), num_pairs(dim))?;
        check_len("L", potentials.l.len(), dim + 1)?;
        if let Some(bad) = potentials
            .h
            .iter()
            .chain(&potentials.j)
            .chain(&potentials.l)
            .find(|w| !w.is_finite())
        {
            return Err(SamplerError::config(
                "weights",
                format!("non-finite weight {bad}"),
            ));
        }

        let triangular = pairs.is_triangular();
        Ok(Self {
            pairs,
            neighbors,
            potentials,
            triangular,
        })
    }

    /// Model over the lexicographic pair table; `h.len()` fixes the dimension.
    pub fn canonical(h: Vec<f64>, j: Vec<f64>, l: Vec<f64>) -> Result<Self> {
        let pairs = PairTable::canonical(h.len())?;
        let neighbors = NeighborMap::from_pairs(&pairs);
        Self::new(pairs, neighbors, Potentials::new(h, j, l))
    }

    /// Builds a model straight from host arrays.
    pub fn from_flat<T: ToPrimitive>(
        dim: usize,
        pairs: &[T],
        neighbors: &[T],
        h: &[f64],
        j: &[f64],
        l: &[f64],
    ) -> Result<Self> {
        let pairs = PairTable::from_flat(dim, pairs)?;
        let neighbors = NeighborMap::from_flat(&pairs, neighbors)?;
        Self::new(
            pairs,
            neighbors,
            Potentials::new(h.to_vec(), j.to_vec(), l.to_vec()),
        )
    }

    pub fn dim(&self) -> usize {
        self.pairs.dim()
    }

    pub fn num_pairs(&self) -> usize {
        self.pairs.len()
    }

    pub fn num_all(&self) -> usize {
        num_all(self.dim())
    }

    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    pub fn neighbors(&self) -> &NeighborMap {
        &self.neighbors
    }

    pub fn potentials(&self) -> &Potentials {
        &self.potentials
    }

    /// True when `J` is laid out in lexicographic pair order.
    pub fn is_triangular(&self) -> bool {
        self.triangular
    }

    /// `L_K`; a count outside `0..=d` means the chain state is corrupt.
    pub fn population_weight(&self, count: usize) -> Result<f64> {
        self.potentials.l.get(count).copied().ok_or_else(|| {
            SamplerError::Invariant(format!(
                "population count {count} outside 0..={}",
                self.dim()
            ))
        })
    }

    /// Sum of `J` over the terms of `var` whose other member is active,
    /// skipping the term with index `skip`.
    pub fn coupling_field(&self, var: usize, skip: usize, x: &[bool]) -> f64 {
        self.neighbors
            .neighbors(var)
            .iter()
            .filter(|&&p| p != skip && x[self.pairs.partner(p, var)])
            .map(|&p| self.potentials.j[p])
            .sum()
    }

    /// Full energy of `x`, walking the pair table.
    pub fn energy(&self, x: &[bool]) -> Result<f64> {
        let count = x.iter().filter(|&&b| b).count();
        let mut e = self.population_weight(count)?;
        e += x
            .iter()
            .zip(&self.potentials.h)
            .filter(|(on, _)| **on)
            .map(|(_, h)| h)
            .sum::<f64>();
        e += self
            .pairs
            .iter()
            .zip(&self.potentials.j)
            .filter(|((k, l), _)| x[*k] && x[*l])
            .map(|(_, j)| j)
            .sum::<f64>();
        Ok(e)
    }

    /// Full energy of `x`, addressing `J` by the lexicographic pair index.
    ///
    /// Only meaningful when [`PairwiseModel::is_triangular`] holds.
    pub fn triangular_energy(&self, x: &[bool]) -> Result<f64> {
        let dim = self.dim();
        let count = x.iter().filter(|&&b| b).count();
        let mut e = self.population_weight(count)?;
        for k in 0..dim {
            if !x[k] {
                continue;
            }
            e += self.potentials.h[k];
            for l in k + 1..dim {
                if x[l] {
                    e += self.potentials.j[triangular_index(dim, k, l)];
                }
            }
        }
        Ok(e)
    }

    /// Energy recomputation used at statistics flushes.
    pub fn recompute_energy(&self, x: &[bool]) -> Result<f64> {
        if self.triangular {
            self.triangular_energy(x)
        } else {
            self.energy(x)
        }
    }
}

fn check_len(name: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(SamplerError::config(
            "weights",
            format!("{name} has {got} entries, expected {expected}"),
        ));
    }
    Ok(())
}
