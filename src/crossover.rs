//! Binary crossover operators.
//!
//! Operators treat chromosome byte regions as opaque bitstrings; how the
//! genotype maps back onto the phenotype is invisible here. All binary
//! operators are compatible with integer chromosomes whose flags exclude
//! [`Flags::PERMUTATION`].

use std::fmt;

use rand::seq::index;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::genotype::{ChromosomeKind, Flags};

/// Recombines two parent bitstrings into two children.
pub trait Crossover: Send + Sync + std::fmt::Debug {
    /// Write offspring of `mom` and `dad` into `child1` and `child2`.
    ///
    /// All four buffers have the same length (the chromosome's byte
    /// region).
    ///
    /// # Errors
    ///
    /// Operator-specific precondition failures, e.g. more crossover points
    /// than the region can host.
    fn crossover(
        &self,
        rng: &mut dyn RngCore,
        mom: &[u8],
        dad: &[u8],
        child1: &mut [u8],
        child2: &mut [u8],
    ) -> Result<(), CrossoverError>;

    /// Whether this operator understands chromosomes of the given kind and
    /// flags. Incompatibility is reported at schema compile time as a
    /// warning, not an error.
    fn is_compatible(&self, kind: ChromosomeKind, flags: Flags) -> bool;
}

/// Crossover precondition failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrossoverError {
    /// More crossover points requested than distinct interior bit
    /// positions exist.
    TooManyPoints {
        /// Requested number of points.
        k: usize,
        /// Bits in the chromosome region.
        tot_bits: usize,
    },
}

impl fmt::Display for CrossoverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossoverError::TooManyPoints { k, tot_bits } => {
                write!(f, "cannot apply {k}-point crossover to a chromosome {tot_bits} bits long")
            }
        }
    }
}

impl std::error::Error for CrossoverError {}

fn binary_compatible(kind: ChromosomeKind, flags: Flags) -> bool {
    kind == ChromosomeKind::Int && !flags.contains(Flags::PERMUTATION)
}

/// Swap the masked bits of `a[i]` and `b[i]`.
fn swap_masked(a: &mut [u8], b: &mut [u8], i: usize, mask: u8) {
    let av = a[i];
    let bv = b[i];
    a[i] = (av & !mask) | (bv & mask);
    b[i] = (bv & !mask) | (av & mask);
}

/// K-point crossover: exchange alternating runs of bits between the
/// parents at `k` random cut positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KPoints {
    k: usize,
}

impl KPoints {
    /// Create a `k`-point crossover operator.
    ///
    /// # Panics
    ///
    /// Panics when `k` is zero.
    #[must_use]
    pub fn new(k: usize) -> Self {
        assert!(k >= 1, "invalid k-point crossover: k = {k}");
        Self { k }
    }
}

/// Single-point crossover.
#[must_use]
pub fn single_point() -> KPoints {
    KPoints::new(1)
}

/// Two-point crossover.
#[must_use]
pub fn two_points() -> KPoints {
    KPoints::new(2)
}

impl Crossover for KPoints {
    fn crossover(
        &self,
        rng: &mut dyn RngCore,
        mom: &[u8],
        dad: &[u8],
        child1: &mut [u8],
        child2: &mut [u8],
    ) -> Result<(), CrossoverError> {
        let tot_bits = mom.len() * 8;
        // Points are drawn without replacement from [1, tot_bits - 2].
        if self.k + 2 > tot_bits {
            return Err(CrossoverError::TooManyPoints { k: self.k, tot_bits });
        }

        child1.copy_from_slice(mom);
        child2.copy_from_slice(dad);

        let mut points: Vec<usize> = index::sample(rng, tot_bits - 2, self.k)
            .iter()
            .map(|p| p + 1)
            .collect();
        points.sort_unstable();

        let mut prev_byte = None;

        for (i, &point) in points.iter().enumerate() {
            let byte = point / 8;
            let bit = point % 8;
            let low_mask = !(0xffu8 << bit);

            if i % 2 == 1 {
                if prev_byte == Some(byte) {
                    // The opening point already swapped this byte's high
                    // bits; roll back from the closing bit upward, leaving
                    // exactly [open, close) exchanged.
                    swap_masked(child1, child2, byte, !low_mask);
                    prev_byte = Some(byte);
                    continue;
                }
                // Whole bytes between the pair swap by block copy, then
                // the closing byte swaps below its cut bit.
                let start = prev_byte.map_or(0, |b| b + 1);
                child1[start..byte].copy_from_slice(&dad[start..byte]);
                child2[start..byte].copy_from_slice(&mom[start..byte]);
                swap_masked(child1, child2, byte, low_mask);
            } else {
                // Opening point: swap from the cut bit upward.
                swap_masked(child1, child2, byte, !low_mask);
            }
            prev_byte = Some(byte);
        }

        if self.k % 2 == 1 {
            // Odd point count: the exchange continues to the end.
            let start = prev_byte.map_or(0, |b| b + 1);
            child1[start..].copy_from_slice(&dad[start..]);
            child2[start..].copy_from_slice(&mom[start..]);
        }

        Ok(())
    }

    fn is_compatible(&self, kind: ChromosomeKind, flags: Flags) -> bool {
        binary_compatible(kind, flags)
    }
}

/// Parametric half-uniform crossover: each differing bit swaps between the
/// children with probability `rate`; identical bits never change.
///
/// Positions of disagreement are preserved (`c1 ^ c2 == mom ^ dad`) and the
/// children are complementary flips of the parents
/// (`c1 ^ mom == c2 ^ dad`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParametricHalfUniform {
    rate: f64,
}

impl ParametricHalfUniform {
    /// Create the operator with a swap probability in `[0, 1]`.
    #[must_use]
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl Crossover for ParametricHalfUniform {
    fn crossover(
        &self,
        rng: &mut dyn RngCore,
        mom: &[u8],
        dad: &[u8],
        child1: &mut [u8],
        child2: &mut [u8],
    ) -> Result<(), CrossoverError> {
        child1.copy_from_slice(mom);
        child2.copy_from_slice(dad);

        for i in 0..mom.len() {
            let mut mask = child1[i] ^ child2[i];
            for j in 0..8 {
                let bit = 1u8 << j;
                if mask & bit != 0 && rng.gen::<f64>() >= self.rate {
                    mask &= !bit;
                }
            }
            swap_masked(child1, child2, i, mask);
        }
        Ok(())
    }

    fn is_compatible(&self, kind: ChromosomeKind, flags: Flags) -> bool {
        binary_compatible(kind, flags)
    }
}

/// Applies an inner operator with probability `p`, otherwise copies the
/// parents through unchanged.
#[derive(Debug)]
pub struct Probability {
    probability: f64,
    inner: Box<dyn Crossover>,
}

impl Probability {
    /// Wrap `inner`, applying it with probability `p`.
    #[must_use]
    pub fn new(p: f64, inner: impl Crossover + 'static) -> Self {
        Self {
            probability: p,
            inner: Box::new(inner),
        }
    }
}

impl Crossover for Probability {
    fn crossover(
        &self,
        rng: &mut dyn RngCore,
        mom: &[u8],
        dad: &[u8],
        child1: &mut [u8],
        child2: &mut [u8],
    ) -> Result<(), CrossoverError> {
        if rng.gen::<f64>() >= self.probability {
            child1.copy_from_slice(mom);
            child2.copy_from_slice(dad);
            return Ok(());
        }
        self.inner.crossover(rng, mom, dad, child1, child2)
    }

    fn is_compatible(&self, kind: ChromosomeKind, flags: Flags) -> bool {
        self.inner.is_compatible(kind, flags)
    }
}
