//! Mutation operators.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::genotype::{ChromosomeKind, Flags};

/// Mutates a chromosome's bitstring in place.
pub trait Mutation: Send + Sync + std::fmt::Debug {
    /// Mutate the genome region.
    fn mutate(&self, rng: &mut dyn RngCore, genome: &mut [u8]);

    /// Whether this operator understands chromosomes of the given kind and
    /// flags. Incompatibility is reported at schema compile time as a
    /// warning, not an error.
    fn is_compatible(&self, kind: ChromosomeKind, flags: Flags) -> bool;
}

/// Bit-flip mutation with a fixed expected number of flips per genome.
///
/// Each bit flips independently with probability
/// `mean_flips / (len * 8)`, so the expected flip count stays at
/// `mean_flips` for any region length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BitString {
    mean_flips: f64,
}

impl BitString {
    /// Create the operator with the expected number of flips per genome.
    ///
    /// # Panics
    ///
    /// Panics when `mean_flips` is negative.
    #[must_use]
    pub fn new(mean_flips: f64) -> Self {
        assert!(mean_flips >= 0.0, "invalid bit-string mutation: mean flips = {mean_flips}");
        Self { mean_flips }
    }
}

impl Mutation for BitString {
    fn mutate(&self, rng: &mut dyn RngCore, genome: &mut [u8]) {
        let p = self.mean_flips / (genome.len() * 8) as f64;

        for byte in genome {
            let mut mask = 0u8;
            for j in 0..8 {
                if rng.gen::<f64>() < p {
                    mask |= 1 << j;
                }
            }
            if mask != 0 {
                *byte ^= mask;
            }
        }
    }

    fn is_compatible(&self, kind: ChromosomeKind, flags: Flags) -> bool {
        kind == ChromosomeKind::Int && !flags.contains(Flags::PERMUTATION)
    }
}
