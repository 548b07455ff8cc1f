//! Chromosome model: a byte region of the genome with its operators.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crossover::Crossover;
use crate::genotype::Gene;
use crate::mutation::Mutation;

/// Declared interpretation of a chromosome's byte region.
///
/// Operators use this (together with [`Flags`]) to report compatibility;
/// randomization uses it to decide between raw bytes and IEEE 754 floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromosomeKind {
    /// Packed integer genes; randomized as raw bytes.
    Int,
    /// Single-precision float genes.
    Float32,
    /// Double-precision float genes.
    Float64,
}

/// Chromosome trait markers consulted by operator compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags(u32);

impl Flags {
    /// No markers.
    pub const NONE: Flags = Flags(0);
    /// Genes encode fixed-point decimals.
    pub const DECIMAL: Flags = Flags(1);
    /// Genes form a permutation; binary operators reject this marker.
    pub const PERMUTATION: Flags = Flags(1 << 1);

    /// Whether every marker in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// An ordered run of genes sharing one byte region of the genome, plus the
/// crossover and mutation operators that act on that region.
#[derive(Debug)]
pub struct Chromosome {
    pub(crate) kind: ChromosomeKind,
    pub(crate) flags: Flags,
    pub(crate) genes: Vec<Gene>,
    pub(crate) bytes_index: usize,
    pub(crate) bytes_length: usize,
    pub(crate) crossover: Option<Box<dyn Crossover>>,
    pub(crate) mutation: Option<Box<dyn Mutation>>,
}

impl Chromosome {
    /// Declared kind.
    #[must_use]
    pub fn kind(&self) -> ChromosomeKind {
        self.kind
    }

    /// Trait markers.
    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Genes in assignment order.
    #[must_use]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// This chromosome's byte region inside a genome.
    #[must_use]
    pub fn region(&self) -> std::ops::Range<usize> {
        self.bytes_index..self.bytes_index + self.bytes_length
    }

    /// Fill this chromosome's region with random genetic material.
    ///
    /// Integer chromosomes take raw random bytes; float chromosomes take
    /// the bit patterns of random floats in `[0, 1)` so decoded genes start
    /// as ordinary finite values. Bits above a gene's declared width are
    /// ignored by decode either way.
    pub(crate) fn randomize(&self, rng: &mut dyn RngCore, region: &mut [u8]) {
        match self.kind {
            ChromosomeKind::Int => rng.fill_bytes(region),
            ChromosomeKind::Float32 => {
                let mut chunks = region.chunks_exact_mut(4);
                for chunk in &mut chunks {
                    chunk.copy_from_slice(&rng.gen::<f32>().to_bits().to_le_bytes());
                }
                rng.fill_bytes(chunks.into_remainder());
            }
            ChromosomeKind::Float64 => {
                let mut chunks = region.chunks_exact_mut(8);
                for chunk in &mut chunks {
                    chunk.copy_from_slice(&rng.gen::<f64>().to_bits().to_le_bytes());
                }
                rng.fill_bytes(chunks.into_remainder());
            }
        }
    }
}
