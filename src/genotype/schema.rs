//! Schema runtime: the compiled genotype layout and its codec operations.

use std::marker::PhantomData;

use rand::RngCore;

use crate::crossover::CrossoverError;
use crate::genotype::builder::{self, Binder, SchemaError, Spec};
use crate::genotype::chromosome::Chromosome;
use crate::genotype::scalar::Scalar;

/// A value that can act as the decoded endpoint of a schema.
///
/// Inline shapes (structs of scalars, scalar arrays, nested structs of
/// those) use the default implementation; `Vec` phenotypes materialize with
/// enough elements to cover the schema.
pub trait Phenotype: Default + Clone + Send + 'static {
    /// Materialize an empty phenotype able to back `cells` codec cells.
    #[must_use]
    fn materialize(cells: usize) -> Self {
        let _ = cells;
        Self::default()
    }
}

impl<T: Scalar> Phenotype for Vec<T> {
    fn materialize(cells: usize) -> Self {
        vec![T::default(); cells]
    }
}

impl<T: Scalar, const N: usize> Phenotype for [T; N] where [T; N]: Default {}

/// Compiled genotype layout for phenotype `P`: an ordered list of
/// chromosomes plus the codec between packed genomes and `P` values.
///
/// Immutable after [`build`](Self::build).
#[derive(Debug)]
pub struct Schema<P> {
    chromosomes: Vec<Chromosome>,
    size_in_bytes: usize,
    _phenotype: PhantomData<fn(&P) -> P>,
}

impl<P: Phenotype> Schema<P> {
    /// Compile a schema from a builder closure.
    ///
    /// The closure receives a [`Binder`] and a freshly defaulted template
    /// of `P`; it declares chromosomes by binding the template's fields.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when a bound reference lies outside the
    /// template, a bit width is invalid, or an inline gene run overruns the
    /// phenotype.
    pub fn build<F>(spec_fn: F) -> Result<Self, SchemaError>
    where
        F: FnOnce(&Binder<P>, &P) -> Spec,
    {
        builder::compile(spec_fn)
    }

    pub(crate) fn assemble(chromosomes: Vec<Chromosome>, size_in_bytes: usize) -> Self {
        Self {
            chromosomes,
            size_in_bytes,
            _phenotype: PhantomData,
        }
    }

    /// Genome size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_in_bytes
    }

    /// The compiled chromosomes, in genome order.
    #[must_use]
    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    /// Allocate a zeroed buffer for `n` genomes.
    #[must_use]
    pub fn make(&self, n: usize) -> Vec<u8> {
        vec![0; n * self.size_in_bytes]
    }

    /// Materialize a phenotype for decoding into.
    ///
    /// `Vec` phenotypes are sized from the largest locus byte index any
    /// gene references, which over-counts elements narrower than a byte and
    /// undercounts complex-valued sequences; inline shapes return their
    /// default value.
    #[must_use]
    pub fn init_phenotype(&self) -> P {
        let cells = self
            .chromosomes
            .iter()
            .flat_map(|c| c.genes.iter())
            .map(|g| g.locus.byte_index + 1)
            .max()
            .unwrap_or(0);
        P::materialize(cells)
    }

    /// Serialize `phenotype` into `genome` at the declared bit widths.
    pub fn encode(&self, phenotype: &P, genome: &mut [u8]) {
        debug_assert_eq!(genome.len(), self.size_in_bytes);
        for chromosome in &self.chromosomes {
            let region = &mut genome[chromosome.region()];
            for gene in &chromosome.genes {
                gene.encode(phenotype, region);
            }
        }
    }

    /// Deserialize `genome` into `phenotype`.
    ///
    /// Only bound fields are written; everything else keeps its value.
    pub fn decode(&self, genome: &[u8], phenotype: &mut P) {
        debug_assert_eq!(genome.len(), self.size_in_bytes);
        for chromosome in &self.chromosomes {
            let region = &genome[chromosome.region()];
            for gene in &chromosome.genes {
                gene.decode(phenotype, region);
            }
        }
    }

    /// Fill `genome` with random genetic material, chromosome by chromosome.
    pub fn randomize(&self, rng: &mut dyn RngCore, genome: &mut [u8]) {
        debug_assert_eq!(genome.len(), self.size_in_bytes);
        for chromosome in &self.chromosomes {
            chromosome.randomize(rng, &mut genome[chromosome.region()]);
        }
    }

    /// Recombine two parent genomes into two children, chromosome by
    /// chromosome.
    ///
    /// Chromosomes without a configured operator copy the parents through.
    ///
    /// # Errors
    ///
    /// Propagates the first operator failure.
    pub fn crossover(
        &self,
        rng: &mut dyn RngCore,
        mom: &[u8],
        dad: &[u8],
        child1: &mut [u8],
        child2: &mut [u8],
    ) -> Result<(), CrossoverError> {
        for chromosome in &self.chromosomes {
            let region = chromosome.region();
            match &chromosome.crossover {
                Some(op) => op.crossover(
                    rng,
                    &mom[region.clone()],
                    &dad[region.clone()],
                    &mut child1[region.clone()],
                    &mut child2[region],
                )?,
                None => {
                    child1[region.clone()].copy_from_slice(&mom[region.clone()]);
                    child2[region.clone()].copy_from_slice(&dad[region]);
                }
            }
        }
        Ok(())
    }

    /// Mutate a genome in place, chromosome by chromosome.
    ///
    /// Chromosomes without a configured operator are left untouched.
    pub fn mutate(&self, rng: &mut dyn RngCore, genome: &mut [u8]) {
        for chromosome in &self.chromosomes {
            if let Some(op) = &chromosome.mutation {
                op.mutate(rng, &mut genome[chromosome.region()]);
            }
        }
    }
}

impl<T: Scalar> Schema<Vec<T>> {
    /// Shorthand for a sequence phenotype with one integer chromosome of
    /// `len` genes, `bits` wide each. Intended for integer element types.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when `bits` is invalid for `T`.
    pub fn binary(bits: u32, len: usize) -> Result<Self, SchemaError> {
        Self::build(|bind, ph| {
            let mut spec = Spec::new();
            spec.int_chromosome(vec![bind.gene(ph).bits(bits).len(len)]);
            spec
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genotype::{Complex32, Complex64};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_two_chromosome_decode() {
        let schema = Schema::<[i64; 10]>::build(|bind, ph| {
            let mut spec = Spec::new();
            spec.int_chromosome(vec![bind.gene(ph).len(5).bits(12)]);
            spec.int_chromosome(vec![bind.gene(&ph[5]).len(5).bits(4)]);
            spec
        })
        .unwrap();
        assert_eq!(schema.size(), 11);

        let genome = [0x11, 0x21, 0x22, 0x33, 0x43, 0x44, 0x55, 0x05, 0x21, 0x43, 0x05];
        let mut phenotype = [0i64; 10];
        schema.decode(&genome, &mut phenotype);

        assert_eq!(phenotype, [0x111, 0x222, 0x333, 0x444, 0x555, 0x1, 0x2, 0x3, 0x4, 0x5]);
    }

    #[derive(Clone, Default)]
    struct Ints {
        i: isize,
        i64: i64,
        i32: i32,
        i16: i16,
        i8: i8,
    }

    #[derive(Clone, Default)]
    struct Uints {
        u: usize,
        u64: u64,
        u32: u32,
        u16: u16,
        u8: u8,
    }

    #[derive(Clone, Default)]
    struct Floats {
        f32: f32,
        f64: f64,
        c64: Complex32,
        c128: Complex64,
    }

    #[derive(Clone, Default)]
    struct Arrays {
        b: [bool; 3],
        i: [i16; 3],
        f: [f32; 3],
        c: [Complex32; 3],
    }

    #[derive(Clone, Default)]
    struct MixedBag {
        b: bool,
        ints: Ints,
        uints: Uints,
        floats: Floats,
        arrays: Arrays,
    }
    impl Phenotype for MixedBag {}

    fn mixed_schema() -> Schema<MixedBag> {
        Schema::build(|bind, ph: &MixedBag| {
            let mut spec = Spec::new();
            spec.int_chromosome(vec![
                bind.gene(&ph.b),
                bind.gene(&ph.ints.i),
                bind.gene(&ph.ints.i64),
                bind.gene(&ph.ints.i32),
                bind.gene(&ph.ints.i16),
                bind.gene(&ph.ints.i8),
                bind.gene(&ph.uints.u),
                bind.gene(&ph.uints.u64),
                bind.gene(&ph.uints.u32),
                bind.gene(&ph.uints.u16),
                bind.gene(&ph.uints.u8),
            ]);
            spec.float32_chromosome(vec![bind.gene(&ph.floats.f32), bind.gene(&ph.floats.c64)]);
            spec.float64_chromosome(vec![bind.gene(&ph.floats.f64), bind.gene(&ph.floats.c128)]);
            spec.int_chromosome(vec![bind.gene(&ph.arrays.b), bind.gene(&ph.arrays.i)]);
            spec.float32_chromosome(vec![bind.gene(&ph.arrays.f), bind.gene(&ph.arrays.c)]);
            spec
        })
        .unwrap()
    }

    fn saturated_bag() -> MixedBag {
        let nan32 = f32::from_bits(0x7fc0_0000);
        let nan64 = f64::from_bits(0x7ff8_0000_0000_0000);
        MixedBag {
            b: true,
            ints: Ints {
                i: -1,
                i64: -1,
                i32: -1,
                i16: -1,
                i8: -1,
            },
            uints: Uints {
                u: usize::MAX,
                u64: u64::MAX,
                u32: u32::MAX,
                u16: u16::MAX,
                u8: u8::MAX,
            },
            floats: Floats {
                f32: nan32,
                f64: nan64,
                c64: Complex32::new(nan32, nan32),
                c128: Complex64::new(nan64, nan64),
            },
            arrays: Arrays {
                b: [true; 3],
                i: [-1; 3],
                f: [nan32; 3],
                c: [Complex32::new(nan32, nan32); 3],
            },
        }
    }

    #[test]
    fn test_canonical_packed_layout() {
        let schema = mixed_schema();
        let mut genome = schema.make(1);
        schema.encode(&saturated_bag(), &mut genome);

        let nan32 = [0x00, 0x00, 0xc0, 0x7f];
        let nan64 = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xf8, 0x7f];

        let mut expected = vec![0xff; 46]; // four 64-bit, two 32-bit, two 16-bit, two 8-bit ints
        expected.push(0x01); // bool, alone in the trailing cell
        expected.extend(nan32.repeat(3)); // f32 + complex64
        expected.extend(nan64.repeat(3)); // f64 + complex128
        expected.extend([0xff; 6]); // [3]i16
        expected.push(0x07); // [3]bool, packed into one byte
        expected.extend(nan32.repeat(9)); // [3]f32 + [3]complex64

        assert_eq!(schema.size(), expected.len());
        assert_eq!(genome, expected);
    }

    #[test]
    fn test_mixed_roundtrip() {
        let schema = mixed_schema();
        let value = saturated_bag();

        let mut genome = schema.make(1);
        schema.encode(&value, &mut genome);

        let mut decoded = MixedBag::default();
        schema.decode(&genome, &mut decoded);

        assert_eq!(decoded.b, value.b);
        assert_eq!(decoded.ints.i, value.ints.i);
        assert_eq!(decoded.ints.i64, value.ints.i64);
        assert_eq!(decoded.ints.i32, value.ints.i32);
        assert_eq!(decoded.ints.i16, value.ints.i16);
        assert_eq!(decoded.ints.i8, value.ints.i8);
        assert_eq!(decoded.uints.u, value.uints.u);
        assert_eq!(decoded.uints.u64, value.uints.u64);
        assert_eq!(decoded.uints.u8, value.uints.u8);
        assert_eq!(decoded.floats.f32.to_bits(), value.floats.f32.to_bits());
        assert_eq!(decoded.floats.f64.to_bits(), value.floats.f64.to_bits());
        assert_eq!(decoded.floats.c128.re.to_bits(), value.floats.c128.re.to_bits());
        assert_eq!(decoded.arrays.b, value.arrays.b);
        assert_eq!(decoded.arrays.i, value.arrays.i);
        assert_eq!(decoded.arrays.c[2].im.to_bits(), value.arrays.c[2].im.to_bits());
    }

    #[test]
    fn test_sequence_encode_decode() {
        let schema = Schema::<Vec<i64>>::build(|bind, ph| {
            let mut spec = Spec::new();
            spec.int_chromosome(vec![bind.gene(ph).len(3).bits(2)]);
            spec
        })
        .unwrap();

        let v = vec![1i64, 2, 3, 4, 5];
        let mut genome = schema.make(1);
        schema.encode(&v, &mut genome);

        let mut d = vec![0i64; 5];
        schema.decode(&genome, &mut d);
        assert_eq!(d, vec![1, 2, 3, 0, 0]);
    }

    #[test]
    fn test_sequence_encode_decode_with_index() {
        let schema = Schema::<Vec<i64>>::build(|bind, ph| {
            let mut spec = Spec::new();
            spec.int_chromosome(vec![bind.gene(ph).index(1).len(3).bits(3)]);
            spec
        })
        .unwrap();

        let v = vec![1i64, 2, 3, 4, 5];
        let mut genome = schema.make(1);
        schema.encode(&v, &mut genome);

        let mut d = vec![0i64; 5];
        schema.decode(&genome, &mut d);
        assert_eq!(d, vec![0, 2, 3, 4, 0]);
    }

    #[test]
    fn test_sequence_shorter_than_genes() {
        let schema = Schema::<Vec<u8>>::binary(8, 4).unwrap();

        // Encoding a two-element vector: missing elements encode as zero.
        let mut genome = schema.make(1);
        schema.encode(&vec![0xab, 0xcd], &mut genome);
        assert_eq!(genome, [0xab, 0xcd, 0x00, 0x00]);
    }

    #[test]
    fn test_init_phenotype_sequence() {
        let schema = Schema::<Vec<u8>>::binary(8, 3).unwrap();
        let v = schema.init_phenotype();
        assert_eq!(v.len(), 3);

        // Sub-byte genes share loci bytes, so sizing undercounts: three
        // 2-bit genes all live in byte 0.
        let schema = Schema::<Vec<u8>>::binary(2, 3).unwrap();
        assert_eq!(schema.init_phenotype().len(), 1);
    }

    #[test]
    fn test_make_and_randomize() {
        let schema = mixed_schema();
        let mut genomes = schema.make(3);
        assert_eq!(genomes.len(), 3 * schema.size());
        assert!(genomes.iter().all(|&b| b == 0));

        let mut rng = SmallRng::seed_from_u64(99);
        let size = schema.size();
        schema.randomize(&mut rng, &mut genomes[..size]);
        assert!(genomes[..size].iter().any(|&b| b != 0));
        assert!(genomes[size..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_randomized_floats_decode_finite() {
        let schema = Schema::<[f64; 2]>::build(|bind, ph| {
            let mut spec = Spec::new();
            spec.float64_chromosome(vec![bind.gene(ph)]);
            spec
        })
        .unwrap();

        let mut rng = SmallRng::seed_from_u64(3);
        let mut genome = schema.make(1);
        schema.randomize(&mut rng, &mut genome);

        let mut v = [0f64; 2];
        schema.decode(&genome, &mut v);
        assert!(v.iter().all(|x| (0.0..1.0).contains(x)));
    }
}
