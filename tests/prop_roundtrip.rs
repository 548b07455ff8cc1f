//! Property-based round-trip tests for the genotype codec.
//!
//! Every phenotype whose fields fit their declared bit widths must survive
//! encode → decode unchanged; floats are compared by bit pattern so NaN
//! payloads count too.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use bitgene::{Complex32, Complex64, Phenotype, Schema, Spec};
use proptest::prelude::*;

#[derive(Clone, Default, Debug)]
struct IntBag {
    b: bool,
    i64: i64,
    i32: i32,
    i16: i16,
    i8: i8,
    u64: u64,
    u32: u32,
    u16: u16,
    u8: u8,
}
impl Phenotype for IntBag {}

fn int_schema() -> Schema<IntBag> {
    Schema::build(|bind, ph: &IntBag| {
        let mut spec = Spec::new();
        spec.int_chromosome(vec![
            bind.gene(&ph.b),
            bind.gene(&ph.i64),
            bind.gene(&ph.i32),
            bind.gene(&ph.i16),
            bind.gene(&ph.i8),
            bind.gene(&ph.u64),
            bind.gene(&ph.u32),
            bind.gene(&ph.u16),
            bind.gene(&ph.u8),
        ]);
        spec
    })
    .unwrap()
}

#[derive(Clone, Default, Debug)]
struct FloatBag {
    f32: f32,
    f64: f64,
    c64: Complex32,
    c128: Complex64,
}
impl Phenotype for FloatBag {}

fn float_schema() -> Schema<FloatBag> {
    Schema::build(|bind, ph: &FloatBag| {
        let mut spec = Spec::new();
        spec.float32_chromosome(vec![bind.gene(&ph.f32), bind.gene(&ph.c64)]);
        spec.float64_chromosome(vec![bind.gene(&ph.f64), bind.gene(&ph.c128)]);
        spec
    })
    .unwrap()
}

#[derive(Clone, Default, Debug)]
struct ArrayBag {
    b: [bool; 3],
    i: [i16; 3],
    f: [f32; 3],
    c: [Complex32; 3],
}
impl Phenotype for ArrayBag {}

fn array_schema() -> Schema<ArrayBag> {
    Schema::build(|bind, ph: &ArrayBag| {
        let mut spec = Spec::new();
        spec.int_chromosome(vec![bind.gene(&ph.b), bind.gene(&ph.i)]);
        spec.float32_chromosome(vec![bind.gene(&ph.f), bind.gene(&ph.c)]);
        spec
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn prop_int_roundtrip(
        b in any::<bool>(),
        i64v in any::<i64>(),
        i32v in any::<i32>(),
        i16v in any::<i16>(),
        i8v in any::<i8>(),
        u64v in any::<u64>(),
        u32v in any::<u32>(),
        u16v in any::<u16>(),
        u8v in any::<u8>(),
    ) {
        let schema = int_schema();
        let value = IntBag {
            b,
            i64: i64v,
            i32: i32v,
            i16: i16v,
            i8: i8v,
            u64: u64v,
            u32: u32v,
            u16: u16v,
            u8: u8v,
        };

        let mut genome = schema.make(1);
        schema.encode(&value, &mut genome);
        let mut decoded = IntBag::default();
        schema.decode(&genome, &mut decoded);

        prop_assert_eq!(decoded.b, value.b);
        prop_assert_eq!(decoded.i64, value.i64);
        prop_assert_eq!(decoded.i32, value.i32);
        prop_assert_eq!(decoded.i16, value.i16);
        prop_assert_eq!(decoded.i8, value.i8);
        prop_assert_eq!(decoded.u64, value.u64);
        prop_assert_eq!(decoded.u32, value.u32);
        prop_assert_eq!(decoded.u16, value.u16);
        prop_assert_eq!(decoded.u8, value.u8);
    }

    #[test]
    fn prop_float_roundtrip_bitwise(
        f32_bits in any::<u32>(),
        f64_bits in any::<u64>(),
        c64_bits in any::<[u32; 2]>(),
        c128_bits in any::<[u64; 2]>(),
    ) {
        let schema = float_schema();
        let value = FloatBag {
            f32: f32::from_bits(f32_bits),
            f64: f64::from_bits(f64_bits),
            c64: Complex32::new(f32::from_bits(c64_bits[0]), f32::from_bits(c64_bits[1])),
            c128: Complex64::new(f64::from_bits(c128_bits[0]), f64::from_bits(c128_bits[1])),
        };

        let mut genome = schema.make(1);
        schema.encode(&value, &mut genome);
        let mut decoded = FloatBag::default();
        schema.decode(&genome, &mut decoded);

        prop_assert_eq!(decoded.f32.to_bits(), f32_bits);
        prop_assert_eq!(decoded.f64.to_bits(), f64_bits);
        prop_assert_eq!(decoded.c64.re.to_bits(), c64_bits[0]);
        prop_assert_eq!(decoded.c64.im.to_bits(), c64_bits[1]);
        prop_assert_eq!(decoded.c128.re.to_bits(), c128_bits[0]);
        prop_assert_eq!(decoded.c128.im.to_bits(), c128_bits[1]);
    }

    #[test]
    fn prop_array_roundtrip(
        bools in any::<[bool; 3]>(),
        ints in any::<[i16; 3]>(),
        float_bits in any::<[u32; 3]>(),
        complex_bits in any::<[u32; 6]>(),
    ) {
        let schema = array_schema();
        let value = ArrayBag {
            b: bools,
            i: ints,
            f: [
                f32::from_bits(float_bits[0]),
                f32::from_bits(float_bits[1]),
                f32::from_bits(float_bits[2]),
            ],
            c: [
                Complex32::new(f32::from_bits(complex_bits[0]), f32::from_bits(complex_bits[1])),
                Complex32::new(f32::from_bits(complex_bits[2]), f32::from_bits(complex_bits[3])),
                Complex32::new(f32::from_bits(complex_bits[4]), f32::from_bits(complex_bits[5])),
            ],
        };

        let mut genome = schema.make(1);
        schema.encode(&value, &mut genome);
        let mut decoded = ArrayBag::default();
        schema.decode(&genome, &mut decoded);

        prop_assert_eq!(decoded.b, value.b);
        prop_assert_eq!(decoded.i, value.i);
        for k in 0..3 {
            prop_assert_eq!(decoded.f[k].to_bits(), value.f[k].to_bits());
            prop_assert_eq!(decoded.c[k].re.to_bits(), value.c[k].re.to_bits());
            prop_assert_eq!(decoded.c[k].im.to_bits(), value.c[k].im.to_bits());
        }
    }

    #[test]
    fn prop_narrowed_gene_masks_to_width(value in any::<u16>(), bits in 1u32..=16) {
        #[derive(Clone, Default, Debug)]
        struct Narrow {
            v: u16,
        }
        impl Phenotype for Narrow {}

        let schema = Schema::<Narrow>::build(|bind, ph| {
            let mut spec = Spec::new();
            spec.int_chromosome(vec![bind.gene(&ph.v).bits(bits)]);
            spec
        })
        .unwrap();

        let mut genome = schema.make(1);
        schema.encode(&Narrow { v: value }, &mut genome);
        let mut decoded = Narrow::default();
        schema.decode(&genome, &mut decoded);

        let mask = if bits == 16 { u16::MAX } else { (1u16 << bits) - 1 };
        prop_assert_eq!(decoded.v, value & mask);
    }

    #[test]
    fn prop_sequence_roundtrip(values in proptest::collection::vec(any::<u8>(), 1..16)) {
        let len = values.len();
        let schema = Schema::<Vec<u8>>::binary(8, len).unwrap();

        let mut genome = schema.make(1);
        schema.encode(&values, &mut genome);
        let mut decoded = vec![0u8; len];
        schema.decode(&genome, &mut decoded);

        prop_assert_eq!(decoded, values);
    }
}
