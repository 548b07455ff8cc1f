//! Genotype schema compiler and codec.
//!
//! A schema describes how a native *phenotype* value maps onto a packed
//! bitstring *genotype*. Users declare which fields evolve and at what bit
//! width; compilation bin-packs the resulting genes into 64-bit cells
//! (best-fit-decreasing) and derives the bidirectional codec.
//!
//! # Example
//!
//! ```
//! use bitgene::{Schema, Spec};
//!
//! #[derive(Clone, Default)]
//! struct Knobs {
//!     gain: u16,
//!     taps: [u8; 4],
//! }
//! impl bitgene::Phenotype for Knobs {}
//!
//! let schema = Schema::<Knobs>::build(|bind, ph| {
//!     let mut spec = Spec::new();
//!     spec.int_chromosome(vec![
//!         bind.gene(&ph.gain).bits(10),
//!         bind.gene(&ph.taps),
//!     ]);
//!     spec
//! })
//! .unwrap();
//!
//! assert_eq!(schema.size(), 6); // 10 + 4*8 bits, packed
//! ```

mod builder;
mod chromosome;
mod gene;
mod locus;
mod packer;
mod scalar;
mod schema;

pub use builder::{Binder, ChromosomeSpec, GeneSpec, SchemaError, Spec};
pub use chromosome::{Chromosome, ChromosomeKind, Flags};
#[doc(hidden)]
pub use gene::DynResolver;
pub use gene::Gene;
pub use locus::Locus;
pub use scalar::{Bindable, Complex32, Complex64, Scalar, ScalarKind};
pub use schema::{Phenotype, Schema};
