// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Bitgene: a genetic-algorithm engine with bit-packed genotype schemas.
//!
//! This crate evolves populations of packed bitstrings (*genotypes*) that
//! mirror a user-defined native value (the *phenotype*). A declarative
//! schema describes which fields of the phenotype take part in evolution
//! and at what bit width; the schema compiler packs the resulting genes
//! into a compact byte layout and derives the codec between the two
//! representations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │         Epoch Driver (Solver)       │
//! ├─────────────────────────────────────┤
//! │  Selection │ Crossover │ Mutation   │
//! ├─────────────────────────────────────┤
//! │     Population (flat genomes)       │
//! ├─────────────────────────────────────┤
//! │   Genotype Schema (packer + codec)  │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use bitgene::{Schema, Solver, SolverConfig};
//!
//! let schema = Schema::<Vec<u8>>::binary(8, 4).unwrap();
//! let fitness = |v: &Vec<u8>| v.iter().map(|b| f64::from(b.count_ones())).sum();
//!
//! let config = SolverConfig {
//!     population_size: 64,
//!     target_fitness: Some(32.0),
//!     ..SolverConfig::default()
//! };
//! let mut solver = Solver::new(schema, fitness, config).unwrap();
//! let (best, found) = solver.epochs(100).unwrap();
//! assert!(best.fitness <= 32.0 || !found);
//! ```

pub mod crossover;
pub mod genotype;
pub mod mutation;
pub mod population;
pub mod selection;
pub mod solver;
pub mod workerpool;

#[cfg(test)]
pub(crate) mod testutil;

pub use crossover::{
    single_point, two_points, Crossover, CrossoverError, KPoints, ParametricHalfUniform, Probability,
};
pub use genotype::{
    Bindable, Binder, ChromosomeKind, Complex32, Complex64, Flags, GeneSpec, Locus, Phenotype, Scalar,
    ScalarKind, Schema, SchemaError, Spec,
};
pub use mutation::{BitString, Mutation};
pub use population::{Population, Stats};
pub use selection::{Random, RouletteWheel, Selection, SelectionError};
pub use solver::{ConfigError, Elitism, EpochError, Fittest, Solver, SolverConfig};
pub use workerpool::{PoolError, PoolStatus, WorkerPool};
