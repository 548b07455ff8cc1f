//! Selection operators: choosing breeding-pool parents from a population.

use std::fmt;

use rand::{Rng, RngCore};

use crate::population::Population;

/// Fills a breeding pool with indices of selected genomes.
pub trait Selection: Send + Sync + std::fmt::Debug {
    /// Write a selected genome index into every slot of `pool`.
    ///
    /// # Errors
    ///
    /// Returns a [`SelectionError`] when the population's fitness state is
    /// numerically corrupt.
    fn select_into(
        &self,
        rng: &mut dyn RngCore,
        population: &mut Population,
        pool: &mut [usize],
    ) -> Result<(), SelectionError>;
}

/// Selection invariant violations.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// A roulette spin exhausted the fitness vector without landing.
    FitnessUnderflow {
        /// Total fitness the spin started from.
        total: f64,
        /// The drawn target value.
        target: f64,
        /// What remained after subtracting every fitness.
        remaining: f64,
    },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::FitnessUnderflow { total, target, remaining } => write!(
                f,
                "bad total fitness {total}: spin from {target} came up {remaining} short"
            ),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Uniform random selection, ignoring fitness.
#[derive(Debug, Clone, Copy, Default)]
pub struct Random;

impl Selection for Random {
    fn select_into(
        &self,
        rng: &mut dyn RngCore,
        population: &mut Population,
        pool: &mut [usize],
    ) -> Result<(), SelectionError> {
        let n = population.len();
        for slot in pool {
            *slot = rng.gen_range(0..n);
        }
        Ok(())
    }
}

/// Fitness-proportionate selection.
///
/// Shifts the population's fitness to non-negative first; this rescaling is
/// irreversible, so repeated selections within one generation see the
/// shifted values. A zero fitness total degrades to uniform selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouletteWheel;

impl Selection for RouletteWheel {
    fn select_into(
        &self,
        rng: &mut dyn RngCore,
        population: &mut Population,
        pool: &mut [usize],
    ) -> Result<(), SelectionError> {
        population.make_fitness_positive();

        let total = population.total_fitness();
        if total == 0.0 {
            return Random.select_into(rng, population, pool);
        }

        let n = population.len();
        'slots: for slot in pool {
            let target = rng.gen::<f64>() * total;
            let mut remaining = target;
            for idx in 0..n {
                remaining -= population.fitness(idx);
                if remaining <= 0.0 {
                    *slot = idx;
                    continue 'slots;
                }
            }
            return Err(SelectionError::FitnessUnderflow { total, target, remaining });
        }
        Ok(())
    }
}
