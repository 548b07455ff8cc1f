//! Generational GA driver: evaluate, select, breed, repeat.

// Target-fitness checks compare floats exactly, as configured.
#![allow(clippy::float_cmp)]

use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::crossover::CrossoverError;
use crate::genotype::{Phenotype, Schema};
use crate::population::Population;
use crate::selection::{RouletteWheel, Selection, SelectionError};

/// Elitist selection: the top `size` genomes each contribute `copies`
/// entries to the breeding-pool prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elitism {
    /// How many top genomes to preserve.
    pub size: usize,
    /// Pool entries per preserved genome.
    pub copies: usize,
}

impl Elitism {
    fn len(self) -> usize {
        self.size * self.copies
    }
}

/// Configuration for a [`Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Number of individuals; must be positive and even.
    pub population_size: usize,
    /// Stop as soon as the best fitness equals this value exactly.
    pub target_fitness: Option<f64>,
    /// Optional elitist prefix of the breeding pool.
    pub elitism: Option<Elitism>,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Evaluate fitness on the rayon thread pool. Scores are applied in
    /// index order afterwards, so results match the serial path.
    pub parallel: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            target_fitness: None,
            elitism: None,
            seed: 42,
            parallel: false,
        }
    }
}

/// Invalid driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Population size was zero or odd.
    PopulationSize(usize),
    /// Elitism size or copies was zero.
    Elitism {
        /// Configured elite size.
        size: usize,
        /// Configured copies per elite genome.
        copies: usize,
    },
    /// The elitist prefix would not fit the breeding pool.
    ElitismOverflow {
        /// `size * copies`.
        len: usize,
        /// Configured population size.
        population_size: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PopulationSize(n) => {
                write!(f, "population size must be a positive even number, was {n}")
            }
            ConfigError::Elitism { size, copies } => {
                write!(f, "elite size/copies must be > 0, was {size}/{copies}")
            }
            ConfigError::ElitismOverflow { len, population_size } => {
                write!(f, "elite prefix of {len} exceeds population of {population_size}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// An epoch failure; the epoch that raised it was aborted.
#[derive(Debug, Clone, PartialEq)]
pub enum EpochError {
    /// Breeding-pool selection failed.
    Selection(SelectionError),
    /// A crossover operator rejected its chromosome.
    Crossover(CrossoverError),
}

impl fmt::Display for EpochError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpochError::Selection(e) => write!(f, "selection failed: {e}"),
            EpochError::Crossover(e) => write!(f, "crossover failed: {e}"),
        }
    }
}

impl std::error::Error for EpochError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EpochError::Selection(e) => Some(e),
            EpochError::Crossover(e) => Some(e),
        }
    }
}

impl From<SelectionError> for EpochError {
    fn from(e: SelectionError) -> Self {
        EpochError::Selection(e)
    }
}

impl From<CrossoverError> for EpochError {
    fn from(e: CrossoverError) -> Self {
        EpochError::Crossover(e)
    }
}

/// The best individual of the most recent evaluation.
#[derive(Debug, Clone)]
pub struct Fittest<P> {
    /// Index inside the population.
    pub index: usize,
    /// Its fitness score.
    pub fitness: f64,
    /// Its decoded phenotype.
    pub phenotype: P,
}

/// Generational genetic-algorithm driver.
///
/// Each epoch decodes and scores every genome, optionally stops on the
/// target fitness, fills a breeding pool (elitist prefix plus selection)
/// and breeds the next generation in place.
pub struct Solver<P: Phenotype, F> {
    schema: Schema<P>,
    population: Population,
    breeding_pool: Vec<usize>,
    generation: usize,
    fitness_fn: F,
    target_fitness: Option<f64>,
    elitism: Option<Elitism>,
    parallel: bool,
    selection: Box<dyn Selection>,
    rng: SmallRng,
    mom_scratch: Vec<u8>,
    dad_scratch: Vec<u8>,
}

impl<P: Phenotype, F> fmt::Debug for Solver<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("schema", &self.schema)
            .field("population", &self.population)
            .field("breeding_pool", &self.breeding_pool)
            .field("generation", &self.generation)
            .field("target_fitness", &self.target_fitness)
            .field("elitism", &self.elitism)
            .field("parallel", &self.parallel)
            .field("selection", &self.selection)
            .field("rng", &self.rng)
            .field("mom_scratch", &self.mom_scratch)
            .field("dad_scratch", &self.dad_scratch)
            .finish_non_exhaustive()
    }
}

impl<P, F> Solver<P, F>
where
    P: Phenotype,
    F: Fn(&P) -> f64 + Sync,
{
    /// Create a solver with a randomized initial population.
    ///
    /// Selection defaults to [`RouletteWheel`]; replace it with
    /// [`with_selection`](Self::with_selection).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid population size or elitism
    /// setup.
    pub fn new(schema: Schema<P>, fitness_fn: F, config: SolverConfig) -> Result<Self, ConfigError> {
        if config.population_size == 0 || config.population_size % 2 != 0 {
            return Err(ConfigError::PopulationSize(config.population_size));
        }
        if let Some(elite) = config.elitism {
            if elite.size == 0 || elite.copies == 0 {
                return Err(ConfigError::Elitism {
                    size: elite.size,
                    copies: elite.copies,
                });
            }
            if elite.len() > config.population_size {
                return Err(ConfigError::ElitismOverflow {
                    len: elite.len(),
                    population_size: config.population_size,
                });
            }
        }

        let mut rng = SmallRng::seed_from_u64(config.seed);
        let population = Population::new(&schema, config.population_size, &mut rng);
        let genome_size = schema.size();

        Ok(Self {
            schema,
            population,
            breeding_pool: vec![0; config.population_size],
            generation: 1,
            fitness_fn,
            target_fitness: config.target_fitness,
            elitism: config.elitism,
            parallel: config.parallel,
            selection: Box::new(RouletteWheel),
            rng,
            mom_scratch: vec![0; genome_size],
            dad_scratch: vec![0; genome_size],
        })
    }

    /// Replace the selection operator.
    #[must_use]
    pub fn with_selection(mut self, op: impl Selection + 'static) -> Self {
        self.selection = Box::new(op);
        self
    }

    /// Current generation, starting at 1.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Configured target fitness, or NaN when unset.
    #[must_use]
    pub fn target_fitness(&self) -> f64 {
        self.target_fitness.unwrap_or(f64::NAN)
    }

    /// Configured elitism, if any.
    #[must_use]
    pub fn elitism(&self) -> Option<Elitism> {
        self.elitism
    }

    /// The current population.
    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// The schema genomes are bred under.
    #[must_use]
    pub fn schema(&self) -> &Schema<P> {
        &self.schema
    }

    /// Run a single epoch. Equivalent to `epochs(1)`.
    ///
    /// # Errors
    ///
    /// See [`epochs`](Self::epochs).
    pub fn epoch(&mut self) -> Result<(Fittest<P>, bool), EpochError> {
        self.epochs(1)
    }

    /// Run up to `n` epochs, stopping early when the best fitness equals
    /// the configured target exactly. Returns the champion of the last
    /// evaluation and whether the target was hit.
    ///
    /// # Errors
    ///
    /// Returns an [`EpochError`] when selection or crossover fails; the
    /// offending epoch is aborted.
    ///
    /// # Panics
    ///
    /// Panics when `n` is zero.
    pub fn epochs(&mut self, n: usize) -> Result<(Fittest<P>, bool), EpochError> {
        assert!(n > 0, "cannot run zero epochs");

        let mut champion = None;
        for _ in 0..n {
            let (fittest, found) = self.evaluate();

            let stats = self.population.stats();
            log::debug!(
                "generation {:>5}: best={:.4} mean={:.4} std={:.4}",
                self.generation,
                stats.max_fitness,
                stats.mean,
                stats.std_dev
            );

            if found {
                return Ok((fittest, true));
            }
            champion = Some(fittest);
            self.next_generation()?;
        }

        // The loop body always assigns on the non-found path.
        let fittest = champion.unwrap_or_else(|| unreachable!());
        Ok((fittest, false))
    }

    /// Score every genome and report the champion plus target status.
    fn evaluate(&mut self) -> (Fittest<P>, bool) {
        self.population.reset();

        if self.parallel {
            let schema = &self.schema;
            let population = &self.population;
            let fitness_fn = &self.fitness_fn;
            let scores: Vec<f64> = (0..population.len())
                .into_par_iter()
                .map_init(
                    || schema.init_phenotype(),
                    |phenotype, i| {
                        schema.decode(population.genome(i), phenotype);
                        fitness_fn(phenotype)
                    },
                )
                .collect();
            for (i, score) in scores.into_iter().enumerate() {
                self.population.set_fitness(i, score);
            }
        } else {
            let mut phenotype = self.schema.init_phenotype();
            for i in 0..self.population.len() {
                self.schema.decode(self.population.genome(i), &mut phenotype);
                let score = (self.fitness_fn)(&phenotype);
                self.population.set_fitness(i, score);
            }
        }

        let (index, fitness) = self
            .population
            .fittest()
            .unwrap_or_else(|| unreachable!("population is never empty"));

        let mut phenotype = self.schema.init_phenotype();
        self.schema.decode(self.population.genome(index), &mut phenotype);
        let fittest = Fittest {
            index,
            fitness,
            phenotype,
        };

        let found = self.target_fitness.map_or(false, |target| fitness == target);
        (fittest, found)
    }

    fn next_generation(&mut self) -> Result<(), EpochError> {
        self.select_breeding_pool()?;

        for i in (0..self.population.len()).step_by(2) {
            let mom = self.breeding_pool[i];
            let dad = self.breeding_pool[i + 1];
            self.mom_scratch.copy_from_slice(self.population.genome(mom));
            self.dad_scratch.copy_from_slice(self.population.genome(dad));

            let (child1, child2) = self.population.genome_pair_mut(i, i + 1);
            self.schema
                .crossover(&mut self.rng, &self.mom_scratch, &self.dad_scratch, child1, child2)?;
            self.schema.mutate(&mut self.rng, child1);
            self.schema.mutate(&mut self.rng, child2);
        }

        self.generation += 1;
        Ok(())
    }

    fn select_breeding_pool(&mut self) -> Result<(), EpochError> {
        let mut pos = 0;
        if let Some(elite) = self.elitism {
            self.population.sort_by_fitness_desc();

            for i in 0..elite.size {
                for _ in 0..elite.copies {
                    self.breeding_pool[pos] = i;
                    pos += 1;
                }
            }
        }

        self.selection
            .select_into(&mut self.rng, &mut self.population, &mut self.breeding_pool[pos..])?;
        Ok(())
    }
}
