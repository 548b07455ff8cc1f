//! Population model: flat genome storage with fitness aggregates.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::genotype::{Phenotype, Schema};

/// A fixed-size population of genomes stored contiguously, with a fitness
/// vector and incrementally maintained aggregates.
///
/// Genome `i` occupies bytes `[i * chromosome_len, (i + 1) * chromosome_len)`
/// of the flat buffer.
#[derive(Debug)]
pub struct Population {
    size: usize,
    chromosome_len: usize,
    genotype: Vec<u8>,
    fitness: Vec<f64>,
    total_fitness: f64,
    is_sorted: bool,
    fittest: Option<usize>,
    worst: Option<usize>,
}

impl Population {
    /// Allocate a population of `size` genomes, all randomized through the
    /// schema.
    #[must_use]
    pub fn new<P: Phenotype>(schema: &Schema<P>, size: usize, rng: &mut dyn RngCore) -> Self {
        let chromosome_len = schema.size();
        let mut genotype = schema.make(size);
        for genome in genotype.chunks_exact_mut(chromosome_len.max(1)) {
            schema.randomize(rng, genome);
        }

        Self {
            size,
            chromosome_len,
            genotype,
            fitness: vec![0.0; size],
            total_fitness: 0.0,
            is_sorted: false,
            fittest: None,
            worst: None,
        }
    }

    /// Number of individuals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the population holds no individuals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Genome size in bytes.
    #[must_use]
    pub fn chromosome_len(&self) -> usize {
        self.chromosome_len
    }

    /// Genome `i` as a byte slice.
    #[must_use]
    pub fn genome(&self, i: usize) -> &[u8] {
        let start = i * self.chromosome_len;
        &self.genotype[start..start + self.chromosome_len]
    }

    /// Genome `i` as a mutable byte slice.
    pub fn genome_mut(&mut self, i: usize) -> &mut [u8] {
        let start = i * self.chromosome_len;
        &mut self.genotype[start..start + self.chromosome_len]
    }

    /// Two distinct genomes borrowed mutably at once (`i < j`).
    pub(crate) fn genome_pair_mut(&mut self, i: usize, j: usize) -> (&mut [u8], &mut [u8]) {
        debug_assert!(i < j);
        let (head, tail) = self.genotype.split_at_mut(j * self.chromosome_len);
        let start = i * self.chromosome_len;
        (
            &mut head[start..start + self.chromosome_len],
            &mut tail[..self.chromosome_len],
        )
    }

    /// Fitness of individual `i`.
    #[must_use]
    pub fn fitness(&self, i: usize) -> f64 {
        self.fitness[i]
    }

    /// Record a fitness score, maintaining the total and the fittest/worst
    /// indices incrementally.
    pub fn set_fitness(&mut self, i: usize, f: f64) {
        self.total_fitness += f - self.fitness[i];
        self.fitness[i] = f;

        if self.worst.map_or(true, |w| f < self.fitness[w]) {
            self.worst = Some(i);
        }
        if self.fittest.map_or(true, |b| f > self.fitness[b]) {
            self.fittest = Some(i);
        }
    }

    /// Sum of all recorded fitness scores.
    #[must_use]
    pub fn total_fitness(&self) -> f64 {
        self.total_fitness
    }

    /// Index and fitness of the best individual, if any score was recorded.
    #[must_use]
    pub fn fittest(&self) -> Option<(usize, f64)> {
        self.fittest.map(|i| (i, self.fitness[i]))
    }

    /// Index and fitness of the worst individual, if any score was recorded.
    #[must_use]
    pub fn worst(&self) -> Option<(usize, f64)> {
        self.worst.map(|i| (i, self.fitness[i]))
    }

    /// Clear the fitness vector and every aggregate for a new epoch.
    pub fn reset(&mut self) {
        self.fitness.fill(0.0);
        self.total_fitness = 0.0;
        self.fittest = None;
        self.worst = None;
        self.is_sorted = false;
    }

    /// Shift all fitness scores so the minimum is zero, when it is
    /// negative. The shift is irreversible and updates the total.
    pub fn make_fitness_positive(&mut self) {
        let Some(worst) = self.worst else { return };
        let worst_fitness = self.fitness[worst];
        if worst_fitness >= 0.0 {
            return;
        }

        for f in &mut self.fitness {
            *f -= worst_fitness;
        }
        self.total_fitness -= worst_fitness * self.size as f64;
    }

    /// Stable sort by descending fitness, permuting the fitness vector and
    /// the genome slabs together. Idempotent until the next
    /// [`reset`](Self::reset).
    pub fn sort_by_fitness_desc(&mut self) {
        if self.is_sorted {
            return;
        }

        let mut order: Vec<usize> = (0..self.size).collect();
        order.sort_by(|&a, &b| {
            self.fitness[b]
                .partial_cmp(&self.fitness[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut genotype = vec![0u8; self.genotype.len()];
        let mut fitness = vec![0.0; self.size];
        for (to, &from) in order.iter().enumerate() {
            fitness[to] = self.fitness[from];
            genotype[to * self.chromosome_len..(to + 1) * self.chromosome_len]
                .copy_from_slice(self.genome(from));
        }
        self.genotype = genotype;
        self.fitness = fitness;

        if self.fittest.is_some() {
            self.fittest = Some(0);
            self.worst = Some(self.size - 1);
        }
        self.is_sorted = true;
    }

    /// Aggregate fitness statistics over the current population.
    #[must_use]
    pub fn stats(&self) -> Stats {
        Stats::from_fitness(&self.fitness)
    }
}

/// Snapshot of a population's fitness distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Index of the best individual.
    pub fittest: usize,
    /// Index of the worst individual.
    pub worst: usize,
    /// Lowest fitness.
    pub min_fitness: f64,
    /// Highest fitness.
    pub max_fitness: f64,
    /// Sum of all fitness scores.
    pub total_fitness: f64,
    /// Mean fitness.
    pub mean: f64,
    /// Population variance of fitness.
    pub variance: f64,
    /// Standard deviation of fitness.
    pub std_dev: f64,
}

impl Stats {
    /// Compute statistics over a fitness vector.
    #[must_use]
    pub fn from_fitness(fitness: &[f64]) -> Self {
        if fitness.is_empty() {
            return Self {
                fittest: 0,
                worst: 0,
                min_fitness: 0.0,
                max_fitness: 0.0,
                total_fitness: 0.0,
                mean: 0.0,
                variance: 0.0,
                std_dev: 0.0,
            };
        }

        let mut fittest = 0;
        let mut worst = 0;
        let mut total = 0.0;
        for (i, &f) in fitness.iter().enumerate() {
            total += f;
            if f > fitness[fittest] {
                fittest = i;
            }
            if f < fitness[worst] {
                worst = i;
            }
        }

        let n = fitness.len() as f64;
        let mean = total / n;
        let variance = fitness.iter().map(|f| (f - mean) * (f - mean)).sum::<f64>() / n;

        Self {
            fittest,
            worst,
            min_fitness: fitness[worst],
            max_fitness: fitness[fittest],
            total_fitness: total,
            mean,
            variance,
            std_dev: variance.sqrt(),
        }
    }
}
