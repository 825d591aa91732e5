//! One GA level: a population keyed by a single worst-preference value.
//!
//! # Generation
//!
//! 1. Refill from the level's bucket (blocking only while empty)
//! 2. Carry `elite_count` best candidates over
//! 3. Select parents, cross over, mutate
//! 4. Drop infeasible offspring
//! 5. Keep offspring whose worst preference equals the level; migrate the
//!    rest into the matching bucket, keeping them here when it is full
//!
//! The leading level breeds on several scoped worker threads; the others
//! breed inline and sleep in proportion to their distance from it.
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine
//! Learning", Ch. 4 (island models)

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::bucket::BucketSet;
use super::operators::sample;
use crate::config::{SelectionType, SolverConfig};
use crate::fitness::{Fitness, FitnessEvaluator};
use crate::models::{Candidate, Preference};
use crate::progress::LevelStatus;
use crate::termination::Cancellation;

/// Entries kept in the fitness cache before it is cleared.
const CACHE_LIMIT: usize = 8192;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Best candidate seen by any thread.
#[derive(Debug, Default)]
pub struct SharedBest {
    inner: Mutex<Option<(Fitness, Candidate)>>,
}

impl SharedBest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `candidate` when it beats the current best.
    pub fn offer(&self, fitness: Fitness, candidate: &Candidate) -> bool {
        if !fitness.is_feasible() {
            return false;
        }
        let mut best = lock(&self.inner);
        if best.as_ref().map_or(true, |(f, _)| fitness < *f) {
            *best = Some((fitness, candidate.clone()));
            true
        } else {
            false
        }
    }

    pub fn fitness(&self) -> Option<Fitness> {
        lock(&self.inner).as_ref().map(|(f, _)| *f)
    }

    pub fn take(&self) -> Option<(Fitness, Candidate)> {
        lock(&self.inner).take()
    }
}

/// State a level publishes for the status loop and the pump thread.
#[derive(Debug)]
pub struct LevelShared {
    status: Mutex<LevelStatus>,
    snapshot: Mutex<Vec<Candidate>>,
}

impl LevelShared {
    pub fn new(level: Preference) -> Self {
        Self {
            status: Mutex::new(LevelStatus::new(level)),
            snapshot: Mutex::new(Vec::new()),
        }
    }

    pub fn status(&self) -> LevelStatus {
        lock(&self.status).clone()
    }

    /// Copy of the last published population.
    pub fn snapshot(&self) -> Vec<Candidate> {
        lock(&self.snapshot).clone()
    }
}

/// Lock-guarded fitness memo keyed by the full gene vector.
#[derive(Debug, Default)]
struct FitnessCache {
    entries: Mutex<HashMap<Candidate, Fitness>>,
}

impl FitnessCache {
    fn get_or_evaluate(&self, evaluator: &FitnessEvaluator, candidate: &Candidate) -> Fitness {
        if let Some(&fitness) = lock(&self.entries).get(candidate) {
            return fitness;
        }
        let fitness = evaluator.evaluate(candidate);
        let mut entries = lock(&self.entries);
        if entries.len() >= CACHE_LIMIT {
            entries.clear();
        }
        entries.insert(candidate.clone(), fitness);
        fitness
    }
}

/// Everything a level borrows from the running system.
#[derive(Clone, Copy)]
pub struct LevelContext<'a> {
    pub evaluator: &'a FitnessEvaluator,
    pub config: &'a SolverConfig,
    pub buckets: &'a BucketSet,
    pub best: &'a SharedBest,
    pub shared: &'a LevelShared,
    pub cancel: &'a Cancellation,
}

/// A single-preference island.
pub struct GaLevel<'a> {
    index: usize,
    ctx: LevelContext<'a>,
    population: Vec<(Candidate, Fitness)>,
    generation: usize,
    cache: FitnessCache,
}

impl<'a> GaLevel<'a> {
    /// Level for bucket `index`.
    pub fn new(index: usize, ctx: LevelContext<'a>) -> Self {
        Self {
            index,
            ctx,
            population: Vec::new(),
            generation: 0,
            cache: FitnessCache::default(),
        }
    }

    pub fn level(&self) -> Preference {
        self.ctx.buckets.levels()[self.index]
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn population(&self) -> &[(Candidate, Fitness)] {
        &self.population
    }

    /// Runs generations until cancelled.
    pub fn run<R: Rng>(&mut self, rng: &mut R) {
        while !self.ctx.cancel.is_cancelled() {
            if !self.refill() {
                break;
            }
            self.step(rng);
            self.publish();
            self.throttle();
        }
        if let Some((c, f)) = self.population.first() {
            self.ctx.best.offer(*f, c);
        }
        debug!(
            "Level {} stopped after {} generations",
            self.level(),
            self.generation
        );
    }

    /// Pulls candidates from the bucket. `false` once cancelled while empty.
    pub fn refill(&mut self) -> bool {
        let bucket = self.ctx.buckets.bucket(self.index);
        if self.population.is_empty() {
            match bucket.take(self.ctx.cancel) {
                Some(candidate) => {
                    info!("Level {} seeded", self.level());
                    self.admit(candidate);
                }
                None => return false,
            }
        }
        while self.population.len() < self.ctx.config.population_size.max(2) {
            match bucket.try_take() {
                Some(candidate) => self.admit(candidate),
                None => break,
            }
        }
        true
    }

    fn admit(&mut self, candidate: Candidate) {
        let fitness = self.fitness(&candidate);
        if fitness.is_feasible() {
            self.ctx.best.offer(fitness, &candidate);
            self.population.push((candidate, fitness));
        }
    }

    fn fitness(&self, candidate: &Candidate) -> Fitness {
        self.cache.get_or_evaluate(self.ctx.evaluator, candidate)
    }

    fn is_leading(&self) -> bool {
        self.ctx.buckets.leading() == Some(self.index)
    }

    /// One generation.
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        let config = self.ctx.config;
        self.population.sort_by(|a, b| a.1.cmp(&b.1));

        let elites = config.elite_count.min(self.population.len());
        let mut next: Vec<(Candidate, Fitness)> = self.population[..elites].to_vec();
        let wanted = config.population_size.max(2).saturating_sub(elites);

        let workers = config.crossover_workers.max(1);
        let offspring = if self.is_leading() && workers > 1 && wanted >= 2 * workers {
            self.breed_parallel(wanted, workers, rng)
        } else {
            self.breed(wanted, rng)
        };

        let level = self.level();
        let (mut kept, mut migrated) = (0usize, 0usize);
        for child in offspring {
            let fitness = self.fitness(&child);
            let Some(worst) = fitness.worst_preference() else {
                continue;
            };
            self.ctx.best.offer(fitness, &child);
            let child = match self.ctx.buckets.for_level(worst) {
                Some(bucket) if worst != level => match bucket.try_put(child) {
                    Ok(()) => {
                        migrated += 1;
                        continue;
                    }
                    Err(child) => child,
                },
                _ => child,
            };
            next.push((child, fitness));
            kept += 1;
        }

        // An empty generation would stall the level on its bucket
        if next.is_empty() {
            next = std::mem::take(&mut self.population);
        }
        self.population = next;
        self.generation += 1;
        debug!(
            "Level {level} generation {}: kept {kept}, migrated {migrated}",
            self.generation
        );
    }

    fn breed_parallel<R: Rng>(&self, wanted: usize, workers: usize, rng: &mut R) -> Vec<Candidate> {
        let share = wanted.div_ceil(workers);
        let seeds: Vec<u64> = (0..workers).map(|_| rng.random()).collect();
        thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .into_iter()
                .map(|seed| {
                    scope.spawn(move || {
                        let mut rng = SmallRng::seed_from_u64(seed);
                        self.breed(share, &mut rng)
                    })
                })
                .collect();
            let mut offspring = Vec::with_capacity(wanted);
            for handle in handles {
                if let Ok(children) = handle.join() {
                    offspring.extend(children);
                }
            }
            offspring.truncate(wanted);
            offspring
        })
    }

    /// Produces `count` offspring from the current population.
    pub fn breed<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Candidate> {
        let config = self.ctx.config;
        let ops = &config.operators;
        let crossover_rate = config.crossover_rate.clamp(0.0, 1.0);
        let mutation_rate = config.mutation_rate.clamp(0.0, 1.0);

        let mut offspring = Vec::with_capacity(count);
        if self.population.is_empty() {
            return offspring;
        }
        while offspring.len() < count {
            let p1 = self.select(rng);
            let p2 = self.select(rng);
            let (mut c1, mut c2) = if rng.random_bool(crossover_rate) {
                ops.crossover(p1, p2, rng)
            } else {
                (p1.clone(), p2.clone())
            };
            for child in [&mut c1, &mut c2] {
                if rng.random_bool(mutation_rate) {
                    ops.mutate(self.ctx.evaluator, child, rng);
                }
            }
            offspring.push(c1);
            if offspring.len() < count {
                offspring.push(c2);
            }
        }
        offspring
    }

    /// Picks one parent. The population must be sorted and non-empty.
    fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> &Candidate {
        let len = self.population.len();
        let index = match self.ctx.config.selection {
            SelectionType::Elitist => {
                let top = self.ctx.config.elite_count.clamp(2, len.max(2)).min(len);
                rng.random_range(0..top)
            }
            SelectionType::Tournament { size } => {
                let indices: Vec<usize> = (0..len).collect();
                sample(&indices, size.max(1), rng)
                    .into_iter()
                    .min()
                    .unwrap_or(0)
            }
        };
        &self.population[index].0
    }

    fn publish(&self) {
        let shared = self.ctx.shared;
        {
            let mut status = lock(&shared.status);
            status.generation = self.generation;
            status.population = self.population.len();
            status.best = self.population.iter().map(|(_, f)| *f).min();
            status.bucket_len = self.ctx.buckets.bucket(self.index).len();
        }
        *lock(&shared.snapshot) = self.population.iter().map(|(c, _)| c.clone()).collect();
    }

    fn throttle(&self) {
        let Some(leading) = self.ctx.buckets.leading() else {
            return;
        };
        let distance = self.index.saturating_sub(leading) as u64;
        if distance > 0 && self.ctx.config.throttle_ms > 0 {
            thread::sleep(Duration::from_millis(self.ctx.config.throttle_ms * distance));
        }
    }
}
