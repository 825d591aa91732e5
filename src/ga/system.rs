//! Multi-level concurrent GA orchestration.
//!
//! # Threads
//!
//! - `presolver_threads` presolvers produce feasible seeds (greedy, or
//!   backtracking schedulings assigned greedily), refine them and block
//!   on the bucket matching their worst preference
//! - one [`GaLevel`] per preference value
//! - one preference-pump thread re-filing improved candidates into
//!   better buckets
//! - the calling thread reports progress until the deadline
//!
//! All threads share one [`Cancellation`]. Once it trips they finish their
//! current unit of work, the scope joins them and the global best becomes
//! the solution.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use super::bucket::BucketSet;
use super::level::{GaLevel, LevelContext, LevelShared, SharedBest};
use crate::config::SolverConfig;
use crate::critical::CriticalSetAnalysis;
use crate::error::SolveError;
use crate::fitness::FitnessEvaluator;
use crate::local::{LocalSearch, PreferencePump, PumpResult};
use crate::models::{InputData, Solution};
use crate::progress::{ProgressObserver, ProgressReport};
use crate::scheduler::{BacktrackingScheduler, GreedySolver, SolutionKpi};
use crate::termination::Cancellation;

/// Multi-level GA over one input.
pub struct GaSystem<'o> {
    input: Arc<InputData>,
    config: SolverConfig,
    observer: Option<&'o dyn ProgressObserver>,
}

/// State shared by every thread of one run.
struct Run<'a> {
    input: &'a Arc<InputData>,
    config: &'a SolverConfig,
    evaluator: FitnessEvaluator,
    analysis: Arc<CriticalSetAnalysis>,
    buckets: BucketSet,
    shared: Vec<LevelShared>,
    best: SharedBest,
    cancel: Cancellation,
}

impl<'o> GaSystem<'o> {
    pub fn new(input: Arc<InputData>, config: SolverConfig) -> Self {
        Self {
            input,
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'o dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Runs until the configured timeout and returns the verified best.
    pub fn run(&self) -> Result<Solution, SolveError> {
        let input = &self.input;
        let config = &self.config;
        let analysis = CriticalSetAnalysis::with_ceiling(input, config.max_preference);
        info!(
            "GA start: {} workshops, {} participants, {} slots, {} levels, bound {:?}",
            input.workshop_count(),
            input.participant_count(),
            input.slot_count(),
            input.preference_levels().len(),
            analysis.preference_bound()
        );

        let run = Run {
            input,
            config,
            evaluator: FitnessEvaluator::new(Arc::clone(input), config.preference_exponent),
            analysis: Arc::new(analysis),
            buckets: BucketSet::new(input.preference_levels(), config.bucket_capacity),
            shared: input
                .preference_levels()
                .iter()
                .map(|&l| LevelShared::new(l))
                .collect(),
            best: SharedBest::new(),
            cancel: Cancellation::with_budget(config.timeout()),
        };

        let presolvers = config.presolver_threads.max(1);
        thread::scope(|scope| {
            for i in 0..presolvers {
                let run = &run;
                scope.spawn(move || run.presolve(i));
            }
            for i in 0..run.buckets.len() {
                let run = &run;
                scope.spawn(move || {
                    let ctx = LevelContext {
                        evaluator: &run.evaluator,
                        config: run.config,
                        buckets: &run.buckets,
                        best: &run.best,
                        shared: &run.shared[i],
                        cancel: &run.cancel,
                    };
                    let mut rng =
                        SmallRng::seed_from_u64(config.thread_seed((presolvers + i) as u64));
                    GaLevel::new(i, ctx).run(&mut rng);
                });
            }
            {
                let run = &run;
                let seed = config.thread_seed((presolvers + run.buckets.len()) as u64);
                scope.spawn(move || run.pump_loop(seed));
            }
            self.report_until_deadline(&run);
        });

        let Some((fitness, candidate)) = run.best.take() else {
            warn!("No feasible candidate found within {}ms", config.timeout_ms);
            return Err(SolveError::NoSolutionFound);
        };
        let solution = Solution::from_candidate(&candidate, fitness);
        if let Err(e) = solution.verify(input) {
            warn!("Best candidate failed verification: {e}");
            return Err(e);
        }
        let kpi = SolutionKpi::calculate(&solution, input);
        info!(
            "GA finished: fitness ({}, {:.4}), avg preference {:.2}, top choice rate {:.2}",
            fitness.major, fitness.minor, kpi.avg_preference, kpi.top_choice_rate
        );
        Ok(solution)
    }

    fn report_until_deadline(&self, run: &Run<'_>) {
        let interval = Duration::from_millis(self.config.status_interval_ms.max(1));
        while !run.cancel.is_cancelled() {
            thread::sleep(run.cancel.remaining().min(interval));
            if let Some(observer) = self.observer {
                observer.on_progress(&run.report());
            }
        }
        run.cancel.cancel();
    }
}

impl Run<'_> {
    fn report(&self) -> ProgressReport {
        ProgressReport {
            best: self.best.fitness(),
            eta: self.cancel.remaining(),
            levels: self
                .shared
                .iter()
                .enumerate()
                .map(|(i, shared)| {
                    let mut status = shared.status();
                    status.bucket_len = self.buckets.bucket(i).len();
                    status
                })
                .collect(),
        }
    }

    fn pump(&self) -> PreferencePump {
        PreferencePump::new(self.config.pump_max_depth, self.config.pump_timeout())
    }

    /// Produces seeds until cancelled.
    fn presolve(&self, index: usize) {
        let mut rng = SmallRng::seed_from_u64(self.config.thread_seed(index as u64));
        let greedy = GreedySolver::new(Arc::clone(self.input));
        let mut stream = self.config.use_backtracking.then(|| {
            BacktrackingScheduler::new(Arc::clone(self.input))
                .with_analysis(Arc::clone(&self.analysis))
                .with_search_timeout(self.config.timeout() / 4)
                .with_cancellation(self.cancel.clone())
                .stream(SmallRng::seed_from_u64(
                    self.config.thread_seed(index as u64) ^ 0x5eed,
                ))
        });
        let pump = self.pump();
        let (mut attempts, mut produced) = (0usize, 0usize);

        while !self.cancel.is_cancelled() {
            attempts += 1;
            let candidate = match stream.as_mut() {
                Some(stream) => match stream.next() {
                    Some(scheduling) => greedy.assign(&scheduling, &mut rng),
                    None => break,
                },
                None => greedy.solve(&mut rng),
            };
            let Some(mut candidate) = candidate else {
                continue;
            };
            LocalSearch::new(&self.evaluator).optimize(&mut candidate);
            let worst = self.evaluator.worst_preference(&candidate);
            if worst > 0 {
                pump.pump(&self.evaluator, &mut candidate, worst, &mut rng);
            }
            let fitness = self.evaluator.evaluate(&candidate);
            let Some(bucket) = fitness
                .worst_preference()
                .and_then(|w| self.buckets.for_level(w))
            else {
                continue;
            };
            self.best.offer(fitness, &candidate);
            if bucket.put(candidate, &self.cancel).is_err() {
                break;
            }
            produced += 1;
        }

        if produced == 0 {
            warn!("Presolver {index} produced no feasible seed in {attempts} attempts");
        } else {
            debug!("Presolver {index} produced {produced} seeds in {attempts} attempts");
        }
    }

    /// Periodically pumps every level's population into better buckets.
    fn pump_loop(&self, seed: u64) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let pump = self.pump();
        let interval = Duration::from_millis(self.config.pump_interval_ms.max(1));
        let mut refiled = 0usize;

        while !self.cancel.is_cancelled() {
            thread::sleep(self.cancel.remaining().min(interval));
            // The best level has nothing better to move into
            for (i, shared) in self.shared.iter().enumerate().skip(1) {
                let level = self.buckets.levels()[i];
                for mut candidate in shared.snapshot() {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    if pump.pump(&self.evaluator, &mut candidate, level, &mut rng)
                        != PumpResult::Success
                    {
                        continue;
                    }
                    let fitness = self.evaluator.evaluate(&candidate);
                    let Some(bucket) = fitness
                        .worst_preference()
                        .and_then(|w| self.buckets.for_level(w))
                    else {
                        continue;
                    };
                    self.best.offer(fitness, &candidate);
                    if bucket.try_put(candidate).is_ok() {
                        refiled += 1;
                    }
                }
            }
        }
        debug!("Pump re-filed {refiled} candidates");
    }
}
