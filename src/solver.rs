//! Solving strategies behind one interface.
//!
//! Every backend consumes the same [`InputData`] and returns a verified
//! [`Solution`], so results are interchangeable.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::{SolverConfig, Strategy};
use crate::error::{SolveError, SolveResult};
use crate::fitness::{Fitness, FitnessEvaluator};
use crate::ga::GaSystem;
use crate::local::{LocalSearch, PreferencePump};
use crate::models::{Candidate, InputData, Solution};
use crate::progress::{ProgressObserver, ProgressReport};
use crate::scheduler::{GreedySolver, SolutionKpi};
use crate::termination::Cancellation;

/// A complete solving backend.
pub trait Solver {
    fn solve(&self, input: &InputData) -> SolveResult<Solution>;
}

/// Builds the solver selected by `config.strategy`.
pub fn from_config<'o>(
    config: SolverConfig,
    observer: Option<&'o dyn ProgressObserver>,
) -> Box<dyn Solver + 'o> {
    match config.strategy {
        Strategy::Greedy => {
            let mut solver = GreedyStrategy::new(config);
            solver.observer = observer;
            Box::new(solver)
        }
        Strategy::Genetic => {
            let mut solver = GeneticStrategy::new(config);
            solver.observer = observer;
            Box::new(solver)
        }
    }
}

/// Repeated greedy construction with local search and pumping, keeping the
/// best result until the timeout.
pub struct GreedyStrategy<'o> {
    config: SolverConfig,
    observer: Option<&'o dyn ProgressObserver>,
}

impl<'o> GreedyStrategy<'o> {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'o dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl Solver for GreedyStrategy<'_> {
    fn solve(&self, input: &InputData) -> SolveResult<Solution> {
        let config = &self.config;
        let input = Arc::new(input.clone());
        let evaluator = FitnessEvaluator::new(Arc::clone(&input), config.preference_exponent);
        let greedy = GreedySolver::new(Arc::clone(&input));
        let pump = PreferencePump::new(config.pump_max_depth, config.pump_timeout());
        let cancel = Cancellation::with_budget(config.timeout());
        let mut rng = SmallRng::seed_from_u64(config.seed);
        let interval = Duration::from_millis(config.status_interval_ms.max(1));
        let mut last_report = Instant::now();

        let mut best: Option<(Fitness, Candidate)> = None;
        let mut attempts = 0usize;
        info!("Greedy start: {}ms budget", config.timeout_ms);

        while !cancel.is_cancelled() {
            attempts += 1;
            if let Some(mut candidate) = greedy.solve(&mut rng) {
                LocalSearch::new(&evaluator).optimize(&mut candidate);
                let worst = evaluator.worst_preference(&candidate);
                if worst > 0 {
                    pump.pump(&evaluator, &mut candidate, worst, &mut rng);
                }
                let fitness = evaluator.evaluate(&candidate);
                if fitness.is_feasible() && best.as_ref().map_or(true, |(f, _)| fitness < *f) {
                    debug!(
                        "Greedy attempt {attempts}: ({}, {:.4})",
                        fitness.major, fitness.minor
                    );
                    best = Some((fitness, candidate));
                }
            }
            if let Some(observer) = self.observer {
                if last_report.elapsed() >= interval {
                    last_report = Instant::now();
                    observer.on_progress(&ProgressReport {
                        best: best.as_ref().map(|(f, _)| *f),
                        eta: cancel.remaining(),
                        levels: Vec::new(),
                    });
                }
            }
        }

        let Some((fitness, candidate)) = best else {
            warn!("Greedy found no feasible candidate in {attempts} attempts");
            return Err(SolveError::NoSolutionFound);
        };
        let solution = Solution::from_candidate(&candidate, fitness);
        if let Err(e) = solution.verify(&input) {
            warn!("Best candidate failed verification: {e}");
            return Err(e);
        }
        let kpi = SolutionKpi::calculate(&solution, &input);
        info!(
            "Greedy finished after {attempts} attempts: fitness ({}, {:.4}), top choice rate {:.2}",
            fitness.major, fitness.minor, kpi.top_choice_rate
        );
        Ok(solution)
    }
}

/// Multi-level GA.
pub struct GeneticStrategy<'o> {
    config: SolverConfig,
    observer: Option<&'o dyn ProgressObserver>,
}

impl<'o> GeneticStrategy<'o> {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'o dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

impl Solver for GeneticStrategy<'_> {
    fn solve(&self, input: &InputData) -> SolveResult<Solution> {
        let system = GaSystem::new(Arc::new(input.clone()), self.config.clone());
        match self.observer {
            Some(observer) => system.with_observer(observer).run(),
            None => system.run(),
        }
    }
}
