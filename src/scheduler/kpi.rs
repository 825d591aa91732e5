//! Solution quality metrics (KPIs).
//!
//! Computes summary indicators from a finished solution and its input.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Worst preference | Highest preference value assigned |
//! | Average preference | Mean preference over all assignments |
//! | Preference histogram | Assignment count per preference value |
//! | Top choice rate | Fraction of assignments at the participant's best value |
//! | Fill | Attendance / maximum capacity, per workshop |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::{BTreeMap, HashMap};

use crate::models::{InputData, Preference, Solution};

/// Solution performance indicators.
#[derive(Debug, Clone)]
pub struct SolutionKpi {
    /// Highest preference value assigned to anyone.
    pub worst_preference: Preference,
    /// Mean preference value over all assignments.
    pub avg_preference: f64,
    /// Number of assignments per preference value.
    pub preference_histogram: BTreeMap<Preference, usize>,
    /// Fraction of assignments at the participant's own best value (0.0..1.0).
    pub top_choice_rate: f64,
    /// Average workshop fill (0.0..1.0).
    pub avg_fill: f64,
    /// Per-workshop fill.
    pub fill_by_workshop: HashMap<String, f64>,
}

impl SolutionKpi {
    /// Computes KPIs from a solution and its input.
    pub fn calculate(solution: &Solution, input: &InputData) -> Self {
        let mut histogram: BTreeMap<Preference, usize> = BTreeMap::new();
        let mut worst = 0;
        let mut total: u64 = 0;
        let mut assignments: usize = 0;
        let mut top_choices: usize = 0;
        let mut counts = vec![0usize; input.workshop_count()];

        for (p, row) in solution.assignment.iter().enumerate() {
            let best = input
                .participant(p)
                .preferences
                .iter()
                .copied()
                .min()
                .unwrap_or(0);
            for &w in row {
                let pref = input.preference(p, w);
                *histogram.entry(pref).or_insert(0) += 1;
                worst = worst.max(pref);
                total += pref as u64;
                assignments += 1;
                counts[w] += 1;
                if pref <= best {
                    top_choices += 1;
                }
            }
        }

        let fill_by_workshop: HashMap<String, f64> = input
            .workshops()
            .iter()
            .zip(&counts)
            .map(|(w, &n)| {
                let fill = if w.max_participants == 0 {
                    0.0
                } else {
                    n as f64 / w.max_participants as f64
                };
                (w.name.clone(), fill)
            })
            .collect();
        let avg_fill = if fill_by_workshop.is_empty() {
            0.0
        } else {
            fill_by_workshop.values().sum::<f64>() / fill_by_workshop.len() as f64
        };

        let (avg_preference, top_choice_rate) = if assignments == 0 {
            (0.0, 1.0)
        } else {
            (
                total as f64 / assignments as f64,
                top_choices as f64 / assignments as f64,
            )
        };

        Self {
            worst_preference: worst,
            avg_preference,
            preference_histogram: histogram,
            top_choice_rate,
            avg_fill,
            fill_by_workshop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::Fitness;
    use crate::models::{InputDataBuilder, Participant, Workshop};

    fn input() -> InputData {
        InputDataBuilder::new()
            .with_slot("1")
            .with_slot("2")
            .with_workshop(Workshop::new("A", 1, 2))
            .with_workshop(Workshop::new("B", 1, 4))
            .with_participant(Participant::new("p0", vec![1, 2]))
            .with_participant(Participant::new("p1", vec![3, 1]))
            .build()
            .unwrap()
    }

    fn solution() -> Solution {
        Solution {
            scheduling: vec![0, 1],
            assignment: vec![vec![0, 1], vec![0, 1]],
            fitness: Fitness::new(3.0, 1.0),
        }
    }

    #[test]
    fn test_kpi_basic() {
        let kpi = SolutionKpi::calculate(&solution(), &input());
        assert_eq!(kpi.worst_preference, 3);
        // 1 + 2 + 3 + 1
        assert!((kpi.avg_preference - 1.75).abs() < 1e-10);
        assert_eq!(kpi.preference_histogram[&1], 2);
        assert_eq!(kpi.preference_histogram[&3], 1);
        assert!((kpi.top_choice_rate - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_kpi_fill() {
        let kpi = SolutionKpi::calculate(&solution(), &input());
        assert!((kpi.fill_by_workshop["A"] - 1.0).abs() < 1e-10);
        assert!((kpi.fill_by_workshop["B"] - 0.5).abs() < 1e-10);
        assert!((kpi.avg_fill - 0.75).abs() < 1e-10);
    }
}
