use u_workshop::config::{SelectionType, SolverConfig, Strategy};
use u_workshop::models::{Constraint, InputData, InputDataBuilder, Participant, Workshop};
use u_workshop::{solve, InputError, SolveError};

/// 2 slots, 3 two-seat workshops, 4 participants.
fn three_workshops() -> InputDataBuilder {
    InputDataBuilder::new()
        .with_slot("Morning")
        .with_slot("Afternoon")
        .with_workshop(Workshop::new("A", 2, 2))
        .with_workshop(Workshop::new("B", 2, 2))
        .with_workshop(Workshop::new("C", 2, 2))
        .with_participant(Participant::new("p0", vec![1, 2, 3]))
        .with_participant(Participant::new("p1", vec![2, 1, 3]))
        .with_participant(Participant::new("p2", vec![3, 1, 2]))
        .with_participant(Participant::new("p3", vec![1, 3, 2]))
}

/// Two seats per slot short of everyone: infeasible.
fn infeasible() -> InputData {
    three_workshops().build().unwrap()
}

/// Four two-seat workshops, two per slot.
fn spread() -> InputData {
    InputDataBuilder::new()
        .with_slot("Morning")
        .with_slot("Afternoon")
        .with_workshop(Workshop::new("A", 2, 2))
        .with_workshop(Workshop::new("B", 2, 2))
        .with_workshop(Workshop::new("C", 2, 2))
        .with_workshop(Workshop::new("D", 2, 2))
        .with_participant(Participant::new("p0", vec![1, 2, 3, 4]))
        .with_participant(Participant::new("p1", vec![2, 1, 3, 4]))
        .with_participant(Participant::new("p2", vec![3, 4, 1, 2]))
        .with_participant(Participant::new("p3", vec![4, 3, 2, 1]))
        .build()
        .unwrap()
}

fn config(strategy: Strategy) -> SolverConfig {
    SolverConfig::default()
        .with_timeout_ms(300)
        .with_strategy(strategy)
        .with_population_size(8)
}

fn worst_used(input: &InputData, solution: &u_workshop::Solution) -> u32 {
    solution
        .assignment
        .iter()
        .enumerate()
        .flat_map(|(p, row)| row.iter().map(move |&w| input.preference(p, w)))
        .max()
        .unwrap()
}

#[test]
fn test_greedy_solves_spread() {
    let input = spread();
    let solution = solve(&input, &config(Strategy::Greedy), None).unwrap();
    assert!(solution.verify(&input).is_ok());
    assert_eq!(solution.fitness.major, worst_used(&input, &solution) as f64);
}

#[test]
fn test_genetic_solves_spread() {
    let input = spread();
    let solution = solve(&input, &config(Strategy::Genetic), None).unwrap();
    assert!(solution.verify(&input).is_ok());
    assert_eq!(solution.fitness.major, worst_used(&input, &solution) as f64);
    for p in 0..input.participant_count() {
        let mut slots: Vec<usize> = solution.assignment[p]
            .iter()
            .map(|&w| solution.slot_of(w))
            .collect();
        slots.sort_unstable();
        assert_eq!(slots, vec![0, 1]);
    }
}

#[test]
fn test_infeasible_reports_no_solution() {
    let input = infeasible();
    for strategy in [Strategy::Greedy, Strategy::Genetic] {
        let result = solve(&input, &config(strategy).with_timeout_ms(150), None);
        assert_eq!(result.unwrap_err(), SolveError::NoSolutionFound);
    }
}

#[test]
fn test_constraints_are_honored() {
    let input = InputDataBuilder::new()
        .with_slot("Morning")
        .with_slot("Afternoon")
        .with_workshop(Workshop::new("A", 1, 3).with_conductor(0))
        .with_workshop(Workshop::new("B", 1, 3))
        .with_workshop(Workshop::new("C", 1, 3))
        .with_workshop(Workshop::new("D", 1, 3))
        .with_participant(Participant::new("lead", vec![0, 1, 1, 1]))
        .with_participant(Participant::new("p1", vec![1, 2, 3, 4]))
        .with_participant(Participant::new("p2", vec![1, 2, 3, 4]))
        .with_participant(Participant::new("p3", vec![4, 3, 2, 1]))
        .with_constraint(Constraint::fixed(0, 1))
        .with_constraint(Constraint::avoids(2, 0))
        .with_constraint(Constraint::same_slot(1, 2))
        .build()
        .unwrap();
    for strategy in [Strategy::Greedy, Strategy::Genetic] {
        let solution = solve(&input, &config(strategy), None).unwrap();
        assert!(solution.verify(&input).is_ok());
        assert_eq!(solution.slot_of(0), 1);
        assert_eq!(solution.slot_of(1), solution.slot_of(2));
        assert!(solution.participants_of(0).contains(&0));
        assert!(!solution.participants_of(0).contains(&2));
    }
}

#[test]
fn test_elitist_selection_and_backtracking() {
    let input = spread();
    let config = config(Strategy::Genetic)
        .with_selection(SelectionType::Elitist)
        .with_backtracking(true);
    let solution = solve(&input, &config, None).unwrap();
    assert!(solution.verify(&input).is_ok());
}

#[test]
fn test_contradiction_rejected_before_search() {
    let err = three_workshops()
        .with_constraint(Constraint::same_slot(0, 1))
        .with_constraint(Constraint::different_slot(0, 1))
        .build()
        .unwrap_err();
    assert!(matches!(err, InputError::Contradiction(_)));
}

#[test]
fn test_solution_serializes() {
    let input = spread();
    let solution = solve(&input, &config(Strategy::Greedy), None).unwrap();
    let json = serde_json::to_string(&solution).unwrap();
    let back: u_workshop::Solution = serde_json::from_str(&json).unwrap();
    assert_eq!(back.assignment, solution.assignment);
    assert_eq!(back.scheduling, solution.scheduling);
}
