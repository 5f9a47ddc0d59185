use std::path::PathBuf;

use lotsizing::resolution::{export_lp, solve_instance};
use lotsizing::{LotSizingError, ProblemInstance, Schedule};
use rstest::rstest;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

/// Cheapest feasible schedule producing exactly the demand of every item,
/// found by trying every assignment of items (or idle) to periods.
fn exhaustive_optimum(instance: &ProblemInstance) -> i64 {
    let n = instance.nb_types() + 1;
    let nb_periods = instance.nb_periods();
    let due = (0..instance.nb_types())
        .map(|i| instance.get_overall_demand(i, nb_periods - 1).unwrap() as usize)
        .collect::<Vec<_>>();

    let mut best = i64::MAX;
    for code in 0..n.pow(nb_periods as u32) {
        let mut rest = code;
        let slots = (0..nb_periods)
            .map(|_| {
                let v = rest % n;
                rest /= n;
                if v == 0 { None } else { Some(v - 1) }
            })
            .collect::<Vec<_>>();
        let schedule = Schedule::new(slots);
        if (0..instance.nb_types()).any(|i| schedule.periods_of(i).count() != due[i]) {
            continue;
        }
        if instance.is_feasible(&schedule).unwrap() {
            best = best.min(instance.compute_cost(&schedule).unwrap());
        }
    }
    best
}

#[rstest]
#[case("reference.txt")]
#[case("two_items.json")]
fn test_solver_matches_cost_evaluator(#[case] name: &str) {
    let instance = ProblemInstance::from_file(fixture(name)).unwrap();
    let resolution = solve_instance(&instance).unwrap();

    assert_eq!(resolution.schedule.len(), instance.nb_periods());
    assert!(instance.is_feasible(&resolution.schedule).unwrap());

    let cost = instance.compute_cost(&resolution.schedule).unwrap();
    assert!((cost as f64 - resolution.objective).abs() < 1e-6, "cost {cost} vs objective {}", resolution.objective);
    assert_eq!(cost, exhaustive_optimum(&instance));
}

#[test]
fn test_reference_file() {
    let instance = ProblemInstance::from_file(fixture("reference.txt")).unwrap();
    assert_eq!(instance.nb_periods(), 6);
    assert_eq!(instance.nb_types(), 3);
    assert_eq!(instance.total_demand(), 5);

    let text = std::fs::read_to_string(fixture("reference.txt")).unwrap();
    assert_eq!(instance.to_string(), text);

    let schedule: Schedule = "0 1 -1 1 0 2".parse().unwrap();
    assert_eq!(instance.compute_cost(&schedule).unwrap(), 15);
}

#[test]
fn test_text_and_json_agree() {
    let json = ProblemInstance::from_file(fixture("two_items.json")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("two_items.txt");
    std::fs::write(&path, json.to_string()).unwrap();

    let text = ProblemInstance::from_file(&path).unwrap();
    assert_eq!(text, json);
}

#[test]
fn test_infeasible_instance_reports_solver_error() {
    // two units of the same item due in the first period
    let instance = ProblemInstance::new(2, vec![vec![1, 0], vec![1, 0]], 1, vec![vec![0, 1], vec![1, 0]]).unwrap();
    assert!(matches!(solve_instance(&instance), Err(LotSizingError::Solver(_))));
}

#[test]
fn test_lp_export() {
    let instance = ProblemInstance::from_file(fixture("reference.txt")).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reference.lp");
    export_lp(&instance, &path).unwrap();

    let lp = std::fs::read_to_string(&path).unwrap();
    assert_eq!(lp.matches("demand_").count(), 18);
    assert_eq!(lp.matches(" transition_").count(), 45);
    assert!(lp.contains(" config_5: y_0_5 + y_1_5 + y_2_5 = 1\n"));
}
