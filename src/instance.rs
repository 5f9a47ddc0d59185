//! This module defines an abstract representation of a lot sizing instance
//! together with the routines checking and costing a production schedule.

use std::{fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LotSizingError, Result};

/// A single-machine, multi-item, discrete-time lot sizing instance.
///
/// `demand[i][t]` is 1 when one unit of item `i` is due in period `t`, and
/// `transition_cost[i][j]` is paid when the machine switches from item `i` to
/// item `j`. Instances are validated on construction and never change after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InstanceRecord", into = "InstanceRecord")]
pub struct ProblemInstance {
    nb_periods: usize,
    demand: Vec<Vec<u32>>,
    inventory_cost: i64,
    transition_cost: Vec<Vec<i64>>,
    total_demand: u32,
}

/// Plain serde mirror of [`ProblemInstance`], validated when converted back.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceRecord {
    num_time_periods: usize,
    num_types: usize,
    demand: Vec<Vec<u32>>,
    inventory_cost: i64,
    transition_cost: Vec<Vec<i64>>,
}

impl TryFrom<InstanceRecord> for ProblemInstance {
    type Error = LotSizingError;

    fn try_from(record: InstanceRecord) -> Result<Self> {
        if record.demand.len() != record.num_types {
            return Err(LotSizingError::RowCount {
                what: "demand",
                found: record.demand.len(),
                expected: record.num_types,
            });
        }
        ProblemInstance::new(
            record.num_time_periods,
            record.demand,
            record.inventory_cost,
            record.transition_cost,
        )
    }
}

impl From<ProblemInstance> for InstanceRecord {
    fn from(instance: ProblemInstance) -> Self {
        InstanceRecord {
            num_time_periods: instance.nb_periods,
            num_types: instance.demand.len(),
            demand: instance.demand,
            inventory_cost: instance.inventory_cost,
            transition_cost: instance.transition_cost,
        }
    }
}

impl ProblemInstance {
    /// Builds an instance, checking that every demand row spans the horizon,
    /// every demand entry is binary and the transition matrix is square.
    pub fn new(
        nb_periods: usize,
        demand: Vec<Vec<u32>>,
        inventory_cost: i64,
        transition_cost: Vec<Vec<i64>>,
    ) -> Result<Self> {
        let nb_types = demand.len();

        for (item, row) in demand.iter().enumerate() {
            if row.len() != nb_periods {
                return Err(LotSizingError::Structural {
                    what: "demand",
                    row: item,
                    found: row.len(),
                    expected: nb_periods,
                });
            }
            if let Some((period, &value)) = row.iter().enumerate().find(|(_, &v)| v > 1) {
                return Err(LotSizingError::NonBinaryDemand { item, period, value });
            }
        }

        if transition_cost.len() != nb_types {
            return Err(LotSizingError::RowCount {
                what: "transition cost",
                found: transition_cost.len(),
                expected: nb_types,
            });
        }
        for (item, row) in transition_cost.iter().enumerate() {
            if row.len() != nb_types {
                return Err(LotSizingError::Structural {
                    what: "transition cost",
                    row: item,
                    found: row.len(),
                    expected: nb_types,
                });
            }
        }

        let total_demand = demand.iter().map(|row| row.iter().sum::<u32>()).sum();

        Ok(ProblemInstance {
            nb_periods,
            demand,
            inventory_cost,
            transition_cost,
            total_demand,
        })
    }

    /// Reads an instance from disk. Files with a `.json` extension are read as
    /// JSON, anything else as the line-oriented text format.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LotSizingError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let instance: ProblemInstance = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => content.parse()?,
        };

        debug!(
            path = %path.display(),
            nb_types = instance.nb_types(),
            nb_periods = instance.nb_periods(),
            total_demand = instance.total_demand(),
            "instance loaded"
        );
        Ok(instance)
    }

    pub fn nb_types(&self) -> usize {
        self.demand.len()
    }

    pub fn nb_periods(&self) -> usize {
        self.nb_periods
    }

    pub fn inventory_cost(&self) -> i64 {
        self.inventory_cost
    }

    /// Cost of switching the machine from `from` to `to`.
    pub fn changeover(&self, from: usize, to: usize) -> Result<i64> {
        for item in [from, to] {
            if item >= self.nb_types() {
                return Err(LotSizingError::Range {
                    what: "item type",
                    index: item,
                    bound: self.nb_types(),
                });
            }
        }
        Ok(self.transition_cost[from][to])
    }

    /// Number of units due over the whole horizon, all items together.
    pub fn total_demand(&self) -> u32 {
        self.total_demand
    }

    pub fn get_demand(&self, item: usize, period: usize) -> Result<u32> {
        self.check_query(item, period)?;
        Ok(self.demand[item][period])
    }

    /// Demand of `item` accumulated from the first period up to `period` inclusive.
    pub fn get_overall_demand(&self, item: usize, period: usize) -> Result<u32> {
        self.check_query(item, period)?;
        Ok(self.demand[item][..=period].iter().sum())
    }

    fn check_query(&self, item: usize, period: usize) -> Result<()> {
        if period >= self.nb_periods {
            return Err(LotSizingError::Range {
                what: "time period",
                index: period,
                bound: self.nb_periods,
            });
        }
        if item >= self.nb_types() {
            return Err(LotSizingError::Range {
                what: "item type",
                index: item,
                bound: self.nb_types(),
            });
        }
        Ok(())
    }

    /// A schedule is feasible when, for every item and every period, the
    /// number of units produced so far covers the demand due so far.
    pub fn is_feasible(&self, schedule: &Schedule) -> Result<bool> {
        if schedule.len() != self.nb_periods {
            return Err(LotSizingError::LengthMismatch {
                found: schedule.len(),
                expected: self.nb_periods,
            });
        }
        self.check_items(schedule)?;

        for (item, row) in self.demand.iter().enumerate() {
            let mut produced = 0_u32;
            let mut due = 0_u32;
            for (slot, &demand) in schedule.iter().zip(row.iter()) {
                if slot == Some(item) {
                    produced += 1;
                }
                due += demand;
                if produced < due {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    pub fn compute_cost(&self, schedule: &Schedule) -> Result<i64> {
        Ok(self.compute_transition_cost(schedule)? + self.compute_inventory_cost(schedule)?)
    }

    /// Sum of the changeover costs paid along the schedule. Idle periods keep
    /// the machine in its previous configuration, so they never cost anything.
    pub fn compute_transition_cost(&self, schedule: &Schedule) -> Result<i64> {
        self.check_items(schedule)?;

        let mut cost = 0;
        let mut previous: Option<usize> = None;
        for item in schedule.iter().flatten() {
            if let Some(prev) = previous {
                if prev != item {
                    cost += self.transition_cost[prev][item];
                }
            }
            previous = Some(item);
        }
        Ok(cost)
    }

    /// Holding cost of the schedule.
    ///
    /// Productions of an item are matched to its due dates in order, earliest
    /// production to earliest due date, and each pair is charged for the
    /// periods separating them. Units produced beyond the demand of an item
    /// are charged as if they were due in the last period of the horizon.
    /// Producing fewer units than are due is reported as
    /// [`LotSizingError::UnderProduction`].
    pub fn compute_inventory_cost(&self, schedule: &Schedule) -> Result<i64> {
        self.check_items(schedule)?;

        let last_period = self.nb_periods.saturating_sub(1);
        let mut held = 0_i64;
        for (item, row) in self.demand.iter().enumerate() {
            let mut due_dates = row
                .iter()
                .enumerate()
                .filter(|(_, &d)| d == 1)
                .map(|(t, _)| t)
                .collect::<Vec<_>>();
            let productions = schedule.periods_of(item).collect::<Vec<_>>();

            if productions.len() < due_dates.len() {
                return Err(LotSizingError::UnderProduction {
                    item,
                    produced: productions.len(),
                    due: due_dates.len(),
                });
            }
            due_dates.resize(productions.len(), last_period);

            held += due_dates
                .iter()
                .zip(productions.iter())
                .map(|(&due, &made)| due as i64 - made as i64)
                .sum::<i64>();
        }
        Ok(held * self.inventory_cost)
    }

    fn check_items(&self, schedule: &Schedule) -> Result<()> {
        match schedule.iter().flatten().find(|&item| item >= self.nb_types()) {
            Some(item) => Err(LotSizingError::Range {
                what: "item type",
                index: item,
                bound: self.nb_types(),
            }),
            None => Ok(()),
        }
    }
}

/// Reader over the non-blank lines of the text format, remembering the
/// line numbers of the input for error messages.
struct Lines<'a> {
    inner: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    last: usize,
}

impl<'a> Lines<'a> {
    fn new(s: &'a str) -> Self {
        let inner = s
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());
        Lines {
            inner: Box::new(inner),
            last: 0,
        }
    }

    fn next_line(&mut self, what: &str) -> Result<(usize, &'a str)> {
        match self.inner.next() {
            Some((number, line)) => {
                self.last = number;
                Ok((number, line))
            }
            None => Err(LotSizingError::Format {
                line: self.last + 1,
                reason: format!("unexpected end of input, expected {what}"),
            }),
        }
    }

    fn scalar<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let (number, line) = self.next_line(what)?;
        parse_token(number, line, what)
    }

    fn row<T: FromStr>(&mut self, what: &str) -> Result<Vec<T>> {
        let (number, line) = self.next_line(what)?;
        line.split_whitespace()
            .map(|token| parse_token(number, token, what))
            .collect()
    }
}

fn parse_token<T: FromStr>(line: usize, token: &str, what: &str) -> Result<T> {
    token.parse().map_err(|_| LotSizingError::Format {
        line,
        reason: format!("cannot read {what} from '{token}'"),
    })
}

impl FromStr for ProblemInstance {
    type Err = LotSizingError;

    /// Parses the text format: number of periods, number of types, one demand
    /// row per type, the inventory cost, then one transition cost row per type.
    fn from_str(s: &str) -> Result<Self> {
        let mut lines = Lines::new(s);

        let nb_periods: usize = lines.scalar("number of time periods")?;
        let nb_types: usize = lines.scalar("number of types")?;
        let demand = (0..nb_types)
            .map(|_| lines.row("demand"))
            .collect::<Result<Vec<Vec<u32>>>>()?;
        let inventory_cost: i64 = lines.scalar("inventory cost")?;
        let transition_cost = (0..nb_types)
            .map(|_| lines.row("transition cost"))
            .collect::<Result<Vec<Vec<i64>>>>()?;

        if let Some((line, content)) = lines.inner.next() {
            return Err(LotSizingError::Format {
                line,
                reason: format!("unexpected trailing content '{content}'"),
            });
        }

        ProblemInstance::new(nb_periods, demand, inventory_cost, transition_cost)
    }
}

impl fmt::Display for ProblemInstance {
    /// Writes the canonical text format read back by [`FromStr`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_row<T: fmt::Display>(f: &mut fmt::Formatter<'_>, row: &[T]) -> fmt::Result {
            let row = row.iter().map(|v| v.to_string()).collect::<Vec<_>>();
            writeln!(f, "{}", row.join(" "))
        }

        writeln!(f, "{}", self.nb_periods)?;
        writeln!(f, "{}", self.nb_types())?;
        for row in &self.demand {
            write_row(f, row)?;
        }
        writeln!(f, "{}", self.inventory_cost)?;
        for row in &self.transition_cost {
            write_row(f, row)?;
        }
        Ok(())
    }
}

/// One entry per period: the item produced in that period, or `None` when the
/// machine is idle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schedule(Vec<Option<usize>>);

impl Schedule {
    pub fn new(slots: Vec<Option<usize>>) -> Self {
        Schedule(slots)
    }

    pub fn idle(nb_periods: usize) -> Self {
        Schedule(vec![None; nb_periods])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.0.iter().copied()
    }

    /// Periods in which `item` is produced, in increasing order.
    pub fn periods_of(&self, item: usize) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(move |(_, slot)| **slot == Some(item))
            .map(|(t, _)| t)
    }

    pub fn as_slice(&self) -> &[Option<usize>] {
        &self.0
    }
}

impl From<Vec<Option<usize>>> for Schedule {
    fn from(slots: Vec<Option<usize>>) -> Self {
        Schedule(slots)
    }
}

impl FromStr for Schedule {
    type Err = LotSizingError;

    /// Reads integers separated by whitespace or commas, optionally enclosed
    /// in brackets. `-1` stands for an idle period.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_start_matches('[').trim_end_matches(']');
        s.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| match parse_token::<isize>(1, token, "schedule entry")? {
                -1 => Ok(None),
                v if v >= 0 => Ok(Some(v as usize)),
                _ => Err(LotSizingError::Format {
                    line: 1,
                    reason: format!("schedule entry '{token}' is neither an item nor -1"),
                }),
            })
            .collect::<Result<Vec<_>>>()
            .map(Schedule)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self
            .0
            .iter()
            .map(|slot| match slot {
                Some(item) => item.to_string(),
                None => "-1".to_string(),
            })
            .collect::<Vec<_>>();
        write!(f, "[{}]", slots.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const REFERENCE: &str = "6
3
1 0 0 0 1 0
0 1 0 0 1 0
0 0 0 0 0 1
10
0 1 1
3 0 2
4 5 0
";

    #[fixture]
    fn instance() -> ProblemInstance {
        REFERENCE.parse().unwrap()
    }

    fn schedule(s: &str) -> Schedule {
        s.parse().unwrap()
    }

    #[rstest]
    fn test_dimensions(instance: ProblemInstance) {
        assert_eq!(instance.nb_periods(), 6);
        assert_eq!(instance.nb_types(), 3);
        assert_eq!(instance.inventory_cost(), 10);
        assert_eq!(instance.total_demand(), 5);
        assert_eq!(instance.changeover(2, 1).unwrap(), 5);
    }

    #[rstest]
    #[case(0, 0, 1)]
    #[case(0, 1, 1)]
    #[case(0, 4, 2)]
    #[case(0, 5, 2)]
    #[case(1, 0, 0)]
    #[case(1, 1, 1)]
    #[case(1, 4, 2)]
    #[case(2, 2, 0)]
    #[case(2, 5, 1)]
    fn test_overall_demand(
        instance: ProblemInstance,
        #[case] item: usize,
        #[case] period: usize,
        #[case] expected: u32,
    ) {
        assert_eq!(instance.get_overall_demand(item, period).unwrap(), expected);
    }

    #[rstest]
    fn test_demand_out_of_range(instance: ProblemInstance) {
        assert_eq!(instance.get_demand(1, 4).unwrap(), 1);
        assert!(matches!(
            instance.get_demand(0, 6),
            Err(LotSizingError::Range { what: "time period", index: 6, bound: 6 })
        ));
        assert!(matches!(
            instance.get_overall_demand(3, 0),
            Err(LotSizingError::Range { what: "item type", index: 3, bound: 3 })
        ));
    }

    #[rstest]
    #[case("0 1 2 0 1 -1", true)]
    #[case("0 1 -1 1 0 2", true)]
    #[case("0 2 1 0 1 -1", false)]
    #[case("-1 0 1 0 1 2", false)]
    fn test_feasibility(instance: ProblemInstance, #[case] s: &str, #[case] expected: bool) {
        assert_eq!(instance.is_feasible(&schedule(s)).unwrap(), expected);
    }

    #[rstest]
    fn test_feasibility_length_mismatch(instance: ProblemInstance) {
        assert!(matches!(
            instance.is_feasible(&schedule("0 1 2")),
            Err(LotSizingError::LengthMismatch { found: 3, expected: 6 })
        ));
    }

    #[rstest]
    #[case("0 1 2 0 1 -1", 8, 40)]
    #[case("0 1 -1 1 0 2", 5, 10)]
    fn test_costs(
        instance: ProblemInstance,
        #[case] s: &str,
        #[case] transition: i64,
        #[case] inventory: i64,
    ) {
        let s = schedule(s);
        assert_eq!(instance.compute_transition_cost(&s).unwrap(), transition);
        assert_eq!(instance.compute_inventory_cost(&s).unwrap(), inventory);
        assert_eq!(instance.compute_cost(&s).unwrap(), transition + inventory);
    }

    #[rstest]
    fn test_idle_runs_are_transparent(instance: ProblemInstance) {
        let plain = instance.compute_transition_cost(&schedule("0 0 1")).unwrap();
        let with_idle = instance.compute_transition_cost(&schedule("0 -1 0 1")).unwrap();
        assert_eq!(plain, 1);
        assert_eq!(with_idle, plain);
        assert_eq!(instance.compute_transition_cost(&schedule("-1 -1 2 -1")).unwrap(), 0);
    }

    #[rstest]
    fn test_excess_production_is_due_last(instance: ProblemInstance) {
        // item 2 produced twice, once more than its single due date in period 5
        let s = schedule("0 1 2 0 1 2");
        assert_eq!(instance.compute_inventory_cost(&s).unwrap(), (1 + 3) * 10);
    }

    #[rstest]
    fn test_under_production(instance: ProblemInstance) {
        assert!(matches!(
            instance.compute_inventory_cost(&schedule("0 1 -1 -1 -1 -1")),
            Err(LotSizingError::UnderProduction { item: 0, produced: 1, due: 2 })
        ));
    }

    #[rstest]
    fn test_unknown_item_in_schedule(instance: ProblemInstance) {
        let s = schedule("0 1 7 0 1 2");
        assert!(matches!(
            instance.is_feasible(&s),
            Err(LotSizingError::Range { what: "item type", index: 7, bound: 3 })
        ));
        assert!(matches!(
            instance.compute_cost(&s),
            Err(LotSizingError::Range { index: 7, .. })
        ));
    }

    #[rstest]
    fn test_changeover_out_of_range(instance: ProblemInstance) {
        assert_eq!(instance.changeover(0, 2).unwrap(), 1);
        assert!(matches!(
            instance.changeover(3, 0),
            Err(LotSizingError::Range { what: "item type", index: 3, bound: 3 })
        ));
        assert!(matches!(
            instance.changeover(1, 5),
            Err(LotSizingError::Range { index: 5, .. })
        ));
    }

    #[test]
    fn test_transition_row_count() {
        let demand = vec![vec![1, 0], vec![0, 1]];
        assert!(matches!(
            ProblemInstance::new(2, demand, 1, vec![vec![0, 1]]),
            Err(LotSizingError::RowCount { what: "transition cost", found: 1, expected: 2 })
        ));
    }

    #[test]
    fn test_zero_demand_idle_schedule_is_free() {
        let instance = ProblemInstance::new(
            4,
            vec![vec![0; 4], vec![0; 4]],
            7,
            vec![vec![0, 3], vec![2, 0]],
        )
        .unwrap();
        let idle = Schedule::idle(4);
        assert!(instance.is_feasible(&idle).unwrap());
        assert_eq!(instance.compute_cost(&idle).unwrap(), 0);
    }

    #[rstest]
    #[case("0 1 2 0 1 -1")]
    #[case("0 1 -1 1 0 2")]
    fn test_feasibility_is_monotonic(instance: ProblemInstance, #[case] s: &str) {
        let base = schedule(s);
        assert!(instance.is_feasible(&base).unwrap());
        let idle = base
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(t, _)| t)
            .collect::<Vec<_>>();
        assert!(!idle.is_empty());
        for &t in &idle {
            for item in 0..instance.nb_types() {
                let mut slots = base.as_slice().to_vec();
                slots[t] = Some(item);
                assert!(
                    instance.is_feasible(&Schedule::new(slots)).unwrap(),
                    "producing item {item} in idle period {t} of {s} broke feasibility"
                );
            }
        }
    }

    #[rstest]
    fn test_text_round_trip(instance: ProblemInstance) {
        let rendered = instance.to_string();
        assert_eq!(rendered, REFERENCE);
        let reparsed: ProblemInstance = rendered.parse().unwrap();
        assert_eq!(reparsed, instance);
    }

    #[rstest]
    fn test_json_round_trip(instance: ProblemInstance) {
        let json = serde_json::to_string(&instance).unwrap();
        let back: ProblemInstance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instance);
    }

    #[test]
    fn test_json_is_validated() {
        let json = r#"{"num_time_periods":2,"num_types":1,"demand":[[1,0,0]],
            "inventory_cost":1,"transition_cost":[[0]]}"#;
        assert!(serde_json::from_str::<ProblemInstance>(json).is_err());
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let text = "\n2\n\n1\n  0 1  \n\n3\n0\n\n";
        let instance: ProblemInstance = text.parse().unwrap();
        assert_eq!(instance.nb_periods(), 2);
        assert_eq!(instance.get_demand(0, 1).unwrap(), 1);
        assert_eq!(instance.inventory_cost(), 3);
    }

    #[test]
    fn test_short_demand_row() {
        let text = "3\n2\n1 0 0\n0 1\n5\n0 1\n1 0\n";
        assert!(matches!(
            text.parse::<ProblemInstance>(),
            Err(LotSizingError::Structural { what: "demand", row: 1, found: 2, expected: 3 })
        ));
    }

    #[test]
    fn test_long_transition_row() {
        let text = "2\n2\n1 0\n0 1\n5\n0 1 4\n1 0\n";
        assert!(matches!(
            text.parse::<ProblemInstance>(),
            Err(LotSizingError::Structural { what: "transition cost", row: 0, found: 3, expected: 2 })
        ));
    }

    #[test]
    fn test_non_binary_demand() {
        let text = "2\n1\n0 2\n5\n0\n";
        assert!(matches!(
            text.parse::<ProblemInstance>(),
            Err(LotSizingError::NonBinaryDemand { item: 0, period: 1, value: 2 })
        ));
    }

    #[test]
    fn test_truncated_input() {
        let text = "2\n2\n1 0\n0 1\n5\n0 1\n";
        assert!(matches!(
            text.parse::<ProblemInstance>(),
            Err(LotSizingError::Format { line: 7, .. })
        ));
        assert!(matches!(
            "two\n".parse::<ProblemInstance>(),
            Err(LotSizingError::Format { line: 1, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ProblemInstance::from_file("does/not/exist.txt"),
            Err(LotSizingError::Io { .. })
        ));
    }

    #[test]
    fn test_schedule_text() {
        let s = schedule("[0, 1, -1, 2]");
        assert_eq!(s.as_slice(), &[Some(0), Some(1), None, Some(2)]);
        assert_eq!(s.to_string(), "[0, 1, -1, 2]");
        assert!("0 -2".parse::<Schedule>().is_err());
        assert!("0 x".parse::<Schedule>().is_err());
    }
}
