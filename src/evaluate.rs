use std::path::PathBuf;

use clap::Args;

use crate::error::{LotSizingError, Result};
use crate::instance::{ProblemInstance, Schedule};

#[derive(Debug, Args)]
pub struct Evaluate {
    /// File containing the input data
    #[clap(short, long, value_name = "INPUT_FILE")]
    pub file: PathBuf,
    /// The schedule to evaluate, one item per period and -1 for idle periods
    #[clap(short, long, allow_hyphen_values = true)]
    pub schedule: String,
}

/// Feasibility and cost breakdown of a schedule. The inventory cost, and so
/// the total, is `None` when some item is produced fewer times than it is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub feasible: bool,
    pub transition_cost: i64,
    pub inventory_cost: Option<i64>,
}

impl Evaluation {
    pub fn of(instance: &ProblemInstance, schedule: &Schedule) -> Result<Self> {
        let feasible = instance.is_feasible(schedule)?;
        let transition_cost = instance.compute_transition_cost(schedule)?;
        let inventory_cost = match instance.compute_inventory_cost(schedule) {
            Ok(cost) => Some(cost),
            Err(LotSizingError::UnderProduction { .. }) => None,
            Err(e) => return Err(e),
        };
        Ok(Evaluation {
            feasible,
            transition_cost,
            inventory_cost,
        })
    }

    pub fn total_cost(&self) -> Option<i64> {
        self.inventory_cost.map(|cost| self.transition_cost + cost)
    }
}

fn display_cost(cost: Option<i64>) -> String {
    cost.map(|c| c.to_string())
        .unwrap_or_else(|| "unavailable (demand not fully produced)".to_string())
}

impl Evaluate {
    pub fn evaluate(&self) -> Result<()> {
        let instance = ProblemInstance::from_file(&self.file)?;
        let schedule: Schedule = self.schedule.parse()?;
        let evaluation = Evaluation::of(&instance, &schedule)?;

        println!("Schedule: {schedule}");
        println!("Feasible: {}", evaluation.feasible);
        println!("Transition cost: {}", evaluation.transition_cost);
        println!("Inventory cost: {}", display_cost(evaluation.inventory_cost));
        println!("Total cost: {}", display_cost(evaluation.total_cost()));
        Ok(())
    }
}
