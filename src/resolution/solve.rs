use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{info, warn};

use crate::error::{LotSizingError, Result};
use crate::instance::{ProblemInstance, Schedule};
use crate::resolution::backend::MipSolution;
use crate::resolution::good_lp_backend::GoodLpBackend;
use crate::resolution::lp_format::LpFormatWriter;
use crate::resolution::model::MipModel;

/// Values within this distance of 1 count as a production decision.
pub const EPSILON: f64 = 0.01;

#[derive(Debug, Args)]
pub struct Solve {
    /// File containing the input data
    #[clap(short, long, value_name = "INPUT_FILE")]
    pub file: PathBuf,
    /// If present, the path where to write the formulation in LP format
    #[clap(long)]
    pub lp: Option<PathBuf>,
}

/// An optimal schedule together with the objective value reported for it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub schedule: Schedule,
    pub objective: f64,
}

impl Solve {
    pub fn solve(&self) -> Result<()> {
        let instance = ProblemInstance::from_file(&self.file)?;

        if let Some(path) = self.lp.as_ref() {
            export_lp(&instance, path)?;
        }

        match solve_instance(&instance) {
            Ok(Resolution { schedule, objective }) => {
                println!("Computed schedule: {schedule}");
                println!("Objective value: {objective}");
                Ok(())
            }
            Err(LotSizingError::Solver(e)) => {
                println!("No optimal solution was computed.");
                Err(LotSizingError::Solver(e))
            }
            Err(e) => Err(e),
        }
    }
}

/// Writes the formulation of `instance` in LP format without solving it.
pub fn export_lp(instance: &ProblemInstance, path: &Path) -> Result<()> {
    let mut writer = LpFormatWriter::new();
    MipModel::build(instance, &mut writer)?;
    writer.write_file(path)?;
    info!(path = %path.display(), "formulation exported");
    Ok(())
}

/// Builds the formulation, solves it and reads the schedule back. The schedule
/// is checked against the instance and its cost against the objective.
pub fn solve_instance(instance: &ProblemInstance) -> Result<Resolution> {
    let mut backend = GoodLpBackend::new();
    let model = MipModel::build(instance, &mut backend)?;

    info!(
        nb_types = instance.nb_types(),
        nb_periods = instance.nb_periods(),
        "solving"
    );
    let solution = backend.solve()?;
    let schedule = decode_schedule(&model, &solution)?;
    let objective = solution.objective_value();
    info!(objective, "optimal solution found");

    if !instance.is_feasible(&schedule)? {
        warn!(%schedule, "decoded schedule has backlog");
    } else {
        let cost = instance.compute_cost(&schedule)?;
        if (cost as f64 - objective).abs() > EPSILON {
            warn!(cost, objective, "schedule cost differs from the objective value");
        }
    }

    Ok(Resolution { schedule, objective })
}

/// Reads, for each period, which item the solver decided to produce.
pub fn decode_schedule<V, S>(model: &MipModel<V>, solution: &S) -> Result<Schedule>
where
    V: Copy + PartialEq,
    S: MipSolution<V>,
{
    (0..model.nb_periods())
        .map(|t| {
            let produced = (0..model.nb_types())
                .filter(|&i| solution.value(model.production(i, t)) > 1.0 - EPSILON)
                .collect::<Vec<_>>();
            match produced.len() {
                0 => Ok(None),
                1 => Ok(Some(produced[0])),
                _ => Err(LotSizingError::InconsistentSolution {
                    period: t,
                    items: produced,
                }),
            }
        })
        .collect::<Result<Vec<_>>>()
        .map(Schedule::new)
}
