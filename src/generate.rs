use std::{time::{SystemTime, UNIX_EPOCH}, fs, path::PathBuf, collections::BTreeSet, ops::Bound::*};

use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;
use rand_distr::{Uniform, Normal, Distribution};
use tracing::info;

use crate::error::{LotSizingError, Result};
use crate::instance::ProblemInstance;

#[derive(Debug, Args)]
pub struct InstanceGenerator {
    /// An optional seed to kickstart the instance generation
    #[clap(short='s', long)]
    seed: Option<u128>,
    /// The number of item types that must be produced
    #[clap(short='n', long, default_value="10")]
    nb_types: usize,
    /// The number of clusters of similar item types
    #[clap(short='c', long, default_value="3")]
    nb_clusters: usize,
    /// The number of time periods
    #[clap(short='p', long, default_value="50")]
    nb_periods: usize,
    /// The number of demands normalized by the number of periods
    #[clap(short='d', long, default_value="0.95")]
    density: f64,
    /// The minimum inventory cost per unit and period
    #[clap(long, default_value="100")]
    min_inventory: i64,
    /// The maximum inventory cost per unit and period
    #[clap(long, default_value="10000")]
    max_inventory: i64,
    /// The minimum changeover position used to generate the pairwise costs
    #[clap(long, default_value="100")]
    min_changeover_position: i64,
    /// The maximum changeover position used to generate the pairwise costs
    #[clap(long, default_value="10000")]
    max_changeover_position: i64,
    /// The std deviation of the changeover positions among a cluster
    #[clap(long, default_value="100")]
    changeover_position_std_dev: f64,
    /// Write the instance as json instead of the text format
    #[clap(long)]
    json: bool,
    /// Name of the file where to generate the instance
    #[clap(short, long)]
    output: Option<PathBuf>,
}

impl Default for InstanceGenerator {
    fn default() -> Self {
        InstanceGenerator {
            seed: None,
            nb_types: 10,
            nb_clusters: 3,
            nb_periods: 50,
            density: 0.95,
            min_inventory: 100,
            max_inventory: 10000,
            min_changeover_position: 100,
            max_changeover_position: 10000,
            changeover_position_std_dev: 100.0,
            json: false,
            output: None,
        }
    }
}

impl InstanceGenerator {

    pub fn generate(&self) -> Result<()> {
        let instance = self.instance()?;

        let rendered = if self.json {
            serde_json::to_string_pretty(&instance)?
        } else {
            instance.to_string()
        };

        if let Some(output) = self.output.as_ref() {
            fs::write(output, rendered).map_err(|source| LotSizingError::Io { path: output.clone(), source })?;
            info!(path = %output.display(), "instance written");
        } else {
            println!("{rendered}");
        }
        Ok(())
    }

    /// Draws a random instance whose demand can always be met without backlog.
    pub fn instance(&self) -> Result<ProblemInstance> {
        self.check()?;

        let mut rng = self.rng();

        let mut nb_types_per_cluster = vec![self.nb_types / self.nb_clusters; self.nb_clusters];
        for n in nb_types_per_cluster.iter_mut().take(self.nb_types % self.nb_clusters) {
            *n += 1;
        }

        let inventory_cost = rng.gen_range(self.min_inventory..=self.max_inventory);
        let changeover = self.generate_changeover_costs(&mut rng, &nb_types_per_cluster)?;
        let demands = self.generate_demands(&mut rng);

        ProblemInstance::new(self.nb_periods, demands, inventory_cost, changeover)
    }

    fn check(&self) -> Result<()> {
        if self.nb_clusters == 0 || self.nb_clusters > self.nb_types {
            return Err(LotSizingError::InvalidParameters(format!(
                "{} clusters for {} item types", self.nb_clusters, self.nb_types
            )));
        }
        if !(0.0..=1.0).contains(&self.density) {
            return Err(LotSizingError::InvalidParameters(format!("density {} outside [0, 1]", self.density)));
        }
        if self.min_inventory < 0 || self.min_inventory > self.max_inventory {
            return Err(LotSizingError::InvalidParameters(format!(
                "inventory cost range [{}, {}]", self.min_inventory, self.max_inventory
            )));
        }
        if self.min_changeover_position > self.max_changeover_position {
            return Err(LotSizingError::InvalidParameters(format!(
                "changeover position range [{}, {}]", self.min_changeover_position, self.max_changeover_position
            )));
        }
        Ok(())
    }

    /// Each type gets a position drawn around the centroid of its cluster; the
    /// cost of switching between two types is the distance between them.
    fn generate_changeover_costs(&self, rng: &mut impl Rng, nb_types_per_cluster: &[usize]) -> Result<Vec<Vec<i64>>> {
        let mut members = vec![vec![]; self.nb_clusters];
        let mut t = 0_usize;
        for (i, n) in nb_types_per_cluster.iter().copied().enumerate() {
            for _ in 0..n {
                members[i].push(t);
                t += 1;
            }
        }

        let rand_centroid = Uniform::new_inclusive(self.min_changeover_position, self.max_changeover_position);
        let mut positions = vec![0_i64; self.nb_types];
        for cluster in members.iter() {
            let centroid = rand_centroid.sample(rng);
            let rand_position = Normal::new(centroid as f64, self.changeover_position_std_dev)
                .map_err(|e| LotSizingError::InvalidParameters(e.to_string()))?;
            for &ti in cluster {
                positions[ti] = rand_position.sample(rng).round() as i64;
            }
        }

        let mut transition_costs = vec![vec![0; self.nb_types]; self.nb_types];
        for (ti, row) in transition_costs.iter_mut().enumerate() {
            for (tj, cost) in row.iter_mut().enumerate() {
                *cost = (positions[ti] - positions[tj]).abs();
            }
        }

        Ok(transition_costs)
    }

    fn generate_demands(&self, rng: &mut impl Rng) -> Vec<Vec<u32>> {
        let mut feasibility_check = Feasibility::new(self.nb_periods);

        let mut demands = vec![vec![0; self.nb_periods]; self.nb_types];
        let nb_demands = (self.density * self.nb_periods as f64).round() as usize;
        let mut count = 0;

        let rand_type = Uniform::new(0, self.nb_types);

        while count < nb_demands {
            let Some(min) = feasibility_check.min() else { break };
            let rand_period = Uniform::new(min, self.nb_periods);
            let p = rand_period.sample(rng);
            let t = rand_type.sample(rng);
            if demands[t][p] == 0 {
                demands[t][p] = 1;
                feasibility_check.remove(p);
                count += 1;
            }
        }

        demands
    }

    fn rng(&self) -> impl Rng {
        let init = self.seed.unwrap_or_else(|| {
            SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default()
        });
        let mut seed = [0_u8; 32];
        seed.iter_mut().zip(init.to_be_bytes().into_iter()).for_each(|(s, i)| *s = i);
        seed.iter_mut().rev().zip(init.to_le_bytes().into_iter()).for_each(|(s, i)| *s = i);
        ChaChaRng::from_seed(seed)
    }

}

/// Production slots still free: every demand placed in period `p` consumes
/// the latest free slot not after `p`.
struct Feasibility {
    available: BTreeSet<usize>,
}

impl Feasibility {
    fn new(nb_periods: usize) -> Self {
        Feasibility {
            available: BTreeSet::from_iter(0..nb_periods)
        }
    }

    fn min(&self) -> Option<usize> {
        self.available.first().copied()
    }

    fn remove(&mut self, period: usize) {
        if let Some(&largest) = self.available.range((Unbounded, Included(period))).next_back() {
            self.available.remove(&largest);
        }
    }
}
