use std::path::PathBuf;

use clap::Parser;

use crate::config::DriverConfig;

/// Headless chunk streaming driver.
#[derive(Debug, Parser)]
#[command(name = "strata", version, about)]
pub struct Args {
    /// Driver configuration (TOML).
    #[arg(long, default_value = "strata.toml")]
    pub config: PathBuf,

    /// Number of ticks to run before disposing.
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Pipeline worker threads.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Near-cache budget in chunks.
    #[arg(long)]
    pub budget: Option<usize>,

    /// Terrain seed.
    #[arg(long)]
    pub seed: Option<i32>,

    /// Flat layered terrain instead of noise.
    #[arg(long)]
    pub flat: bool,

    /// Reload observer distances when the config file changes.
    #[arg(long)]
    pub watch: bool,

    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn apply(&self, cfg: &mut DriverConfig) {
        if let Some(t) = self.ticks {
            cfg.ticks = t;
        }
        if let Some(w) = self.workers {
            cfg.provider.workers = w;
        }
        if let Some(b) = self.budget {
            cfg.provider.cache_budget = Some(b);
        }
        if let Some(s) = self.seed {
            cfg.generator.seed = s;
        }
    }
}
