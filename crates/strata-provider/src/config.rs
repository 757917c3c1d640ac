use std::path::PathBuf;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ProviderConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Memory the host is willing to spend, in MiB. The near cache keeps
    /// roughly two chunks per MiB unless `cache_budget` overrides it.
    #[serde(default = "default_memory_budget_mib")]
    pub memory_budget_mib: usize,
    #[serde(default)]
    pub cache_budget: Option<usize>,
    #[serde(default = "default_save_root")]
    pub save_root: PathBuf,
    #[serde(default = "default_world")]
    pub world: String,
}

fn default_workers() -> usize {
    8
}
fn default_memory_budget_mib() -> usize {
    1024
}
fn default_save_root() -> PathBuf {
    PathBuf::from("saves")
}
fn default_world() -> String {
    "world".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            memory_budget_mib: default_memory_budget_mib(),
            cache_budget: None,
            save_root: default_save_root(),
            world: default_world(),
        }
    }
}

impl ProviderConfig {
    /// Number of chunks the near cache may hold before the sweep starts evicting.
    pub fn cache_budget(&self) -> usize {
        self.cache_budget
            .unwrap_or_else(|| self.memory_budget_mib.saturating_mul(2))
    }

    pub fn save_path(&self) -> PathBuf {
        strata_store::world_save_path(&self.save_root, &self.world)
    }
}
