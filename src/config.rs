use std::error::Error;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use strata_chunk::GenParams;
use strata_provider::ProviderConfig;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ObserverSpec {
    pub id: u64,
    #[serde(default)]
    pub start: [i32; 3],
    /// Chunks per tick along x and z.
    #[serde(default)]
    pub velocity: [f32; 2],
    #[serde(default = "default_distance")]
    pub distance: u32,
}

fn default_distance() -> u32 {
    4
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DriverConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub generator: GenParams,
    #[serde(default = "default_observers")]
    pub observers: Vec<ObserverSpec>,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_observers() -> Vec<ObserverSpec> {
    vec![ObserverSpec {
        id: 1,
        start: [0, 0, 0],
        velocity: [0.25, 0.0],
        distance: default_distance(),
    }]
}
fn default_ticks() -> u64 {
    200
}
fn default_tick_ms() -> u64 {
    50
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            generator: GenParams::default(),
            observers: default_observers(),
            ticks: default_ticks(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl DriverConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let s = fs::read_to_string(path)?;
        let cfg: DriverConfig = toml::from_str(&s)?;
        Ok(cfg)
    }

    pub fn load_or_default(path: &Path) -> Result<Self, Box<dyn Error>> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("{} not found, using built-in defaults", path.display());
            Ok(Self::default())
        }
    }
}
