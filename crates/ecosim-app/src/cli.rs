use clap::{Parser, ValueEnum};
use ecosim_core::{Preset, Species};
use std::path::PathBuf;

/// Starting scenario selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum PresetArg {
    #[default]
    Balanced,
    HerbivoreDominated,
    PredatorDominant,
    ScarceResources,
}

impl From<PresetArg> for Preset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Balanced => Preset::Balanced,
            PresetArg::HerbivoreDominated => Preset::HerbivoreDominated,
            PresetArg::PredatorDominant => Preset::PredatorDominant,
            PresetArg::ScarceResources => Preset::ScarceResources,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ecosim",
    version,
    about = "Run ecosim ecosystem worlds without a display"
)]
pub struct Cli {
    /// Scenario used as the base configuration.
    #[arg(long, value_enum, env = "ECOSIM_PRESET", default_value_t = PresetArg::Balanced)]
    pub preset: PresetArg,

    /// TOML or JSON world configuration replacing the preset.
    #[arg(long, env = "ECOSIM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ticks to simulate per world.
    #[arg(long, env = "ECOSIM_TICKS", default_value_t = 1000)]
    pub ticks: u64,

    /// Seconds per tick.
    #[arg(long, env = "ECOSIM_DT")]
    pub dt: Option<f32>,

    /// Seed of the first world; batch worlds use consecutive seeds.
    #[arg(long, env = "ECOSIM_SEED")]
    pub seed: Option<u64>,

    /// Log a population line every N ticks (0 disables).
    #[arg(long, env = "ECOSIM_REPORT_EVERY", default_value_t = 100)]
    pub report_every: u64,

    /// Write one JSON tick summary per line to this file.
    #[arg(long, env = "ECOSIM_STATS_OUT")]
    pub stats_out: Option<PathBuf>,

    /// Independent worlds to run in parallel.
    #[arg(long, env = "ECOSIM_WORLDS", default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub worlds: u64,

    /// NeuroFlow weights steering herbivores.
    #[arg(long, env = "ECOSIM_HERBIVORE_POLICY")]
    pub herbivore_policy: Option<PathBuf>,

    /// NeuroFlow weights steering predators.
    #[arg(long, env = "ECOSIM_PREDATOR_POLICY")]
    pub predator_policy: Option<PathBuf>,

    /// NeuroFlow weights steering smart creatures.
    #[arg(long, env = "ECOSIM_SMART_POLICY")]
    pub smart_policy: Option<PathBuf>,
}

impl Cli {
    /// Weights path requested for `species`, if any.
    #[must_use]
    pub fn policy_path(&self, species: Species) -> Option<&PathBuf> {
        match species {
            Species::Herbivore => self.herbivore_policy.as_ref(),
            Species::Predator => self.predator_policy.as_ref(),
            Species::Smart => self.smart_policy.as_ref(),
        }
    }
}
