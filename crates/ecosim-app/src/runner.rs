//! Builds, populates and drives worlds for the `ecosim` binary.

use crate::cli::Cli;
use crate::sink::JsonLinesSink;
use anyhow::{Context, Result, bail};
use ecosim_brain::{InferenceModel, PolicyCache, register_heuristic};
use ecosim_brain_neuro::{NeuroflowPolicy, register_policy};
use ecosim_core::{
    NullPersistence, Preset, RunSummary, Species, StatisticsCollector, Tick, WorldConfig,
    WorldPersistence, WorldState, WorldStats,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Shared policy models keyed by the species they steer.
pub type PolicySet = HashMap<Species, Arc<dyn InferenceModel>>;

/// Outcome of one world.
#[derive(Debug, Clone, Serialize)]
pub struct WorldReport {
    pub index: u64,
    pub seed: u64,
    pub ticks: Tick,
    /// Tick at which every creature had died, if that happened.
    pub extinct_at: Option<Tick>,
    pub stats: WorldStats,
    pub summary: RunSummary,
    pub stats_path: Option<PathBuf>,
}

/// Read a world configuration, picking the format from the file extension.
pub fn read_config_file(path: &Path) -> Result<WorldConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("toml") => toml::from_str(&text)
            .with_context(|| format!("invalid TOML config {}", path.display())),
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON config {}", path.display())),
        _ => bail!(
            "unsupported config format for {} (expected .toml or .json)",
            path.display()
        ),
    }
}

/// Preset or config file, then flag overrides, then validation.
pub fn build_config(cli: &Cli) -> Result<WorldConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config_file(path)?,
        None => Preset::from(cli.preset).config(),
    };
    if let Some(dt) = cli.dt {
        config.dt = dt;
    }
    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    config.validate().context("invalid world configuration")?;
    Ok(config)
}

/// Load the weight files named on the command line.
///
/// Unreadable or mismatched weights degrade to a model that leaves the species idle.
pub fn load_policies(cli: &Cli) -> PolicySet {
    let mut cache = PolicyCache::new();
    let mut policies = PolicySet::new();
    for species in Species::ALL {
        if let Some(path) = cli.policy_path(species) {
            let model = cache.get_or_load(species, path, |path| {
                NeuroflowPolicy::load_for(path, species)
                    .map(|policy| Arc::new(policy) as Arc<dyn InferenceModel>)
            });
            policies.insert(species, model);
        }
    }
    policies
}

/// `base` unchanged for single runs, `stem-INDEX.ext` in batches.
#[must_use]
pub fn stats_path(base: &Path, index: u64, worlds: u64) -> PathBuf {
    if worlds <= 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stats".to_owned());
    let name = match base.extension() {
        Some(ext) => format!("{stem}-{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{index}"),
    };
    base.with_file_name(name)
}

fn install_brains(world: &mut WorldState, policies: &PolicySet) {
    for species in Species::ALL {
        let key = match policies.get(&species) {
            Some(model) => register_policy(world, species, Arc::clone(model)),
            None => register_heuristic(world, species),
        };
        let bound = world.bind_species_brain(species, key);
        info!(
            %species,
            bound,
            brain = world.brain_registry().kind(key).unwrap_or("unknown"),
            "bound brains"
        );
    }
}

/// Build one world from `config`, run it and report.
pub fn run_world(
    index: u64,
    mut config: WorldConfig,
    cli: &Cli,
    policies: &PolicySet,
) -> Result<WorldReport> {
    let seed = *config.rng_seed.get_or_insert_with(rand::random);
    let stats_out = cli
        .stats_out
        .as_deref()
        .map(|base| stats_path(base, index, cli.worlds));
    let persistence: Box<dyn WorldPersistence> = match &stats_out {
        Some(path) => Box::new(
            JsonLinesSink::create(path)
                .with_context(|| format!("failed to create stats file {}", path.display()))?,
        ),
        None => Box::new(NullPersistence),
    };
    let mut world = WorldState::with_persistence(config, persistence)
        .with_context(|| format!("failed to build world {index}"))?;
    world.populate();
    install_brains(&mut world, policies);

    let mut collector = StatisticsCollector::new();
    collector.start();
    collector.record(&world);
    let mut extinct_at = None;
    for _ in 0..cli.ticks {
        let events = world.step();
        collector.record(&world);
        if cli.report_every > 0 && events.tick.0 % cli.report_every == 0 {
            let stats = world.stats();
            info!(
                world = index,
                tick = %events.tick,
                herbivores = stats.herbivores,
                predators = stats.predators,
                smarts = stats.smarts,
                tribes = stats.tribes,
                plants = stats.plants,
                buildings = stats.buildings,
                "population"
            );
        }
        if events.extinct {
            info!(world = index, tick = %events.tick, "all creatures are gone; stopping early");
            extinct_at = Some(events.tick);
            break;
        }
    }
    collector.stop();

    Ok(WorldReport {
        index,
        seed,
        ticks: world.tick(),
        extinct_at,
        stats: world.stats().clone(),
        summary: collector.summary(),
        stats_path: stats_out,
    })
}

/// Run `cli.worlds` worlds in parallel with consecutive seeds.
pub fn run(cli: &Cli) -> Result<Vec<WorldReport>> {
    let config = build_config(cli)?;
    let policies = load_policies(cli);
    let base_seed = config.rng_seed.unwrap_or_else(rand::random);
    info!(
        worlds = cli.worlds,
        ticks = cli.ticks,
        base_seed,
        width = config.world_width,
        height = config.world_height,
        "starting ecosim"
    );
    (0..cli.worlds)
        .into_par_iter()
        .map(|index| {
            let mut world_config = config.clone();
            world_config.rng_seed = Some(base_seed.wrapping_add(index));
            run_world(index, world_config, cli, &policies)
        })
        .collect()
}
