//! Headless runner for ecosim worlds: CLI parsing, configuration loading, brain wiring and
//! parallel batch runs.

pub mod cli;
pub mod runner;
pub mod sink;

pub use cli::{Cli, PresetArg};
pub use runner::{
    PolicySet, WorldReport, build_config, load_policies, read_config_file, run, run_world,
    stats_path,
};
pub use sink::JsonLinesSink;
