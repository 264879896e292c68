use anyhow::Result;
use clap::Parser;
use ecosim_app::{Cli, run};
use ecosim_core::Species;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let reports = run(&cli)?;
    for report in &reports {
        let outcome = match report.extinct_at {
            Some(tick) => format!("extinct at tick {tick}"),
            None => format!("ran {} ticks", report.ticks),
        };
        println!("world {} (seed {}): {outcome}", report.index, report.seed);
        for species in Species::ALL {
            let population = report.summary.population(species);
            println!(
                "  {:<10} final {:>4}  peak {:>4}  mean {:>8.2}  avg energy {:>7.2}",
                species.label(),
                population.last,
                population.max,
                population.average,
                report.stats.average_energy(species),
            );
        }
        println!(
            "  plants {}  tribes {}  buildings {}",
            report.stats.plants, report.stats.tribes, report.stats.buildings
        );
        if let Some(path) = &report.stats_path {
            println!("  tick log: {}", path.display());
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
