use clap::Parser;
use ecosim_app::{Cli, run};
use ecosim_brain::observation_size;
use ecosim_brain_neuro::{NeuroflowPolicy, NeuroflowPolicyConfig};
use ecosim_core::{Species, TickSummary};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::fs;
use std::path::{Path, PathBuf};

const SMALL_WORLD: &str = r#"
world_width = 500.0
world_height = 500.0
dt = 0.016
rng_seed = 21

[plants]
count = 40

[resources]
trees = 6
stones = 4
copper = 2
iron = 1
"#;

fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("small.toml");
    fs::write(&path, SMALL_WORLD).expect("write config");
    path
}

fn read_log(path: &Path) -> Vec<TickSummary> {
    fs::read_to_string(path)
        .expect("read tick log")
        .lines()
        .map(|line| serde_json::from_str(line).expect("tick summary line"))
        .collect()
}

fn args(config: &Path, stats: &Path, extra: &[&str]) -> Cli {
    let mut argv = vec![
        "ecosim".to_owned(),
        "--config".to_owned(),
        config.display().to_string(),
        "--ticks".to_owned(),
        "40".to_owned(),
        "--report-every".to_owned(),
        "0".to_owned(),
        "--stats-out".to_owned(),
        stats.display().to_string(),
    ];
    argv.extend(extra.iter().map(|arg| (*arg).to_owned()));
    Cli::try_parse_from(argv).expect("parse args")
}

#[test]
fn batch_runs_write_one_log_per_world() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let stats = dir.path().join("ticks.jsonl");
    let cli = args(&config, &stats, &["--worlds", "2"]);

    let reports = run(&cli).expect("run");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].seed, 21);
    assert_eq!(reports[1].seed, 22);

    for report in &reports {
        let path = report.stats_path.as_ref().expect("stats path");
        assert_eq!(
            path,
            &dir.path().join(format!("ticks-{}.jsonl", report.index))
        );
        let log = read_log(path);
        assert_eq!(log.len() as u64, report.ticks.0);
        let last = log.last().expect("at least one tick");
        assert_eq!(last.tick, report.ticks);
        assert_eq!(last.stats, report.stats);
        assert_eq!(report.summary.last_tick, report.ticks);
    }
}

#[test]
fn identical_seeds_produce_identical_logs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let first = dir.path().join("first.jsonl");
    let second = dir.path().join("second.jsonl");

    run(&args(&config, &first, &["--seed", "5"])).expect("first run");
    run(&args(&config, &second, &["--seed", "5"])).expect("second run");
    assert_eq!(read_log(&first), read_log(&second));
}

#[test]
fn policy_weights_steer_a_species() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = write_config(dir.path());
    let stats = dir.path().join("policy.jsonl");
    let weights = dir.path().join("herbivore.json");

    let mut rng = SmallRng::seed_from_u64(3);
    let policy_config = NeuroflowPolicyConfig {
        hidden_layers: vec![16],
        ..NeuroflowPolicyConfig::default()
    };
    NeuroflowPolicy::random(
        policy_config,
        observation_size(Species::Herbivore),
        &mut rng,
    )
    .expect("policy")
    .save_json(&weights)
    .expect("save weights");

    let weights_arg = weights.display().to_string();
    let cli = args(
        &config,
        &stats,
        &["--herbivore-policy", &weights_arg, "--smart-policy", "/missing/smart.json"],
    );
    let reports = run(&cli).expect("run with policies");
    assert_eq!(reports.len(), 1);
    assert_eq!(read_log(&stats).len() as u64, reports[0].ticks.0);
}

#[test]
fn invalid_config_files_fail_with_context() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("bad.toml");
    fs::write(&config, "world_width = 0.0\n").expect("write config");
    let stats = dir.path().join("never.jsonl");

    let error = run(&args(&config, &stats, &[])).expect_err("zero width must be rejected");
    assert!(error.to_string().contains("invalid world configuration"));
    assert!(!stats.exists());
}
