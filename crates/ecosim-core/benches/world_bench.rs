use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use ecosim_core::{WorldConfig, WorldState};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
        .unwrap_or(fallback)
}

fn bench_world_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");
    let samples: usize = env_or("ECOSIM_BENCH_SAMPLES", 30).max(10);
    let warm: u64 = env_or("ECOSIM_BENCH_WARMUP_SECS", 2);
    let measure: u64 = env_or("ECOSIM_BENCH_MEASURE_SECS", 10);
    group.sample_size(samples);
    group.warm_up_time(Duration::from_secs(warm));
    group.measurement_time(Duration::from_secs(measure));

    let steps: usize = env_or("ECOSIM_BENCH_STEPS", 64).max(1);
    // Population scale factors applied to the default herbivore/predator/smart counts.
    let scales: Vec<usize> = std::env::var("ECOSIM_BENCH_SCALES")
        .ok()
        .map(|raw| {
            raw.split(',')
                .filter_map(|token| token.trim().parse::<usize>().ok())
                .filter(|scale| *scale > 0)
                .collect::<Vec<_>>()
        })
        .filter(|scales| !scales.is_empty())
        .unwrap_or_else(|| vec![1, 10, 40]);

    for &scale in &scales {
        group.bench_function(format!("steps{steps}_scale{scale}"), |b| {
            b.iter_batched(
                || {
                    let mut config = WorldConfig {
                        rng_seed: Some(0xBEEF),
                        history_capacity: 1,
                        ..WorldConfig::default()
                    };
                    config.herbivores.count *= scale;
                    config.predators.count *= scale;
                    config.smarts.count *= scale;
                    config.plants.count *= scale;
                    let mut world = WorldState::new(config).expect("world");
                    world.populate();
                    world
                },
                |mut world| {
                    for _ in 0..steps {
                        world.step();
                    }
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_world_steps);
criterion_main!(benches);
