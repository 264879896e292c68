use ecosim_index::{NeighborhoodIndex, UniformGridIndex};
use proptest::prelude::*;

const WORLD: f32 = 1000.0;

fn brute_force(points: &[(f32, f32)], center: (f32, f32), radius: f32) -> Vec<usize> {
    let mut hits: Vec<usize> = points
        .iter()
        .enumerate()
        .filter(|(_, (x, y))| {
            let dx = x - center.0;
            let dy = y - center.1;
            dx * dx + dy * dy <= radius * radius
        })
        .map(|(idx, _)| idx)
        .collect();
    hits.sort_unstable();
    hits
}

proptest! {
    #[test]
    fn query_matches_brute_force(
        points in prop::collection::vec((0.0f32..WORLD, 0.0f32..WORLD), 0..200),
        center in (0.0f32..WORLD, 0.0f32..WORLD),
        radius in 0.0f32..400.0,
        cell_size in 5.0f32..500.0,
    ) {
        let mut grid = UniformGridIndex::new(cell_size, WORLD, WORLD).expect("grid");
        let items: Vec<(usize, (f32, f32))> = points.iter().copied().enumerate().collect();
        grid.rebuild(&items);

        let hits = grid.query_radius(center, radius);
        let mut keys: Vec<usize> = hits.iter().map(|(key, _)| *key).collect();
        keys.sort_unstable();
        prop_assert_eq!(keys, brute_force(&points, center, radius));

        for pair in hits.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1, "distances must be non-decreasing");
        }
    }

    #[test]
    fn reindex_without_moves_is_idempotent(
        points in prop::collection::vec((0.0f32..WORLD, 0.0f32..WORLD), 1..100),
        cell_size in 10.0f32..300.0,
    ) {
        let mut grid = UniformGridIndex::new(cell_size, WORLD, WORLD).expect("grid");
        for (idx, point) in points.iter().enumerate() {
            grid.insert(idx, *point);
        }
        let before = grid.query_radius((WORLD / 2.0, WORLD / 2.0), WORLD * 2.0);
        for _ in 0..3 {
            prop_assert_eq!(grid.reindex_moved(), 0);
        }
        let after = grid.query_radius((WORLD / 2.0, WORLD / 2.0), WORLD * 2.0);
        prop_assert_eq!(before, after);
    }

    #[test]
    fn lazy_moves_converge_to_fresh_index(
        start in prop::collection::vec((0.0f32..WORLD, 0.0f32..WORLD), 1..80),
        offsets in prop::collection::vec((-150.0f32..150.0, -150.0f32..150.0), 80),
        center in (0.0f32..WORLD, 0.0f32..WORLD),
        radius in 1.0f32..300.0,
    ) {
        let mut lazy = UniformGridIndex::new(50.0, WORLD, WORLD).expect("grid");
        for (idx, point) in start.iter().enumerate() {
            lazy.insert(idx, *point);
        }
        let moved: Vec<(f32, f32)> = start
            .iter()
            .zip(offsets.iter())
            .map(|((x, y), (dx, dy))| ((x + dx).clamp(0.0, WORLD), (y + dy).clamp(0.0, WORLD)))
            .collect();
        for (idx, point) in moved.iter().enumerate() {
            lazy.mark_moved(idx, *point);
        }
        lazy.reindex_moved();

        let mut keys: Vec<usize> = lazy
            .query_radius(center, radius)
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        keys.sort_unstable();
        prop_assert_eq!(keys, brute_force(&moved, center, radius));
    }
}
