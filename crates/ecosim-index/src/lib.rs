//! Spatial indexing for ecosim neighbourhood queries.
//!
//! The world keeps one [`UniformGridIndex`] per object family (creatures, plants, resource
//! nodes). Creatures move every tick, so the grid supports a lazy update path: movers are
//! flagged with [`UniformGridIndex::mark_moved`] and relocated in bulk by
//! [`UniformGridIndex::reindex_moved`]. Low-churn families are rebuilt wholesale instead.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;

/// Errors emitted by spatial index implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Indicates configuration values that cannot be used (e.g., non-positive cell size).
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Common behaviour exposed by neighbourhood indices.
pub trait NeighborhoodIndex<K> {
    /// Rebuild internal structures from scratch.
    fn rebuild(&mut self, items: &[(K, (f32, f32))]);

    /// Visit every key within `radius` of `center` together with its distance.
    fn visit_within(
        &self,
        center: (f32, f32),
        radius: f32,
        visitor: &mut dyn FnMut(K, OrderedFloat<f32>),
    );
}

/// Construction parameters for a uniform grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GridSpec {
    /// Edge length of each grid cell.
    pub cell_size: f32,
    /// Width of the indexed area.
    pub width: f32,
    /// Height of the indexed area.
    pub height: f32,
}

impl GridSpec {
    /// Validate the parameters, returning the grid dimensions in cells.
    pub fn dimensions(&self) -> Result<(usize, usize), IndexError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(IndexError::InvalidConfig(
                "cell_size must be positive and finite",
            ));
        }
        if !self.width.is_finite()
            || !self.height.is_finite()
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(IndexError::InvalidConfig(
                "indexed area must have positive, finite extent",
            ));
        }
        let cols = (self.width / self.cell_size).ceil().max(1.0) as usize;
        let rows = (self.height / self.cell_size).ceil().max(1.0) as usize;
        Ok((cols, rows))
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    position: (f32, f32),
    cell: usize,
    flagged: bool,
}

/// Uniform grid bucketing keys by the cell their position falls into.
#[derive(Debug, Clone)]
pub struct UniformGridIndex<K> {
    spec: GridSpec,
    inv_cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<K>>,
    entries: HashMap<K, Entry>,
    moved: Vec<K>,
}

impl<K> UniformGridIndex<K>
where
    K: Copy + Eq + Hash,
{
    /// Create an empty grid covering `[0, width] x [0, height]`.
    pub fn new(cell_size: f32, width: f32, height: f32) -> Result<Self, IndexError> {
        Self::from_spec(GridSpec {
            cell_size,
            width,
            height,
        })
    }

    /// Create an empty grid from a validated [`GridSpec`].
    pub fn from_spec(spec: GridSpec) -> Result<Self, IndexError> {
        let (cols, rows) = spec.dimensions()?;
        Ok(Self {
            inv_cell_size: spec.cell_size.recip(),
            spec,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
            entries: HashMap::new(),
            moved: Vec::new(),
        })
    }

    /// Edge length of a cell.
    #[must_use]
    pub const fn cell_size(&self) -> f32 {
        self.spec.cell_size
    }

    /// Grid dimensions in cells as `(columns, rows)`.
    #[must_use]
    pub const fn dims(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true when `key` is indexed.
    #[must_use]
    pub fn contains(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }

    /// Last position recorded for `key`.
    #[must_use]
    pub fn position_of(&self, key: K) -> Option<(f32, f32)> {
        self.entries.get(&key).map(|entry| entry.position)
    }

    /// Keys currently stored in the cell containing `point`.
    #[must_use]
    pub fn cell_members(&self, point: (f32, f32)) -> &[K] {
        let (cx, cy) = self.cell_coords(point);
        &self.cells[cy * self.cols + cx]
    }

    fn cell_coords(&self, (x, y): (f32, f32)) -> (usize, usize) {
        // Float-to-int casts saturate, so negative and NaN inputs land in cell 0.
        let cx = ((x * self.inv_cell_size).floor() as isize).clamp(0, self.cols as isize - 1);
        let cy = ((y * self.inv_cell_size).floor() as isize).clamp(0, self.rows as isize - 1);
        (cx as usize, cy as usize)
    }

    fn cell_of(&self, point: (f32, f32)) -> usize {
        let (cx, cy) = self.cell_coords(point);
        cy * self.cols + cx
    }

    fn detach(&mut self, key: K, cell: usize) {
        let bucket = &mut self.cells[cell];
        if let Some(slot) = bucket.iter().position(|candidate| *candidate == key) {
            bucket.swap_remove(slot);
        }
    }

    /// Place `key` at `position`. Inserting a key that is already indexed moves it.
    pub fn insert(&mut self, key: K, position: (f32, f32)) {
        let cell = self.cell_of(position);
        if let Some(entry) = self.entries.get(&key).copied() {
            if entry.cell != cell {
                self.detach(key, entry.cell);
                self.cells[cell].push(key);
            }
            self.entries.insert(
                key,
                Entry {
                    position,
                    cell,
                    flagged: entry.flagged,
                },
            );
            return;
        }
        self.cells[cell].push(key);
        self.entries.insert(
            key,
            Entry {
                position,
                cell,
                flagged: false,
            },
        );
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&mut self, key: K) -> bool {
        match self.entries.remove(&key) {
            Some(entry) => {
                self.detach(key, entry.cell);
                true
            }
            None => false,
        }
    }

    /// Record a new position for `key` without touching its bucket yet.
    ///
    /// The bucket is corrected by the next [`Self::reindex_moved`]. Unknown keys are ignored.
    pub fn mark_moved(&mut self, key: K, position: (f32, f32)) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.position = position;
            if !entry.flagged {
                entry.flagged = true;
                self.moved.push(key);
            }
        }
    }

    /// Number of keys flagged since the last reindex.
    #[must_use]
    pub fn pending_moves(&self) -> usize {
        self.moved.len()
    }

    /// Relocate flagged keys whose cell changed. Returns how many keys switched buckets.
    pub fn reindex_moved(&mut self) -> usize {
        let moved = std::mem::take(&mut self.moved);
        let mut relocated = 0;
        for key in &moved {
            let Some(entry) = self.entries.get(key).copied() else {
                continue;
            };
            let cell = self.cell_of(entry.position);
            if cell != entry.cell {
                self.detach(*key, entry.cell);
                self.cells[cell].push(*key);
                relocated += 1;
            }
            self.entries.insert(
                *key,
                Entry {
                    position: entry.position,
                    cell,
                    flagged: false,
                },
            );
        }
        self.moved = moved;
        self.moved.clear();
        relocated
    }

    /// Drop every key.
    pub fn clear(&mut self) {
        for bucket in &mut self.cells {
            bucket.clear();
        }
        self.entries.clear();
        self.moved.clear();
    }

    /// All keys within `radius` of `center`, nearest first.
    ///
    /// Only the square block of cells within `ceil(radius / cell_size)` of the centre cell is
    /// visited. Candidates are filtered by squared distance, so corner cells never leak keys
    /// that lie outside the circle.
    #[must_use]
    pub fn query_radius(&self, center: (f32, f32), radius: f32) -> Vec<(K, f32)> {
        let mut found: Vec<(K, OrderedFloat<f32>)> = Vec::new();
        self.visit_within(center, radius, &mut |key, distance| {
            found.push((key, distance));
        });
        found.sort_by_key(|(_, distance)| *distance);
        found
            .into_iter()
            .map(|(key, distance)| (key, distance.into_inner()))
            .collect()
    }

    /// Nearest key within `radius`, if any.
    #[must_use]
    pub fn nearest_within(&self, center: (f32, f32), radius: f32) -> Option<(K, f32)> {
        let mut best: Option<(K, OrderedFloat<f32>)> = None;
        self.visit_within(center, radius, &mut |key, distance| {
            if best.is_none_or(|(_, current)| distance < current) {
                best = Some((key, distance));
            }
        });
        best.map(|(key, distance)| (key, distance.into_inner()))
    }
}

impl<K> NeighborhoodIndex<K> for UniformGridIndex<K>
where
    K: Copy + Eq + Hash,
{
    fn rebuild(&mut self, items: &[(K, (f32, f32))]) {
        self.clear();
        for (key, position) in items {
            self.insert(*key, *position);
        }
    }

    fn visit_within(
        &self,
        center: (f32, f32),
        radius: f32,
        visitor: &mut dyn FnMut(K, OrderedFloat<f32>),
    ) {
        if radius.is_nan() || radius < 0.0 {
            return;
        }
        let span = self.cols.max(self.rows) as f32;
        let reach = (radius * self.inv_cell_size).ceil().min(span) as isize;
        let (cx, cy) = self.cell_coords(center);
        let (cx, cy) = (cx as isize, cy as isize);
        let radius_sq = radius * radius;

        let y_start = (cy - reach).max(0) as usize;
        let y_end = (cy + reach).min(self.rows as isize - 1) as usize;
        let x_start = (cx - reach).max(0) as usize;
        let x_end = (cx + reach).min(self.cols as isize - 1) as usize;

        for row in y_start..=y_end {
            for col in x_start..=x_end {
                for key in &self.cells[row * self.cols + col] {
                    let Some(entry) = self.entries.get(key) else {
                        continue;
                    };
                    let dx = entry.position.0 - center.0;
                    let dy = entry.position.1 - center.1;
                    let dist_sq = dx * dx + dy * dy;
                    if dist_sq <= radius_sq {
                        visitor(*key, OrderedFloat(dist_sq.sqrt()));
                    }
                }
            }
        }
    }
}
