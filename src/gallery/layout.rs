//! Poster placement on the inside of a vertical cylinder.
//!
//! Rows are stacked `tile_repeats` times so vertical scrolling can wrap
//! without a visible seam. Placements come back sorted centre-out, which is
//! the order tiles are mounted and therefore the order textures are requested.

use std::cmp::Ordering;
use std::f32::consts::{PI, TAU};
use std::fmt;

use crate::catalog::PosterEntry;
use crate::config::{Configuration, CylinderSettings};

/// Stable identity of one tile: which repeat, which row within it, which column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId {
    pub tile: usize,
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.tile, self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TilePlacement {
    pub id: TileId,
    pub poster_index: usize,
    pub filename: String,
    /// World position `[x, y, z]` on the cylinder, y centred on zero.
    pub position: [f32; 3],
    /// Yaw that turns the tile to face the cylinder axis.
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CylinderLayout {
    radius: f32,
    columns: usize,
    rows: usize,
    row_height: f32,
    tile_repeats: usize,
    poster_count: usize,
}

impl CylinderLayout {
    pub fn new(settings: &CylinderSettings, columns: usize, poster_count: usize) -> Self {
        let columns = columns.max(1);
        Self {
            radius: settings.radius,
            columns,
            rows: poster_count.div_ceil(columns),
            row_height: settings.row_height(),
            tile_repeats: settings.tile_repeats.max(1),
            poster_count,
        }
    }

    /// Layout for the configured form factor (desktop or mobile columns).
    pub fn from_config(cfg: &Configuration, poster_count: usize) -> Self {
        Self::new(&cfg.cylinder, cfg.columns(), poster_count)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    pub fn angle_step(&self) -> f32 {
        TAU / self.columns as f32
    }

    /// Height of one repeat of the poster rows; the scroll offset wraps on this.
    pub fn tile_period(&self) -> f32 {
        self.rows as f32 * self.row_height
    }

    /// Height of all stacked repeats.
    pub fn total_height(&self) -> f32 {
        self.tile_period() * self.tile_repeats as f32
    }

    pub fn tile_count(&self) -> usize {
        self.rows * self.columns * self.tile_repeats
    }

    /// Every tile, sorted by distance from the vertical centre, then by angle,
    /// then by id. The last row of each repeat wraps around to the first posters.
    pub fn placements(&self, posters: &[PosterEntry]) -> Vec<TilePlacement> {
        if self.poster_count == 0 || posters.is_empty() {
            return Vec::new();
        }
        let step = self.angle_step();
        let tiled_rows = self.rows * self.tile_repeats;
        let centre = (tiled_rows as f32 - 1.0) / 2.0;

        let mut items = Vec::with_capacity(self.tile_count());
        for tile in 0..self.tile_repeats {
            for row in 0..self.rows {
                for col in 0..self.columns {
                    let poster_index = (row * self.columns + col) % self.poster_count;
                    let Some(entry) = posters.get(poster_index) else {
                        continue;
                    };
                    let global_row = tile * self.rows + row;
                    let stagger = if global_row % 2 == 1 { step * 0.5 } else { 0.0 };
                    let angle = col as f32 * step + stagger;
                    let y = (global_row as f32 - centre) * self.row_height;
                    items.push(TilePlacement {
                        id: TileId { tile, row, col },
                        poster_index,
                        filename: entry.filename.clone(),
                        position: [self.radius * angle.sin(), y, self.radius * angle.cos()],
                        rotation: angle + PI,
                    });
                }
            }
        }

        items.sort_by(|a, b| self.centre_out(a, b));
        items
    }

    // Rows whose |y| is within half a row of each other share a band.
    fn band(&self, y: f32) -> i64 {
        (y.abs() / self.row_height.max(f32::EPSILON) * 2.0).round() as i64
    }

    fn centre_out(&self, a: &TilePlacement, b: &TilePlacement) -> Ordering {
        self.band(a.position[1])
            .cmp(&self.band(b.position[1]))
            .then_with(|| a.rotation.total_cmp(&b.rotation))
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Shift a tile's local `y` by whole stack heights so that, with the
    /// group scrolled by `scroll_y`, it stays within ±half the stack.
    pub fn wrap_tile_y(&self, y: f32, scroll_y: f32) -> f32 {
        let total = self.total_height();
        let world = y + scroll_y;
        if total <= 0.0 || !world.is_finite() {
            return y;
        }
        let half = total / 2.0;
        if world > half {
            y - ((world - half) / total).ceil() * total
        } else if world < -half {
            y + ((-half - world) / total).ceil() * total
        } else {
            y
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posters(n: usize) -> Vec<PosterEntry> {
        (0..n)
            .map(|i| PosterEntry {
                filename: format!("p{i:02}.jpg"),
                title: format!("Poster {i}"),
                date: String::new(),
            })
            .collect()
    }

    fn layout(columns: usize, count: usize, repeats: usize) -> CylinderLayout {
        let settings = CylinderSettings {
            tile_repeats: repeats,
            ..CylinderSettings::default()
        };
        CylinderLayout::new(&settings, columns, count)
    }

    #[test]
    fn thirty_posters_on_twelve_columns() {
        let l = layout(12, 30, 11);
        assert_eq!(l.rows(), 3);
        assert_eq!(l.tile_count(), 3 * 12 * 11);
        assert!((l.tile_period() - 3.0 * 150.0).abs() < 1e-3);
        assert!((l.total_height() - 11.0 * 450.0).abs() < 1e-2);

        let placed = l.placements(&posters(30));
        assert_eq!(placed.len(), l.tile_count());
        // Last row wraps back to the first posters.
        let wrapped = placed
            .iter()
            .find(|p| p.id == TileId { tile: 0, row: 2, col: 6 })
            .unwrap();
        assert_eq!(wrapped.poster_index, 0);
        assert_eq!(wrapped.filename, "p00.jpg");
    }

    #[test]
    fn placements_sit_on_the_cylinder_and_face_inward() {
        let l = layout(8, 16, 1);
        for p in l.placements(&posters(16)) {
            let [x, _, z] = p.position;
            assert!(((x * x + z * z).sqrt() - 350.0).abs() < 1e-2);
            let angle = p.rotation - PI;
            assert!((x - 350.0 * angle.sin()).abs() < 1e-3);
        }
    }

    #[test]
    fn odd_global_rows_are_staggered_by_half_a_column() {
        let l = layout(4, 8, 1);
        let placed = l.placements(&posters(8));
        let even = placed.iter().find(|p| p.id == TileId { tile: 0, row: 0, col: 1 }).unwrap();
        let odd = placed.iter().find(|p| p.id == TileId { tile: 0, row: 1, col: 1 }).unwrap();
        let step = l.angle_step();
        assert!((even.rotation - PI - step).abs() < 1e-5);
        assert!((odd.rotation - PI - 1.5 * step).abs() < 1e-5);
    }

    #[test]
    fn sorted_centre_out_then_by_angle() {
        let l = layout(12, 30, 11);
        let placed = l.placements(&posters(30));
        let abs_y: Vec<f32> = placed.iter().map(|p| p.position[1].abs()).collect();
        for pair in abs_y.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-3, "not centre-out: {pair:?}");
        }
        // 33 tiled rows: the middle row is alone in the first band.
        assert!(placed[..12].iter().all(|p| p.position[1].abs() < 1e-3));
        for pair in placed[..12].windows(2) {
            assert!(pair[0].rotation < pair[1].rotation);
        }
        // Order is reproducible.
        assert_eq!(placed, l.placements(&posters(30)));
    }

    #[test]
    fn wrap_keeps_tiles_within_half_the_stack() {
        let l = layout(12, 30, 3);
        let total = l.total_height();
        let half = total / 2.0;
        for scroll in [0.0, 100.0, 449.0, 2.0 * total + 17.0, -3.5 * total] {
            for p in l.placements(&posters(30)) {
                let y = l.wrap_tile_y(p.position[1], scroll);
                let world = y + scroll;
                assert!(world <= half + 1e-2 && world >= -half - 1e-2, "{world}");
                let shifts = (y - p.position[1]) / total;
                assert!((shifts - shifts.round()).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn empty_catalog_places_nothing() {
        assert!(layout(12, 0, 11).placements(&[]).is_empty());
    }
}
