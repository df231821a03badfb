//! Label-grid cell identifiers used to cap feature density per tile.

/// Pack the grid cell containing `(x, y)` into a single `u64`.
///
/// `x` and `y` are world coordinates scaled to `tiles_at_zoom` (i.e. already multiplied out to
/// the tile grid at the zoom being rendered). `grid_size` is the cell size, in that same scale.
///
/// `x` wraps modulo `tiles_at_zoom` before being bucketed, so a feature that straddles the
/// antimeridian lands in the same cell on both sides of the wrap; `y` does not wrap (there is no
/// pole-to-pole wraparound in tile space).
///
/// Two points in the same cell always produce the same id regardless of call order
/// (`label_grid_id` is a pure function of its inputs), which is what lets grouping be computed
/// independently per feature and still agree.
pub fn label_grid_id(tiles_at_zoom: u64, grid_size: f64, x: f64, y: f64) -> u64 {
    let wrapped_x = wrap(x, tiles_at_zoom as f64);
    let cell_x = (wrapped_x / grid_size).floor() as i64;
    let cell_y = (y / grid_size).floor() as i64;
    pack(cell_x, cell_y)
}

fn wrap(v: f64, modulus: f64) -> f64 {
    if modulus <= 0.0 {
        return v;
    }
    let r = v % modulus;
    if r < 0.0 {
        r + modulus
    } else {
        r
    }
}

fn pack(cell_x: i64, cell_y: i64) -> u64 {
    ((cell_x as u32 as u64) << 32) | (cell_y as u32 as u64)
}
