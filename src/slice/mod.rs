//! Cuts a single zoom-scaled geometry into the per-tile coordinate sequences the renderer emits.
//!
//! Clipping is done per candidate tile as four sequential Sutherland-Hodgman half-plane cuts
//! (left, right, top, bottom) against that tile's buffered cell, rather than the column-then-row
//! two-pass sweep the upstream slicer uses to amortize the column clip across every row in it.
//! The two produce identical results for a rectangular clip window; this crate takes the simpler
//! one since nothing here needs the shared-column optimization to stay correct or testable.

use std::collections::{HashMap, HashSet};

use geo_types::Coord;

use crate::tile::{TileCoord, TileExtent};

/// One ring or line, as a flat coordinate sequence (closed for rings, open for lines).
pub type CoordSeq = Vec<Coord<f64>>;

/// One polygon (outer ring followed by any inner rings) or one standalone line/point sequence.
pub type RingGroup = Vec<CoordSeq>;

/// The result of slicing one geometry: per-tile coordinate data plus the set of tiles the
/// polygon fills completely (empty for non-polygon geometries).
#[derive(Debug, Clone, Default)]
pub struct TiledGeometry {
    pub zoom_level: u8,
    pub tile_data: HashMap<TileCoord, Vec<RingGroup>>,
    pub filled_tiles: HashSet<TileCoord>,
}

impl TiledGeometry {
    fn new(zoom_level: u8) -> Self {
        Self {
            zoom_level,
            tile_data: HashMap::new(),
            filled_tiles: HashSet::new(),
        }
    }

    fn push(&mut self, tile: TileCoord, group: RingGroup) {
        self.tile_data.entry(tile).or_default().push(group);
    }
}

/// Replicate each zoom-scaled point into every tile whose buffered footprint contains it (up to
/// nine tiles near a corner).
pub fn slice_points_into_tiles(
    extents: &TileExtent,
    buffer: f64,
    z: u8,
    coords: &[Coord<f64>],
    _source_id: &str,
) -> TiledGeometry {
    let mut out = TiledGeometry::new(z);
    for &c in coords {
        for (tx, ty) in candidate_tiles(c.x, c.y, buffer, extents) {
            let local = Coord {
                x: c.x - tx as f64,
                y: c.y - ty as f64,
            };
            out.push(TileCoord::new(z, tx, ty), vec![vec![local]]);
        }
    }
    out
}

/// Clip zoom-scaled line/polygon ring groups against every tile they touch.
pub fn slice_into_tiles(
    groups: &[RingGroup],
    buffer: f64,
    is_area: bool,
    z: u8,
    extents: &TileExtent,
    _source_id: &str,
) -> TiledGeometry {
    let mut out = TiledGeometry::new(z);

    for group in groups {
        if group.is_empty() {
            continue;
        }
        let bbox = match bounding_box(group) {
            Some(b) => b,
            None => continue,
        };
        for tx in tile_range(bbox.0, bbox.2, buffer, extents.min_x, extents.max_x) {
            for ty in tile_range(bbox.1, bbox.3, buffer, extents.min_y, extents.max_y) {
                let cell = Rect {
                    x0: tx as f64 - buffer,
                    y0: ty as f64 - buffer,
                    x1: (tx + 1) as f64 + buffer,
                    y1: (ty + 1) as f64 + buffer,
                };

                if is_area {
                    let clipped = clip_polygon_group(group, &cell);
                    if clipped.iter().any(|r| r.len() >= 4) {
                        let unbuffered = Rect {
                            x0: tx as f64,
                            y0: ty as f64,
                            x1: (tx + 1) as f64,
                            y1: (ty + 1) as f64,
                        };
                        if is_full_tile_fill(group, &unbuffered) {
                            // The whole tile is interior to the polygon: record it as filled
                            // instead of re-encoding the clipped ring, so the renderer can emit
                            // the constant FILL geometry for it exactly once per zoom.
                            out.filled_tiles.insert(TileCoord::new(z, tx, ty));
                        } else {
                            let local = translate_group(&clipped, tx, ty);
                            out.push(TileCoord::new(z, tx, ty), local);
                        }
                    }
                } else {
                    for ring in group {
                        for piece in clip_line(ring, &cell) {
                            if piece.len() >= 2 {
                                out.push(
                                    TileCoord::new(z, tx, ty),
                                    vec![translate_seq(&piece, tx, ty)],
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    out
}

fn candidate_tiles(x: f64, y: f64, buffer: f64, extents: &TileExtent) -> Vec<(u32, u32)> {
    let mut tiles = Vec::with_capacity(4);
    for tx in tile_range(x, x, buffer, extents.min_x, extents.max_x) {
        for ty in tile_range(y, y, buffer, extents.min_y, extents.max_y) {
            let local_x = x - tx as f64;
            let local_y = y - ty as f64;
            if (-buffer..=1.0 + buffer).contains(&local_x) && (-buffer..=1.0 + buffer).contains(&local_y)
            {
                tiles.push((tx, ty));
            }
        }
    }
    tiles
}

fn tile_range(min: f64, max: f64, buffer: f64, lo: u32, hi: u32) -> Vec<u32> {
    let lo_t = (min - buffer).floor().max(lo as f64) as i64;
    let hi_t = (max + buffer).floor().min((hi as i64 - 1) as f64) as i64;
    if hi_t < lo_t {
        return Vec::new();
    }
    (lo_t.max(0)..=hi_t).map(|v| v as u32).collect()
}

fn bounding_box(group: &RingGroup) -> Option<(f64, f64, f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    let mut seen = false;
    for seq in group {
        for c in seq {
            seen = true;
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
    }
    seen.then_some((min_x, min_y, max_x, max_y))
}

fn translate_group(group: &RingGroup, tx: u32, ty: u32) -> RingGroup {
    group.iter().map(|seq| translate_seq(seq, tx, ty)).collect()
}

fn translate_seq(seq: &[Coord<f64>], tx: u32, ty: u32) -> CoordSeq {
    seq.iter()
        .map(|c| Coord {
            x: c.x - tx as f64,
            y: c.y - ty as f64,
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Rect {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

/// Clip every ring of a polygon group against `cell` via four Sutherland-Hodgman half-plane cuts.
fn clip_polygon_group(group: &RingGroup, cell: &Rect) -> RingGroup {
    group
        .iter()
        .map(|ring| clip_ring(ring, cell))
        .filter(|r| r.len() >= 4)
        .collect()
}

fn clip_ring(ring: &[Coord<f64>], cell: &Rect) -> CoordSeq {
    let mut poly: CoordSeq = ring.to_vec();
    poly = clip_half_plane(&poly, |c| c.x >= cell.x0, |a, b| intersect_x(a, b, cell.x0));
    poly = clip_half_plane(&poly, |c| c.x <= cell.x1, |a, b| intersect_x(a, b, cell.x1));
    poly = clip_half_plane(&poly, |c| c.y >= cell.y0, |a, b| intersect_y(a, b, cell.y0));
    poly = clip_half_plane(&poly, |c| c.y <= cell.y1, |a, b| intersect_y(a, b, cell.y1));
    poly
}

fn clip_half_plane(
    poly: &[Coord<f64>],
    inside: impl Fn(Coord<f64>) -> bool,
    intersect: impl Fn(Coord<f64>, Coord<f64>) -> Coord<f64>,
) -> CoordSeq {
    if poly.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(poly.len() + 2);
    let n = poly.len();
    for i in 0..n {
        let curr = poly[i];
        let prev = poly[(i + n - 1) % n];
        let curr_in = inside(curr);
        let prev_in = inside(prev);
        if curr_in {
            if !prev_in {
                out.push(intersect(prev, curr));
            }
            out.push(curr);
        } else if prev_in {
            out.push(intersect(prev, curr));
        }
    }
    out
}

fn intersect_x(a: Coord<f64>, b: Coord<f64>, x: f64) -> Coord<f64> {
    let t = (x - a.x) / (b.x - a.x);
    Coord {
        x,
        y: a.y + t * (b.y - a.y),
    }
}

fn intersect_y(a: Coord<f64>, b: Coord<f64>, y: f64) -> Coord<f64> {
    let t = (y - a.y) / (b.y - a.y);
    Coord {
        x: a.x + t * (b.x - a.x),
        y,
    }
}

/// Clip an open polyline against `cell`, returning zero or more surviving pieces (Liang-Barsky
/// per segment; consecutive surviving segments are stitched back into one piece).
fn clip_line(line: &[Coord<f64>], cell: &Rect) -> Vec<CoordSeq> {
    let mut pieces: Vec<CoordSeq> = Vec::new();
    let mut current: CoordSeq = Vec::new();

    for window in line.windows(2) {
        let (a, b) = (window[0], window[1]);
        match liang_barsky(a, b, cell) {
            Some((p0, p1)) => {
                if current.last() != Some(&p0) {
                    if !current.is_empty() {
                        pieces.push(std::mem::take(&mut current));
                    }
                    current.push(p0);
                }
                current.push(p1);
            }
            None => {
                if !current.is_empty() {
                    pieces.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn liang_barsky(a: Coord<f64>, b: Coord<f64>, cell: &Rect) -> Option<(Coord<f64>, Coord<f64>)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    let checks = [
        (-dx, a.x - cell.x0),
        (dx, cell.x1 - a.x),
        (-dy, a.y - cell.y0),
        (dy, cell.y1 - a.y),
    ];

    for (p, q) in checks {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            if r > t0 {
                t0 = r;
            }
        } else {
            if r < t0 {
                return None;
            }
            if r < t1 {
                t1 = r;
            }
        }
    }

    if t0 > t1 {
        return None;
    }
    Some((
        Coord {
            x: a.x + t0 * dx,
            y: a.y + t0 * dy,
        },
        Coord {
            x: a.x + t1 * dx,
            y: a.y + t1 * dy,
        },
    ))
}

/// A tile is a polygon "fill" if clipping its outer ring to the unbuffered cell yields exactly
/// the cell's four corners (the whole cell is interior, no outer boundary passes through it) and
/// no interior ring (hole) reaches into the cell either — a tile sitting inside a hole must render
/// empty or clipped, never as the constant fill.
fn is_full_tile_fill(group: &RingGroup, unbuffered_cell: &Rect) -> bool {
    let outer_ring = &group[0];
    let clipped = clip_ring(outer_ring, unbuffered_cell);
    if clipped.len() < 4 || clipped.len() > 5 {
        return false;
    }
    let area = shoelace_area(&clipped).abs();
    let cell_area = (unbuffered_cell.x1 - unbuffered_cell.x0) * (unbuffered_cell.y1 - unbuffered_cell.y0);
    if (area - cell_area).abs() >= 1e-6 {
        return false;
    }
    group[1..].iter().all(|hole| clip_ring(hole, unbuffered_cell).is_empty())
}

fn shoelace_area(pts: &[Coord<f64>]) -> f64 {
    let n = pts.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}
