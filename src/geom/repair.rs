//! Polygon repair: the snap-and-fix pipeline that turns a possibly self-intersecting or
//! degenerate polygon into one this crate's renderer can safely encode.
//!
//! The pipeline tries progressively more aggressive repairs, in order: a cheap structural fix, a
//! precision-reduced retry, an aggressive-fixer retry, and a buffer-then-unbuffer retry. If none
//! produce a valid result the caller gets [`crate::Error::GeometryRobustness`] tagged
//! `snap_third_time_failed`, mirroring the upstream behavior this crate's renderer relies on to
//! decide a feature is unsalvageable rather than retry forever.

use geo_types::{Coord, LineString, Polygon};

use crate::error::{Error, Result};
use crate::geom::precision::reduce_polygon_precision;
use crate::stats::Stats;

/// A ring is valid if it has at least 3 distinct vertices, encloses non-zero area, and does not
/// self-intersect.
///
/// The self-intersection check is a direct O(n^2) scan over non-adjacent segment pairs. This is a
/// deliberate scope decision rather than an attempt at a general-purpose robust-geometry
/// validator: it is exactly the check this pipeline needs to decide whether a repair attempt
/// succeeded, not a substitute for a full DE-9IM validity test.
pub fn is_ring_valid(ring: &LineString<f64>) -> bool {
    let pts = closed_distinct_points(ring);
    if pts.len() < 3 {
        return false;
    }
    if signed_area(&pts) == 0.0 {
        return false;
    }
    !has_self_intersection(&pts)
}

/// Cheap structural repair: dedupe consecutive/closing points, drop degenerate rings, and fix
/// ring orientation. Does not attempt to resolve self-intersections; that's what the later
/// pipeline stages are for.
pub fn fix_polygon(poly: &Polygon<f64>) -> Polygon<f64> {
    let exterior = orient(&dedupe_ring(poly.exterior()), true);
    let interiors: Vec<LineString<f64>> = poly
        .interiors()
        .iter()
        .map(|r| dedupe_ring(r))
        .filter(|r| closed_distinct_points(r).len() >= 3)
        .map(|r| orient(&r, false))
        .collect();
    Polygon::new(exterior, interiors)
}

/// The more powerful fixer step 3 of the pipeline reaches for: welds vertices that sit within
/// `weld_eps` of a neighbor (not just exact duplicates, as [`fix_polygon`]'s dedupe does) and then
/// drops any ring that degenerates below 3 distinct vertices or collapses to near-zero area as a
/// result. Welding absorbs the near-coincident, almost-self-touching vertex clusters a precision
/// reduction alone tends to leave behind, which is exactly what makes this qualitatively stronger
/// than re-running [`fix_polygon`] on more-reduced coordinates.
pub fn fix_polygon_aggressive(poly: &Polygon<f64>, weld_eps: f64) -> Polygon<f64> {
    let exterior = orient(&weld_ring(poly.exterior(), weld_eps), true);
    let interiors: Vec<LineString<f64>> = poly
        .interiors()
        .iter()
        .map(|r| weld_ring(r, weld_eps))
        .filter(|r| closed_distinct_points(r).len() >= 3 && signed_area(&closed_distinct_points(r)) != 0.0)
        .map(|r| orient(&r, false))
        .collect();
    Polygon::new(exterior, interiors)
}

/// Like [`fix_polygon`] but perturbed by an approximate buffer of `distance` (positive to expand,
/// negative to contract) before re-closing and re-orienting.
///
/// This nudges each ring's vertices radially from its own centroid by `distance` rather than
/// computing a true Minkowski-sum offset; the goal is only to separate near-coincident edges
/// enough that a subsequent validity check passes, matching the role this step plays in the
/// upstream pipeline's third repair attempt.
pub fn fix_polygon_buffered(poly: &Polygon<f64>, distance: f64) -> Polygon<f64> {
    let exterior = orient(&radial_offset(&dedupe_ring(poly.exterior()), distance), true);
    let interiors: Vec<LineString<f64>> = poly
        .interiors()
        .iter()
        .map(|r| radial_offset(&dedupe_ring(r), -distance))
        .filter(|r| closed_distinct_points(r).len() >= 3)
        .map(|r| orient(&r, false))
        .collect();
    Polygon::new(exterior, interiors)
}

/// Run the full snap-and-fix pipeline, recording a [`Stats::data_error`] call for every failed
/// attempt along the way via `stage`. Returns the repaired polygon or a
/// [`Error::GeometryRobustness`] tagged `snap_third_time_failed`.
pub fn snap_and_fix_polygon(
    poly: &Polygon<f64>,
    precision: f64,
    stats: &dyn Stats,
    stage: &str,
) -> Result<Polygon<f64>> {
    let attempt1 = fix_polygon(poly);
    if polygon_is_valid(&attempt1) {
        return Ok(attempt1);
    }
    stats.data_error(&format!("{stage}_snap_fix_input"));

    let reduced = reduce_polygon_precision(poly, precision);
    let attempt2 = fix_polygon(&reduced);
    if polygon_is_valid(&attempt2) {
        return Ok(attempt2);
    }
    stats.data_error(&format!("{stage}_snap_fix_input2"));

    let attempt3 = fix_polygon_aggressive(&reduced, precision);
    if polygon_is_valid(&attempt3) {
        return Ok(attempt3);
    }
    stats.data_error(&format!("{stage}_snap_fix_input3"));

    let buffered = fix_polygon_buffered(&reduced, precision / 2.0);
    let attempt4 = fix_polygon_buffered(&buffered, -precision / 2.0);
    if polygon_is_valid(&attempt4) {
        return Ok(attempt4);
    }

    stats.data_error(&format!("{stage}_snap_fix_input3_failed"));
    Err(Error::robustness(stage, "snap_third_time_failed"))
}

fn polygon_is_valid(poly: &Polygon<f64>) -> bool {
    is_ring_valid(poly.exterior()) && poly.interiors().iter().all(is_ring_valid)
}

fn dedupe_ring(ring: &LineString<f64>) -> LineString<f64> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        if out.last() != Some(&c) {
            out.push(c);
        }
    }
    LineString(out)
}

/// Collapse any run of consecutive vertices that sit within `eps` of each other down to their
/// first point, rather than [`dedupe_ring`]'s exact-equality check.
fn weld_ring(ring: &LineString<f64>, eps: f64) -> LineString<f64> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        match out.last() {
            Some(&last) if ((c.x - last.x).powi(2) + (c.y - last.y).powi(2)).sqrt() <= eps => {}
            _ => out.push(c),
        }
    }
    LineString(out)
}

fn closed_distinct_points(ring: &LineString<f64>) -> Vec<Coord<f64>> {
    let mut pts = ring.0.clone();
    if pts.len() > 1 && pts.first() == pts.last() {
        pts.pop();
    }
    pts
}

/// Shoelace signed area, positive for a CCW ring (in the ring's own coordinate convention).
fn signed_area(pts: &[Coord<f64>]) -> f64 {
    let n = pts.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum / 2.0
}

/// Outer rings are CCW, inner rings CW, consistent with this crate's tile-coordinate convention
/// (y increases downward, flipping the usual JTS outer-CW/inner-CCW rule).
fn orient(ring: &LineString<f64>, want_ccw: bool) -> LineString<f64> {
    let pts = closed_distinct_points(ring);
    if pts.len() < 3 {
        return close(&pts);
    }
    let is_ccw = signed_area(&pts) > 0.0;
    if is_ccw == want_ccw {
        close(&pts)
    } else {
        let mut reversed = pts;
        reversed.reverse();
        close(&reversed)
    }
}

fn close(pts: &[Coord<f64>]) -> LineString<f64> {
    let mut out = pts.to_vec();
    if let Some(&first) = out.first() {
        out.push(first);
    }
    LineString(out)
}

fn radial_offset(ring: &LineString<f64>, distance: f64) -> LineString<f64> {
    let pts = closed_distinct_points(ring);
    if pts.is_empty() {
        return LineString(Vec::new());
    }
    let cx = pts.iter().map(|c| c.x).sum::<f64>() / pts.len() as f64;
    let cy = pts.iter().map(|c| c.y).sum::<f64>() / pts.len() as f64;
    let offset: Vec<Coord<f64>> = pts
        .iter()
        .map(|c| {
            let dx = c.x - cx;
            let dy = c.y - cy;
            let len = (dx * dx + dy * dy).sqrt();
            if len < f64::EPSILON {
                *c
            } else {
                Coord {
                    x: c.x + dx / len * distance,
                    y: c.y + dy / len * distance,
                }
            }
        })
        .collect();
    close(&offset)
}

/// O(n^2) scan for any pair of non-adjacent segments in the (open, deduped) ring that intersect.
fn has_self_intersection(pts: &[Coord<f64>]) -> bool {
    let n = pts.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let a1 = pts[i];
        let a2 = pts[(i + 1) % n];
        for j in (i + 1)..n {
            // Skip the edge itself and edges that share an endpoint with it.
            if j == i || (j + 1) % n == i || j == (i + 1) % n {
                continue;
            }
            let b1 = pts[j];
            let b2 = pts[(j + 1) % n];
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

fn segments_intersect(p1: Coord<f64>, p2: Coord<f64>, p3: Coord<f64>, p4: Coord<f64>) -> bool {
    let d1 = direction(p3, p4, p1);
    let d2 = direction(p3, p4, p2);
    let d3 = direction(p1, p2, p3);
    let d4 = direction(p1, p2, p4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    if d1 == 0.0 && on_segment(p3, p4, p1) {
        return true;
    }
    if d2 == 0.0 && on_segment(p3, p4, p2) {
        return true;
    }
    if d3 == 0.0 && on_segment(p1, p2, p3) {
        return true;
    }
    if d4 == 0.0 && on_segment(p1, p2, p4) {
        return true;
    }
    false
}

fn direction(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> f64 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

fn on_segment(a: Coord<f64>, b: Coord<f64>, p: Coord<f64>) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}
