//! Robust convexity test for a polygon ring.

use geo_types::Coord;

/// Minimum number of (possibly repeated, wrap-around) edge samples to inspect before deciding.
const MIN_SAMPLES: usize = 10;

/// Cross-product magnitude ratio below which the ring is considered convex despite carrying
/// turns of the "wrong" sign — tolerates floating-point noise and genuinely tiny concavities.
const TOLERANCE: f64 = 1e-3;

/// True if `ring` is convex, within `TOLERANCE`.
///
/// Walks consecutive edge pairs (wrapping around the ring as many times as needed to gather at
/// least [`MIN_SAMPLES`] turns — short rings simply revisit the same few corners, which doesn't
/// change the outcome), accumulating the largest left-turn and the largest right-turn magnitude
/// seen. A ring that only ever turns one way is convex; one with turns of both signs is convex
/// only if the minority sign is negligible relative to the majority, which absorbs a single
/// collinear vertex (cross product exactly zero) or a vestigial floating-point concavity.
///
/// Rings with three or fewer distinct vertices are never convex (there's no interior turn to
/// measure).
pub fn is_convex(ring: &[Coord<f64>]) -> bool {
    let pts = distinct_points(ring);
    if pts.len() <= 3 {
        return false;
    }

    let n = pts.len();
    let mut max_pos: f64 = 0.0;
    let mut max_neg: f64 = 0.0;

    for i in 0..MIN_SAMPLES.max(n) {
        let a = pts[i % n];
        let b = pts[(i + 1) % n];
        let c = pts[(i + 2) % n];
        let v1 = (b.x - a.x, b.y - a.y);
        let v2 = (c.x - b.x, c.y - b.y);
        let cross = v1.0 * v2.1 - v1.1 * v2.0;
        if cross > max_pos {
            max_pos = cross;
        } else if -cross > max_neg {
            max_neg = -cross;
        }
    }

    if max_pos == 0.0 || max_neg == 0.0 {
        return true;
    }

    let (small, large) = if max_pos < max_neg {
        (max_pos, max_neg)
    } else {
        (max_neg, max_pos)
    };
    small / large < TOLERANCE
}

/// Drop consecutive duplicate points and a closing point equal to the first.
fn distinct_points(ring: &[Coord<f64>]) -> Vec<Coord<f64>> {
    let mut out: Vec<Coord<f64>> = Vec::with_capacity(ring.len());
    for &c in ring {
        if out.last().map_or(true, |&last: &Coord<f64>| last != c) {
            out.push(c);
        }
    }
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}
