//! Minimum zoom at which a feature of a given world-space size becomes visible.

use crate::tile::MAX_MAXZOOM;

/// `clamp(ceil(log2(min_px / (world_size * 256))), 0, MAX_MAXZOOM)`.
///
/// `world_size` is the feature's extent in world coordinates (`[0, 1]` space); `min_px` is the
/// smallest size, in pixels, the feature should render at. Monotonic: non-decreasing in `min_px`
/// (a feature that must look bigger needs a higher zoom to do it), non-increasing in `world_size`
/// (a feature that's already bigger in world space reaches that pixel size at a lower zoom).
pub fn min_zoom_for_pixel_size(world_size: f64, min_px: f64) -> u8 {
    if world_size <= 0.0 || min_px <= 0.0 {
        return 0;
    }
    let raw = (min_px / (world_size * 256.0)).log2().ceil();
    raw.clamp(0.0, MAX_MAXZOOM as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_non_decreasing_in_min_px() {
        let world_size = 0.01;
        let z_small = min_zoom_for_pixel_size(world_size, 4.0);
        let z_large = min_zoom_for_pixel_size(world_size, 64.0);
        assert!(z_large >= z_small);
    }

    #[test]
    fn monotonic_non_increasing_in_world_size() {
        let min_px = 8.0;
        let z_small_world = min_zoom_for_pixel_size(0.001, min_px);
        let z_large_world = min_zoom_for_pixel_size(0.1, min_px);
        assert!(z_large_world <= z_small_world);
    }

    #[test]
    fn result_is_clamped_to_valid_zoom_range() {
        assert_eq!(min_zoom_for_pixel_size(1.0, 0.0001), 0);
        assert_eq!(min_zoom_for_pixel_size(1e-12, 1e12), MAX_MAXZOOM);
    }
}
