//! Viewport bookkeeping. A viewport is one host view onto the canvas - its
//! footprint decides which dirty tiles are worth re-rendering and at which
//! resolution tier.

use crate::chunk::{ChunkResolution, CHUNK_SIZE};
use crate::math::{IVec2, IntRect};

pub type ViewportId = crate::Unique<Viewport>;

/// One view onto the document, described in canvas space. The view may be
/// rotated; tile visibility uses its axis-aligned bounding box, which
/// over-approximates but never misses.
#[derive(Copy, Clone, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Canvas-space point at the middle of the view.
    pub center: (f64, f64),
    /// View rotation in radians.
    pub angle_rad: f64,
    /// On-screen extent, device pixels.
    pub real_size: (f64, f64),
    /// Canvas extent covered by the view (grows as the user zooms out).
    pub logical_size: (f64, f64),
}
impl Viewport {
    /// The coarsest tier that still gives this viewport one stored pixel per
    /// screen pixel. A degenerate viewport reads at full resolution.
    #[must_use]
    pub fn preferred_resolution(&self) -> ChunkResolution {
        let (logical_w, logical_h) = self.logical_size;
        if logical_w <= 0.0 || logical_h <= 0.0 {
            return ChunkResolution::Full;
        }
        let scale = (self.real_size.0 / logical_w).min(self.real_size.1 / logical_h);
        ChunkResolution::for_scale(scale)
    }
    /// The chunk-coordinate rect covering everything this viewport can see.
    #[must_use]
    pub fn visible_chunks(&self) -> IntRect {
        let (w, h) = self.logical_size;
        if w <= 0.0 || h <= 0.0 {
            return IntRect::default();
        }
        let (sin, cos) = self.angle_rad.sin_cos();
        let half_w = (w * cos.abs() + h * sin.abs()) / 2.0;
        let half_h = (w * sin.abs() + h * cos.abs()) / 2.0;
        let min = IVec2::new(
            (self.center.0 - half_w).floor() as i32,
            (self.center.1 - half_h).floor() as i32,
        );
        let max = IVec2::new(
            (self.center.0 + half_w).ceil() as i32,
            (self.center.1 + half_h).ceil() as i32,
        );
        IntRect::from_corners(min, max).tiles_covering(CHUNK_SIZE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution_follows_zoom() {
        let mut viewport = Viewport {
            center: (128.0, 128.0),
            angle_rad: 0.0,
            real_size: (512.0, 512.0),
            logical_size: (512.0, 512.0),
        };
        assert_eq!(viewport.preferred_resolution(), ChunkResolution::Full);
        // Zoomed way out: an eighth is plenty.
        viewport.logical_size = (8192.0, 8192.0);
        assert_eq!(viewport.preferred_resolution(), ChunkResolution::Eighth);
    }
    #[test]
    fn visible_chunks_cover_view() {
        let viewport = Viewport {
            center: (128.0, 128.0),
            angle_rad: 0.0,
            real_size: (256.0, 256.0),
            logical_size: (256.0, 256.0),
        };
        // A 256x256 view centered on (128, 128) sits exactly on tile (0, 0).
        assert_eq!(
            viewport.visible_chunks(),
            IntRect::from_origin_size(IVec2::ZERO, IVec2::new(1, 1))
        );
    }
    #[test]
    fn rotation_grows_the_bounding_box() {
        let straight = Viewport {
            center: (256.0, 256.0),
            angle_rad: 0.0,
            real_size: (512.0, 512.0),
            logical_size: (512.0, 128.0),
        };
        let rotated = Viewport {
            angle_rad: std::f64::consts::FRAC_PI_4,
            ..straight
        };
        let straight_rect = straight.visible_chunks();
        let rotated_rect = rotated.visible_chunks();
        assert!(rotated_rect.h >= straight_rect.h);
        // The AABB of the rotated view contains the view, so it never shrinks
        // below the short side.
        assert!(rotated_rect.w >= 1 && rotated_rect.h >= 1);
    }
}
