use glam::Mat4;

use crate::ar::Viewport;

/// Pinhole intrinsic parameters in pixel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub px: f64,
    pub py: f64,
}

/// Back-derives pinhole intrinsics from a perspective projection matrix and
/// the viewport it targets.
///
/// The matrix is read column-major, the layout the AR platform hands over.
/// A malformed matrix produces nonsensical but finite-typed numbers rather
/// than an error; callers validate frame and pose availability before
/// invoking this. Pure and deterministic, safe to call any number of times
/// per frame.
pub fn camera_intrinsics(projection: &Mat4, viewport: &Viewport) -> Intrinsics {
    let p = projection.to_cols_array();
    let w = viewport.width as f64;
    let h = viewport.height as f64;
    Intrinsics {
        fx: w / 2.0 * p[0] as f64,
        fy: h / 2.0 * p[5] as f64,
        px: (1.0 - p[8] as f64) * w / 2.0 + viewport.x as f64,
        py: (1.0 - p[9] as f64) * h / 2.0 + viewport.y as f64,
    }
}
