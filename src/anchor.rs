use glam::{Quat, Vec3};

/// Edge length of the confirmation marker cube, in scene units.
const MARKER_EXTENT: f32 = 0.2;

/// Marker color, RGBA.
const MARKER_COLOR: [u8; 4] = [0, 255, 0, 255];

const CUBE_INDICES: [u16; 36] = [
    0, 2, 3, 0, 3, 1, // -z
    4, 5, 7, 4, 7, 6, // +z
    0, 1, 5, 0, 5, 4, // -y
    2, 6, 7, 2, 7, 3, // +y
    0, 4, 6, 0, 6, 2, // -x
    1, 3, 7, 1, 7, 5, // +x
];

/// Axis-aligned cube geometry in local space, posed by the anchor transform.
///
/// Corner `i` sits at the octant selected by bits 0..2 of `i` (x, y, z).
#[derive(Debug, Clone, PartialEq)]
pub struct CubeMesh {
    pub vertices: [Vec3; 8],
    pub indices: [u16; 36],
    pub color: [u8; 4],
}

impl CubeMesh {
    fn with_extent(extent: f32) -> Self {
        let half = extent / 2.0;
        let mut vertices = [Vec3::ZERO; 8];
        for (i, v) in vertices.iter_mut().enumerate() {
            *v = Vec3::new(
                if i & 1 == 0 { -half } else { half },
                if i & 2 == 0 { -half } else { half },
                if i & 4 == 0 { -half } else { half },
            );
        }
        Self { vertices, indices: CUBE_INDICES, color: MARKER_COLOR }
    }
}

/// A renderable marker fixed at a localization pose.
///
/// Owned by the scene for the rest of the session; never moved or removed
/// by this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub position: Vec3,
    pub rotation: Quat,
    pub mesh: CubeMesh,
}

impl Anchor {
    /// Builds the confirmation marker at the localized pose. The rotation is
    /// applied as-is; no coordinate-system conversion happens here.
    pub fn marker(position: Vec3, rotation: Quat) -> Self {
        Anchor { position, rotation, mesh: CubeMesh::with_extent(MARKER_EXTENT) }
    }
}

/// Scene rendering boundary. The loop controller inserts at most one anchor
/// over the session lifetime and requests a render every tick.
pub trait Scene {
    fn insert_anchor(&mut self, anchor: Anchor);
    fn render(&mut self);
}
