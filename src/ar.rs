use glam::Mat4;

/// Origin and extent of the render target region for one view, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// One eye/view of a frame: its perspective projection and viewport.
///
/// Both are produced fresh per frame by the AR platform; nothing here is
/// cached between frames.
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub projection: Mat4,
    pub viewport: Viewport,
}

/// Viewer pose for one frame.
#[derive(Debug, Clone)]
pub struct ViewerPose {
    pub views: Vec<View>,
}

impl ViewerPose {
    /// The view used for localization. `None` when the platform reported a
    /// pose without view geometry; such frames are skipped.
    pub fn primary_view(&self) -> Option<&View> {
        self.views.first()
    }
}

/// Per-frame data handed over by the AR platform.
///
/// `camera_texture` is the opaque camera-feed handle for this frame. `None`
/// means the platform has not produced a camera image yet, which is a
/// skip-this-frame condition, never an error.
#[derive(Debug, Clone)]
pub struct ArFrame<T> {
    pub timestamp_ms: f64,
    pub pose: Option<ViewerPose>,
    pub camera_texture: Option<T>,
}

/// Scheduler seam: the platform's render loop registers the per-frame
/// callback here and drives it until the session ends.
pub trait FrameLoop {
    type Texture;

    /// Invoke `on_frame` once per rendered frame. `None` is a tick that
    /// arrived without frame data.
    fn run<F>(self, on_frame: F)
    where
        F: FnMut(Option<&ArFrame<Self::Texture>>);
}
