//! Per-frame localization loop controller.

use log::{debug, info, warn};

use crate::anchor::{Anchor, Scene};
use crate::ar::ArFrame;
use crate::capture::FrameCapturer;
use crate::client::{Handedness, LocalizationOutcome, LocalizationRequest, Localizer};
use crate::intrinsics::camera_intrinsics;

/// Localization state machine.
///
/// `Unlocalized` is the initial phase, `Localized` the terminal one.
/// `Pending` is held while a request is outstanding, so at most one query is
/// in flight no matter how the scheduler interleaves ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalizationPhase {
    /// No successful localization yet; attempts continue.
    #[default]
    Unlocalized,
    /// A request is outstanding; no new attempt may start.
    Pending,
    /// The anchor is placed. Irreversible; every further tick only renders.
    Localized,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Rendered only: terminal phase, outstanding request, or unusable frame.
    Rendered,
    /// An attempt ran and did not localize; the next frame retries.
    AttemptFailed,
    /// The anchor was placed on this tick.
    Localized,
}

/// Session-scoped loop controller.
///
/// Owns the latch and the collaborator seams for the lifetime of one AR
/// session; created at session start, discarded at session end. There is no
/// shared or global state anywhere in the pipeline.
pub struct LocalizationSession<C: FrameCapturer, L: Localizer, S: Scene> {
    pub capturer: C,
    pub localizer: L,
    pub scene: S,
    map_id: String,
    handedness: Handedness,
    phase: LocalizationPhase,
}

impl<C: FrameCapturer, L: Localizer, S: Scene> LocalizationSession<C, L, S> {
    pub fn new(capturer: C, localizer: L, scene: S, map_id: impl Into<String>) -> Self {
        Self {
            capturer,
            localizer,
            scene,
            map_id: map_id.into(),
            handedness: Handedness::Right,
            phase: LocalizationPhase::default(),
        }
    }

    pub fn with_handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    pub fn phase(&self) -> LocalizationPhase {
        self.phase
    }

    pub fn is_localized(&self) -> bool {
        self.phase == LocalizationPhase::Localized
    }

    /// Drives one rendered frame through the state machine.
    ///
    /// Every path renders exactly once, whether or not an attempt ran. Once
    /// localized, ticks degrade to render-only passthrough permanently.
    pub fn tick(&mut self, frame: Option<&ArFrame<C::Texture>>) -> TickOutcome {
        if self.phase != LocalizationPhase::Unlocalized {
            self.scene.render();
            return TickOutcome::Rendered;
        }
        let Some(frame) = frame else {
            self.scene.render();
            return TickOutcome::Rendered;
        };
        let Some(view) = frame.pose.as_ref().and_then(|pose| pose.primary_view()) else {
            self.scene.render();
            return TickOutcome::Rendered;
        };
        let viewport = view.viewport;
        let intrinsics = camera_intrinsics(&view.projection, &viewport);
        let Some(texture) = frame.camera_texture.as_ref() else {
            warn!("camera texture not available");
            self.scene.render();
            return TickOutcome::Rendered;
        };

        self.phase = LocalizationPhase::Pending;
        let image = match self.capturer.capture(texture, viewport.width, viewport.height) {
            Ok(image) => image,
            Err(err) => {
                warn!("frame capture failed: {err}");
                self.phase = LocalizationPhase::Unlocalized;
                self.scene.render();
                return TickOutcome::AttemptFailed;
            }
        };
        let request = LocalizationRequest {
            intrinsics,
            image,
            map_id: self.map_id.clone(),
            handedness: self.handedness,
        };
        match self.localizer.localize(request) {
            Ok(LocalizationOutcome::Matched(result)) => {
                self.scene
                    .insert_anchor(Anchor::marker(result.position, result.rotation));
                self.phase = LocalizationPhase::Localized;
                info!("localization applied at {}", result.position);
                self.scene.render();
                TickOutcome::Localized
            }
            Ok(LocalizationOutcome::NoMatch) => {
                debug!("no match for map {}", self.map_id);
                self.phase = LocalizationPhase::Unlocalized;
                self.scene.render();
                TickOutcome::AttemptFailed
            }
            Err(err) => {
                warn!("localization attempt failed: {err}");
                self.phase = LocalizationPhase::Unlocalized;
                self.scene.render();
                TickOutcome::AttemptFailed
            }
        }
    }
}
