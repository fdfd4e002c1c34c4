//! End-to-end state machine tests through the public API, with a real JPEG
//! capture path and a scripted remote service.

use glam::{Mat4, Quat, Vec3};
use vps_localization::anchor::{Anchor, Scene};
use vps_localization::ar::{ArFrame, View, ViewerPose, Viewport};
use vps_localization::capture::StillCapturer;
use vps_localization::client::{
    LocalizationOutcome, LocalizationRequest, Localizer, VpsError, parse_response,
};
use vps_localization::session::{LocalizationPhase, LocalizationSession, TickOutcome};

/// Serves canned response bodies the way the wire client would interpret
/// them, recording every request it sees.
#[derive(Default)]
struct CannedService {
    bodies: Vec<&'static str>,
    requests: Vec<LocalizationRequest>,
}

impl Localizer for CannedService {
    fn localize(&mut self, request: LocalizationRequest) -> Result<LocalizationOutcome, VpsError> {
        self.requests.push(request);
        if self.bodies.is_empty() {
            return Ok(LocalizationOutcome::NoMatch);
        }
        Ok(parse_response(self.bodies.remove(0)))
    }
}

#[derive(Default)]
struct CountingScene {
    anchors: Vec<Anchor>,
    renders: usize,
}

impl Scene for CountingScene {
    fn insert_anchor(&mut self, anchor: Anchor) {
        self.anchors.push(anchor);
    }

    fn render(&mut self) {
        self.renders += 1;
    }
}

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;

fn camera_frame() -> ArFrame<image::RgbaImage> {
    let view = View {
        projection: Mat4::perspective_rh(1.2, WIDTH as f32 / HEIGHT as f32, 0.1, 100.0),
        viewport: Viewport { x: 0, y: 0, width: WIDTH, height: HEIGHT },
    };
    ArFrame {
        timestamp_ms: 0.0,
        pose: Some(ViewerPose { views: vec![view] }),
        camera_texture: Some(image::RgbaImage::from_pixel(
            WIDTH,
            HEIGHT,
            image::Rgba([40, 120, 200, 255]),
        )),
    }
}

fn session(
    bodies: Vec<&'static str>,
) -> LocalizationSession<StillCapturer, CannedService, CountingScene> {
    LocalizationSession::new(
        StillCapturer,
        CannedService { bodies, ..Default::default() },
        CountingScene::default(),
        "MAP_CC3MMTRYKP67",
    )
}

const MATCHED: &str =
    r#"{"position":{"x":1.0,"y":2.0,"z":3.0},"rotation":{"x":0.0,"y":0.0,"z":0.0,"w":1.0}}"#;

#[test]
fn successful_response_anchors_and_latches() {
    let mut s = session(vec![MATCHED]);
    let frame = camera_frame();
    assert_eq!(s.tick(Some(&frame)), TickOutcome::Localized);
    assert_eq!(s.phase(), LocalizationPhase::Localized);
    assert_eq!(s.scene.anchors.len(), 1);
    assert_eq!(s.scene.anchors[0].position, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(s.scene.anchors[0].rotation, Quat::IDENTITY);
    assert_eq!(s.scene.renders, 1);

    // the query carried a real JPEG at viewport size
    let sent = &s.localizer.requests[0];
    assert_eq!((sent.image.width, sent.image.height), (WIDTH, HEIGHT));
    assert_eq!(&sent.image.jpeg[..2], &[0xff, 0xd8]);
    assert!(sent.intrinsics.fx > 0.0);
}

#[test]
fn latch_survives_a_hundred_more_ticks() {
    let mut s = session(vec![MATCHED]);
    let frame = camera_frame();
    assert_eq!(s.tick(Some(&frame)), TickOutcome::Localized);
    for _ in 0..100 {
        assert_eq!(s.tick(Some(&frame)), TickOutcome::Rendered);
    }
    assert_eq!(s.localizer.requests.len(), 1);
    assert_eq!(s.scene.anchors.len(), 1);
    assert_eq!(s.scene.renders, 101);
    assert!(s.is_localized());
}

#[test]
fn malformed_responses_never_latch_or_anchor() {
    let mut s = session(vec![
        r#"{"error":"no match"}"#,
        r#"{"position":{"x":1.0,"y":2.0,"z":3.0}}"#,
        r#"{"rotation":{"x":0.0,"y":0.0,"z":0.0,"w":1.0}}"#,
        "502 bad gateway",
    ]);
    let frame = camera_frame();
    for _ in 0..4 {
        assert_eq!(s.tick(Some(&frame)), TickOutcome::AttemptFailed);
        assert_eq!(s.phase(), LocalizationPhase::Unlocalized);
    }
    assert!(s.scene.anchors.is_empty());
    assert_eq!(s.localizer.requests.len(), 4);
    // every tick rendered regardless
    assert_eq!(s.scene.renders, 4);
}

#[test]
fn attempts_resume_after_failures_until_success() {
    let mut s = session(vec![r#"{"error":"no match"}"#, MATCHED]);
    let frame = camera_frame();
    assert_eq!(s.tick(Some(&frame)), TickOutcome::AttemptFailed);
    assert_eq!(s.tick(Some(&frame)), TickOutcome::Localized);
    assert_eq!(s.scene.anchors.len(), 1);
    // fresh capture per attempt, nothing cached between frames
    assert_eq!(s.localizer.requests.len(), 2);
    assert_ne!(
        s.localizer.requests[0].image.jpeg.as_ptr(),
        s.localizer.requests[1].image.jpeg.as_ptr()
    );
}

#[test]
fn ticks_without_frame_data_only_render() {
    let mut s = session(vec![MATCHED]);
    for _ in 0..5 {
        assert_eq!(s.tick(None), TickOutcome::Rendered);
    }
    let no_texture = ArFrame { camera_texture: None, ..camera_frame() };
    assert_eq!(s.tick(Some(&no_texture)), TickOutcome::Rendered);
    assert!(s.localizer.requests.is_empty());
    assert_eq!(s.scene.renders, 6);
    assert_eq!(s.phase(), LocalizationPhase::Unlocalized);
}
