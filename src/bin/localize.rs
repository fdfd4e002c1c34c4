use clap::Parser;
use glam::Mat4;
use image::ImageReader;

use vps_localization::anchor::{Anchor, Scene};
use vps_localization::ar::{ArFrame, FrameLoop, View, ViewerPose, Viewport};
use vps_localization::capture::StillCapturer;
use vps_localization::client::VpsClient;
use vps_localization::config::VpsConfig;
use vps_localization::session::LocalizationSession;

/// Replay a still camera frame through the localization pipeline.
#[derive(Parser)]
#[command(version, about, author)]
struct VpslCli {
    /// path to the query image (replayed camera frame)
    image: String,

    /// path to the service config json
    #[arg(short, long, default_value = "vps.json")]
    config: String,

    /// vertical field of view of the replayed camera, degrees
    #[arg(long, default_value_t = 60.0)]
    fov_deg: f32,

    /// localization attempts before giving up
    #[arg(long, default_value_t = 1)]
    attempts: usize,
}

/// Frame scheduler that feeds a fixed list of frames, one per tick.
struct ReplayLoop {
    frames: Vec<ArFrame<image::RgbaImage>>,
}

impl FrameLoop for ReplayLoop {
    type Texture = image::RgbaImage;

    fn run<F>(self, mut on_frame: F)
    where
        F: FnMut(Option<&ArFrame<image::RgbaImage>>),
    {
        for frame in &self.frames {
            on_frame(Some(frame));
        }
    }
}

#[derive(Default)]
struct PrintScene {
    anchors: Vec<Anchor>,
}

impl Scene for PrintScene {
    fn insert_anchor(&mut self, anchor: Anchor) {
        println!(
            "anchor at [{:.3} {:.3} {:.3}] rotation [{:.4} {:.4} {:.4} {:.4}]",
            anchor.position.x,
            anchor.position.y,
            anchor.position.z,
            anchor.rotation.x,
            anchor.rotation.y,
            anchor.rotation.z,
            anchor.rotation.w,
        );
        self.anchors.push(anchor);
    }

    fn render(&mut self) {}
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = VpslCli::parse();
    let config = VpsConfig::from_json_file(&cli.config)?;
    let camera_frame = ImageReader::open(&cli.image)?.decode()?.to_rgba8();
    let (width, height) = camera_frame.dimensions();

    let projection = Mat4::perspective_rh(
        cli.fov_deg.to_radians(),
        width as f32 / height as f32,
        0.01,
        100.0,
    );
    let viewport = Viewport { x: 0, y: 0, width, height };

    let client = VpsClient::new(&config)?;
    let mut session = LocalizationSession::new(
        StillCapturer,
        client,
        PrintScene::default(),
        config.map_id.clone(),
    )
    .with_handedness(config.handedness);

    let replay = ReplayLoop {
        frames: (0..cli.attempts)
            .map(|i| ArFrame {
                timestamp_ms: i as f64 * 33.3,
                pose: Some(ViewerPose { views: vec![View { projection, viewport }] }),
                camera_texture: Some(camera_frame.clone()),
            })
            .collect(),
    };
    replay.run(|frame| {
        let outcome = session.tick(frame);
        log::debug!("tick outcome: {outcome:?}");
    });

    if !session.is_localized() {
        println!("no localization after {} attempt(s)", cli.attempts);
    }
    Ok(())
}
