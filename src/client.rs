use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::CapturedImage;
use crate::config::VpsConfig;
use crate::intrinsics::Intrinsics;

/// Coordinate handedness flag sent with every query. The pipeline always
/// operates right-handed; the wire format is a stringly boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

impl Handedness {
    pub fn as_wire(self) -> &'static str {
        match self {
            Handedness::Right => "true",
            Handedness::Left => "false",
        }
    }
}

/// Everything one localization attempt submits. Constructed once per attempt
/// and sent exactly once; the client adds endpoint and credentials.
#[derive(Debug, Clone)]
pub struct LocalizationRequest {
    pub intrinsics: Intrinsics,
    pub image: CapturedImage,
    pub map_id: String,
    pub handedness: Handedness,
}

/// Absolute pose returned by the service for a matched query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalizationResult {
    pub position: Vec3,
    pub rotation: Quat,
}

/// Outcome of one attempt. Any response shape other than a full pose (an
/// error object, missing fields, a non-2xx status) collapses to `NoMatch`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalizationOutcome {
    Matched(LocalizationResult),
    NoMatch,
}

/// Errors from the transport layer. The loop controller treats these the
/// same as a negative match; they differ only in log level.
#[derive(Debug, Error)]
pub enum VpsError {
    #[error("invalid localization endpoint: {0}")]
    Endpoint(String),
    #[error("localization request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Seam between the loop controller and the remote service.
pub trait Localizer {
    /// Perform exactly one remote localization query.
    fn localize(&mut self, request: LocalizationRequest) -> Result<LocalizationOutcome, VpsError>;
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    position: Option<WireVec3>,
    rotation: Option<WireQuat>,
}

#[derive(Debug, Deserialize)]
struct WireVec3 {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Debug, Deserialize)]
struct WireQuat {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

/// Interprets a response body. The success contract is the presence of both
/// a `position` and a `rotation` object.
pub fn parse_response(body: &str) -> LocalizationOutcome {
    let Ok(body) = serde_json::from_str::<ResponseBody>(body) else {
        return LocalizationOutcome::NoMatch;
    };
    match (body.position, body.rotation) {
        (Some(p), Some(r)) => LocalizationOutcome::Matched(LocalizationResult {
            position: Vec3::new(p.x, p.y, p.z),
            rotation: Quat::from_xyzw(r.x, r.y, r.z, r.w),
        }),
        _ => LocalizationOutcome::NoMatch,
    }
}

fn interpret(status: reqwest::StatusCode, body: &str) -> LocalizationOutcome {
    if !status.is_success() {
        log::debug!("localization endpoint returned {status}");
        return LocalizationOutcome::NoMatch;
    }
    parse_response(body)
}

/// HTTPS multipart client against the remote VPS endpoint.
///
/// One outbound call per `localize` invocation; no retries and no state.
/// A failed attempt is dropped and the next frame tries again from scratch.
pub struct VpsClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl VpsClient {
    pub fn new(config: &VpsConfig) -> Result<Self, VpsError> {
        if !config.endpoint.starts_with("http") {
            return Err(VpsError::Endpoint(config.endpoint.clone()));
        }
        let http = reqwest::blocking::Client::builder().build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

impl Localizer for VpsClient {
    fn localize(&mut self, request: LocalizationRequest) -> Result<LocalizationOutcome, VpsError> {
        let width = request.image.width;
        let height = request.image.height;
        let query_image = reqwest::blocking::multipart::Part::bytes(request.image.jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")?;
        let form = reqwest::blocking::multipart::Form::new()
            .text("fx", request.intrinsics.fx.to_string())
            .text("fy", request.intrinsics.fy.to_string())
            .text("px", request.intrinsics.px.to_string())
            .text("py", request.intrinsics.py.to_string())
            .text("width", width.to_string())
            .text("height", height.to_string())
            .part("queryImage", query_image)
            .text("mapId", request.map_id)
            .text("isRightHanded", request.handedness.as_wire())
            .text("client_id", self.client_id.clone())
            .text("client_secret", self.client_secret.clone());

        let response = self.http.post(&self.endpoint).multipart(form).send()?;
        let status = response.status();
        let body = response.text()?;
        Ok(interpret(status, &body))
    }
}
