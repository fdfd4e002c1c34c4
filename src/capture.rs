use image::codecs::jpeg::JpegEncoder;
use thiserror::Error;

/// JPEG quality used for query images.
const JPEG_QUALITY: u8 = 90;

/// An encoded still of the camera feed for one localization attempt.
///
/// Created transiently per attempt and dropped once the request resolves.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Errors from resolving a camera frame into an encoded still.
///
/// All of these are recoverable: the caller skips the frame and retries on
/// the next one.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Camera feed is smaller than the requested capture region.
    #[error("camera feed {got_w}x{got_h} smaller than requested {width}x{height}")]
    SourceTooSmall { got_w: u32, got_h: u32, width: u32, height: u32 },
    /// Camera texture format cannot be read back as RGBA.
    #[error("unsupported camera texture format {0}")]
    UnsupportedFormat(String),
    /// Pixel buffer does not match the requested dimensions.
    #[error("pixel buffer does not match {width}x{height} rgba frame")]
    BadPixelBuffer { width: u32, height: u32 },
    /// GPU readback could not be completed.
    #[error("gpu readback failed: {0}")]
    Readback(String),
    #[error("jpeg encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Seam between the loop controller and the graphics backend.
pub trait FrameCapturer {
    /// Opaque camera-feed handle for the current frame.
    type Texture;

    /// Resolve the current camera frame into an encoded still of the given
    /// size (the viewport size of the view being localized).
    fn capture(
        &mut self,
        texture: &Self::Texture,
        width: u32,
        height: u32,
    ) -> Result<CapturedImage, CaptureError>;
}

/// Encodes tightly packed RGBA pixels as JPEG, dropping the alpha channel.
pub fn encode_rgba_jpeg(rgba: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let frame = image::RgbaImage::from_raw(width, height, rgba.to_vec())
        .ok_or(CaptureError::BadPixelBuffer { width, height })?;
    let rgb = image::DynamicImage::ImageRgba8(frame).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode(
        rgb.as_raw(),
        width,
        height,
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

/// CPU capturer for replayed sessions and tests: the "camera feed" is an
/// in-memory RGBA frame.
#[derive(Debug, Default)]
pub struct StillCapturer;

impl FrameCapturer for StillCapturer {
    type Texture = image::RgbaImage;

    fn capture(
        &mut self,
        texture: &Self::Texture,
        width: u32,
        height: u32,
    ) -> Result<CapturedImage, CaptureError> {
        if texture.width() < width || texture.height() < height {
            return Err(CaptureError::SourceTooSmall {
                got_w: texture.width(),
                got_h: texture.height(),
                width,
                height,
            });
        }
        let region = image::imageops::crop_imm(texture, 0, 0, width, height).to_image();
        let jpeg = encode_rgba_jpeg(region.as_raw(), width, height)?;
        Ok(CapturedImage { jpeg, width, height })
    }
}

/// GPU capturer: copies the camera-feed texture into a same-sized off-screen
/// target, reads the target back as RGBA and encodes it.
///
/// Every staging resource (target texture, readback buffer) is owned by the
/// capture call and released on all exit paths, including failures; the
/// session may run hundreds of frames before the first successful
/// localization.
pub struct TextureCapturer {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl TextureCapturer {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }
}

impl FrameCapturer for TextureCapturer {
    type Texture = wgpu::Texture;

    fn capture(
        &mut self,
        camera: &wgpu::Texture,
        width: u32,
        height: u32,
    ) -> Result<CapturedImage, CaptureError> {
        match camera.format() {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {}
            other => return Err(CaptureError::UnsupportedFormat(format!("{other:?}"))),
        }
        if camera.width() < width || camera.height() < height {
            return Err(CaptureError::SourceTooSmall {
                got_w: camera.width(),
                got_h: camera.height(),
                width,
                height,
            });
        }

        let extent = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let target = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("vps-capture-target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: camera.format(),
            usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        // copy_texture_to_buffer requires bytes_per_row to be 256-aligned;
        // the padding is stripped after mapping.
        let unpadded_bytes_per_row = width * 4;
        let bytes_per_row = align_to(unpadded_bytes_per_row, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("vps-capture-readback"),
            size: bytes_per_row as u64 * height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("vps-capture") });
        encoder.copy_texture_to_texture(camera.as_image_copy(), target.as_image_copy(), extent);
        encoder.copy_texture_to_buffer(
            target.as_image_copy(),
            wgpu::ImageCopyBuffer {
                buffer: &readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            extent,
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| CaptureError::Readback("map callback dropped".into()))?
            .map_err(|e| CaptureError::Readback(e.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut rgba = vec![0u8; (unpadded_bytes_per_row * height) as usize];
        for y in 0..height as usize {
            let src = y * bytes_per_row as usize;
            let dst = y * unpadded_bytes_per_row as usize;
            rgba[dst..dst + unpadded_bytes_per_row as usize]
                .copy_from_slice(&mapped[src..src + unpadded_bytes_per_row as usize]);
        }
        drop(mapped);
        readback.unmap();

        let jpeg = encode_rgba_jpeg(&rgba, width, height)?;
        Ok(CapturedImage { jpeg, width, height })
    }
}

/// Rounds `value` up to the next multiple of `alignment`.
pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}
