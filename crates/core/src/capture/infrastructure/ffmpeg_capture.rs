use std::path::PathBuf;

use thiserror::Error;

use crate::capture::domain::capture_source::CaptureSource;
use crate::shared::frame::{Frame, PixelFormat};

/// libavdevice input used for numbered cameras on this platform.
#[cfg(target_os = "macos")]
pub const CAMERA_INPUT_FORMAT: &str = "avfoundation";
#[cfg(target_os = "windows")]
pub const CAMERA_INPUT_FORMAT: &str = "dshow";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const CAMERA_INPUT_FORMAT: &str = "v4l2";

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to initialise ffmpeg: {0}")]
    Init(#[source] ffmpeg_next::Error),
    #[error("input format '{0}' is not available in this ffmpeg build")]
    InputFormatUnavailable(&'static str),
    #[error("camera {0} cannot be opened by index on this platform; pass a device name")]
    DeviceNameRequired(u32),
    #[error("failed to open {name}: {source}")]
    Open {
        name: String,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("{0} has no video stream")]
    NoVideoStream(String),
    #[error("failed to set up decoding for {name}: {source}")]
    Decoder {
        name: String,
        #[source]
        source: ffmpeg_next::Error,
    },
}

/// Where frames come from.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureTarget {
    /// Numbered camera, mapped to the platform device name.
    Camera(u32),
    /// Platform device string, e.g. `/dev/video2` or `video=Integrated Camera`.
    Device(String),
    /// Video or image file. Reading past its last frame is a capture failure.
    File(PathBuf),
}

impl CaptureTarget {
    fn describe(&self) -> String {
        match self {
            CaptureTarget::Camera(index) => format!("camera {index}"),
            CaptureTarget::Device(name) => name.clone(),
            CaptureTarget::File(path) => path.display().to_string(),
        }
    }
}

/// Device hints passed to the demuxer. Devices ignore what they cannot honor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaptureOptions {
    pub size: Option<(u32, u32)>,
    pub fps: Option<u32>,
}

/// Captures frames through ffmpeg-next (libavdevice + libavcodec).
///
/// Every decoded frame is converted to BGR24 so downstream stages see the
/// same byte order regardless of the camera's native pixel format.
pub struct FfmpegCapture {
    name: String,
    session: Option<CaptureSession>,
}

struct CaptureSession {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    converter: BgrConverter,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
}

/// Pixel format and size of decoded frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SourceGeometry {
    format: ffmpeg_next::format::Pixel,
    width: u32,
    height: u32,
}

impl SourceGeometry {
    fn of(frame: &ffmpeg_next::util::frame::video::Video) -> Self {
        Self {
            format: frame.format(),
            width: frame.width(),
            height: frame.height(),
        }
    }
}

/// Converts decoded frames to packed BGR24.
///
/// Devices may switch resolution or pixel format mid-stream; the scaler is
/// rebuilt whenever a frame arrives with a different geometry.
struct BgrConverter {
    scaler: ffmpeg_next::software::scaling::Context,
    source: SourceGeometry,
}

impl BgrConverter {
    fn new(source: SourceGeometry) -> Result<Self, ffmpeg_next::Error> {
        let scaler = ffmpeg_next::software::scaling::Context::get(
            source.format,
            source.width,
            source.height,
            ffmpeg_next::format::Pixel::BGR24,
            source.width,
            source.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;
        Ok(Self { scaler, source })
    }

    fn width(&self) -> u32 {
        self.source.width
    }

    fn height(&self) -> u32 {
        self.source.height
    }

    /// Packed BGR bytes of `decoded`, `width * height * 3` long.
    fn convert(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
    ) -> Result<Vec<u8>, ffmpeg_next::Error> {
        let geometry = SourceGeometry::of(decoded);
        if geometry != self.source {
            log::info!(
                "Stream changed from {}x{} {:?} to {}x{} {:?}, rebuilding scaler",
                self.source.width,
                self.source.height,
                self.source.format,
                geometry.width,
                geometry.height,
                geometry.format
            );
            *self = Self::new(geometry)?;
        }

        let mut bgr_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(decoded, &mut bgr_frame)?;
        Ok(extract_packed_pixels(
            &bgr_frame,
            self.source.width,
            self.source.height,
        ))
    }
}

impl FfmpegCapture {
    pub fn open(target: &CaptureTarget, options: &CaptureOptions) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(CaptureError::Init)?;

        let name = target.describe();
        let ictx = match target {
            CaptureTarget::File(path) => {
                ffmpeg_next::format::input(path).map_err(|source| CaptureError::Open {
                    name: name.clone(),
                    source,
                })?
            }
            CaptureTarget::Camera(index) => open_device(&camera_device(*index)?, options)?,
            CaptureTarget::Device(device) => open_device(device, options)?,
        };

        let session = CaptureSession::new(ictx, &name)?;
        log::info!(
            "Opened {name} ({}x{})",
            session.converter.width(),
            session.converter.height()
        );

        Ok(Self {
            name,
            session: Some(session),
        })
    }
}

impl CaptureSource for FfmpegCapture {
    fn read_frame(&mut self) -> Option<Frame> {
        let session = self.session.as_mut()?;
        match session.next_frame() {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => {
                log::info!("{}: end of stream", self.name);
                None
            }
            Err(e) => {
                log::warn!("{}: capture failed: {e}", self.name);
                None
            }
        }
    }

    fn release(&mut self) {
        if self.session.take().is_some() {
            log::debug!("Released {}", self.name);
        }
    }
}

impl CaptureSession {
    fn new(ictx: ffmpeg_next::format::context::Input, name: &str) -> Result<Self, CaptureError> {
        let decoder_error = |source| CaptureError::Decoder {
            name: name.to_string(),
            source,
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::NoVideoStream(name.to_string()))?;
        let video_stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(decoder_error)?;
        let decoder = codec_ctx.decoder().video().map_err(decoder_error)?;

        let converter = BgrConverter::new(SourceGeometry {
            format: decoder.format(),
            width: decoder.width(),
            height: decoder.height(),
        })
        .map_err(decoder_error)?;

        Ok(Self {
            ictx,
            decoder,
            converter,
            video_stream_index,
            frame_index: 0,
            flushing: false,
        })
    }

    /// Demuxes and decodes until one frame is available. `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>, ffmpeg_next::Error> {
        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }
        if self.flushing {
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                self.decoder.send_eof()?;
                self.flushing = true;
                return self.try_receive();
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            // Live devices occasionally deliver a corrupt packet; skip it.
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Dropped packet: {e}");
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, ffmpeg_next::Error> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let pixels = self.converter.convert(&decoded)?;
        let frame = Frame::new(
            pixels,
            self.converter.width(),
            self.converter.height(),
            PixelFormat::Bgr,
            self.frame_index,
        );
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

fn open_device(
    device: &str,
    options: &CaptureOptions,
) -> Result<ffmpeg_next::format::context::Input, CaptureError> {
    ffmpeg_next::device::register_all();

    let format = ffmpeg_next::device::input::video()
        .find(|f| f.name() == CAMERA_INPUT_FORMAT)
        .ok_or(CaptureError::InputFormatUnavailable(CAMERA_INPUT_FORMAT))?;

    let ctx = ffmpeg_next::format::open_with(
        &device.to_string(),
        &ffmpeg_next::Format::Input(format),
        device_options(options),
    )
    .map_err(|source| CaptureError::Open {
        name: device.to_string(),
        source,
    })?;

    Ok(ctx.input())
}

fn device_options(options: &CaptureOptions) -> ffmpeg_next::Dictionary<'static> {
    let mut dict = ffmpeg_next::Dictionary::new();
    if let Some((w, h)) = options.size {
        dict.set("video_size", &format!("{w}x{h}"));
    }
    if let Some(fps) = options.fps {
        dict.set("framerate", &fps.to_string());
    }
    dict
}

/// Platform device name for a numbered camera.
#[cfg(target_os = "macos")]
pub fn camera_device(index: u32) -> Result<String, CaptureError> {
    Ok(index.to_string())
}

/// Platform device name for a numbered camera.
#[cfg(target_os = "windows")]
pub fn camera_device(index: u32) -> Result<String, CaptureError> {
    Err(CaptureError::DeviceNameRequired(index))
}

/// Platform device name for a numbered camera.
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn camera_device(index: u32) -> Result<String, CaptureError> {
    Ok(format!("/dev/video{index}"))
}

/// Copies a packed 3-byte-per-pixel ffmpeg frame into a contiguous buffer,
/// dropping the row padding ffmpeg may add (stride > width * 3).
fn extract_packed_pixels(
    frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = frame.stride(0);
    let data = frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
