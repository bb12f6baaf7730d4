// Video LibAV adapter - Seekable frame source backed by libav

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ffmpeg_next::{
    codec::context::Context as CodecContext,
    decoder,
    format::{context::Input, Pixel},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, RgbImage};
use tracing::{debug, trace};

use crate::adapters::toml_config::RasterConfig;
use crate::domain::errors::DomainError;
use crate::error::{CinemetricsError, CinemetricsResult};
use crate::ports::VideoSourcePort;

/// How captured frames are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSettings {
    pub jpeg_quality: u8,
    /// 0 keeps the intrinsic width
    pub max_width: u32,
}

impl Default for RasterSettings {
    fn default() -> Self {
        RasterSettings::from(&RasterConfig::default())
    }
}

impl From<&RasterConfig> for RasterSettings {
    fn from(config: &RasterConfig) -> Self {
        Self {
            jpeg_quality: config.jpeg_quality.clamp(1, 100),
            max_width: config.max_width,
        }
    }
}

/// Maps media time (zero at the first frame) onto libav timestamps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaClock {
    /// Container start offset in `AV_TIME_BASE` units
    container_start: i64,
    /// Stream start offset in seconds
    stream_start: f64,
    time_base: f64,
}

impl MediaClock {
    pub fn new(container_start: i64, stream_start_ticks: i64, time_base: f64) -> Self {
        let known = |ticks: i64| if ticks == ffmpeg_next::ffi::AV_NOPTS_VALUE { 0 } else { ticks };
        Self {
            container_start: known(container_start),
            stream_start: known(stream_start_ticks) as f64 * time_base,
            time_base,
        }
    }

    /// Absolute seek target for media time `time_seconds`
    pub fn seek_target(&self, time_seconds: f64) -> i64 {
        let micros = time_seconds * f64::from(ffmpeg_next::ffi::AV_TIME_BASE);
        self.container_start.saturating_add(micros as i64)
    }

    /// Media time of a frame with presentation timestamp `pts`
    pub fn media_time(&self, pts: i64) -> f64 {
        pts as f64 * self.time_base - self.stream_start
    }
}

/// Decoder state touched only from blocking tasks
struct DecodeState {
    input: Input,
    stream_index: usize,
    clock: MediaClock,
    decoder: decoder::Video,
    current: Option<RgbImage>,
}

// SAFETY: the libav contexts are only ever used behind the mutex, by one
// thread at a time.
unsafe impl Send for DecodeState {}

/// Video file opened through libav with a single playhead
pub struct LibavVideoSource {
    path: String,
    duration_seconds: Option<f64>,
    width: u32,
    height: u32,
    raster: RasterSettings,
    state: Arc<Mutex<Option<DecodeState>>>,
    released: Arc<AtomicBool>,
}

impl LibavVideoSource {
    /// Open `path` and prepare a decoder for its best video stream
    pub fn open(path: &Path, raster: RasterSettings) -> CinemetricsResult<Self> {
        let display_path = path.display().to_string();
        if !path.exists() {
            return Err(CinemetricsError::InputFileNotFound { path: display_path });
        }

        let open_error = |message: String| CinemetricsError::OpenError {
            path: display_path.clone(),
            message,
        };

        let input = ffmpeg_next::format::input(&path).map_err(|e| open_error(e.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| open_error("no video stream".to_string()))?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        // SAFETY: `input` owns a valid format context for this whole scope.
        let container_start = unsafe { (*input.as_ptr()).start_time };
        let clock = MediaClock::new(container_start, stream.start_time(), f64::from(time_base));

        let decoder_context = CodecContext::from_parameters(stream.parameters())
            .map_err(|e| open_error(format!("unreadable codec parameters: {}", e)))?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|e| open_error(format!("no decoder: {}", e)))?;

        let duration_seconds = container_duration(&input).or_else(|| {
            let ticks = stream.duration();
            (ticks > 0).then(|| ticks as f64 * f64::from(time_base))
        });

        let (width, height) = (decoder.width(), decoder.height());
        debug!(
            path = %display_path,
            duration = ?duration_seconds,
            width,
            height,
            codec = ?decoder.id(),
            start_offset = clock.stream_start,
            "opened video source"
        );

        Ok(Self {
            path: display_path,
            duration_seconds,
            width,
            height,
            raster,
            state: Arc::new(Mutex::new(Some(DecodeState {
                input,
                stream_index,
                clock,
                decoder,
                current: None,
            }))),
            released: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raster(&self) -> RasterSettings {
        self.raster
    }
}

#[async_trait]
impl VideoSourcePort for LibavVideoSource {
    fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    async fn seek_to(&mut self, time_seconds: f64) -> Result<(), DomainError> {
        if self.is_released() {
            return Err(DomainError::decode("video source already released"));
        }

        let state = Arc::clone(&self.state);
        let released = Arc::clone(&self.released);
        tokio::task::spawn_blocking(move || {
            let mut guard = state
                .lock()
                .map_err(|_| DomainError::decode("decoder state poisoned"))?;
            let result = match guard.as_mut() {
                Some(decode) => decode.decode_at(time_seconds),
                None => Err(DomainError::decode("video source already released")),
            };
            // A release requested mid-decode is completed here.
            if released.load(Ordering::SeqCst) {
                guard.take();
            }
            result
        })
        .await
        .map_err(|e| DomainError::decode(format!("decode task failed: {}", e)))?
    }

    fn rasterize(&mut self) -> Result<Vec<u8>, DomainError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| DomainError::decode("decoder state poisoned"))?;
        let frame = guard
            .as_ref()
            .and_then(|decode| decode.current.as_ref())
            .ok_or_else(|| DomainError::decode("no frame under the playhead"))?;
        encode_jpeg(frame, &self.raster)
    }

    fn release(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        // A decode still running on a blocking thread drops the state itself.
        if let Ok(mut guard) = self.state.try_lock() {
            guard.take();
        }
        debug!(path = %self.path, "released decoder");
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Drop for LibavVideoSource {
    fn drop(&mut self) {
        self.release();
    }
}

impl DecodeState {
    /// Decode the first frame at or after `time_seconds`, falling back to the
    /// last decodable frame near the end of the stream
    fn decode_at(&mut self, time_seconds: f64) -> Result<(), DomainError> {
        let decode_error = |e: ffmpeg_next::Error| DomainError::decode(e.to_string());

        let seek_target = self.clock.seek_target(time_seconds);
        self.input
            .seek(seek_target, ..seek_target)
            .map_err(decode_error)?;
        self.decoder.flush();
        self.current = None;

        let mut scaler = ScalingContext::get(
            self.decoder.format(),
            self.decoder.width(),
            self.decoder.height(),
            Pixel::RGB24,
            self.decoder.width(),
            self.decoder.height(),
            ScalingFlags::BILINEAR,
        )
        .map_err(decode_error)?;

        let mut decoded = VideoFrame::empty();
        let mut rgb = VideoFrame::empty();
        let mut fallback: Option<RgbImage> = None;

        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder.send_packet(&packet).map_err(decode_error)?;

            while self.decoder.receive_frame(&mut decoded).is_ok() {
                scaler.run(&decoded, &mut rgb).map_err(decode_error)?;
                let image = rgb_image(&rgb)?;
                let frame_time = decoded
                    .timestamp()
                    .map(|pts| self.clock.media_time(pts))
                    .unwrap_or(time_seconds);
                trace!(frame_time, target = time_seconds, "decoded frame");

                if frame_time >= time_seconds {
                    self.current = Some(image);
                    return Ok(());
                }
                fallback = Some(image);
            }
        }

        self.decoder.send_eof().map_err(decode_error)?;
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            scaler.run(&decoded, &mut rgb).map_err(decode_error)?;
            fallback = Some(rgb_image(&rgb)?);
        }

        match fallback {
            Some(image) => {
                self.current = Some(image);
                Ok(())
            }
            None => Err(DomainError::decode(format!(
                "no frame could be decoded at {:.3}s",
                time_seconds
            ))),
        }
    }
}

fn container_duration(input: &Input) -> Option<f64> {
    let micros = input.duration();
    (micros > 0).then(|| micros as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE))
}

/// Copy an RGB24 frame into a packed image, dropping row padding
fn rgb_image(frame: &VideoFrame) -> Result<RgbImage, DomainError> {
    let (width, height) = (frame.width(), frame.height());
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;
    let data = frame.data(0);

    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        buffer.extend_from_slice(&data[start..start + row_bytes]);
    }

    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| DomainError::decode("decoded frame has an unexpected size"))
}

/// Target size after applying the width limit, preserving aspect ratio
pub fn fit_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if max_width == 0 || width <= max_width {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width) / u64::from(width)).max(1);
    (max_width, scaled as u32)
}

/// Encode a frame as JPEG with the configured quality and width limit
pub fn encode_jpeg(frame: &RgbImage, raster: &RasterSettings) -> Result<Vec<u8>, DomainError> {
    let (width, height) = fit_width(frame.width(), frame.height(), raster.max_width);
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, raster.jpeg_quality);
        let encoded = if (width, height) == frame.dimensions() {
            encoder.encode_image(frame)
        } else {
            let resized = image::imageops::resize(frame, width, height, FilterType::Triangle);
            encoder.encode_image(&resized)
        };
        encoded.map_err(|e| DomainError::decode(format!("JPEG encoding failed: {}", e)))?;
    }

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    #[test]
    fn test_fit_width() {
        assert_eq!(fit_width(1920, 1080, 1280), (1280, 720));
        assert_eq!(fit_width(640, 360, 1280), (640, 360));
        assert_eq!(fit_width(1920, 1080, 0), (1920, 1080));
        assert_eq!(fit_width(4000, 1, 100), (100, 1));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg() {
        let bytes = encode_jpeg(&gradient(64, 48), &RasterSettings::default()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_encode_jpeg_downscales_wide_frames() {
        let raster = RasterSettings {
            jpeg_quality: 70,
            max_width: 32,
        };
        let bytes = encode_jpeg(&gradient(128, 64), &raster).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn test_raster_settings_clamp_quality() {
        let config = RasterConfig {
            jpeg_quality: 0,
            max_width: 0,
        };
        assert_eq!(RasterSettings::from(&config).jpeg_quality, 1);
    }

    #[test]
    fn test_media_clock_applies_start_offset() {
        // MPEG-TS style stream starting 1.4s in, 90kHz time base
        let clock = MediaClock::new(1_400_000, 126_000, 1.0 / 90_000.0);
        assert_eq!(clock.seek_target(6.0), 7_400_000);
        assert!((clock.media_time(666_000) - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_media_clock_without_offset() {
        let unknown = ffmpeg_next::ffi::AV_NOPTS_VALUE;
        let clock = MediaClock::new(unknown, unknown, 1.0 / 1000.0);
        assert_eq!(clock.seek_target(12.5), 12_500_000);
        assert!((clock.media_time(12_500) - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_open_missing_file() {
        let result = LibavVideoSource::open(
            Path::new("/definitely/not/here.mp4"),
            RasterSettings::default(),
        );
        assert!(matches!(result, Err(CinemetricsError::InputFileNotFound { .. })));
    }
}
