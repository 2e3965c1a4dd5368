//! Network camera frame source.
//!
//! `CameraSource` reads from phone/IP webcams that serve MJPEG
//! (`multipart/x-mixed-replace`) or single JPEG snapshots over HTTP(S), e.g.
//! `http://<ip>:8080/video`. A `stub://` URL produces synthetic frames.
//!
//! The stream is decimated to the configured frame rate. A read failure means
//! the stream is gone and surfaces as `SourceError::Connection`; a frame that
//! fails to decode surfaces as `SourceError::Decode` and the stream stays
//! usable.

use std::io::Read;
use std::time::{Duration, Instant};

use url::Url;

use super::FrameSource;
use crate::error::SourceError;
use crate::frame::Frame;

const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;
const READ_CHUNK_BYTES: usize = 8192;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Stream URL. Supported schemes: http(s):// and stub://.
    pub url: String,
    /// Target frame rate (frames per second). Source will decimate to this rate.
    pub target_fps: u32,
    /// Frame size for synthetic cameras.
    pub synthetic_width: u32,
    pub synthetic_height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080/video".to_string(),
            target_fps: 10,
            synthetic_width: 640,
            synthetic_height: 480,
        }
    }
}

/// Network camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    Http(HttpCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self, SourceError> {
        if config.url.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(config)),
            });
        }
        let url = Url::parse(&config.url).map_err(|e| SourceError::Connection {
            source_name: config.url.clone(),
            reason: format!("invalid camera url: {e}"),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Self {
                backend: CameraBackend::Http(HttpCamera::new(config)),
            }),
            other => Err(SourceError::Connection {
                source_name: config.url.clone(),
                reason: format!("unsupported camera scheme '{other}'; expected http(s)"),
            }),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => CameraStats {
                frames_captured: source.frame_count,
                url: source.config.url.clone(),
            },
            CameraBackend::Http(source) => CameraStats {
                frames_captured: source.frame_count,
                url: source.config.url.clone(),
            },
        }
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame().map(Some),
            CameraBackend::Http(source) => source.next_frame().map(Some),
        }
    }

    fn describe(&self) -> String {
        self.stats().url
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        let stats = self.stats();
        log::info!(
            "camera {} released after {} frames",
            stats.url,
            stats.frames_captured
        );
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub url: String,
}

// ----------------------------------------------------------------------------
// HTTP MJPEG / snapshot camera
// ----------------------------------------------------------------------------

struct HttpCamera {
    config: CameraConfig,
    stream: Option<HttpStream>,
    last_frame_at: Option<Instant>,
    frame_count: u64,
}

enum HttpStream {
    Mjpeg(MjpegStream),
    SingleJpeg,
}

impl HttpCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            stream: None,
            last_frame_at: None,
            frame_count: 0,
        }
    }

    fn connection_error(&self, reason: impl Into<String>) -> SourceError {
        SourceError::Connection {
            source_name: self.config.url.clone(),
            reason: reason.into(),
        }
    }

    fn connect(&mut self) -> Result<(), SourceError> {
        let response = ureq::get(&self.config.url)
            .call()
            .map_err(|e| self.connection_error(e.to_string()))?;
        let content_type = response.header("Content-Type").unwrap_or("");
        if content_type.to_lowercase().contains("multipart") {
            self.stream = Some(HttpStream::Mjpeg(MjpegStream::new(response.into_reader())));
        } else {
            self.stream = Some(HttpStream::SingleJpeg);
        }
        log::info!("camera: connected to {}", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        if self.stream.is_none() {
            self.connect()?;
        }
        let min_interval = frame_interval(self.config.target_fps);
        loop {
            let read = match self.stream.as_mut() {
                Some(HttpStream::Mjpeg(stream)) => stream.read_next_jpeg(),
                Some(HttpStream::SingleJpeg) => {
                    // Snapshots are fetched on demand, so wait out the interval
                    // instead of polling the camera.
                    let wait = remaining_interval(self.last_frame_at, min_interval, Instant::now());
                    if !wait.is_zero() {
                        std::thread::sleep(wait);
                    }
                    fetch_single_jpeg(&self.config.url)
                }
                None => Err("camera not connected".to_string()),
            };
            let jpeg_bytes = read.map_err(|reason| self.connection_error(reason))?;

            // An MJPEG stream pushes frames at its own rate; drain the extras.
            let now = Instant::now();
            if !remaining_interval(self.last_frame_at, min_interval, now).is_zero() {
                continue;
            }
            self.last_frame_at = Some(now);

            let frame = decode_jpeg(&jpeg_bytes, &self.config.url)?;
            self.frame_count += 1;
            return Ok(frame);
        }
    }
}

struct MjpegStream {
    reader: Box<dyn Read + Send + Sync>,
    buffer: Vec<u8>,
}

impl MjpegStream {
    fn new(reader: Box<dyn Read + Send + Sync>) -> Self {
        Self {
            reader,
            buffer: Vec::with_capacity(64 * 1024),
        }
    }

    fn read_next_jpeg(&mut self) -> Result<Vec<u8>, String> {
        let mut chunk = vec![0u8; READ_CHUNK_BYTES];
        loop {
            if let Some((start, end)) = find_jpeg_bounds(&self.buffer) {
                let frame = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                return Ok(frame);
            }

            let read = self
                .reader
                .read(&mut chunk)
                .map_err(|e| format!("read mjpeg chunk: {e}"))?;
            if read == 0 {
                return Err("mjpeg stream ended".to_string());
            }
            self.buffer.extend_from_slice(&chunk[..read]);

            if self.buffer.len() > MAX_JPEG_BYTES * 2 {
                let keep = 2.min(self.buffer.len());
                let drain_len = self.buffer.len() - keep;
                self.buffer.drain(..drain_len);
            }
        }
    }
}

fn fetch_single_jpeg(url: &str) -> Result<Vec<u8>, String> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| format!("fetch jpeg snapshot: {e}"))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_JPEG_BYTES as u64)
        .read_to_end(&mut bytes)
        .map_err(|e| format!("read jpeg snapshot: {e}"))?;
    if bytes.is_empty() {
        return Err("empty jpeg snapshot".to_string());
    }
    Ok(bytes)
}

fn decode_jpeg(bytes: &[u8], origin: &str) -> Result<Frame, SourceError> {
    let image = image::load_from_memory(bytes).map_err(|e| SourceError::Decode {
        origin: origin.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Frame::new(image.into_rgb8()))
}

/// Locate the first complete JPEG (SOI..EOI) in a buffer.
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let start = buffer.windows(2).position(|w| w == [0xFF, 0xD8])?;
    let end = buffer[start + 2..]
        .windows(2)
        .position(|w| w == [0xFF, 0xD9])?;
    Some((start, start + 2 + end + 2))
}

/// Time left before the next frame may be delivered.
fn remaining_interval(last: Option<Instant>, min_interval: Duration, now: Instant) -> Duration {
    match last {
        Some(last) => min_interval.saturating_sub(now.saturating_duration_since(last)),
        None => Duration::ZERO,
    }
}

fn frame_interval(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::from_millis(0)
    } else {
        Duration::from_millis((1000 / target_fps).max(1) as u64)
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests and demos
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
}

impl SyntheticCamera {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Result<Frame, SourceError> {
        self.frame_count += 1;
        let (width, height) = (self.config.synthetic_width, self.config.synthetic_height);
        let shift = self.frame_count as u32;
        let image = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([
                ((x + shift) % 256) as u8,
                ((y + shift) % 256) as u8,
                ((x ^ y) % 256) as u8,
            ])
        });
        Ok(Frame::new(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serve the same JPEG to every request; returns the URL and a hit counter.
    fn serve_snapshots() -> (String, Arc<AtomicUsize>) {
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageRgb8(image::RgbImage::new(8, 8))
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut request = [0u8; 2048];
                let _ = stream.read(&mut request);
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    jpeg.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&jpeg);
            }
        });
        (format!("http://{addr}/shot.jpg"), hits)
    }

    #[test]
    fn snapshot_camera_waits_instead_of_refetching() {
        let (url, hits) = serve_snapshots();
        let mut source = CameraSource::new(CameraConfig {
            url,
            target_fps: 20,
            ..CameraConfig::default()
        })
        .unwrap();

        let started = Instant::now();
        for _ in 0..3 {
            let frame = source.next_frame().unwrap().expect("snapshot frame");
            assert_eq!((frame.width(), frame.height()), (8, 8));
        }

        // One request to probe the content type, then one per frame.
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(source.stats().frames_captured, 3);
    }

    #[test]
    fn remaining_interval_counts_down_from_last_frame() {
        let interval = Duration::from_millis(100);
        let last = Instant::now();
        assert_eq!(remaining_interval(None, interval, last), Duration::ZERO);
        assert_eq!(
            remaining_interval(Some(last), interval, last + Duration::from_millis(30)),
            Duration::from_millis(70)
        );
        assert_eq!(
            remaining_interval(Some(last), interval, last + Duration::from_millis(250)),
            Duration::ZERO
        );
    }

    #[test]
    fn finds_jpeg_between_markers() {
        let buffer = [0x00, 0x01, 0xFF, 0xD8, 0x10, 0x20, 0xFF, 0xD9, 0x33];
        assert_eq!(find_jpeg_bounds(&buffer), Some((2, 8)));
    }

    #[test]
    fn incomplete_jpeg_is_not_returned() {
        assert_eq!(find_jpeg_bounds(&[0xFF, 0xD8, 0x01, 0x02]), None);
        assert_eq!(find_jpeg_bounds(&[0x01, 0x02, 0xFF, 0xD9]), None);
    }

    #[test]
    fn mjpeg_stream_splits_frames_and_reports_end() {
        let mut body = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        body.extend_from_slice(&[0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9]);
        body.extend_from_slice(b"\r\n--frame\r\n\r\n");
        body.extend_from_slice(&[0xFF, 0xD8, 4, 0xFF, 0xD9]);
        let mut stream = MjpegStream::new(Box::new(std::io::Cursor::new(body)));

        assert_eq!(stream.read_next_jpeg().unwrap(), vec![0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9]);
        assert_eq!(stream.read_next_jpeg().unwrap(), vec![0xFF, 0xD8, 4, 0xFF, 0xD9]);
        assert!(stream.read_next_jpeg().is_err());
    }

    #[test]
    fn synthetic_camera_never_ends() {
        let mut source = CameraSource::new(CameraConfig {
            url: "stub://bench".to_string(),
            target_fps: 10,
            synthetic_width: 32,
            synthetic_height: 24,
        })
        .unwrap();
        for _ in 0..3 {
            let frame = source.next_frame().unwrap().expect("synthetic frame");
            assert_eq!((frame.width(), frame.height()), (32, 24));
        }
        assert_eq!(source.stats().frames_captured, 3);
    }

    #[test]
    fn rejects_unsupported_schemes() {
        let config = CameraConfig {
            url: "rtsp://10.0.0.2/stream".to_string(),
            ..CameraConfig::default()
        };
        assert!(matches!(
            CameraSource::new(config),
            Err(SourceError::Connection { .. })
        ));
    }

    #[test]
    fn undecodable_jpeg_is_a_decode_error() {
        let err = decode_jpeg(&[0xFF, 0xD8, 0x00, 0xFF, 0xD9], "test").unwrap_err();
        assert!(!err.is_fatal());
    }
}
