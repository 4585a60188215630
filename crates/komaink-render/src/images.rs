//! Asynchronous image decoding.
//!
//! Image nodes show a placeholder until a background worker has fetched,
//! decoded and resized their bitmap. Results carry the ticket of the request
//! that produced them; the scene drops any result whose node is gone or has
//! since asked for something else.

use crate::renderer::{RenderResult, RendererError};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use komaink_core::elements::ElementId;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tiny_skia::{ColorU8, IntSize, Pixmap};

/// Largest bitmap edge the decoder will produce.
pub const MAX_DECODE_EDGE: u32 = 4096;

/// Fetches the raw bytes behind an image URL.
pub trait AssetResolver: Send + Sync {
    fn fetch(&self, url: &str) -> RenderResult<Vec<u8>>;
}

/// Resolves `data:` URLs and local files.
#[derive(Debug, Clone, Default)]
pub struct DefaultResolver {
    /// Directory relative paths are resolved against.
    base_dir: Option<PathBuf>,
}

impl DefaultResolver {
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

impl AssetResolver for DefaultResolver {
    fn fetch(&self, url: &str) -> RenderResult<Vec<u8>> {
        if let Some(rest) = url.strip_prefix("data:") {
            return decode_data_url(rest);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(RendererError::Asset(format!("remote asset {} needs a network resolver", url)));
        }
        let path = self.path_for(url);
        std::fs::read(&path).map_err(|e| RendererError::Asset(format!("{}: {}", path.display(), e)))
    }
}

/// Payload of a `data:` URL, without the scheme.
fn decode_data_url(rest: &str) -> RenderResult<Vec<u8>> {
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| RendererError::Asset("malformed data URL".to_string()))?;
    if !header.ends_with(";base64") {
        return Err(RendererError::Asset(format!("unsupported data URL encoding: {}", header)));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| RendererError::Asset(format!("invalid base64: {}", e)))
}

/// Decode `bytes` and resize to `width` x `height` pixels.
///
/// A zero dimension keeps the source size. Both edges are capped at
/// [`MAX_DECODE_EDGE`].
pub fn decode_image(bytes: &[u8], width: u32, height: u32) -> RenderResult<RgbaImage> {
    let decoded = image::load_from_memory(bytes).map_err(|e| RendererError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (w, h) = if width == 0 || height == 0 {
        rgba.dimensions()
    } else {
        (width, height)
    };
    let (w, h) = (w.clamp(1, MAX_DECODE_EDGE), h.clamp(1, MAX_DECODE_EDGE));
    if (w, h) == rgba.dimensions() {
        return Ok(rgba);
    }
    Ok(imageops::resize(&rgba, w, h, FilterType::Triangle))
}

/// Premultiplied copy of `image` ready for compositing.
pub fn to_pixmap(image: &RgbaImage) -> RenderResult<Pixmap> {
    let (width, height) = image.dimensions();
    let size = IntSize::from_wh(width, height)
        .ok_or_else(|| RendererError::Decode(format!("empty bitmap {}x{}", width, height)))?;
    let data: Vec<u8> = image
        .pixels()
        .flat_map(|p| {
            let c = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();
    Pixmap::from_vec(data, size).ok_or_else(|| RendererError::Decode("bitmap size mismatch".to_string()))
}

/// A decoded bitmap.
#[derive(Debug)]
pub struct DecodedImage {
    pub pixmap: Pixmap,
}

impl DecodedImage {
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }
}

/// Load state of an image node.
#[derive(Debug, Clone)]
pub enum ImageState {
    /// Waiting for the first decode.
    Placeholder,
    Ready(Arc<DecodedImage>),
    /// Decoding failed. Not retried while the URL stays the same.
    Error(String),
}

impl ImageState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ImageState::Ready(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ImageState::Error(_))
    }
}

impl PartialEq for ImageState {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ImageState::Placeholder, ImageState::Placeholder) => true,
            (ImageState::Ready(a), ImageState::Ready(b)) => Arc::ptr_eq(a, b),
            (ImageState::Error(a), ImageState::Error(b)) => a == b,
            _ => false,
        }
    }
}

/// Request to decode the bitmap for one image node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub element_id: ElementId,
    pub ticket: u64,
    pub url: String,
    /// Target size in pixels.
    pub width: u32,
    pub height: u32,
}

/// Outcome of one request.
#[derive(Debug)]
pub struct DecodeResult {
    pub element_id: ElementId,
    pub ticket: u64,
    pub outcome: RenderResult<DecodedImage>,
}

/// Background decoder fed through a channel.
pub struct ImageLoader {
    requests: Option<Sender<ImageRequest>>,
    results: Receiver<DecodeResult>,
    pending: usize,
    worker: Option<JoinHandle<()>>,
}

impl ImageLoader {
    /// Start the decode worker.
    pub fn spawn(resolver: Arc<dyn AssetResolver>) -> RenderResult<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ImageRequest>();
        let (result_tx, result_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("komaink-image-decoder".to_string())
            .spawn(move || {
                for request in request_rx {
                    let outcome = resolver
                        .fetch(&request.url)
                        .and_then(|bytes| decode_image(&bytes, request.width, request.height))
                        .and_then(|rgba| to_pixmap(&rgba))
                        .map(|pixmap| DecodedImage { pixmap });
                    let result = DecodeResult {
                        element_id: request.element_id,
                        ticket: request.ticket,
                        outcome,
                    };
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
                log::debug!("[ImageLoader] Worker stopped");
            })
            .map_err(|e| RendererError::InitFailed(format!("image decoder thread: {}", e)))?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            pending: 0,
            worker: Some(worker),
        })
    }

    /// Queue a decode. Fire and forget: the result arrives through
    /// [`poll`](Self::poll) or [`wait`](Self::wait).
    pub fn request(&mut self, request: ImageRequest) {
        let Some(tx) = &self.requests else {
            return;
        };
        log::debug!(
            "[ImageLoader] Queue {} (ticket {}) at {}x{}",
            request.element_id,
            request.ticket,
            request.width,
            request.height
        );
        match tx.send(request) {
            Ok(()) => self.pending += 1,
            Err(e) => log::warn!("[ImageLoader] Worker gone, dropping request for {}", e.0.element_id),
        }
    }

    /// Requests sent but not yet collected.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Collect finished results without blocking.
    pub fn poll(&mut self) -> Vec<DecodeResult> {
        let mut out = Vec::new();
        loop {
            match self.results.try_recv() {
                Ok(result) => {
                    self.pending = self.pending.saturating_sub(1);
                    out.push(result);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.pending = 0;
                    break;
                }
            }
        }
        out
    }

    /// Collect results until nothing is pending or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Vec<DecodeResult> {
        let deadline = Instant::now() + timeout;
        let mut out = self.poll();
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(result) => {
                    self.pending -= 1;
                    out.push(result);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = 0;
                    break;
                }
            }
        }
        out
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("[ImageLoader] Worker panicked");
            }
        }
    }
}
