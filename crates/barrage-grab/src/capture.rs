//! Capture collaborator seam.
//!
//! The interception proxy lives outside this crate. It hands captured frames
//! to the pipeline through [`FrameSink`]; the pipeline drives it through
//! [`CaptureSource`]. [`ReplayCapture`] replays frames recorded to a file.
//!
//! ## Replay Format
//!
//! One JSON object per line, payload in standard base64:
//!
//! ```text
//! {"source":"socket_stream","process":"live.exe","payload":"CAcq...","decompress":true}
//! {"source":"http_response","process":"chrome","payload":"eyJUeXBlIjox..."}
//! ```

use std::path::Path;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{GrabError, Result};

/// Where a frame was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSource {
    /// A WebSocket message.
    SocketStream,
    /// An HTTP response body.
    HttpResponse,
}

/// A captured frame.
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub process: String,
    pub payload: Vec<u8>,
    /// Proxy hint that the payload needs inflating (socket frames only).
    pub decompress: bool,
    pub source: FrameSource,
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("process", &self.process)
            .field("payload_len", &self.payload.len())
            .field("decompress", &self.decompress)
            .field("source", &self.source)
            .finish()
    }
}

impl RawFrame {
    /// Creates a socket-stream frame.
    pub fn socket(process: impl Into<String>, payload: Vec<u8>, decompress: bool) -> Self {
        Self {
            process: process.into(),
            payload,
            decompress,
            source: FrameSource::SocketStream,
        }
    }

    /// Creates an HTTP response frame.
    pub fn http(process: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            process: process.into(),
            payload,
            decompress: false,
            source: FrameSource::HttpResponse,
        }
    }

    /// Encodes the frame as one replay line (without newline).
    pub fn to_replay_line(&self) -> Result<String> {
        let line = ReplayLine {
            source: self.source,
            process: self.process.clone(),
            payload: STANDARD.encode(&self.payload),
            decompress: self.decompress,
        };
        Ok(serde_json::to_string(&line)?)
    }

    /// Decodes one replay line.
    pub fn from_replay_line(line: &str) -> Result<Self> {
        let line: ReplayLine = serde_json::from_str(line)?;
        let payload = STANDARD
            .decode(line.payload.as_bytes())
            .map_err(|e| GrabError::Config(format!("invalid payload encoding: {e}")))?;

        Ok(Self {
            process: line.process,
            payload,
            decompress: line.decompress,
            source: line.source,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ReplayLine {
    source: FrameSource,
    process: String,
    payload: String,
    #[serde(default)]
    decompress: bool,
}

/// Receives captured frames.
pub trait FrameSink: Send + Sync {
    /// Handles one frame. Must not panic on malformed input.
    fn on_frame(&self, frame: RawFrame);
}

/// A source of captured frames.
pub trait CaptureSource: Send + Sync {
    /// Starts delivering frames to `sink`.
    ///
    /// A failure here is fatal for the pipeline start.
    fn start(&self, sink: Arc<dyn FrameSink>) -> Result<()>;

    /// Stops delivering frames. Idempotent.
    fn stop(&self);
}

/// Replays recorded frames.
///
/// Frames are delivered synchronously on the thread calling [`replay`] or
/// [`push`], and only while the capture is started.
///
/// [`replay`]: ReplayCapture::replay
/// [`push`]: ReplayCapture::push
#[derive(Default)]
pub struct ReplayCapture {
    frames: Mutex<Vec<RawFrame>>,
    sink: RwLock<Option<Arc<dyn FrameSink>>>,
}

impl std::fmt::Debug for ReplayCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayCapture")
            .field("pending", &self.frames.lock().len())
            .field("started", &self.is_started())
            .finish()
    }
}

impl ReplayCapture {
    /// Creates an empty capture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a capture holding the given frames.
    pub fn from_frames(frames: Vec<RawFrame>) -> Self {
        Self {
            frames: Mutex::new(frames),
            sink: RwLock::new(None),
        }
    }

    /// Loads frames from a replay file. Blank lines and `#` comments are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut frames = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let frame = RawFrame::from_replay_line(line).map_err(|e| {
                GrabError::Config(format!(
                    "{}:{}: {e}",
                    path.as_ref().display(),
                    index + 1
                ))
            })?;
            frames.push(frame);
        }

        tracing::debug!(
            "Loaded {} frames from {}",
            frames.len(),
            path.as_ref().display()
        );
        Ok(Self::from_frames(frames))
    }

    /// Writes frames to a replay file.
    pub fn write_file(path: impl AsRef<Path>, frames: &[RawFrame]) -> Result<()> {
        let mut content = String::new();
        for frame in frames {
            content.push_str(&frame.to_replay_line()?);
            content.push('\n');
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns true between `start` and `stop`.
    pub fn is_started(&self) -> bool {
        self.sink.read().is_some()
    }

    /// Returns the number of frames not yet replayed.
    pub fn pending(&self) -> usize {
        self.frames.lock().len()
    }

    /// Delivers one frame immediately. Returns false if not started.
    pub fn push(&self, frame: RawFrame) -> bool {
        let Some(sink) = self.sink.read().clone() else {
            return false;
        };
        sink.on_frame(frame);
        true
    }

    /// Delivers all pending frames in order. Returns the number delivered.
    ///
    /// Frames stay pending when the capture is not started.
    pub fn replay(&self) -> usize {
        let Some(sink) = self.sink.read().clone() else {
            return 0;
        };

        let frames = std::mem::take(&mut *self.frames.lock());
        let count = frames.len();
        for frame in frames {
            sink.on_frame(frame);
        }
        count
    }
}

impl CaptureSource for ReplayCapture {
    fn start(&self, sink: Arc<dyn FrameSink>) -> Result<()> {
        let mut slot = self.sink.write();
        if slot.is_some() {
            return Err(GrabError::Capture("replay capture already started".into()));
        }
        *slot = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.sink.write().take();
    }
}
