//! Frame input and tick timing
//!
//! Landmarks arrive from an external pose estimator as JSON lines, one
//! frame per line:
//!
//! ```text
//! {"width":640,"height":480,"fps":30.0,"hands":[[[0.5,0.8,0.0], ... 21 points], ...]}
//! {"ok":false,"fps":30.0}
//! ```
//!
//! A capture failure (`"ok": false`) or an unparseable line becomes a
//! dropped frame, which the engine treats exactly like a frame without hands.

use serde::Deserialize;
use std::fmt;
use std::io::BufRead;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::{TimingConfig, TimingScheme};
use crate::landmarks::{Frame, HandLandmarks, Point3};

/// Error type for frame sources
#[derive(Debug)]
pub enum SourceError {
    Io(std::io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "Frame source I/O error: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e)
    }
}

/// One read from a frame source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Frame(Frame),
    /// Capture or decode failed for this tick
    Dropped { fps: f32 },
}

impl SourceEvent {
    /// The frame to tick with; dropped reads become an empty frame
    pub fn into_frame(self, last_size: (u32, u32)) -> Frame {
        match self {
            SourceEvent::Frame(frame) => frame,
            SourceEvent::Dropped { fps } => Frame::empty(last_size.0, last_size.1, fps),
        }
    }
}

pub trait FrameSource {
    /// Next event, `Ok(None)` at end of stream
    fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError>;
}

#[derive(Debug, Deserialize)]
struct WireFrame {
    #[serde(default = "default_ok")]
    ok: bool,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    fps: f32,
    #[serde(default)]
    hands: Vec<Vec<[f32; 3]>>,
}

fn default_ok() -> bool {
    true
}

/// Newline-delimited JSON frames from any reader (stdin, a replay file)
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_no: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }

    fn parse(&self, text: &str) -> SourceEvent {
        let wire: WireFrame = match serde_json::from_str(text) {
            Ok(wire) => wire,
            Err(e) => {
                warn!(line = self.line_no, "bad frame: {}", e);
                return SourceEvent::Dropped { fps: 0.0 };
            }
        };
        if !wire.ok {
            return SourceEvent::Dropped { fps: wire.fps };
        }
        let hands = wire
            .hands
            .iter()
            .map(|points| {
                let points: Vec<Point3> = points
                    .iter()
                    .map(|[x, y, z]| Point3::new(*x, *y, *z))
                    .collect();
                HandLandmarks::from_points(&points)
            })
            .collect();
        SourceEvent::Frame(Frame::new(wire.width, wire.height, wire.fps, hands))
    }
}

impl<R: BufRead> FrameSource for JsonLinesSource<R> {
    fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;
            let text = self.line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return Ok(Some(self.parse(text)));
        }
    }
}

/// Produces the single `dt` every timer advances by on a tick
#[derive(Debug)]
pub struct TickClock {
    scheme: TimingScheme,
    fallback_fps: f32,
    last: Option<Instant>,
}

impl TickClock {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            scheme: config.scheme,
            fallback_fps: config.fallback_fps,
            last: None,
        }
    }

    /// Time step for a tick happening now
    pub fn tick(&mut self, reported_fps: f32) -> Duration {
        self.tick_at(Instant::now(), reported_fps)
    }

    pub fn tick_at(&mut self, now: Instant, reported_fps: f32) -> Duration {
        match self.scheme {
            TimingScheme::FrameInterval => self.frame_interval(reported_fps),
            TimingScheme::WallClock => {
                let dt = match self.last {
                    Some(last) => now.saturating_duration_since(last),
                    None => self.frame_interval(reported_fps),
                };
                self.last = Some(now);
                dt
            }
        }
    }

    /// `1 / fps`, using the fallback rate when the reported one is unusable
    pub fn frame_interval(&self, reported_fps: f32) -> Duration {
        let fps = [reported_fps, self.fallback_fps]
            .into_iter()
            .find(|fps| FPS_RANGE.contains(fps))
            .unwrap_or(DEFAULT_FPS);
        Duration::try_from_secs_f32(1.0 / fps)
            .unwrap_or_else(|_| Duration::from_secs_f32(1.0 / DEFAULT_FPS))
    }
}

/// Rates outside this range are treated as missing
const FPS_RANGE: std::ops::RangeInclusive<f32> = 1.0..=1000.0;
const DEFAULT_FPS: f32 = 30.0;
