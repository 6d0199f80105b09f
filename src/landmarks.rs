//! Hand landmark data as delivered by the pose estimator
//!
//! One `HandLandmarks` holds the 21 normalized points of a single hand for a
//! single tick. x/y are image-relative in [0, 1] (y grows downwards), z is
//! depth relative to the wrist. There is no identity across frames.

use serde::{Deserialize, Serialize};

// ============================================================================
// Landmark indices
// ============================================================================

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Maximum number of hands the engine arbitrates per tick
pub const MAX_HANDS: usize = 2;

/// The four non-thumb fingers, in index order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    pub fn mcp(self) -> usize {
        match self {
            Finger::Index => INDEX_MCP,
            Finger::Middle => MIDDLE_MCP,
            Finger::Ring => RING_MCP,
            Finger::Pinky => PINKY_MCP,
        }
    }

    pub fn pip(self) -> usize {
        self.mcp() + 1
    }

    pub fn tip(self) -> usize {
        self.mcp() + 3
    }
}

// ============================================================================
// Points
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar (image) distance, ignoring depth
    pub fn distance_2d(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn distance_3d(&self, other: &Point3) -> f32 {
        let dz = self.z - other.z;
        let planar = self.distance_2d(other);
        (planar * planar + dz * dz).sqrt()
    }

    pub fn midpoint(&self, other: &Point3) -> Point3 {
        Point3::new(
            (self.x + other.x) * 0.5,
            (self.y + other.y) * 0.5,
            (self.z + other.z) * 0.5,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ============================================================================
// Hands and frames
// ============================================================================

/// One hand's landmarks for one tick
///
/// A hand built from malformed input (wrong point count, NaN coordinates) is
/// kept but flagged invalid, so the dispatcher still sees a hand present while
/// every classifier reports false for it.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Point3; LANDMARK_COUNT],
    valid: bool,
}

impl HandLandmarks {
    pub fn new(points: [Point3; LANDMARK_COUNT]) -> Self {
        let valid = points.iter().all(Point3::is_finite);
        Self { points, valid }
    }

    pub fn from_points(points: &[Point3]) -> Self {
        match <[Point3; LANDMARK_COUNT]>::try_from(points) {
            Ok(points) => Self::new(points),
            Err(_) => Self::invalid(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            points: [Point3::default(); LANDMARK_COUNT],
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn point(&self, index: usize) -> Point3 {
        self.points[index]
    }

    pub fn points(&self) -> &[Point3; LANDMARK_COUNT] {
        &self.points
    }

    pub fn wrist(&self) -> Point3 {
        self.points[WRIST]
    }

    /// Planar distance of a landmark from the wrist
    pub fn wrist_distance(&self, index: usize) -> f32 {
        self.points[index].distance_2d(&self.points[WRIST])
    }

    /// Same hand shifted by (dx, dy) in normalized coordinates
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let mut points = self.points;
        for p in points.iter_mut() {
            p.x += dx;
            p.y += dy;
        }
        Self {
            points,
            valid: self.valid,
        }
    }
}

/// One tick of input: frame geometry, the reported rate, and 0..=2 hands
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub hands: Vec<HandLandmarks>,
}

impl Frame {
    pub fn new(width: u32, height: u32, fps: f32, hands: Vec<HandLandmarks>) -> Self {
        Self {
            width,
            height,
            fps,
            hands,
        }
    }

    /// A frame without hands, used for dropped captures
    pub fn empty(width: u32, height: u32, fps: f32) -> Self {
        Self::new(width, height, fps, Vec::new())
    }
}
