//! Hand poses and frame helpers shared by the integration tests

#![allow(dead_code)]

use std::time::Duration;

use handpilot::config::Config;
use handpilot::dispatch::{Dispatcher, EngineStatus};
use handpilot::input::RecordingSink;
use handpilot::landmarks::{
    Finger, Frame, HandLandmarks, INDEX_MCP, INDEX_TIP, LANDMARK_COUNT, Point3, THUMB_TIP, WRIST,
};
use handpilot::voice::DisabledVoice;

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;
pub const DT: Duration = Duration::from_millis(100);

/// Upright right hand, wrist at the bottom of the image
pub fn hand(thumb_out: bool, up: [bool; 4]) -> HandLandmarks {
    let mut p = [Point3::default(); LANDMARK_COUNT];
    p[WRIST] = Point3::new(0.5, 0.8, 0.0);
    if thumb_out {
        p[1] = Point3::new(0.45, 0.75, 0.0);
        p[2] = Point3::new(0.40, 0.70, 0.0);
        p[3] = Point3::new(0.35, 0.65, 0.0);
        p[4] = Point3::new(0.30, 0.60, 0.0);
    } else {
        p[1] = Point3::new(0.46, 0.76, 0.0);
        p[2] = Point3::new(0.44, 0.70, 0.0);
        p[3] = Point3::new(0.46, 0.64, 0.0);
        p[4] = Point3::new(0.50, 0.62, 0.0);
    }
    for (i, finger) in Finger::ALL.iter().enumerate() {
        let x = 0.45 + 0.05 * i as f32;
        let base = finger.mcp();
        p[base] = Point3::new(x, 0.60, 0.0);
        if up[i] {
            p[base + 1] = Point3::new(x, 0.50, 0.0);
            p[base + 2] = Point3::new(x, 0.45, 0.0);
            p[base + 3] = Point3::new(x, 0.40, 0.0);
        } else {
            p[base + 1] = Point3::new(x, 0.52, 0.0);
            p[base + 2] = Point3::new(x, 0.58, 0.0);
            p[base + 3] = Point3::new(x, 0.64, 0.0);
        }
    }
    HandLandmarks::new(p)
}

pub fn pointing() -> HandLandmarks {
    hand(false, [true, false, false, false])
}

pub fn two_finger() -> HandLandmarks {
    hand(false, [true, true, false, false])
}

/// Thumb and index spread in an L
pub fn scroll_shape() -> HandLandmarks {
    hand(true, [true, false, false, false])
}

pub fn open_hand() -> HandLandmarks {
    hand(true, [true; 4])
}

pub fn fist() -> HandLandmarks {
    hand(false, [false; 4])
}

/// Thumb and index tips touching, other three fingers up
pub fn ok_sign() -> HandLandmarks {
    let mut p = *hand(false, [false, true, true, true]).points();
    p[INDEX_MCP] = Point3::new(0.45, 0.60, 0.0);
    p[6] = Point3::new(0.42, 0.52, 0.0);
    p[7] = Point3::new(0.41, 0.53, 0.0);
    p[INDEX_TIP] = Point3::new(0.42, 0.56, 0.0);
    p[2] = Point3::new(0.42, 0.70, 0.0);
    p[3] = Point3::new(0.41, 0.63, 0.0);
    p[THUMB_TIP] = Point3::new(0.425, 0.56, 0.0);
    HandLandmarks::new(p)
}

/// Shift a hand by a number of pixels at the test frame size
pub fn shifted_px(hand: &HandLandmarks, dx_px: f32, dy_px: f32) -> HandLandmarks {
    hand.translated(dx_px / WIDTH as f32, dy_px / HEIGHT as f32)
}

pub fn frame(hands: Vec<HandLandmarks>) -> Frame {
    Frame::new(WIDTH, HEIGHT, 10.0, hands)
}

/// Dispatcher plus a recording sink with a 1920x1080 screen
pub struct Rig {
    pub dispatcher: Dispatcher,
    pub sink: RecordingSink,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            dispatcher: Dispatcher::new(&config, Box::new(DisabledVoice)),
            sink: RecordingSink::new().with_screen(1920, 1080),
        }
    }

    pub fn tick(&mut self, hands: Vec<HandLandmarks>) -> EngineStatus {
        self.dispatcher.tick(&frame(hands), DT, &mut self.sink)
    }

    pub fn tick_n(&mut self, n: usize, hands: Vec<HandLandmarks>) -> EngineStatus {
        let mut last = None;
        for _ in 0..n {
            last = Some(self.tick(hands.clone()));
        }
        last.unwrap_or_else(|| self.tick(hands))
    }
}
