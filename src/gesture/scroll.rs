//! L/V-shape scrolling
//!
//! The anchor is fixed at confirmation. Each tick the vertical displacement
//! of the thumb-index midpoint from that anchor picks an intensity level,
//! and one scroll step is emitted every `base_interval / level`.

use std::time::Duration;
use tracing::debug;

use super::{Countdown, Gesture, GestureKind, GestureState, GestureStatus, Step, TickContext};
use crate::classify::Observation;
use crate::config::{ScrollConfig, TimingConfig};
use crate::input::{InputSink, OutputCommand, emit};
use crate::landmarks::{HandLandmarks, INDEX_TIP, THUMB_TIP};
use crate::mapping::IntensityLevels;

#[derive(Debug, Default, Clone, Copy)]
struct Anchor {
    anchor_y: f32,
    repeat: Countdown,
    level: u32,
}

pub struct Scroll {
    state: GestureState<Anchor>,
    config: ScrollConfig,
    timing: TimingConfig,
    levels: IntensityLevels,
}

impl Scroll {
    pub fn new(config: ScrollConfig, timing: TimingConfig) -> Self {
        Self {
            state: GestureState::new(GestureKind::Scroll, config.confirm_time()),
            levels: IntensityLevels::new(config.levels_px.clone()),
            config,
            timing,
        }
    }

    /// Intensity chosen on the last tick (0 inside the dead zone)
    pub fn level(&self) -> u32 {
        self.state.payload.level
    }

    fn pinch_y(hand: &HandLandmarks, ctx: &TickContext<'_>) -> f32 {
        ctx.px_y(hand.point(THUMB_TIP).midpoint(&hand.point(INDEX_TIP)).y)
    }

    fn track(&mut self, hand: &HandLandmarks, ctx: &mut TickContext<'_>) {
        let dy = Self::pinch_y(hand, ctx) - self.state.payload.anchor_y;
        let scale = self.timing.scale_px(1.0, ctx.width);
        let level = self.levels.level(dy, scale);
        let payload = &mut self.state.payload;
        if level != payload.level {
            debug!(level, dy, "scroll intensity");
        }
        payload.level = level;

        let Some(interval) = IntensityLevels::interval(self.config.base_interval(), level) else {
            payload.repeat.clear();
            return;
        };
        if payload.repeat.is_running() {
            return;
        }
        // hand below the anchor scrolls down
        let step = if dy > 0.0 { self.config.step } else { -self.config.step };
        emit(ctx.sink, OutputCommand::MouseScroll { dx: 0, dy: step });
        payload.repeat.arm(interval.max(ctx.dt));
    }
}

impl Gesture for Scroll {
    fn kind(&self) -> GestureKind {
        GestureKind::Scroll
    }

    fn advance(&mut self, dt: Duration) {
        self.state.advance(dt);
        self.state.payload.repeat.advance(dt);
    }

    fn update(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>) {
        let matched = observation.is_some_and(|o| o.class.scroll);
        match (self.state.observe(matched, ctx.dt), observation) {
            (Step::Confirmed, Some(o)) => {
                self.state.payload.anchor_y = Self::pinch_y(o.hand, ctx);
                debug!(anchor_y = self.state.payload.anchor_y, "scroll anchored");
            }
            (Step::Held, Some(o)) => self.track(o.hand, ctx),
            (Step::Lost, _) => self.state.release(),
            _ => {}
        }
    }

    fn reset(&mut self, _sink: &mut dyn InputSink) {
        self.state.reset();
    }

    fn status(&self) -> GestureStatus {
        self.state.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classification;
    use crate::gesture::Phase;
    use crate::input::RecordingSink;
    use crate::landmarks::{LANDMARK_COUNT, Point3};

    const DT: Duration = Duration::from_millis(20);

    fn pinch_at(y: f32) -> HandLandmarks {
        let mut p = [Point3::new(0.5, 0.9, 0.0); LANDMARK_COUNT];
        p[THUMB_TIP] = Point3::new(0.4, y, 0.0);
        p[INDEX_TIP] = Point3::new(0.5, y, 0.0);
        HandLandmarks::new(p)
    }

    fn tick(s: &mut Scroll, hand: Option<&HandLandmarks>, sink: &mut RecordingSink) {
        s.advance(DT);
        let obs = hand.map(|h| Observation {
            hand: h,
            class: Classification {
                scroll: true,
                ..Classification::default()
            },
        });
        let mut ctx = TickContext {
            dt: DT,
            width: 640,
            height: 480,
            sink,
        };
        s.update(obs.as_ref(), &mut ctx);
    }

    fn anchored() -> Scroll {
        let mut s = Scroll::new(ScrollConfig::default(), TimingConfig::default());
        let mut sink = RecordingSink::new();
        let h = pinch_at(0.5);
        for _ in 0..6 {
            tick(&mut s, Some(&h), &mut sink);
        }
        assert_eq!(s.status().phase, Phase::Active);
        assert!(sink.commands.is_empty());
        s
    }

    fn y_for_px(dy: f32) -> f32 {
        0.5 + dy / 480.0
    }

    #[test]
    fn test_dead_zone_is_silent() {
        let mut s = anchored();
        let mut sink = RecordingSink::new();
        for _ in 0..20 {
            tick(&mut s, Some(&pinch_at(y_for_px(10.0))), &mut sink);
        }
        assert!(sink.commands.is_empty());
        assert_eq!(s.level(), 0);
    }

    #[test]
    fn test_direction_follows_displacement() {
        let mut s = anchored();
        let mut sink = RecordingSink::new();
        tick(&mut s, Some(&pinch_at(y_for_px(30.0))), &mut sink);
        assert_eq!(sink.take(), vec![OutputCommand::MouseScroll { dx: 0, dy: 1 }]);

        let mut s = anchored();
        tick(&mut s, Some(&pinch_at(y_for_px(-30.0))), &mut sink);
        assert_eq!(sink.take(), vec![OutputCommand::MouseScroll { dx: 0, dy: -1 }]);
    }

    #[test]
    fn test_higher_intensity_repeats_faster() {
        let count = |px: f32| {
            let mut s = anchored();
            let mut sink = RecordingSink::new();
            for _ in 0..50 {
                tick(&mut s, Some(&pinch_at(y_for_px(px))), &mut sink);
            }
            sink.commands.len()
        };
        let slow = count(30.0);
        let fast = count(200.0);
        assert!(fast > slow * 3, "slow {} fast {}", slow, fast);
    }

    #[test]
    fn test_same_displacement_same_intensity_after_return() {
        let mut s = anchored();
        let mut sink = RecordingSink::new();
        tick(&mut s, Some(&pinch_at(y_for_px(80.0))), &mut sink);
        let first = s.level();
        for _ in 0..5 {
            tick(&mut s, Some(&pinch_at(y_for_px(150.0))), &mut sink);
        }
        tick(&mut s, Some(&pinch_at(0.5)), &mut sink);
        assert_eq!(s.level(), 0);
        tick(&mut s, Some(&pinch_at(y_for_px(80.0))), &mut sink);
        assert_eq!(s.level(), first);
        assert_eq!(first, 3);
    }

    #[test]
    fn test_release_is_immediate() {
        let mut s = anchored();
        let mut sink = RecordingSink::new();
        tick(&mut s, None, &mut sink);
        assert_eq!(s.status().phase, Phase::Idle);
        assert_eq!(s.level(), 0);
    }
}
