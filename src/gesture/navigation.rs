//! Two-finger swipe: horizontal travel from the confirmation point taps Left/Right

use std::time::Duration;
use tracing::info;

use super::{Gesture, GestureKind, GestureState, GestureStatus, Step, TickContext};
use crate::classify::Observation;
use crate::config::{NavigationConfig, TimingConfig};
use crate::input::{InputSink, Key, OutputCommand, emit};
use crate::landmarks::{HandLandmarks, INDEX_TIP, MIDDLE_TIP};

#[derive(Debug, Default, Clone, Copy)]
struct Anchor {
    /// Midpoint of index and middle fingertips at confirmation, in pixels
    reference_x: f32,
}

pub struct Navigation {
    state: GestureState<Anchor>,
    config: NavigationConfig,
    timing: TimingConfig,
}

impl Navigation {
    pub fn new(config: NavigationConfig, timing: TimingConfig) -> Self {
        Self {
            state: GestureState::new(GestureKind::Navigation, config.confirm_time()),
            config,
            timing,
        }
    }

    fn fingertips_x(hand: &HandLandmarks, ctx: &TickContext<'_>) -> f32 {
        ctx.px_x(hand.point(INDEX_TIP).midpoint(&hand.point(MIDDLE_TIP)).x)
    }
}

impl Gesture for Navigation {
    fn kind(&self) -> GestureKind {
        GestureKind::Navigation
    }

    fn advance(&mut self, dt: Duration) {
        self.state.advance(dt);
    }

    fn update(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>) {
        let matched = observation.is_some_and(|o| o.class.two_finger);
        match self.state.observe(matched, ctx.dt) {
            Step::Confirmed => {
                if let Some(o) = observation {
                    self.state.payload.reference_x = Self::fingertips_x(o.hand, ctx);
                }
            }
            Step::Held => {
                let Some(o) = observation else { return };
                if !self.state.action_ready() {
                    return;
                }
                let current = Self::fingertips_x(o.hand, ctx);
                let delta = self.state.payload.reference_x - current;
                let threshold = self
                    .timing
                    .scale_px(self.config.movement_threshold_px, ctx.width);
                if delta.abs() <= threshold {
                    return;
                }
                let key = if delta > 0.0 { Key::Right } else { Key::Left };
                info!(%key, delta, "navigation");
                emit(ctx.sink, OutputCommand::KeyTap(key));
                self.state.arm_action_cooldown(self.timing.action_cooldown());
                self.state.fire(self.config.cooldown());
            }
            Step::Lost => self.state.fire(self.timing.release_cooldown()),
            Step::Idle | Step::Blocked | Step::Confirming => {}
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

    const DT: Duration = Duration::from_millis(50);

    fn hand_at(x: f32) -> HandLandmarks {
        let mut p = [Point3::new(x, 0.5, 0.0); LANDMARK_COUNT];
        p[INDEX_TIP] = Point3::new(x - 0.02, 0.4, 0.0);
        p[MIDDLE_TIP] = Point3::new(x + 0.02, 0.4, 0.0);
        HandLandmarks::new(p)
    }

    fn two_finger() -> Classification {
        Classification {
            two_finger: true,
            ..Classification::default()
        }
    }

    fn tick(nav: &mut Navigation, hand: Option<&HandLandmarks>, sink: &mut RecordingSink) {
        nav.advance(DT);
        let obs = hand.map(|h| Observation {
            hand: h,
            class: two_finger(),
        });
        let mut ctx = TickContext {
            dt: DT,
            width: 640,
            height: 480,
            sink,
        };
        nav.update(obs.as_ref(), &mut ctx);
    }

    fn confirmed() -> Navigation {
        let mut nav = Navigation::new(NavigationConfig::default(), TimingConfig::default());
        let mut sink = RecordingSink::new();
        let h = hand_at(0.5);
        for _ in 0..3 {
            tick(&mut nav, Some(&h), &mut sink);
        }
        assert_eq!(nav.status().phase, Phase::Active);
        nav
    }

    #[test]
    fn test_small_motion_does_nothing() {
        let mut nav = confirmed();
        let mut sink = RecordingSink::new();
        // 20px at 640 wide
        tick(&mut nav, Some(&hand_at(0.5 + 20.0 / 640.0)), &mut sink);
        assert!(sink.commands.is_empty());
        assert_eq!(nav.status().phase, Phase::Active);
    }

    #[test]
    fn test_leftward_reference_fires_right() {
        let mut nav = confirmed();
        let mut sink = RecordingSink::new();
        tick(&mut nav, Some(&hand_at(0.5 - 40.0 / 640.0)), &mut sink);
        assert_eq!(sink.commands, vec![OutputCommand::KeyTap(Key::Right)]);
        assert_eq!(nav.status().phase, Phase::Cooldown);
    }

    #[test]
    fn test_losing_pose_while_active_cools_down() {
        let mut nav = confirmed();
        let mut sink = RecordingSink::new();
        tick(&mut nav, None, &mut sink);
        assert_eq!(nav.status().phase, Phase::Cooldown);
        assert_eq!(nav.status().cooldown_remaining, TimingConfig::default().release_cooldown());
        assert!(sink.commands.is_empty());
    }

    #[test]
    fn test_threshold_scales_with_width() {
        let mut nav = Navigation::new(NavigationConfig::default(), TimingConfig::default());
        let mut sink = RecordingSink::new();
        let h = hand_at(0.5);
        let run = |nav: &mut Navigation, hand: &HandLandmarks, sink: &mut RecordingSink| {
            nav.advance(DT);
            let obs = Observation {
                hand,
                class: two_finger(),
            };
            let mut ctx = TickContext {
                dt: DT,
                width: 1280,
                height: 720,
                sink,
            };
            nav.update(Some(&obs), &mut ctx);
        };
        for _ in 0..3 {
            run(&mut nav, &h, &mut sink);
        }
        // 40px at 1280 wide is under the scaled 60px threshold
        run(&mut nav, &hand_at(0.5 + 40.0 / 1280.0), &mut sink);
        assert!(sink.commands.is_empty());
        run(&mut nav, &hand_at(0.5 + 70.0 / 1280.0), &mut sink);
        assert_eq!(sink.commands, vec![OutputCommand::KeyTap(Key::Left)]);
    }
}
