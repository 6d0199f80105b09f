//! Open-hand window switcher
//!
//! Confirming an open hand presses and holds Alt and taps Tab. While Alt is
//! held the hand's horizontal offset from where the hold started drives
//! auto-repeated Left/Right taps, faster the further it moves. A loose
//! thumb-index pinch releases Alt on the selected window and taps the
//! confirm key. Holding still for too long, or losing every hand, releases
//! Alt without confirming.

use std::time::Duration;
use tracing::{debug, info};

use super::{Countdown, Gesture, GestureKind, GestureState, GestureStatus, Step, TickContext};
use crate::classify::Observation;
use crate::config::{AltTabConfig, TimingConfig};
use crate::input::{InputSink, Key, OutputCommand, emit};
use crate::mapping::RepeatBands;

#[derive(Debug, Default, Clone, Copy)]
struct Hold {
    reference_x: f32,
    repeat: Countdown,
    interval: Option<Duration>,
    waiting: Duration,
}

pub struct AltTab {
    state: GestureState<Hold>,
    config: AltTabConfig,
    timing: TimingConfig,
    bands: RepeatBands,
}

impl AltTab {
    pub fn new(config: AltTabConfig, timing: TimingConfig) -> Self {
        let bands = RepeatBands {
            near_px: config.near_px,
            medium_px: config.medium_px,
            far_px: config.far_px,
            slow: Duration::from_millis(config.slow_ms),
            medium: Duration::from_millis(config.medium_ms),
            fast: Duration::from_millis(config.fast_ms),
        };
        Self {
            state: GestureState::new(GestureKind::AltTab, config.confirm_time()),
            config,
            timing,
            bands,
        }
    }

    /// Alt is currently held down
    pub fn is_holding(&self) -> bool {
        self.state.is_active()
    }

    /// Repeat interval picked on the last held tick, `None` in the dead zone
    pub fn repeat_interval(&self) -> Option<Duration> {
        self.state.payload.interval
    }

    fn begin_hold(&mut self, observation: &Observation<'_>, ctx: &mut TickContext<'_>) {
        info!("alt-tab: hold");
        emit(ctx.sink, OutputCommand::KeyHold(Key::Alt));
        emit(ctx.sink, OutputCommand::KeyTap(Key::Tab));
        self.state.arm_action_cooldown(self.timing.action_cooldown());
        self.state.payload.reference_x = ctx.px_x(observation.hand.wrist().x);
    }

    fn update_held(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>) {
        // an invalid hand has no usable wrist position
        let Some(o) = observation.filter(|o| o.hand.is_valid()) else {
            self.wait(ctx);
            return;
        };

        if o.class.confirm_pinch && self.state.action_ready() {
            info!(key = %self.config.confirm_key, "alt-tab: confirm");
            emit(ctx.sink, OutputCommand::KeyRelease(Key::Alt));
            emit(ctx.sink, OutputCommand::KeyTap(self.config.confirm_key));
            self.state.arm_action_cooldown(self.timing.action_cooldown());
            self.state.fire(self.config.cooldown());
            return;
        }

        let dx = ctx.px_x(o.hand.wrist().x) - self.state.payload.reference_x;
        let scale = self.timing.scale_px(1.0, ctx.width);
        let interval = self.bands.interval(dx, scale);
        let hold = &mut self.state.payload;
        if hold.interval != interval {
            debug!(?interval, dx, "alt-tab repeat band");
        }
        hold.interval = interval;

        let Some(interval) = interval else {
            hold.repeat.clear();
            self.wait(ctx);
            return;
        };
        hold.waiting = Duration::ZERO;
        if hold.repeat.is_running() {
            return;
        }
        let key = if dx > 0.0 { Key::Right } else { Key::Left };
        emit(ctx.sink, OutputCommand::KeyTap(key));
        hold.repeat.arm(interval.max(ctx.dt));
    }

    /// Held with nothing happening; give up after the timeout
    fn wait(&mut self, ctx: &mut TickContext<'_>) {
        self.state.payload.waiting += ctx.dt;
        if self.state.payload.waiting < self.config.hold_timeout() {
            return;
        }
        info!("alt-tab: timed out, releasing alt");
        emit(ctx.sink, OutputCommand::KeyRelease(Key::Alt));
        self.state.fire(self.timing.release_cooldown());
    }
}

impl Gesture for AltTab {
    fn kind(&self) -> GestureKind {
        GestureKind::AltTab
    }

    fn advance(&mut self, dt: Duration) {
        self.state.advance(dt);
        self.state.payload.repeat.advance(dt);
    }

    fn update(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>) {
        if self.state.is_active() {
            self.update_held(observation, ctx);
            return;
        }
        let matched = observation.is_some_and(|o| o.class.open_hand);
        if let (Step::Confirmed, Some(o)) = (self.state.observe(matched, ctx.dt), observation) {
            self.begin_hold(o, ctx);
        }
    }

    fn reset(&mut self, sink: &mut dyn InputSink) {
        if self.state.is_active() {
            info!("alt-tab: hand lost, releasing alt");
            emit(sink, OutputCommand::KeyRelease(Key::Alt));
        }
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
    use crate::landmarks::{HandLandmarks, LANDMARK_COUNT, Point3};

    const DT: Duration = Duration::from_millis(50);

    fn wrist_at(x: f32) -> HandLandmarks {
        HandLandmarks::new([Point3::new(x, 0.8, 0.0); LANDMARK_COUNT])
    }

    fn open() -> Classification {
        Classification {
            open_hand: true,
            ..Classification::default()
        }
    }

    fn pinch() -> Classification {
        Classification {
            confirm_pinch: true,
            ..Classification::default()
        }
    }

    fn tick(a: &mut AltTab, hand: &HandLandmarks, class: Classification, sink: &mut RecordingSink) {
        a.advance(DT);
        let obs = Observation { hand, class };
        let mut ctx = TickContext {
            dt: DT,
            width: 640,
            height: 480,
            sink,
        };
        a.update(Some(&obs), &mut ctx);
    }

    fn holding(sink: &mut RecordingSink) -> AltTab {
        let mut a = AltTab::new(AltTabConfig::default(), TimingConfig::default());
        let h = wrist_at(0.5);
        // 300ms confirm at 50ms ticks
        for _ in 0..7 {
            tick(&mut a, &h, open(), sink);
        }
        assert!(a.is_holding());
        a
    }

    #[test]
    fn test_confirm_holds_alt_and_taps_tab() {
        let mut sink = RecordingSink::new();
        let _a = holding(&mut sink);
        assert_eq!(
            sink.commands,
            vec![
                OutputCommand::KeyHold(Key::Alt),
                OutputCommand::KeyTap(Key::Tab)
            ]
        );
    }

    #[test]
    fn test_pre_hold_pose_loss_cancels() {
        let mut a = AltTab::new(AltTabConfig::default(), TimingConfig::default());
        let mut sink = RecordingSink::new();
        let h = wrist_at(0.5);
        for _ in 0..4 {
            tick(&mut a, &h, open(), &mut sink);
        }
        assert_eq!(a.status().phase, Phase::Confirming);
        tick(&mut a, &h, Classification::default(), &mut sink);
        assert_eq!(a.status().phase, Phase::Idle);
        assert!(sink.commands.is_empty());
    }

    #[test]
    fn test_bands_pick_repeat_interval() {
        let mut sink = RecordingSink::new();
        let mut a = holding(&mut sink);
        tick(&mut a, &wrist_at(0.5 + 60.0 / 640.0), open(), &mut sink);
        assert_eq!(a.repeat_interval(), Some(Duration::from_millis(600)));
        tick(&mut a, &wrist_at(0.5 + 120.0 / 640.0), open(), &mut sink);
        assert_eq!(a.repeat_interval(), Some(Duration::from_millis(350)));
        tick(&mut a, &wrist_at(0.5 - 200.0 / 640.0), open(), &mut sink);
        assert_eq!(a.repeat_interval(), Some(Duration::from_millis(150)));
        tick(&mut a, &wrist_at(0.5), open(), &mut sink);
        assert_eq!(a.repeat_interval(), None);
    }

    #[test]
    fn test_far_band_repeats_direction_key() {
        let mut sink = RecordingSink::new();
        let mut a = holding(&mut sink);
        sink.take();
        let far_right = wrist_at(0.5 + 200.0 / 640.0);
        for _ in 0..12 {
            tick(&mut a, &far_right, open(), &mut sink);
        }
        // 150ms at 50ms ticks: every third tick
        assert_eq!(sink.count(|c| *c == OutputCommand::KeyTap(Key::Right)), 4);
        assert_eq!(sink.commands.len(), 4);
    }

    #[test]
    fn test_pinch_releases_and_confirms() {
        let mut sink = RecordingSink::new();
        let mut a = holding(&mut sink);
        sink.take();
        // action cooldown from the Tab tap still running
        tick(&mut a, &wrist_at(0.5), pinch(), &mut sink);
        tick(&mut a, &wrist_at(0.5), pinch(), &mut sink);
        tick(&mut a, &wrist_at(0.5), pinch(), &mut sink);
        tick(&mut a, &wrist_at(0.5), pinch(), &mut sink);
        assert_eq!(
            sink.commands,
            vec![
                OutputCommand::KeyRelease(Key::Alt),
                OutputCommand::KeyTap(Key::Space)
            ]
        );
        assert!(!a.is_holding());
        assert_eq!(a.status().phase, Phase::Cooldown);
    }

    #[test]
    fn test_idle_timeout_releases_alt() {
        let mut sink = RecordingSink::new();
        let mut a = holding(&mut sink);
        sink.take();
        let still = wrist_at(0.5);
        for _ in 0..59 {
            tick(&mut a, &still, open(), &mut sink);
        }
        assert!(a.is_holding());
        tick(&mut a, &still, open(), &mut sink);
        assert!(!a.is_holding());
        assert_eq!(sink.commands, vec![OutputCommand::KeyRelease(Key::Alt)]);
    }

    #[test]
    fn test_invalid_hand_while_holding_only_waits() {
        let mut sink = RecordingSink::new();
        let mut a = holding(&mut sink);
        sink.take();
        // zeroed wrist would read as a far-left swipe
        let lost = HandLandmarks::invalid();
        for _ in 0..59 {
            tick(&mut a, &lost, pinch(), &mut sink);
        }
        assert!(a.is_holding());
        assert!(sink.commands.is_empty(), "{:?}", sink.commands);
        tick(&mut a, &lost, open(), &mut sink);
        assert_eq!(sink.commands, vec![OutputCommand::KeyRelease(Key::Alt)]);
    }

    #[test]
    fn test_reset_while_holding_releases_alt() {
        let mut sink = RecordingSink::new();
        let mut a = holding(&mut sink);
        sink.take();
        a.reset(&mut sink);
        assert_eq!(sink.commands, vec![OutputCommand::KeyRelease(Key::Alt)]);
        assert_eq!(a.status().phase, Phase::Idle);

        // not holding: nothing to release
        a.reset(&mut sink);
        assert_eq!(sink.commands.len(), 1);
    }
}
