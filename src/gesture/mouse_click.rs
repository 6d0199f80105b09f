//! Thumb-index pinch: one left click per confirmation

use std::time::Duration;
use tracing::info;

use super::{Gesture, GestureKind, GestureState, GestureStatus, Step, TickContext};
use crate::classify::Observation;
use crate::config::{ClickConfig, TimingConfig};
use crate::input::{InputSink, MouseButton, OutputCommand, emit};

pub struct MouseClick {
    state: GestureState<()>,
    config: ClickConfig,
    timing: TimingConfig,
}

impl MouseClick {
    pub fn new(config: ClickConfig, timing: TimingConfig) -> Self {
        Self {
            state: GestureState::new(GestureKind::MouseClick, config.confirm_time()),
            config,
            timing,
        }
    }
}

impl Gesture for MouseClick {
    fn kind(&self) -> GestureKind {
        GestureKind::MouseClick
    }

    fn advance(&mut self, dt: Duration) {
        self.state.advance(dt);
    }

    fn update(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>) {
        let matched = observation.is_some_and(|o| o.class.click_pinch);
        match self.state.observe(matched, ctx.dt) {
            Step::Confirmed | Step::Held => {
                info!("click");
                emit(ctx.sink, OutputCommand::MouseClick(MouseButton::Left));
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
