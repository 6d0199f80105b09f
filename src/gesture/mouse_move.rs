//! Index-finger cursor control with EMA smoothing

use std::time::Duration;
use tracing::debug;

use super::{Gesture, GestureKind, GestureState, GestureStatus, Step, TickContext};
use crate::classify::Observation;
use crate::config::MouseConfig;
use crate::input::{InputSink, OutputCommand, emit};
use crate::landmarks::INDEX_TIP;
use crate::mapping::{Ema, ScreenMapper};

#[derive(Debug, Clone, Copy)]
struct Tracking {
    smoothed: Ema,
    last_emitted: Option<(i32, i32)>,
}

impl Default for Tracking {
    fn default() -> Self {
        Self {
            smoothed: Ema::new(0.0),
            last_emitted: None,
        }
    }
}

pub struct MouseMove {
    state: GestureState<Tracking>,
    config: MouseConfig,
    /// Resolved on first confirmation, then reused
    mapper: Option<ScreenMapper>,
}

impl MouseMove {
    pub fn new(config: MouseConfig) -> Self {
        Self {
            state: GestureState::new(GestureKind::MouseMove, config.confirm_time()),
            config,
            mapper: None,
        }
    }

    fn mapper(&mut self, sink: &mut dyn InputSink) -> ScreenMapper {
        if let Some(mapper) = self.mapper {
            return mapper;
        }
        let (w, h) = sink.screen_size().unwrap_or((
            self.config.fallback_screen_width,
            self.config.fallback_screen_height,
        ));
        debug!(width = w, height = h, "screen size");
        let mapper = ScreenMapper::new(self.config.margin, self.config.sensitivity, w, h);
        self.mapper = Some(mapper);
        mapper
    }

    /// Current smoothed cursor position, if tracking
    pub fn position(&self) -> Option<(f32, f32)> {
        self.state.payload.smoothed.value()
    }

    fn track(&mut self, observation: &Observation<'_>, sink: &mut dyn InputSink) {
        let mapper = self.mapper(sink);
        let tip = observation.hand.point(INDEX_TIP);
        let target = mapper.map(tip.x, tip.y);
        let (x, y) = self.state.payload.smoothed.apply(target);
        let pos = (x.round() as i32, y.round() as i32);
        if self.state.payload.last_emitted == Some(pos) {
            return;
        }
        self.state.payload.last_emitted = Some(pos);
        emit(sink, OutputCommand::MouseMoveAbsolute { x: pos.0, y: pos.1 });
    }
}

impl Gesture for MouseMove {
    fn kind(&self) -> GestureKind {
        GestureKind::MouseMove
    }

    fn advance(&mut self, dt: Duration) {
        self.state.advance(dt);
    }

    fn update(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>) {
        let matched = observation.is_some_and(|o| o.class.pointing);
        match (self.state.observe(matched, ctx.dt), observation) {
            (Step::Confirmed, Some(o)) => {
                let mut smoothed = Ema::new(self.config.smoothing);
                // glide from the real pointer rather than jumping to the fingertip
                if let Some((x, y)) = ctx.sink.cursor_position() {
                    smoothed.seed((x as f32, y as f32));
                }
                self.state.payload.smoothed = smoothed;
                self.track(o, ctx.sink);
            }
            (Step::Held, Some(o)) => self.track(o, ctx.sink),
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
