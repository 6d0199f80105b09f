//! Closed-fist hold starts one voice command cycle

use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Gesture, GestureKind, GestureState, GestureStatus, Step, TickContext};
use crate::classify::Observation;
use crate::config::VoiceConfig;
use crate::input::{InputSink, emit_all};
use crate::voice::{VoiceOutcome, VoicePipeline};

#[derive(Debug, Default, Clone, Copy)]
struct Latch {
    /// start() succeeded; ignore the fist until the cycle finishes
    latched: bool,
}

pub struct VoiceTrigger {
    state: GestureState<Latch>,
    cooldown: Duration,
    pipeline: Box<dyn VoicePipeline>,
    last_message: Option<String>,
}

impl VoiceTrigger {
    pub fn new(config: &VoiceConfig, pipeline: Box<dyn VoicePipeline>) -> Self {
        Self {
            state: GestureState::new(GestureKind::VoiceTrigger, config.confirm_time()),
            cooldown: config.cooldown(),
            pipeline,
            last_message: None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.state.payload.latched
    }

    /// Most recent voice result or refusal, for the status line
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Drain finished cycles and run matched commands through this tick's sink
    pub fn poll(&mut self, sink: &mut dyn InputSink) {
        while let Some(outcome) = self.pipeline.try_outcome() {
            match outcome {
                VoiceOutcome::Matched {
                    transcript,
                    phrase,
                    confidence,
                    commands,
                } => {
                    info!(%transcript, %phrase, confidence, "voice command");
                    emit_all(sink, commands);
                    self.last_message = Some(format!("{} ({:.0}%)", phrase, confidence * 100.0));
                }
                VoiceOutcome::NoMatch { transcript } => {
                    info!(%transcript, "voice: no matching command");
                    self.last_message = Some(format!("no match: {}", transcript));
                }
                VoiceOutcome::Failed(e) => {
                    warn!("voice: {}", e);
                    self.last_message = Some(e.to_string());
                }
            }
        }
    }

    fn trigger(&mut self) {
        if !self.pipeline.is_ready() {
            warn!("voice trigger ignored: pipeline not ready");
            self.last_message = Some("voice not ready".to_string());
            self.state.fire(self.cooldown);
            return;
        }
        if self.pipeline.is_busy() {
            debug!("voice trigger ignored: pipeline busy");
            self.state.fire(self.cooldown);
            return;
        }
        match self.pipeline.start() {
            Ok(()) => {
                info!("voice: listening");
                self.last_message = Some("listening...".to_string());
                self.state.payload.latched = true;
                self.state.arm_cooldown(self.cooldown);
            }
            Err(e) => {
                warn!("voice trigger failed: {}", e);
                self.last_message = Some(e.to_string());
                self.state.fire(self.cooldown);
            }
        }
    }
}

impl Gesture for VoiceTrigger {
    fn kind(&self) -> GestureKind {
        GestureKind::VoiceTrigger
    }

    fn advance(&mut self, dt: Duration) {
        self.state.advance(dt);
    }

    fn update(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>) {
        if self.state.payload.latched {
            if !self.pipeline.is_busy() && self.state.cooldown_remaining().is_zero() {
                debug!("voice trigger unlatched");
                self.state.release();
            }
            return;
        }
        let matched = observation.is_some_and(|o| o.class.closed_fist);
        match self.state.observe(matched, ctx.dt) {
            Step::Confirmed => self.trigger(),
            Step::Held | Step::Lost => self.state.release(),
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
