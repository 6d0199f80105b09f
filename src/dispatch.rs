//! Per-tick arbitration between hands and gestures
//!
//! Each tick the dispatcher classifies up to two hands, decides which hand
//! (if any) drives which gesture, and feeds every state machine exactly once:
//! the assigned hand, or nothing. Rules, in order:
//!
//! 1. No hands: every machine resets (AltTab releases Alt if held).
//! 2. AltTab holding Alt: it gets a hand, everything else gets nothing.
//! 3. Otherwise each hand takes its first match in priority order
//!    MouseMove > Scroll > Navigation > MouseClick > AltTab > VoiceTrigger;
//!    the best of those wins, ties going to the lower slot. The one allowed
//!    pair is a MouseMove winner plus a second hand showing MouseClick.

use std::time::Duration;
use tracing::debug;

use crate::classify::{Classification, Observation};
use crate::config::{ClassifierConfig, Config};
use crate::gesture::{
    AltTab, Gesture, GestureKind, GestureStatus, MouseClick, MouseMove, Navigation, Phase, Scroll,
    TickContext, VoiceTrigger,
};
use crate::input::InputSink;
use crate::landmarks::{Frame, MAX_HANDS};
use crate::voice::VoicePipeline;

/// Which gesture each hand slot drives this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchDecision {
    pub slots: [Option<GestureKind>; MAX_HANDS],
}

impl DispatchDecision {
    pub fn slot_for(&self, kind: GestureKind) -> Option<usize> {
        self.slots.iter().position(|s| *s == Some(kind))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Pick the driving gesture per hand from its classifications
    pub fn arbitrate(classes: &[Classification]) -> Self {
        let mut decision = Self::default();
        let candidates: Vec<(usize, GestureKind)> = classes
            .iter()
            .take(MAX_HANDS)
            .enumerate()
            .filter_map(|(slot, class)| {
                GestureKind::PRIORITY
                    .iter()
                    .find(|k| class.matches(**k))
                    .map(|k| (slot, *k))
            })
            .collect();

        // min_by_key keeps the first of equal keys, i.e. the lower slot
        let Some(&(winner_slot, winner)) = candidates.iter().min_by_key(|(_, k)| k.rank()) else {
            return decision;
        };
        decision.slots[winner_slot] = Some(winner);

        if winner == GestureKind::MouseMove {
            let clicker = classes
                .iter()
                .take(MAX_HANDS)
                .enumerate()
                .find(|(slot, class)| *slot != winner_slot && class.click_pinch);
            if let Some((slot, _)) = clicker {
                decision.slots[slot] = Some(GestureKind::MouseClick);
            }
        }
        decision
    }
}

/// What the engine looked like after a tick, for the optional overlay
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub hands: usize,
    pub decision: DispatchDecision,
    pub gestures: Vec<GestureStatus>,
    pub voice: Option<String>,
}

impl EngineStatus {
    pub fn no_hand(&self) -> bool {
        self.hands == 0
    }

    /// Highest-priority gesture currently Active
    pub fn active(&self) -> Option<GestureKind> {
        self.gestures
            .iter()
            .filter(|g| g.phase == Phase::Active)
            .min_by_key(|g| g.kind.rank())
            .map(|g| g.kind)
    }

    pub fn gesture(&self, kind: GestureKind) -> Option<&GestureStatus> {
        self.gestures.iter().find(|g| g.kind == kind)
    }
}

/// Owns one state machine per gesture kind and drives them every tick
pub struct Dispatcher {
    classifier: ClassifierConfig,
    mouse_move: MouseMove,
    scroll: Scroll,
    navigation: Navigation,
    mouse_click: MouseClick,
    alt_tab: AltTab,
    voice: VoiceTrigger,
    last_decision: DispatchDecision,
}

impl Dispatcher {
    pub fn new(config: &Config, pipeline: Box<dyn VoicePipeline>) -> Self {
        let timing = config.timing.clone();
        Self {
            classifier: config.classifier.clone(),
            mouse_move: MouseMove::new(config.mouse.clone()),
            scroll: Scroll::new(config.scroll.clone(), timing.clone()),
            navigation: Navigation::new(config.navigation.clone(), timing.clone()),
            mouse_click: MouseClick::new(config.click.clone(), timing.clone()),
            alt_tab: AltTab::new(config.alt_tab.clone(), timing),
            voice: VoiceTrigger::new(&config.voice, pipeline),
            last_decision: DispatchDecision::default(),
        }
    }

    /// Machines in priority order
    fn machines(&mut self) -> [&mut dyn Gesture; 6] {
        [
            &mut self.mouse_move,
            &mut self.scroll,
            &mut self.navigation,
            &mut self.mouse_click,
            &mut self.alt_tab,
            &mut self.voice,
        ]
    }

    pub fn alt_tab(&self) -> &AltTab {
        &self.alt_tab
    }

    pub fn mouse_move(&self) -> &MouseMove {
        &self.mouse_move
    }

    pub fn scroll(&self) -> &Scroll {
        &self.scroll
    }

    pub fn voice(&self) -> &VoiceTrigger {
        &self.voice
    }

    pub fn last_decision(&self) -> DispatchDecision {
        self.last_decision
    }

    /// Process one frame. `dt` is the time since the previous tick.
    #[hotpath::measure]
    pub fn tick(&mut self, frame: &Frame, dt: Duration, sink: &mut dyn InputSink) -> EngineStatus {
        for machine in self.machines() {
            machine.advance(dt);
        }
        self.voice.poll(sink);

        if frame.hands.is_empty() {
            if !self.last_decision.is_empty() {
                debug!("no hands, resetting gestures");
            }
            for machine in self.machines() {
                machine.reset(sink);
            }
            self.last_decision = DispatchDecision::default();
            return self.status(0);
        }

        let observations: Vec<Observation<'_>> = frame
            .hands
            .iter()
            .take(MAX_HANDS)
            .map(|hand| Observation::new(hand, &self.classifier))
            .collect();

        let decision = if self.alt_tab.is_holding() {
            // the confirming hand wins, else the first hand with landmarks
            let slot = observations
                .iter()
                .position(|o| o.hand.is_valid() && o.class.confirm_pinch)
                .or_else(|| observations.iter().position(|o| o.hand.is_valid()));
            let mut decision = DispatchDecision::default();
            if let Some(slot) = slot {
                decision.slots[slot] = Some(GestureKind::AltTab);
            }
            decision
        } else {
            let classes: Vec<Classification> = observations.iter().map(|o| o.class).collect();
            DispatchDecision::arbitrate(&classes)
        };
        if decision != self.last_decision {
            debug!(slots = ?decision.slots, "dispatch");
        }
        self.last_decision = decision;

        let mut ctx = TickContext {
            dt,
            width: frame.width,
            height: frame.height,
            sink,
        };
        for machine in self.machines() {
            let observation = decision
                .slot_for(machine.kind())
                .and_then(|slot| observations.get(slot));
            machine.update(observation, &mut ctx);
        }

        self.status(observations.len())
    }

    /// Release anything held before the process exits
    pub fn shutdown(&mut self, sink: &mut dyn InputSink) {
        for machine in self.machines() {
            machine.reset(sink);
        }
        self.last_decision = DispatchDecision::default();
    }

    fn status(&self, hands: usize) -> EngineStatus {
        let gestures = vec![
            self.mouse_move.status(),
            self.scroll.status(),
            self.navigation.status(),
            self.mouse_click.status(),
            self.alt_tab.status(),
            self.voice.status(),
        ];
        EngineStatus {
            hands,
            decision: self.last_decision,
            gestures,
            voice: self.voice.last_message().map(str::to_string),
        }
    }
}
