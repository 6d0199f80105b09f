//! Gesture state machines
//!
//! Every gesture kind runs the same timing skeleton,
//! Idle → Confirming → Active → Cooldown → Idle, held in a
//! [`GestureState`]. The per-kind modules layer their own payload and
//! Active behavior on top and implement [`Gesture`] so the dispatcher can
//! drive them uniformly.
//!
//! All timers advance by the single `dt` the dispatcher receives per tick.

pub mod alt_tab;
pub mod mouse_click;
pub mod mouse_move;
pub mod navigation;
pub mod scroll;
pub mod voice_trigger;

use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::classify::Observation;
use crate::input::InputSink;

pub use alt_tab::AltTab;
pub use mouse_click::MouseClick;
pub use mouse_move::MouseMove;
pub use navigation::Navigation;
pub use scroll::Scroll;
pub use voice_trigger::VoiceTrigger;

// ── Kinds ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Navigation,
    MouseMove,
    MouseClick,
    Scroll,
    AltTab,
    VoiceTrigger,
}

impl GestureKind {
    /// Arbitration order, highest first
    pub const PRIORITY: [GestureKind; 6] = [
        GestureKind::MouseMove,
        GestureKind::Scroll,
        GestureKind::Navigation,
        GestureKind::MouseClick,
        GestureKind::AltTab,
        GestureKind::VoiceTrigger,
    ];

    /// Position in [`Self::PRIORITY`]; lower wins
    pub fn rank(self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|k| *k == self)
            .unwrap_or(Self::PRIORITY.len())
    }

    pub fn name(self) -> &'static str {
        match self {
            GestureKind::Navigation => "navigation",
            GestureKind::MouseMove => "mouse-move",
            GestureKind::MouseClick => "mouse-click",
            GestureKind::Scroll => "scroll",
            GestureKind::AltTab => "alt-tab",
            GestureKind::VoiceTrigger => "voice",
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Confirming,
    Active,
    Cooldown,
}

// ── Timers ──────────────────────────────────────────────────

/// Time left on a one-shot timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: Duration,
}

impl Countdown {
    pub fn arm(&mut self, duration: Duration) {
        self.remaining = duration;
    }

    pub fn advance(&mut self, dt: Duration) {
        self.remaining = self.remaining.saturating_sub(dt);
    }

    pub fn clear(&mut self) {
        self.remaining = Duration::ZERO;
    }

    pub fn is_running(&self) -> bool {
        !self.remaining.is_zero()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }
}

// ── Generic machine ─────────────────────────────────────────

/// Result of feeding one classifier reading into a [`GestureState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing in progress
    Idle,
    /// Cooldown still running, reading ignored
    Blocked,
    /// Pose held, not yet long enough
    Confirming,
    /// Became Active on this tick
    Confirmed,
    /// Already Active and the pose is still there
    Held,
    /// Was Active and the pose is gone
    Lost,
}

/// Timing state shared by every gesture kind
///
/// `payload` carries the kind's continuation data (reference points,
/// smoothed positions). It is always initialized and goes back to
/// `P::default()` whenever the machine leaves Active.
#[derive(Debug, Clone)]
pub struct GestureState<P> {
    kind: GestureKind,
    phase: Phase,
    progress: Duration,
    confirm_time: Duration,
    cooldown: Countdown,
    action_cooldown: Countdown,
    pub payload: P,
}

impl<P: Default> GestureState<P> {
    pub fn new(kind: GestureKind, confirm_time: Duration) -> Self {
        Self {
            kind,
            phase: Phase::Idle,
            progress: Duration::ZERO,
            confirm_time,
            cooldown: Countdown::default(),
            action_cooldown: Countdown::default(),
            payload: P::default(),
        }
    }

    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> Duration {
        self.progress
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn cooldown_remaining(&self) -> Duration {
        self.cooldown.remaining()
    }

    /// Whether the short post-keypress lockout has passed
    pub fn action_ready(&self) -> bool {
        !self.action_cooldown.is_running()
    }

    pub fn arm_action_cooldown(&mut self, duration: Duration) {
        self.action_cooldown.arm(duration);
    }

    /// Arm the gesture cooldown without leaving the current phase
    pub fn arm_cooldown(&mut self, duration: Duration) {
        self.cooldown.arm(duration);
    }

    /// Run down cooldowns. Called every tick, assigned or not.
    pub fn advance(&mut self, dt: Duration) {
        self.cooldown.advance(dt);
        self.action_cooldown.advance(dt);
        if self.phase == Phase::Cooldown && !self.cooldown.is_running() {
            debug!(kind = %self.kind, "cooldown expired");
            self.phase = Phase::Idle;
        }
    }

    /// Feed one classifier reading
    ///
    /// The first positive reading only starts the timer; each further one adds
    /// `dt`. Any negative reading before completion drops all progress.
    pub fn observe(&mut self, matched: bool, dt: Duration) -> Step {
        if self.phase == Phase::Active {
            return if matched { Step::Held } else { Step::Lost };
        }
        if self.cooldown.is_running() {
            return Step::Blocked;
        }
        match (self.phase, matched) {
            (_, false) => {
                if self.phase == Phase::Confirming {
                    debug!(kind = %self.kind, "confirmation dropped");
                }
                self.phase = Phase::Idle;
                self.progress = Duration::ZERO;
                Step::Idle
            }
            (Phase::Confirming, true) => {
                self.progress += dt;
                if self.progress >= self.confirm_time {
                    debug!(kind = %self.kind, progress = ?self.progress, "confirmed");
                    self.phase = Phase::Active;
                    Step::Confirmed
                } else {
                    Step::Confirming
                }
            }
            (_, true) => {
                self.phase = Phase::Confirming;
                self.progress = Duration::ZERO;
                if self.confirm_time.is_zero() {
                    self.phase = Phase::Active;
                    return Step::Confirmed;
                }
                Step::Confirming
            }
        }
    }

    /// Active → Idle for continuous kinds; may re-confirm immediately
    pub fn release(&mut self) {
        debug!(kind = %self.kind, "released");
        self.phase = Phase::Idle;
        self.progress = Duration::ZERO;
        self.payload = P::default();
    }

    /// Active → Cooldown after a discrete action (or a defensive release)
    pub fn fire(&mut self, cooldown: Duration) {
        debug!(kind = %self.kind, ?cooldown, "cooldown armed");
        self.cooldown.arm(cooldown);
        self.phase = if cooldown.is_zero() {
            Phase::Idle
        } else {
            Phase::Cooldown
        };
        self.progress = Duration::ZERO;
        self.payload = P::default();
    }

    /// Hand absence: drop progress and payload
    ///
    /// Running cooldowns keep counting so a dropped frame cannot shortcut them.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.progress = Duration::ZERO;
        self.payload = P::default();
    }

    /// Fraction of the confirmation window completed
    pub fn confirmation(&self) -> f32 {
        match self.phase {
            Phase::Active => 1.0,
            Phase::Confirming if !self.confirm_time.is_zero() => {
                (self.progress.as_secs_f32() / self.confirm_time.as_secs_f32()).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    pub fn status(&self) -> GestureStatus {
        GestureStatus {
            kind: self.kind,
            phase: self.phase,
            confirmation: self.confirmation(),
            cooldown_remaining: self.cooldown.remaining(),
        }
    }
}

/// Diagnostic snapshot of one kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureStatus {
    pub kind: GestureKind,
    pub phase: Phase,
    pub confirmation: f32,
    pub cooldown_remaining: Duration,
}

// ── Driving interface ───────────────────────────────────────

/// What a state machine may touch during one tick
pub struct TickContext<'a> {
    pub dt: Duration,
    pub width: u32,
    pub height: u32,
    pub sink: &'a mut dyn InputSink,
}

impl TickContext<'_> {
    /// Normalized x to frame pixels
    pub fn px_x(&self, x: f32) -> f32 {
        x * self.width as f32
    }

    /// Normalized y to frame pixels
    pub fn px_y(&self, y: f32) -> f32 {
        y * self.height as f32
    }
}

pub trait Gesture {
    fn kind(&self) -> GestureKind;

    /// Run down this kind's timers by one tick
    fn advance(&mut self, dt: Duration);

    /// Feed this tick's hand, or `None` when the kind has no hand this tick
    fn update(&mut self, observation: Option<&Observation<'_>>, ctx: &mut TickContext<'_>);

    /// All hands gone
    fn reset(&mut self, sink: &mut dyn InputSink);

    fn status(&self) -> GestureStatus;
}
