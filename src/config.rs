use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::input::Key;

pub const DEFAULT_CONFIG_PATH: &str = "handpilot.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub mouse: MouseConfig,
    #[serde(default)]
    pub click: ClickConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub alt_tab: AltTabConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// With no explicit path, `handpilot.toml` in the working directory is used
    /// when present and defaults otherwise. An explicit path must exist.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        use anyhow::Context;

        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

// ============================================================================
// Timing Config
// ============================================================================

/// How the per-tick time step is measured. One scheme drives every timer.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimingScheme {
    /// dt = 1 / fps reported by the frame source
    #[default]
    FrameInterval,
    /// dt = measured time since the previous tick
    WallClock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    #[serde(default)]
    pub scheme: TimingScheme,
    /// Used when the source reports no usable fps
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: f32,
    /// Lockout after any key press, tracked separately from gesture cooldowns
    #[serde(default = "default_action_cooldown_ms")]
    pub action_cooldown_ms: u64,
    /// Cooldown armed when a discrete gesture loses its pose while active
    #[serde(default = "default_release_cooldown_ms")]
    pub release_cooldown_ms: u64,
    /// Frame width the pixel thresholds are expressed against
    #[serde(default = "default_reference_width")]
    pub reference_width: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            scheme: TimingScheme::default(),
            fallback_fps: default_fallback_fps(),
            action_cooldown_ms: default_action_cooldown_ms(),
            release_cooldown_ms: default_release_cooldown_ms(),
            reference_width: default_reference_width(),
        }
    }
}

impl TimingConfig {
    pub fn action_cooldown(&self) -> Duration {
        ms(self.action_cooldown_ms)
    }

    pub fn release_cooldown(&self) -> Duration {
        ms(self.release_cooldown_ms)
    }

    /// Scale a pixel threshold tuned at `reference_width` to the actual frame width
    pub fn scale_px(&self, px: f32, frame_width: u32) -> f32 {
        if self.reference_width <= 0.0 || frame_width == 0 {
            return px;
        }
        px * frame_width as f32 / self.reference_width
    }
}

fn default_fallback_fps() -> f32 {
    30.0
}

fn default_action_cooldown_ms() -> u64 {
    200
}

fn default_release_cooldown_ms() -> u64 {
    150
}

fn default_reference_width() -> f32 {
    640.0
}

// ============================================================================
// Classifier Config
// ============================================================================

/// Geometry thresholds, in normalized image units unless noted
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Thumb-index tip distance for the click pinch
    pub pinch_distance: f32,
    /// Looser thumb-index distance for the AltTab confirm pinch
    pub confirm_pinch_distance: f32,
    /// A finger counts as extended when tip distance exceeds ratio * pip distance
    pub relaxed_extension_ratio: f32,
    /// Accepted angle band (degrees) between the wrist->thumb and wrist->index rays
    pub v_angle_min_deg: f32,
    pub v_angle_max_deg: f32,
    /// Minimum thumb-index separation for the V/L shape
    pub v_min_separation: f32,
    /// Thumb tip within this distance of the middle knuckle counts as tucked
    pub thumb_tuck_distance: f32,
    /// How much farther from the wrist the index tip must be than the others when pointing
    pub pointing_margin: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pinch_distance: 0.05,
            confirm_pinch_distance: 0.1,
            relaxed_extension_ratio: 0.9,
            v_angle_min_deg: 20.0,
            v_angle_max_deg: 120.0,
            v_min_separation: 0.05,
            thumb_tuck_distance: 0.08,
            pointing_margin: 0.05,
        }
    }
}

// ============================================================================
// Gesture Configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub confirm_ms: u64,
    pub cooldown_ms: u64,
    /// Horizontal travel at `reference_width` needed to fire a direction key
    pub movement_threshold_px: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            confirm_ms: 100,
            cooldown_ms: 500,
            movement_threshold_px: 30.0,
        }
    }
}

impl NavigationConfig {
    pub fn confirm_time(&self) -> Duration {
        ms(self.confirm_ms)
    }

    pub fn cooldown(&self) -> Duration {
        ms(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MouseConfig {
    pub confirm_ms: u64,
    /// EMA weight of the previous output (0 = no smoothing)
    pub smoothing: f32,
    pub sensitivity: f32,
    /// Fraction of the camera image ignored on each side
    pub margin: f32,
    pub fallback_screen_width: u32,
    pub fallback_screen_height: u32,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            confirm_ms: 100,
            smoothing: 0.7,
            sensitivity: 1.1,
            margin: 0.2,
            fallback_screen_width: 1920,
            fallback_screen_height: 1080,
        }
    }
}

impl MouseConfig {
    pub fn confirm_time(&self) -> Duration {
        ms(self.confirm_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClickConfig {
    pub confirm_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self {
            confirm_ms: 100,
            cooldown_ms: 500,
        }
    }
}

impl ClickConfig {
    pub fn confirm_time(&self) -> Duration {
        ms(self.confirm_ms)
    }

    pub fn cooldown(&self) -> Duration {
        ms(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub confirm_ms: u64,
    /// Ascending displacement thresholds; level n is reached past the nth entry
    pub levels_px: Vec<f32>,
    /// Repeat interval at level 1, divided by the level above that
    pub base_interval_ms: u64,
    /// Scroll units per emitted command
    pub step: i32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            confirm_ms: 100,
            levels_px: vec![20.0, 40.0, 70.0, 110.0, 160.0],
            base_interval_ms: 240,
            step: 1,
        }
    }
}

impl ScrollConfig {
    pub fn confirm_time(&self) -> Duration {
        ms(self.confirm_ms)
    }

    pub fn base_interval(&self) -> Duration {
        ms(self.base_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AltTabConfig {
    pub confirm_ms: u64,
    pub cooldown_ms: u64,
    /// Displacement bands at `reference_width`; below `near_px` nothing repeats
    pub near_px: f32,
    pub medium_px: f32,
    pub far_px: f32,
    pub slow_ms: u64,
    pub medium_ms: u64,
    pub fast_ms: u64,
    /// Held with no movement for this long cancels and releases Alt
    pub hold_timeout_ms: u64,
    pub confirm_key: Key,
}

impl Default for AltTabConfig {
    fn default() -> Self {
        Self {
            confirm_ms: 300,
            cooldown_ms: 500,
            near_px: 40.0,
            medium_px: 90.0,
            far_px: 150.0,
            slow_ms: 600,
            medium_ms: 350,
            fast_ms: 150,
            hold_timeout_ms: 3000,
            confirm_key: Key::Space,
        }
    }
}

impl AltTabConfig {
    pub fn confirm_time(&self) -> Duration {
        ms(self.confirm_ms)
    }

    pub fn cooldown(&self) -> Duration {
        ms(self.cooldown_ms)
    }

    pub fn hold_timeout(&self) -> Duration {
        ms(self.hold_timeout_ms)
    }
}

// ============================================================================
// Voice Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// Start the microphone/transcription worker (requires the `voice` feature)
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_voice_confirm_ms")]
    pub confirm_ms: u64,
    #[serde(default = "default_voice_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Recording window per trigger
    #[serde(default = "default_record_secs")]
    pub record_secs: f32,
    /// Parakeet model directory
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Global minimum match score (0.0-1.0)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    /// Enable built-in browser commands
    #[serde(default = "default_builtin_commands")]
    pub builtin_commands: bool,
    /// Custom phrase mappings
    #[serde(default)]
    pub commands: Vec<CustomVoiceCommand>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            confirm_ms: default_voice_confirm_ms(),
            cooldown_ms: default_voice_cooldown_ms(),
            record_secs: default_record_secs(),
            model_path: default_model_path(),
            min_confidence: default_min_confidence(),
            builtin_commands: default_builtin_commands(),
            commands: Vec::new(),
        }
    }
}

impl VoiceConfig {
    pub fn confirm_time(&self) -> Duration {
        ms(self.confirm_ms)
    }

    pub fn cooldown(&self) -> Duration {
        ms(self.cooldown_ms)
    }

    /// Clamped to 0.1..=60s; unusable values get the default
    pub fn record_duration(&self) -> Duration {
        Duration::try_from_secs_f32(self.record_secs.clamp(0.1, 60.0))
            .unwrap_or(Duration::from_secs_f32(default_record_secs()))
    }
}

/// A spoken phrase bound to keys and/or typed text
#[derive(Debug, Clone, Deserialize)]
pub struct CustomVoiceCommand {
    pub phrase: String,
    /// Key combo such as "ctrl+shift+t"
    #[serde(default)]
    pub keys: Option<String>,
    /// Text typed after the combo
    #[serde(default)]
    pub text: Option<String>,
    /// Press Enter after typing
    #[serde(default)]
    pub enter: bool,
    /// Per-command minimum score, raises the global one
    #[serde(default)]
    pub threshold: Option<f32>,
}

fn default_voice_confirm_ms() -> u64 {
    500
}

fn default_voice_cooldown_ms() -> u64 {
    1000
}

fn default_record_secs() -> f32 {
    3.0
}

fn default_model_path() -> String {
    "models/parakeet-tdt-0.6b-v3-int8".to_string()
}

fn default_min_confidence() -> f32 {
    0.6
}

fn default_builtin_commands() -> bool {
    true
}

// ============================================================================
// UI Config
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    /// Draw the one-line gesture status on stdout
    #[serde(default = "default_status_line")]
    pub status_line: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_line: default_status_line(),
        }
    }
}

fn default_status_line() -> bool {
    true
}
