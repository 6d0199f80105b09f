//! Continuous-control mappers
//!
//! Turn analog hand positions into cursor coordinates, scroll intensities
//! and key-repeat intervals. All mappings here are pure functions of their
//! current input (plus the EMA's previous output), so returning a hand to a
//! position always reproduces the same result.

use std::time::Duration;

/// Exponential moving average over a 2-D point
///
/// `out = out * alpha + target * (1 - alpha)`; alpha 0 disables smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ema {
    alpha: f32,
    value: Option<(f32, f32)>,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 0.99),
            value: None,
        }
    }

    /// Feed a target; the first sample seeds the filter
    pub fn apply(&mut self, target: (f32, f32)) -> (f32, f32) {
        let next = match self.value {
            None => target,
            Some((x, y)) => (
                x * self.alpha + target.0 * (1.0 - self.alpha),
                y * self.alpha + target.1 * (1.0 - self.alpha),
            ),
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<(f32, f32)> {
        self.value
    }

    /// Start from a known point instead of the first target
    pub fn seed(&mut self, value: (f32, f32)) {
        self.value = Some(value);
    }
}

/// Camera-to-screen remap for cursor control
///
/// Only the central sub-rectangle `[margin, 1 - margin]` of the camera image
/// is used, so the whole screen is reachable without the fingertip leaving
/// the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMapper {
    pub margin: f32,
    pub sensitivity: f32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl ScreenMapper {
    pub fn new(margin: f32, sensitivity: f32, screen_width: u32, screen_height: u32) -> Self {
        Self {
            margin: margin.clamp(0.0, 0.45),
            sensitivity,
            screen_width,
            screen_height,
        }
    }

    /// Normalized camera point to screen pixels
    pub fn map(&self, x: f32, y: f32) -> (f32, f32) {
        let lo = self.margin;
        let hi = 1.0 - self.margin;
        let span = hi - lo;
        let nx = (x.clamp(lo, hi) - lo) / span;
        let ny = (y.clamp(lo, hi) - lo) / span;
        let max_x = self.screen_width.saturating_sub(1) as f32;
        let max_y = self.screen_height.saturating_sub(1) as f32;
        (
            (nx * self.screen_width as f32 * self.sensitivity).clamp(0.0, max_x),
            (ny * self.screen_height as f32 * self.sensitivity).clamp(0.0, max_y),
        )
    }
}

/// Displacement buckets for scrolling
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityLevels {
    thresholds: Vec<f32>,
}

impl IntensityLevels {
    pub fn new(mut thresholds: Vec<f32>) -> Self {
        thresholds.retain(|t| t.is_finite() && *t >= 0.0);
        thresholds.sort_by(|a, b| a.total_cmp(b));
        Self { thresholds }
    }

    /// Number of thresholds `displacement` exceeds (0 = dead zone)
    pub fn level(&self, displacement: f32, scale: f32) -> u32 {
        let d = displacement.abs();
        self.thresholds.iter().filter(|t| d > **t * scale).count() as u32
    }

    /// Repeat interval at `level`, shrinking as intensity grows
    pub fn interval(base: Duration, level: u32) -> Option<Duration> {
        if level == 0 {
            return None;
        }
        Some(base / level)
    }
}

/// Three-band auto-repeat: near/medium/far distance to slow/medium/fast interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepeatBands {
    pub near_px: f32,
    pub medium_px: f32,
    pub far_px: f32,
    pub slow: Duration,
    pub medium: Duration,
    pub fast: Duration,
}

impl RepeatBands {
    /// Repeat interval for a displacement, `None` inside the dead zone
    pub fn interval(&self, displacement: f32, scale: f32) -> Option<Duration> {
        let d = displacement.abs();
        if d > self.far_px * scale {
            Some(self.fast)
        } else if d > self.medium_px * scale {
            Some(self.medium)
        } else if d > self.near_px * scale {
            Some(self.slow)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_converges_to_constant_input() {
        let mut ema = Ema::new(0.7);
        ema.apply((0.0, 0.0));
        let mut prev_gap = f32::MAX;
        let mut last = (0.0, 0.0);
        for _ in 0..200 {
            last = ema.apply((500.0, 300.0));
            let gap = (500.0 - last.0).abs();
            assert!(gap <= prev_gap, "EMA must approach monotonically");
            prev_gap = gap;
        }
        assert!((last.0 - 500.0).abs() < 0.01);
        assert!((last.1 - 300.0).abs() < 0.01);
        // fixed point stays put
        let again = ema.apply((500.0, 300.0));
        assert!((again.0 - last.0).abs() < 0.01);
    }

    #[test]
    fn test_ema_first_sample_seeds() {
        let mut ema = Ema::new(0.7);
        assert_eq!(ema.apply((10.0, 20.0)), (10.0, 20.0));
        let next = ema.apply((20.0, 20.0));
        assert!((next.0 - 13.0).abs() < 1e-4);
    }

    #[test]
    fn test_ema_explicit_seed_smooths_first_sample() {
        let mut ema = Ema::new(0.5);
        ema.seed((0.0, 100.0));
        assert_eq!(ema.apply((100.0, 100.0)), (50.0, 100.0));
    }

    #[test]
    fn test_screen_mapper_clamps_margin() {
        let m = ScreenMapper::new(0.2, 1.0, 1920, 1080);
        assert_eq!(m.map(0.1, 0.1), (0.0, 0.0));
        let (x, y) = m.map(0.5, 0.5);
        assert!((x - 960.0).abs() < 0.01);
        assert!((y - 540.0).abs() < 0.01);
        assert_eq!(m.map(0.95, 0.95), (1919.0, 1079.0));
    }

    #[test]
    fn test_screen_mapper_sensitivity_stays_on_screen() {
        let m = ScreenMapper::new(0.2, 1.5, 1920, 1080);
        let (x, _) = m.map(0.7, 0.5);
        assert!(x <= 1919.0);
    }

    #[test]
    fn test_intensity_levels() {
        let levels = IntensityLevels::new(vec![40.0, 20.0, 70.0]);
        assert_eq!(levels.level(10.0, 1.0), 0);
        assert_eq!(levels.level(-25.0, 1.0), 1);
        assert_eq!(levels.level(50.0, 1.0), 2);
        assert_eq!(levels.level(500.0, 1.0), 3);
        assert_eq!(levels.level(25.0, 2.0), 0);
    }

    #[test]
    fn test_interval_shrinks_with_level() {
        let base = Duration::from_millis(240);
        assert_eq!(IntensityLevels::interval(base, 0), None);
        assert_eq!(IntensityLevels::interval(base, 1), Some(base));
        assert_eq!(IntensityLevels::interval(base, 3), Some(Duration::from_millis(80)));
    }

    #[test]
    fn test_repeat_bands() {
        let bands = RepeatBands {
            near_px: 40.0,
            medium_px: 90.0,
            far_px: 150.0,
            slow: Duration::from_millis(600),
            medium: Duration::from_millis(350),
            fast: Duration::from_millis(150),
        };
        assert_eq!(bands.interval(10.0, 1.0), None);
        assert_eq!(bands.interval(-50.0, 1.0), Some(bands.slow));
        assert_eq!(bands.interval(100.0, 1.0), Some(bands.medium));
        assert_eq!(bands.interval(-200.0, 1.0), Some(bands.fast));
    }
}
