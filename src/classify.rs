//! Pose classifiers
//!
//! Pure predicates over one hand's landmarks. Nothing here keeps state:
//! confirmation counts consecutive positive ticks, so the same input must
//! always give the same answer. Invalid hands classify as nothing.
//!
//! Finger extension prefers distance-from-wrist (tip farther than the PIP
//! joint) because it survives hand rotation; the y comparison is only mixed
//! in where a pose needs the stricter or the looser reading.

use crate::config::ClassifierConfig;
use crate::gesture::GestureKind;
use crate::landmarks::{
    Finger, HandLandmarks, INDEX_TIP, MIDDLE_MCP, MIDDLE_TIP, PINKY_TIP, RING_TIP,
    THUMB_IP, THUMB_TIP, WRIST,
};

// ── Per-finger tests ────────────────────────────────────────

/// Tip farther from the wrist than the PIP joint
pub fn extended(hand: &HandLandmarks, finger: Finger) -> bool {
    hand.wrist_distance(finger.tip()) > hand.wrist_distance(finger.pip())
}

/// Tip above the PIP joint in image space
pub fn raised(hand: &HandLandmarks, finger: Finger) -> bool {
    hand.point(finger.tip()).y < hand.point(finger.pip()).y
}

/// Both the distance and the height test agree
pub fn extended_strict(hand: &HandLandmarks, finger: Finger) -> bool {
    extended(hand, finger) && raised(hand, finger)
}

/// Either a slightly shortened distance test or a loose height test passes
pub fn extended_relaxed(hand: &HandLandmarks, finger: Finger, ratio: f32) -> bool {
    let by_distance = hand.wrist_distance(finger.tip()) > hand.wrist_distance(finger.pip()) * ratio;
    let by_height = hand.point(finger.tip()).y < hand.point(finger.pip()).y * 1.05;
    by_distance || by_height
}

pub fn curled(hand: &HandLandmarks, finger: Finger) -> bool {
    !extended(hand, finger)
}

pub fn thumb_extended(hand: &HandLandmarks) -> bool {
    hand.wrist_distance(THUMB_TIP) > hand.wrist_distance(THUMB_IP)
}

/// Thumb folded over the palm: resting on a curled fingertip or near the middle knuckle
pub fn thumb_tucked(hand: &HandLandmarks, config: &ClassifierConfig) -> bool {
    let thumb = hand.point(THUMB_TIP);
    let touching = [Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .any(|f| curled(hand, *f) && thumb.distance_2d(&hand.point(f.tip())) < config.pinch_distance);
    touching || thumb.distance_2d(&hand.point(MIDDLE_MCP)) < config.thumb_tuck_distance
}

pub fn pinch_distance(hand: &HandLandmarks) -> f32 {
    hand.point(THUMB_TIP).distance_3d(&hand.point(INDEX_TIP))
}

/// Angle in degrees between the wrist->thumb-tip and wrist->index-tip rays
pub fn thumb_index_angle(hand: &HandLandmarks) -> f32 {
    let wrist = hand.point(WRIST);
    let thumb = hand.point(THUMB_TIP);
    let index = hand.point(INDEX_TIP);
    let (ax, ay) = (thumb.x - wrist.x, thumb.y - wrist.y);
    let (bx, by) = (index.x - wrist.x, index.y - wrist.y);
    let norm = (ax * ax + ay * ay).sqrt() * (bx * bx + by * by).sqrt();
    if norm <= f32::EPSILON {
        return 0.0;
    }
    let cos = ((ax * bx + ay * by) / norm).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

// ── Poses ───────────────────────────────────────────────────

/// Index finger alone, thumb tucked (cursor control)
pub fn is_pointing(hand: &HandLandmarks, config: &ClassifierConfig) -> bool {
    if !hand.is_valid() {
        return false;
    }
    if !extended_relaxed(hand, Finger::Index, config.relaxed_extension_ratio) {
        return false;
    }
    if ![Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .all(|f| curled(hand, *f))
    {
        return false;
    }
    if !thumb_tucked(hand, config) {
        return false;
    }
    let index_reach = hand.wrist_distance(INDEX_TIP);
    [THUMB_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP]
        .iter()
        .all(|tip| index_reach > hand.wrist_distance(*tip) + config.pointing_margin)
}

/// Index and middle up, ring and pinky down (left/right navigation)
pub fn is_two_finger(hand: &HandLandmarks) -> bool {
    hand.is_valid()
        && extended(hand, Finger::Index)
        && extended(hand, Finger::Middle)
        && curled(hand, Finger::Ring)
        && curled(hand, Finger::Pinky)
}

/// "OK" sign: thumb and index touching, remaining three fingers up
pub fn is_click_pinch(hand: &HandLandmarks, config: &ClassifierConfig) -> bool {
    hand.is_valid()
        && pinch_distance(hand) < config.pinch_distance
        && [Finger::Middle, Finger::Ring, Finger::Pinky]
            .iter()
            .all(|f| extended_strict(hand, *f))
}

/// Thumb and index spread into an L/V, other fingers folded (scroll)
pub fn is_scroll_shape(hand: &HandLandmarks, config: &ClassifierConfig) -> bool {
    if !hand.is_valid() {
        return false;
    }
    if !(thumb_extended(hand) && extended(hand, Finger::Index)) {
        return false;
    }
    if ![Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .all(|f| curled(hand, *f))
    {
        return false;
    }
    let angle = thumb_index_angle(hand);
    if angle < config.v_angle_min_deg || angle > config.v_angle_max_deg {
        return false;
    }
    hand.point(THUMB_TIP).distance_2d(&hand.point(INDEX_TIP)) > config.v_min_separation
}

pub fn is_open_hand(hand: &HandLandmarks) -> bool {
    hand.is_valid()
        && thumb_extended(hand)
        && Finger::ALL.iter().all(|f| extended_strict(hand, *f))
}

pub fn is_closed_fist(hand: &HandLandmarks) -> bool {
    hand.is_valid() && Finger::ALL.iter().all(|f| curled(hand, *f))
}

/// Looser pinch used to confirm an AltTab selection
///
/// Only two of middle/ring/pinky need to be up, and the tips may be further apart.
pub fn is_confirm_pinch(hand: &HandLandmarks, config: &ClassifierConfig) -> bool {
    if !hand.is_valid() || pinch_distance(hand) >= config.confirm_pinch_distance {
        return false;
    }
    let up = [Finger::Middle, Finger::Ring, Finger::Pinky]
        .iter()
        .filter(|f| extended_relaxed(hand, **f, config.relaxed_extension_ratio))
        .count();
    up >= 2
}

// ── Per-hand summary ────────────────────────────────────────

/// Every classifier's answer for one hand on one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub pointing: bool,
    pub scroll: bool,
    pub two_finger: bool,
    pub click_pinch: bool,
    pub open_hand: bool,
    pub closed_fist: bool,
    pub confirm_pinch: bool,
}

impl Classification {
    pub fn of(hand: &HandLandmarks, config: &ClassifierConfig) -> Self {
        if !hand.is_valid() {
            return Self::default();
        }
        Self {
            pointing: is_pointing(hand, config),
            scroll: is_scroll_shape(hand, config),
            two_finger: is_two_finger(hand),
            click_pinch: is_click_pinch(hand, config),
            open_hand: is_open_hand(hand),
            closed_fist: is_closed_fist(hand),
            confirm_pinch: is_confirm_pinch(hand, config),
        }
    }

    /// Whether the pose that starts `kind` is present
    pub fn matches(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::MouseMove => self.pointing,
            GestureKind::Scroll => self.scroll,
            GestureKind::Navigation => self.two_finger,
            GestureKind::MouseClick => self.click_pinch,
            GestureKind::AltTab => self.open_hand,
            GestureKind::VoiceTrigger => self.closed_fist,
        }
    }

    pub fn any(&self) -> bool {
        GestureKind::PRIORITY.iter().any(|k| self.matches(*k))
    }
}

/// A hand together with its classification, as handed to the state machines
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub hand: &'a HandLandmarks,
    pub class: Classification,
}

impl<'a> Observation<'a> {
    pub fn new(hand: &'a HandLandmarks, config: &ClassifierConfig) -> Self {
        Self {
            hand,
            class: Classification::of(hand, config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{INDEX_MCP, LANDMARK_COUNT, Point3};

    // Upright right hand, wrist at the bottom of the image
    fn hand(thumb_out: bool, up: [bool; 4]) -> HandLandmarks {
        let mut p = [Point3::default(); LANDMARK_COUNT];
        p[WRIST] = Point3::new(0.5, 0.8, 0.0);
        if thumb_out {
            p[1] = Point3::new(0.45, 0.75, 0.0);
            p[2] = Point3::new(0.40, 0.70, 0.0);
            p[3] = Point3::new(0.35, 0.65, 0.0);
            p[4] = Point3::new(0.30, 0.60, 0.0);
        } else {
            p[1] = Point3::new(0.46, 0.76, 0.0);
            p[2] = Point3::new(0.44, 0.70, 0.0);
            p[3] = Point3::new(0.46, 0.64, 0.0);
            p[4] = Point3::new(0.50, 0.62, 0.0);
        }
        for (i, finger) in Finger::ALL.iter().enumerate() {
            let x = 0.45 + 0.05 * i as f32;
            let base = finger.mcp();
            p[base] = Point3::new(x, 0.60, 0.0);
            p[base + 1] = Point3::new(x, 0.50, 0.0);
            if up[i] {
                p[base + 2] = Point3::new(x, 0.45, 0.0);
                p[base + 3] = Point3::new(x, 0.40, 0.0);
            } else {
                p[base + 1] = Point3::new(x, 0.52, 0.0);
                p[base + 2] = Point3::new(x, 0.58, 0.0);
                p[base + 3] = Point3::new(x, 0.64, 0.0);
            }
        }
        HandLandmarks::new(p)
    }

    fn ok_sign() -> HandLandmarks {
        let mut p = *hand(false, [false, true, true, true]).points();
        p[INDEX_MCP] = Point3::new(0.45, 0.60, 0.0);
        p[6] = Point3::new(0.42, 0.52, 0.0);
        p[7] = Point3::new(0.41, 0.53, 0.0);
        p[INDEX_TIP] = Point3::new(0.42, 0.56, 0.0);
        p[2] = Point3::new(0.42, 0.70, 0.0);
        p[3] = Point3::new(0.41, 0.63, 0.0);
        p[THUMB_TIP] = Point3::new(0.425, 0.56, 0.0);
        HandLandmarks::new(p)
    }

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    #[test]
    fn test_pointing() {
        let c = Classification::of(&hand(false, [true, false, false, false]), &config());
        assert!(c.pointing, "{:?}", c);
        assert!(!c.scroll && !c.two_finger && !c.click_pinch && !c.open_hand && !c.closed_fist);
    }

    #[test]
    fn test_two_finger() {
        let c = Classification::of(&hand(false, [true, true, false, false]), &config());
        assert!(c.two_finger, "{:?}", c);
        assert!(!c.pointing && !c.scroll);
    }

    #[test]
    fn test_scroll_shape() {
        let h = hand(true, [true, false, false, false]);
        let angle = thumb_index_angle(&h);
        assert!(angle > 20.0 && angle < 120.0, "angle {}", angle);
        let c = Classification::of(&h, &config());
        assert!(c.scroll, "{:?}", c);
        assert!(!c.pointing, "thumb is out, so not pointing");
    }

    #[test]
    fn test_scroll_rejects_narrow_angle() {
        // Tucked thumb sits almost on the index ray
        let h = hand(false, [true, false, false, false]);
        assert!(!is_scroll_shape(&h, &config()));
    }

    #[test]
    fn test_open_hand_and_fist() {
        let open = Classification::of(&hand(true, [true; 4]), &config());
        assert!(open.open_hand, "{:?}", open);
        assert!(!open.closed_fist && !open.two_finger);

        let fist = Classification::of(&hand(false, [false; 4]), &config());
        assert!(fist.closed_fist, "{:?}", fist);
        assert!(!fist.open_hand && !fist.pointing);
    }

    #[test]
    fn test_ok_sign_is_click_and_confirm_pinch() {
        let c = Classification::of(&ok_sign(), &config());
        assert!(c.click_pinch, "{:?}", c);
        assert!(c.confirm_pinch, "{:?}", c);
        assert!(!c.open_hand && !c.two_finger && !c.closed_fist);
    }

    #[test]
    fn test_confirm_pinch_tolerates_one_bent_finger() {
        let mut p = *ok_sign().points();
        // fold the pinky
        p[18] = Point3::new(0.60, 0.52, 0.0);
        p[19] = Point3::new(0.60, 0.58, 0.0);
        p[20] = Point3::new(0.60, 0.64, 0.0);
        let h = HandLandmarks::new(p);
        assert!(!is_click_pinch(&h, &config()));
        assert!(is_confirm_pinch(&h, &config()));
    }

    #[test]
    fn test_rotation_keeps_extension() {
        // Hand pointing sideways: y test is meaningless, distance still works
        let mut p = [Point3::default(); LANDMARK_COUNT];
        p[WRIST] = Point3::new(0.2, 0.5, 0.0);
        p[INDEX_MCP] = Point3::new(0.4, 0.5, 0.0);
        p[6] = Point3::new(0.5, 0.5, 0.0);
        p[INDEX_TIP] = Point3::new(0.6, 0.5, 0.0);
        let h = HandLandmarks::new(p);
        assert!(extended(&h, Finger::Index));
        assert!(!raised(&h, Finger::Index));
    }

    #[test]
    fn test_invalid_hand_matches_nothing() {
        let c = Classification::of(&HandLandmarks::invalid(), &config());
        assert!(!c.any());
        assert!(!c.confirm_pinch);
    }
}
