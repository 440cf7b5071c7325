// The tracking face overlay entity.
//
// Two orthogonal state machines composed at pose time:
//   - a discrete expression machine (Neutral / Happy / Surprised / Wink, with
//     Blink as a momentary animation that never becomes the logical state)
//   - a boolean talking loop that overrides the mouth-openness channel while
//     active and hands it back on stop
//
// Every animatable quantity is a `Tween` channel; starting a new expression
// retargets the channels, which cancels whatever was in flight (arena-of-one).
// Delayed work (auto blink, eye reopen, talk toggle) lives in deadline fields
// on this struct and is checked in advance() — there are no free-floating
// callbacks, so teardown is just dropping the Face. A delayed reopen fires
// even if the expression changed in between: it retargets toward the pose
// that is current at fire time (last-write-wins on the eye channels).

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::transition::Tween;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Seconds for a channel to settle after an expression change.
const EXPRESSION_DUR: f32 = 0.18;
/// Blink timing: fast close, short hold, quick reopen.
const BLINK_CLOSE_DUR: f32 = 0.06;
const BLINK_REOPEN_DELAY: f32 = 0.10;
const BLINK_REOPEN_DUR: f32 = 0.08;
/// How long a wink holds the eye shut before it reopens.
const WINK_HOLD: f32 = 0.55;
/// Auto-blink interval range, seconds.
const AUTO_BLINK_MIN: f32 = 3.0;
const AUTO_BLINK_MAX: f32 = 5.0;
/// Talking mouth loop: toggle cadence and the two mouth shapes it swings
/// between.
const TALK_TOGGLE_MIN: f32 = 0.12;
const TALK_TOGGLE_MAX: f32 = 0.22;
const TALK_OPEN: f32 = 0.85;
const TALK_CLOSED: f32 = 0.20;
const TALK_DUR: f32 = 0.08;

/// Fraction of the remaining distance the anchor covers per frame.
const ANCHOR_ALPHA: f32 = 0.25;

/// Parallax translation at full pointer deflection, in pixels, and the
/// per-element weighting: the nose rides the pointer hardest, the eyes least.
const PARALLAX_RANGE_PX: f32 = 14.0;
const NOSE_WEIGHT: f32 = 1.0;
const MOUTH_WEIGHT: f32 = 0.65;
const EYE_WEIGHT: f32 = 0.35;

/// Face layout relative to the anchor, in pixels (screen y grows downward).
const EYE_SPACING_PX: f32 = 26.0;
const EYE_Y_PX: f32 = -18.0;
const NOSE_Y_PX: f32 = 2.0;
const MOUTH_Y_PX: f32 = 22.0;

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expression {
    Neutral,
    Happy,
    Surprised,
    Wink,
    /// Momentary: animates a close/reopen but the logical state keeps its
    /// previous value, so the auto-blink timer can keep re-issuing it.
    Blink,
}

/// Channel targets for a settled expression.
struct ExpressionPose {
    left_eye:    f32,
    right_eye:   f32,
    mouth_open:  f32,
    mouth_curve: f32,
}

fn pose_for(e: Expression) -> ExpressionPose {
    match e {
        Expression::Neutral | Expression::Blink => ExpressionPose {
            left_eye: 1.0,
            right_eye: 1.0,
            mouth_open: 0.25,
            mouth_curve: 0.25,
        },
        Expression::Happy => ExpressionPose {
            // Squinted eyes, wide smile.
            left_eye: 0.55,
            right_eye: 0.55,
            mouth_open: 0.35,
            mouth_curve: 1.0,
        },
        Expression::Surprised => ExpressionPose {
            left_eye: 1.0,
            right_eye: 1.0,
            mouth_open: 1.0,
            mouth_curve: 0.0,
        },
        Expression::Wink => ExpressionPose {
            left_eye: 1.0,
            right_eye: 0.0,
            mouth_open: 0.3,
            mouth_curve: 0.7,
        },
    }
}

/// Eye openness a delayed reopen aims for. For a wink the closed eye comes
/// back fully open even though the state is still Wink.
fn reopened_eyes(e: Expression) -> (f32, f32) {
    match e {
        Expression::Wink => (1.0, 1.0),
        other => {
            let pose = pose_for(other);
            (pose.left_eye, pose.right_eye)
        }
    }
}

// ============================================================================
// POSE OUTPUT
// ============================================================================

/// Screen-space placement of one eye.
pub struct EyePose {
    pub center:   Vec2,
    pub openness: f32,
}

/// Screen-space placement of the mouth. `curve` is -1..1 (frown..smile).
pub struct MouthPose {
    pub center:   Vec2,
    pub openness: f32,
    pub curve:    f32,
}

/// Everything the overlay renderer needs for one frame.
pub struct FacePose {
    pub anchor:    Vec2,
    pub left_eye:  EyePose,
    pub right_eye: EyePose,
    pub nose:      Vec2,
    pub mouth:     MouthPose,
}

// ============================================================================
// FACE
// ============================================================================

pub struct Face {
    expression: Expression,
    /// Bumped on every accepted expression/blink animation start. Doubles as
    /// the no-op observable: a rejected set_expression leaves it untouched.
    pose_generation: u64,

    left_eye_open:  Tween,
    right_eye_open: Tween,
    mouth_open:     Tween,
    mouth_curve:    Tween,

    anchor:   Vec2,
    parallax: Vec2,

    clock: f32,
    eye_reopen_at:      Option<f32>,
    next_auto_blink_at: f32,

    talking: bool,
    talk_mouth_open:     bool,
    next_talk_toggle_at: f32,

    rng: StdRng,
}

impl Face {
    pub fn new(seed: u64, viewport: (u32, u32)) -> Self {
        let rest = pose_for(Expression::Neutral);
        let mut rng = StdRng::seed_from_u64(seed);
        let first_blink = rng.gen_range(AUTO_BLINK_MIN..AUTO_BLINK_MAX);
        Self {
            expression: Expression::Neutral,
            pose_generation: 0,
            left_eye_open: Tween::settled(rest.left_eye),
            right_eye_open: Tween::settled(rest.right_eye),
            mouth_open: Tween::settled(rest.mouth_open),
            mouth_curve: Tween::settled(rest.mouth_curve),
            anchor: Vec2::new(viewport.0 as f32 * 0.5, viewport.1 as f32 * 0.5),
            parallax: Vec2::ZERO,
            clock: 0.0,
            eye_reopen_at: None,
            next_auto_blink_at: first_blink,
            talking: false,
            talk_mouth_open: false,
            next_talk_toggle_at: 0.0,
            rng,
        }
    }

    pub fn expression(&self) -> Expression { self.expression }

    pub fn pose_generation(&self) -> u64 { self.pose_generation }

    pub fn is_talking(&self) -> bool { self.talking }

    // ------------------------------------------------------------------------
    // EXPRESSION MACHINE
    // ------------------------------------------------------------------------

    /// Switch the discrete expression. Setting the current expression again
    /// is a no-op; `Blink` is momentary and leaves the logical state alone.
    pub fn set_expression(&mut self, e: Expression) {
        if e == self.expression {
            return;
        }
        if e == Expression::Blink {
            self.trigger_blink();
            return;
        }

        self.expression = e;
        self.pose_generation += 1;
        let pose = pose_for(e);
        self.left_eye_open.retarget(pose.left_eye, EXPRESSION_DUR);
        self.right_eye_open.retarget(pose.right_eye, EXPRESSION_DUR);
        if !self.talking {
            self.mouth_open.retarget(pose.mouth_open, EXPRESSION_DUR);
        }
        self.mouth_curve.retarget(pose.mouth_curve, EXPRESSION_DUR);

        if e == Expression::Wink {
            self.eye_reopen_at = Some(self.clock + WINK_HOLD);
        }
    }

    fn trigger_blink(&mut self) {
        self.pose_generation += 1;
        self.left_eye_open.retarget(0.0, BLINK_CLOSE_DUR);
        self.right_eye_open.retarget(0.0, BLINK_CLOSE_DUR);
        self.eye_reopen_at = Some(self.clock + BLINK_CLOSE_DUR + BLINK_REOPEN_DELAY);
    }

    // ------------------------------------------------------------------------
    // TALKING LOOP
    // ------------------------------------------------------------------------

    pub fn set_talking(&mut self, on: bool) {
        if on {
            self.start_talking();
        } else {
            self.stop_talking();
        }
    }

    /// Idempotent: starting while already talking changes nothing, not even
    /// the toggle cadence.
    pub fn start_talking(&mut self) {
        if self.talking {
            return;
        }
        self.talking = true;
        self.talk_mouth_open = true;
        self.mouth_open.retarget(TALK_OPEN, TALK_DUR);
        self.next_talk_toggle_at = self.clock + self.rng.gen_range(TALK_TOGGLE_MIN..TALK_TOGGLE_MAX);
    }

    /// Stop the loop and ease the mouth back to the active expression's shape.
    pub fn stop_talking(&mut self) {
        if !self.talking {
            return;
        }
        self.talking = false;
        self.mouth_open.retarget(pose_for(self.expression).mouth_open, EXPRESSION_DUR);
    }

    // ------------------------------------------------------------------------
    // PLACEMENT & PARALLAX
    // ------------------------------------------------------------------------

    /// Ease the anchor toward the projected screen target. Non-finite input
    /// is dropped; the anchor keeps its last valid position.
    pub fn update_position(&mut self, target: Vec2) {
        if !target.is_finite() {
            return;
        }
        self.anchor += (target - self.anchor) * ANCHOR_ALPHA;
    }

    /// Record the pointer position (normalized -1..1 per axis). Non-finite
    /// input is dropped. The vertical axis is reflected at pose time: pointer
    /// up moves the face parts down, which is what makes it read as staring
    /// at the cursor.
    pub fn update_parallax(&mut self, pointer: Vec2) {
        if !pointer.is_finite() {
            return;
        }
        self.parallax = pointer;
    }

    // ------------------------------------------------------------------------
    // PER-FRAME ADVANCE
    // ------------------------------------------------------------------------

    pub fn advance(&mut self, dt: f32) {
        self.clock += dt;

        // Auto blink: fires only from Neutral, reschedules regardless, so a
        // long Happy stretch doesn't queue up a burst of stale blinks.
        if self.clock >= self.next_auto_blink_at {
            if self.expression == Expression::Neutral {
                self.trigger_blink();
            }
            self.next_auto_blink_at =
                self.clock + self.rng.gen_range(AUTO_BLINK_MIN..AUTO_BLINK_MAX);
        }

        // Delayed eye reopen (blink or wink). Retargets toward whatever the
        // pose is *now*, so an expression change in between still wins.
        if let Some(at) = self.eye_reopen_at {
            if self.clock >= at {
                self.eye_reopen_at = None;
                let (left, right) = reopened_eyes(self.expression);
                self.left_eye_open.retarget(left, BLINK_REOPEN_DUR);
                self.right_eye_open.retarget(right, BLINK_REOPEN_DUR);
            }
        }

        // Talking mouth loop.
        if self.talking && self.clock >= self.next_talk_toggle_at {
            self.talk_mouth_open = !self.talk_mouth_open;
            let target = if self.talk_mouth_open { TALK_OPEN } else { TALK_CLOSED };
            self.mouth_open.retarget(target, TALK_DUR);
            self.next_talk_toggle_at =
                self.clock + self.rng.gen_range(TALK_TOGGLE_MIN..TALK_TOGGLE_MAX);
        }

        self.left_eye_open.advance(dt);
        self.right_eye_open.advance(dt);
        self.mouth_open.advance(dt);
        self.mouth_curve.advance(dt);
    }

    // ------------------------------------------------------------------------
    // POSE COMPOSITION
    // ------------------------------------------------------------------------

    /// Compose expression channels, talking override, and parallax into the
    /// frame's renderable pose.
    pub fn pose(&self) -> FacePose {
        let par = Vec2::new(self.parallax.x, -self.parallax.y) * PARALLAX_RANGE_PX;
        let eye_off = par * EYE_WEIGHT;
        let nose_off = par * NOSE_WEIGHT;
        let mouth_off = par * MOUTH_WEIGHT;

        FacePose {
            anchor: self.anchor,
            left_eye: EyePose {
                center: self.anchor + Vec2::new(-EYE_SPACING_PX, EYE_Y_PX) + eye_off,
                openness: self.left_eye_open.value(),
            },
            right_eye: EyePose {
                center: self.anchor + Vec2::new(EYE_SPACING_PX, EYE_Y_PX) + eye_off,
                openness: self.right_eye_open.value(),
            },
            nose: self.anchor + Vec2::new(0.0, NOSE_Y_PX) + nose_off,
            mouth: MouthPose {
                center: self.anchor + Vec2::new(0.0, MOUTH_Y_PX) + mouth_off,
                openness: self.mouth_open.value(),
                curve: self.mouth_curve.value(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn face() -> Face {
        Face::new(42, (800, 600))
    }

    fn advance_for(face: &mut Face, seconds: f32) {
        let steps = (seconds / DT).ceil() as usize;
        for _ in 0..steps {
            face.advance(DT);
        }
    }

    #[test]
    fn setting_the_same_expression_is_a_noop() {
        let mut f = face();
        assert_eq!(f.pose_generation(), 0);
        f.set_expression(Expression::Neutral);
        assert_eq!(f.pose_generation(), 0);

        f.set_expression(Expression::Happy);
        assert_eq!(f.pose_generation(), 1);
        f.set_expression(Expression::Happy);
        assert_eq!(f.pose_generation(), 1);
    }

    #[test]
    fn auto_blink_fires_only_from_neutral() {
        let mut f = face();
        f.set_expression(Expression::Happy);
        advance_for(&mut f, 0.5);
        let gen_before = f.pose_generation();
        let eyes_before = f.pose().left_eye.openness;

        // Force the timer due; Happy must suppress the blink but the timer
        // must still reschedule.
        f.next_auto_blink_at = f.clock;
        f.advance(DT);
        assert_eq!(f.pose_generation(), gen_before);
        assert!(f.eye_reopen_at.is_none());
        assert!(f.next_auto_blink_at > f.clock);
        assert_relative_eq!(f.pose().left_eye.openness, eyes_before, epsilon = 1e-4);
    }

    #[test]
    fn auto_blink_closes_and_reopens_from_neutral() {
        let mut f = face();
        f.next_auto_blink_at = 0.0;
        f.advance(DT);
        assert_eq!(f.pose_generation(), 1);

        advance_for(&mut f, BLINK_CLOSE_DUR);
        assert!(f.pose().left_eye.openness < 0.1, "eyes did not close");

        advance_for(&mut f, BLINK_REOPEN_DELAY + BLINK_REOPEN_DUR + 0.1);
        assert!(f.pose().left_eye.openness > 0.95, "eyes did not reopen");
    }

    #[test]
    fn wink_closes_one_eye_and_reopens_after_the_hold() {
        let mut f = face();
        f.set_expression(Expression::Wink);
        advance_for(&mut f, EXPRESSION_DUR + 0.05);
        let pose = f.pose();
        assert!(pose.right_eye.openness < 0.05);
        assert!(pose.left_eye.openness > 0.9);

        advance_for(&mut f, WINK_HOLD + BLINK_REOPEN_DUR + 0.1);
        assert!(f.pose().right_eye.openness > 0.95);
        assert_eq!(f.expression(), Expression::Wink);
    }

    #[test]
    fn delayed_reopen_respects_a_newer_expression() {
        let mut f = face();
        f.set_expression(Expression::Blink);
        // Change expression while the eyes are still shut.
        f.advance(DT);
        f.set_expression(Expression::Happy);

        advance_for(&mut f, BLINK_REOPEN_DELAY + BLINK_REOPEN_DUR + EXPRESSION_DUR);
        // The reopen fired, but toward the Happy squint — not Neutral.
        let open = f.pose().left_eye.openness;
        assert_relative_eq!(open, pose_for(Expression::Happy).left_eye, epsilon = 1e-3);
    }

    #[test]
    fn talking_start_is_idempotent() {
        let mut f = face();
        f.start_talking();
        let cadence = f.next_talk_toggle_at;
        f.start_talking();
        assert_eq!(f.next_talk_toggle_at, cadence);
        assert!(f.is_talking());
    }

    #[test]
    fn talking_overrides_mouth_and_hands_it_back() {
        let mut f = face();
        f.start_talking();
        advance_for(&mut f, 0.2);

        // Expression change while talking: curve follows, mouth stays loop-driven.
        f.set_expression(Expression::Happy);
        let (mut lo, mut hi) = (f32::MAX, f32::MIN);
        for _ in 0..120 {
            f.advance(DT);
            let open = f.pose().mouth.openness;
            lo = lo.min(open);
            hi = hi.max(open);
        }
        assert!(hi > TALK_OPEN - 0.1, "mouth never swung open ({hi})");
        assert!(lo < TALK_CLOSED + 0.1, "mouth never swung closed ({lo})");
        assert_relative_eq!(f.pose().mouth.curve, pose_for(Expression::Happy).mouth_curve, epsilon = 1e-3);

        f.stop_talking();
        advance_for(&mut f, EXPRESSION_DUR + 0.1);
        assert_relative_eq!(
            f.pose().mouth.openness,
            pose_for(Expression::Happy).mouth_open,
            epsilon = 1e-3
        );
    }

    #[test]
    fn stop_talking_when_idle_is_a_noop() {
        let mut f = face();
        let mouth = f.pose().mouth.openness;
        f.stop_talking();
        f.advance(DT);
        assert_relative_eq!(f.pose().mouth.openness, mouth, epsilon = 1e-4);
    }

    #[test]
    fn invalid_pointer_input_leaves_parallax_unchanged() {
        let mut f = face();
        f.update_parallax(Vec2::new(0.5, -0.5));
        let nose = f.pose().nose;

        f.update_parallax(Vec2::new(f32::NAN, 0.0));
        f.update_parallax(Vec2::new(0.0, f32::INFINITY));
        assert_eq!(f.pose().nose, nose);
    }

    #[test]
    fn parallax_reflects_the_vertical_axis_and_weights_parts() {
        let mut f = face();
        let rest = f.pose();
        f.update_parallax(Vec2::new(1.0, 1.0));
        let deflected = f.pose();

        let nose_dx = deflected.nose.x - rest.nose.x;
        let nose_dy = deflected.nose.y - rest.nose.y;
        // Pointer down-right: parts move right but *up* (reflection).
        assert!(nose_dx > 0.0);
        assert!(nose_dy < 0.0);

        let eye_dx = deflected.left_eye.center.x - rest.left_eye.center.x;
        assert!(eye_dx > 0.0);
        assert!(eye_dx < nose_dx, "eyes must move less than the nose");
    }

    #[test]
    fn invalid_position_target_is_ignored() {
        let mut f = face();
        let anchor = f.pose().anchor;
        f.update_position(Vec2::new(f32::NAN, 100.0));
        assert_eq!(f.pose().anchor, anchor);

        f.update_position(Vec2::new(500.0, 500.0));
        assert!(f.pose().anchor.distance(anchor) > 0.0);
    }

    #[test]
    fn anchor_converges_on_a_steady_target() {
        let mut f = face();
        let target = Vec2::new(120.0, 480.0);
        for _ in 0..100 {
            f.update_position(target);
        }
        assert!(f.pose().anchor.distance(target) < 1.0);
    }
}
