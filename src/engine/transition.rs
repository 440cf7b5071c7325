// Timed scalar transitions with cubic ease-out.
//
// A `Tween` is an arena-of-one: each animatable value owns exactly one slot,
// and starting a new transition overwrites the slot. The superseded
// completion callback is dropped unfired, so stale completions can never run
// after a replacement — the core cancellation rule of the whole animation
// layer.

/// Blob scale at rest.
pub const REST_SCALE: f32 = 5.0;
/// Blob scale when expanded to reveal embedded content.
pub const EXPANDED_SCALE: f32 = 40.0;
/// Seconds for the expand transition.
pub const EXPAND_DURATION: f32 = 1.0;
/// Seconds for the reset transition.
pub const RESET_DURATION: f32 = 1.0;

/// Cubic ease-out over clamped progress: fast start, soft landing.
pub fn ease_out_cubic(p: f32) -> f32 {
    let q = 1.0 - p.clamp(0.0, 1.0);
    1.0 - q * q * q
}

/// One in-flight (or settled) scalar transition.
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    active: bool,
    on_complete: Option<Box<dyn FnOnce()>>,
    value: f32,
}

impl Tween {
    /// A settled tween holding `value`, with nothing in flight.
    pub fn settled(value: f32) -> Self {
        Self {
            from: value,
            to: value,
            duration: 0.0,
            elapsed: 0.0,
            active: false,
            on_complete: None,
            value,
        }
    }

    /// Begin a transition from `from` to `to` over `duration` seconds.
    /// Replaces any transition already in flight; the old completion callback
    /// is dropped without being invoked.
    pub fn start(&mut self, from: f32, to: f32, duration: f32, on_complete: Option<Box<dyn FnOnce()>>) {
        self.from = from;
        self.to = to;
        self.duration = duration;
        self.elapsed = 0.0;
        self.active = true;
        self.on_complete = on_complete;
        self.value = from;
    }

    /// Begin a transition from the current value, wherever it is. Used by
    /// face channels that retarget mid-motion.
    pub fn retarget(&mut self, to: f32, duration: f32) {
        let from = self.value;
        self.start(from, to, duration, None);
    }

    /// Advance by `dt` seconds and return the sampled value. Once progress
    /// reaches 1 the value lands on `to` exactly, the completion callback
    /// fires (at most once, ever), and the tween deactivates.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if !self.active {
            return self.value;
        }

        self.elapsed += dt;
        let p = if self.duration > 0.0 {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };

        if p >= 1.0 {
            self.value = self.to;
            self.active = false;
            if let Some(cb) = self.on_complete.take() {
                cb();
            }
        } else {
            self.value = self.from + (self.to - self.from) * ease_out_cubic(p);
        }
        self.value
    }

    pub fn value(&self) -> f32 { self.value }

    pub fn is_active(&self) -> bool { self.active }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, Box<dyn FnOnce()>) {
        let count = Rc::new(Cell::new(0));
        let cb = {
            let count = Rc::clone(&count);
            Box::new(move || count.set(count.get() + 1)) as Box<dyn FnOnce()>
        };
        (count, cb)
    }

    #[test]
    fn expand_lands_exactly_and_completes_once() {
        let (count, cb) = counter();
        let mut tween = Tween::settled(REST_SCALE);
        tween.start(REST_SCALE, EXPANDED_SCALE, EXPAND_DURATION, Some(cb));

        for _ in 0..60 {
            tween.advance(1.0 / 60.0);
        }
        // Keep sampling past completion; the callback must not refire.
        for _ in 0..10 {
            tween.advance(1.0 / 60.0);
        }

        assert_eq!(tween.value(), EXPANDED_SCALE);
        assert!(!tween.is_active());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn reset_returns_to_rest_exactly() {
        let mut tween = Tween::settled(EXPANDED_SCALE);
        tween.start(EXPANDED_SCALE, REST_SCALE, RESET_DURATION, None);
        for _ in 0..120 {
            tween.advance(1.0 / 60.0);
        }
        assert_eq!(tween.value(), REST_SCALE);
    }

    #[test]
    fn replacement_supersedes_pending_completion() {
        let (expand_count, expand_cb) = counter();
        let (reset_count, reset_cb) = counter();

        let mut tween = Tween::settled(REST_SCALE);
        tween.start(REST_SCALE, EXPANDED_SCALE, EXPAND_DURATION, Some(expand_cb));
        tween.advance(0.3);

        // Reset before the expand finishes: the expand callback must never run.
        tween.start(tween.value(), REST_SCALE, RESET_DURATION, Some(reset_cb));
        for _ in 0..120 {
            tween.advance(1.0 / 60.0);
        }

        assert_eq!(expand_count.get(), 0);
        assert_eq!(reset_count.get(), 1);
        assert_eq!(tween.value(), REST_SCALE);
    }

    #[test]
    fn ease_out_cubic_is_clamped_and_monotone() {
        assert_eq!(ease_out_cubic(-1.0), 0.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        let mut prev = 0.0;
        for i in 1..=20 {
            let v = ease_out_cubic(i as f32 / 20.0);
            assert!(v >= prev);
            prev = v;
        }
        assert_eq!(prev, 1.0);
    }

    #[test]
    fn zero_duration_completes_on_first_advance() {
        let (count, cb) = counter();
        let mut tween = Tween::settled(0.0);
        tween.start(0.0, 1.0, 0.0, Some(cb));
        assert_eq!(tween.advance(0.0), 1.0);
        assert_eq!(count.get(), 1);
    }
}
