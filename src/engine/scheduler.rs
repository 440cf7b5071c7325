// Frame scheduling state machine.
//
// winit drives rendering through AboutToWait → request_redraw →
// RedrawRequested. This type reifies that loop's bookkeeping so pause/resume
// and single-scheduling are enforceable (and testable) in one place:
//
//   - at most one redraw request is outstanding at any time
//   - while paused, no new frame is ever requested and begin_frame yields no
//     dt, so nothing downstream mutates
//   - resume rebases the dt baseline, so the first frame after a long pause
//     steps by the fallback dt instead of the paused wall-clock span
//     (the simulation's drive clock is intentionally not rebased)

use std::time::Instant;

/// dt handed to the first frame after startup or resume, when there is no
/// previous frame instant to difference against.
const FALLBACK_DT: f32 = 1.0 / 60.0;
/// Upper bound on dt, absorbing stalls (debugger, window drag).
const MAX_DT: f32 = 0.1;

pub struct FrameScheduler {
    paused: bool,
    frame_pending: bool,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            paused: false,
            frame_pending: false,
            last_frame: None,
        }
    }

    pub fn is_paused(&self) -> bool { self.paused }

    /// Halt scheduling. Idempotent: a second pause changes nothing and never
    /// touches an already-drained frame request. A frame already requested
    /// from winit still arrives, but begin_frame will refuse it a dt.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Restart the loop. Idempotent on a running scheduler. Returns true when
    /// the caller must issue one kick-off redraw request — false when a
    /// request is still outstanding from before the pause (re-requesting then
    /// would double-schedule).
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        self.last_frame = None;
        if self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        true
    }

    /// Ask to schedule the next frame (call from AboutToWait). True means
    /// "tell winit to request a redraw now"; false while paused or while one
    /// request is already in flight.
    pub fn request_frame(&mut self) -> bool {
        if self.paused || self.frame_pending {
            return false;
        }
        self.frame_pending = true;
        true
    }

    /// Called at the top of RedrawRequested. Clears the in-flight marker and
    /// returns the frame's dt, or `None` while paused (skip this frame's
    /// update and render entirely).
    pub fn begin_frame(&mut self, now: Instant) -> Option<f32> {
        self.frame_pending = false;
        if self.paused {
            return None;
        }
        let dt = match self.last_frame {
            Some(prev) => (now - prev).as_secs_f32().min(MAX_DT),
            None => FALLBACK_DT,
        };
        self.last_frame = Some(now);
        Some(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn double_pause_then_resume_leaves_exactly_one_loop() {
        let mut sched = FrameScheduler::new();
        assert!(sched.request_frame());
        assert!(sched.begin_frame(Instant::now()).is_some());

        sched.pause();
        sched.pause();
        assert!(!sched.request_frame(), "paused scheduler must not schedule");

        // First resume kicks exactly one frame; a second resume is a no-op.
        assert!(sched.resume());
        assert!(!sched.resume());
        assert!(!sched.request_frame(), "kick-off frame already in flight");

        assert!(sched.begin_frame(Instant::now()).is_some());
        assert!(sched.request_frame(), "loop continues after the kick-off");
    }

    #[test]
    fn at_most_one_outstanding_request() {
        let mut sched = FrameScheduler::new();
        assert!(sched.request_frame());
        assert!(!sched.request_frame());
        sched.begin_frame(Instant::now());
        assert!(sched.request_frame());
    }

    #[test]
    fn paused_frame_yields_no_dt() {
        let mut sched = FrameScheduler::new();
        sched.request_frame();
        sched.pause();
        assert_eq!(sched.begin_frame(Instant::now()), None);
    }

    #[test]
    fn resume_rebases_the_dt_baseline() {
        let mut sched = FrameScheduler::new();
        let t0 = Instant::now();
        sched.request_frame();
        sched.begin_frame(t0);

        sched.pause();
        sched.resume();

        // Ten seconds pass while paused; the next frame must not see them.
        let t1 = t0 + Duration::from_secs(10);
        let dt = sched.begin_frame(t1).unwrap();
        assert_eq!(dt, FALLBACK_DT);
    }

    #[test]
    fn resume_during_pending_frame_does_not_double_schedule() {
        let mut sched = FrameScheduler::new();
        sched.request_frame();
        sched.pause();
        // The request from before the pause is still in flight.
        assert!(!sched.resume());
        // It drains normally and the loop carries on.
        assert!(sched.begin_frame(Instant::now()).is_some());
        assert!(sched.request_frame());
    }

    #[test]
    fn dt_is_clamped_against_stalls() {
        let mut sched = FrameScheduler::new();
        let t0 = Instant::now();
        sched.request_frame();
        sched.begin_frame(t0);
        sched.request_frame();
        let dt = sched.begin_frame(t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(dt, MAX_DT);
    }
}
