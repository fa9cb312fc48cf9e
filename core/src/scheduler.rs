//! Frame scheduler — turns a host's monotonically increasing frame
//! timestamps into the real-time deltas the engine advances by.

/// The first frame and any frame whose timestamp does not move forward
/// yield a zero delta.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    last_frame_ms: Option<f64>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, now_ms: f64) -> f64 {
        if !now_ms.is_finite() {
            return 0.0;
        }
        match self.last_frame_ms {
            Some(last) if now_ms <= last => 0.0,
            Some(last) => {
                self.last_frame_ms = Some(now_ms);
                now_ms - last
            }
            None => {
                self.last_frame_ms = Some(now_ms);
                0.0
            }
        }
    }

    /// Forget the last frame, e.g. after the host was suspended.
    pub fn reset(&mut self) {
        self.last_frame_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_yields_zero() {
        let mut s = FrameScheduler::new();
        assert_eq!(s.frame(1_000.0), 0.0);
        assert_eq!(s.frame(1_016.0), 16.0);
    }

    #[test]
    fn backwards_timestamps_yield_zero_and_keep_reference() {
        let mut s = FrameScheduler::new();
        s.frame(1_000.0);
        assert_eq!(s.frame(900.0), 0.0);
        assert_eq!(s.frame(1_000.0), 0.0);
        assert_eq!(s.frame(1_050.0), 50.0);
    }

    #[test]
    fn reset_restarts_from_next_frame() {
        let mut s = FrameScheduler::new();
        s.frame(0.0);
        s.reset();
        assert_eq!(s.frame(10_000.0), 0.0);
        assert_eq!(s.frame(10_020.0), 20.0);
    }
}
