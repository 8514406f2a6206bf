use std::time::{Duration, Instant};

const SMOOTHING: f32 = 0.9;

/// Exponentially smoothed frames-per-second counter.
#[derive(Debug, Default)]
pub struct FpsMeter {
    last: Option<Instant>,
    fps: f32,
}

impl FpsMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        if let Some(last) = self.last {
            self.observe(now.saturating_duration_since(last));
        }
        self.last = Some(now);
    }

    fn observe(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f32();
        if secs <= f32::EPSILON {
            return;
        }
        let instant = 1.0 / secs;
        self.fps = if self.fps == 0.0 {
            instant
        } else {
            self.fps * SMOOTHING + instant * (1.0 - SMOOTHING)
        };
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_interval_sets_rate_then_smooths() {
        let mut meter = FpsMeter::new();
        let start = Instant::now();
        meter.tick_at(start);
        assert_eq!(meter.fps(), 0.0);

        meter.tick_at(start + Duration::from_millis(100));
        assert!((meter.fps() - 10.0).abs() < 0.01);

        meter.tick_at(start + Duration::from_millis(150));
        // 0.9 * 10 + 0.1 * 20
        assert!((meter.fps() - 11.0).abs() < 0.01);
    }
}
