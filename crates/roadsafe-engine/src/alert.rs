use std::time::Duration;

/// Suppresses repeated accident alerts from the same stream.
///
/// Times are offsets on the stream's own clock (capture time since the start
/// of the stream), so a recorded log replayed at any speed keeps the capture
/// gaps between alerts.
#[derive(Debug, Clone)]
pub struct AlertCooldown {
    last_alert: Option<Duration>,
    cooldown: Duration,
}

impl AlertCooldown {
    pub fn new(cooldown: Duration) -> Self {
        Self { last_alert: None, cooldown }
    }

    pub fn allow_at(&mut self, at: Duration) -> bool {
        if let Some(t) = self.last_alert {
            if at.saturating_sub(t) < self.cooldown { return false; }
        }
        self.last_alert = Some(at);
        true
    }

    pub fn remaining_at(&self, at: Duration) -> Duration {
        match self.last_alert {
            Some(t) => self.cooldown.saturating_sub(at.saturating_sub(t)),
            None => Duration::ZERO,
        }
    }

    /// Forget the last alert, e.g. when the stream clock restarts.
    pub fn reset(&mut self) {
        self.last_alert = None;
    }
}

/// Capture offset of `frame` at `fps` frames per second.
pub fn stream_time(frame: u64, fps: f64) -> Duration {
    Duration::try_from_secs_f64(frame as f64 / fps).unwrap_or(Duration::MAX)
}
