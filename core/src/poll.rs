use std::time::Duration;

/// Fixed-interval polling schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the remote side reaches a terminal state
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub const RELAYER_INTERVAL: Duration = Duration::from_secs(3);

    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Whether attempt number `attempt` (1-based) may still be made
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }

    pub async fn pause(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::RELAYER_INTERVAL, None)
    }
}
