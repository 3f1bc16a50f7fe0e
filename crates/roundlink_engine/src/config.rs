//! Configuration for the sync engine.

use std::time::Duration;

/// Which of the two replicas this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    /// The handheld device.
    Primary,
    /// The wrist-worn companion.
    Secondary,
}

impl DeviceRole {
    /// Returns a short name for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceRole::Primary => "primary",
            DeviceRole::Secondary => "secondary",
        }
    }
}

/// Configuration for one replica's sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// This replica's role.
    pub role: DeviceRole,
    /// Retry behavior for blocking delivery (`sync_now`,
    /// `flush_with_retry`).
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration for the given role.
    #[must_use]
    pub fn new(role: DeviceRole) -> Self {
        Self {
            role,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Configuration for retry behavior.
///
/// Bounded retry applies only to blocking callers; the trigger-driven
/// path retries indefinitely on every subsequent flush trigger.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of delivery attempts.
    pub max_attempts: u32,
    /// Initial delay between attempts.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a retry configuration with the given attempt budget.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with a single attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter (deterministic delays for tests).
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter.
            let jitter = delay_secs * 0.25 * pseudo_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Cheap jitter without an RNG dependency.
fn pseudo_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
