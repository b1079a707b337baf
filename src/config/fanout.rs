//! Fan-out concurrency configuration.

/// Configuration for concurrent target delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutConfig {
    /// Maximum number of target sequences running at once.
    ///
    /// Default: 16. Never below 1.
    pub max_concurrent_targets: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FanoutConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_concurrent_targets: 16,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `LIFELINE_FANOUT_MAX_CONCURRENT` | Max concurrent targets | 16 |
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("LIFELINE_FANOUT_MAX_CONCURRENT")
            && let Ok(parsed) = v.trim().parse::<usize>()
        {
            self.max_concurrent_targets = parsed.max(1);
        }
        self
    }

    /// Sets the maximum concurrent targets.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_targets = if max == 0 { 1 } else { max };
        self
    }
}
