use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How many detail workers to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSetting {
    /// Derive the count from the number of logical CPUs.
    Auto,
    Fixed(usize),
}

impl WorkerSetting {
    /// Resolves the setting against a logical CPU count.
    ///
    /// `Auto` uses half the cores (the work is I/O-bound and each worker owns
    /// a browser), clamped to `1..=16`. `None` means the core count could not
    /// be determined, in which case `Auto` falls back to 2.
    #[must_use]
    pub fn resolve(self, logical_cpus: Option<usize>) -> usize {
        match self {
            WorkerSetting::Fixed(n) => n.max(1),
            WorkerSetting::Auto => match logical_cpus {
                Some(cores) => (cores / 2).clamp(1, 16),
                None => 2,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub base_url: String,
    pub source_site: String,
    pub workers: WorkerSetting,
    pub headless: bool,
    pub user_agent: Option<String>,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub navigation_timeout_secs: u64,
    pub element_timeout_secs: u64,
    pub image_script_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
    pub max_feed_rounds: usize,
    pub stuck_rounds: u32,
}

impl AppConfig {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    #[must_use]
    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    #[must_use]
    pub fn image_script_timeout(&self) -> Duration {
        Duration::from_secs(self.image_script_timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
