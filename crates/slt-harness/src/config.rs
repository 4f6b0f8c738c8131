//! Runner and discovery configuration.

use std::env;

/// Presence of this variable (any value) turns on query truncation.
pub const TRUNCATE_QUERIES_ENV: &str = "SQLLOGICTEST_TRUNCATE_QUERIES";

/// Settings that shape the per-record result log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Shorten long queries in result lines.
    pub truncate_queries: bool,
    /// Directory name where displayed paths stop.
    pub log_root_dir: String,
    /// Most path components shown for a script.
    pub max_path_components: usize,
    /// Prefix result lines with a unix-millisecond timestamp.
    pub timestamps: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            truncate_queries: false,
            log_root_dir: "test".to_owned(),
            max_path_components: 4,
            timestamps: false,
        }
    }
}

impl RunnerConfig {
    /// Defaults, with truncation enabled when [`TRUNCATE_QUERIES_ENV`] is set.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            truncate_queries: env::var_os(TRUNCATE_QUERIES_ENV).is_some(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_truncation(mut self, enabled: bool) -> Self {
        self.truncate_queries = enabled;
        self
    }

    #[must_use]
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }
}

/// Settings for walking directories in search of scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Directory levels below each root that are searched.
    pub max_depth: usize,
    /// Directory names never descended into.
    pub denylist: Vec<String>,
    /// File extension of scripts, without the dot.
    pub extension: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: 16,
            denylist: [".git", "target", "node_modules"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
            extension: "test".to_owned(),
        }
    }
}
