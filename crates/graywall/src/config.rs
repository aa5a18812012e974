//! Filter configuration.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classifier::Verdict;
use crate::error::{FilterError, FilterResult};

/// Default minimum inter-packet interval: 100 ms.
pub const DEFAULT_THRESHOLD_NS: u64 = 100_000_000;
/// Default capacity of each table.
pub const DEFAULT_TABLE_CAPACITY: usize = 32;

/// Configuration for a [`ReputationFilter`](crate::ReputationFilter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum acceptable interval between packets from one source, in
    /// nanoseconds. Closer arrivals count as violations.
    pub threshold_duration: u64,
    /// Maximum number of tracked sources.
    pub tracking_capacity: usize,
    /// Maximum number of blocked sources.
    pub enforcement_capacity: usize,
    /// Violations tolerated before a source is blocked; the N-th one blocks.
    pub fast_packet_limit: u32,
    /// Verdict for frames too short or malformed to classify.
    pub malformed_verdict: Verdict,
    /// Sources that are always passed and never tracked.
    pub allowlist: BTreeSet<Ipv4Addr>,
    /// Sources loaded into the enforcement table at start-up.
    ///
    /// Seeded blocks are subject to the same capacity eviction as any other.
    pub denylist: BTreeSet<Ipv4Addr>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            threshold_duration: DEFAULT_THRESHOLD_NS,
            tracking_capacity: DEFAULT_TABLE_CAPACITY,
            enforcement_capacity: DEFAULT_TABLE_CAPACITY,
            fast_packet_limit: 1,
            malformed_verdict: Verdict::Pass,
            allowlist: BTreeSet::new(),
            denylist: BTreeSet::new(),
        }
    }
}

impl FilterConfig {
    /// Create a new builder starting from the defaults.
    #[must_use]
    pub fn builder() -> FilterConfigBuilder {
        FilterConfigBuilder::default()
    }

    /// A populated configuration showing every option.
    #[must_use]
    pub fn example() -> Self {
        Self::builder()
            .threshold(Duration::from_secs(1))
            .fast_packet_limit(3)
            .allow(Ipv4Addr::new(192, 168, 1, 103))
            .deny(Ipv4Addr::new(192, 168, 1, 203))
            .build()
    }

    /// The timing threshold as a [`Duration`].
    #[must_use]
    pub const fn threshold(&self) -> Duration {
        Duration::from_nanos(self.threshold_duration)
    }

    /// Load configuration from a file.
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> FilterResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FilterError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    /// Parse and validate a TOML configuration.
    pub fn from_toml(content: &str) -> FilterResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FilterError::Config(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(content: &str) -> FilterResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| FilterError::Config(format!("invalid JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> FilterResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FilterError::Config(format!("cannot encode TOML: {e}")))
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> FilterResult<()> {
        if self.threshold_duration == 0 {
            return Err(FilterError::Config(
                "threshold_duration must be greater than 0".to_string(),
            ));
        }

        if self.tracking_capacity == 0 {
            return Err(FilterError::Config(
                "tracking_capacity must be greater than 0".to_string(),
            ));
        }

        if self.enforcement_capacity == 0 {
            return Err(FilterError::Config(
                "enforcement_capacity must be greater than 0".to_string(),
            ));
        }

        if self.fast_packet_limit == 0 {
            return Err(FilterError::Config(
                "fast_packet_limit must be greater than 0".to_string(),
            ));
        }

        if self.denylist.len() > self.enforcement_capacity {
            return Err(FilterError::Config(format!(
                "denylist has {} entries but enforcement_capacity is {}",
                self.denylist.len(),
                self.enforcement_capacity
            )));
        }

        if let Some(ip) = self.allowlist.intersection(&self.denylist).next() {
            return Err(FilterError::Config(format!(
                "{ip} is in both allowlist and denylist"
            )));
        }

        Ok(())
    }
}

/// Builder for [`FilterConfig`].
#[derive(Debug, Clone, Default)]
pub struct FilterConfigBuilder {
    config: FilterConfig,
}

impl FilterConfigBuilder {
    /// Set the timing threshold, saturating at `u64::MAX` nanoseconds.
    #[must_use]
    pub fn threshold(mut self, threshold: Duration) -> Self {
        self.config.threshold_duration = u64::try_from(threshold.as_nanos()).unwrap_or(u64::MAX);
        self
    }

    /// Set the tracking table capacity.
    #[must_use]
    pub const fn tracking_capacity(mut self, capacity: usize) -> Self {
        self.config.tracking_capacity = capacity;
        self
    }

    /// Set the enforcement table capacity.
    #[must_use]
    pub const fn enforcement_capacity(mut self, capacity: usize) -> Self {
        self.config.enforcement_capacity = capacity;
        self
    }

    /// Set how many violations block a source.
    #[must_use]
    pub const fn fast_packet_limit(mut self, limit: u32) -> Self {
        self.config.fast_packet_limit = limit;
        self
    }

    /// Set the verdict for malformed frames.
    #[must_use]
    pub const fn malformed_verdict(mut self, verdict: Verdict) -> Self {
        self.config.malformed_verdict = verdict;
        self
    }

    /// Always pass `ip`.
    #[must_use]
    pub fn allow(mut self, ip: Ipv4Addr) -> Self {
        self.config.allowlist.insert(ip);
        self
    }

    /// Block `ip` from start-up.
    #[must_use]
    pub fn deny(mut self, ip: Ipv4Addr) -> Self {
        self.config.denylist.insert(ip);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> FilterConfig {
        self.config
    }
}
