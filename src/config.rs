//! Subsystem configuration.

use std::env;
use std::time::Duration;

use tracing::warn;

/// Tunables of a [`HookSubsystem`](crate::HookSubsystem).
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct HookConfig {
    /// How long a low-level hook call forwarded to the installing thread may take
    /// before the caller gives up and uses the neutral result.
    pub low_level_timeout: Duration,
}

impl HookConfig {
    pub const DEFAULT_LOW_LEVEL_TIMEOUT: Duration = Duration::from_millis(5000);

    /// Environment variable holding the low-level hook timeout in milliseconds.
    pub const LOW_LEVEL_TIMEOUT_VAR: &'static str = "WINHOOK_LL_TIMEOUT_MS";

    /// Reads the configuration from the environment, falling back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = env::var(Self::LOW_LEVEL_TIMEOUT_VAR) {
            match Self::parse_timeout(&raw) {
                Some(timeout) => config.low_level_timeout = timeout,
                None => warn!(
                    value = %raw,
                    var = Self::LOW_LEVEL_TIMEOUT_VAR,
                    "ignoring invalid low-level hook timeout"
                ),
            }
        }
        config
    }

    pub fn with_low_level_timeout(mut self, timeout: Duration) -> Self {
        self.low_level_timeout = timeout;
        self
    }

    fn parse_timeout(raw: &str) -> Option<Duration> {
        raw.trim()
            .parse::<u64>()
            .ok()
            .filter(|&millis| millis > 0)
            .map(Duration::from_millis)
    }
}

impl Default for HookConfig {
    fn default() -> Self {
        HookConfig {
            low_level_timeout: Self::DEFAULT_LOW_LEVEL_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout() {
        assert_eq!(
            HookConfig::default().low_level_timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn parse_timeout_values() {
        assert_eq!(
            HookConfig::parse_timeout(" 250 "),
            Some(Duration::from_millis(250))
        );
        assert_eq!(HookConfig::parse_timeout("0"), None);
        assert_eq!(HookConfig::parse_timeout("soon"), None);
    }

    #[test]
    fn builder_overrides() {
        let config = HookConfig::default().with_low_level_timeout(Duration::from_millis(10));
        assert_eq!(config.low_level_timeout, Duration::from_millis(10));
    }
}
