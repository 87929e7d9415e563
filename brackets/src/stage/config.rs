//! Manager configuration.

use serde::{Deserialize, Serialize};

/// Stage manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Bound of each stage actor's inbox (default: 64)
    pub inbox_capacity: usize,

    /// Events kept per broadcast subscriber before it starts lagging (default: 256)
    pub event_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            inbox_capacity: 64,
            event_buffer: 256,
        }
    }
}

impl ManagerConfig {
    /// Create configuration from environment variables
    ///
    /// Reads `BRACKETS_INBOX_CAPACITY` and `BRACKETS_EVENT_BUFFER`; missing or
    /// unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let inbox_capacity = std::env::var("BRACKETS_INBOX_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&v| v > 0)
            .unwrap_or(defaults.inbox_capacity);

        let event_buffer = std::env::var("BRACKETS_EVENT_BUFFER")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&v| v > 0)
            .unwrap_or(defaults.event_buffer);

        Self {
            inbox_capacity,
            event_buffer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.inbox_capacity, 64);
        assert_eq!(config.event_buffer, 256);
    }
}
