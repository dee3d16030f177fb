//! Session configuration
//!
//! Explicit per-session configuration passed to the constructor; there are
//! no process-wide toggles.

use serde::{Deserialize, Serialize};

/// Configuration for a [`super::Session`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Append this library's source activity to each statement's
    /// `contextActivities.other`
    #[serde(default = "default_true")]
    pub include_source_activity: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            include_source_activity: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_activity_is_on_by_default() {
        assert!(SessionConfig::default().include_source_activity);
    }

    #[test]
    fn deserialize_empty_uses_defaults() {
        let config: SessionConfig = serde_json::from_str("{}").unwrap();
        assert!(config.include_source_activity);
    }
}
