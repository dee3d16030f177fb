//! Learner preferences agent profile document
//!
//! Possibly populated by the LMS; absence is a valid state distinct from
//! "not yet loaded". The document may be mutated locally and saved back
//! under optimistic concurrency.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Audio on/off preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioPreference {
    On,
    Off,
}

impl FromStr for AudioPreference {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "on" => Ok(AudioPreference::On),
            "off" => Ok(AudioPreference::Off),
            other => Err(ValidationError::InvalidAudioPreference(other.to_string())),
        }
    }
}

impl std::fmt::Display for AudioPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioPreference::On => write!(f, "on"),
            AudioPreference::Off => write!(f, "off"),
        }
    }
}

/// The cmi5LearnerPreferences document contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_preference: Option<AudioPreference>,
}

/// Loaded preference document plus its write-tracking state
///
/// `etag` is the concurrency token from the last read or successful write;
/// `save_disallowed` records that the LMS refused a save with 403.
#[derive(Debug, Clone, Default)]
pub struct PreferenceState {
    pub contents: LearnerPreferences,
    pub etag: Option<String>,
    pub save_disallowed: bool,
}
