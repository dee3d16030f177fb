//! The LMS.LaunchData state document
//!
//! Written by the LMS before launch, read once per session, read-only
//! afterwards.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::statement::vocabulary::EXTENSION_SESSION_ID;

/// How the AU was launched, constraining which statements may be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchMode {
    /// Full attempt; completed/passed/failed are allowed
    Normal,
    /// Learner browsing outside a real attempt
    Browse,
    /// Reviewing an earlier attempt
    Review,
}

impl std::fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LaunchMode::Normal => "Normal",
            LaunchMode::Browse => "Browse",
            LaunchMode::Review => "Review",
        };
        write!(f, "{label}")
    }
}

/// Window handling requested by the LMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LaunchMethod {
    OwnWindow,
    AnyWindow,
}

/// The LMS completion criterion for satisfying this AU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOn {
    Passed,
    Completed,
    CompletedAndPassed,
    CompletedOrPassed,
    #[default]
    NotApplicable,
}

/// Entitlement key alternatives; `alternate` wins when both are present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_structure: Option<String>,
}

impl EntitlementKey {
    /// The effective key: `alternate` preferred over `courseStructure`
    pub fn preferred(&self) -> Option<&str> {
        self.alternate
            .as_deref()
            .or(self.course_structure.as_deref())
    }
}

/// The launch data document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchData {
    pub launch_mode: LaunchMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_method: Option<LaunchMethod>,
    #[serde(default)]
    pub move_on: MoveOn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastery_score: Option<f64>,
    #[serde(default, rename = "returnURL", skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlement_key: Option<EntitlementKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_parameters: Option<String>,
    /// Opaque template used verbatim as the base of every statement context
    pub context_template: Value,
}

impl LaunchData {
    /// LMS session id, carried in the context template's extensions
    pub fn session_id(&self) -> Option<String> {
        self.context_template
            .get("extensions")?
            .get(EXTENSION_SESSION_ID)?
            .as_str()
            .map(String::from)
    }
}
