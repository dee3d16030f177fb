//! Typed xAPI statement records
//!
//! Only the fields this runtime reads or writes are modeled as struct
//! fields; everything else an LMS puts in the context template is carried
//! through a flattened map so templates round-trip verbatim.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::launch::Agent;

/// Language-tagged display map, e.g. `{"en": "initialized"}`
pub type LanguageMap = BTreeMap<String, String>;

/// An xAPI statement as sent to the LRS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub actor: Agent,
    pub verb: Verb,
    pub object: Activity,
    pub context: Context,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<StatementResult>,
}

/// Statement verb
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<LanguageMap>,
}

/// An activity, used both as statement object and in context activity lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<ActivityDefinition>,
}

/// Activity metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityDefinition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<LanguageMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<LanguageMap>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<String>,
}

/// Statement context, seeded from the LMS context template
///
/// The `extra` map preserves template fields this runtime does not model
/// (instructor, team, language, ...) so they are sent back verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
    #[serde(rename = "contextActivities", skip_serializing_if = "Option::is_none")]
    pub context_activities: Option<ContextActivities>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Context activity lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextActivities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grouping: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<Activity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<Activity>,
}

/// Statement result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

/// A score attached to a judged statement
///
/// Fields are numeric per xAPI; [`Score::validate`] enforces the stricter
/// cmi5 rules (integral min/max/raw, scaled within `[0, 1]`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Score {
    /// A score carrying only a scaled value
    pub fn scaled(value: f64) -> Self {
        Self {
            scaled: Some(value),
            ..Self::default()
        }
    }
}

impl Statement {
    /// Result record, created empty on first access
    pub fn result_mut(&mut self) -> &mut StatementResult {
        self.result.get_or_insert_with(StatementResult::default)
    }

    /// Result extensions map, created empty on first access
    pub fn result_extensions_mut(&mut self) -> &mut Map<String, Value> {
        self.result_mut().extensions.get_or_insert_with(Map::new)
    }

    /// Context extensions map, created empty on first access
    pub fn context_extensions_mut(&mut self) -> &mut Map<String, Value> {
        self.context.extensions.get_or_insert_with(Map::new)
    }

    /// Context activity lists, created empty on first access
    pub fn context_activities_mut(&mut self) -> &mut ContextActivities {
        self.context
            .context_activities
            .get_or_insert_with(ContextActivities::default)
    }
}
