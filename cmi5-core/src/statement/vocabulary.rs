//! Fixed cmi5 / xAPI protocol identifiers
//!
//! Verb IRIs, category activities, extension IRIs and document ids are all
//! fixed by the cmi5 specification; nothing here is configurable.

use super::types::{Activity, ActivityDefinition, LanguageMap, Verb};

/// xAPI version sent with every LRS request
pub const XAPI_VERSION: &str = "1.0.3";

/// State document id for the LMS-populated launch data
pub const STATE_LMS_LAUNCH_DATA: &str = "LMS.LaunchData";

/// Agent profile id for learner preferences
pub const PROFILE_LEARNER_PREFERENCES: &str = "cmi5LearnerPreferences";

pub const VERB_INITIALIZED: &str = "http://adlnet.gov/expapi/verbs/initialized";
pub const VERB_TERMINATED: &str = "http://adlnet.gov/expapi/verbs/terminated";
pub const VERB_COMPLETED: &str = "http://adlnet.gov/expapi/verbs/completed";
pub const VERB_PASSED: &str = "http://adlnet.gov/expapi/verbs/passed";
pub const VERB_FAILED: &str = "http://adlnet.gov/expapi/verbs/failed";

/// Category activity marking a statement as "cmi5 defined"
pub const CATEGORY_CMI5: &str = "https://w3id.org/xapi/cmi5/context/categories/cmi5";

/// Category activity on statements relevant to the moveOn criterion
pub const CATEGORY_MOVEON: &str = "https://w3id.org/xapi/cmi5/context/categories/moveon";

/// Context extension carrying the LMS session id
pub const EXTENSION_SESSION_ID: &str = "https://w3id.org/xapi/cmi5/context/extensions/sessionid";

/// Context extension carrying the mastery score in judged statements
pub const EXTENSION_MASTERY_SCORE: &str =
    "https://w3id.org/xapi/cmi5/context/extensions/masteryscore";

/// Result extension carrying the progress percentage
pub const EXTENSION_PROGRESS: &str = "https://w3id.org/xapi/cmi5/result/extensions/progress";

/// Display label for the five well-known cmi5 verbs
///
/// Unrecognized verbs get no display text.
pub fn verb_display(verb_id: &str) -> Option<&'static str> {
    match verb_id {
        VERB_INITIALIZED => Some("initialized"),
        VERB_TERMINATED => Some("terminated"),
        VERB_COMPLETED => Some("completed"),
        VERB_PASSED => Some("passed"),
        VERB_FAILED => Some("failed"),
        _ => None,
    }
}

/// Build a verb record, attaching display text when the verb is well known
pub fn verb(verb_id: &str) -> Verb {
    Verb {
        id: verb_id.to_string(),
        display: verb_display(verb_id).map(|label| {
            let mut display = LanguageMap::new();
            display.insert("en".to_string(), label.to_string());
            display
        }),
    }
}

/// Bare category activity for an IRI
pub fn category_activity(id: &str) -> Activity {
    Activity {
        id: id.to_string(),
        definition: None,
    }
}

/// Activity identifying this library as the source software of a statement
pub fn source_activity() -> Activity {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    let mut display_name = LanguageMap::new();
    display_name.insert("und".to_string(), format!("{name} ({version})"));
    let mut description = LanguageMap::new();
    description.insert("en".to_string(), env!("CARGO_PKG_DESCRIPTION").to_string());

    Activity {
        id: format!("http://id.tincanapi.com/activity/software/{name}/{version}"),
        definition: Some(ActivityDefinition {
            name: Some(display_name),
            description: Some(description),
            activity_type: Some("http://id.tincanapi.com/activitytype/source".to_string()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_verbs_get_display_text() {
        let verb = verb(VERB_INITIALIZED);
        assert_eq!(verb.id, VERB_INITIALIZED);
        assert_eq!(verb.display.unwrap().get("en").unwrap(), "initialized");
    }

    #[test]
    fn unknown_verbs_get_no_display_text() {
        let verb = verb("https://example.com/verbs/launched");
        assert!(verb.display.is_none());
    }

    #[test]
    fn source_activity_names_this_library() {
        let activity = source_activity();
        assert!(activity.id.contains("cmi5-core"));
        let definition = activity.definition.unwrap();
        assert_eq!(
            definition.activity_type.unwrap(),
            "http://id.tincanapi.com/activitytype/source"
        );
    }
}
