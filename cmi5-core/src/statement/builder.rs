//! cmi5 statement assembly
//!
//! The builder borrows the session's cached launch state and assembles
//! protocol-compliant statements from it. Statements sent automatically by
//! the runtime are "cmi5 defined" (they carry the cmi5 category activity);
//! the public [`StatementBuilder::prepare`] path produces "cmi5 allowed"
//! statements for hosts that construct their own.

use chrono::Utc;
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use super::types::{Activity, ActivityDefinition, Context, ContextActivities, Score, Statement};
use super::vocabulary::{
    self, CATEGORY_CMI5, CATEGORY_MOVEON, EXTENSION_MASTERY_SCORE, EXTENSION_PROGRESS,
    VERB_COMPLETED, VERB_FAILED, VERB_INITIALIZED, VERB_PASSED, VERB_TERMINATED,
};
use crate::duration::millis_to_iso8601;
use crate::error::{Cmi5Error, ProtocolError, ValidationError};
use crate::launch::Agent;

/// Assembles statements from cached session state
///
/// Borrows everything it reads; it never mutates session state, so a failed
/// build leaves nothing to undo.
pub struct StatementBuilder<'a> {
    actor: &'a Agent,
    activity_id: &'a str,
    registration: Uuid,
    context_template: &'a Value,
    mastery_score: Option<f64>,
    progress: Option<u8>,
    include_source_activity: bool,
}

impl<'a> StatementBuilder<'a> {
    pub fn new(
        actor: &'a Agent,
        activity_id: &'a str,
        registration: Uuid,
        context_template: &'a Value,
    ) -> Self {
        Self {
            actor,
            activity_id,
            registration,
            context_template,
            mastery_score: None,
            progress: None,
            include_source_activity: true,
        }
    }

    /// Mastery score configured by the LMS, enforced on judged statements
    pub fn mastery_score(mut self, mastery_score: Option<f64>) -> Self {
        self.mastery_score = mastery_score;
        self
    }

    /// Locally tracked progress percentage
    pub fn progress(mut self, progress: Option<u8>) -> Self {
        self.progress = progress;
        self
    }

    /// Whether to append this library's source activity to
    /// `contextActivities.other`
    pub fn include_source_activity(mut self, include: bool) -> Self {
        self.include_source_activity = include;
        self
    }

    /// Prepare a "cmi5 allowed" statement for the given verb
    ///
    /// The context is seeded from the LMS template with the registration
    /// injected; the cmi5 category is NOT added, so the AU may send the
    /// result itself under the allowed-statement rules.
    pub fn prepare(&self, verb_id: &str) -> Result<Statement, Cmi5Error> {
        let mut statement = Statement {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            actor: self.actor.clone(),
            verb: vocabulary::verb(verb_id),
            object: Activity {
                id: self.activity_id.to_string(),
                definition: None,
            },
            context: self.prepare_context()?,
            result: None,
        };

        if verb_id != VERB_COMPLETED
            && let Some(progress) = self.progress
        {
            statement
                .result_extensions_mut()
                .insert(EXTENSION_PROGRESS.to_string(), json!(progress));
        }

        debug!(verb = verb_id, id = %statement.id, "prepared statement");

        Ok(statement)
    }

    /// Prepare a "cmi5 defined" statement: [`Self::prepare`] plus the cmi5
    /// category activity
    fn prepare_defined(&self, verb_id: &str) -> Result<Statement, Cmi5Error> {
        let mut statement = self.prepare(verb_id)?;
        statement
            .context_activities_mut()
            .category
            .push(vocabulary::category_activity(CATEGORY_CMI5));
        Ok(statement)
    }

    /// The "initialized" lifecycle statement
    pub fn initialized(&self) -> Result<Statement, Cmi5Error> {
        self.prepare_defined(VERB_INITIALIZED)
    }

    /// The "terminated" lifecycle statement, carrying the session duration
    pub fn terminated(&self, duration_millis: u64) -> Result<Statement, Cmi5Error> {
        let mut statement = self.prepare_defined(VERB_TERMINATED)?;
        statement.result_mut().duration = Some(millis_to_iso8601(duration_millis as i64));
        Ok(statement)
    }

    /// The "completed" lifecycle statement
    ///
    /// Sets `result.completion` and never carries the progress extension;
    /// completion implies 100%.
    pub fn completed(&self, duration_millis: u64) -> Result<Statement, Cmi5Error> {
        let mut statement = self.prepare_defined(VERB_COMPLETED)?;
        {
            let result = statement.result_mut();
            result.completion = Some(true);
            result.duration = Some(millis_to_iso8601(duration_millis as i64));
        }
        statement
            .context_activities_mut()
            .category
            .push(vocabulary::category_activity(CATEGORY_MOVEON));
        Ok(statement)
    }

    /// The "passed" lifecycle statement
    ///
    /// A provided score is validated and, when a mastery score is
    /// configured and the score carries a scaled value, must meet or exceed
    /// it; the mastery score is then copied into the context extension. The
    /// score is never clamped or adjusted.
    pub fn passed(
        &self,
        score: Option<&Score>,
        duration_millis: u64,
    ) -> Result<Statement, Cmi5Error> {
        self.judged(VERB_PASSED, score, duration_millis)
    }

    /// The "failed" lifecycle statement
    ///
    /// A provided score with a scaled value must fall below the configured
    /// mastery score.
    pub fn failed(
        &self,
        score: Option<&Score>,
        duration_millis: u64,
    ) -> Result<Statement, Cmi5Error> {
        self.judged(VERB_FAILED, score, duration_millis)
    }

    fn judged(
        &self,
        verb_id: &str,
        score: Option<&Score>,
        duration_millis: u64,
    ) -> Result<Statement, Cmi5Error> {
        let passing = verb_id == VERB_PASSED;

        let mut statement = self.prepare_defined(verb_id)?;
        {
            let result = statement.result_mut();
            result.success = Some(passing);
            result.duration = Some(millis_to_iso8601(duration_millis as i64));
        }

        if let Some(score) = score {
            score.validate()?;

            if let (Some(mastery), Some(scaled)) = (self.mastery_score, score.scaled) {
                if passing && scaled < mastery {
                    return Err(ValidationError::BelowMastery { scaled, mastery }.into());
                }
                if !passing && scaled >= mastery {
                    return Err(ValidationError::AboveMastery { scaled, mastery }.into());
                }
                statement
                    .context_extensions_mut()
                    .insert(EXTENSION_MASTERY_SCORE.to_string(), json!(mastery));
            }

            statement.result_mut().score = Some(*score);
        }

        statement
            .context_activities_mut()
            .category
            .push(vocabulary::category_activity(CATEGORY_MOVEON));

        Ok(statement)
    }

    /// Clone the context template and inject session identity
    ///
    /// Deserializing the cached template gives a cheap independent clone and
    /// verifies the template still matches the document contract.
    fn prepare_context(&self) -> Result<Context, ProtocolError> {
        let mut context: Context = serde_json::from_value(self.context_template.clone())
            .map_err(|e| ProtocolError::MalformedJson(format!("context template: {e}")))?;

        context.registration = Some(self.registration);

        if self.include_source_activity {
            context
                .context_activities
                .get_or_insert_with(ContextActivities::default)
                .other
                .push(vocabulary::source_activity());
        }

        Ok(context)
    }
}

/// Caller-supplied properties merged into a prepared statement
///
/// An escape hatch for xAPI profile extensibility: extension maps are
/// merged key by key (caller wins), and the object definition type may be
/// overridden. Nothing else in the statement is touched.
#[derive(Debug, Clone, Default)]
pub struct AdditionalProperties {
    pub context_extensions: Map<String, Value>,
    pub result_extensions: Map<String, Value>,
    pub object_definition_type: Option<String>,
}

/// Merge caller-supplied properties into a prepared statement
pub fn append_provided_properties(statement: &mut Statement, extra: &AdditionalProperties) {
    if !extra.context_extensions.is_empty() {
        let extensions = statement.context_extensions_mut();
        for (key, value) in &extra.context_extensions {
            extensions.insert(key.clone(), value.clone());
        }
    }

    if !extra.result_extensions.is_empty() {
        let extensions = statement.result_extensions_mut();
        for (key, value) in &extra.result_extensions {
            extensions.insert(key.clone(), value.clone());
        }
    }

    if let Some(activity_type) = &extra.object_definition_type {
        statement
            .object
            .definition
            .get_or_insert_with(ActivityDefinition::default)
            .activity_type = Some(activity_type.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRATION: &str = "11111111-1111-1111-1111-111111111111";

    fn actor() -> Agent {
        Agent::from_account("u1", "https://x").unwrap()
    }

    fn template() -> Value {
        json!({
            "extensions": {
                "https://w3id.org/xapi/cmi5/context/extensions/sessionid": "session-1"
            },
            "contextActivities": {
                "grouping": [{"id": "https://example.com/course/1"}]
            }
        })
    }

    fn registration() -> Uuid {
        Uuid::parse_str(REGISTRATION).unwrap()
    }

    fn category_ids(statement: &Statement) -> Vec<String> {
        statement
            .context
            .context_activities
            .as_ref()
            .map(|ca| ca.category.iter().map(|a| a.id.clone()).collect())
            .unwrap_or_default()
    }

    // ==================== Allowed vs defined ====================

    #[test]
    fn prepare_does_not_add_cmi5_category() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let statement = builder.prepare("https://example.com/verbs/custom").unwrap();
        assert!(!category_ids(&statement).contains(&CATEGORY_CMI5.to_string()));
    }

    #[test]
    fn lifecycle_statements_add_cmi5_category() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let statement = builder.initialized().unwrap();
        assert!(category_ids(&statement).contains(&CATEGORY_CMI5.to_string()));
    }

    #[test]
    fn registration_is_injected_and_template_preserved() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let statement = builder.initialized().unwrap();
        assert_eq!(statement.context.registration, Some(registration()));
        assert_eq!(
            statement.context.extensions.as_ref().unwrap()
                [vocabulary::EXTENSION_SESSION_ID],
            json!("session-1")
        );
        assert_eq!(
            statement.context.context_activities.as_ref().unwrap().grouping[0].id,
            "https://example.com/course/1"
        );
    }

    #[test]
    fn source_activity_appended_to_other_by_default() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let statement = builder.initialized().unwrap();
        let other = &statement.context.context_activities.as_ref().unwrap().other;
        assert_eq!(other.len(), 1);
        assert!(other[0].id.contains("cmi5-core"));
    }

    #[test]
    fn source_activity_can_be_disabled() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template)
            .include_source_activity(false);

        let statement = builder.initialized().unwrap();
        assert!(
            statement
                .context
                .context_activities
                .as_ref()
                .unwrap()
                .other
                .is_empty()
        );
    }

    #[test]
    fn malformed_template_is_a_protocol_error() {
        let actor = actor();
        let template = json!({"contextActivities": {"grouping": "not-an-array"}});
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let err = builder.initialized().unwrap_err();
        assert!(matches!(err, Cmi5Error::Protocol(_)));
    }

    // ==================== Progress extension ====================

    #[test]
    fn progress_attached_when_set() {
        let actor = actor();
        let template = template();
        let builder =
            StatementBuilder::new(&actor, "act1", registration(), &template).progress(Some(40));

        let statement = builder.initialized().unwrap();
        assert_eq!(
            statement.result.unwrap().extensions.unwrap()[EXTENSION_PROGRESS],
            json!(40)
        );
    }

    #[test]
    fn progress_omitted_when_unset() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let statement = builder.initialized().unwrap();
        assert!(statement.result.is_none());
    }

    #[test]
    fn completed_statement_never_carries_progress() {
        let actor = actor();
        let template = template();
        let builder =
            StatementBuilder::new(&actor, "act1", registration(), &template).progress(Some(40));

        let statement = builder.completed(1000).unwrap();
        let result = statement.result.unwrap();
        assert_eq!(result.completion, Some(true));
        assert!(result.extensions.is_none());
    }

    // ==================== Lifecycle result fields ====================

    #[test]
    fn terminated_carries_duration_but_not_moveon() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let statement = builder.terminated(90_000).unwrap();
        assert_eq!(statement.result.as_ref().unwrap().duration.as_ref().unwrap(), "PT1M30S");
        assert!(!category_ids(&statement).contains(&CATEGORY_MOVEON.to_string()));
    }

    #[test]
    fn completed_and_judged_statements_carry_moveon() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        for statement in [
            builder.completed(1000).unwrap(),
            builder.passed(None, 1000).unwrap(),
            builder.failed(None, 1000).unwrap(),
        ] {
            assert!(category_ids(&statement).contains(&CATEGORY_MOVEON.to_string()));
        }
    }

    #[test]
    fn passed_sets_success_true_and_failed_sets_success_false() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let passed = builder.passed(None, 1000).unwrap();
        assert_eq!(passed.result.unwrap().success, Some(true));

        let failed = builder.failed(None, 1000).unwrap();
        assert_eq!(failed.result.unwrap().success, Some(false));
    }

    // ==================== Mastery score ====================

    #[test]
    fn passed_at_or_above_mastery_records_mastery_extension() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template)
            .mastery_score(Some(0.8));

        let statement = builder.passed(Some(&Score::scaled(0.9)), 1000).unwrap();
        assert_eq!(
            statement.context.extensions.as_ref().unwrap()[EXTENSION_MASTERY_SCORE],
            json!(0.8)
        );
        assert_eq!(statement.result.unwrap().score.unwrap().scaled, Some(0.9));
    }

    #[test]
    fn passed_below_mastery_is_rejected() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template)
            .mastery_score(Some(0.8));

        let err = builder.passed(Some(&Score::scaled(0.7)), 1000).unwrap_err();
        assert!(matches!(
            err,
            Cmi5Error::Validation(ValidationError::BelowMastery { .. })
        ));
    }

    #[test]
    fn failed_at_or_above_mastery_is_rejected() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template)
            .mastery_score(Some(0.8));

        let err = builder.failed(Some(&Score::scaled(0.8)), 1000).unwrap_err();
        assert!(matches!(
            err,
            Cmi5Error::Validation(ValidationError::AboveMastery { .. })
        ));
    }

    #[test]
    fn score_without_scaled_skips_mastery_check() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template)
            .mastery_score(Some(0.8));

        let score = Score {
            raw: Some(5.0),
            min: Some(0.0),
            max: Some(10.0),
            ..Score::default()
        };
        let statement = builder.passed(Some(&score), 1000).unwrap();
        assert!(
            statement
                .context
                .extensions
                .as_ref()
                .unwrap()
                .get(EXTENSION_MASTERY_SCORE)
                .is_none()
        );
    }

    #[test]
    fn invalid_score_is_rejected_before_mastery_check() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);

        let err = builder.passed(Some(&Score::scaled(1.5)), 1000).unwrap_err();
        assert!(matches!(
            err,
            Cmi5Error::Validation(ValidationError::ScaledOutOfRange(_))
        ));
    }

    // ==================== Provided properties ====================

    #[test]
    fn provided_extensions_merge_key_by_key() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);
        let mut statement = builder.initialized().unwrap();

        let mut extra = AdditionalProperties::default();
        extra.context_extensions.insert(
            "https://example.com/ext/attempt".to_string(),
            json!(3),
        );
        extra
            .result_extensions
            .insert("https://example.com/ext/detail".to_string(), json!("x"));
        append_provided_properties(&mut statement, &extra);

        let context_extensions = statement.context.extensions.as_ref().unwrap();
        // template's own extension is untouched
        assert_eq!(
            context_extensions[vocabulary::EXTENSION_SESSION_ID],
            json!("session-1")
        );
        assert_eq!(
            context_extensions["https://example.com/ext/attempt"],
            json!(3)
        );
        assert_eq!(
            statement.result.unwrap().extensions.unwrap()["https://example.com/ext/detail"],
            json!("x")
        );
    }

    #[test]
    fn object_definition_type_override() {
        let actor = actor();
        let template = template();
        let builder = StatementBuilder::new(&actor, "act1", registration(), &template);
        let mut statement = builder.initialized().unwrap();

        let extra = AdditionalProperties {
            object_definition_type: Some("https://example.com/activitytype/lesson".to_string()),
            ..AdditionalProperties::default()
        };
        append_provided_properties(&mut statement, &extra);

        assert_eq!(
            statement.object.definition.unwrap().activity_type.unwrap(),
            "https://example.com/activitytype/lesson"
        );
    }
}
