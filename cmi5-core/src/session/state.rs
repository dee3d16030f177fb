//! Session struct and lifecycle state machine
//!
//! One `Session` corresponds to exactly one AU launch. Guard checks run
//! synchronously before any suspension point, and a flag only flips after
//! the corresponding network write is confirmed, so a failed operation
//! leaves the session unchanged and the caller may retry the identical
//! call.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::config::SessionConfig;
use super::launch_data::{LaunchData, LaunchMethod, LaunchMode, MoveOn};
use super::preferences::{AudioPreference, LearnerPreferences, PreferenceState};
use crate::error::{Cmi5Error, StateError, ValidationError};
use crate::launch::LaunchContext;
use crate::lrs::{HttpTransport, LrsClient, ProfileWriteOutcome, Transport};
use crate::statement::{
    AdditionalProperties, Score, Statement, StatementBuilder, append_provided_properties,
};

/// The AU session lifecycle state machine
///
/// Owns the launch context and LRS client for the lifetime of one AU
/// launch. The boot sequence is
/// `fetch_credentials → load_launch_data → load_learner_preferences →
/// initialize`, chained by [`Session::start`]; the lifecycle verbs
/// (`completed`, `passed`, `failed`, `terminate`) are then available while
/// the session is active.
pub struct Session {
    context: LaunchContext,
    client: LrsClient,
    config: SessionConfig,
    launch_data: Option<LaunchData>,
    preferences: Option<PreferenceState>,
    initialized: bool,
    terminated: bool,
    completed: bool,
    passed: bool,
    failed: bool,
    progress: Option<u8>,
    duration_start: Option<Instant>,
}

impl Session {
    /// Create a session over the real HTTP transport
    pub fn new(context: LaunchContext) -> Self {
        Self::with_transport(context, SessionConfig::default(), Arc::new(HttpTransport::new()))
    }

    /// Create a session directly from the AU launch URL
    pub fn from_launch_url(launch_url: &str) -> Result<Self, Cmi5Error> {
        Ok(Self::new(LaunchContext::from_launch_url(launch_url)?))
    }

    /// Create a session with explicit configuration
    pub fn with_config(context: LaunchContext, config: SessionConfig) -> Self {
        Self::with_transport(context, config, Arc::new(HttpTransport::new()))
    }

    /// Create a session over a caller-supplied transport
    pub fn with_transport(
        context: LaunchContext,
        config: SessionConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let client = LrsClient::new(context.endpoint().clone(), transport);
        Self {
            context,
            client,
            config,
            launch_data: None,
            preferences: None,
            initialized: false,
            terminated: false,
            completed: false,
            passed: false,
            failed: false,
            progress: None,
            duration_start: None,
        }
    }

    // ==================== Boot sequence ====================

    /// Run the full boot sequence
    ///
    /// Chains `fetch_credentials → load_launch_data →
    /// load_learner_preferences → initialize` strictly sequentially,
    /// aborting on the first failure without invoking later stages.
    pub async fn start(&mut self, extra: Option<&AdditionalProperties>) -> Result<(), Cmi5Error> {
        info!("starting AU session");

        self.fetch_credentials().await?;
        self.load_launch_data().await?;
        self.load_learner_preferences().await?;
        self.initialize(extra).await
    }

    /// POST the fetch URL and store the auth token for all subsequent
    /// requests
    pub async fn fetch_credentials(&mut self) -> Result<(), Cmi5Error> {
        let token = self
            .client
            .exchange_credentials(self.context.fetch_url())
            .await?;
        self.client.set_auth(format!("Basic {token}"));
        debug!("credentials fetched");
        Ok(())
    }

    /// Load the LMS.LaunchData state document
    ///
    /// A missing document is fatal: the LMS is required to have populated
    /// it before launch.
    pub async fn load_launch_data(&mut self) -> Result<(), Cmi5Error> {
        if self.client.auth().is_none() {
            return Err(StateError::CredentialsNotFetched.into());
        }

        let launch_data = self
            .client
            .read_launch_data(
                self.context.activity_id(),
                self.context.actor(),
                self.context.registration(),
            )
            .await?;
        debug!(launch_mode = %launch_data.launch_mode, "launch data loaded");
        self.launch_data = Some(launch_data);
        Ok(())
    }

    /// Load the learner-preferences profile document
    ///
    /// A 404 yields the empty preference set with no concurrency token.
    pub async fn load_learner_preferences(&mut self) -> Result<(), Cmi5Error> {
        if self.launch_data.is_none() {
            return Err(StateError::LaunchDataNotLoaded.into());
        }

        let document = self
            .client
            .read_learner_preferences(self.context.actor())
            .await?;
        self.preferences = Some(match document {
            Some(document) => PreferenceState {
                contents: document.contents,
                etag: document.etag,
                save_disallowed: false,
            },
            None => PreferenceState::default(),
        });
        Ok(())
    }

    /// Send the "initialized" statement and mark the session active
    pub async fn initialize(
        &mut self,
        extra: Option<&AdditionalProperties>,
    ) -> Result<(), Cmi5Error> {
        if self.launch_data.is_none() {
            return Err(StateError::LaunchDataNotLoaded.into());
        }
        if self.preferences.is_none() {
            return Err(StateError::PreferencesNotLoaded.into());
        }
        if self.initialized {
            return Err(StateError::AlreadyInitialized.into());
        }

        let mut statement = self.builder()?.initialized()?;
        if let Some(extra) = extra {
            append_provided_properties(&mut statement, extra);
        }
        self.client.write_statement(&statement).await?;

        self.initialized = true;
        self.duration_start = Some(Instant::now());
        info!("AU initialized");
        Ok(())
    }

    // ==================== Lifecycle verbs ====================

    /// Send the "terminated" statement and end the session
    pub async fn terminate(
        &mut self,
        extra: Option<&AdditionalProperties>,
    ) -> Result<(), Cmi5Error> {
        if !self.initialized {
            return Err(StateError::NotInitialized.into());
        }
        if self.terminated {
            return Err(StateError::AlreadyTerminated.into());
        }

        let mut statement = self.builder()?.terminated(self.elapsed_millis())?;
        if let Some(extra) = extra {
            append_provided_properties(&mut statement, extra);
        }
        self.client.write_statement(&statement).await?;

        self.terminated = true;
        info!("AU terminated");
        Ok(())
    }

    /// Send the "completed" statement
    ///
    /// Requires an active session in Normal launch mode; on success resets
    /// the local progress measure.
    pub async fn completed(
        &mut self,
        extra: Option<&AdditionalProperties>,
    ) -> Result<(), Cmi5Error> {
        self.require_normal_active()?;
        if self.completed {
            return Err(StateError::AlreadyCompleted.into());
        }

        let mut statement = self.builder()?.completed(self.elapsed_millis())?;
        if let Some(extra) = extra {
            append_provided_properties(&mut statement, extra);
        }
        self.client.write_statement(&statement).await?;

        self.progress = None;
        self.completed = true;
        info!("AU completed");
        Ok(())
    }

    /// Send the "passed" statement, optionally with a score
    ///
    /// The score is validated, and checked against the mastery score when
    /// one is configured, before any network I/O occurs. Refused once
    /// either passed or failed has been recorded.
    pub async fn passed(&mut self, score: Option<Score>) -> Result<(), Cmi5Error> {
        self.require_normal_active()?;
        if self.passed || self.failed {
            return Err(StateError::AlreadyJudged.into());
        }

        let statement = self
            .builder()?
            .passed(score.as_ref(), self.elapsed_millis())?;
        self.client.write_statement(&statement).await?;

        self.passed = true;
        info!("AU passed");
        Ok(())
    }

    /// Send the "failed" statement, optionally with a score
    ///
    /// Mirror of [`Session::passed`]; the scaled score, when present, must
    /// fall below the configured mastery score.
    pub async fn failed(&mut self, score: Option<Score>) -> Result<(), Cmi5Error> {
        self.require_normal_active()?;
        if self.passed || self.failed {
            return Err(StateError::AlreadyJudged.into());
        }

        let statement = self
            .builder()?
            .failed(score.as_ref(), self.elapsed_millis())?;
        self.client.write_statement(&statement).await?;

        self.failed = true;
        info!("AU failed");
        Ok(())
    }

    // ==================== Learner preferences ====================

    /// Save the locally modified learner preferences back to the LRS
    ///
    /// Sends `If-Match` with the last known token, or `If-None-Match: *`
    /// when none exists. A 403 sets the `save_disallowed` marker instead of
    /// failing.
    pub async fn save_learner_preferences(&mut self) -> Result<(), Cmi5Error> {
        let (contents, etag) = match &self.preferences {
            Some(state) => (state.contents.clone(), state.etag.clone()),
            None => return Err(StateError::PreferencesNotLoaded.into()),
        };

        let outcome = self
            .client
            .write_learner_preferences(self.context.actor(), &contents, etag.as_deref())
            .await?;

        let state = self
            .preferences
            .as_mut()
            .ok_or(StateError::PreferencesNotLoaded)?;
        match outcome {
            ProfileWriteOutcome::Saved { etag } => {
                state.etag = etag;
            }
            ProfileWriteOutcome::Denied => {
                warn!("save of learner preferences denied by LMS");
                state.save_disallowed = true;
            }
        }
        Ok(())
    }

    // ==================== Launch data getters ====================

    /// Launch mode from the LMS launch data
    pub fn launch_mode(&self) -> Result<LaunchMode, StateError> {
        Ok(self.launch_data_ref()?.launch_mode)
    }

    /// Launch method from the LMS launch data
    pub fn launch_method(&self) -> Result<Option<LaunchMethod>, StateError> {
        Ok(self.launch_data_ref()?.launch_method)
    }

    /// AU launch parameters passed through by the LMS
    pub fn launch_parameters(&self) -> Result<Option<&str>, StateError> {
        Ok(self.launch_data_ref()?.launch_parameters.as_deref())
    }

    /// moveOn criterion from the LMS launch data
    pub fn move_on(&self) -> Result<MoveOn, StateError> {
        Ok(self.launch_data_ref()?.move_on)
    }

    /// Mastery score configured by the LMS
    pub fn mastery_score(&self) -> Result<Option<f64>, StateError> {
        Ok(self.launch_data_ref()?.mastery_score)
    }

    /// URL to return the learner to when the session ends
    pub fn return_url(&self) -> Result<Option<&str>, StateError> {
        Ok(self.launch_data_ref()?.return_url.as_deref())
    }

    /// Effective entitlement key (`alternate` preferred over
    /// `courseStructure`)
    pub fn entitlement_key(&self) -> Result<Option<&str>, StateError> {
        Ok(self
            .launch_data_ref()?
            .entitlement_key
            .as_ref()
            .and_then(|key| key.preferred()))
    }

    /// LMS session id from the context template
    pub fn session_id(&self) -> Result<Option<String>, StateError> {
        Ok(self.launch_data_ref()?.session_id())
    }

    // ==================== Preference getters / setters ====================

    /// Learner's language preference
    pub fn language_preference(&self) -> Result<Option<&str>, StateError> {
        Ok(self.preferences_ref()?.contents.language_preference.as_deref())
    }

    /// Locally set the language preference (an empty string unsets it)
    pub fn set_language_preference(&mut self, preference: Option<String>) -> Result<(), StateError> {
        let state = self
            .preferences
            .as_mut()
            .ok_or(StateError::PreferencesNotLoaded)?;
        state.contents.language_preference = preference.filter(|value| !value.is_empty());
        Ok(())
    }

    /// Learner's audio preference
    pub fn audio_preference(&self) -> Result<Option<AudioPreference>, StateError> {
        Ok(self.preferences_ref()?.contents.audio_preference)
    }

    /// Locally set the audio preference
    pub fn set_audio_preference(
        &mut self,
        preference: Option<AudioPreference>,
    ) -> Result<(), StateError> {
        let state = self
            .preferences
            .as_mut()
            .ok_or(StateError::PreferencesNotLoaded)?;
        state.contents.audio_preference = preference;
        Ok(())
    }

    /// Loaded preference document contents
    pub fn learner_preferences(&self) -> Result<&LearnerPreferences, StateError> {
        Ok(&self.preferences_ref()?.contents)
    }

    /// Whether the LMS refused a preference save with 403
    pub fn preferences_save_disallowed(&self) -> Result<bool, StateError> {
        Ok(self.preferences_ref()?.save_disallowed)
    }

    // ==================== Local state ====================

    /// Milliseconds since the session was initialized
    pub fn duration_millis(&self) -> Result<u64, StateError> {
        self.duration_start
            .map(|start| start.elapsed().as_millis() as u64)
            .ok_or(StateError::NotInitialized)
    }

    /// Locally tracked progress percentage
    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    /// Locally set the progress towards completion, 0–100
    pub fn set_progress(&mut self, progress: Option<u8>) -> Result<(), ValidationError> {
        if let Some(value) = progress
            && value > 100
        {
            return Err(ValidationError::InvalidProgress(value));
        }
        self.progress = progress;
        Ok(())
    }

    /// Whether the session is active: initialized and not terminated
    pub fn is_active(&self) -> bool {
        self.initialized && !self.terminated
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn has_passed(&self) -> bool {
        self.passed
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// The validated launch parameters this session was created from
    pub fn launch_context(&self) -> &LaunchContext {
        &self.context
    }

    // ==================== Advanced statement API ====================

    /// Prepare a "cmi5 allowed" statement for the AU to send itself
    pub fn prepare_statement(&self, verb_id: &str) -> Result<Statement, Cmi5Error> {
        self.builder()?.prepare(verb_id)
    }

    /// Prepared (unsent) "initialized" statement
    pub fn initialized_statement(&self) -> Result<Statement, Cmi5Error> {
        self.builder()?.initialized()
    }

    /// Prepared (unsent) "terminated" statement
    pub fn terminated_statement(&self) -> Result<Statement, Cmi5Error> {
        self.builder()?.terminated(self.elapsed_millis())
    }

    /// Prepared (unsent) "passed" statement
    pub fn passed_statement(&self, score: Option<&Score>) -> Result<Statement, Cmi5Error> {
        self.builder()?.passed(score, self.elapsed_millis())
    }

    /// Prepared (unsent) "failed" statement
    pub fn failed_statement(&self, score: Option<&Score>) -> Result<Statement, Cmi5Error> {
        self.builder()?.failed(score, self.elapsed_millis())
    }

    /// Prepared (unsent) "completed" statement
    pub fn completed_statement(&self) -> Result<Statement, Cmi5Error> {
        self.builder()?.completed(self.elapsed_millis())
    }

    /// Store a prepared statement in the LRS
    pub async fn send_statement(&self, statement: &Statement) -> Result<(), Cmi5Error> {
        self.client.write_statement(statement).await
    }

    /// Store a batch of prepared statements in the LRS
    pub async fn send_statements(&self, statements: &[Statement]) -> Result<(), Cmi5Error> {
        self.client.write_statements(statements).await
    }

    // ==================== Internals ====================

    fn launch_data_ref(&self) -> Result<&LaunchData, StateError> {
        self.launch_data
            .as_ref()
            .ok_or(StateError::LaunchDataNotLoaded)
    }

    fn preferences_ref(&self) -> Result<&PreferenceState, StateError> {
        self.preferences
            .as_ref()
            .ok_or(StateError::PreferencesNotLoaded)
    }

    fn builder(&self) -> Result<StatementBuilder<'_>, StateError> {
        let launch_data = self
            .launch_data
            .as_ref()
            .ok_or(StateError::LaunchDataNotLoaded)?;
        Ok(StatementBuilder::new(
            self.context.actor(),
            self.context.activity_id(),
            self.context.registration(),
            &launch_data.context_template,
        )
        .mastery_score(launch_data.mastery_score)
        .progress(self.progress)
        .include_source_activity(self.config.include_source_activity))
    }

    fn require_normal_active(&self) -> Result<(), StateError> {
        if !self.is_active() {
            return Err(StateError::NotActive);
        }
        let mode = self.launch_mode()?;
        if mode != LaunchMode::Normal {
            return Err(StateError::NotNormalMode(mode));
        }
        Ok(())
    }

    fn elapsed_millis(&self) -> u64 {
        self.duration_start
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}
