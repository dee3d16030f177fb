//! Error types for cmi5-core

use thiserror::Error;

use crate::session::LaunchMode;

/// Top-level error type for cmi5-core
#[derive(Error, Debug)]
pub enum Cmi5Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

/// Errors from invalid launch parameters or actor shape
///
/// These are raised at construction time: a session is never created from a
/// launch string that is missing required parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required launch parameter is missing or empty
    #[error("missing or empty launch parameter: {0}")]
    MissingParameter(&'static str),

    /// The launch string itself is not a parseable URL
    #[error("invalid launch URL: {0}")]
    InvalidLaunchUrl(String),

    /// The endpoint parameter is not a valid URL
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    /// The fetch parameter is not a valid URL
    #[error("invalid fetch URL: {0}")]
    InvalidFetchUrl(String),

    /// The actor is not a well-formed agent with an account IFI
    #[error("invalid actor: {0}")]
    InvalidActor(String),

    /// The activity id is empty
    #[error("invalid activityId: {0}")]
    InvalidActivityId(String),

    /// The registration is not a UUID
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),
}

/// Errors from illegal lifecycle transitions or reads before load
#[derive(Error, Debug)]
pub enum StateError {
    /// Credentials have not been fetched from the fetch URL
    #[error("credentials have not been fetched")]
    CredentialsNotFetched,

    /// The LMS.LaunchData state document has not been loaded
    #[error("LMS launch data has not been loaded")]
    LaunchDataNotLoaded,

    /// Learner preferences have not been loaded
    #[error("learner preferences have not been loaded")]
    PreferencesNotLoaded,

    /// initialize() was called after a successful initialize()
    #[error("already initialized")]
    AlreadyInitialized,

    /// A lifecycle operation requires a successful initialize() first
    #[error("not initialized")]
    NotInitialized,

    /// terminate() was called after a successful terminate()
    #[error("already terminated")]
    AlreadyTerminated,

    /// The session is not active (not initialized, or already terminated)
    #[error("session is not active")]
    NotActive,

    /// completed/passed/failed are only allowed in Normal launch mode
    #[error("not in Normal launch mode (launch mode: {0})")]
    NotNormalMode(LaunchMode),

    /// completed() was called after a successful completed()
    #[error("already completed")]
    AlreadyCompleted,

    /// passed() or failed() was called after either had been recorded
    #[error("already passed or failed")]
    AlreadyJudged,
}

/// Errors from malformed or mastery-inconsistent scores, bad local values
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("score.min is not an integer")]
    MinNotInteger,

    #[error("score.max is not an integer")]
    MaxNotInteger,

    #[error("scaled score not a recognized number: {0}")]
    ScaledNotANumber(f64),

    #[error("scaled score must be between 0 and 1: {0}")]
    ScaledOutOfRange(f64),

    #[error("score.raw is not an integer")]
    RawNotInteger,

    #[error("minimum score must be provided when including a raw score")]
    RawWithoutMin,

    #[error("maximum score must be provided when including a raw score")]
    RawWithoutMax,

    #[error("raw score must be greater than or equal to minimum score")]
    RawBelowMin,

    #[error("raw score must be less than or equal to maximum score")]
    RawAboveMax,

    /// Scaled score fails to meet the mastery score on a passed statement
    #[error("scaled score does not meet or exceed mastery score ({scaled} < {mastery})")]
    BelowMastery { scaled: f64, mastery: f64 },

    /// Scaled score meets the mastery score on a failed statement
    #[error("scaled score meets or exceeds mastery score ({scaled} >= {mastery})")]
    AboveMastery { scaled: f64, mastery: f64 },

    /// Progress must be a percentage between 0 and 100
    #[error("invalid progress measure, must be between 0 and 100: {0}")]
    InvalidProgress(u8),

    /// Audio preference must be "on" or "off"
    #[error("unrecognized value for audio preference: {0}")]
    InvalidAudioPreference(String),

    /// ISO 8601 durations with year/month/day components are not supported
    #[error("ISO 8601 durations including years, months and/or days are not supported: {0}")]
    UnsupportedDuration(String),

    /// The ISO 8601 duration string could not be parsed
    #[error("invalid ISO 8601 duration: {0}")]
    InvalidDuration(String),
}

/// Errors from server responses that violate the expected document contract
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The fetch response parsed but carried no auth token
    #[error("fetch response missing auth token")]
    MissingAuthToken,

    /// The fetch response carried an LMS-reported error
    #[error("LMS reported error {code}: {text}")]
    LmsError { code: i64, text: String },

    /// A response body was not parseable as the expected JSON document
    #[error("malformed response body: {0}")]
    MalformedJson(String),

    /// The LMS.LaunchData state document is missing from the LRS
    ///
    /// The LMS is contractually required to have populated this document
    /// before launching the AU, so absence is fatal.
    #[error("LMS.LaunchData state document not found")]
    MissingLaunchData,
}

/// Errors from transport failures or unexpected HTTP statuses
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The request could not be completed at the transport level
    #[error("request failed: {0}")]
    Transport(String),

    /// The response status was not the documented success code
    #[error("unexpected response status: {0}")]
    UnexpectedStatus(u16),
}
