//! Validated launch parameters

use url::Url;
use uuid::Uuid;

use super::Agent;
use crate::error::ConfigError;

/// The required launch string query parameters, in the order they are
/// checked
const REQUIRED_PARAMETERS: [&str; 5] = ["endpoint", "fetch", "actor", "activityId", "registration"];

/// Immutable, validated launch parameters for one AU session
///
/// Constructed once from the launch string (or directly from already-parsed
/// values) and never modified afterwards. Construction fails fast if any
/// required parameter is missing or malformed.
#[derive(Debug, Clone)]
pub struct LaunchContext {
    endpoint: Url,
    fetch_url: Url,
    actor: Agent,
    activity_id: String,
    registration: Uuid,
}

impl LaunchContext {
    /// Build a launch context from already-parsed values
    pub fn new(
        endpoint: Url,
        fetch_url: Url,
        actor: Agent,
        activity_id: impl Into<String>,
        registration: Uuid,
    ) -> Result<Self, ConfigError> {
        let activity_id = activity_id.into();
        if activity_id.is_empty() {
            return Err(ConfigError::InvalidActivityId("empty string".to_string()));
        }

        Ok(Self {
            endpoint: normalize_endpoint(endpoint),
            fetch_url,
            actor,
            activity_id,
            registration,
        })
    }

    /// Parse a launch context out of the AU launch URL supplied by the LMS
    ///
    /// The launch string must carry `endpoint`, `fetch`, `actor` (JSON),
    /// `activityId` and `registration` (UUID) query parameters.
    pub fn from_launch_url(launch_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(launch_url)
            .map_err(|e| ConfigError::InvalidLaunchUrl(format!("{launch_url}: {e}")))?;

        let param = |name: &'static str| -> Result<String, ConfigError> {
            url.query_pairs()
                .find(|(key, value)| key == name && !value.is_empty())
                .map(|(_, value)| value.into_owned())
                .ok_or(ConfigError::MissingParameter(name))
        };

        // check all required parameters up front so the first missing one
        // is reported by name
        for name in REQUIRED_PARAMETERS {
            param(name)?;
        }

        let endpoint = Url::parse(&param("endpoint")?)
            .map_err(|e| ConfigError::InvalidEndpoint(e.to_string()))?;
        let fetch_url = Url::parse(&param("fetch")?)
            .map_err(|e| ConfigError::InvalidFetchUrl(e.to_string()))?;
        let actor = Agent::from_json_str(&param("actor")?)?;
        let registration = Uuid::parse_str(&param("registration")?)
            .map_err(|e| ConfigError::InvalidRegistration(e.to_string()))?;

        Self::new(endpoint, fetch_url, actor, param("activityId")?, registration)
    }

    /// LRS endpoint, normalized to end with a trailing slash
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetch URL used for the one-time credential exchange
    pub fn fetch_url(&self) -> &Url {
        &self.fetch_url
    }

    /// The learner's agent
    pub fn actor(&self) -> &Agent {
        &self.actor
    }

    /// Activity id of the AU
    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    /// Registration correlating all statements of this attempt
    pub fn registration(&self) -> Uuid {
        self.registration
    }
}

/// Ensure the endpoint path ends with `/` so joining xAPI resource paths
/// appends rather than replaces the last path segment
fn normalize_endpoint(mut endpoint: Url) -> Url {
    if !endpoint.path().ends_with('/') {
        let path = format!("{}/", endpoint.path());
        endpoint.set_path(&path);
    }
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRATION: &str = "11111111-1111-1111-1111-111111111111";

    fn launch_url() -> String {
        let actor = r#"{"account":{"name":"u1","homePage":"https://x"}}"#;
        format!(
            "https://au.example.com/index.html?endpoint={}&fetch={}&actor={}&activityId={}&registration={}",
            urlencode("https://lrs.example.com/xapi"),
            urlencode("https://lms.example.com/fetch?session=42"),
            urlencode(actor),
            urlencode("https://example.com/activity/act1"),
            REGISTRATION,
        )
    }

    fn urlencode(value: &str) -> String {
        let mut out = String::new();
        for byte in value.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    out.push(byte as char);
                }
                _ => out.push_str(&format!("%{byte:02X}")),
            }
        }
        out
    }

    #[test]
    fn parses_complete_launch_url() {
        let context = LaunchContext::from_launch_url(&launch_url()).unwrap();
        assert_eq!(context.endpoint().as_str(), "https://lrs.example.com/xapi/");
        assert_eq!(
            context.fetch_url().as_str(),
            "https://lms.example.com/fetch?session=42"
        );
        assert_eq!(context.actor().account.name, "u1");
        assert_eq!(context.activity_id(), "https://example.com/activity/act1");
        assert_eq!(context.registration().to_string(), REGISTRATION);
    }

    #[test]
    fn missing_parameter_is_reported_by_name() {
        let url = launch_url().replace("&registration=11111111-1111-1111-1111-111111111111", "");
        let err = LaunchContext::from_launch_url(&url).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter("registration")));
    }

    #[test]
    fn empty_parameter_counts_as_missing() {
        let url = format!("{}&junk=1", launch_url()).replace(
            "11111111-1111-1111-1111-111111111111",
            "",
        );
        let err = LaunchContext::from_launch_url(&url).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter("registration")));
    }

    #[test]
    fn rejects_non_uuid_registration() {
        let url = launch_url().replace(REGISTRATION, "not-a-uuid");
        let err = LaunchContext::from_launch_url(&url).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegistration(_)));
    }

    #[test]
    fn rejects_unparseable_launch_string() {
        let err = LaunchContext::from_launch_url("not a url").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLaunchUrl(_)));
    }

    #[test]
    fn endpoint_gains_trailing_slash() {
        let context = LaunchContext::from_launch_url(&launch_url()).unwrap();
        let joined = context.endpoint().join("activities/state").unwrap();
        assert_eq!(
            joined.as_str(),
            "https://lrs.example.com/xapi/activities/state"
        );
    }

    #[test]
    fn new_rejects_empty_activity_id() {
        let err = LaunchContext::new(
            Url::parse("https://lrs.example.com/xapi/").unwrap(),
            Url::parse("https://lms.example.com/fetch").unwrap(),
            Agent::from_account("u1", "https://x").unwrap(),
            "",
            Uuid::parse_str(REGISTRATION).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidActivityId(_)));
    }
}
