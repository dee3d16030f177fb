//! The LRS protocol client
//!
//! Four operations, each a single HTTP exchange. Response classification is
//! strict: a 2xx status other than the documented success code for an
//! operation is still a failure, 404 counts as success-with-absence only
//! for the learner-preferences profile, and a malformed JSON body is a
//! protocol violation rather than a network failure.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::transport::{HttpRequest, Method, Transport};
use crate::error::{Cmi5Error, ConfigError, NetworkError, ProtocolError};
use crate::launch::Agent;
use crate::session::{LaunchData, LearnerPreferences};
use crate::statement::Statement;
use crate::statement::vocabulary::{
    PROFILE_LEARNER_PREFERENCES, STATE_LMS_LAUNCH_DATA, XAPI_VERSION,
};

/// Body of the fetch URL exchange
#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(rename = "auth-token")]
    auth_token: Option<String>,
    #[serde(rename = "error-code")]
    error_code: Option<i64>,
    #[serde(rename = "error-text")]
    error_text: Option<String>,
}

/// A profile document read from the LRS, with its concurrency token
#[derive(Debug, Clone)]
pub struct ProfileDocument {
    pub contents: LearnerPreferences,
    pub etag: Option<String>,
}

/// Outcome of a profile write
///
/// A 403 is a documented non-error: the LMS may disallow the AU from
/// writing preferences without that being a fault in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileWriteOutcome {
    Saved { etag: Option<String> },
    Denied,
}

/// Client for the four cmi5 network operations
///
/// Owned by one session; holds the auth header obtained from the credential
/// exchange and applies it, with the xAPI version header, to every LRS
/// request.
pub struct LrsClient {
    transport: Arc<dyn Transport>,
    endpoint: Url,
    auth: Option<String>,
}

impl LrsClient {
    /// Create a client for the given endpoint
    ///
    /// The endpoint is expected to be normalized with a trailing slash, as
    /// `LaunchContext` guarantees.
    pub fn new(endpoint: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            endpoint,
            auth: None,
        }
    }

    /// Set the Authorization header value for subsequent requests
    pub fn set_auth(&mut self, auth: String) {
        self.auth = Some(auth);
    }

    /// Current Authorization header value, if credentials were exchanged
    pub fn auth(&self) -> Option<&str> {
        self.auth.as_deref()
    }

    /// POST the fetch URL and extract the one-time auth token
    pub async fn exchange_credentials(&self, fetch_url: &Url) -> Result<String, Cmi5Error> {
        debug!(url = %fetch_url, "exchanging credentials");

        let request = HttpRequest::new(Method::Post, fetch_url.clone());
        let response = self.transport.execute(request).await?;

        if response.status != 200 {
            return Err(NetworkError::UnexpectedStatus(response.status).into());
        }

        let body: FetchResponse = serde_json::from_str(&response.body)
            .map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;

        if let Some(token) = body.auth_token {
            return Ok(token);
        }
        if let Some(code) = body.error_code {
            return Err(ProtocolError::LmsError {
                code,
                text: body.error_text.unwrap_or_default(),
            }
            .into());
        }

        Err(ProtocolError::MissingAuthToken.into())
    }

    /// GET the LMS.LaunchData state document
    ///
    /// The LMS is required to have written this document before launch, so
    /// a 404 is fatal here, unlike the other document reads.
    pub async fn read_launch_data(
        &self,
        activity_id: &str,
        actor: &Agent,
        registration: Uuid,
    ) -> Result<LaunchData, Cmi5Error> {
        let mut url = self.resource_url("activities/state")?;
        url.query_pairs_mut()
            .append_pair("stateId", STATE_LMS_LAUNCH_DATA)
            .append_pair("activityId", activity_id)
            .append_pair("agent", &agent_json(actor)?)
            .append_pair("registration", &registration.to_string());

        let request = self.request(Method::Get, url);
        let response = self.transport.execute(request).await?;

        match response.status {
            200 => serde_json::from_str(&response.body)
                .map_err(|e| ProtocolError::MalformedJson(e.to_string()).into()),
            404 => Err(ProtocolError::MissingLaunchData.into()),
            status => Err(NetworkError::UnexpectedStatus(status).into()),
        }
    }

    /// GET the learner-preferences agent profile document
    ///
    /// `Ok(None)` means the LMS never wrote one, which is a valid state.
    pub async fn read_learner_preferences(
        &self,
        actor: &Agent,
    ) -> Result<Option<ProfileDocument>, Cmi5Error> {
        let url = self.profile_url(actor)?;
        let request = self.request(Method::Get, url);
        let response = self.transport.execute(request).await?;

        match response.status {
            200 => {
                let contents: LearnerPreferences = serde_json::from_str(&response.body)
                    .map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
                Ok(Some(ProfileDocument {
                    contents,
                    etag: response.etag,
                }))
            }
            404 => {
                debug!("learner preferences not found (expected)");
                Ok(None)
            }
            status => Err(NetworkError::UnexpectedStatus(status).into()),
        }
    }

    /// PUT the learner-preferences agent profile document
    ///
    /// Uses optimistic concurrency: `If-Match` with the known token, or
    /// `If-None-Match: *` when the document has never been seen.
    pub async fn write_learner_preferences(
        &self,
        actor: &Agent,
        preferences: &LearnerPreferences,
        etag: Option<&str>,
    ) -> Result<ProfileWriteOutcome, Cmi5Error> {
        let url = self.profile_url(actor)?;
        let body = serde_json::to_string(preferences)
            .map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;

        let mut request = self
            .request(Method::Put, url)
            .header("Content-Type", "application/json")
            .body(body);
        request = match etag {
            Some(etag) => request.header("If-Match", etag),
            None => request.header("If-None-Match", "*"),
        };

        let response = self.transport.execute(request).await?;
        match response.status {
            204 => Ok(ProfileWriteOutcome::Saved {
                etag: response.etag,
            }),
            403 => Ok(ProfileWriteOutcome::Denied),
            status => Err(NetworkError::UnexpectedStatus(status).into()),
        }
    }

    /// PUT a single statement, keyed by its id
    ///
    /// Success is exactly 204; any other status, 2xx included, fails.
    pub async fn write_statement(&self, statement: &Statement) -> Result<(), Cmi5Error> {
        debug!(id = %statement.id, verb = %statement.verb.id, "sending statement");

        let mut url = self.resource_url("statements")?;
        url.query_pairs_mut()
            .append_pair("statementId", &statement.id.to_string());

        let body = serde_json::to_string(statement)
            .map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
        let request = self
            .request(Method::Put, url)
            .header("Content-Type", "application/json")
            .body(body);

        self.expect_no_content(request).await
    }

    /// POST a batch of statements
    pub async fn write_statements(&self, statements: &[Statement]) -> Result<(), Cmi5Error> {
        debug!(count = statements.len(), "sending statement batch");

        let url = self.resource_url("statements")?;
        let body = serde_json::to_string(statements)
            .map_err(|e| ProtocolError::MalformedJson(e.to_string()))?;
        let request = self
            .request(Method::Post, url)
            .header("Content-Type", "application/json")
            .body(body);

        self.expect_no_content(request).await
    }

    async fn expect_no_content(&self, request: HttpRequest) -> Result<(), Cmi5Error> {
        let response = self.transport.execute(request).await?;
        match response.status {
            204 => Ok(()),
            status => Err(NetworkError::UnexpectedStatus(status).into()),
        }
    }

    fn request(&self, method: Method, url: Url) -> HttpRequest {
        let mut request =
            HttpRequest::new(method, url).header("X-Experience-API-Version", XAPI_VERSION);
        if let Some(auth) = &self.auth {
            request = request.header("Authorization", auth.clone());
        }
        request
    }

    fn resource_url(&self, path: &str) -> Result<Url, Cmi5Error> {
        self.endpoint
            .join(path)
            .map_err(|e| ConfigError::InvalidEndpoint(e.to_string()).into())
    }

    fn profile_url(&self, actor: &Agent) -> Result<Url, Cmi5Error> {
        let mut url = self.resource_url("agents/profile")?;
        url.query_pairs_mut()
            .append_pair("profileId", PROFILE_LEARNER_PREFERENCES)
            .append_pair("agent", &agent_json(actor)?);
        Ok(url)
    }
}

fn agent_json(actor: &Agent) -> Result<String, Cmi5Error> {
    serde_json::to_string(actor).map_err(|e| ProtocolError::MalformedJson(e.to_string()).into())
}
