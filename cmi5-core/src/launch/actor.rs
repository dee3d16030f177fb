//! Learner identity
//!
//! cmi5 requires the learner to be identified by an account IFI: an
//! `account` record with a non-empty `name` and `homePage`. No other xAPI
//! identifier form (mbox, mbox_sha1sum, openid) is accepted here, so hosts
//! can count on the shape of the actor in every statement.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The learner's xAPI agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Optional display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional explicit object type ("Agent")
    #[serde(rename = "objectType", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Account identifier, the only IFI form accepted by this runtime
    pub account: AgentAccount,
}

/// Account identifier for an [`Agent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAccount {
    /// Account name within the home page's namespace
    pub name: String,
    /// System that issued the account
    #[serde(rename = "homePage")]
    pub home_page: String,
}

impl Agent {
    /// Build an agent from an account name and home page
    pub fn from_account(
        name: impl Into<String>,
        home_page: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let agent = Self {
            name: None,
            object_type: None,
            account: AgentAccount {
                name: name.into(),
                home_page: home_page.into(),
            },
        };
        agent.validate()?;
        Ok(agent)
    }

    /// Parse and validate an agent from a JSON string, as received in the
    /// `actor` launch parameter
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidActor(format!("failed to parse JSON: {e}")))?;
        Self::from_json(value)
    }

    /// Parse and validate an agent from a JSON value
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        if value.get("account").is_none() {
            return Err(ConfigError::InvalidActor("account is missing".to_string()));
        }

        let agent: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::InvalidActor(e.to_string()))?;
        agent.validate()?;
        Ok(agent)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.account.name.is_empty() {
            return Err(ConfigError::InvalidActor(
                "account name is empty".to_string(),
            ));
        }
        if self.account.home_page.is_empty() {
            return Err(ConfigError::InvalidActor(
                "account homePage is empty".to_string(),
            ));
        }
        Ok(())
    }
}
