use crate::{Context, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Connection parameters handed to [`Driver::create_client`](crate::Driver::create_client).
///
/// Keys other than the ones named here are preserved in `extra` and passed
/// through to the driver untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Config {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            max_pool_size: None,
            extra: Map::new(),
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    pub fn from_json(value: JsonValue) -> Result<Self> {
        serde_json::from_value(value).context("Invalid persistence configuration")
    }

    /// Read the configuration stored under `section` of a larger document.
    pub fn from_section(document: &JsonValue, section: &str) -> Result<Self> {
        let Some(value) = document.get(section) else {
            let error = Error::msg(format!(
                "The configuration does not contain a `{section}` section"
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        Self::from_json(value.clone()).with_context(|| format!("In section `{section}`"))
    }

    /// The JSON connection descriptor drivers receive.
    pub fn descriptor(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }

    /// URL without user info and query parameters, for logging.
    pub fn redacted_url(&self) -> String {
        let url = self.url.split_once('?').map_or(self.url.as_str(), |(v, _)| v);
        let Some((scheme, rest)) = url.split_once("://") else {
            return url.to_string();
        };
        let end = rest.find('/').unwrap_or(rest.len());
        let host = rest[..end].rsplit_once('@').map_or(&rest[..end], |(_, v)| v);
        format!("{scheme}://{host}{}", &rest[end..])
    }

    /// Scheme of the URL, if it has one.
    pub fn scheme(&self) -> Option<&str> {
        self.url.split_once("://").map(|(scheme, _)| scheme)
    }
}
