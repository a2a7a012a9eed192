use crate::SqliteClient;
use sluice_core::{Config, Driver, Error, Result};
use std::ffi::{CString, c_int};
use url::form_urlencoded;

/// Busy timeout applied when neither the URL nor the config sets one.
pub const DEFAULT_BUSY_TIMEOUT_MS: c_int = 5_000;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDriver;

impl SqliteDriver {
    pub const fn new() -> Self {
        Self
    }
}

/// Open target derived from a `sqlite://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Target {
    pub(crate) filename: CString,
    pub(crate) busy_timeout: c_int,
}

pub(crate) fn parse_target(config: &Config) -> Result<Target> {
    let prefix = format!("{}://", SqliteDriver::NAME);
    let Some(rest) = config.url.strip_prefix(&prefix) else {
        return Err(Error::msg(format!(
            "Expected sqlite connection url to start with `{}`",
            &prefix
        )));
    };
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
    if path.is_empty() {
        return Err(Error::msg(format!(
            "The sqlite connection url `{}` does not name a database",
            config.redacted_url()
        )));
    }
    let mut busy_timeout = config
        .extra
        .get("busy_timeout")
        .and_then(|v| v.as_i64())
        .map(|v| v.clamp(0, c_int::MAX as i64) as c_int)
        .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);
    let mut parameters = form_urlencoded::Serializer::new(String::new());
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key == "busy_timeout" {
            busy_timeout = value.parse().map_err(|_| {
                Error::msg(format!("Invalid busy_timeout `{value}` in the sqlite url"))
            })?;
        } else {
            parameters.append_pair(&key, &value);
        }
    }
    let parameters = parameters.finish();
    let filename = if parameters.is_empty() {
        urlencoding::decode(path)
            .map_err(|e| Error::new(e).context("Invalid percent encoding in the sqlite url"))?
            .into_owned()
    } else {
        // URI filename so SQLite honours the parameters, the path stays percent encoded
        format!("file:{path}?{parameters}")
    };
    Ok(Target {
        filename: CString::new(filename)
            .map_err(|e| Error::new(e).context("The sqlite url contains a NUL byte"))?,
        busy_timeout,
    })
}

impl Driver for SqliteDriver {
    type Client = SqliteClient;

    const NAME: &'static str = "sqlite";

    fn create_client(&self, config: &Config) -> Result<SqliteClient> {
        let target = parse_target(config).map_err(|e| {
            let e = e.context(format!("While configuring `{}`", config.redacted_url()));
            log::error!("{:#}", e);
            e
        })?;
        if config.user.is_some() || config.password.is_some() {
            log::debug!("SQLite ignores the configured credentials");
        }
        Ok(SqliteClient::new(target))
    }
}
