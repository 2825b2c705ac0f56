use anyhow::{bail, Context};
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.dune.com/api/echo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. `from_env` is the
    /// only production caller.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("DUNE_API_KEY")
            .or_else(|| lookup("ECHO_API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .context("DUNE_API_KEY (or ECHO_API_KEY) must be set")?;

        let base_url = lookup("DUNE_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let base_url = Url::parse(&base_url)
            .with_context(|| format!("DUNE_API_BASE_URL is not a valid URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            bail!("DUNE_API_BASE_URL cannot be used as a base URL: {base_url}");
        }

        let timeout_secs = match lookup("DUNE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("DUNE_REQUEST_TIMEOUT_SECS must be an integer, got {raw:?}"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            bail!("DUNE_REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            api_key,
            base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
