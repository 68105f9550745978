use std::time::Duration;

use anyhow::{Context, Result};
use egta_client::{ClientConfig, RetryPolicy};
use serde::Deserialize;

/// Connection settings read from `EGTA_*` environment variables and an
/// optional `egta.toml` in the working directory.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub retry_delay_secs: Option<f64>,
    #[serde(default)]
    pub retry_backoff: Option<f64>,
    /// Comma separated status codes, e.g. `502,504`.
    #[serde(default)]
    pub retry_on: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name("egta").required(false))
            .add_source(config::Environment::with_prefix("EGTA"))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("failed to load EGTA settings")
    }

    pub fn client_config(&self) -> Result<ClientConfig> {
        let token = self
            .auth_token
            .clone()
            .context("no auth token; set EGTA_AUTH_TOKEN or pass --auth-token")?;
        let mut config = ClientConfig::new(token);
        if let Some(base_url) = &self.base_url {
            config = config
                .with_base_url(base_url)
                .with_context(|| format!("invalid base url {base_url}"))?;
        } else if let Some(domain) = &self.domain {
            config = config
                .with_domain(domain)
                .with_context(|| format!("invalid domain {domain}"))?;
        }

        let mut retry = RetryPolicy::default();
        if let Some(retries) = self.retries {
            retry = retry.with_max_retries(retries);
        }
        if let Some(delay) = self.retry_delay_secs {
            retry = retry.with_delay(
                Duration::try_from_secs_f64(delay).context("retry delay must be a non-negative number")?,
            );
        }
        if let Some(backoff) = self.retry_backoff {
            retry = retry.with_backoff(backoff);
        }
        if let Some(codes) = &self.retry_on {
            retry = retry.with_retry_on(parse_codes(codes)?);
        }
        config = config.with_retry(retry);

        if let Some(timeout) = self.timeout_secs {
            config = config.with_timeout(
                Duration::try_from_secs_f64(timeout).context("timeout must be a non-negative number")?,
            );
        }
        Ok(config)
    }
}

fn parse_codes(codes: &str) -> Result<Vec<u16>> {
    codes
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| {
            code.parse()
                .with_context(|| format!("invalid status code {code:?}"))
        })
        .collect()
}
