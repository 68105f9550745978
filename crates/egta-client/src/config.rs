use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::Result;
use crate::retry::RetryPolicy;

pub const DEFAULT_DOMAIN: &str = "egtaonline.eecs.umich.edu";

#[derive(Clone)]
pub struct ClientConfig {
    /// Site root; API calls go under `api/v3/`.
    pub base_url: Url,
    pub auth_token: String,
    pub retry: RetryPolicy,
    /// Bound on each individual attempt, not on the whole retry sequence.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(auth_token: impl Into<String>) -> Self {
        Self {
            base_url: Url::parse(&format!("https://{DEFAULT_DOMAIN}/"))
                .expect("default domain is a valid url"),
            auth_token: auth_token.into(),
            retry: RetryPolicy::default(),
            timeout: None,
        }
    }

    /// Points the client at `https://{domain}/`.
    pub fn with_domain(self, domain: &str) -> Result<Self> {
        self.with_base_url(&format!("https://{domain}"))
    }

    /// Points the client at an explicit site root, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = url;
        Ok(self)
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("auth_token", &"<redacted>")
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}
