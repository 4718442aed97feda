//! JSON settings for building a client and its policies at startup.
//!
//! ```json
//! {
//!   "client": { "base_url": "https://api.example.com", "timeout_ms": 5000 },
//!   "retry": { "max_retries": 3, "initial_backoff_ms": 200 },
//!   "timeout_ms": 10000
//! }
//! ```
//!
//! Every field is optional; absent fields keep the library defaults.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ClientError;
use crate::options::{ClientOptions, Cookie, ProxyConfig};
use crate::policy::retry::millis;
use crate::policy::{Backoff, RetryConfig, TimeoutPolicy};
use crate::request::{Parameter, ParameterKind};

/// Top-level settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    pub client: ClientSettings,
    /// Present → a retry policy is installed.
    pub retry: Option<RetrySettings>,
    /// Present → async calls are bounded by a timeout policy.
    pub timeout_ms: Option<u64>,
}

/// Overrides applied on top of [`ClientOptions::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub base_url: Option<String>,
    pub base_host: Option<String>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
    pub follow_redirects: Option<bool>,
    pub max_redirects: Option<usize>,
    pub automatic_decompression: Option<bool>,
    pub accept_invalid_certs: Option<bool>,
    pub proxy: Option<ProxySettings>,
    pub encoding: Option<String>,
    pub throw_on_any_error: Option<bool>,
    pub throw_on_deserialization_error: Option<bool>,
    pub fail_on_deserialization_error: Option<bool>,
    /// Sent as headers on every request.
    pub headers: Vec<(String, String)>,
    /// Added to the query string of every request.
    pub query: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    /// Default parameters of any kind, e.g.
    /// `{ "name": "version", "value": "v2", "kind": "url_segment" }`.
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// `None` means a fixed interval.
    pub multiplier: Option<u64>,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let base = RetryConfig::default();
        let multiplier = match base.backoff {
            Backoff::Exponential { multiplier } => Some(multiplier),
            Backoff::Fixed => None,
        };
        Self {
            max_retries: base.max_retries,
            initial_backoff_ms: millis(base.initial_backoff),
            max_backoff_ms: millis(base.max_backoff),
            multiplier,
            jitter: base.jitter,
        }
    }
}

impl RetrySettings {
    pub fn to_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            backoff: match self.multiplier {
                Some(multiplier) => Backoff::Exponential { multiplier },
                None => Backoff::Fixed,
            },
            jitter: self.jitter,
        }
    }
}

impl GuardSettings {
    pub fn from_json_str(json: &str) -> Result<Self, ClientError> {
        serde_json::from_str(json)
            .map_err(|e| ClientError::Configuration(format!("invalid settings: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Build a full [`ClientOptions`] from these settings.
    pub fn client_options(&self) -> Result<ClientOptions, ClientError> {
        let mut options = ClientOptions::default();
        self.client.apply_to(&mut options)?;
        Ok(options)
    }

    pub fn retry_config(&self) -> Option<RetryConfig> {
        self.retry.as_ref().map(RetrySettings::to_config)
    }

    pub fn timeout_policy(&self) -> Option<TimeoutPolicy> {
        self.timeout_ms
            .map(|ms| TimeoutPolicy::new(Duration::from_millis(ms)))
    }
}

impl ClientSettings {
    /// Overwrite the fields of `options` that are set here.
    pub fn apply_to(&self, options: &mut ClientOptions) -> Result<(), ClientError> {
        if let Some(base) = &self.base_url {
            let url = Url::parse(base).map_err(|e| ClientError::InvalidUrl(format!("{base}: {e}")))?;
            options.base_url = Some(url);
        }
        if let Some(host) = &self.base_host {
            options.base_host = Some(host.clone());
        }
        if let Some(ms) = self.timeout_ms {
            options.timeout = Some(Duration::from_millis(ms));
        }
        if let Some(ms) = self.connect_timeout_ms {
            options.connect_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(ua) = &self.user_agent {
            options.user_agent = ua.clone();
        }
        if let Some(follow) = self.follow_redirects {
            options.follow_redirects = follow;
        }
        if self.max_redirects.is_some() {
            options.max_redirects = self.max_redirects;
        }
        if let Some(enabled) = self.automatic_decompression {
            options.automatic_decompression = enabled;
        }
        if let Some(accept) = self.accept_invalid_certs {
            options.accept_invalid_certs = accept;
        }
        if let Some(proxy) = &self.proxy {
            let mut config = ProxyConfig::new(proxy.url.clone());
            if let Some(user) = &proxy.username {
                config = config.with_credentials(user.clone(), proxy.password.clone().unwrap_or_default());
            }
            options.proxy = Some(config);
        }
        if let Some(encoding) = &self.encoding {
            options.encoding = encoding.clone();
        }
        if let Some(throw) = self.throw_on_any_error {
            options.throw_on_any_error = throw;
        }
        if let Some(throw) = self.throw_on_deserialization_error {
            options.throw_on_deserialization_error = throw;
        }
        if let Some(fail) = self.fail_on_deserialization_error {
            options.fail_on_deserialization_error = fail;
        }

        for (name, value) in &self.headers {
            options
                .default_parameters
                .push(Parameter::new(name.clone(), value.clone(), ParameterKind::HttpHeader));
        }
        for (name, value) in &self.query {
            options
                .default_parameters
                .push(Parameter::new(name.clone(), value.clone(), ParameterKind::QueryString));
        }
        options
            .default_parameters
            .extend(self.parameters.iter().cloned());
        options
            .cookies
            .extend(self.cookies.iter().map(|(n, v)| Cookie::new(n.clone(), v.clone())));
        Ok(())
    }
}
