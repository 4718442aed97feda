//! Client configuration state and authenticators.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::codec::{
    BodyDeserializer, BodySerializer, JsonDeserializer, JsonSerializer, DEFAULT_JSON_CONTENT_TYPES,
};
use crate::error::ClientError;
use crate::request::{Parameter, ParameterKind, RestRequest};

/// Encodes a single URL path segment.
pub type UrlEncoder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Encodes a query name or value using the given character encoding label.
pub type QueryEncoder = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Adds credentials to a request before it is sent.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, request: &mut RestRequest) -> Result<(), ClientError>;
}

/// `Authorization: Basic ...`
#[derive(Debug, Clone)]
pub struct HttpBasicAuthenticator {
    username: String,
    password: String,
}

impl HttpBasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Authenticator for HttpBasicAuthenticator {
    fn authenticate(&self, request: &mut RestRequest) -> Result<(), ClientError> {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        set_authorization(request, format!("Basic {token}"));
        Ok(())
    }
}

/// `Authorization: Bearer <token>`
#[derive(Debug, Clone)]
pub struct BearerAuthenticator {
    token: String,
}

impl BearerAuthenticator {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Authenticator for BearerAuthenticator {
    fn authenticate(&self, request: &mut RestRequest) -> Result<(), ClientError> {
        set_authorization(request, format!("Bearer {}", self.token));
        Ok(())
    }
}

fn set_authorization(request: &mut RestRequest, value: String) {
    request.parameters.retain(|p| {
        !(p.kind == ParameterKind::HttpHeader && p.name.eq_ignore_ascii_case("authorization"))
    });
    request
        .parameters
        .push(Parameter::new("Authorization", value, ParameterKind::HttpHeader));
}

/// Outbound proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

/// A client identity: PEM-encoded certificate chain plus private key.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    pub pem: Vec<u8>,
}

impl std::fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("pem_len", &self.pem.len())
            .finish()
    }
}

/// A cookie sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Mutable configuration of a REST client.
#[derive(Clone)]
pub struct ClientOptions {
    /// Whole-request timeout; `None` disables it.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
    pub base_url: Option<Url>,
    /// Overrides the `Host` header.
    pub base_host: Option<String>,
    pub follow_redirects: bool,
    pub max_redirects: Option<usize>,
    /// Negotiate gzip/brotli/deflate and decode transparently.
    pub automatic_decompression: bool,
    pub proxy: Option<ProxyConfig>,
    pub client_certificates: Vec<ClientCertificate>,
    /// Skip server certificate validation.
    pub accept_invalid_certs: bool,
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub cookies: Vec<Cookie>,
    /// Character encoding label handed to the query encoder.
    pub encoding: String,
    pub throw_on_deserialization_error: bool,
    pub fail_on_deserialization_error: bool,
    /// Surface transport failures as `Err` instead of an error-status response.
    pub throw_on_any_error: bool,
    pub default_parameters: Vec<Parameter>,
    pub allow_multiple_default_parameters_with_same_name: bool,
    pub serializer: Arc<dyn BodySerializer>,
    /// Response deserializers keyed by normalized content type.
    pub handlers: HashMap<String, Arc<dyn BodyDeserializer>>,
    pub url_encoder: Option<UrlEncoder>,
    pub query_encoder: Option<QueryEncoder>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        let json: Arc<dyn BodyDeserializer> = Arc::new(JsonDeserializer);
        let handlers = DEFAULT_JSON_CONTENT_TYPES
            .iter()
            .map(|ct| (ct.to_string(), Arc::clone(&json)))
            .collect();

        Self {
            timeout: Some(Duration::from_secs(100)),
            connect_timeout: None,
            user_agent: format!("restguard/{}", env!("CARGO_PKG_VERSION")),
            base_url: None,
            base_host: None,
            follow_redirects: true,
            max_redirects: None,
            automatic_decompression: true,
            proxy: None,
            client_certificates: Vec::new(),
            accept_invalid_certs: false,
            authenticator: None,
            cookies: Vec::new(),
            encoding: "utf-8".into(),
            throw_on_deserialization_error: false,
            fail_on_deserialization_error: false,
            throw_on_any_error: true,
            default_parameters: Vec::new(),
            allow_multiple_default_parameters_with_same_name: false,
            serializer: Arc::new(JsonSerializer),
            handlers,
            url_encoder: None,
            query_encoder: None,
        }
    }
}

impl ClientOptions {
    /// Options pointing at `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            base_url: Some(base_url),
            ..Default::default()
        })
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();
        f.debug_struct("ClientOptions")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("base_host", &self.base_host)
            .field("follow_redirects", &self.follow_redirects)
            .field("max_redirects", &self.max_redirects)
            .field("automatic_decompression", &self.automatic_decompression)
            .field("proxy", &self.proxy)
            .field("client_certificates", &self.client_certificates.len())
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("authenticator", &self.authenticator.is_some())
            .field("cookies", &self.cookies)
            .field("encoding", &self.encoding)
            .field("throw_on_deserialization_error", &self.throw_on_deserialization_error)
            .field("fail_on_deserialization_error", &self.fail_on_deserialization_error)
            .field("throw_on_any_error", &self.throw_on_any_error)
            .field("default_parameters", &self.default_parameters)
            .field("serializer", &self.serializer.content_type())
            .field("handlers", &handlers)
            .finish_non_exhaustive()
    }
}
