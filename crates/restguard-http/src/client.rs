//! `RestClient` implementation backed by `reqwest`.
//!
//! Features:
//! - Blocking and async execution from one configuration
//! - Lazily built transports, rebuilt after every configuration change
//! - Transport failures folded into responses when `throw_on_any_error` is off
//! - Cancellation through `CancellationToken`

use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use restguard_core::client::RestClient;
use restguard_core::error::ClientError;
use restguard_core::options::ClientOptions;
use restguard_core::request::{Method, RestRequest};
use restguard_core::response::{ResponseStatus, RestResponse};

use crate::prepare::{prepare, Prepared};

/// Applies the transport-level options to a reqwest builder. Both the
/// async and the blocking builder expose the same methods.
macro_rules! configure_builder {
    ($builder:expr, $options:expr) => {{
        let options: &ClientOptions = $options;
        let mut builder = $builder.user_agent(options.user_agent.as_str());

        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let redirects = if !options.follow_redirects {
            reqwest::redirect::Policy::none()
        } else if let Some(max) = options.max_redirects {
            reqwest::redirect::Policy::limited(max)
        } else {
            reqwest::redirect::Policy::default()
        };
        builder = builder.redirect(redirects);

        builder = builder
            .gzip(options.automatic_decompression)
            .brotli(options.automatic_decompression)
            .deflate(options.automatic_decompression);

        if let Some(proxy) = &options.proxy {
            let mut p = reqwest::Proxy::all(proxy.url.as_str())
                .map_err(|e| ClientError::Configuration(format!("invalid proxy: {e}")))?;
            if let Some(username) = &proxy.username {
                p = p.basic_auth(username, proxy.password.as_deref().unwrap_or_default());
            }
            builder = builder.proxy(p);
        }

        for cert in &options.client_certificates {
            let identity = reqwest::Identity::from_pem(&cert.pem)
                .map_err(|e| ClientError::Configuration(format!("invalid client certificate: {e}")))?;
            builder = builder.identity(identity);
        }

        if options.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| ClientError::Configuration(format!("failed to build HTTP client: {e}")))
    }};
}

/// REST client over HTTP.
///
/// The blocking methods use `reqwest::blocking` and must not be called from
/// inside an async runtime; use `tokio::task::spawn_blocking` there.
pub struct HttpRestClient {
    options: RwLock<ClientOptions>,
    http: Mutex<Option<reqwest::Client>>,
    blocking: Mutex<Option<reqwest::blocking::Client>>,
}

impl HttpRestClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options: RwLock::new(options),
            http: Mutex::new(None),
            blocking: Mutex::new(None),
        }
    }

    /// Client with default options pointing at `base_url`.
    pub fn with_base_url(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self::new(ClientOptions::with_base_url(base_url)?))
    }

    fn http(&self) -> Result<reqwest::Client, ClientError> {
        let mut slot = self.http.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = configure_builder!(reqwest::Client::builder(), &self.options())?;
        tracing::debug!("built async HTTP transport");
        *slot = Some(client.clone());
        Ok(client)
    }

    fn blocking(&self) -> Result<reqwest::blocking::Client, ClientError> {
        let mut slot = self.blocking.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = configure_builder!(reqwest::blocking::Client::builder(), &self.options())?;
        tracing::debug!("built blocking HTTP transport");
        *slot = Some(client.clone());
        Ok(client)
    }

    fn send_blocking(
        &self,
        request: &RestRequest,
        verb: &str,
        carries_body: bool,
    ) -> Result<RestResponse, ClientError> {
        let options = self.options();
        let result = prepare(&options, request, verb, carries_body).and_then(|prepared| {
            let http = self.blocking()?;
            tracing::debug!(method = %prepared.method, url = %prepared.url, "sending request");

            let mut builder = http.request(prepared.method.clone(), prepared.url.clone());
            for (name, value) in &prepared.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some((content_type, data)) = &prepared.body {
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                    .body(data.clone());
            }
            if let Some(timeout) = prepared.timeout {
                builder = builder.timeout(timeout);
            }

            let resp = builder
                .send()
                .map_err(|e| transport_error(&e, &prepared, &options))?;
            let mut response = response_head(resp.status(), resp.headers(), resp.url());
            response.body = resp
                .bytes()
                .map_err(|e| transport_error(&e, &prepared, &options))?
                .to_vec();
            Ok(response)
        });
        settle(&options, result)
    }

    async fn send_async(
        &self,
        request: &RestRequest,
        verb: &str,
        carries_body: bool,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError> {
        let options = self.options();
        let exchange = async {
            let prepared = prepare(&options, request, verb, carries_body)?;
            let http = self.http()?;
            tracing::debug!(method = %prepared.method, url = %prepared.url, "sending request");

            let mut builder = http.request(prepared.method.clone(), prepared.url.clone());
            for (name, value) in &prepared.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some((content_type, data)) = &prepared.body {
                builder = builder
                    .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                    .body(data.clone());
            }
            if let Some(timeout) = prepared.timeout {
                builder = builder.timeout(timeout);
            }

            let resp = builder
                .send()
                .await
                .map_err(|e| transport_error(&e, &prepared, &options))?;
            let mut response = response_head(resp.status(), resp.headers(), resp.url());
            response.body = resp
                .bytes()
                .await
                .map_err(|e| transport_error(&e, &prepared, &options))?
                .to_vec();
            Ok::<_, ClientError>(response)
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(resource = %request.resource, "request cancelled");
                Err(ClientError::Cancelled)
            }
            result = exchange => result,
        };
        settle(&options, result)
    }
}

impl Default for HttpRestClient {
    fn default() -> Self {
        Self::new(ClientOptions::default())
    }
}

impl std::fmt::Debug for HttpRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRestClient")
            .field("options", &self.options())
            .finish_non_exhaustive()
    }
}

fn transport_error(e: &reqwest::Error, prepared: &Prepared, options: &ClientOptions) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout {
            ms: prepared.timeout_ms(options),
        }
    } else if e.is_builder() {
        ClientError::InvalidRequest(e.to_string())
    } else {
        ClientError::Http(e.to_string())
    }
}

fn response_head(
    status: reqwest::StatusCode,
    headers: &reqwest::header::HeaderMap,
    url: &url::Url,
) -> RestResponse {
    let headers: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
        .collect();
    let content_type = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        .map(|(_, v)| v.clone());

    RestResponse {
        status: status.as_u16(),
        headers,
        content_type,
        body: Vec::new(),
        response_uri: Some(url.clone()),
        response_status: ResponseStatus::Completed,
        error_message: None,
    }
}

/// With `throw_on_any_error` off, a failed exchange becomes a response
/// carrying the failure instead of an error.
fn settle(
    options: &ClientOptions,
    result: Result<RestResponse, ClientError>,
) -> Result<RestResponse, ClientError> {
    match result {
        Ok(response) => Ok(response),
        Err(e) if options.throw_on_any_error => {
            tracing::debug!(error = %e, "request failed");
            Err(e)
        }
        Err(e) => {
            let status = match e {
                ClientError::Timeout { .. } => ResponseStatus::TimedOut,
                ClientError::Cancelled => ResponseStatus::Aborted,
                _ => ResponseStatus::Error,
            };
            tracing::debug!(error = %e, %status, "request failed, returning error response");
            Ok(RestResponse::failed(status, e.to_string()))
        }
    }
}

#[async_trait]
impl RestClient for HttpRestClient {
    fn execute(&self, request: &RestRequest) -> Result<RestResponse, ClientError> {
        self.execute_with_method(request, request.method)
    }

    fn execute_with_method(
        &self,
        request: &RestRequest,
        method: Method,
    ) -> Result<RestResponse, ClientError> {
        self.send_blocking(request, method.as_str(), method.has_body())
    }

    fn execute_as_get(
        &self,
        request: &RestRequest,
        http_method: &str,
    ) -> Result<RestResponse, ClientError> {
        self.send_blocking(request, http_method, false)
    }

    fn execute_as_post(
        &self,
        request: &RestRequest,
        http_method: &str,
    ) -> Result<RestResponse, ClientError> {
        self.send_blocking(request, http_method, true)
    }

    fn download_data(&self, request: &RestRequest) -> Result<Vec<u8>, ClientError> {
        self.execute(request).map(|r| r.body)
    }

    async fn execute_async(
        &self,
        request: &RestRequest,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError> {
        self.execute_async_with_method(request, request.method, cancel)
            .await
    }

    async fn execute_async_with_method(
        &self,
        request: &RestRequest,
        method: Method,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError> {
        self.send_async(request, method.as_str(), method.has_body(), cancel)
            .await
    }

    fn options(&self) -> ClientOptions {
        self.options
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn configure(&self, f: &mut dyn FnMut(&mut ClientOptions)) {
        f(&mut self.options.write().unwrap_or_else(PoisonError::into_inner));
        // transports are rebuilt from the new options on next use
        self.http.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.blocking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
