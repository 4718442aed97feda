//! The `RestClient` trait, the contract every wrapped client implements.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::codec::{deserialize_response, normalize_content_type, BodyDeserializer, BodySerializer};
use crate::error::ClientError;
use crate::options::{
    Authenticator, ClientCertificate, ClientOptions, Cookie, ProxyConfig, QueryEncoder, UrlEncoder,
};
use crate::request::{Method, Parameter, RestRequest};
use crate::response::{RestResponse, TypedResponse};

/// A REST client: request execution plus mutable configuration.
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; configuration is mutated through
/// `&self` so a single instance can be shared behind an `Arc`.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn RestClient>`.
/// Typed variants live on [`RestClientExt`].
#[async_trait]
pub trait RestClient: Send + Sync + 'static {
    /// Send `request` with its own method, blocking the calling thread.
    fn execute(&self, request: &RestRequest) -> Result<RestResponse, ClientError>;

    /// Send `request` with `method` instead of its own.
    fn execute_with_method(
        &self,
        request: &RestRequest,
        method: Method,
    ) -> Result<RestResponse, ClientError>;

    /// Send `request` without a body using the raw verb `http_method`.
    fn execute_as_get(
        &self,
        request: &RestRequest,
        http_method: &str,
    ) -> Result<RestResponse, ClientError>;

    /// Send `request` with its body using the raw verb `http_method`.
    fn execute_as_post(
        &self,
        request: &RestRequest,
        http_method: &str,
    ) -> Result<RestResponse, ClientError>;

    /// Send `request` and return the raw response body.
    fn download_data(&self, request: &RestRequest) -> Result<Vec<u8>, ClientError>;

    async fn execute_async(
        &self,
        request: &RestRequest,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError>;

    async fn execute_async_with_method(
        &self,
        request: &RestRequest,
        method: Method,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError>;

    /// Send `request` as a `GET`.
    async fn execute_get_async(
        &self,
        request: &RestRequest,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError> {
        self.execute_async_with_method(request, Method::Get, cancel)
            .await
    }

    /// Send `request` as a `POST`.
    async fn execute_post_async(
        &self,
        request: &RestRequest,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError> {
        self.execute_async_with_method(request, Method::Post, cancel)
            .await
    }

    /// Snapshot of the current configuration.
    fn options(&self) -> ClientOptions;

    /// Mutate the configuration in place.
    fn configure(&self, f: &mut dyn FnMut(&mut ClientOptions));

    fn build_uri(&self, request: &RestRequest) -> Result<Url, ClientError> {
        crate::uri::build_uri(&self.options(), request)
    }

    fn build_uri_without_query_parameters(
        &self,
        request: &RestRequest,
    ) -> Result<String, ClientError> {
        crate::uri::build_uri_without_query_parameters(&self.options(), request)
    }

    // ─── Serializer / deserializer registration ─────────────────────────────

    /// Register the deserializer used for responses of `content_type`.
    fn add_handler(&self, content_type: &str, deserializer: Arc<dyn BodyDeserializer>) {
        let key = normalize_content_type(content_type);
        self.configure(&mut |o| {
            o.handlers.insert(key.clone(), Arc::clone(&deserializer));
        });
    }

    fn remove_handler(&self, content_type: &str) {
        let key = normalize_content_type(content_type);
        self.configure(&mut |o| {
            o.handlers.remove(&key);
        });
    }

    fn clear_handlers(&self) {
        self.configure(&mut |o| o.handlers.clear());
    }

    fn use_serializer(&self, serializer: Arc<dyn BodySerializer>) {
        self.configure(&mut |o| o.serializer = Arc::clone(&serializer));
    }

    fn use_url_encoder(&self, encoder: UrlEncoder) {
        self.configure(&mut |o| o.url_encoder = Some(Arc::clone(&encoder)));
    }

    fn use_query_encoder(&self, encoder: QueryEncoder) {
        self.configure(&mut |o| o.query_encoder = Some(Arc::clone(&encoder)));
    }

    // ─── Named configuration accessors ──────────────────────────────────────

    fn timeout(&self) -> Option<Duration> {
        self.options().timeout
    }

    fn set_timeout(&self, timeout: Option<Duration>) {
        self.configure(&mut |o| o.timeout = timeout);
    }

    fn connect_timeout(&self) -> Option<Duration> {
        self.options().connect_timeout
    }

    fn set_connect_timeout(&self, timeout: Option<Duration>) {
        self.configure(&mut |o| o.connect_timeout = timeout);
    }

    fn user_agent(&self) -> String {
        self.options().user_agent
    }

    fn set_user_agent(&self, user_agent: &str) {
        self.configure(&mut |o| o.user_agent = user_agent.to_string());
    }

    fn base_url(&self) -> Option<Url> {
        self.options().base_url
    }

    fn set_base_url(&self, base_url: Option<Url>) {
        self.configure(&mut |o| o.base_url = base_url.clone());
    }

    fn base_host(&self) -> Option<String> {
        self.options().base_host
    }

    fn set_base_host(&self, host: Option<String>) {
        self.configure(&mut |o| o.base_host = host.clone());
    }

    fn follow_redirects(&self) -> bool {
        self.options().follow_redirects
    }

    fn set_follow_redirects(&self, follow: bool) {
        self.configure(&mut |o| o.follow_redirects = follow);
    }

    fn max_redirects(&self) -> Option<usize> {
        self.options().max_redirects
    }

    fn set_max_redirects(&self, max: Option<usize>) {
        self.configure(&mut |o| o.max_redirects = max);
    }

    fn automatic_decompression(&self) -> bool {
        self.options().automatic_decompression
    }

    fn set_automatic_decompression(&self, enabled: bool) {
        self.configure(&mut |o| o.automatic_decompression = enabled);
    }

    fn proxy(&self) -> Option<ProxyConfig> {
        self.options().proxy
    }

    fn set_proxy(&self, proxy: Option<ProxyConfig>) {
        self.configure(&mut |o| o.proxy = proxy.clone());
    }

    fn client_certificates(&self) -> Vec<ClientCertificate> {
        self.options().client_certificates
    }

    fn set_client_certificates(&self, certificates: Vec<ClientCertificate>) {
        self.configure(&mut |o| o.client_certificates = certificates.clone());
    }

    fn accept_invalid_certs(&self) -> bool {
        self.options().accept_invalid_certs
    }

    fn set_accept_invalid_certs(&self, accept: bool) {
        self.configure(&mut |o| o.accept_invalid_certs = accept);
    }

    fn authenticator(&self) -> Option<Arc<dyn Authenticator>> {
        self.options().authenticator
    }

    fn set_authenticator(&self, authenticator: Option<Arc<dyn Authenticator>>) {
        self.configure(&mut |o| o.authenticator = authenticator.clone());
    }

    fn cookies(&self) -> Vec<Cookie> {
        self.options().cookies
    }

    fn set_cookies(&self, cookies: Vec<Cookie>) {
        self.configure(&mut |o| o.cookies = cookies.clone());
    }

    fn encoding(&self) -> String {
        self.options().encoding
    }

    fn set_encoding(&self, encoding: &str) {
        self.configure(&mut |o| o.encoding = encoding.to_string());
    }

    fn throw_on_deserialization_error(&self) -> bool {
        self.options().throw_on_deserialization_error
    }

    fn set_throw_on_deserialization_error(&self, throw: bool) {
        self.configure(&mut |o| o.throw_on_deserialization_error = throw);
    }

    fn fail_on_deserialization_error(&self) -> bool {
        self.options().fail_on_deserialization_error
    }

    fn set_fail_on_deserialization_error(&self, fail: bool) {
        self.configure(&mut |o| o.fail_on_deserialization_error = fail);
    }

    fn throw_on_any_error(&self) -> bool {
        self.options().throw_on_any_error
    }

    fn set_throw_on_any_error(&self, throw: bool) {
        self.configure(&mut |o| o.throw_on_any_error = throw);
    }

    fn default_parameters(&self) -> Vec<Parameter> {
        self.options().default_parameters
    }

    fn add_default_parameter(&self, parameter: Parameter) {
        self.configure(&mut |o| o.default_parameters.push(parameter.clone()));
    }

    fn allow_multiple_default_parameters_with_same_name(&self) -> bool {
        self.options()
            .allow_multiple_default_parameters_with_same_name
    }

    fn set_allow_multiple_default_parameters_with_same_name(&self, allow: bool) {
        self.configure(&mut |o| o.allow_multiple_default_parameters_with_same_name = allow);
    }
}

/// Typed execution on top of any [`RestClient`].
#[async_trait]
pub trait RestClientExt: RestClient {
    /// Decode a response with this client's handlers and deserialization flags.
    fn deserialize<T: DeserializeOwned>(
        &self,
        response: RestResponse,
    ) -> Result<TypedResponse<T>, ClientError> {
        deserialize_response(&self.options(), response)
    }

    fn execute_typed<T: DeserializeOwned>(
        &self,
        request: &RestRequest,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self.execute(request)?;
        self.deserialize(response)
    }

    fn execute_typed_with_method<T: DeserializeOwned>(
        &self,
        request: &RestRequest,
        method: Method,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self.execute_with_method(request, method)?;
        self.deserialize(response)
    }

    fn execute_as_get_typed<T: DeserializeOwned>(
        &self,
        request: &RestRequest,
        http_method: &str,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self.execute_as_get(request, http_method)?;
        self.deserialize(response)
    }

    fn execute_as_post_typed<T: DeserializeOwned>(
        &self,
        request: &RestRequest,
        http_method: &str,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self.execute_as_post(request, http_method)?;
        self.deserialize(response)
    }

    async fn execute_typed_async<T: DeserializeOwned + Send>(
        &self,
        request: &RestRequest,
        cancel: CancellationToken,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self.execute_async(request, cancel).await?;
        self.deserialize(response)
    }

    async fn execute_typed_async_with_method<T: DeserializeOwned + Send>(
        &self,
        request: &RestRequest,
        method: Method,
        cancel: CancellationToken,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self
            .execute_async_with_method(request, method, cancel)
            .await?;
        self.deserialize(response)
    }

    async fn execute_get_typed_async<T: DeserializeOwned + Send>(
        &self,
        request: &RestRequest,
        cancel: CancellationToken,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self.execute_get_async(request, cancel).await?;
        self.deserialize(response)
    }

    async fn execute_post_typed_async<T: DeserializeOwned + Send>(
        &self,
        request: &RestRequest,
        cancel: CancellationToken,
    ) -> Result<TypedResponse<T>, ClientError> {
        let response = self.execute_post_async(request, cancel).await?;
        self.deserialize(response)
    }
}

impl<C: RestClient + ?Sized> RestClientExt for C {}
