//! The policy-guarded client: a `RestClient` decorator that routes request
//! execution through a configured resilience policy.
//!
//! Guarded operations require both a request and a policy of the matching
//! mode (sync or async). When either is missing the call is skipped: the
//! wrapped client is never touched and [`Outcome::Skipped`] says why.
//! Everything else (configuration, URI building, serializer hooks, plain
//! `execute`, raw downloads) is forwarded untouched.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restguard_core::{PolicyGuardedClient, RestClient, RestRequest};
//! use restguard_core::policy::{RetryConfig, RetryPolicy};
//!
//! fn guard(client: Arc<dyn RestClient>) -> PolicyGuardedClient {
//!     let retry = Arc::new(RetryPolicy::new(RetryConfig::default()));
//!     PolicyGuardedClient::builder(client)
//!         .sync_policy(retry.clone())
//!         .async_policy(retry)
//!         .build()
//! }
//! ```

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::{RestClient, RestClientExt};
use crate::codec::{BodyDeserializer, BodySerializer};
use crate::error::{ClientError, PolicyError};
use crate::options::{
    Authenticator, ClientCertificate, ClientOptions, Cookie, ProxyConfig, QueryEncoder, UrlEncoder,
};
use crate::policy::{run_async, run_sync, AsyncPolicy, SyncPolicy};
use crate::request::{Method, Parameter, RestRequest};
use crate::response::{RestResponse, TypedResponse};

/// Why a guarded call did not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No request was supplied.
    MissingRequest,
    /// A blocking call was made with no sync policy installed.
    NoSyncPolicy,
    /// An async call was made with no async policy installed.
    NoAsyncPolicy,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequest => write!(f, "no request supplied"),
            Self::NoSyncPolicy => write!(f, "no sync policy configured"),
            Self::NoAsyncPolicy => write!(f, "no async policy configured"),
        }
    }
}

/// Result of a guarded call that passed (or failed) its preconditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The policy ran the call and produced a value.
    Completed(T),
    /// The call was not attempted.
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(v) => Some(v),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Self::Completed(_) => None,
            Self::Skipped(reason) => Some(*reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(v) => Outcome::Completed(f(v)),
            Self::Skipped(reason) => Outcome::Skipped(reason),
        }
    }
}

/// What every guarded operation returns: skipped, completed, or the
/// policy's own failure.
pub type GuardedResult<T> = Result<Outcome<T>, PolicyError>;

/// Handle to a request started with
/// [`PolicyGuardedClient::execute_async_with_callback`].
#[derive(Debug)]
pub struct RequestHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RequestHandle {
    /// Cancel the request; the callback receives the cancellation outcome.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the callback has run.
    pub async fn wait(self) -> Result<(), ClientError> {
        self.task
            .await
            .map_err(|e| ClientError::Other(format!("callback task failed: {e}")))
    }
}

/// Builder for [`PolicyGuardedClient`].
pub struct GuardedClientBuilder<C: RestClient + ?Sized> {
    inner: Arc<C>,
    sync_policy: Option<Arc<dyn SyncPolicy>>,
    async_policy: Option<Arc<dyn AsyncPolicy>>,
}

impl<C: RestClient + ?Sized> GuardedClientBuilder<C> {
    pub fn sync_policy(mut self, policy: Arc<dyn SyncPolicy>) -> Self {
        self.sync_policy = Some(policy);
        self
    }

    pub fn async_policy(mut self, policy: Arc<dyn AsyncPolicy>) -> Self {
        self.async_policy = Some(policy);
        self
    }

    pub fn build(self) -> PolicyGuardedClient<C> {
        PolicyGuardedClient {
            inner: self.inner,
            sync_policy: RwLock::new(self.sync_policy),
            async_policy: RwLock::new(self.async_policy),
        }
    }
}

/// Decorator gating request execution through resilience policies.
///
/// Construct once at startup and share it (and the wrapped client) by
/// reference or `Arc`. Installing a policy replaces the previous one of the
/// same mode; installed policies are never cleared.
pub struct PolicyGuardedClient<C: RestClient + ?Sized = dyn RestClient> {
    inner: Arc<C>,
    sync_policy: RwLock<Option<Arc<dyn SyncPolicy>>>,
    async_policy: RwLock<Option<Arc<dyn AsyncPolicy>>>,
}

macro_rules! forward {
    ($( $(#[$meta:meta])* fn $name:ident(&self $(, $arg:ident: $ty:ty)*) $(-> $ret:ty)?; )*) => {
        $(
            $(#[$meta])*
            pub fn $name(&self $(, $arg: $ty)*) $(-> $ret)? {
                self.inner.$name($($arg),*)
            }
        )*
    };
}

impl<C: RestClient + ?Sized> PolicyGuardedClient<C> {
    /// A guarded client with no policies installed.
    pub fn new(inner: Arc<C>) -> Self {
        Self::builder(inner).build()
    }

    pub fn builder(inner: Arc<C>) -> GuardedClientBuilder<C> {
        GuardedClientBuilder {
            inner,
            sync_policy: None,
            async_policy: None,
        }
    }

    /// The bare wrapped client, bypassing every policy.
    pub fn inner(&self) -> &Arc<C> {
        &self.inner
    }

    /// Install (or replace) the synchronous policy.
    pub fn set_sync_policy(&self, policy: Arc<dyn SyncPolicy>) -> &Self {
        *self
            .sync_policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(policy);
        self
    }

    /// Install (or replace) the asynchronous policy.
    pub fn set_async_policy(&self, policy: Arc<dyn AsyncPolicy>) -> &Self {
        *self
            .async_policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(policy);
        self
    }

    pub fn has_sync_policy(&self) -> bool {
        self.sync_policy().is_some()
    }

    pub fn has_async_policy(&self) -> bool {
        self.async_policy().is_some()
    }

    fn sync_policy(&self) -> Option<Arc<dyn SyncPolicy>> {
        self.sync_policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn async_policy(&self) -> Option<Arc<dyn AsyncPolicy>> {
        self.async_policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn guarded_sync<T, F>(
        &self,
        request: Option<&RestRequest>,
        operation: &'static str,
        mut call: F,
    ) -> GuardedResult<T>
    where
        T: Send + 'static,
        F: FnMut(&C, &RestRequest) -> Result<T, ClientError>,
    {
        let Some(request) = request else {
            return Ok(Outcome::Skipped(SkipReason::MissingRequest));
        };
        let Some(policy) = self.sync_policy() else {
            return Ok(Outcome::Skipped(SkipReason::NoSyncPolicy));
        };

        tracing::debug!(
            policy = policy.name(),
            operation,
            resource = %request.resource,
            "executing under sync policy"
        );
        let inner: &C = &self.inner;
        run_sync(policy.as_ref(), || call(inner, request)).map(Outcome::Completed)
    }

    async fn guarded_async<'a, T, F, Fut>(
        &'a self,
        request: Option<&'a RestRequest>,
        operation: &'static str,
        mut call: F,
    ) -> GuardedResult<T>
    where
        T: Send + 'static,
        F: FnMut(&'a C, &'a RestRequest) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'a,
    {
        let Some(request) = request else {
            return Ok(Outcome::Skipped(SkipReason::MissingRequest));
        };
        let Some(policy) = self.async_policy() else {
            return Ok(Outcome::Skipped(SkipReason::NoAsyncPolicy));
        };

        tracing::debug!(
            policy = policy.name(),
            operation,
            resource = %request.resource,
            "executing under async policy"
        );
        let inner: &'a C = &self.inner;
        run_async(policy.as_ref(), move || call(inner, request))
            .await
            .map(Outcome::Completed)
    }

    // ─── Guarded: sync policy ───────────────────────────────────────────────

    pub fn execute_as_get<'a>(
        &self,
        request: impl Into<Option<&'a RestRequest>>,
        http_method: &str,
    ) -> GuardedResult<RestResponse> {
        self.guarded_sync(request.into(), "execute_as_get", |c, r| {
            c.execute_as_get(r, http_method)
        })
    }

    pub fn execute_as_post<'a>(
        &self,
        request: impl Into<Option<&'a RestRequest>>,
        http_method: &str,
    ) -> GuardedResult<RestResponse> {
        self.guarded_sync(request.into(), "execute_as_post", |c, r| {
            c.execute_as_post(r, http_method)
        })
    }

    pub fn execute_as_get_typed<'a, T>(
        &self,
        request: impl Into<Option<&'a RestRequest>>,
        http_method: &str,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.guarded_sync(request.into(), "execute_as_get_typed", |c, r| {
            c.execute_as_get_typed::<T>(r, http_method)
        })
    }

    pub fn execute_as_post_typed<'a, T>(
        &self,
        request: impl Into<Option<&'a RestRequest>>,
        http_method: &str,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.guarded_sync(request.into(), "execute_as_post_typed", |c, r| {
            c.execute_as_post_typed::<T>(r, http_method)
        })
    }

    // ─── Guarded: async policy ──────────────────────────────────────────────

    pub async fn execute_async<'a>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        cancel: CancellationToken,
    ) -> GuardedResult<RestResponse> {
        self.guarded_async(request.into(), "execute_async", move |c, r| {
            c.execute_async(r, cancel.clone())
        })
        .await
    }

    pub async fn execute_async_with_method<'a>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        method: Method,
        cancel: CancellationToken,
    ) -> GuardedResult<RestResponse> {
        self.guarded_async(request.into(), "execute_async_with_method", move |c, r| {
            c.execute_async_with_method(r, method, cancel.clone())
        })
        .await
    }

    pub async fn execute_typed_async<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        cancel: CancellationToken,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.guarded_async(request.into(), "execute_typed_async", move |c, r| {
            c.execute_typed_async::<T>(r, cancel.clone())
        })
        .await
    }

    pub async fn execute_typed_async_with_method<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        method: Method,
        cancel: CancellationToken,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.guarded_async(
            request.into(),
            "execute_typed_async_with_method",
            move |c, r| c.execute_typed_async_with_method::<T>(r, method, cancel.clone()),
        )
        .await
    }

    pub async fn execute_get_async<'a>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        cancel: CancellationToken,
    ) -> GuardedResult<RestResponse> {
        self.guarded_async(request.into(), "execute_get_async", move |c, r| {
            c.execute_get_async(r, cancel.clone())
        })
        .await
    }

    pub async fn execute_post_async<'a>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        cancel: CancellationToken,
    ) -> GuardedResult<RestResponse> {
        self.guarded_async(request.into(), "execute_post_async", move |c, r| {
            c.execute_post_async(r, cancel.clone())
        })
        .await
    }

    pub async fn execute_get_typed_async<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        cancel: CancellationToken,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.guarded_async(request.into(), "execute_get_typed_async", move |c, r| {
            c.execute_get_typed_async::<T>(r, cancel.clone())
        })
        .await
    }

    pub async fn execute_post_typed_async<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        cancel: CancellationToken,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.guarded_async(request.into(), "execute_post_typed_async", move |c, r| {
            c.execute_post_typed_async::<T>(r, cancel.clone())
        })
        .await
    }

    #[deprecated(note = "use `execute_async` with a cancellation token")]
    pub async fn execute_task_async<'a>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
    ) -> GuardedResult<RestResponse> {
        self.execute_async(request, CancellationToken::new()).await
    }

    #[deprecated(note = "use `execute_get_typed_async` with a cancellation token")]
    pub async fn execute_get_task_async<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.execute_get_typed_async(request, CancellationToken::new())
            .await
    }

    #[deprecated(note = "use `execute_post_typed_async` with a cancellation token")]
    pub async fn execute_post_task_async<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.execute_post_typed_async(request, CancellationToken::new())
            .await
    }

    #[deprecated(note = "use `execute_typed_async` with a cancellation token")]
    pub async fn execute_typed_task_async<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.execute_typed_async(request, CancellationToken::new())
            .await
    }

    #[deprecated(note = "use `execute_typed_async_with_method` with a cancellation token")]
    pub async fn execute_typed_task_async_with_method<'a, T>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
        method: Method,
    ) -> GuardedResult<TypedResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.execute_typed_async_with_method(request, method, CancellationToken::new())
            .await
    }

    #[deprecated(note = "use `execute_get_async` with a cancellation token")]
    pub async fn execute_get_task_async_untyped<'a>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
    ) -> GuardedResult<RestResponse> {
        self.execute_get_async(request, CancellationToken::new()).await
    }

    #[deprecated(note = "use `execute_post_async` with a cancellation token")]
    pub async fn execute_post_task_async_untyped<'a>(
        &'a self,
        request: impl Into<Option<&'a RestRequest>>,
    ) -> GuardedResult<RestResponse> {
        self.execute_post_async(request, CancellationToken::new()).await
    }

    // ─── Pass-through ───────────────────────────────────────────────────────

    /// Run `op` against the wrapped client on a background task and hand its
    /// result to `callback`.
    fn spawn_with_callback<R, Op, F>(&self, request: &RestRequest, op: Op, callback: F) -> RequestHandle
    where
        R: Send + 'static,
        Op: for<'r> FnOnce(&'r C, &'r RestRequest, CancellationToken) -> BoxFuture<'r, Result<R, ClientError>>
            + Send
            + 'static,
        F: FnOnce(Result<R, ClientError>) + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let request = request.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            let result = op(&*inner, &request, token).await;
            callback(result);
        });
        RequestHandle { cancel, task }
    }

    fn spawn_with_verb<F>(&self, request: &RestRequest, callback: F, http_method: &str) -> RequestHandle
    where
        F: FnOnce(Result<RestResponse, ClientError>) + Send + 'static,
    {
        let method = http_method.parse::<Method>();
        self.spawn_with_callback(
            request,
            move |c, r, t| match method {
                Ok(method) => c.execute_async_with_method(r, method, t),
                Err(e) => async move { Err(e) }.boxed(),
            },
            callback,
        )
    }

    fn spawn_typed_with_verb<T, F>(&self, request: &RestRequest, callback: F, http_method: &str) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<TypedResponse<T>, ClientError>) + Send + 'static,
    {
        let method = http_method.parse::<Method>();
        self.spawn_with_callback(
            request,
            move |c, r, t| match method {
                Ok(method) => c.execute_typed_async_with_method::<T>(r, method, t),
                Err(e) => async move { Err(e) }.boxed(),
            },
            callback,
        )
    }

    /// Start an unguarded async request in the background and hand its
    /// result to `callback`. Must be called from within a Tokio runtime.
    #[deprecated(note = "await `execute_async` instead")]
    pub fn execute_async_with_callback<F>(&self, request: &RestRequest, callback: F) -> RequestHandle
    where
        F: FnOnce(Result<RestResponse, ClientError>) + Send + 'static,
    {
        self.spawn_with_callback(request, |c, r, t| c.execute_async(r, t), callback)
    }

    #[deprecated(note = "await `execute_async_with_method` instead")]
    pub fn execute_async_with_callback_and_method<F>(
        &self,
        request: &RestRequest,
        callback: F,
        method: Method,
    ) -> RequestHandle
    where
        F: FnOnce(Result<RestResponse, ClientError>) + Send + 'static,
    {
        self.spawn_with_callback(
            request,
            move |c, r, t| c.execute_async_with_method(r, method, t),
            callback,
        )
    }

    #[deprecated(note = "await `execute_typed_async` instead")]
    pub fn execute_typed_async_with_callback<T, F>(&self, request: &RestRequest, callback: F) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<TypedResponse<T>, ClientError>) + Send + 'static,
    {
        self.spawn_with_callback(request, |c, r, t| c.execute_typed_async::<T>(r, t), callback)
    }

    #[deprecated(note = "await `execute_typed_async_with_method` instead")]
    pub fn execute_typed_async_with_callback_and_method<T, F>(
        &self,
        request: &RestRequest,
        callback: F,
        method: Method,
    ) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<TypedResponse<T>, ClientError>) + Send + 'static,
    {
        self.spawn_with_callback(
            request,
            move |c, r, t| c.execute_typed_async_with_method::<T>(r, method, t),
            callback,
        )
    }

    /// Background request sent with the verb `http_method`; an unknown verb
    /// reaches `callback` as [`ClientError::InvalidRequest`].
    #[deprecated(note = "await `execute_async_with_method` instead")]
    pub fn execute_async_get_with_callback<F>(
        &self,
        request: &RestRequest,
        callback: F,
        http_method: &str,
    ) -> RequestHandle
    where
        F: FnOnce(Result<RestResponse, ClientError>) + Send + 'static,
    {
        self.spawn_with_verb(request, callback, http_method)
    }

    #[deprecated(note = "await `execute_async_with_method` instead")]
    pub fn execute_async_post_with_callback<F>(
        &self,
        request: &RestRequest,
        callback: F,
        http_method: &str,
    ) -> RequestHandle
    where
        F: FnOnce(Result<RestResponse, ClientError>) + Send + 'static,
    {
        self.spawn_with_verb(request, callback, http_method)
    }

    #[deprecated(note = "await `execute_typed_async_with_method` instead")]
    pub fn execute_typed_async_get_with_callback<T, F>(
        &self,
        request: &RestRequest,
        callback: F,
        http_method: &str,
    ) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<TypedResponse<T>, ClientError>) + Send + 'static,
    {
        self.spawn_typed_with_verb(request, callback, http_method)
    }

    #[deprecated(note = "await `execute_typed_async_with_method` instead")]
    pub fn execute_typed_async_post_with_callback<T, F>(
        &self,
        request: &RestRequest,
        callback: F,
        http_method: &str,
    ) -> RequestHandle
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<TypedResponse<T>, ClientError>) + Send + 'static,
    {
        self.spawn_typed_with_verb(request, callback, http_method)
    }

    pub fn execute_typed<T: DeserializeOwned>(
        &self,
        request: &RestRequest,
    ) -> Result<TypedResponse<T>, ClientError> {
        self.inner.execute_typed(request)
    }

    pub fn execute_typed_with_method<T: DeserializeOwned>(
        &self,
        request: &RestRequest,
        method: Method,
    ) -> Result<TypedResponse<T>, ClientError> {
        self.inner.execute_typed_with_method(request, method)
    }

    pub fn deserialize<T: DeserializeOwned>(
        &self,
        response: RestResponse,
    ) -> Result<TypedResponse<T>, ClientError> {
        self.inner.deserialize(response)
    }

    forward! {
        fn execute(&self, request: &RestRequest) -> Result<RestResponse, ClientError>;
        fn execute_with_method(&self, request: &RestRequest, method: Method) -> Result<RestResponse, ClientError>;
        fn download_data(&self, request: &RestRequest) -> Result<Vec<u8>, ClientError>;
        fn build_uri(&self, request: &RestRequest) -> Result<Url, ClientError>;
        fn build_uri_without_query_parameters(&self, request: &RestRequest) -> Result<String, ClientError>;
        fn options(&self) -> ClientOptions;
        fn configure(&self, f: &mut dyn FnMut(&mut ClientOptions));
        fn add_handler(&self, content_type: &str, deserializer: Arc<dyn BodyDeserializer>);
        fn remove_handler(&self, content_type: &str);
        fn clear_handlers(&self);
        fn use_serializer(&self, serializer: Arc<dyn BodySerializer>);
        fn use_url_encoder(&self, encoder: UrlEncoder);
        fn use_query_encoder(&self, encoder: QueryEncoder);
        fn timeout(&self) -> Option<Duration>;
        fn set_timeout(&self, timeout: Option<Duration>);
        fn connect_timeout(&self) -> Option<Duration>;
        fn set_connect_timeout(&self, timeout: Option<Duration>);
        fn user_agent(&self) -> String;
        fn set_user_agent(&self, user_agent: &str);
        fn base_url(&self) -> Option<Url>;
        fn set_base_url(&self, base_url: Option<Url>);
        fn base_host(&self) -> Option<String>;
        fn set_base_host(&self, host: Option<String>);
        fn follow_redirects(&self) -> bool;
        fn set_follow_redirects(&self, follow: bool);
        fn max_redirects(&self) -> Option<usize>;
        fn set_max_redirects(&self, max: Option<usize>);
        fn automatic_decompression(&self) -> bool;
        fn set_automatic_decompression(&self, enabled: bool);
        fn proxy(&self) -> Option<ProxyConfig>;
        fn set_proxy(&self, proxy: Option<ProxyConfig>);
        fn client_certificates(&self) -> Vec<ClientCertificate>;
        fn set_client_certificates(&self, certificates: Vec<ClientCertificate>);
        fn accept_invalid_certs(&self) -> bool;
        fn set_accept_invalid_certs(&self, accept: bool);
        fn authenticator(&self) -> Option<Arc<dyn Authenticator>>;
        fn set_authenticator(&self, authenticator: Option<Arc<dyn Authenticator>>);
        fn cookies(&self) -> Vec<Cookie>;
        fn set_cookies(&self, cookies: Vec<Cookie>);
        fn encoding(&self) -> String;
        fn set_encoding(&self, encoding: &str);
        fn throw_on_deserialization_error(&self) -> bool;
        fn set_throw_on_deserialization_error(&self, throw: bool);
        fn fail_on_deserialization_error(&self) -> bool;
        fn set_fail_on_deserialization_error(&self, fail: bool);
        fn throw_on_any_error(&self) -> bool;
        fn set_throw_on_any_error(&self, throw: bool);
        fn default_parameters(&self) -> Vec<Parameter>;
        fn add_default_parameter(&self, parameter: Parameter);
        fn allow_multiple_default_parameters_with_same_name(&self) -> bool;
        fn set_allow_multiple_default_parameters_with_same_name(&self, allow: bool);
    }
}

impl<C: RestClient + ?Sized> std::fmt::Debug for PolicyGuardedClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyGuardedClient")
            .field("sync_policy", &self.sync_policy().map(|p| p.name().to_string()))
            .field("async_policy", &self.async_policy().map(|p| p.name().to_string()))
            .finish_non_exhaustive()
    }
}
