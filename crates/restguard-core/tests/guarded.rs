use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use restguard_core::policy::{
    AsyncAction, Erased, RetryConfig, RetryPolicy, SyncAction, TimeoutPolicy,
};
use restguard_core::{
    AsyncPolicy, CancellationToken, ClientError, ClientOptions, Method, NoOpPolicy, Outcome,
    PolicyError, PolicyGuardedClient, ResponseStatus, RestClient, RestRequest, RestResponse,
    SkipReason, SyncPolicy,
};

/// Fails the first `failures` calls, then answers with `body`.
struct MockClient {
    options: RwLock<ClientOptions>,
    calls: AtomicU32,
    failures: u32,
    body: &'static str,
    delay: Option<Duration>,
    verbs: Mutex<Vec<String>>,
}

impl MockClient {
    fn new(failures: u32) -> Self {
        Self {
            options: RwLock::new(ClientOptions::default()),
            calls: AtomicU32::new(0),
            failures,
            body: r#"{"id":7,"name":"widget"}"#,
            delay: None,
            verbs: Mutex::new(Vec::new()),
        }
    }

    fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(0)
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn verbs(&self) -> Vec<String> {
        self.verbs.lock().unwrap().clone()
    }

    fn respond(&self, verb: &str) -> Result<RestResponse, ClientError> {
        self.verbs.lock().unwrap().push(verb.to_string());
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            return Err(ClientError::Http(format!("connection reset #{n}")));
        }
        Ok(RestResponse {
            status: 200,
            content_type: Some("application/json".into()),
            body: self.body.as_bytes().to_vec(),
            response_status: ResponseStatus::Completed,
            ..Default::default()
        })
    }
}

#[async_trait]
impl RestClient for MockClient {
    fn execute(&self, request: &RestRequest) -> Result<RestResponse, ClientError> {
        self.respond(request.method.as_str())
    }

    fn execute_with_method(
        &self,
        _request: &RestRequest,
        method: Method,
    ) -> Result<RestResponse, ClientError> {
        self.respond(method.as_str())
    }

    fn execute_as_get(
        &self,
        _request: &RestRequest,
        http_method: &str,
    ) -> Result<RestResponse, ClientError> {
        self.respond(http_method)
    }

    fn execute_as_post(
        &self,
        _request: &RestRequest,
        http_method: &str,
    ) -> Result<RestResponse, ClientError> {
        self.respond(http_method)
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
        _request: &RestRequest,
        method: Method,
        cancel: CancellationToken,
    ) -> Result<RestResponse, ClientError> {
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            }
        }
        self.respond(method.as_str())
    }

    fn options(&self) -> ClientOptions {
        self.options.read().unwrap().clone()
    }

    fn configure(&self, f: &mut dyn FnMut(&mut ClientOptions)) {
        f(&mut self.options.write().unwrap());
    }
}

/// Refuses every call without running it.
struct Deny;

impl SyncPolicy for Deny {
    fn execute(&self, _action: SyncAction<'_>) -> Result<Erased, PolicyError> {
        Err(PolicyError::Rejected("maintenance window".into()))
    }
}

#[async_trait]
impl AsyncPolicy for Deny {
    async fn execute<'a>(&self, _action: AsyncAction<'a>) -> Result<Erased, PolicyError> {
        Err(PolicyError::Rejected("maintenance window".into()))
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Widget {
    id: u32,
    name: String,
}

fn retry(max_retries: u32) -> Arc<RetryPolicy> {
    Arc::new(RetryPolicy::new(RetryConfig::immediate(max_retries)))
}

fn guarded(mock: &Arc<MockClient>, policy: Arc<RetryPolicy>) -> PolicyGuardedClient<MockClient> {
    PolicyGuardedClient::builder(Arc::clone(mock))
        .sync_policy(policy.clone())
        .async_policy(policy)
        .build()
}

// ─── Skips ──────────────────────────────────────────────────────────────────

#[test]
fn missing_request_is_skipped_without_calling_the_client() {
    let mock = Arc::new(MockClient::new(0));
    let client = guarded(&mock, retry(3));

    let out = client.execute_as_get(None::<&RestRequest>, "GET").unwrap();

    assert_eq!(out.skip_reason(), Some(SkipReason::MissingRequest));
    assert_eq!(mock.calls(), 0);
}

#[test]
fn missing_request_wins_over_missing_policy() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));

    let out = client.execute_as_post(None::<&RestRequest>, "POST").unwrap();
    assert_eq!(out, Outcome::Skipped(SkipReason::MissingRequest));
}

#[test]
fn no_sync_policy_is_skipped() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let req = RestRequest::get("items");

    let out = client.execute_as_get(&req, "GET").unwrap();

    assert_eq!(out.skip_reason(), Some(SkipReason::NoSyncPolicy));
    assert_eq!(mock.calls(), 0);
    assert!(!client.has_sync_policy());
}

#[tokio::test]
async fn sync_policy_does_not_guard_async_calls() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::builder(Arc::clone(&mock))
        .sync_policy(retry(1))
        .build();
    let req = RestRequest::get("items");

    let out = client
        .execute_async(&req, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(out.skip_reason(), Some(SkipReason::NoAsyncPolicy));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn missing_request_async_is_skipped() {
    let mock = Arc::new(MockClient::new(0));
    let client = guarded(&mock, retry(1));

    let out = client
        .execute_get_typed_async::<Widget>(None::<&RestRequest>, CancellationToken::new())
        .await
        .unwrap();

    assert!(out.is_skipped());
    assert_eq!(mock.calls(), 0);
}

// ─── Guarded execution ──────────────────────────────────────────────────────

#[test]
fn retry_recovers_after_two_failures() {
    let mock = Arc::new(MockClient::new(2));
    let client = guarded(&mock, retry(3));
    let req = RestRequest::get("items");

    let response = client
        .execute_as_get(&req, "GET")
        .unwrap()
        .completed()
        .expect("policy ran");

    assert_eq!(response.status, 200);
    assert_eq!(mock.calls(), 3);
}

#[test]
fn retry_exhaustion_is_returned_unchanged() {
    let mock = Arc::new(MockClient::new(10));
    let client = guarded(&mock, retry(2));
    let req = RestRequest::get("items");

    let err = client.execute_as_get(&req, "GET").unwrap_err();

    match err {
        PolicyError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.to_string(), "HTTP error: connection reset #3");
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(mock.calls(), 3);
}

#[test]
fn typed_sync_call_deserializes_inside_the_policy() {
    let mock = Arc::new(MockClient::new(1));
    let client = guarded(&mock, retry(1));
    let req = RestRequest::post("widgets");

    let typed = client
        .execute_as_post_typed::<Widget>(&req, "PUT")
        .unwrap()
        .completed()
        .unwrap();

    assert_eq!(typed.data, Some(Widget { id: 7, name: "widget".into() }));
    assert_eq!(mock.verbs(), ["PUT", "PUT"]);
}

#[test]
fn policy_rejection_propagates() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::builder(Arc::clone(&mock))
        .sync_policy(Arc::new(Deny))
        .build();
    let req = RestRequest::get("items");

    let err = client.execute_as_get(&req, "GET").unwrap_err();

    assert!(matches!(err, PolicyError::Rejected(ref m) if m == "maintenance window"));
    assert_eq!(mock.calls(), 0);
}

#[test]
fn replacing_the_policy_changes_behavior() {
    let mock = Arc::new(MockClient::new(1));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let req = RestRequest::get("items");

    client.set_sync_policy(Arc::new(NoOpPolicy));
    let err = client.execute_as_get(&req, "GET").unwrap_err();
    assert!(matches!(err, PolicyError::Client(ClientError::Http(_))));
    assert_eq!(mock.calls(), 1);

    client.set_sync_policy(retry(2));
    let out = client.execute_as_get(&req, "GET").unwrap();
    assert!(out.is_completed());
    assert_eq!(mock.calls(), 2);
}

#[tokio::test]
async fn replacing_the_async_policy_changes_behavior() {
    let mock = Arc::new(MockClient::new(2));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let req = RestRequest::get("items");

    client.set_async_policy(Arc::new(NoOpPolicy));
    let err = client
        .execute_async(&req, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PolicyError::Client(ClientError::Http(_))));
    assert_eq!(mock.calls(), 1);

    client.set_async_policy(retry(2));
    let out = client
        .execute_async(&req, CancellationToken::new())
        .await
        .unwrap();
    assert!(out.is_completed());
    assert_eq!(mock.calls(), 3);
    assert!(!client.has_sync_policy());
}

#[tokio::test]
async fn async_retry_recovers() {
    let mock = Arc::new(MockClient::new(2));
    let client = guarded(&mock, retry(3));
    let req = RestRequest::get("items");

    let out = client
        .execute_async(&req, CancellationToken::new())
        .await
        .unwrap();

    assert!(out.is_completed());
    assert_eq!(mock.calls(), 3);
}

#[tokio::test]
async fn async_typed_variants_use_their_verbs() {
    let mock = Arc::new(MockClient::new(0));
    let client = guarded(&mock, retry(0));
    let req = RestRequest::new("widgets/{id}", Method::Delete).add_url_segment("id", "7");

    let got = client
        .execute_get_typed_async::<Widget>(&req, CancellationToken::new())
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(got.data.unwrap().name, "widget");

    client
        .execute_post_async(&req, CancellationToken::new())
        .await
        .unwrap();
    client
        .execute_typed_async_with_method::<Widget>(&req, Method::Patch, CancellationToken::new())
        .await
        .unwrap();
    client
        .execute_typed_async::<Widget>(&req, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(mock.verbs(), ["GET", "POST", "PATCH", "DELETE"]);
}

#[tokio::test]
#[allow(deprecated)]
async fn task_aliases_route_to_the_right_verb() {
    let mock = Arc::new(MockClient::new(0));
    let client = guarded(&mock, retry(0));
    let req = RestRequest::get("widgets");

    client.execute_task_async(&req).await.unwrap();
    client.execute_get_task_async::<Widget>(&req).await.unwrap();
    client.execute_post_task_async::<Widget>(&req).await.unwrap();
    client.execute_get_task_async_untyped(&req).await.unwrap();
    client.execute_post_task_async_untyped(&req).await.unwrap();
    let typed = client.execute_typed_task_async::<Widget>(&req).await.unwrap();
    client
        .execute_typed_task_async_with_method::<Widget>(&req, Method::Put)
        .await
        .unwrap();

    assert_eq!(typed.completed().and_then(|t| t.data).map(|w| w.id), Some(7));
    assert_eq!(mock.verbs(), ["GET", "GET", "POST", "GET", "POST", "GET", "PUT"]);
}

#[tokio::test]
#[allow(deprecated)]
async fn task_aliases_are_skipped_without_an_async_policy() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::builder(Arc::clone(&mock))
        .sync_policy(Arc::new(NoOpPolicy))
        .build();
    let req = RestRequest::get("widgets");

    let out = client.execute_typed_task_async::<Widget>(&req).await.unwrap();
    assert_eq!(out.skip_reason(), Some(SkipReason::NoAsyncPolicy));
    let out = client.execute_post_task_async_untyped(&req).await.unwrap();
    assert_eq!(out.skip_reason(), Some(SkipReason::NoAsyncPolicy));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn timeout_policy_bounds_async_calls() {
    let mock = Arc::new(MockClient::slow(Duration::from_secs(30)));
    let client = PolicyGuardedClient::builder(Arc::clone(&mock))
        .async_policy(Arc::new(TimeoutPolicy::new(Duration::from_millis(250))))
        .build();
    let req = RestRequest::get("slow");

    let err = client
        .execute_async(&req, CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PolicyError::Timeout { ms: 250 }));
    assert_eq!(mock.calls(), 0);
}

#[tokio::test]
async fn cancellation_reaches_the_wrapped_client() {
    let mock = Arc::new(MockClient::slow(Duration::from_secs(30)));
    let client = PolicyGuardedClient::builder(Arc::clone(&mock))
        .async_policy(Arc::new(NoOpPolicy))
        .build();
    let req = RestRequest::get("slow");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.execute_async(&req, cancel).await.unwrap_err();

    assert!(matches!(err, PolicyError::Client(ClientError::Cancelled)));
}

// ─── Pass-through ───────────────────────────────────────────────────────────

#[test]
fn plain_execute_is_not_guarded() {
    let mock = Arc::new(MockClient::new(1));
    let client = guarded(&mock, retry(5));
    let req = RestRequest::get("items");

    assert!(client.execute(&req).is_err());
    assert_eq!(mock.calls(), 1);
}

#[test]
fn configuration_is_forwarded() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));

    client.set_timeout(Some(Duration::from_secs(5)));
    client.set_user_agent("guarded/2.0");
    client.set_throw_on_any_error(false);

    assert_eq!(client.timeout(), Some(Duration::from_secs(5)));
    assert_eq!(mock.options().user_agent, "guarded/2.0");
    assert!(!mock.throw_on_any_error());
}

#[test]
fn uri_building_is_forwarded() {
    let mock = Arc::new(MockClient::new(0));
    mock.set_base_url(Some("https://api.example.com/v2/".parse().unwrap()));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let req = RestRequest::get("/users/{id}")
        .add_url_segment("id", "42")
        .add_query_parameter("fields", "name");

    assert_eq!(
        client.build_uri(&req).unwrap().as_str(),
        "https://api.example.com/v2/users/42?fields=name"
    );
    assert_eq!(
        client.build_uri_without_query_parameters(&req).unwrap(),
        "https://api.example.com/v2/users/42"
    );
}

#[test]
fn inner_bypasses_the_policy() {
    let mock = Arc::new(MockClient::new(1));
    let client = guarded(&mock, retry(5));
    let req = RestRequest::get("items");

    assert!(client.inner().execute_as_get(&req, "GET").is_err());
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
#[allow(deprecated)]
async fn callback_receives_the_response() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let req = RestRequest::get("items");
    let (tx, rx) = tokio::sync::oneshot::channel();

    let handle = client.execute_async_with_callback(&req, move |result| {
        let _ = tx.send(result.map(|r| r.status));
    });
    handle.wait().await.unwrap();

    assert_eq!(rx.await.unwrap().unwrap(), 200);
    assert_eq!(mock.calls(), 1);
}

#[tokio::test]
#[allow(deprecated)]
async fn aborted_callback_sees_cancellation() {
    let mock = Arc::new(MockClient::slow(Duration::from_secs(30)));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let req = RestRequest::get("slow");
    let (tx, rx) = tokio::sync::oneshot::channel();

    let handle = client.execute_async_with_callback(&req, move |result| {
        let _ = tx.send(result);
    });
    handle.abort();
    handle.wait().await.unwrap();

    assert!(matches!(rx.await.unwrap(), Err(ClientError::Cancelled)));
}

#[tokio::test]
#[allow(deprecated)]
async fn typed_and_verb_callbacks() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let req = RestRequest::get("items");

    let (tx, rx) = tokio::sync::oneshot::channel();
    client
        .execute_typed_async_with_callback::<Widget, _>(&req, move |result| {
            let _ = tx.send(result.map(|t| t.data));
        })
        .wait()
        .await
        .unwrap();
    assert_eq!(
        rx.await.unwrap().unwrap(),
        Some(Widget { id: 7, name: "widget".into() })
    );

    client
        .execute_async_with_callback_and_method(&req, |_| {}, Method::Patch)
        .wait()
        .await
        .unwrap();
    client
        .execute_async_get_with_callback(&req, |_| {}, "delete")
        .wait()
        .await
        .unwrap();
    client
        .execute_async_post_with_callback(&req, |_| {}, "PUT")
        .wait()
        .await
        .unwrap();
    client
        .execute_typed_async_post_with_callback::<Widget, _>(&req, |_| {}, "POST")
        .wait()
        .await
        .unwrap();

    assert_eq!(mock.verbs(), ["GET", "PATCH", "DELETE", "PUT", "POST"]);
}

#[tokio::test]
#[allow(deprecated)]
async fn unknown_callback_verb_reaches_the_callback() {
    let mock = Arc::new(MockClient::new(0));
    let client = PolicyGuardedClient::new(Arc::clone(&mock));
    let (tx, rx) = tokio::sync::oneshot::channel();

    client
        .execute_typed_async_get_with_callback::<Widget, _>(
            &RestRequest::get("items"),
            move |result| {
                let _ = tx.send(result.map(|_| ()));
            },
            "TELEPORT",
        )
        .wait()
        .await
        .unwrap();

    assert!(matches!(rx.await.unwrap(), Err(ClientError::InvalidRequest(_))));
    assert_eq!(mock.calls(), 0);
}

#[test]
fn works_behind_a_trait_object() {
    let inner: Arc<dyn RestClient> = Arc::new(MockClient::new(0));
    let client: PolicyGuardedClient = PolicyGuardedClient::builder(inner)
        .sync_policy(Arc::new(NoOpPolicy))
        .build();
    let req = RestRequest::get("items");

    let typed = client.execute_as_get_typed::<Widget>(&req, "GET").unwrap();
    assert_eq!(typed.completed().and_then(|t| t.data).map(|w| w.id), Some(7));
}
