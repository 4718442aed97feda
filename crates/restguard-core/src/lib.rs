//! restguard-core — policy-guarded REST client foundation.
//!
//! # Overview
//!
//! restguard wraps a REST client so that its execution paths can be routed
//! through a resilience policy. The core crate defines:
//!
//! - [`RestClient`] / [`RestClientExt`] — the client contract, untyped and typed
//! - [`PolicyGuardedClient`] — the decorator gating execution through policies
//! - [`RestRequest`] / [`RestResponse`] — request and response model
//! - [`ClientOptions`] — client configuration
//! - [`ClientError`] / [`PolicyError`] — structured error types
//! - [`policy`] module — no-op, retry and timeout policies
//! - [`settings`] module — JSON settings for startup wiring

pub mod client;
pub mod codec;
pub mod error;
pub mod guarded;
pub mod options;
pub mod policy;
pub mod request;
pub mod response;
pub mod settings;
pub mod uri;

pub use client::{RestClient, RestClientExt};
pub use codec::{BodyDeserializer, BodySerializer, JsonDeserializer, JsonSerializer, TextDeserializer};
pub use error::{ClientError, PolicyError};
pub use guarded::{GuardedClientBuilder, GuardedResult, Outcome, PolicyGuardedClient, RequestHandle, SkipReason};
pub use options::{
    Authenticator, BearerAuthenticator, ClientCertificate, ClientOptions, Cookie,
    HttpBasicAuthenticator, ProxyConfig,
};
pub use policy::{AsyncPolicy, NoOpPolicy, SyncPolicy};
pub use request::{Method, Parameter, ParameterKind, RequestBody, RestRequest};
pub use response::{ResponseStatus, RestResponse, TypedResponse};
pub use settings::GuardSettings;
pub use tokio_util::sync::CancellationToken;
