//! restguard-http — `reqwest`-backed implementation of `RestClient`.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use restguard_core::{CancellationToken, PolicyGuardedClient, RestRequest};
//! use restguard_core::policy::{RetryConfig, RetryPolicy};
//! use restguard_http::HttpRestClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let http = Arc::new(HttpRestClient::with_base_url("https://api.example.com")?);
//! let client = PolicyGuardedClient::builder(http)
//!     .async_policy(Arc::new(RetryPolicy::new(RetryConfig::default())))
//!     .build();
//!
//! let req = RestRequest::get("users/{id}").add_url_segment("id", "42");
//! let outcome = client.execute_async(&req, CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod prepare;

pub use client::HttpRestClient;
