//! restguard CLI — send policy-guarded REST requests from the terminal.
//!
//! Usage:
//! ```bash
//! # GET with three retries
//! restguard get --url https://httpbin.org/get --retries 3
//!
//! # POST a JSON body on the async path
//! restguard post --url https://httpbin.org/post --data '{"name":"ada"}' --async
//!
//! # Show how a URI is assembled
//! restguard uri --base https://api.example.com/v1 --resource users/42 --query fields=name
//! ```

use std::env;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use restguard_core::policy::RetryPolicy;
use restguard_core::settings::{GuardSettings, RetrySettings};
use restguard_core::{
    ClientOptions, GuardedResult, Method, NoOpPolicy, Outcome, PolicyGuardedClient, RestClient,
    RestRequest, RestResponse,
};
use restguard_http::HttpRestClient;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "get" => cmd_send(&args[2..], Method::Get).await,
        "post" => cmd_send(&args[2..], Method::Post).await,
        "uri" => cmd_uri(&args[2..]),
        "version" | "--version" | "-V" => {
            println!("restguard {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("restguard {}", env!("CARGO_PKG_VERSION"));
    println!("Send REST requests through retry and timeout policies\n");
    println!("USAGE:");
    println!("    restguard <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    get        Send a GET request");
    println!("    post       Send a POST request");
    println!("    uri        Print the URI built from a base and a resource");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("GET / POST FLAGS:");
    println!("    --url <URL>          Request URL  [required]");
    println!("    --data <JSON>        JSON body (post only)");
    println!("    --retries <N>        Retry transient failures N times");
    println!("    --backoff-ms <N>     Delay before the first retry");
    println!("    --timeout-ms <N>     Client timeout per request");
    println!("    --header <K:V>       Extra header, repeatable");
    println!("    --async              Use the async execution path");
    println!("    --config <FILE>      JSON settings file; flags override it\n");
    println!("URI FLAGS:");
    println!("    --base <URL>         Base URL  [required]");
    println!("    --resource <PATH>    Resource path, may contain {{name}} placeholders");
    println!("    --query <K=V>        Query parameter, repeatable");
}

async fn cmd_send(args: &[String], method: Method) -> Result<(), String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;
    let settings = load_settings(args)?;

    let mut options = settings.client_options().map_err(|e| e.to_string())?;
    if let Some(ms) = parse_number(args, "--timeout-ms")? {
        options.timeout = Some(Duration::from_millis(ms));
    }

    let mut req = RestRequest::new(url, method);
    for h in parse_all(args, "--header") {
        let (name, value) = h
            .split_once(':')
            .ok_or_else(|| format!("invalid header {h:?}, expected K:V"))?;
        req = req.add_header(name.trim(), value.trim());
    }
    if let Some(data) = parse_flag(args, "--data") {
        let body: serde_json::Value =
            serde_json::from_str(&data).map_err(|e| format!("invalid --data: {e}"))?;
        req = req.add_json_body(&body).map_err(|e| e.to_string())?;
    }

    let client = guarded_client(options, &settings);
    let verb = method.as_str();

    let start = std::time::Instant::now();
    let outcome: GuardedResult<RestResponse> = if has_flag(args, "--async") {
        client
            .execute_async_with_method(&req, method, CancellationToken::new())
            .await
    } else {
        // blocking reqwest must not run (or be dropped) on the runtime threads
        tokio::task::spawn_blocking(move || {
            if method.has_body() {
                client.execute_as_post(&req, verb)
            } else {
                client.execute_as_get(&req, verb)
            }
        })
        .await
        .map_err(|e| e.to_string())?
    };
    let latency = start.elapsed();

    match outcome.map_err(|e| e.to_string())? {
        Outcome::Completed(resp) => {
            print_response(&resp);
            eprintln!("({}ms)", latency.as_millis());
            Ok(())
        }
        Outcome::Skipped(reason) => Err(format!("request skipped: {reason}")),
    }
}

fn cmd_uri(args: &[String]) -> Result<(), String> {
    let base = parse_flag(args, "--base").ok_or("--base is required")?;
    let resource = parse_flag(args, "--resource").unwrap_or_default();

    let options = ClientOptions::with_base_url(&base).map_err(|e| e.to_string())?;
    let mut req = RestRequest::get(resource);
    for q in parse_all(args, "--query") {
        let (name, value) = q
            .split_once('=')
            .ok_or_else(|| format!("invalid query {q:?}, expected K=V"))?;
        req = req.add_query_parameter(name, value);
    }

    let uri = restguard_core::uri::build_uri(&options, &req).map_err(|e| e.to_string())?;
    println!("{uri}");
    Ok(())
}

fn load_settings(args: &[String]) -> Result<GuardSettings, String> {
    let mut settings = match parse_flag(args, "--config") {
        Some(path) => GuardSettings::from_file(&path).map_err(|e| e.to_string())?,
        None => GuardSettings::default(),
    };

    let retries = parse_number(args, "--retries")?;
    let backoff = parse_number(args, "--backoff-ms")?;
    if retries.is_some() || backoff.is_some() {
        let retry = settings.retry.get_or_insert_with(RetrySettings::default);
        if let Some(n) = retries {
            retry.max_retries = u32::try_from(n).map_err(|_| "--retries is too large")?;
        }
        if let Some(ms) = backoff {
            retry.initial_backoff_ms = ms;
        }
    }
    Ok(settings)
}

/// Retry when configured; otherwise the settings' timeout policy for async
/// calls; otherwise a single attempt.
fn guarded_client(options: ClientOptions, settings: &GuardSettings) -> PolicyGuardedClient {
    let http: Arc<dyn RestClient> = Arc::new(HttpRestClient::new(options));
    let client = PolicyGuardedClient::new(http);

    match settings.retry_config() {
        Some(config) => {
            let retry = Arc::new(RetryPolicy::new(config));
            client.set_sync_policy(retry.clone());
            client.set_async_policy(retry);
        }
        None => {
            client.set_sync_policy(Arc::new(NoOpPolicy));
            match settings.timeout_policy() {
                Some(timeout) => client.set_async_policy(Arc::new(timeout)),
                None => client.set_async_policy(Arc::new(NoOpPolicy)),
            };
        }
    }
    tracing::debug!(?client, "guarded client ready");
    client
}

fn print_response(resp: &RestResponse) {
    println!("HTTP {} ({})", resp.status, resp.response_status);
    for (name, value) in &resp.headers {
        println!("{name}: {value}");
    }
    println!();

    let body = resp.text();
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default()),
        Err(_) => println!("{body}"),
    }
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn parse_all(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].clone())
        .collect()
}

fn parse_number(args: &[String], flag: &str) -> Result<Option<u64>, String> {
    parse_flag(args, flag)
        .map(|v| v.parse::<u64>().map_err(|_| format!("{flag} expects a number, got {v:?}")))
        .transpose()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
