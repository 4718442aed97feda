//! Turns a `RestRequest` plus client options into a transport-ready request.

use std::time::Duration;

use restguard_core::codec::BodySerializer;
use restguard_core::error::ClientError;
use restguard_core::options::ClientOptions;
use restguard_core::request::{Parameter, ParameterKind, RequestBody, RestRequest};
use restguard_core::uri;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Everything needed to put a request on the wire, independent of whether
/// the blocking or async reqwest client sends it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Prepared {
    pub method: reqwest::Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<(String, Vec<u8>)>,
    pub timeout: Option<Duration>,
}

impl Prepared {
    /// The duration reported when this request times out.
    pub fn timeout_ms(&self, options: &ClientOptions) -> u64 {
        self.timeout
            .or(options.timeout)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default()
    }
}

/// Build the wire form of `request` sent with `verb`.
///
/// `carries_body` decides whether the body (or form-encoded `GetOrPost`
/// parameters) is attached.
pub(crate) fn prepare(
    options: &ClientOptions,
    request: &RestRequest,
    verb: &str,
    carries_body: bool,
) -> Result<Prepared, ClientError> {
    let method = reqwest::Method::from_bytes(verb.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| ClientError::InvalidRequest(format!("invalid HTTP method {verb:?}")))?;

    let mut request = request.clone();
    if let Some(auth) = &options.authenticator {
        auth.authenticate(&mut request)?;
    }

    let url = uri::build_uri_for(options, &request, carries_body)?;
    let params = uri::effective_parameters(options, &request);

    let mut headers: Vec<(String, String)> = params
        .iter()
        .filter(|p| p.kind == ParameterKind::HttpHeader)
        .map(|p| (p.name.clone(), p.value.clone()))
        .collect();

    if let Some(host) = &options.base_host {
        headers.retain(|(name, _)| !name.eq_ignore_ascii_case("host"));
        headers.push(("Host".into(), host.clone()));
    }

    let cookies: Vec<String> = options
        .cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .chain(
            params
                .iter()
                .filter(|p| p.kind == ParameterKind::Cookie)
                .map(|p| format!("{}={}", p.name, p.value)),
        )
        .collect();
    if !cookies.is_empty() {
        headers.push(("Cookie".into(), cookies.join("; ")));
    }

    let body = if carries_body {
        encode_body(options.serializer.as_ref(), &request, &params)?
    } else {
        None
    };

    Ok(Prepared {
        method,
        url,
        headers,
        body,
        timeout: request.timeout,
    })
}

fn encode_body(
    serializer: &dyn BodySerializer,
    request: &RestRequest,
    params: &[Parameter],
) -> Result<Option<(String, Vec<u8>)>, ClientError> {
    match &request.body {
        Some(RequestBody::Value(value)) => {
            let data = serializer.serialize(value)?;
            Ok(Some((serializer.content_type().to_string(), data)))
        }
        Some(RequestBody::Bytes { content_type, data }) => {
            Ok(Some((content_type.clone(), data.clone())))
        }
        None => {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            let mut any = false;
            for p in params.iter().filter(|p| p.kind == ParameterKind::GetOrPost) {
                form.append_pair(&p.name, &p.value);
                any = true;
            }
            Ok(any.then(|| (FORM_CONTENT_TYPE.to_string(), form.finish().into_bytes())))
        }
    }
}
