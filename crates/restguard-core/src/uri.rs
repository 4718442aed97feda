//! Request URI assembly: base URL + resource + url segments + query string.

use url::form_urlencoded::byte_serialize;
use url::Url;

use crate::error::ClientError;
use crate::options::ClientOptions;
use crate::request::{Parameter, ParameterKind, RestRequest};

/// Request parameters merged with the client's default parameters.
///
/// A default parameter is skipped when the request already carries one with
/// the same name and kind, unless the options allow duplicates.
pub fn effective_parameters(options: &ClientOptions, request: &RestRequest) -> Vec<Parameter> {
    let mut params = request.parameters.clone();
    for default in &options.default_parameters {
        let shadowed = !options.allow_multiple_default_parameters_with_same_name
            && request
                .parameters
                .iter()
                .any(|p| p.kind == default.kind && p.name == default.name);
        if !shadowed {
            params.push(default.clone());
        }
    }
    params
}

/// Returns `true` if `GetOrPost` parameters belong in the query string.
///
/// They are form-encoded into the body only for body-carrying methods that
/// have no explicit body.
pub fn get_or_post_in_query(carries_body: bool, request: &RestRequest) -> bool {
    !carries_body || request.body.is_some()
}

/// Full request URI, including query parameters.
pub fn build_uri(options: &ClientOptions, request: &RestRequest) -> Result<Url, ClientError> {
    build_uri_for(options, request, request.method.has_body())
}

/// Request URI with every query parameter stripped.
pub fn build_uri_without_query_parameters(
    options: &ClientOptions,
    request: &RestRequest,
) -> Result<String, ClientError> {
    let params = effective_parameters(options, request);
    let mut url = resolve_path(options, request, &params)?;
    url.set_query(None);
    Ok(url.to_string())
}

/// Like [`build_uri`] with the body placement decided by the caller; used
/// when a request is sent with a verb other than its own method.
pub fn build_uri_for(
    options: &ClientOptions,
    request: &RestRequest,
    carries_body: bool,
) -> Result<Url, ClientError> {
    let params = effective_parameters(options, request);
    let mut url = resolve_path(options, request, &params)?;

    let in_query = get_or_post_in_query(carries_body, request);
    let pairs: Vec<&Parameter> = params
        .iter()
        .filter(|p| {
            p.kind == ParameterKind::QueryString || (in_query && p.kind == ParameterKind::GetOrPost)
        })
        .collect();
    if pairs.is_empty() {
        return Ok(url);
    }

    match &options.query_encoder {
        Some(encode) => {
            let encoded = pairs
                .iter()
                .map(|p| {
                    format!(
                        "{}={}",
                        encode(&p.name, &options.encoding),
                        encode(&p.value, &options.encoding)
                    )
                })
                .collect::<Vec<_>>()
                .join("&");
            let query = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
                _ => encoded,
            };
            url.set_query(Some(&query));
        }
        None => {
            let mut query = url.query_pairs_mut();
            for p in pairs {
                query.append_pair(&p.name, &p.value);
            }
        }
    }
    Ok(url)
}

fn encode_segment(options: &ClientOptions, value: &str) -> String {
    match &options.url_encoder {
        Some(encode) => encode(value),
        None => byte_serialize(value.as_bytes())
            .collect::<String>()
            .replace('+', "%20"),
    }
}

fn resolve_path(
    options: &ClientOptions,
    request: &RestRequest,
    params: &[Parameter],
) -> Result<Url, ClientError> {
    let mut resource = request.resource.clone();
    for p in params.iter().filter(|p| p.kind == ParameterKind::UrlSegment) {
        resource = resource.replace(&format!("{{{}}}", p.name), &encode_segment(options, &p.value));
    }

    if let Ok(absolute) = Url::parse(&resource) {
        if !absolute.cannot_be_a_base() {
            return Ok(absolute);
        }
    }

    let base = options.base_url.as_ref().ok_or_else(|| {
        ClientError::InvalidUrl(format!(
            "resource {resource:?} is relative and no base URL is configured"
        ))
    })?;

    let base = base.as_str().trim_end_matches('/');
    let joined = if resource.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{}", resource.trim_start_matches('/'))
    };
    Url::parse(&joined).map_err(|e| ClientError::InvalidUrl(format!("{joined}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::request::Method;

    fn opts() -> ClientOptions {
        ClientOptions::with_base_url("https://api.example.com/v1/").unwrap()
    }

    #[test]
    fn joins_base_and_resource_with_single_slash() {
        let url = build_uri(&opts(), &RestRequest::get("/users")).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/users");

        let url = build_uri(&opts(), &RestRequest::get("")).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1");
    }

    #[test]
    fn absolute_resource_ignores_base() {
        let url = build_uri(&opts(), &RestRequest::get("http://other.test/ping")).unwrap();
        assert_eq!(url.as_str(), "http://other.test/ping");
    }

    #[test]
    fn relative_resource_without_base_is_rejected() {
        let err = build_uri(&ClientOptions::default(), &RestRequest::get("users")).unwrap_err();
        assert!(matches!(err, ClientError::InvalidUrl(_)));
    }

    #[test]
    fn url_segments_are_substituted_and_encoded() {
        let req = RestRequest::get("users/{id}/files/{name}")
            .add_url_segment("id", "42")
            .add_url_segment("name", "my report.pdf");
        let url = build_uri(&opts(), &req).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/users/42/files/my%20report.pdf"
        );
    }

    #[test]
    fn get_or_post_goes_to_query_for_get_and_body_for_post() {
        let get = RestRequest::get("search")
            .add_parameter("q", "rust lang", ParameterKind::GetOrPost)
            .add_query_parameter("page", "2");
        assert_eq!(
            build_uri(&opts(), &get).unwrap().as_str(),
            "https://api.example.com/v1/search?q=rust+lang&page=2"
        );

        let post = get.clone().with_method(Method::Post);
        assert_eq!(
            build_uri(&opts(), &post).unwrap().as_str(),
            "https://api.example.com/v1/search?page=2"
        );

        let post_with_body = post.add_body("text/plain", "x");
        assert_eq!(
            build_uri(&opts(), &post_with_body).unwrap().query(),
            Some("q=rust+lang&page=2")
        );
    }

    #[test]
    fn request_parameters_shadow_defaults() {
        let mut options = opts();
        options.default_parameters = vec![
            Parameter::new("api_key", "default", ParameterKind::QueryString),
            Parameter::new("lang", "en", ParameterKind::QueryString),
        ];
        let req = RestRequest::get("items").add_query_parameter("api_key", "mine");
        assert_eq!(
            build_uri(&options, &req).unwrap().query(),
            Some("api_key=mine&lang=en")
        );

        options.allow_multiple_default_parameters_with_same_name = true;
        assert_eq!(
            build_uri(&options, &req).unwrap().query(),
            Some("api_key=mine&api_key=default&lang=en")
        );
    }

    #[test]
    fn custom_encoders_are_applied() {
        let mut options = opts();
        options.url_encoder = Some(Arc::new(|s: &str| s.replace(' ', "_")));
        options.query_encoder = Some(Arc::new(|s: &str, _enc: &str| s.to_uppercase()));
        let req = RestRequest::get("tags/{tag}")
            .add_url_segment("tag", "big data")
            .add_query_parameter("sort", "asc");
        let url = build_uri(&options, &req).unwrap();
        assert_eq!(url.path(), "/v1/tags/big_data");
        assert_eq!(url.query(), Some("SORT=ASC"));
    }

    #[test]
    fn without_query_strips_everything() {
        let req = RestRequest::get("search?fixed=1").add_query_parameter("q", "x");
        assert_eq!(
            build_uri_without_query_parameters(&opts(), &req).unwrap(),
            "https://api.example.com/v1/search"
        );
    }
}
