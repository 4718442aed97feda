//! Request description types.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Merge,
    Copy,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
            Self::Merge => "MERGE",
            Self::Copy => "COPY",
        }
    }

    /// Returns `true` if requests with this method carry a body, which also
    /// decides whether `GetOrPost` parameters go to the body or the query.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch | Self::Merge)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH" => Ok(Self::Patch),
            "MERGE" => Ok(Self::Merge),
            "COPY" => Ok(Self::Copy),
            other => Err(ClientError::InvalidRequest(format!(
                "unknown HTTP method: {other}"
            ))),
        }
    }
}

/// Where a parameter ends up in the outgoing HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Replaces a `{name}` placeholder in the resource path.
    UrlSegment,
    /// Always appended to the query string.
    QueryString,
    /// Sent as a request header.
    HttpHeader,
    /// Sent in the `Cookie` header.
    Cookie,
    /// Query string for body-less methods, form body otherwise.
    GetOrPost,
}

/// A named request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
    pub kind: ParameterKind,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
        }
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Structured value, encoded by the client's configured serializer.
    Value(Value),
    /// Pre-encoded bytes sent verbatim.
    Bytes { content_type: String, data: Vec<u8> },
}

/// Description of a single REST call.
///
/// The resource is either a path relative to the client's base URL or an
/// absolute URL. It may contain `{name}` placeholders filled by
/// [`ParameterKind::UrlSegment`] parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestRequest {
    pub resource: String,
    pub method: Method,
    pub parameters: Vec<Parameter>,
    pub body: Option<RequestBody>,
    /// Overrides the client-wide timeout for this request only.
    pub timeout: Option<Duration>,
}

impl RestRequest {
    pub fn new(resource: impl Into<String>, method: Method) -> Self {
        Self {
            resource: resource.into(),
            method,
            ..Default::default()
        }
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(resource, Method::Get)
    }

    pub fn post(resource: impl Into<String>) -> Self {
        Self::new(resource, Method::Post)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn add_parameter(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        kind: ParameterKind,
    ) -> Self {
        self.parameters.push(Parameter::new(name, value, kind));
        self
    }

    pub fn add_url_segment(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value, ParameterKind::UrlSegment)
    }

    pub fn add_query_parameter(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value, ParameterKind::QueryString)
    }

    pub fn add_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value, ParameterKind::HttpHeader)
    }

    pub fn add_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_parameter(name, value, ParameterKind::Cookie)
    }

    /// Set a structured body from any serializable value.
    pub fn add_json_body<T: Serialize>(mut self, body: &T) -> Result<Self, ClientError> {
        let value =
            serde_json::to_value(body).map_err(|e| ClientError::Serialization(e.to_string()))?;
        self.body = Some(RequestBody::Value(value));
        Ok(self)
    }

    pub fn add_body(mut self, content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Bytes {
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    /// Parameters of the given kind, in insertion order.
    pub fn parameters_of(&self, kind: ParameterKind) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.kind == kind)
    }
}
