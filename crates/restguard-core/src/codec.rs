//! Body serializers, content-type deserializers and typed response decoding.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;
use crate::options::ClientOptions;
use crate::response::{ResponseStatus, RestResponse, TypedResponse};

/// Encodes structured request bodies.
pub trait BodySerializer: Send + Sync {
    /// Content type sent alongside the encoded body.
    fn content_type(&self) -> &str;

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, ClientError>;
}

/// Decodes a response body of one content type into a JSON value tree.
pub trait BodyDeserializer: Send + Sync {
    fn deserialize(&self, body: &[u8]) -> Result<Value, ClientError>;
}

/// `application/json` body serializer.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl BodySerializer for JsonSerializer {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, ClientError> {
        serde_json::to_vec(value).map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserializer;

impl BodyDeserializer for JsonDeserializer {
    fn deserialize(&self, body: &[u8]) -> Result<Value, ClientError> {
        serde_json::from_slice(body).map_err(|e| ClientError::Deserialization(e.to_string()))
    }
}

/// Treats the whole body as a UTF-8 string.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDeserializer;

impl BodyDeserializer for TextDeserializer {
    fn deserialize(&self, body: &[u8]) -> Result<Value, ClientError> {
        std::str::from_utf8(body)
            .map(|s| Value::String(s.to_string()))
            .map_err(|e| ClientError::Deserialization(e.to_string()))
    }
}

/// Content types registered by default, all decoded as JSON.
pub const DEFAULT_JSON_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "text/json",
    "text/x-json",
    "text/javascript",
    "*+json",
    "*",
];

/// Strips parameters (`; charset=...`) and lowercases a content type.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Picks the handler for `content_type`: exact match, then structured
/// suffix (`*+json`), then the `*` fallback.
fn find_handler<'a>(
    options: &'a ClientOptions,
    content_type: Option<&str>,
) -> Option<&'a dyn BodyDeserializer> {
    let normalized = content_type.map(normalize_content_type).unwrap_or_default();

    if let Some(h) = options.handlers.get(&normalized) {
        return Some(h.as_ref());
    }
    if let Some((_, suffix)) = normalized.rsplit_once('+') {
        if let Some(h) = options.handlers.get(&format!("*+{suffix}")) {
            return Some(h.as_ref());
        }
    }
    options.handlers.get("*").map(|h| h.as_ref())
}

/// Decode `response` into `T` honoring the client's deserialization flags.
///
/// - empty body → `data: None`
/// - failure with `throw_on_deserialization_error` → `Err`
/// - failure with `fail_on_deserialization_error` → response marked `Error`
/// - otherwise failures leave `data: None`
pub fn deserialize_response<T: DeserializeOwned>(
    options: &ClientOptions,
    mut response: RestResponse,
) -> Result<TypedResponse<T>, ClientError> {
    if response.body.is_empty() {
        return Ok(TypedResponse {
            response,
            data: None,
        });
    }

    let decoded = match find_handler(options, response.content_type.as_deref()) {
        Some(handler) => handler.deserialize(&response.body).and_then(|value| {
            serde_json::from_value::<T>(value)
                .map_err(|e| ClientError::Deserialization(e.to_string()))
        }),
        None => Err(ClientError::Deserialization(format!(
            "no handler registered for content type {:?}",
            response.content_type
        ))),
    };

    match decoded {
        Ok(data) => Ok(TypedResponse {
            response,
            data: Some(data),
        }),
        Err(e) if options.throw_on_deserialization_error => Err(e),
        Err(e) => {
            if options.fail_on_deserialization_error {
                response.response_status = ResponseStatus::Error;
                response.error_message = Some(e.to_string());
            }
            Ok(TypedResponse {
                response,
                data: None,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
    }

    fn response(content_type: &str, body: &str) -> RestResponse {
        RestResponse {
            status: 200,
            content_type: Some(content_type.into()),
            body: body.as_bytes().to_vec(),
            response_status: ResponseStatus::Completed,
            ..Default::default()
        }
    }

    #[test]
    fn decodes_json_with_charset() {
        let opts = ClientOptions::default();
        let typed: TypedResponse<User> = deserialize_response(
            &opts,
            response("application/json; charset=utf-8", r#"{"id":7,"name":"ada"}"#),
        )
        .unwrap();
        assert_eq!(
            typed.data,
            Some(User {
                id: 7,
                name: "ada".into()
            })
        );
    }

    #[test]
    fn structured_suffix_falls_back_to_json() {
        let mut opts = ClientOptions::default();
        opts.handlers.remove("*");
        let typed: TypedResponse<User> = deserialize_response(
            &opts,
            response("application/vnd.api+json", r#"{"id":1,"name":"x"}"#),
        )
        .unwrap();
        assert_eq!(typed.data.map(|u| u.id), Some(1));
    }

    #[test]
    fn empty_body_yields_no_data() {
        let opts = ClientOptions::default();
        let typed: TypedResponse<User> =
            deserialize_response(&opts, response("application/json", "")).unwrap();
        assert!(typed.data.is_none());
        assert_eq!(typed.response.response_status, ResponseStatus::Completed);
    }

    #[test]
    fn failure_modes_follow_flags() {
        let bad = || response("application/json", "not json");

        let silent = ClientOptions::default();
        let typed: TypedResponse<User> = deserialize_response(&silent, bad()).unwrap();
        assert!(typed.data.is_none());
        assert_eq!(typed.response.response_status, ResponseStatus::Completed);

        let fail = ClientOptions {
            fail_on_deserialization_error: true,
            ..Default::default()
        };
        let typed: TypedResponse<User> = deserialize_response(&fail, bad()).unwrap();
        assert_eq!(typed.response.response_status, ResponseStatus::Error);
        assert!(typed.response.error_message.is_some());

        let throw = ClientOptions {
            throw_on_deserialization_error: true,
            ..Default::default()
        };
        let err = deserialize_response::<User>(&throw, bad()).unwrap_err();
        assert!(matches!(err, ClientError::Deserialization(_)));
    }

    #[test]
    fn custom_handler_takes_precedence() {
        let mut opts = ClientOptions::default();
        opts.handlers
            .insert("text/plain".into(), Arc::new(TextDeserializer));
        let typed: TypedResponse<String> =
            deserialize_response(&opts, response("text/plain", "hello")).unwrap();
        assert_eq!(typed.data.as_deref(), Some("hello"));
    }
}
