//! Request body parsing helpers.

use std::fmt;

use serde_json::Value;
use tracing::warn;

use crate::request::Request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonParseError {
    BadContentType,
    BadJsonData,
}

impl fmt::Display for JsonParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonParseError::BadContentType => write!(f, "content type is not JSON"),
            JsonParseError::BadJsonData => write!(f, "request body is not valid JSON"),
        }
    }
}

impl std::error::Error for JsonParseError {}

/// Accept exactly the JSON content types the original service accepted.
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type.eq_ignore_ascii_case("application/json")
        || content_type.eq_ignore_ascii_case("application/json; charset=utf-8")
        || content_type.eq_ignore_ascii_case("application/json;charset=utf-8")
}

/// Content negotiation: can the client take anything we produce?
///
/// The service emits JSON documents, octet-stream attachments, and SSE
/// frames. An absent `Accept` header accepts everything.
pub fn acceptable(accept: Option<&str>) -> bool {
    let Some(accept) = accept else {
        return true;
    };
    accept.split(',').any(|part| {
        let mime = part.split(';').next().unwrap_or("").trim();
        matches!(
            mime,
            "*/*"
                | "application/*"
                | "application/json"
                | "application/octet-stream"
                | "text/*"
                | "text/event-stream"
                | "text/html"
        )
    })
}

/// Parse the request body as JSON, checking the content type first.
pub fn parse_request_as_json(req: &Request) -> Result<Value, JsonParseError> {
    let content_type = req.header("content-type").unwrap_or("");
    if !is_json_content_type(content_type) {
        warn!("failed to parse content type on request");
        return Err(JsonParseError::BadContentType);
    }
    serde_json::from_slice(req.body()).map_err(|_| {
        warn!("failed to parse json in request");
        JsonParseError::BadJsonData
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verb::Verb;
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue};

    fn json_request(content_type: Option<&str>, body: &str) -> Request {
        let mut headers = HeaderMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type", HeaderValue::from_str(ct).unwrap());
        }
        Request::new(
            Verb::Post,
            "/".parse().unwrap(),
            headers,
            Bytes::copy_from_slice(body.as_bytes()),
            None,
        )
        .unwrap()
    }

    #[test]
    fn accept_header_negotiation() {
        assert!(acceptable(None));
        assert!(acceptable(Some("*/*")));
        assert!(acceptable(Some("application/json")));
        assert!(acceptable(Some("text/html,application/xhtml+xml,*/*;q=0.8")));
        assert!(acceptable(Some("application/json; charset=utf-8")));
        assert!(acceptable(Some("application/octet-stream")));
        assert!(!acceptable(Some("application/xml")));
        assert!(!acceptable(Some("image/png")));
    }

    #[test]
    fn content_type_gate() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("Application/JSON"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type("application/json;charset=utf-8"));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("application/json; charset=ascii"));
    }

    #[test]
    fn parses_json_bodies() {
        let req = json_request(Some("application/json"), r#"{"a": 5}"#);
        assert_eq!(parse_request_as_json(&req).unwrap()["a"], 5);

        let req = json_request(None, r#"{"a": 5}"#);
        assert_eq!(
            parse_request_as_json(&req),
            Err(JsonParseError::BadContentType)
        );

        let req = json_request(Some("application/json"), "{not json");
        assert_eq!(
            parse_request_as_json(&req),
            Err(JsonParseError::BadJsonData)
        );
    }
}
