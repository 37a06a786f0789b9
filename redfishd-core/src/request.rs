//! The parsed, immutable request handed to route handlers.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONNECTION, UPGRADE};
use http::{HeaderMap, Uri};
use hyper::upgrade::OnUpgrade;
use percent_encoding::percent_decode_str;
use serde_json::Value;

use crate::parsing::{self, JsonParseError};
use crate::sessions::Session;
use crate::verb::Verb;

/// Errors raised while turning a raw HTTP message into a [`Request`].
#[derive(Debug, PartialEq, Eq)]
pub enum RequestError {
    /// The request target could not be parsed into path segments.
    InvalidTarget,
    /// The HTTP method is outside the supported verb set.
    UnsupportedMethod,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidTarget => write!(f, "request target is not a valid path"),
            RequestError::UnsupportedMethod => write!(f, "unsupported HTTP method"),
        }
    }
}

impl std::error::Error for RequestError {}

/// A parsed HTTP request.
///
/// Immutable after parse, apart from the authentication fields the dispatch
/// pipeline fills in before the handler runs and the upgrade handle an
/// upgrade handler may take.
pub struct Request {
    verb: Verb,
    uri: Uri,
    path: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    peer: Option<SocketAddr>,
    upgrade: Option<OnUpgrade>,
    /// Session of the authenticated principal, if any.
    pub session: Option<Arc<Session>>,
    /// Cached role name of the session user; empty when unauthenticated.
    pub user_role: String,
}

impl Request {
    /// Build a request from decomposed `http` parts.
    pub fn from_http(
        mut parts: http::request::Parts,
        body: Bytes,
        peer: Option<SocketAddr>,
    ) -> Result<Request, RequestError> {
        let verb = Verb::from_method(&parts.method).ok_or(RequestError::UnsupportedMethod)?;
        let upgrade = parts.extensions.remove::<OnUpgrade>();
        Self::build(verb, parts.uri, parts.headers, body, peer, upgrade)
    }

    /// Build a request from explicit fields. Used by tests and internal
    /// callers that have no `http::request::Parts` at hand.
    pub fn new(
        verb: Verb,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        peer: Option<SocketAddr>,
    ) -> Result<Request, RequestError> {
        Self::build(verb, uri, headers, body, peer, None)
    }

    fn build(
        verb: Verb,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        peer: Option<SocketAddr>,
        upgrade: Option<OnUpgrade>,
    ) -> Result<Request, RequestError> {
        let raw_path = uri.path();
        if !raw_path.starts_with('/') {
            return Err(RequestError::InvalidTarget);
        }
        let mut segments = Vec::new();
        for segment in raw_path.split('/').filter(|s| !s.is_empty()) {
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|_| RequestError::InvalidTarget)?;
            segments.push(decoded.into_owned());
        }
        let path = normalize_path(raw_path);
        let query = uri
            .query()
            .map(|q| {
                form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(Request {
            verb,
            uri,
            path,
            segments,
            query,
            headers,
            body,
            peer,
            upgrade,
            session: None,
            user_role: String::new(),
        })
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request path with any trailing slash removed (`/` stays `/`).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Percent-decoded path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First value for `name` in the query string, if any.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value by name, case-insensitive; `None` for absent headers and
    /// values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parse the body as JSON, gated on the request content type.
    pub fn json_body(&self) -> Result<Value, JsonParseError> {
        parsing::parse_request_as_json(self)
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Username of the authenticated principal, if any.
    pub fn username(&self) -> Option<&str> {
        self.session.as_deref().map(|s| s.username.as_str())
    }

    /// RFC 6455 upgrade detection: a `Connection: upgrade` token plus an
    /// `Upgrade` header.
    pub fn is_upgrade(&self) -> bool {
        let wants_upgrade = self
            .headers
            .get(CONNECTION)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .any(|tok| tok.trim().eq_ignore_ascii_case("upgrade"))
            })
            .unwrap_or(false);
        wants_upgrade && self.headers.contains_key(UPGRADE)
    }

    /// Take the hyper upgrade handle, if the transport provided one. Only an
    /// upgrade handler should call this.
    pub fn take_upgrade(&mut self) -> Option<OnUpgrade> {
        self.upgrade.take()
    }
}

fn normalize_path(raw: &str) -> String {
    if raw.len() > 1 && raw.ends_with('/') {
        raw[..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(verb: Verb, target: &str) -> Request {
        Request::new(
            verb,
            target.parse().unwrap(),
            HeaderMap::new(),
            Bytes::new(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn segments_are_decoded() {
        let req = request(Verb::Get, "/redfish/v1/Accounts/a%20user");
        assert_eq!(
            req.segments(),
            &["redfish", "v1", "Accounts", "a user"]
        );
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let req = request(Verb::Get, "/redfish/v1/");
        assert_eq!(req.path(), "/redfish/v1");
        let root = request(Verb::Get, "/");
        assert_eq!(root.path(), "/");
    }

    #[test]
    fn query_values_are_parsed() {
        let req = request(Verb::Get, "/redfish/v1/Systems?$skip=5&name=a%26b");
        assert_eq!(req.query_value("$skip"), Some("5"));
        assert_eq!(req.query_value("name"), Some("a&b"));
        assert_eq!(req.query_value("missing"), None);
    }

    #[test]
    fn upgrade_requires_both_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, "keep-alive, Upgrade".parse().unwrap());
        let req = Request::new(
            Verb::Get,
            "/ws".parse().unwrap(),
            headers.clone(),
            Bytes::new(),
            None,
        )
        .unwrap();
        assert!(!req.is_upgrade());

        headers.insert(UPGRADE, "websocket".parse().unwrap());
        let req =
            Request::new(Verb::Get, "/ws".parse().unwrap(), headers, Bytes::new(), None).unwrap();
        assert!(req.is_upgrade());
    }
}
