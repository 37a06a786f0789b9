//! The mutable response a handler composes.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use http::header::{HeaderName, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::Value;

/// A byte stream body, used for SSE and other long-lived responses.
pub type StreamBody = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Non-JSON body variants. Mutually exclusive with the JSON value.
pub enum Attachment {
    Bytes(Bytes),
    File(PathBuf),
    Stream(StreamBody),
}

/// The response under construction.
///
/// Handlers mutate `json_value` (an ordered JSON tree), the status, and the
/// headers; the framework serialises on completion. `write_bytes`,
/// `open_file` and `stream` replace the JSON body with an attachment.
#[derive(Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    /// The JSON document; insertion order is preserved.
    pub json_value: Value,
    attachment: Option<Attachment>,
}

impl Response {
    pub fn new() -> Response {
        Response::default()
    }

    /// Current status; 200 unless a handler set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Append a header, keeping existing values for the same name.
    pub fn add_header(&mut self, name: HeaderName, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.append(name, value);
        }
    }

    /// Set a header, replacing any existing value.
    pub fn set_header(&mut self, name: HeaderName, value: &str) {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
    }

    /// Replace the JSON body with raw bytes and a content type.
    pub fn write_bytes(&mut self, body: Bytes, content_type: &str) {
        self.json_value = Value::Null;
        self.set_header(CONTENT_TYPE, content_type);
        self.attachment = Some(Attachment::Bytes(body));
    }

    /// Replace the JSON body with a file-backed byte stream. The file is
    /// opened lazily when the response is serialised.
    pub fn open_file(&mut self, path: PathBuf, content_type: &str) {
        self.json_value = Value::Null;
        self.set_header(CONTENT_TYPE, content_type);
        self.attachment = Some(Attachment::File(path));
    }

    /// Replace the JSON body with a byte stream (SSE and friends).
    pub fn stream(&mut self, body: StreamBody, content_type: &str) {
        self.json_value = Value::Null;
        self.set_header(CONTENT_TYPE, content_type);
        self.attachment = Some(Attachment::Stream(body));
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn take_attachment(&mut self) -> Option<Attachment> {
        self.attachment.take()
    }

    /// Hand the accumulated headers to the serialiser.
    pub fn take_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.headers)
    }

    /// Reset to the post-construction state.
    pub fn clear(&mut self) {
        self.status = None;
        self.headers.clear();
        self.json_value = Value::Null;
        self.attachment = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_status_is_ok() {
        let res = Response::new();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn json_body_round_trips() {
        let mut res = Response::new();
        res.json_value = json!({
            "@odata.id": "/redfish/v1",
            "Name": "Root Service",
            "Links": {"Sessions": {"@odata.id": "/redfish/v1/SessionService/Sessions"}},
        });
        let serialized = serde_json::to_string(&res.json_value).unwrap();
        let reparsed: Value = serde_json::from_str(&serialized).unwrap();
        assert_eq!(reparsed, res.json_value);
        // Insertion order must survive the round trip.
        let keys: Vec<&String> = reparsed.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["@odata.id", "Name", "Links"]);
    }

    #[test]
    fn attachment_clears_json() {
        let mut res = Response::new();
        res.json_value = json!({"a": 1});
        res.write_bytes(Bytes::from_static(b"payload"), "application/octet-stream");
        assert!(res.json_value.is_null());
        assert_eq!(
            res.headers().get(CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
        assert!(matches!(res.attachment(), Some(Attachment::Bytes(_))));
    }

    #[test]
    fn add_header_appends_set_header_replaces() {
        let mut res = Response::new();
        let name = HeaderName::from_static("x-test");
        res.add_header(name.clone(), "one");
        res.add_header(name.clone(), "two");
        assert_eq!(res.headers().get_all(&name).iter().count(), 2);
        res.set_header(name.clone(), "three");
        assert_eq!(res.headers().get_all(&name).iter().count(), 1);
    }
}
