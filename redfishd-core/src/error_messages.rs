//! The standard Redfish error envelope and the Base message constructors.
//!
//! Every 4xx/5xx response carries:
//!
//! ```text
//! {"error": {"code": "<MessageId>",
//!            "message": "<first message text>",
//!            "@Message.ExtendedInfo": [ {message-object}, ... ]}}
//! ```
//!
//! `code`/`message` come from the first message added; further messages
//! downgrade them to `GeneralError` and append to the array. Each public
//! constructor writes one Base-registry message into a response and sets the
//! HTTP status the error kind maps to.

use http::header::RETRY_AFTER;
use http::StatusCode;
use serde_json::{json, Value};
use tracing::error;

use redfishd_registries::{base, log_entry, message_id};

use crate::response::Response;

/// The annotation key carrying structured message objects.
pub const MESSAGE_ANNOTATION: &str = "@Message.ExtendedInfo";

fn general_error_code() -> String {
    message_id(&base::HEADER, "GeneralError")
}

/// Build a Base-registry message object, falling back to `GeneralError` if
/// the key is unknown (a programming error, logged loudly).
pub fn base_message(key: &str, args: &[&str]) -> Value {
    match log_entry(&base::REGISTRY, key, args) {
        Some(entry) => entry,
        None => {
            error!(key, "unknown Base registry message requested");
            log_entry(&base::REGISTRY, "GeneralError", &[])
                .expect("GeneralError is compiled in")
        }
    }
}

fn add_message_to_error_json(target: &mut Value, message: Value) {
    let Some(message_id) = message.get("MessageId").cloned() else {
        error!("attempt to add error message without MessageId");
        return;
    };
    let Some(message_text) = message.get("Message").cloned() else {
        error!("attempt to add error message without Message");
        return;
    };

    if !target.is_object() {
        *target = json!({});
    }
    let root = target.as_object_mut().expect("target forced to object");
    let error = root
        .entry("error".to_string())
        .or_insert(Value::Null);

    if !error.is_object() {
        // First message: surface its id and text at the top level.
        *error = json!({
            "code": message_id,
            "message": message_text,
        });
    } else {
        let extended = error.get(MESSAGE_ANNOTATION).and_then(Value::as_array);
        if let Some(extended) = extended {
            // Identical content must never duplicate.
            if extended.iter().any(|m| *m == message) {
                return;
            }
        }
        // More than one error occurred, so the top level has to be generic.
        error["code"] = Value::String(general_error_code());
        error["message"] = Value::String(
            "A general error has occurred. See Resolution for information on how to resolve the error."
                .to_string(),
        );
    }

    let extended = &mut error[MESSAGE_ANNOTATION];
    if !extended.is_array() {
        *extended = Value::Array(Vec::new());
    }
    extended
        .as_array_mut()
        .expect("forced to array")
        .push(message);
}

/// Relocate error messages from `source` into `target`'s error envelope.
///
/// `source` either carries an `error` envelope of its own or is a bare
/// message object placed at the root by the caller.
pub fn move_errors_to_error_json(target: &mut Value, source: &mut Value) {
    if !source.is_object() {
        return;
    }
    let Some(error) = source.get_mut("error") else {
        let message = std::mem::take(source);
        add_message_to_error_json(target, message);
        return;
    };
    if error.get(MESSAGE_ANNOTATION).is_none() {
        return;
    }
    let messages = error
        .get_mut(MESSAGE_ANNOTATION)
        .and_then(Value::as_array_mut)
        .map(std::mem::take)
        .unwrap_or_default();
    for message in messages {
        add_message_to_error_json(target, message);
    }
    if let Some(obj) = source.as_object_mut() {
        obj.remove("error");
    }
}

/// Append a message object to the root-level annotation array (used for
/// success annotations on 2xx documents).
fn add_message_to_json_root(target: &mut Value, message: Value) {
    if !target.is_object() {
        *target = json!({});
    }
    let annotation = &mut target[MESSAGE_ANNOTATION];
    if !annotation.is_array() {
        *annotation = Value::Array(Vec::new());
    }
    annotation
        .as_array_mut()
        .expect("forced to array")
        .push(message);
}

/// Append a message object under `<field_path>@Message.ExtendedInfo`.
pub fn add_message_to_json(target: &mut Value, message: Value, field_path: &str) {
    if !target.is_object() {
        *target = json!({});
    }
    let key = format!("{field_path}{MESSAGE_ANNOTATION}");
    let field = &mut target[key];
    if !field.is_array() {
        *field = Value::Array(Vec::new());
    }
    field.as_array_mut().expect("forced to array").push(message);
}

fn with_error(res: &mut Response, status: StatusCode, key: &str, args: &[&str]) {
    res.set_status(status);
    add_message_to_error_json(&mut res.json_value, base_message(key, args));
}

// ── 2xx annotations ────────────────────────────────────────────────────────

/// Annotate the current document with `Success`.
pub fn success(res: &mut Response) {
    add_message_to_json_root(&mut res.json_value, base_message("Success", &[]));
}

pub fn account_modified(res: &mut Response) {
    add_message_to_json_root(&mut res.json_value, base_message("AccountModified", &[]));
}

pub fn account_removed(res: &mut Response) {
    add_message_to_json_root(&mut res.json_value, base_message("AccountRemoved", &[]));
}

pub fn session_terminated(res: &mut Response) {
    add_message_to_json_root(&mut res.json_value, base_message("SessionTerminated", &[]));
}

// ── 4xx ────────────────────────────────────────────────────────────────────

pub fn malformed_json(res: &mut Response) {
    with_error(res, StatusCode::BAD_REQUEST, "MalformedJSON", &[]);
}

pub fn unrecognized_request_body(res: &mut Response) {
    with_error(res, StatusCode::BAD_REQUEST, "UnrecognizedRequestBody", &[]);
}

pub fn no_operation(res: &mut Response) {
    with_error(res, StatusCode::BAD_REQUEST, "NoOperation", &[]);
}

pub fn property_value_format_error(res: &mut Response, value: &str, property: &str) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "PropertyValueFormatError",
        &[value, property],
    );
}

pub fn property_value_type_error(res: &mut Response, value: &str, property: &str) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "PropertyValueTypeError",
        &[value, property],
    );
}

pub fn property_value_not_in_list(res: &mut Response, value: &str, property: &str) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "PropertyValueNotInList",
        &[value, property],
    );
}

pub fn property_missing(res: &mut Response, property: &str) {
    with_error(res, StatusCode::BAD_REQUEST, "PropertyMissing", &[property]);
}

pub fn property_unknown(res: &mut Response, property: &str) {
    with_error(res, StatusCode::BAD_REQUEST, "PropertyUnknown", &[property]);
}

pub fn property_not_writable(res: &mut Response, property: &str) {
    with_error(res, StatusCode::BAD_REQUEST, "PropertyNotWritable", &[property]);
}

pub fn property_duplicate(res: &mut Response, property: &str) {
    with_error(res, StatusCode::BAD_REQUEST, "PropertyDuplicate", &[property]);
}

pub fn action_not_supported(res: &mut Response, action: &str) {
    with_error(res, StatusCode::BAD_REQUEST, "ActionNotSupported", &[action]);
}

pub fn action_parameter_missing(res: &mut Response, action: &str, parameter: &str) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "ActionParameterMissing",
        &[action, parameter],
    );
}

pub fn action_parameter_unknown(res: &mut Response, action: &str, parameter: &str) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "ActionParameterUnknown",
        &[action, parameter],
    );
}

pub fn action_parameter_value_format_error(
    res: &mut Response,
    value: &str,
    parameter: &str,
    action: &str,
) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "ActionParameterValueFormatError",
        &[value, parameter, action],
    );
}

pub fn create_failed_missing_req_properties(res: &mut Response, property: &str) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "CreateFailedMissingReqProperties",
        &[property],
    );
}

pub fn create_limit_reached_for_resource(res: &mut Response) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "CreateLimitReachedForResource",
        &[],
    );
}

pub fn query_not_supported(res: &mut Response) {
    with_error(res, StatusCode::BAD_REQUEST, "QueryNotSupported", &[]);
}

pub fn query_not_supported_on_resource(res: &mut Response) {
    with_error(
        res,
        StatusCode::BAD_REQUEST,
        "QueryNotSupportedOnResource",
        &[],
    );
}

pub fn invalid_object(res: &mut Response, uri: &str) {
    with_error(res, StatusCode::BAD_REQUEST, "InvalidObject", &[uri]);
}

pub fn resource_missing_at_uri(res: &mut Response, uri: &str) {
    with_error(res, StatusCode::BAD_REQUEST, "ResourceMissingAtURI", &[uri]);
}

pub fn no_valid_session(res: &mut Response) {
    with_error(res, StatusCode::UNAUTHORIZED, "NoValidSession", &[]);
}

pub fn resource_at_uri_unauthorized(res: &mut Response, uri: &str, why: &str) {
    with_error(
        res,
        StatusCode::UNAUTHORIZED,
        "ResourceAtUriUnauthorized",
        &[uri, why],
    );
}

pub fn insufficient_privilege(res: &mut Response) {
    with_error(res, StatusCode::FORBIDDEN, "InsufficientPrivilege", &[]);
}

pub fn access_denied(res: &mut Response, uri: &str) {
    with_error(res, StatusCode::FORBIDDEN, "AccessDenied", &[uri]);
}

pub fn resource_cannot_be_deleted(res: &mut Response) {
    with_error(res, StatusCode::FORBIDDEN, "ResourceCannotBeDeleted", &[]);
}

pub fn resource_not_found(res: &mut Response, resource_type: &str, name: &str) {
    with_error(
        res,
        StatusCode::NOT_FOUND,
        "ResourceNotFound",
        &[resource_type, name],
    );
}

pub fn could_not_establish_connection(res: &mut Response, uri: &str) {
    with_error(
        res,
        StatusCode::NOT_FOUND,
        "CouldNotEstablishConnection",
        &[uri],
    );
}

/// Content negotiation failure. The envelope uses `GeneralError` so the
/// MessageId invariant holds for 406 responses too.
pub fn content_not_acceptable(res: &mut Response) {
    with_error(res, StatusCode::NOT_ACCEPTABLE, "GeneralError", &[]);
}

/// Body parsing failed on the content type rather than the payload.
pub fn unsupported_media_type(res: &mut Response) {
    with_error(
        res,
        StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "UnrecognizedRequestBody",
        &[],
    );
}

pub fn resource_in_use(res: &mut Response) {
    with_error(res, StatusCode::CONFLICT, "ResourceInUse", &[]);
}

pub fn resource_already_exists(
    res: &mut Response,
    resource_type: &str,
    property: &str,
    value: &str,
) {
    with_error(
        res,
        StatusCode::CONFLICT,
        "ResourceAlreadyExists",
        &[resource_type, property, value],
    );
}

pub fn precondition_failed(res: &mut Response) {
    with_error(res, StatusCode::PRECONDITION_FAILED, "PreconditionFailed", &[]);
}

pub fn precondition_required(res: &mut Response) {
    with_error(
        res,
        StatusCode::PRECONDITION_REQUIRED,
        "PreconditionRequired",
        &[],
    );
}

// ── 5xx ────────────────────────────────────────────────────────────────────

pub fn internal_error(res: &mut Response) {
    with_error(res, StatusCode::INTERNAL_SERVER_ERROR, "InternalError", &[]);
}

pub fn operation_failed(res: &mut Response) {
    with_error(res, StatusCode::INTERNAL_SERVER_ERROR, "OperationFailed", &[]);
}

pub fn operation_timeout(res: &mut Response) {
    with_error(res, StatusCode::INTERNAL_SERVER_ERROR, "OperationTimeout", &[]);
}

pub fn service_shutting_down(res: &mut Response) {
    with_error(res, StatusCode::SERVICE_UNAVAILABLE, "ServiceShuttingDown", &[]);
}

pub fn service_temporarily_unavailable(res: &mut Response, retry_after_seconds: u64) {
    res.set_header(RETRY_AFTER, &retry_after_seconds.to_string());
    with_error(
        res,
        StatusCode::SERVICE_UNAVAILABLE,
        "ServiceTemporarilyUnavailable",
        &[&retry_after_seconds.to_string()],
    );
}

pub fn session_limit_exceeded(res: &mut Response) {
    with_error(
        res,
        StatusCode::SERVICE_UNAVAILABLE,
        "SessionLimitExceeded",
        &[],
    );
}

pub fn event_subscription_limit_exceeded(res: &mut Response) {
    with_error(
        res,
        StatusCode::SERVICE_UNAVAILABLE,
        "EventSubscriptionLimitExceeded",
        &[],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use redfishd_registries::find_message;

    #[test]
    fn first_message_sets_code_and_message() {
        let mut res = Response::new();
        resource_not_found(&mut res, "Task", "9");
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let error = &res.json_value["error"];
        let code = error["code"].as_str().unwrap();
        assert!(code.ends_with(".ResourceNotFound"), "{code}");
        assert!(find_message(code).is_some());
        assert_eq!(error[MESSAGE_ANNOTATION].as_array().unwrap().len(), 1);
    }

    #[test]
    fn second_message_downgrades_to_general_error() {
        let mut res = Response::new();
        resource_not_found(&mut res, "Task", "9");
        internal_error(&mut res);
        let error = &res.json_value["error"];
        let code = error["code"].as_str().unwrap();
        assert!(code.ends_with(".GeneralError"), "{code}");
        assert_eq!(error[MESSAGE_ANNOTATION].as_array().unwrap().len(), 2);
    }

    #[test]
    fn identical_messages_never_duplicate() {
        let mut res = Response::new();
        internal_error(&mut res);
        internal_error(&mut res);
        let error = &res.json_value["error"];
        assert_eq!(error[MESSAGE_ANNOTATION].as_array().unwrap().len(), 1);
        let code = error["code"].as_str().unwrap();
        assert!(code.ends_with(".InternalError"), "{code}");
    }

    #[test]
    fn every_emitted_message_id_resolves() {
        let mut res = Response::new();
        insufficient_privilege(&mut res);
        no_valid_session(&mut res);
        malformed_json(&mut res);
        property_value_format_error(&mut res, "x", "Prop");
        service_temporarily_unavailable(&mut res, 30);
        for message in res.json_value["error"][MESSAGE_ANNOTATION]
            .as_array()
            .unwrap()
        {
            let id = message["MessageId"].as_str().unwrap();
            assert!(find_message(id).is_some(), "unresolvable MessageId {id}");
        }
    }

    #[test]
    fn move_errors_relocates_and_dedups() {
        let mut target = Value::Null;
        let mut res = Response::new();
        internal_error(&mut res);
        let mut source = res.json_value.clone();
        move_errors_to_error_json(&mut target, &mut source);
        assert!(source.get("error").is_none());
        assert_eq!(
            target["error"][MESSAGE_ANNOTATION].as_array().unwrap().len(),
            1
        );

        // Moving the same content again must not duplicate.
        let mut res = Response::new();
        internal_error(&mut res);
        let mut source = res.json_value.clone();
        move_errors_to_error_json(&mut target, &mut source);
        assert_eq!(
            target["error"][MESSAGE_ANNOTATION].as_array().unwrap().len(),
            1
        );
    }

    #[test]
    fn retry_after_header_set_on_unavailable() {
        let mut res = Response::new();
        service_temporarily_unavailable(&mut res, 30);
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.headers().get(RETRY_AFTER).unwrap(), "30");
    }
}
