//! Session service: login, logout, session inspection.

use std::sync::Arc;

use http::header::{HeaderName, LOCATION};
use http::StatusCode;
use serde_json::{json, Value};
use tracing::{info, warn};

use redfishd_core::error_messages;
use redfishd_core::parsing::JsonParseError;
use redfishd_core::{App, Privilege, Session};

use super::{configure_manager_or_self, login, open};
use crate::AppState;

const X_AUTH_TOKEN: HeaderName = HeaderName::from_static("x-auth-token");

fn session_json(session: &Session) -> Value {
    let mut doc = json!({
        "@odata.id": format!("/redfish/v1/SessionService/Sessions/{}", session.id),
        "@odata.type": "#Session.v1_5_0.Session",
        "Id": session.id,
        "Name": "User Session",
        "Description": "Manager User Session",
        "UserName": session.username,
        "CreatedTime": session.created.to_rfc3339(),
    });
    if let Some(client_id) = &session.client_id {
        doc["Context"] = json!(client_id);
    }
    doc
}

pub fn register(app: &mut App, state: &Arc<AppState>) {
    let st = state.clone();
    app.route("/redfish/v1/SessionService")
        .privileges(login())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                resp.res().json_value = json!({
                    "@odata.id": "/redfish/v1/SessionService",
                    "@odata.type": "#SessionService.v1_1_8.SessionService",
                    "Id": "SessionService",
                    "Name": "Session Service",
                    "Description": "Session Service",
                    "Status": {"State": "Enabled", "Health": "OK"},
                    "ServiceEnabled": true,
                    "SessionTimeout": st.config.session_idle_timeout_secs,
                    "Sessions": {"@odata.id": "/redfish/v1/SessionService/Sessions"},
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/SessionService/Sessions")
        .privileges(login())
        .get(move |req, resp, (): ()| {
            let st = st.clone();
            async move {
                // Session URLs carry the token; list only the caller's own
                // sessions unless they hold ConfigureManager.
                let sees_all = st
                    .privileges_of(&req.user_role)
                    .contains(Privilege::ConfigureManager);
                let members: Vec<Value> = st
                    .sessions
                    .all()
                    .into_iter()
                    .filter(|s| sees_all || req.username() == Some(s.username.as_str()))
                    .map(|s| {
                        json!({"@odata.id": format!("/redfish/v1/SessionService/Sessions/{}", s.id)})
                    })
                    .collect();
                resp.res().json_value = json!({
                    "@odata.type": "#SessionCollection.SessionCollection",
                    "@odata.id": "/redfish/v1/SessionService/Sessions",
                    "Name": "Session Collection",
                    "Members@odata.count": members.len(),
                    "Members": members,
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/SessionService/Sessions")
        .privileges(open())
        .post(move |req, resp, (): ()| {
            let st = st.clone();
            async move {
                let body = match req.json_body() {
                    Ok(body) => body,
                    Err(JsonParseError::BadContentType) => {
                        error_messages::unsupported_media_type(&mut resp.res());
                        return;
                    }
                    Err(JsonParseError::BadJsonData) => {
                        error_messages::malformed_json(&mut resp.res());
                        return;
                    }
                };
                let Some(username) = body.get("UserName").and_then(Value::as_str) else {
                    error_messages::property_missing(&mut resp.res(), "UserName");
                    return;
                };
                let Some(password) = body.get("Password").and_then(Value::as_str) else {
                    error_messages::property_missing(&mut resp.res(), "Password");
                    return;
                };
                let Some(role) = st.accounts.verify(username, password) else {
                    warn!("failed login attempt");
                    error_messages::no_valid_session(&mut resp.res());
                    return;
                };
                let client_id = body
                    .get("Context")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let session = st.sessions.create(
                    username,
                    &role,
                    client_id,
                    req.peer().map(|p| p.ip()),
                );
                info!(username, role, "session created");

                let mut res = resp.res();
                res.set_status(StatusCode::CREATED);
                // The one and only time the token leaves the service.
                res.set_header(X_AUTH_TOKEN, &session.id);
                res.set_header(
                    LOCATION,
                    &format!("/redfish/v1/SessionService/Sessions/{}", session.id),
                );
                res.json_value = session_json(&session);
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/SessionService/Sessions/<str>")
        .privileges(login())
        .get(move |_req, resp, (id,): (String,)| {
            let st = st.clone();
            async move {
                match st.sessions.get(&id) {
                    Some(session) => resp.res().json_value = session_json(&session),
                    None => {
                        error_messages::resource_not_found(&mut resp.res(), "Session", &id);
                    }
                }
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/SessionService/Sessions/<str>")
        .privileges(configure_manager_or_self())
        .delete(move |req, resp, (id,): (String,)| {
            let st = st.clone();
            async move {
                let Some(target) = st.sessions.get(&id) else {
                    error_messages::resource_not_found(&mut resp.res(), "Session", &id);
                    return;
                };
                // ConfigureSelf admits the route; ownership is checked here
                // because the target of a session URL is a session id, not a
                // username.
                let is_manager = st
                    .privileges_of(&req.user_role)
                    .contains(Privilege::ConfigureManager);
                if !is_manager && req.username() != Some(target.username.as_str()) {
                    error_messages::insufficient_privilege(&mut resp.res());
                    return;
                }
                st.sessions.remove(&id);
                info!(username = %target.username, "session removed");
                error_messages::success(&mut resp.res());
            }
        });
}
