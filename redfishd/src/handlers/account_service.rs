//! Account service: accounts, roles, and the TOTP secret-key action.

use std::sync::Arc;

use http::header::LOCATION;
use http::StatusCode;
use serde_json::{json, Value};
use tracing::info;

use redfishd_core::error_messages;
use redfishd_core::parsing::JsonParseError;
use redfishd_core::{App, Privilege};

use super::{configure_users, configure_users_or_self, login};
use crate::accounts::{AccountError, AccountView};
use crate::AppState;

fn account_json(account: &AccountView) -> Value {
    json!({
        "@odata.id": format!("/redfish/v1/AccountService/Accounts/{}", account.username),
        "@odata.type": "#ManagerAccount.v1_9_0.ManagerAccount",
        "Id": account.username,
        "Name": "User Account",
        "Description": "User Account",
        "UserName": account.username,
        "RoleId": account.role,
        "Enabled": account.enabled,
        "Links": {
            "Role": {
                "@odata.id": format!("/redfish/v1/AccountService/Roles/{}", account.role)
            }
        },
    })
}

fn parse_body(
    req: &redfishd_core::Request,
    resp: &redfishd_core::AsyncResponse,
) -> Option<Value> {
    match req.json_body() {
        Ok(body) => Some(body),
        Err(JsonParseError::BadContentType) => {
            error_messages::unsupported_media_type(&mut resp.res());
            None
        }
        Err(JsonParseError::BadJsonData) => {
            error_messages::malformed_json(&mut resp.res());
            None
        }
    }
}

pub fn register(app: &mut App, state: &Arc<AppState>) {
    app.route("/redfish/v1/AccountService")
        .privileges(login())
        .get(|_req, resp, (): ()| async move {
            resp.res().json_value = json!({
                "@odata.id": "/redfish/v1/AccountService",
                "@odata.type": "#AccountService.v1_10_0.AccountService",
                "Id": "AccountService",
                "Name": "Account Service",
                "Description": "Account Service",
                "ServiceEnabled": true,
                "MinPasswordLength": 8,
                "Accounts": {"@odata.id": "/redfish/v1/AccountService/Accounts"},
                "Roles": {"@odata.id": "/redfish/v1/AccountService/Roles"},
            });
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Roles")
        .privileges(login())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                let mut roles: Vec<&str> = st.roles.roles().collect();
                roles.sort_unstable();
                let members: Vec<Value> = roles
                    .into_iter()
                    .map(|r| json!({"@odata.id": format!("/redfish/v1/AccountService/Roles/{r}")}))
                    .collect();
                resp.res().json_value = json!({
                    "@odata.id": "/redfish/v1/AccountService/Roles",
                    "@odata.type": "#RoleCollection.RoleCollection",
                    "Name": "Roles Collection",
                    "Members@odata.count": members.len(),
                    "Members": members,
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Roles/<str>")
        .privileges(login())
        .get(move |_req, resp, (role,): (String,)| {
            let st = st.clone();
            async move {
                if !st.roles.roles().any(|r| r == role) {
                    error_messages::resource_not_found(&mut resp.res(), "Role", &role);
                    return;
                }
                let assigned: Vec<&str> = st
                    .roles
                    .privileges_for(&role)
                    .iter()
                    .map(Privilege::as_str)
                    .collect();
                resp.res().json_value = json!({
                    "@odata.id": format!("/redfish/v1/AccountService/Roles/{role}"),
                    "@odata.type": "#Role.v1_2_2.Role",
                    "Id": role,
                    "Name": format!("{role} User Role"),
                    "RoleId": role,
                    "IsPredefined": true,
                    "AssignedPrivileges": assigned,
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Accounts")
        .privileges(login())
        .get(move |req, resp, (): ()| {
            let st = st.clone();
            async move {
                // Users without ConfigureUsers only see their own account.
                let sees_all = st
                    .privileges_of(&req.user_role)
                    .contains(Privilege::ConfigureUsers);
                let members: Vec<Value> = st
                    .accounts
                    .usernames()
                    .into_iter()
                    .filter(|name| sees_all || req.username() == Some(name.as_str()))
                    .map(|name| {
                        json!({"@odata.id": format!("/redfish/v1/AccountService/Accounts/{name}")})
                    })
                    .collect();
                resp.res().json_value = json!({
                    "@odata.id": "/redfish/v1/AccountService/Accounts",
                    "@odata.type": "#ManagerAccountCollection.ManagerAccountCollection",
                    "Name": "Accounts Collection",
                    "Description": "BMC User Accounts",
                    "Members@odata.count": members.len(),
                    "Members": members,
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Accounts")
        .privileges(configure_users())
        .post(move |req, resp, (): ()| {
            let st = st.clone();
            async move {
                let Some(body) = parse_body(&req, &resp) else {
                    return;
                };
                let Some(username) = body.get("UserName").and_then(Value::as_str) else {
                    error_messages::create_failed_missing_req_properties(
                        &mut resp.res(),
                        "UserName",
                    );
                    return;
                };
                let Some(password) = body.get("Password").and_then(Value::as_str) else {
                    error_messages::create_failed_missing_req_properties(
                        &mut resp.res(),
                        "Password",
                    );
                    return;
                };
                let role = body
                    .get("RoleId")
                    .and_then(Value::as_str)
                    .unwrap_or("ReadOnly");
                if !st.roles.roles().any(|r| r == role) {
                    error_messages::property_value_not_in_list(&mut resp.res(), role, "RoleId");
                    return;
                }
                match st.accounts.add(username, password, role) {
                    Ok(()) => {
                        info!(username, role, "account created");
                        let account = AccountView {
                            username: username.to_string(),
                            role: role.to_string(),
                            enabled: true,
                        };
                        let mut res = resp.res();
                        res.set_status(StatusCode::CREATED);
                        res.set_header(
                            LOCATION,
                            &format!("/redfish/v1/AccountService/Accounts/{username}"),
                        );
                        res.json_value = account_json(&account);
                    }
                    Err(AccountError::AlreadyExists) => {
                        error_messages::resource_already_exists(
                            &mut resp.res(),
                            "ManagerAccount",
                            "UserName",
                            username,
                        );
                    }
                    Err(_) => error_messages::internal_error(&mut resp.res()),
                }
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Accounts/<str>")
        .privileges(configure_users_or_self())
        .get(move |_req, resp, (username,): (String,)| {
            let st = st.clone();
            async move {
                match st.accounts.get(&username) {
                    Some(account) => resp.res().json_value = account_json(&account),
                    None => error_messages::resource_not_found(
                        &mut resp.res(),
                        "ManagerAccount",
                        &username,
                    ),
                }
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Accounts/<str>")
        .privileges(configure_users_or_self())
        .patch(move |req, resp, (username,): (String,)| {
            let st = st.clone();
            async move {
                let Some(body) = parse_body(&req, &resp) else {
                    return;
                };
                if st.accounts.get(&username).is_none() {
                    error_messages::resource_not_found(
                        &mut resp.res(),
                        "ManagerAccount",
                        &username,
                    );
                    return;
                }
                let is_user_admin = st
                    .privileges_of(&req.user_role)
                    .contains(Privilege::ConfigureUsers);
                let mut touched = false;
                if let Some(password) = body.get("Password").and_then(Value::as_str) {
                    if st.accounts.set_password(&username, password).is_err() {
                        error_messages::internal_error(&mut resp.res());
                        return;
                    }
                    touched = true;
                }
                if let Some(role) = body.get("RoleId").and_then(Value::as_str) {
                    // Role changes stay an administrative operation even on
                    // one's own account.
                    if !is_user_admin {
                        error_messages::insufficient_privilege(&mut resp.res());
                        return;
                    }
                    if !st.roles.roles().any(|r| r == role) {
                        error_messages::property_value_not_in_list(
                            &mut resp.res(),
                            role,
                            "RoleId",
                        );
                        return;
                    }
                    if st.accounts.set_role(&username, role).is_err() {
                        error_messages::internal_error(&mut resp.res());
                        return;
                    }
                    touched = true;
                }
                if !touched {
                    error_messages::no_operation(&mut resp.res());
                    return;
                }
                info!(username, "account modified");
                error_messages::account_modified(&mut resp.res());
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Accounts/<str>")
        .privileges(configure_users())
        .delete(move |_req, resp, (username,): (String,)| {
            let st = st.clone();
            async move {
                match st.accounts.remove(&username) {
                    Ok(()) => {
                        info!(username, "account removed");
                        error_messages::account_removed(&mut resp.res());
                    }
                    Err(_) => error_messages::resource_not_found(
                        &mut resp.res(),
                        "ManagerAccount",
                        &username,
                    ),
                }
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/AccountService/Accounts/<str>/Actions/ManagerAccount.GenerateSecretKey")
        .privileges(configure_users_or_self())
        .post(move |_req, resp, (username,): (String,)| {
            let st = st.clone();
            async move {
                match st.accounts.generate_secret_key(&username) {
                    Ok(key) => {
                        resp.res().json_value["SecretKey"] = json!(key);
                    }
                    Err(AccountError::NotFound) => error_messages::resource_not_found(
                        &mut resp.res(),
                        "ManagerAccount",
                        &username,
                    ),
                    Err(_) => error_messages::internal_error(&mut resp.res()),
                }
            }
        });
}
