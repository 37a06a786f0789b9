//! End-to-end scenarios through the in-process client.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use serde_json::{json, Value};

use redfishd::{build_app, AppState};
use redfishd_core::ServiceConfig;
use redfishd_tasks::BusSignal;
use redfishd_test::TestApp;

fn test_service() -> (TestApp, Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ServiceConfig::default();
    config.persistent_dir = dir.path().to_path_buf();
    let (app, state) = build_app(config);
    state
        .accounts
        .add("alice", "alice-password", "ReadOnly")
        .unwrap();
    state.accounts.add("bob", "bob-password", "ReadOnly").unwrap();
    state
        .accounts
        .add("admin", "admin-password", "Administrator")
        .unwrap();
    (TestApp::from_app(app), state, dir)
}

fn token(state: &AppState, user: &str, role: &str) -> String {
    state.sessions.create(user, role, None, None).id.clone()
}

async fn wait_terminal(state: &AppState, index: u64) {
    for _ in 0..200 {
        if let Some(task) = state.tasks.get(index) {
            if task.is_terminal() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {index} never reached a terminal state");
}

#[tokio::test]
async fn unauthenticated_service_root() {
    let (client, _state, _dir) = test_service();
    let response = client.get("/redfish/v1/").await.assert_ok();
    let doc: Value = response.json();
    assert_eq!(doc["@odata.type"], "#ServiceRoot.v1_11_0.ServiceRoot");
    assert_eq!(doc["Id"], "RootService");
    assert_eq!(
        doc["Links"]["Sessions"]["@odata.id"],
        "/redfish/v1/SessionService/Sessions"
    );
}

#[tokio::test]
async fn version_document_is_open() {
    let (client, _state, _dir) = test_service();
    let response = client.get("/redfish").await.assert_ok();
    assert_eq!(response.json::<Value>()["v1"], "/redfish/v1/");
}

#[tokio::test]
async fn reading_another_account_is_forbidden() {
    let (client, state, _dir) = test_service();
    let bob = token(&state, "bob", "ReadOnly");
    let response = client
        .get_authenticated("/redfish/v1/AccountService/Accounts/alice", &bob)
        .await
        .assert_forbidden();
    assert_eq!(response.error_code(), "Base.1.13.InsufficientPrivilege");
}

#[tokio::test]
async fn reading_own_account_is_admitted() {
    let (client, state, _dir) = test_service();
    let alice = token(&state, "alice", "ReadOnly");
    let response = client
        .get_authenticated("/redfish/v1/AccountService/Accounts/alice", &alice)
        .await
        .assert_ok();
    let doc: Value = response.json();
    assert_eq!(doc["UserName"], "alice");
    assert_eq!(doc["RoleId"], "ReadOnly");
}

#[tokio::test]
async fn generate_secret_key_for_self_without_configure_users() {
    let (client, state, _dir) = test_service();
    let alice = token(&state, "alice", "ReadOnly");
    let response = client
        .post_json_authenticated(
            "/redfish/v1/AccountService/Accounts/alice/Actions/ManagerAccount.GenerateSecretKey",
            &json!({}),
            &alice,
        )
        .await
        .assert_ok();
    let doc: Value = response.json();
    let key = doc["SecretKey"].as_str().expect("SecretKey populated");
    assert_eq!(key.len(), 32);

    // The same action against somebody else's account stays forbidden.
    client
        .post_json_authenticated(
            "/redfish/v1/AccountService/Accounts/bob/Actions/ManagerAccount.GenerateSecretKey",
            &json!({}),
            &alice,
        )
        .await
        .assert_forbidden();
}

#[tokio::test]
async fn method_not_allowed_lists_the_verbs() {
    let (client, state, _dir) = test_service();
    let admin = token(&state, "admin", "Administrator");
    let response = client
        .patch_json_authenticated("/redfish/v1/SessionService/Sessions", &json!({}), &admin)
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), "GET, POST");
}

#[tokio::test]
async fn login_issues_a_token_once() {
    let (client, _state, _dir) = test_service();
    let response = client
        .post_json(
            "/redfish/v1/SessionService/Sessions",
            &json!({"UserName": "alice", "Password": "alice-password"}),
        )
        .await
        .assert_status(StatusCode::CREATED);
    let session_token = response.header("x-auth-token").to_string();
    let location = response.header("location").to_string();
    assert!(location.starts_with("/redfish/v1/SessionService/Sessions/"));
    let doc: Value = response.json();
    assert_eq!(doc["UserName"], "alice");

    // The token works.
    client
        .get_authenticated("/redfish/v1/SessionService", &session_token)
        .await
        .assert_ok();

    // Bad credentials do not.
    let response = client
        .post_json(
            "/redfish/v1/SessionService/Sessions",
            &json!({"UserName": "alice", "Password": "wrong"}),
        )
        .await
        .assert_unauthorized();
    assert_eq!(response.error_code(), "Base.1.13.NoValidSession");
}

#[tokio::test]
async fn logout_terminates_the_session() {
    let (client, state, _dir) = test_service();
    let alice = token(&state, "alice", "ReadOnly");
    client
        .delete_authenticated(
            &format!("/redfish/v1/SessionService/Sessions/{alice}"),
            &alice,
        )
        .await
        .assert_ok();
    client
        .get_authenticated("/redfish/v1/SessionService", &alice)
        .await
        .assert_unauthorized();
}

#[tokio::test]
async fn deleting_someone_elses_session_requires_configure_manager() {
    let (client, state, _dir) = test_service();
    let alice = token(&state, "alice", "ReadOnly");
    let bob = token(&state, "bob", "ReadOnly");
    client
        .delete_authenticated(
            &format!("/redfish/v1/SessionService/Sessions/{alice}"),
            &bob,
        )
        .await
        .assert_forbidden();

    let admin = token(&state, "admin", "Administrator");
    client
        .delete_authenticated(
            &format!("/redfish/v1/SessionService/Sessions/{alice}"),
            &admin,
        )
        .await
        .assert_ok();
}

#[tokio::test]
async fn simple_update_spawns_a_task_and_completes_on_signal() {
    let (client, state, _dir) = test_service();
    let admin = token(&state, "admin", "Administrator");

    let response = client
        .post_json_authenticated(
            "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate",
            &json!({"ImageURI": "https://images.example.com/bmc.fw"}),
            &admin,
        )
        .await
        .assert_accepted();
    assert_eq!(
        response.header("location"),
        "/redfish/v1/TaskService/TaskMonitors/0"
    );
    assert!(response.headers.contains_key("retry-after"));
    let doc: Value = response.json();
    assert_eq!(doc["TaskState"], "Running");
    assert_eq!(doc["@odata.type"], "#Task.v1_4_3.Task");

    state.broker.emit(BusSignal {
        path: "/xyz/openbmc_project/software/bmc".to_string(),
        interface: "xyz.openbmc_project.Software.Activation".to_string(),
        member: "PropertiesChanged".to_string(),
        body: json!({"Activation": "xyz.openbmc_project.Software.Activation.Activations.Active"}),
    });
    wait_terminal(&state, 0).await;

    let response = client
        .get_authenticated("/redfish/v1/TaskService/Tasks/0", &admin)
        .await
        .assert_ok();
    let doc: Value = response.json();
    assert_eq!(doc["TaskState"], "Completed");
    assert_eq!(doc["TaskStatus"], "OK");
    assert_eq!(doc["PercentComplete"], 100);
    assert_eq!(doc["HidePayload"], false);
    assert_eq!(
        doc["Payload"]["TargetUri"],
        "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate"
    );
}

#[tokio::test]
async fn task_monitor_drains_to_404() {
    let (client, state, _dir) = test_service();
    let admin = token(&state, "admin", "Administrator");
    client
        .post_json_authenticated(
            "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate",
            &json!({"ImageURI": "https://images.example.com/bmc.fw"}),
            &admin,
        )
        .await
        .assert_accepted();

    // Still running: the monitor answers 202.
    client
        .get_authenticated("/redfish/v1/TaskService/TaskMonitors/0", &admin)
        .await
        .assert_accepted();

    state.broker.emit(BusSignal {
        path: "/xyz/openbmc_project/software/bmc".to_string(),
        interface: "xyz.openbmc_project.Software.Activation".to_string(),
        member: "PropertiesChanged".to_string(),
        body: json!({"Activation": "xyz.openbmc_project.Software.Activation.Activations.Active"}),
    });
    wait_terminal(&state, 0).await;

    client
        .get_authenticated("/redfish/v1/TaskService/TaskMonitors/0", &admin)
        .await
        .assert_no_content();
    client
        .get_authenticated("/redfish/v1/TaskService/TaskMonitors/0", &admin)
        .await
        .assert_not_found();
}

#[tokio::test]
async fn missing_action_parameter_is_a_structured_error() {
    let (client, state, _dir) = test_service();
    let admin = token(&state, "admin", "Administrator");
    let response = client
        .post_json_authenticated(
            "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate",
            &json!({}),
            &admin,
        )
        .await
        .assert_bad_request();
    assert_eq!(response.error_code(), "Base.1.13.ActionParameterMissing");
}

#[tokio::test]
async fn crashdump_on_demand_completes_on_any_property_change() {
    let (client, state, _dir) = test_service();
    let admin = token(&state, "admin", "Administrator");
    client
        .post_json_authenticated(
            "/redfish/v1/Systems/system/LogServices/Crashdump/Actions/LogService.CollectDiagnosticData",
            &json!({"DiagnosticDataType": "OEM", "OEMDiagnosticDataType": "OnDemand"}),
            &admin,
        )
        .await
        .assert_accepted();

    state.broker.emit(BusSignal {
        path: "/com/intel/crashdump".to_string(),
        interface: "com.intel.crashdump".to_string(),
        member: "PropertiesChanged".to_string(),
        body: json!({}),
    });
    wait_terminal(&state, 0).await;

    let task = state.tasks.get(0).unwrap();
    assert_eq!(task.state().as_str(), "Completed");
    assert_eq!(task.status().as_str(), "OK");
}

#[tokio::test]
async fn base_registry_document_carries_internal_error() {
    let (client, state, _dir) = test_service();
    let alice = token(&state, "alice", "ReadOnly");
    let response = client
        .get_authenticated("/redfish/v1/Registries/Base/Base", &alice)
        .await
        .assert_ok();
    let doc: Value = response.json();
    assert_eq!(doc["RegistryPrefix"], "Base");
    let internal_error = &doc["Messages"]["InternalError"];
    assert_eq!(internal_error["NumberOfArgs"], 0);
    assert!(internal_error["Message"]
        .as_str()
        .unwrap()
        .contains("internal service error"));

    client
        .get_authenticated("/redfish/v1/Registries/Base/Wrong", &alice)
        .await
        .assert_not_found();
}

#[tokio::test]
async fn subscriptions_round_trip() {
    let (client, state, _dir) = test_service();
    let admin = token(&state, "admin", "Administrator");

    let response = client
        .post_json_authenticated(
            "/redfish/v1/EventService/Subscriptions",
            &json!({
                "Destination": "https://collector.example.com/events",
                "Protocol": "Redfish",
                "Context": "collector-1",
                "RegistryPrefixes": ["TaskEvent"],
            }),
            &admin,
        )
        .await
        .assert_status(StatusCode::CREATED);
    let id = response.json::<Value>()["Id"].as_str().unwrap().to_string();

    let response = client
        .get_authenticated(
            &format!("/redfish/v1/EventService/Subscriptions/{id}"),
            &admin,
        )
        .await
        .assert_ok();
    let doc: Value = response.json();
    assert_eq!(doc["Destination"], "https://collector.example.com/events");
    assert_eq!(doc["Context"], "collector-1");
    assert_eq!(doc["RegistryPrefixes"][0], "TaskEvent");

    // A duplicate destination conflicts.
    client
        .post_json_authenticated(
            "/redfish/v1/EventService/Subscriptions",
            &json!({"Destination": "https://collector.example.com/events"}),
            &admin,
        )
        .await
        .assert_status(StatusCode::CONFLICT);

    client
        .delete_authenticated(
            &format!("/redfish/v1/EventService/Subscriptions/{id}"),
            &admin,
        )
        .await
        .assert_ok();
    client
        .get_authenticated(
            &format!("/redfish/v1/EventService/Subscriptions/{id}"),
            &admin,
        )
        .await
        .assert_not_found();
}

#[tokio::test]
async fn config_files_enforce_save_area_limits() {
    let (client, state, _dir) = test_service();
    let admin = token(&state, "admin", "Administrator");

    // Only octet-stream uploads are acceptable.
    let response = client
        .put_authenticated_with(
            "/ibm/v1/Host/ConfigFiles/somefile",
            Bytes::from(vec![b'x'; 512]),
            "application/json",
            &admin,
        )
        .await
        .assert_status(StatusCode::NOT_ACCEPTABLE);
    assert!(response.text().contains("Content Not Acceptable"));

    let tiny = Bytes::from_static(b"too small");
    let response = client
        .put_octet_authenticated("/ibm/v1/Host/ConfigFiles/somefile", tiny, &admin)
        .await
        .assert_bad_request();
    assert!(response.text().contains("minimum allowed size"));

    let payload = Bytes::from(vec![b'x'; 4096]);
    client
        .put_octet_authenticated("/ibm/v1/Host/ConfigFiles/somefile", payload.clone(), &admin)
        .await
        .assert_ok();

    let response = client
        .get_authenticated("/ibm/v1/Host/ConfigFiles/somefile", &admin)
        .await
        .assert_ok();
    assert_eq!(response.body, payload);

    // Names outside [A-Za-z0-9-] with at most 20 chars are rejected.
    let response = client
        .put_octet_authenticated(
            "/ibm/v1/Host/ConfigFiles/bad_name!",
            Bytes::from(vec![b'x'; 512]),
            &admin,
        )
        .await
        .assert_bad_request();
    assert!(response.text().contains("Invalid file name"));
    client
        .put_octet_authenticated(
            "/ibm/v1/Host/ConfigFiles/this-name-is-way-too-long-for-the-store",
            Bytes::from(vec![b'x'; 512]),
            &admin,
        )
        .await
        .assert_bad_request();

    client
        .delete_authenticated("/ibm/v1/Host/ConfigFiles/somefile", &admin)
        .await
        .assert_ok();
    client
        .get_authenticated("/ibm/v1/Host/ConfigFiles/somefile", &admin)
        .await
        .assert_not_found();
}

#[tokio::test]
async fn anonymous_requests_to_protected_routes_get_401() {
    let (client, _state, _dir) = test_service();
    let response = client.get("/redfish/v1/TaskService").await.assert_unauthorized();
    assert_eq!(response.error_code(), "Base.1.13.NoValidSession");
}

#[tokio::test]
async fn unknown_resources_get_the_error_envelope() {
    let (client, state, _dir) = test_service();
    let alice = token(&state, "alice", "ReadOnly");
    let response = client
        .get_authenticated("/redfish/v1/DoesNotExist", &alice)
        .await
        .assert_not_found();
    assert_eq!(response.error_code(), "Base.1.13.ResourceNotFound");
}
