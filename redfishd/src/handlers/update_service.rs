//! Update service and the `SimpleUpdate` action.
//!
//! The action spawns a task matched on software-activation property
//! changes; the actual image transfer and activation are the update
//! daemon's business, observed through the signal broker.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use redfishd_core::error_messages;
use redfishd_core::parsing::JsonParseError;
use redfishd_core::App;
use redfishd_tasks::{
    messages as task_messages, BusSignal, Disposition, MatchRule, Payload, Task, TaskCallback,
    TaskState, TaskStatus, TimedOut,
};

use super::{configure_components, login};
use crate::AppState;

const SIMPLE_UPDATE_ACTION: &str = "UpdateService.SimpleUpdate";
const ACTIVATION_INTERFACE: &str = "xyz.openbmc_project.Software.Activation";

const TRANSFER_PROTOCOLS: [&str; 3] = ["HTTP", "HTTPS", "TFTP"];

fn activation_callback() -> TaskCallback {
    Box::new(
        |result: Result<&BusSignal, TimedOut>, task: &Arc<Task>| match result {
            Ok(signal) => {
                let id = task.index.to_string();
                let activation = signal
                    .body
                    .get("Activation")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if activation.ends_with("Active") {
                    task.set_state(TaskState::Completed);
                    task.set_percent_complete(100);
                    task.add_message(task_messages::task_completed_ok(&id));
                    Disposition::Completed
                } else if activation.ends_with("Failed") {
                    task.set_state(TaskState::Exception);
                    task.set_status(TaskStatus::Critical);
                    task.add_message(task_messages::task_completed_warning(&id));
                    Disposition::Completed
                } else {
                    // Still activating; keep listening.
                    Disposition::Continue
                }
            }
            Err(TimedOut) => Disposition::Continue,
        },
    )
}

pub fn register(app: &mut App, state: &Arc<AppState>) {
    app.route("/redfish/v1/UpdateService")
        .privileges(login())
        .get(|_req, resp, (): ()| async move {
            resp.res().json_value = json!({
                "@odata.id": "/redfish/v1/UpdateService",
                "@odata.type": "#UpdateService.v1_5_0.UpdateService",
                "Id": "UpdateService",
                "Name": "Update Service",
                "Description": "Service for Software Update",
                "ServiceEnabled": true,
                "Status": {"State": "Enabled", "Health": "OK"},
                "Actions": {
                    "#UpdateService.SimpleUpdate": {
                        "target": "/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate",
                        "TransferProtocol@Redfish.AllowableValues": TRANSFER_PROTOCOLS,
                    }
                },
            });
        });

    let st = state.clone();
    app.route("/redfish/v1/UpdateService/Actions/UpdateService.SimpleUpdate")
        .privileges(configure_components())
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
                let Some(image_uri) = body.get("ImageURI").and_then(Value::as_str) else {
                    error_messages::action_parameter_missing(
                        &mut resp.res(),
                        SIMPLE_UPDATE_ACTION,
                        "ImageURI",
                    );
                    return;
                };
                if let Some(protocol) = body.get("TransferProtocol").and_then(Value::as_str) {
                    if !TRANSFER_PROTOCOLS.contains(&protocol) {
                        error_messages::action_parameter_value_format_error(
                            &mut resp.res(),
                            protocol,
                            "TransferProtocol",
                            SIMPLE_UPDATE_ACTION,
                        );
                        return;
                    }
                }
                if image_uri.is_empty() {
                    error_messages::action_parameter_value_format_error(
                        &mut resp.res(),
                        image_uri,
                        "ImageURI",
                        SIMPLE_UPDATE_ACTION,
                    );
                    return;
                }

                info!(image_uri, "starting software update task");
                let task = st.tasks.create_task(
                    activation_callback(),
                    MatchRule::properties_changed(ACTIVATION_INTERFACE),
                );
                task.set_payload(Payload::from_request(&req));
                st.tasks.start(&task);
                task.populate_response(&mut resp.res(), st.tasks.retry_after());
            }
        });
}
