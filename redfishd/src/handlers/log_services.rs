//! Log services and the on-demand crashdump collection action.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use redfishd_core::error_messages;
use redfishd_core::parsing::JsonParseError;
use redfishd_core::App;
use redfishd_tasks::{
    messages as task_messages, BusSignal, Disposition, MatchRule, Payload, Task, TaskCallback,
    TaskState, TimedOut,
};

use super::{configure_components, login};
use crate::AppState;

const COLLECT_ACTION: &str = "LogService.CollectDiagnosticData";
const CRASHDUMP_INTERFACE: &str = "com.intel.crashdump";

fn crashdump_callback() -> TaskCallback {
    // Any property change on the crashdump interface means the dump
    // finished; the payload carries nothing further worth inspecting.
    Box::new(
        |result: Result<&BusSignal, TimedOut>, task: &Arc<Task>| match result {
            Ok(_) => {
                task.set_state(TaskState::Completed);
                task.set_percent_complete(100);
                task.add_message(task_messages::task_completed_ok(&task.index.to_string()));
                Disposition::Completed
            }
            Err(TimedOut) => Disposition::Continue,
        },
    )
}

pub fn register(app: &mut App, state: &Arc<AppState>) {
    app.route("/redfish/v1/Systems/system/LogServices")
        .privileges(login())
        .get(|_req, resp, (): ()| async move {
            resp.res().json_value = json!({
                "@odata.type": "#LogServiceCollection.LogServiceCollection",
                "@odata.id": "/redfish/v1/Systems/system/LogServices",
                "Name": "System Log Services Collection",
                "Members@odata.count": 1,
                "Members": [
                    {"@odata.id": "/redfish/v1/Systems/system/LogServices/Crashdump"}
                ],
            });
        });

    app.route("/redfish/v1/Systems/system/LogServices/Crashdump")
        .privileges(login())
        .get(|_req, resp, (): ()| async move {
            resp.res().json_value = json!({
                "@odata.id": "/redfish/v1/Systems/system/LogServices/Crashdump",
                "@odata.type": "#LogService.v1_2_0.LogService",
                "Id": "Crashdump",
                "Name": "Open BMC Crashdump Service",
                "ServiceEnabled": true,
                "MaxNumberOfRecords": 3,
                "OverWritePolicy": "WrapsWhenFull",
                "Actions": {
                    "#LogService.CollectDiagnosticData": {
                        "target": "/redfish/v1/Systems/system/LogServices/Crashdump/Actions/LogService.CollectDiagnosticData"
                    }
                },
            });
        });

    let st = state.clone();
    app.route(
        "/redfish/v1/Systems/system/LogServices/Crashdump/Actions/LogService.CollectDiagnosticData",
    )
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
            let Some(data_type) = body.get("DiagnosticDataType").and_then(Value::as_str) else {
                error_messages::action_parameter_missing(
                    &mut resp.res(),
                    COLLECT_ACTION,
                    "DiagnosticDataType",
                );
                return;
            };
            if data_type != "OEM" {
                error_messages::action_parameter_value_format_error(
                    &mut resp.res(),
                    data_type,
                    "DiagnosticDataType",
                    COLLECT_ACTION,
                );
                return;
            }
            let oem_type = body
                .get("OEMDiagnosticDataType")
                .and_then(Value::as_str)
                .unwrap_or("");
            if oem_type != "OnDemand" {
                error_messages::action_parameter_value_format_error(
                    &mut resp.res(),
                    oem_type,
                    "OEMDiagnosticDataType",
                    COLLECT_ACTION,
                );
                return;
            }

            info!("starting on-demand crashdump task");
            let task = st.tasks.create_task(
                crashdump_callback(),
                MatchRule::properties_changed(CRASHDUMP_INTERFACE),
            );
            task.set_payload(Payload::from_request(&req));
            st.tasks.start(&task);
            task.populate_response(&mut resp.res(), st.tasks.retry_after());
        }
    });
}
