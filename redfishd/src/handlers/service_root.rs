//! The service root and the version document.

use std::sync::Arc;

use serde_json::json;

use redfishd_core::App;

use super::open;
use crate::AppState;

pub fn register(app: &mut App, state: &Arc<AppState>) {
    app.route("/redfish")
        .privileges(open())
        .get(|_req, resp, (): ()| async move {
            resp.res().json_value = json!({ "v1": "/redfish/v1/" });
        });

    let st = state.clone();
    app.route("/redfish/v1")
        .privileges(open())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                resp.res().json_value = json!({
                    "@odata.id": "/redfish/v1",
                    "@odata.type": "#ServiceRoot.v1_11_0.ServiceRoot",
                    "Id": "RootService",
                    "Name": "Root Service",
                    "RedfishVersion": "1.17.0",
                    "UUID": st.service_uuid,
                    "AccountService": {"@odata.id": "/redfish/v1/AccountService"},
                    "SessionService": {"@odata.id": "/redfish/v1/SessionService"},
                    "TaskService": {"@odata.id": "/redfish/v1/TaskService"},
                    "EventService": {"@odata.id": "/redfish/v1/EventService"},
                    "UpdateService": {"@odata.id": "/redfish/v1/UpdateService"},
                    "Registries": {"@odata.id": "/redfish/v1/Registries"},
                    "Links": {
                        "Sessions": {"@odata.id": "/redfish/v1/SessionService/Sessions"}
                    },
                });
            }
        });
}
