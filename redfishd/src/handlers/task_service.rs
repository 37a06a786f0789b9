//! Task service: the collection, member, and monitor views.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};

use redfishd_core::error_messages;
use redfishd_core::App;
use redfishd_tasks::Task;

use super::login;
use crate::AppState;

fn task_json(task: &Arc<Task>) -> Value {
    let id = task.index.to_string();
    let mut doc = json!({
        "@odata.type": "#Task.v1_4_3.Task",
        "Id": id,
        "Name": format!("Task {id}"),
        "TaskState": task.state().as_str(),
        "StartTime": task.start_time().to_rfc3339(),
    });
    if let Some(end_time) = task.end_time() {
        doc["EndTime"] = json!(end_time.to_rfc3339());
    }
    doc["TaskStatus"] = json!(task.status().as_str());
    doc["Messages"] = Value::Array(task.task_messages());
    doc["@odata.id"] = json!(task.uri());
    if !task.gave204() {
        doc["TaskMonitor"] = json!(task.monitor_uri());
    }
    let payload = task.payload();
    doc["HidePayload"] = json!(payload.is_none());
    if let Some(payload) = payload {
        doc["Payload"] = json!({
            "TargetUri": payload.target_uri,
            "HttpOperation": payload.http_operation,
            "HttpHeaders": payload.http_headers,
            "JsonBody": payload.json_body.to_string(),
        });
    }
    doc["PercentComplete"] = json!(task.percent_complete());
    doc
}

pub fn register(app: &mut App, state: &Arc<AppState>) {
    app.route("/redfish/v1/TaskService")
        .privileges(login())
        .get(|_req, resp, (): ()| async move {
            resp.res().json_value = json!({
                "@odata.type": "#TaskService.v1_1_4.TaskService",
                "@odata.id": "/redfish/v1/TaskService",
                "Name": "Task Service",
                "Id": "TaskService",
                "DateTime": Utc::now().to_rfc3339(),
                "CompletedTaskOverWritePolicy": "Oldest",
                "LifeCycleEventOnTaskStateChange": true,
                "Status": {"State": "Enabled"},
                "ServiceEnabled": true,
                "Tasks": {"@odata.id": "/redfish/v1/TaskService/Tasks"},
            });
        });

    let st = state.clone();
    app.route("/redfish/v1/TaskService/Tasks")
        .privileges(login())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                let members: Vec<Value> = st
                    .tasks
                    .snapshot()
                    .iter()
                    .map(|task| json!({"@odata.id": task.uri()}))
                    .collect();
                resp.res().json_value = json!({
                    "@odata.type": "#TaskCollection.TaskCollection",
                    "@odata.id": "/redfish/v1/TaskService/Tasks",
                    "Name": "Task Collection",
                    "Members@odata.count": members.len(),
                    "Members": members,
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/TaskService/Tasks/<str>")
        .privileges(login())
        .get(move |_req, resp, (id,): (String,)| {
            let st = st.clone();
            async move {
                // Compare against the string form so a non-numeric id is
                // just an unknown task.
                let found = st
                    .tasks
                    .snapshot()
                    .iter()
                    .find(|task| task.index.to_string() == id)
                    .cloned();
                match found {
                    Some(task) => resp.res().json_value = task_json(&task),
                    None => error_messages::resource_not_found(&mut resp.res(), "Task", &id),
                }
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/TaskService/TaskMonitors/<str>")
        .privileges(login())
        .get(move |_req, resp, (id,): (String,)| {
            let st = st.clone();
            async move {
                let found = st
                    .tasks
                    .snapshot()
                    .iter()
                    .find(|task| task.index.to_string() == id)
                    .cloned();
                let Some(task) = found else {
                    error_messages::resource_not_found(&mut resp.res(), "Task", &id);
                    return;
                };
                // A drained monitor is gone.
                if task.gave204() {
                    error_messages::resource_not_found(&mut resp.res(), "Task", &id);
                    return;
                }
                task.populate_response(&mut resp.res(), st.config.task_retry_after_secs);
            }
        });
}
