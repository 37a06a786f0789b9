//! Host config file store (management-console surface).
//!
//! These endpoints predate the Redfish error envelope and answer with the
//! management console's plain `Description` documents. Files live under the
//! persistent directory; the store enforces the save-area limits.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, warn};

use redfishd_core::{App, Tail};

use super::configure_manager;
use crate::AppState;

// Save-area limits.
const MAX_SAVEAREA_DIR_SIZE: u64 = 25_000_000;
const MIN_SAVEAREA_FILE_SIZE: usize = 100;
const MAX_SAVEAREA_FILE_SIZE: usize = 500_000;
const MAX_FILENAME_LEN: usize = 20;

const RESOURCE_NOT_FOUND_MSG: &str = "Resource Not Found";
const CONTENT_NOT_ACCEPTABLE_MSG: &str = "Content Not Acceptable";
const INTERNAL_SERVER_ERROR_MSG: &str = "Internal Server Error";

fn description(text: &str) -> Value {
    json!({ "Description": text })
}

fn config_files_dir(state: &AppState) -> PathBuf {
    state.config.persistent_dir.join("configfiles")
}

/// Allowed file names: 1..=20 chars from `[A-Za-z0-9-]`.
fn is_valid_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_FILENAME_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

async fn dir_size(dir: &PathBuf) -> std::io::Result<u64> {
    let mut total = 0;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let metadata = entry.metadata().await?;
        if metadata.is_file() {
            total += metadata.len();
        }
    }
    Ok(total)
}

async fn file_put(
    state: &AppState,
    content_type: &str,
    data: &Bytes,
    file_id: &str,
) -> (StatusCode, Value) {
    if !content_type.eq_ignore_ascii_case("application/octet-stream") {
        return (
            StatusCode::NOT_ACCEPTABLE,
            description(CONTENT_NOT_ACCEPTABLE_MSG),
        );
    }
    if !is_valid_file_name(file_id) {
        return (StatusCode::BAD_REQUEST, description("Invalid file name"));
    }
    if data.len() < MIN_SAVEAREA_FILE_SIZE {
        return (
            StatusCode::BAD_REQUEST,
            description("File size is less than minimum allowed size[100B]"),
        );
    }
    if data.len() > MAX_SAVEAREA_FILE_SIZE {
        return (
            StatusCode::BAD_REQUEST,
            description("File size exceeds maximum allowed size[500KB]"),
        );
    }

    let dir = config_files_dir(state);
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        warn!(error = %e, "failed to create the save-area directory");
        return (StatusCode::NOT_FOUND, description(RESOURCE_NOT_FOUND_MSG));
    }

    let path = dir.join(file_id);
    let current_size = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata.len(),
        Err(_) => 0,
    };
    let occupied = match dir_size(&dir).await {
        Ok(size) => size,
        Err(e) => {
            warn!(error = %e, "failed to measure the save-area directory");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                description(INTERNAL_SERVER_ERROR_MSG),
            );
        }
    };
    // Only growth counts against the directory limit.
    let growth = (data.len() as u64).saturating_sub(current_size);
    if occupied + growth > MAX_SAVEAREA_DIR_SIZE {
        return (
            StatusCode::BAD_REQUEST,
            description("File size does not fit in the savearea directory maximum allowed size[25MB]"),
        );
    }

    let existed = current_size > 0 || tokio::fs::metadata(&path).await.is_ok();
    if let Err(e) = tokio::fs::write(&path, data).await {
        warn!(path = %path.display(), error = %e, "failed to write config file");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            description(INTERNAL_SERVER_ERROR_MSG),
        );
    }
    debug!(path = %path.display(), "config file written");
    let text = if existed { "File Updated" } else { "File Created" };
    (StatusCode::OK, description(text))
}

pub fn register(app: &mut App, state: &Arc<AppState>) {
    app.route("/ibm/v1")
        .privileges(configure_manager())
        .get(|_req, resp, (): ()| async move {
            resp.res().json_value = json!({
                "@odata.id": "/ibm/v1",
                "Id": "IBM Rest RootService",
                "Name": "IBM Service Root",
                "ConfigFiles": {"@odata.id": "/ibm/v1/Host/ConfigFiles"},
            });
        });

    let st = state.clone();
    app.route("/ibm/v1/Host/ConfigFiles")
        .privileges(configure_manager())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                let mut members = Vec::new();
                if let Ok(mut entries) = tokio::fs::read_dir(config_files_dir(&st)).await {
                    while let Ok(Some(entry)) = entries.next_entry().await {
                        let name = entry.file_name().to_string_lossy().into_owned();
                        members.push(json!({
                            "@odata.id": format!("/ibm/v1/Host/ConfigFiles/{name}")
                        }));
                    }
                }
                members.push(json!({
                    "@odata.id": "/ibm/v1/Host/ConfigFiles/Actions/IBMConfigFiles.DeleteAll"
                }));
                resp.res().json_value = json!({
                    "@odata.id": "/ibm/v1/Host/ConfigFiles",
                    "Id": "ConfigFiles",
                    "Name": "ConfigFiles",
                    "Members": members,
                });
            }
        });

    let st = state.clone();
    app.route("/ibm/v1/Host/ConfigFiles/<path>")
        .privileges(configure_manager())
        .put(move |req, resp, (Tail(file_id),): (Tail,)| {
            let st = st.clone();
            async move {
                let content_type = req.header("content-type").unwrap_or("").to_string();
                let (status, body) = file_put(&st, &content_type, req.body(), &file_id).await;
                let mut res = resp.res();
                res.set_status(status);
                res.json_value = body;
            }
        });

    let st = state.clone();
    app.route("/ibm/v1/Host/ConfigFiles/<path>")
        .privileges(configure_manager())
        .get(move |_req, resp, (Tail(file_id),): (Tail,)| {
            let st = st.clone();
            async move {
                if !is_valid_file_name(&file_id) {
                    let mut res = resp.res();
                    res.set_status(StatusCode::NOT_FOUND);
                    res.json_value = description(RESOURCE_NOT_FOUND_MSG);
                    return;
                }
                let path = config_files_dir(&st).join(&file_id);
                let exists = tokio::fs::metadata(&path)
                    .await
                    .map(|m| m.is_file())
                    .unwrap_or(false);
                let mut res = resp.res();
                if exists {
                    res.open_file(path, "application/octet-stream");
                } else {
                    res.set_status(StatusCode::NOT_FOUND);
                    res.json_value = description(RESOURCE_NOT_FOUND_MSG);
                }
            }
        });

    let st = state.clone();
    app.route("/ibm/v1/Host/ConfigFiles/<path>")
        .privileges(configure_manager())
        .delete(move |_req, resp, (Tail(file_id),): (Tail,)| {
            let st = st.clone();
            async move {
                let path = config_files_dir(&st).join(&file_id);
                let outcome = if is_valid_file_name(&file_id) {
                    tokio::fs::remove_file(&path).await
                } else {
                    Err(std::io::Error::from(std::io::ErrorKind::NotFound))
                };
                let mut res = resp.res();
                match outcome {
                    Ok(()) => {
                        debug!(path = %path.display(), "config file deleted");
                        res.json_value = description("File Deleted");
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        res.set_status(StatusCode::NOT_FOUND);
                        res.json_value = description(RESOURCE_NOT_FOUND_MSG);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to delete config file");
                        res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                        res.json_value = description(INTERNAL_SERVER_ERROR_MSG);
                    }
                }
            }
        });

    let st = state.clone();
    app.route("/ibm/v1/Host/ConfigFiles/Actions/IBMConfigFiles.DeleteAll")
        .privileges(configure_manager())
        .post(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                let dir = config_files_dir(&st);
                if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
                    while let Ok(Some(entry)) = entries.next_entry().await {
                        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
                            warn!(error = %e, "failed to delete config file");
                        }
                    }
                }
                resp.res().json_value = description("All files deleted");
            }
        });
}
