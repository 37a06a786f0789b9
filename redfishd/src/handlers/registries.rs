//! Registry resources: the file collection, file locations, and registry
//! contents.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use redfishd_core::error_messages;
use redfishd_core::App;
use redfishd_registries::{ParamType, Registry};

use super::login;
use crate::AppState;

fn registry_file_json(registry: &Registry) -> Value {
    let header = registry.header;
    let prefix = header.prefix;
    json!({
        "@odata.id": format!("/redfish/v1/Registries/{prefix}"),
        "@odata.type": "#MessageRegistryFile.v1_1_0.MessageRegistryFile",
        "Name": format!("{prefix} Message Registry File"),
        "Description": format!("DMTF {prefix} Message Registry File Location"),
        "Id": prefix,
        "Registry": format!("{}.{}.{}", prefix, header.version_major, header.version_minor),
        "Languages@odata.count": 1,
        "Languages": [header.language],
        "Location@odata.count": 1,
        "Location": [{
            "Language": header.language,
            "Uri": format!("/redfish/v1/Registries/{prefix}/{prefix}"),
            "PublicationUri": registry.url,
        }],
    })
}

fn registry_content_json(registry: &Registry) -> Value {
    let header = registry.header;
    let mut messages = Map::new();
    for (key, message) in registry.entries {
        let mut entry = Map::new();
        entry.insert("Description".to_string(), json!(message.description));
        entry.insert("Message".to_string(), json!(message.message));
        entry.insert("Severity".to_string(), json!(message.severity));
        entry.insert("MessageSeverity".to_string(), json!(message.severity));
        entry.insert("NumberOfArgs".to_string(), json!(message.number_of_args));
        entry.insert("Resolution".to_string(), json!(message.resolution));
        if message.number_of_args > 0 {
            let params: Vec<&str> = message
                .param_types
                .iter()
                .map(ParamType::as_str)
                .collect();
            entry.insert("ParamTypes".to_string(), json!(params));
        }
        messages.insert(key.to_string(), Value::Object(entry));
    }
    json!({
        "@Redfish.Copyright": header.copyright,
        "@odata.type": header.registry_type,
        "Id": format!(
            "{}.{}.{}.{}",
            header.prefix, header.version_major, header.version_minor, header.version_patch
        ),
        "Name": header.name,
        "Language": header.language,
        "Description": header.description,
        "RegistryPrefix": header.prefix,
        "RegistryVersion": format!(
            "{}.{}.{}",
            header.version_major, header.version_minor, header.version_patch
        ),
        "OwningEntity": header.owning_entity,
        "Messages": messages,
    })
}

pub fn register(app: &mut App, _state: &Arc<AppState>) {
    app.route("/redfish/v1/Registries")
        .privileges(login())
        .get(|_req, resp, (): ()| async move {
            let members: Vec<Value> = redfishd_registries::all()
                .iter()
                .map(|r| {
                    json!({"@odata.id": format!("/redfish/v1/Registries/{}", r.header.prefix)})
                })
                .collect();
            resp.res().json_value = json!({
                "@odata.type": "#MessageRegistryFileCollection.MessageRegistryFileCollection",
                "@odata.id": "/redfish/v1/Registries",
                "Name": "MessageRegistryFile Collection",
                "Description": "Collection of MessageRegistryFiles",
                "Members@odata.count": members.len(),
                "Members": members,
            });
        });

    app.route("/redfish/v1/Registries/<str>")
        .privileges(login())
        .get(|_req, resp, (prefix,): (String,)| async move {
            match redfishd_registries::registry(&prefix) {
                Some(registry) => resp.res().json_value = registry_file_json(registry),
                None => error_messages::resource_not_found(
                    &mut resp.res(),
                    "MessageRegistryFile",
                    &prefix,
                ),
            }
        });

    app.route("/redfish/v1/Registries/<str>/<str>")
        .privileges(login())
        .get(|_req, resp, (prefix, name): (String, String)| async move {
            let Some(registry) = redfishd_registries::registry(&prefix) else {
                error_messages::resource_not_found(
                    &mut resp.res(),
                    "MessageRegistryFile",
                    &prefix,
                );
                return;
            };
            if prefix != name {
                error_messages::resource_not_found(
                    &mut resp.res(),
                    registry.header.registry_type,
                    &name,
                );
                return;
            }
            resp.res().json_value = registry_content_json(registry);
        });
}
