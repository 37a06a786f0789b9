//! Event service: subscriptions, the test-event action, and the SSE stream.

use std::sync::Arc;

use http::header::LOCATION;
use http::StatusCode;
use serde_json::{json, Value};
use tracing::info;

use redfishd_core::error_messages;
use redfishd_core::parsing::JsonParseError;
use redfishd_core::App;
use redfishd_events::{HttpPostSink, Subscription};
use redfishd_registries::{log_entry, resource_event};

use super::{configure_manager, login};
use crate::AppState;

fn subscription_json(sub: &Subscription) -> Value {
    let mut doc = json!({
        "@odata.id": format!("/redfish/v1/EventService/Subscriptions/{}", sub.id),
        "@odata.type": "#EventDestination.v1_8_0.EventDestination",
        "Id": sub.id,
        "Name": format!("Event Destination {}", sub.id),
        "Destination": sub.destination,
        "Protocol": sub.protocol,
        "SubscriptionType": sub.subscription_type,
        "DeliveryRetryPolicy": sub.retry_policy,
        "RegistryPrefixes": sub.registry_prefixes,
        "MessageIds": sub.message_keys,
    });
    if let Some(context) = &sub.context {
        doc["Context"] = json!(context);
    }
    doc
}

pub fn register(app: &mut App, state: &Arc<AppState>) {
    let st = state.clone();
    app.route("/redfish/v1/EventService")
        .privileges(login())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                resp.res().json_value = json!({
                    "@odata.id": "/redfish/v1/EventService",
                    "@odata.type": "#EventService.v1_5_0.EventService",
                    "Id": "EventService",
                    "Name": "Event Service",
                    "ServiceEnabled": true,
                    "DeliveryRetryAttempts": st.config.event_delivery_retries,
                    "DeliveryRetryIntervalSeconds": 30,
                    "ServerSentEventUri": "/redfish/v1/EventService/SSE",
                    "Status": {"State": "Enabled", "Health": "OK"},
                    "Subscriptions": {"@odata.id": "/redfish/v1/EventService/Subscriptions"},
                    "Actions": {
                        "#EventService.SubmitTestEvent": {
                            "target": "/redfish/v1/EventService/Actions/EventService.SubmitTestEvent"
                        }
                    },
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/EventService/Subscriptions")
        .privileges(login())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                let members: Vec<Value> = st
                    .events
                    .ids()
                    .into_iter()
                    .map(|id| {
                        json!({"@odata.id": format!("/redfish/v1/EventService/Subscriptions/{id}")})
                    })
                    .collect();
                resp.res().json_value = json!({
                    "@odata.type": "#EventDestinationCollection.EventDestinationCollection",
                    "@odata.id": "/redfish/v1/EventService/Subscriptions",
                    "Name": "Event Destination Collection",
                    "Members@odata.count": members.len(),
                    "Members": members,
                });
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/EventService/Subscriptions")
        .privileges(configure_manager())
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
                let Some(destination) = body.get("Destination").and_then(Value::as_str) else {
                    error_messages::property_missing(&mut resp.res(), "Destination");
                    return;
                };
                if st.events.destination_exists(destination) {
                    error_messages::resource_already_exists(
                        &mut resp.res(),
                        "EventDestination",
                        "Destination",
                        destination,
                    );
                    return;
                }

                let mut headers = Vec::new();
                if let Some(list) = body.get("HttpHeaders").and_then(Value::as_array) {
                    for header in list {
                        if let Some(object) = header.as_object() {
                            for (name, value) in object {
                                if let Some(value) = value.as_str() {
                                    headers.push((name.clone(), value.to_string()));
                                }
                            }
                        }
                    }
                }
                let sink = Arc::new(HttpPostSink::new(destination.to_string(), headers.clone()));
                let mut subscription = Subscription::new(destination.to_string(), sink);
                subscription.http_headers = headers;
                subscription.context = body
                    .get("Context")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if let Some(prefixes) = body.get("RegistryPrefixes").and_then(Value::as_array) {
                    subscription.registry_prefixes = prefixes
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect();
                }
                if let Some(ids) = body.get("MessageIds").and_then(Value::as_array) {
                    subscription.message_keys = ids
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect();
                }

                let Some(id) = st.events.add_subscription(subscription) else {
                    error_messages::event_subscription_limit_exceeded(&mut resp.res());
                    return;
                };
                info!(subscription = %id, destination, "event subscription created");
                let mut res = resp.res();
                res.set_status(StatusCode::CREATED);
                res.set_header(
                    LOCATION,
                    &format!("/redfish/v1/EventService/Subscriptions/{id}"),
                );
                res.json_value = json!({"Id": id});
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/EventService/Subscriptions/<str>")
        .privileges(login())
        .get(move |_req, resp, (id,): (String,)| {
            let st = st.clone();
            async move {
                match st.events.get_subscription(&id) {
                    Some(sub) => resp.res().json_value = subscription_json(&sub),
                    None => error_messages::resource_not_found(
                        &mut resp.res(),
                        "EventDestination",
                        &id,
                    ),
                }
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/EventService/Subscriptions/<str>")
        .privileges(configure_manager())
        .delete(move |_req, resp, (id,): (String,)| {
            let st = st.clone();
            async move {
                if st.events.delete_subscription(&id) {
                    info!(subscription = %id, "event subscription removed");
                    error_messages::success(&mut resp.res());
                } else {
                    error_messages::resource_not_found(
                        &mut resp.res(),
                        "EventDestination",
                        &id,
                    );
                }
            }
        });

    let st = state.clone();
    app.route("/redfish/v1/EventService/Actions/EventService.SubmitTestEvent")
        .privileges(configure_manager())
        .post(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                let Some(message) = log_entry(&resource_event::REGISTRY, "ResourceCreated", &[])
                else {
                    error_messages::internal_error(&mut resp.res());
                    return;
                };
                st.events
                    .send_event(message, "/redfish/v1/EventService", "Event");
                resp.res().set_status(StatusCode::NO_CONTENT);
            }
        });

    // Server-Sent Events: every connected client shares the service-wide
    // broadcaster the standing SSE subscription feeds.
    let st = state.clone();
    app.route("/redfish/v1/EventService/SSE")
        .privileges(login())
        .get(move |_req, resp, (): ()| {
            let st = st.clone();
            async move {
                let stream = Box::pin(st.sse.subscribe());
                resp.res().stream(stream, "text/event-stream");
            }
        });
}
