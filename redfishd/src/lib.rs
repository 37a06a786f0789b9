//! The redfishd Redfish management service.
//!
//! Assembles the core runtime (router, sessions, privileges), the event and
//! task engines, the account store, and every resource handler into a
//! runnable [`App`].

use std::sync::Arc;
use std::time::Duration;

use redfishd_core::{App, PrivilegeSet, RoleMap, ServiceConfig, SessionRegistry};
use redfishd_events::{EventService, SseBroadcaster, Subscription};
use redfishd_tasks::{SignalBroker, TaskService};
use tracing::warn;

pub mod accounts;
pub mod handlers;

pub use accounts::{AccountStore, AccountVerifier};

/// Shared state behind every handler.
pub struct AppState {
    pub config: ServiceConfig,
    pub sessions: Arc<SessionRegistry>,
    pub roles: RoleMap,
    pub accounts: Arc<AccountStore>,
    pub events: Arc<EventService>,
    pub tasks: Arc<TaskService>,
    pub broker: SignalBroker,
    pub sse: SseBroadcaster,
    pub service_uuid: String,
}

impl AppState {
    /// Effective privileges of the request's role.
    pub fn privileges_of(&self, role: &str) -> PrivilegeSet {
        self.roles.privileges_for(role)
    }
}

/// Build the fully wired application: state, verifier, and every route.
/// Call [`App::run`] (or hand the router to a test client) afterwards.
pub fn build_app(config: ServiceConfig) -> (App, Arc<AppState>) {
    let mut app = App::new(config.clone());

    let accounts = Arc::new(AccountStore::with_defaults());
    app.set_verifier(Arc::new(AccountVerifier(accounts.clone())));

    let events = Arc::new(EventService::new(
        config.event_delivery_retries,
        Some(config.subscription_store_path()),
    ));
    events.load();

    let broker = SignalBroker::default();
    let tasks = Arc::new(TaskService::new(
        events.clone(),
        broker.clone(),
        config.max_task_count,
        Duration::from_secs(config.task_timeout_secs),
        config.task_retry_after_secs,
    ));

    let sse = SseBroadcaster::new(128);
    // Every SSE client shares one standing subscription feeding the
    // broadcaster; it never persists.
    let mut sse_subscription = Subscription::new(
        "/redfish/v1/EventService/SSE".to_string(),
        Arc::new(sse.sink()),
    );
    sse_subscription.subscription_type = "SSE".to_string();
    if events.add_subscription(sse_subscription).is_none() {
        warn!("subscription table full, SSE stream will stay silent");
    }

    let state = Arc::new(AppState {
        sessions: app.sessions(),
        roles: app.roles().clone(),
        accounts,
        events,
        tasks,
        broker,
        sse,
        service_uuid: uuid::Uuid::new_v4().to_string(),
        config,
    });

    handlers::register_all(&mut app, &state);
    (app, state)
}
