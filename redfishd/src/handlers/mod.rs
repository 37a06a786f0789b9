//! Resource handlers, one module per service.

use std::sync::Arc;

use redfishd_core::{App, Privilege, PrivilegeExpr};

use crate::AppState;

pub mod account_service;
pub mod config_files;
pub mod event_service;
pub mod log_services;
pub mod registries;
pub mod service_root;
pub mod session_service;
pub mod task_service;
pub mod update_service;

/// Install every route.
pub fn register_all(app: &mut App, state: &Arc<AppState>) {
    service_root::register(app, state);
    session_service::register(app, state);
    account_service::register(app, state);
    task_service::register(app, state);
    registries::register(app, state);
    event_service::register(app, state);
    update_service::register(app, state);
    log_services::register(app, state);
    config_files::register(app, state);
}

// Common required-privilege expressions, named like the operations they
// guard.

pub(crate) fn open() -> PrivilegeExpr {
    PrivilegeExpr::open()
}

pub(crate) fn login() -> PrivilegeExpr {
    PrivilegeExpr::require(&[Privilege::Login])
}

pub(crate) fn configure_manager() -> PrivilegeExpr {
    PrivilegeExpr::require(&[Privilege::ConfigureManager])
}

pub(crate) fn configure_users() -> PrivilegeExpr {
    PrivilegeExpr::require(&[Privilege::ConfigureUsers])
}

pub(crate) fn configure_manager_or_self() -> PrivilegeExpr {
    PrivilegeExpr::require(&[Privilege::ConfigureManager]).or(&[Privilege::ConfigureSelf])
}

pub(crate) fn configure_users_or_self() -> PrivilegeExpr {
    PrivilegeExpr::require(&[Privilege::ConfigureUsers]).or(&[Privilege::ConfigureSelf])
}

pub(crate) fn configure_components() -> PrivilegeExpr {
    PrivilegeExpr::require(&[Privilege::ConfigureComponents]).or(&[Privilege::ConfigureManager])
}
