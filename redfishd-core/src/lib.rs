//! Core runtime for the redfishd Redfish service.
//!
//! The pieces compose in dependency order: HTTP primitives
//! ([`request::Request`], [`response::Response`], [`async_resp::AsyncResponse`]),
//! the error envelope ([`error_messages`]), the privilege and session model
//! ([`privileges`], [`sessions`]), the trie router ([`router`]) and the
//! application facade ([`app::App`]) that binds supervisor sockets and runs
//! the dispatch pipeline.

pub mod app;
pub mod async_resp;
pub mod config;
pub mod error_messages;
pub mod parsing;
pub mod privileges;
pub mod request;
pub mod response;
pub mod router;
pub mod secure_headers;
pub mod sessions;
pub mod socket;
pub mod verb;

pub use app::{App, CredentialVerifier, ServeError};
pub use async_resp::AsyncResponse;
pub use config::ServiceConfig;
pub use privileges::{Admission, Privilege, PrivilegeExpr, PrivilegeSet, RoleMap};
pub use request::Request;
pub use response::Response;
pub use router::{Params, RouteBuilder, Router, Tail};
pub use sessions::{Session, SessionRegistry};
pub use verb::Verb;
