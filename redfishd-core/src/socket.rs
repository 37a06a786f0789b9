//! Supervisor socket handshake.
//!
//! The supervisor passes listening sockets as fds 3..3+N with names in
//! `LISTEN_FDNAMES` (the systemd socket-activation protocol). A name suffix
//! selects the transport: `_http` plaintext, `_https` TLS, `_both` hybrid.
//! Unknown suffixes warn and default to TLS.

use std::net::TcpListener;
use std::os::fd::FromRawFd;

use tracing::{debug, error, warn};

const LISTEN_FDS_START: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpType {
    Http,
    Https,
    Both,
}

/// A listening socket handed over by the supervisor.
pub struct Acceptor {
    pub listener: TcpListener,
    pub http_type: HttpType,
    pub name: String,
}

/// Classify a socket name by its suffix.
pub fn classify(name: &str) -> HttpType {
    match name.rsplit_once('_').map(|(_, suffix)| suffix) {
        Some("http") => {
            debug!(name, "got http socket");
            HttpType::Http
        }
        Some("https") => {
            debug!(name, "got https socket");
            HttpType::Https
        }
        Some("both") => {
            debug!(name, "got hybrid socket");
            HttpType::Both
        }
        _ => {
            warn!(name, "unknown socket type, assuming HTTPS only");
            HttpType::Https
        }
    }
}

/// Collect the sockets the supervisor passed us, if any.
///
/// The environment variables are consumed so children never inherit stale
/// descriptors.
pub fn inherited_acceptors() -> Vec<Acceptor> {
    let pid = std::env::var("LISTEN_PID").ok();
    let fds = std::env::var("LISTEN_FDS").ok();
    let names = std::env::var("LISTEN_FDNAMES").unwrap_or_default();
    std::env::remove_var("LISTEN_PID");
    std::env::remove_var("LISTEN_FDS");
    std::env::remove_var("LISTEN_FDNAMES");

    let Some(fds) = fds else {
        return Vec::new();
    };
    if let Some(pid) = pid {
        if pid != std::process::id().to_string() {
            warn!(pid, "LISTEN_PID is not us, ignoring inherited sockets");
            return Vec::new();
        }
    }
    let count: i32 = match fds.parse() {
        Ok(count) => count,
        Err(_) => {
            error!(fds, "failed to read socket files");
            return Vec::new();
        }
    };

    let mut names = names.split(':');
    let mut acceptors = Vec::new();
    for index in 0..count {
        let fd = LISTEN_FDS_START + index;
        let name = names.next().unwrap_or("").to_string();
        let http_type = classify(&name);
        // The supervisor owns the handover contract: each fd in the range is
        // a listening stream socket for this process only.
        let listener = unsafe { TcpListener::from_raw_fd(fd) };
        if let Err(e) = listener.set_nonblocking(true) {
            error!(fd, error = %e, "failed to prepare inherited socket");
            continue;
        }
        debug!(fd, name, "starting webserver on inherited socket");
        acceptors.push(Acceptor {
            listener,
            http_type,
            name,
        });
    }
    acceptors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_selects_transport() {
        assert_eq!(classify("redfishd_http"), HttpType::Http);
        assert_eq!(classify("redfishd_https"), HttpType::Https);
        assert_eq!(classify("redfishd_both"), HttpType::Both);
        assert_eq!(classify("redfishd_mystery"), HttpType::Https);
        assert_eq!(classify("plain"), HttpType::Https);
        assert_eq!(classify(""), HttpType::Https);
    }
}
