//! The in-process signal broker.
//!
//! External collaborators (the object-mapping bus adapter) emit decoded
//! signals here; tasks subscribe with a match rule and get woken for the
//! signals they care about. The broker is the seam: the core never sees the
//! wire protocol behind it.

use serde_json::Value;
use tokio::sync::broadcast;

/// A decoded bus signal.
#[derive(Debug, Clone)]
pub struct BusSignal {
    /// Object path the signal originated from.
    pub path: String,
    pub interface: String,
    pub member: String,
    pub body: Value,
}

/// Which signals a task listens for. `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct MatchRule {
    pub path: Option<String>,
    pub interface: Option<String>,
    pub member: Option<String>,
}

impl MatchRule {
    /// Match any properties-changed signal on an interface.
    pub fn properties_changed(interface: &str) -> MatchRule {
        MatchRule {
            path: None,
            interface: Some(interface.to_string()),
            member: Some("PropertiesChanged".to_string()),
        }
    }

    pub fn matches(&self, signal: &BusSignal) -> bool {
        fn field(want: &Option<String>, got: &str) -> bool {
            want.as_deref().map(|w| w == got).unwrap_or(true)
        }
        field(&self.path, &signal.path)
            && field(&self.interface, &signal.interface)
            && field(&self.member, &signal.member)
    }
}

/// Broadcast fan-out of bus signals.
#[derive(Clone)]
pub struct SignalBroker {
    tx: broadcast::Sender<BusSignal>,
}

impl Default for SignalBroker {
    fn default() -> Self {
        SignalBroker::new(256)
    }
}

impl SignalBroker {
    pub fn new(capacity: usize) -> SignalBroker {
        let (tx, _) = broadcast::channel(capacity);
        SignalBroker { tx }
    }

    /// Emit a signal to every listening task. Fine with no listeners.
    pub fn emit(&self, signal: BusSignal) {
        let _ = self.tx.send(signal);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusSignal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signal(interface: &str, member: &str) -> BusSignal {
        BusSignal {
            path: "/xyz/openbmc_project/software/abc".to_string(),
            interface: interface.to_string(),
            member: member.to_string(),
            body: json!({}),
        }
    }

    #[test]
    fn empty_rule_matches_everything() {
        let rule = MatchRule::default();
        assert!(rule.matches(&signal("any.interface", "AnyMember")));
    }

    #[test]
    fn properties_changed_rule_filters_interface_and_member() {
        let rule = MatchRule::properties_changed("com.example.Dump");
        assert!(rule.matches(&signal("com.example.Dump", "PropertiesChanged")));
        assert!(!rule.matches(&signal("com.example.Dump", "InterfacesAdded")));
        assert!(!rule.matches(&signal("com.example.Other", "PropertiesChanged")));
    }
}
