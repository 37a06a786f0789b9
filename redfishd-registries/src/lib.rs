//! Compiled-in Redfish message registries.
//!
//! A registry is a static header plus an ordered table of `(key, Message)`
//! entries. All registries ship with the binary; lookups go through a
//! process-global by-prefix map built on first access. Scans inside a
//! registry are linear; the tables are small and the call sites are error
//! paths and event formatting, not hot loops.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{json, Value};

pub mod base;
pub mod resource_event;
pub mod task_event;

/// Registry header, mirroring the `#MessageRegistry` resource fields.
pub struct Header {
    pub copyright: &'static str,
    pub registry_type: &'static str,
    pub version_major: u32,
    pub version_minor: u32,
    pub version_patch: u32,
    pub name: &'static str,
    pub language: &'static str,
    pub description: &'static str,
    pub prefix: &'static str,
    pub owning_entity: &'static str,
}

/// Argument type accepted by a message placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
        }
    }
}

/// One message template. `message` uses 1-indexed `%N` placeholders.
pub struct Message {
    pub description: &'static str,
    pub message: &'static str,
    pub severity: &'static str,
    pub number_of_args: usize,
    pub param_types: &'static [ParamType],
    pub resolution: &'static str,
}

pub type MessageEntry = (&'static str, Message);

/// A complete compiled-in registry.
pub struct Registry {
    pub header: &'static Header,
    pub url: &'static str,
    pub entries: &'static [MessageEntry],
}

/// Every registry the service knows about.
pub fn all() -> &'static [&'static Registry] {
    static ALL: [&Registry; 3] = [&base::REGISTRY, &task_event::REGISTRY, &resource_event::REGISTRY];
    &ALL
}

fn by_prefix() -> &'static HashMap<&'static str, &'static Registry> {
    static MAP: OnceLock<HashMap<&'static str, &'static Registry>> = OnceLock::new();
    MAP.get_or_init(|| all().iter().map(|r| (r.header.prefix, *r)).collect())
}

/// Look up a registry by prefix. The version is informational only.
pub fn registry(prefix: &str) -> Option<&'static Registry> {
    by_prefix().get(prefix).copied()
}

/// Find a message by key within a registry's entry table.
pub fn lookup<'a>(key: &str, entries: &'a [MessageEntry]) -> Option<&'a Message> {
    entries.iter().find(|(k, _)| *k == key).map(|(_, m)| m)
}

/// A parsed Redfish MessageId: `Prefix.Major.Minor[.Patch].Key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageId<'a> {
    pub prefix: &'a str,
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    pub key: &'a str,
}

impl<'a> MessageId<'a> {
    /// Parse a MessageId. Any shape other than the three- or four-part
    /// version form is rejected.
    pub fn parse(id: &'a str) -> Option<Self> {
        let fields: Vec<&str> = id.split('.').collect();
        let (version, key) = match fields.as_slice() {
            [prefix, major, minor, key] => ((*prefix, *major, *minor, None), *key),
            [prefix, major, minor, patch, key] => {
                ((*prefix, *major, *minor, Some(*patch)), *key)
            }
            _ => return None,
        };
        let (prefix, major, minor, patch) = version;
        if prefix.is_empty() || key.is_empty() {
            return None;
        }
        Some(MessageId {
            prefix,
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
            patch: match patch {
                Some(p) => Some(p.parse().ok()?),
                None => None,
            },
            key,
        })
    }
}

/// Resolve a MessageId string to its compiled-in message, if any.
pub fn find_message(id: &str) -> Option<&'static Message> {
    let parsed = MessageId::parse(id)?;
    let registry = registry(parsed.prefix)?;
    lookup(parsed.key, registry.entries)
}

/// Substitute 1-indexed `%N` placeholders with `args[N-1]`.
///
/// Returns the empty string on any malformed placeholder or out-of-range
/// index, signalling failure to the caller.
pub fn fill_message_args(args: &[&str], template: &str) -> String {
    let mut msg = template;
    let mut out =
        String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    while let Some(pos) = msg.find('%') {
        out.push_str(&msg[..pos]);
        msg = &msg[pos + 1..];
        let digits = msg.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return String::new();
        }
        let number: usize = match msg[..digits].parse() {
            Ok(n) => n,
            Err(_) => return String::new(),
        };
        msg = &msg[digits..];
        // Message args are 1-indexed.
        let arg = match number.checked_sub(1).and_then(|i| args.get(i)) {
            Some(arg) => arg,
            None => return String::new(),
        };
        out.push_str(arg);
    }
    out.push_str(msg);
    out
}

/// Format the MessageId emitted to clients for `key` in `header`'s registry.
pub fn message_id(header: &Header, key: &str) -> String {
    if cfg!(feature = "patch-in-messageid") {
        format!(
            "{}.{}.{}.{}.{}",
            header.prefix, header.version_major, header.version_minor, header.version_patch, key
        )
    } else {
        format!(
            "{}.{}.{}.{}",
            header.prefix, header.version_major, header.version_minor, key
        )
    }
}

/// Build the `#Message.v1_1_1.Message` object for a registry entry.
///
/// Returns `None` when `key` is not in the registry; callers treat that as
/// a programming error and fall back to `GeneralError`.
pub fn log_entry(registry: &Registry, key: &str, args: &[&str]) -> Option<Value> {
    let message = lookup(key, registry.entries)?;
    let filled = fill_message_args(args, message.message);
    Some(json!({
        "@odata.type": "#Message.v1_1_1.Message",
        "MessageId": message_id(registry.header, key),
        "Message": filled,
        "MessageArgs": args,
        "MessageSeverity": message.severity,
        "Resolution": message.resolution,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_filled_correctly() {
        assert_eq!(fill_message_args(&["foo"], "%1"), "foo");
        assert_eq!(fill_message_args(&[], ""), "");
        assert_eq!(fill_message_args(&["foo", "bar"], "%1, %2"), "foo, bar");
        assert_eq!(fill_message_args(&["foo"], "%1 bar"), "foo bar");
        assert_eq!(fill_message_args(&[], "%1"), "");
        assert_eq!(fill_message_args(&[], "%"), "");
        assert_eq!(fill_message_args(&[], "%foo"), "");
        assert_eq!(fill_message_args(&["a"], "%0"), "");
    }

    #[test]
    fn every_template_fills_with_matching_arity() {
        for registry in all() {
            for (key, message) in registry.entries {
                let args: Vec<String> =
                    (0..message.number_of_args).map(|i| format!("a{i}")).collect();
                let refs: Vec<&str> = args.iter().map(String::as_str).collect();
                let filled = fill_message_args(&refs, message.message);
                assert!(
                    !filled.contains('%'),
                    "{key}: residual placeholder in {filled:?}"
                );
                assert_eq!(
                    message.number_of_args,
                    message.param_types.len(),
                    "{key}: arg count does not match param types"
                );
            }
        }
    }

    #[test]
    fn lookup_by_key() {
        assert!(lookup("Non-Existent", base::REGISTRY.entries).is_none());

        let msg = lookup("InternalError", base::REGISTRY.entries).expect("InternalError");
        assert_eq!(msg.number_of_args, 0);
        assert_eq!(msg.severity, "Critical");
    }

    #[test]
    fn find_message_by_id() {
        assert!(find_message("Base.1.13.Non_Existent_Message").is_none());
        assert!(find_message("NoSuchRegistry.1.0.InternalError").is_none());
        assert!(find_message("Base.1.13.InternalError").is_some());
        assert!(find_message("Base.1.13.0.InternalError").is_some());
        assert!(find_message("TaskEvent.1.0.TaskStarted").is_some());
    }

    #[test]
    fn message_id_components() {
        assert!(MessageId::parse("Base.5.threeComponents").is_none());
        assert!(MessageId::parse("Base.0.0.5.x.sixComponents").is_none());
        assert!(MessageId::parse("Base.a.5.NotNumeric").is_none());

        let id = MessageId::parse("Base.0.5.SomeKey").expect("four fields");
        assert_eq!(id.prefix, "Base");
        assert_eq!(id.major, 0);
        assert_eq!(id.minor, 5);
        assert_eq!(id.patch, None);
        assert_eq!(id.key, "SomeKey");

        let id = MessageId::parse("Base.1.13.0.SomeKey").expect("five fields");
        assert_eq!(id.patch, Some(0));
        assert_eq!(id.key, "SomeKey");
    }

    #[test]
    fn log_entry_shape() {
        let entry = log_entry(&base::REGISTRY, "ResourceNotFound", &["Task", "42"])
            .expect("known key");
        assert_eq!(entry["@odata.type"], "#Message.v1_1_1.Message");
        assert_eq!(
            entry["Message"],
            "The requested resource of type 'Task' named '42' was not found."
        );
        assert_eq!(entry["MessageArgs"][0], "Task");
        assert_eq!(entry["MessageSeverity"], "Critical");
        let id = entry["MessageId"].as_str().unwrap();
        assert!(find_message(id).is_some(), "emitted id must resolve: {id}");
    }

    #[test]
    fn registry_map_covers_all_prefixes() {
        for reg in all() {
            assert!(registry(reg.header.prefix).is_some());
        }
        assert!(registry("Unknown").is_none());
    }
}
