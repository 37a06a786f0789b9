//! Task event message registry.
//!
//! The message definitions are owned by DMTF and kept in sync with the
//! published `TaskEvent.1.0.3` registry.

use crate::{Header, Message, MessageEntry, ParamType, Registry};

pub const HEADER: Header = Header {
    copyright: "Copyright 2014-2021 DMTF in cooperation with the Storage Networking Industry Association (SNIA). All rights reserved.",
    registry_type: "#MessageRegistry.v1_4_0.MessageRegistry",
    version_major: 1,
    version_minor: 0,
    version_patch: 3,
    name: "Task Event Message Registry",
    language: "en",
    description: "This registry defines the messages for task related events.",
    prefix: "TaskEvent",
    owning_entity: "DMTF",
};

pub const URL: &str = "https://redfish.dmtf.org/registries/TaskEvent.1.0.3.json";

pub static REGISTRY: Registry = Registry {
    header: &HEADER,
    url: URL,
    entries: ENTRIES,
};

const S: ParamType = ParamType::String;
const N: ParamType = ParamType::Number;

pub static ENTRIES: &[MessageEntry] = &[
    (
        "TaskAborted",
        Message {
            description: "Indicates that a task has completed with errors.",
            message: "The task with Id '%1' has completed with errors.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
    (
        "TaskCancelled",
        Message {
            description: "Indicates that a work item has been cancelled.",
            message: "Work on the task with Id '%1' has been halted prior to completion due to an explicit request.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
    (
        "TaskCompletedOK",
        Message {
            description: "Indicates that a task has completed.",
            message: "The task with Id '%1' has completed.",
            severity: "OK",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
    (
        "TaskCompletedWarning",
        Message {
            description: "Indicates that a task has completed with warnings.",
            message: "The task with Id '%1' has completed with warnings.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
    (
        "TaskPaused",
        Message {
            description: "Indicates that a task has been paused.",
            message: "The task with Id '%1' has been paused.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
    (
        "TaskProgressChanged",
        Message {
            description: "Indicates that a task has changed progress.",
            message: "The task with Id '%1' has changed to progress %2 percent complete.",
            severity: "OK",
            number_of_args: 2,
            param_types: &[S, N],
            resolution: "None.",
        },
    ),
    (
        "TaskRemoved",
        Message {
            description: "Indicates that a task has been removed.",
            message: "The task with Id '%1' has been removed.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
    (
        "TaskResumed",
        Message {
            description: "Indicates that a task has been resumed.",
            message: "The task with Id '%1' has been resumed.",
            severity: "OK",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
    (
        "TaskStarted",
        Message {
            description: "Indicates that a task has started.",
            message: "The task with Id '%1' has started.",
            severity: "OK",
            number_of_args: 1,
            param_types: &[S],
            resolution: "None.",
        },
    ),
];
