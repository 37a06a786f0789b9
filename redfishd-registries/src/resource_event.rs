//! Resource event message registry.
//!
//! The message definitions are owned by DMTF and kept in sync with the
//! published `ResourceEvent.1.0.3` registry. Only the entries the service
//! emits are carried.

use crate::{Header, Message, MessageEntry, ParamType, Registry};

pub const HEADER: Header = Header {
    copyright: "Copyright 2014-2020 DMTF. All rights reserved.",
    registry_type: "#MessageRegistry.v1_4_0.MessageRegistry",
    version_major: 1,
    version_minor: 0,
    version_patch: 3,
    name: "Resource Event Message Registry",
    language: "en",
    description: "This registry defines the messages to use for resource events.",
    prefix: "ResourceEvent",
    owning_entity: "DMTF",
};

pub const URL: &str = "https://redfish.dmtf.org/registries/ResourceEvent.1.0.3.json";

pub static REGISTRY: Registry = Registry {
    header: &HEADER,
    url: URL,
    entries: ENTRIES,
};

const S: ParamType = ParamType::String;

pub static ENTRIES: &[MessageEntry] = &[
    (
        "ResourceChanged",
        Message {
            description: "Indicates that one or more resource properties have changed.  This is not used whenever there is another event message for that specific change, such as only the state has changed.",
            message: "One or more resource properties have changed.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "None.",
        },
    ),
    (
        "ResourceCreated",
        Message {
            description: "Indicates that all conditions of a successful creation operation have been met.",
            message: "The resource has been created successfully.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "None.",
        },
    ),
    (
        "ResourceErrorsCorrected",
        Message {
            description: "Indicates that a specified resource property has corrected errors.  Examples include ECC errors and network errors.",
            message: "The resource property %1 has corrected errors of type '%2'.",
            severity: "OK",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "None.",
        },
    ),
    (
        "ResourceErrorsDetected",
        Message {
            description: "Indicates that a specified resource property has detected errors.  Examples include drive I/O errors and network link errors.",
            message: "The resource property %1 has detected errors of type '%2'.",
            severity: "Warning",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Resolution dependent upon error type.",
        },
    ),
    (
        "ResourceRemoved",
        Message {
            description: "Indicates that all conditions of a successful remove operation have been met.",
            message: "The resource has been removed successfully.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "None.",
        },
    ),
    (
        "ResourceStatusChangedCritical",
        Message {
            description: "Indicates that the health of a resource has changed to Critical.",
            message: "The health of resource '%1' has changed to %2.",
            severity: "Critical",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "None.",
        },
    ),
    (
        "ResourceStatusChangedWarning",
        Message {
            description: "Indicates that the health of a resource has changed to Warning.",
            message: "The health of resource '%1' has changed to %2.",
            severity: "Warning",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "None.",
        },
    ),
];
