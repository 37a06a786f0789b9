//! Base message registry.
//!
//! The message definitions are owned by DMTF and kept in sync with the
//! published `Base.1.13.0` registry; edit only to track a new upstream
//! release.

use crate::{Header, Message, MessageEntry, ParamType, Registry};

pub const HEADER: Header = Header {
    copyright: "Copyright 2014-2022 DMTF. All rights reserved.",
    registry_type: "#MessageRegistry.v1_4_0.MessageRegistry",
    version_major: 1,
    version_minor: 13,
    version_patch: 0,
    name: "Base Message Registry",
    language: "en",
    description: "This registry defines the base messages for Redfish",
    prefix: "Base",
    owning_entity: "DMTF",
};

pub const URL: &str = "https://redfish.dmtf.org/registries/Base.1.13.0.json";

pub static REGISTRY: Registry = Registry {
    header: &HEADER,
    url: URL,
    entries: ENTRIES,
};

const S: ParamType = ParamType::String;

pub static ENTRIES: &[MessageEntry] = &[
    (
        "AccessDenied",
        Message {
            description: "Indicates that while attempting to access, connect to, or transfer to or from another resource, the service denied access.",
            message: "While attempting to establish a connection to '%1', the service denied access.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Attempt to ensure that the URI is correct and that the service has the appropriate credentials.",
        },
    ),
    (
        "AccountForSessionNoLongerExists",
        Message {
            description: "Indicates that the account for the session was removed, and so the session was removed as well.",
            message: "The account for the current session was removed, and so the current session was removed as well.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "Attempt to connect with a valid account.",
        },
    ),
    (
        "AccountModified",
        Message {
            description: "Indicates that the account was successfully modified.",
            message: "The account was successfully modified.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "None.",
        },
    ),
    (
        "AccountNotModified",
        Message {
            description: "Indicates that the modification requested for the account was not successful.",
            message: "The account modification request failed.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "The modification may have failed due to permission issues or issues with the request body.",
        },
    ),
    (
        "AccountRemoved",
        Message {
            description: "Indicates that the account was successfully removed.",
            message: "The account was successfully removed.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "None.",
        },
    ),
    (
        "ActionNotSupported",
        Message {
            description: "Indicates that the action supplied with the POST operation is not supported by the resource.",
            message: "The action %1 is not supported by the resource.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Check the Actions property in the resource for the supported actions.",
        },
    ),
    (
        "ActionParameterMissing",
        Message {
            description: "Indicates that the action requested was missing an action parameter that is required to process the action.",
            message: "The action %1 requires the parameter %2 to be present in the request body.",
            severity: "Critical",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Supply the action with the required parameter in the request body when the request is resubmitted.",
        },
    ),
    (
        "ActionParameterUnknown",
        Message {
            description: "Indicates that an action was submitted with an action parameter not supported by the action.",
            message: "The action %1 was submitted with the invalid parameter %2.",
            severity: "Warning",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Correct the invalid parameter and resubmit the request if the operation failed.",
        },
    ),
    (
        "ActionParameterValueFormatError",
        Message {
            description: "Indicates that a parameter was given the correct value type but the format of the value is not supported.",
            message: "The value '%1' for the parameter %2 in the action %3 is of a different format than the parameter can accept.",
            severity: "Warning",
            number_of_args: 3,
            param_types: &[S, S, S],
            resolution: "Correct the value for the parameter in the request body and resubmit the request if the operation failed.",
        },
    ),
    (
        "CouldNotEstablishConnection",
        Message {
            description: "Indicates that the attempt to access the resource, file, or image at the URI was unsuccessful because a session could not be established.",
            message: "The service failed to establish a connection with the URI '%1'.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Ensure that the URI contains a valid and reachable node name, protocol information, and other URI components.",
        },
    ),
    (
        "CreateFailedMissingReqProperties",
        Message {
            description: "Indicates that a create operation was attempted on a resource but that properties that are required for the create operation were missing from the request.",
            message: "The create operation failed because the required property %1 was missing from the request.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Correct the body to include the required property with a valid value and resubmit the request if the operation failed.",
        },
    ),
    (
        "CreateLimitReachedForResource",
        Message {
            description: "Indicates that no more resources can be created on the resource as it has reached its create limit.",
            message: "The create operation failed because the resource has reached the limit of possible resources.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Either delete resources and resubmit the request if the operation failed or do not resubmit the request.",
        },
    ),
    (
        "EventSubscriptionLimitExceeded",
        Message {
            description: "Indicates that an event subscription establishment was requested but the operation failed due to the number of simultaneous connections exceeding the limit of the implementation.",
            message: "The event subscription failed due to the number of simultaneous subscriptions exceeding the limit of the implementation.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Reduce the number of other subscriptions before trying to establish the event subscription, or increase the limit of simultaneous subscriptions, if supported.",
        },
    ),
    (
        "GeneralError",
        Message {
            description: "Indicates that a general error has occurred. Use in @Message.ExtendedInfo is discouraged. When used in @Message.ExtendedInfo, implementations are expected to include a Resolution property with this message and provide a service-defined resolution to indicate how to resolve the error.",
            message: "A general error has occurred. See Resolution for information on how to resolve the error.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "None.",
        },
    ),
    (
        "InsufficientPrivilege",
        Message {
            description: "Indicates that the credentials associated with the established session do not have sufficient privileges for the requested operation.",
            message: "There are insufficient privileges for the account or credentials associated with the current session to perform the requested operation.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Either abandon the operation or change the associated access rights and resubmit the request if the operation failed.",
        },
    ),
    (
        "InternalError",
        Message {
            description: "Indicates that the request failed for an unknown internal error but that the service is still operational.",
            message: "The request failed due to an internal service error.  The service is still operational.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Resubmit the request.  If the problem persists, consider resetting the service.",
        },
    ),
    (
        "InvalidObject",
        Message {
            description: "Indicates that the object in question is invalid according to the implementation. An example is a firmware update malformed URI.",
            message: "The object at '%1' is invalid.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Either the object is malformed or the URI is not correct.  Correct the condition and resubmit the request if it failed.",
        },
    ),
    (
        "MalformedJSON",
        Message {
            description: "Indicates that the request body was malformed JSON.",
            message: "The request body submitted was malformed JSON and could not be parsed by the receiving service.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Ensure that the request body is valid JSON and resubmit the request.",
        },
    ),
    (
        "NoOperation",
        Message {
            description: "Indicates that the requested operation will not perform any changes on the service.",
            message: "The request body submitted contain no data to act upon and no changes to the resource took place.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "Add properties in the JSON object and resubmit the request.",
        },
    ),
    (
        "NoValidSession",
        Message {
            description: "Indicates that the operation failed because a valid session is required in order to access any resources.",
            message: "There is no valid session established with the implementation.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Establish a session before attempting any operations.",
        },
    ),
    (
        "OperationFailed",
        Message {
            description: "Indicates that one of the internal operations necessary to complete the request failed. An example of this is when an internal service provider is unable to complete the request, such as in aggregation or RDE.",
            message: "An error occurred internal to the service as part of the overall request.  Partial results may have been returned.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "Resubmit the request.  If the problem persists, consider resetting the service or provider.",
        },
    ),
    (
        "OperationTimeout",
        Message {
            description: "Indicates that one of the internal operations necessary to complete the request timed out. An example of this is when an internal service provider is unable to complete the request, such as in aggregation or RDE.",
            message: "A timeout internal to the service occurred as part of the request.  Partial results may have been returned.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "Resubmit the request.  If the problem persists, consider resetting the service or provider.",
        },
    ),
    (
        "PreconditionFailed",
        Message {
            description: "Indicates that the ETag supplied did not match the current ETag of the resource.",
            message: "The ETag supplied did not match the ETag required to change this resource.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Try the operation again using the appropriate ETag.",
        },
    ),
    (
        "PreconditionRequired",
        Message {
            description: "Indicates that the request did not provide the required precondition, such as an If-Match or If-None-Match header or @odata.etag annotations.",
            message: "A precondition header or annotation is required to change this resource.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Try the operation again using an If-Match or If-None-Match header and appropriate ETag.",
        },
    ),
    (
        "PropertyDuplicate",
        Message {
            description: "Indicates that a duplicate property was included in the request body.",
            message: "The property %1 was duplicated in the request.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Remove the duplicate property from the request body and resubmit the request if the operation failed.",
        },
    ),
    (
        "PropertyMissing",
        Message {
            description: "Indicates that a required property was not supplied as part of the request.",
            message: "The property %1 is a required property and must be included in the request.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Ensure that the property is in the request body and has a valid value and resubmit the request if the operation failed.",
        },
    ),
    (
        "PropertyNotWritable",
        Message {
            description: "Indicates that a property was given a value in the request body, but the property is a readonly property.",
            message: "The property %1 is a read only property and cannot be assigned a value.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Remove the property from the request body and resubmit the request if the operation failed.",
        },
    ),
    (
        "PropertyUnknown",
        Message {
            description: "Indicates that an unknown property was included in the request body.",
            message: "The property %1 is not in the list of valid properties for the resource.",
            severity: "Warning",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Remove the unknown property from the request body and resubmit the request if the operation failed.",
        },
    ),
    (
        "PropertyValueFormatError",
        Message {
            description: "Indicates that a property was given the correct value type but the format of the value is not supported.",
            message: "The value '%1' for the property %2 is of a different format than the property can accept.",
            severity: "Warning",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Correct the value for the property in the request body and resubmit the request if the operation failed.",
        },
    ),
    (
        "PropertyValueNotInList",
        Message {
            description: "Indicates that a property was given the correct value type but the value of that property was not supported.  The value is not in an enumeration.",
            message: "The value '%1' for the property %2 is not in the list of acceptable values.",
            severity: "Warning",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Choose a value from the enumeration list that the implementation can support and resubmit the request if the operation failed.",
        },
    ),
    (
        "PropertyValueTypeError",
        Message {
            description: "Indicates that a property was given the wrong value type, such as when a number is supplied for a property that requires a string.",
            message: "The value '%1' for the property %2 is of a different type than the property can accept.",
            severity: "Warning",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Correct the value for the property in the request body and resubmit the request if the operation failed.",
        },
    ),
    (
        "QueryNotSupported",
        Message {
            description: "Indicates that query is not supported on the implementation.",
            message: "Querying is not supported by the implementation.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "Remove the query parameters and resubmit the request if the operation failed.",
        },
    ),
    (
        "QueryNotSupportedOnResource",
        Message {
            description: "Indicates that query is not supported on the given resource, such as when the `only` parameter returns multiple resources.",
            message: "Querying is not supported on the requested resource.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "Remove the query parameters and resubmit the request if the operation failed.",
        },
    ),
    (
        "ResourceAlreadyExists",
        Message {
            description: "Indicates that a resource change or creation was attempted but that the operation cannot proceed because the resource already exists.",
            message: "The requested resource of type %1 with the property %2 with the value '%3' already exists.",
            severity: "Critical",
            number_of_args: 3,
            param_types: &[S, S, S],
            resolution: "Do not repeat the create operation as the resource was already created.",
        },
    ),
    (
        "ResourceAtUriUnauthorized",
        Message {
            description: "Indicates that the attempt to access the resource, file, or image at the URI was unauthorized.",
            message: "While accessing the resource at '%1', the service received an authorization error '%2'.",
            severity: "Critical",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Ensure that the appropriate access is provided for the service in order for it to access the URI.",
        },
    ),
    (
        "ResourceCannotBeDeleted",
        Message {
            description: "Indicates that a delete operation was attempted on a resource that cannot be deleted.",
            message: "The delete request failed because the resource requested cannot be deleted.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Do not attempt to delete a non-deletable resource.",
        },
    ),
    (
        "ResourceInUse",
        Message {
            description: "Indicates that a change was requested to a resource but the change was rejected due to the resource being in use or transition.",
            message: "The change to the requested resource failed because the resource is in use or in transition.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "Remove the condition and resubmit the request if the operation failed.",
        },
    ),
    (
        "ResourceMissingAtURI",
        Message {
            description: "Indicates that the operation expected an image or other resource at the provided URI but none was found.  Examples of this are in requests that require URIs, such as firmware update.",
            message: "The resource at the URI '%1' was not found.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Place a valid resource at the URI or correct the URI and resubmit the request.",
        },
    ),
    (
        "ResourceNotFound",
        Message {
            description: "Indicates that the operation expected a resource identifier that corresponds to an existing resource but one was not found.",
            message: "The requested resource of type '%1' named '%2' was not found.",
            severity: "Critical",
            number_of_args: 2,
            param_types: &[S, S],
            resolution: "Provide a valid resource identifier and resubmit the request.",
        },
    ),
    (
        "ServiceShuttingDown",
        Message {
            description: "Indicates that the operation failed as the service is shutting down, such as when the service reboots.",
            message: "The operation failed because the service is shutting down and can no longer take incoming requests.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "When the service becomes available, resubmit the request if the operation failed.",
        },
    ),
    (
        "ServiceTemporarilyUnavailable",
        Message {
            description: "Indicates that the service is temporarily unavailable.",
            message: "The service is temporarily unavailable.  Retry in '%1' seconds.",
            severity: "Critical",
            number_of_args: 1,
            param_types: &[S],
            resolution: "Wait for the indicated retry duration and retry the operation.",
        },
    ),
    (
        "SessionLimitExceeded",
        Message {
            description: "Indicates that a session establishment was requested but the operation failed due to the number of simultaneous sessions exceeding the limit of the implementation.",
            message: "The session establishment failed due to the number of simultaneous sessions exceeding the limit of the implementation.",
            severity: "Critical",
            number_of_args: 0,
            param_types: &[],
            resolution: "Reduce the number of other sessions before trying to establish the session or increase the limit of simultaneous sessions, if supported.",
        },
    ),
    (
        "SessionTerminated",
        Message {
            description: "Indicates that the DELETE operation on the session resource resulted in the successful termination of the session.",
            message: "The session was successfully terminated.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "No resolution is required.",
        },
    ),
    (
        "Success",
        Message {
            description: "Indicates that all conditions of a successful operation were met.",
            message: "The request completed successfully.",
            severity: "OK",
            number_of_args: 0,
            param_types: &[],
            resolution: "None.",
        },
    ),
    (
        "UnrecognizedRequestBody",
        Message {
            description: "Indicates that the service detected a malformed request body that it was unable to interpret.",
            message: "The service detected a malformed request body that it was unable to interpret.",
            severity: "Warning",
            number_of_args: 0,
            param_types: &[],
            resolution: "Correct the request body and resubmit the request if it failed.",
        },
    ),
];
