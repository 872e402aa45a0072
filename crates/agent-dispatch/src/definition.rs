//! Wire-level description of the `AgentDispatchInternal` service.

use shared_types::ServiceDefinition;

pub const SERVICE_NAME: &str = "AgentDispatchInternal";

pub const CREATE_DISPATCH: &str = "CreateDispatch";
pub const DELETE_DISPATCH: &str = "DeleteDispatch";
pub const LIST_DISPATCH: &str = "ListDispatch";

/// Service definition for the instance identified by `id`.
///
/// Every method answers exactly once and is served by a single owner per
/// room.
#[must_use]
pub fn service_definition(id: impl Into<String>) -> ServiceDefinition {
    ServiceDefinition::new(SERVICE_NAME, id)
        .with_method(CREATE_DISPATCH, true, false)
        .with_method(DELETE_DISPATCH, true, false)
        .with_method(LIST_DISPATCH, true, false)
}
