//! # Service Definitions
//!
//! Static metadata describing a named service and its methods. Created once
//! when a client or server is constructed and owned by that instance.

use tracing::warn;

/// Call semantics of one declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Method name, e.g. `CreateDispatch`.
    pub name: String,
    /// Whether the server publishes a response for this method.
    pub requires_response: bool,
    /// Whether more than one server may legitimately answer the same call.
    pub allows_multiple_handlers: bool,
}

/// A named service, the instance that uses it, and its ordered method set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    name: String,
    id: String,
    methods: Vec<MethodInfo>,
}

impl ServiceDefinition {
    /// Create a definition with no methods yet.
    #[must_use]
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            methods: Vec::new(),
        }
    }

    /// Declare a method. Declaration order is kept.
    ///
    /// A name that is already declared keeps its first declaration.
    pub fn register_method(
        &mut self,
        name: &str,
        requires_response: bool,
        allows_multiple_handlers: bool,
    ) -> &mut Self {
        if self.method(name).is_some() {
            warn!(service = %self.name, method = name, "Method declared twice, keeping first");
            return self;
        }
        self.methods.push(MethodInfo {
            name: name.to_string(),
            requires_response,
            allows_multiple_handlers,
        });
        self
    }

    /// Builder form of [`ServiceDefinition::register_method`].
    #[must_use]
    pub fn with_method(
        mut self,
        name: &str,
        requires_response: bool,
        allows_multiple_handlers: bool,
    ) -> Self {
        self.register_method(name, requires_response, allows_multiple_handlers);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generated instance id (`CLI_…` or `SRV_…`).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_methods_keep_declaration_order() {
        let sd = ServiceDefinition::new("AgentDispatchInternal", "SRV_1")
            .with_method("CreateDispatch", true, false)
            .with_method("DeleteDispatch", true, false)
            .with_method("ListDispatch", true, false);

        let names: Vec<_> = sd.methods().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["CreateDispatch", "DeleteDispatch", "ListDispatch"]);
        assert_eq!(sd.name(), "AgentDispatchInternal");
        assert_eq!(sd.id(), "SRV_1");
    }

    #[test]
    fn test_duplicate_declaration_keeps_first() {
        let mut sd = ServiceDefinition::new("Svc", "SRV_1");
        sd.register_method("Ping", true, false);
        sd.register_method("Ping", false, true);

        assert_eq!(sd.methods().len(), 1);
        let ping = sd.method("Ping").unwrap();
        assert!(ping.requires_response);
        assert!(!ping.allows_multiple_handlers);
    }

    #[test]
    fn test_unknown_method() {
        let sd = ServiceDefinition::new("Svc", "CLI_1");
        assert!(sd.method("Nope").is_none());
    }
}
