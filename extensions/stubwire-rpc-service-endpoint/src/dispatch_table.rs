use crate::error::EndpointError;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use stubwire_rpc_service::{InterfaceDescriptor, ServerStub, StubHandler};

/// Maps each method of one interface to the handler that serves it.
pub struct DispatchTable {
    interface: &'static InterfaceDescriptor,
    handlers: HashMap<&'static str, StubHandler>,
}

impl DispatchTable {
    pub fn new(interface: &'static InterfaceDescriptor) -> Self {
        Self {
            interface,
            handlers: HashMap::with_capacity(interface.methods.len()),
        }
    }

    pub fn register(&mut self, method: &str, handler: StubHandler) -> Result<(), EndpointError> {
        let descriptor = self.interface.method_by_name(method).ok_or_else(|| {
            EndpointError::UnknownMethod {
                interface: self.interface.name,
                method: method.to_string(),
            }
        })?;

        match self.handlers.entry(descriptor.name) {
            Entry::Occupied(_) => Err(EndpointError::DuplicateMethod {
                interface: self.interface.name,
                method: method.to_string(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(handler);
                Ok(())
            }
        }
    }

    /// Builder form of [`DispatchTable::register`].
    pub fn with(mut self, method: &str, handler: StubHandler) -> Result<Self, EndpointError> {
        self.register(method, handler)?;
        Ok(self)
    }

    /// Finishes the table, requiring a handler for every method.
    pub fn build(self) -> Result<Arc<dyn ServerStub>, EndpointError> {
        if let Some(missing) = self
            .interface
            .methods
            .iter()
            .find(|m| !self.handlers.contains_key(m.name))
        {
            return Err(EndpointError::MissingHandler {
                interface: self.interface.name,
                method: missing.name,
            });
        }
        Ok(Arc::new(self))
    }
}

impl ServerStub for DispatchTable {
    fn interface(&self) -> &'static InterfaceDescriptor {
        self.interface
    }

    fn lookup(&self, method: &str) -> Option<StubHandler> {
        self.handlers.get(method).cloned()
    }
}
