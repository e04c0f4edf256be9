use std::fmt;
use stubwire_rpc_service::RegistryError;

/// Mistakes made while assembling server stubs or hosting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The interface has no method with this name.
    UnknownMethod {
        interface: &'static str,
        method: String,
    },
    DuplicateMethod {
        interface: &'static str,
        method: String,
    },
    /// A method of the interface was left without a handler.
    MissingHandler {
        interface: &'static str,
        method: &'static str,
    },
    /// Another server stub is already hosted under this interface name.
    DuplicateInterface(&'static str),
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointError::UnknownMethod { interface, method } => {
                write!(f, "{interface} has no method {method}")
            }
            EndpointError::DuplicateMethod { interface, method } => {
                write!(f, "a handler for {interface}.{method} is already registered")
            }
            EndpointError::MissingHandler { interface, method } => {
                write!(f, "no handler registered for {interface}.{method}")
            }
            EndpointError::DuplicateInterface(name) => {
                write!(f, "a server stub for {name} is already hosted")
            }
        }
    }
}

impl std::error::Error for EndpointError {}

// A dispatch table that disagrees with its descriptor cannot back a registration.
impl From<EndpointError> for RegistryError {
    fn from(err: EndpointError) -> Self {
        match err {
            EndpointError::UnknownMethod { interface, .. }
            | EndpointError::DuplicateMethod { interface, .. }
            | EndpointError::MissingHandler { interface, .. }
            | EndpointError::DuplicateInterface(interface) => {
                RegistryError::MalformedDescriptor(interface)
            }
        }
    }
}
