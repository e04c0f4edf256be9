use std::fmt;
use std::io;
use stubwire::DecodeError;

pub type StubResult<T> = Result<T, StubError>;

/// Every failure a caller of a stubbed method can observe.
#[derive(Debug)]
pub enum StubError {
    /// The reply (or, server side, the arguments) could not be decoded.
    Decode(DecodeError),
    /// The call did not complete: the transport failed or a fault was caught
    /// while marshaling or dispatching.
    RemoteCall(RemoteCallError),
    /// The implementation ran and returned an error.
    Application(AppError),
}

impl StubError {
    /// Whether this is a failure of the call machinery rather than of the
    /// method itself.
    pub fn is_remote_call_failure(&self) -> bool {
        matches!(self, StubError::RemoteCall(_))
    }

    /// The transport's original error, if that is what failed the call.
    pub fn transport_error(&self) -> Option<&io::Error> {
        match self {
            StubError::RemoteCall(RemoteCallError::Transport(e)) => Some(e),
            _ => None,
        }
    }

    pub fn app_error(&self) -> Option<&AppError> {
        match self {
            StubError::Application(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for StubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StubError::Decode(e) => write!(f, "decode error: {e}"),
            StubError::RemoteCall(e) => write!(f, "remote call error: {e}"),
            // Application errors travel in-band; their text must round-trip as-is.
            StubError::Application(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl std::error::Error for StubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StubError::Decode(e) => Some(e),
            StubError::RemoteCall(e) => Some(e),
            StubError::Application(_) => None,
        }
    }
}

impl From<DecodeError> for StubError {
    fn from(e: DecodeError) -> Self {
        StubError::Decode(e)
    }
}

impl From<RemoteCallError> for StubError {
    fn from(e: RemoteCallError) -> Self {
        StubError::RemoteCall(e)
    }
}

impl From<AppError> for StubError {
    fn from(e: AppError) -> Self {
        StubError::Application(e)
    }
}

impl From<io::Error> for StubError {
    fn from(e: io::Error) -> Self {
        StubError::RemoteCall(RemoteCallError::Transport(e))
    }
}

#[derive(Debug)]
pub enum RemoteCallError {
    Transport(io::Error),
    /// A panic caught by a fault boundary, locally or on the remote side.
    Fault(String),
}

impl fmt::Display for RemoteCallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCallError::Transport(e) => write!(f, "transport: {e}"),
            RemoteCallError::Fault(msg) => write!(f, "fault: {msg}"),
        }
    }
}

impl std::error::Error for RemoteCallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RemoteCallError::Transport(e) => Some(e),
            RemoteCallError::Fault(_) => None,
        }
    }
}

/// An error returned by a method implementation.
///
/// Only the message crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppError {
    message: String,
}

impl AppError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AppError {}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// A server-side failure to produce a reply at all.
///
/// Application errors are not dispatch errors: they are encoded into the
/// reply's error slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    MethodNotFound { interface: String, method: String },
    UnknownInterface(String),
    Decode(DecodeError),
    Fault(String),
}

impl DispatchError {
    /// The transport-level error kind this failure is reported with.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            DispatchError::MethodNotFound { .. } | DispatchError::UnknownInterface(_) => {
                io::ErrorKind::NotFound
            }
            DispatchError::Decode(_) => io::ErrorKind::InvalidData,
            DispatchError::Fault(_) => io::ErrorKind::Other,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::MethodNotFound { interface, method } => {
                write!(f, "method {method} not found on {interface}")
            }
            DispatchError::UnknownInterface(name) => write!(f, "unknown interface {name}"),
            DispatchError::Decode(e) => write!(f, "cannot decode arguments: {e}"),
            DispatchError::Fault(msg) => write!(f, "dispatch fault: {msg}"),
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for DispatchError {
    fn from(e: DecodeError) -> Self {
        DispatchError::Decode(e)
    }
}

impl From<DispatchError> for io::Error {
    fn from(e: DispatchError) -> Self {
        io::Error::new(e.io_kind(), e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A different registration already uses this interface name.
    Conflict { name: &'static str },
    /// A type-erased component was not the requested interface.
    TypeMismatch { expected: &'static str },
    VersionMismatch {
        name: &'static str,
        found: (u32, u32),
        expected: (u32, u32),
    },
    NotRegistered(&'static str),
    /// Ordinals do not match positions, or a method name repeats.
    MalformedDescriptor(&'static str),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Conflict { name } => {
                write!(f, "conflicting registrations for interface {name}")
            }
            RegistryError::TypeMismatch { expected } => {
                write!(f, "component does not implement {expected}")
            }
            RegistryError::VersionMismatch {
                name,
                found,
                expected,
            } => write!(
                f,
                "stubs for {name} target contract v{}.{}, runtime is v{}.{}",
                found.0, found.1, expected.0, expected.1
            ),
            RegistryError::NotRegistered(name) => write!(f, "no registration for {name}"),
            RegistryError::MalformedDescriptor(name) => {
                write!(f, "descriptor for {name} is malformed")
            }
        }
    }
}

impl std::error::Error for RegistryError {}
