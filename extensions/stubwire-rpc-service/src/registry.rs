use crate::{
    CODEGEN_VERSION, InterfaceDescriptor, LoadReporter, RegistryError, RemoteHandle, ServerStub,
    Tracer,
};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::Arc;

/// A type-erased component: always an `Arc<I>` for some interface `I`, boxed
/// once more so it can travel as `dyn Any`.
pub type AnyComponent = Arc<dyn Any + Send + Sync>;

pub fn erase<I: ?Sized + Send + Sync + 'static>(component: Arc<I>) -> AnyComponent {
    Arc::new(component)
}

pub fn downcast_component<I: ?Sized + Send + Sync + 'static>(
    component: &AnyComponent,
) -> Result<Arc<I>, RegistryError> {
    component
        .downcast_ref::<Arc<I>>()
        .cloned()
        .ok_or(RegistryError::TypeMismatch {
            expected: std::any::type_name::<I>(),
        })
}

/// Wraps an implementation in a local stub.
pub type LocalStubFn = fn(AnyComponent, Arc<dyn Tracer>) -> Result<AnyComponent, RegistryError>;
/// Builds a client stub that reaches the interface through `handle`.
pub type ClientStubFn = fn(RemoteHandle, &str) -> AnyComponent;
/// Builds the server stub that dispatches inbound calls to an implementation.
pub type ServerStubFn =
    fn(AnyComponent, LoadReporter) -> Result<Arc<dyn ServerStub>, RegistryError>;

/// Binds an interface to its descriptor and stub factories.
#[derive(Clone, Copy)]
pub struct Registration {
    pub name: &'static str,
    pub interface: TypeId,
    pub interface_type_name: &'static str,
    /// Empty when the registration is not tied to one implementation.
    pub implementation_type_name: &'static str,
    pub descriptor: &'static InterfaceDescriptor,
    pub codegen_version: (u32, u32),
    pub local_stub_fn: LocalStubFn,
    pub client_stub_fn: ClientStubFn,
    pub server_stub_fn: ServerStubFn,
}

impl Registration {
    pub fn new<I: ?Sized + 'static>(
        descriptor: &'static InterfaceDescriptor,
        local_stub_fn: LocalStubFn,
        client_stub_fn: ClientStubFn,
        server_stub_fn: ServerStubFn,
    ) -> Self {
        Self {
            name: descriptor.name,
            interface: TypeId::of::<I>(),
            interface_type_name: std::any::type_name::<I>(),
            implementation_type_name: "",
            descriptor,
            codegen_version: CODEGEN_VERSION,
            local_stub_fn,
            client_stub_fn,
            server_stub_fn,
        }
    }

    pub fn implemented_by<T: ?Sized + 'static>(mut self) -> Self {
        self.implementation_type_name = std::any::type_name::<T>();
        self
    }

    pub fn codegen_version(&self) -> (u32, u32) {
        self.codegen_version
    }

    /// Two registrations are interchangeable when everything but their
    /// factory pointers agrees.
    fn same_as(&self, other: &Registration) -> bool {
        self.name == other.name
            && self.interface == other.interface
            && self.implementation_type_name == other.implementation_type_name
            && self.codegen_version == other.codegen_version
            && (std::ptr::eq(self.descriptor, other.descriptor) || self.descriptor == other.descriptor)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("interface", &self.interface_type_name)
            .field("implementation", &self.implementation_type_name)
            .field("codegen_version", &self.codegen_version)
            .finish_non_exhaustive()
    }
}

/// Every known interface, by name. Filled during initialization and only read
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct StubRegistry {
    by_name: HashMap<&'static str, Registration>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `registration`. Registering an identical registration again is a
    /// no-op. A second name for an already registered interface type is a
    /// conflict.
    pub fn register(&mut self, registration: Registration) -> Result<(), RegistryError> {
        if registration.codegen_version.0 != CODEGEN_VERSION.0 {
            tracing::error!(
                interface = registration.name,
                found = ?registration.codegen_version,
                expected = ?CODEGEN_VERSION,
                "stub contract version mismatch"
            );
            return Err(RegistryError::VersionMismatch {
                name: registration.name,
                found: registration.codegen_version,
                expected: CODEGEN_VERSION,
            });
        }
        if !registration.descriptor.is_well_formed() {
            return Err(RegistryError::MalformedDescriptor(registration.name));
        }

        // One name per interface type, so lookups by type are unambiguous.
        if let Some(existing) = self
            .by_name
            .values()
            .find(|r| r.interface == registration.interface && r.name != registration.name)
        {
            tracing::error!(
                interface = registration.name,
                existing = existing.name,
                "interface type already registered under another name"
            );
            return Err(RegistryError::Conflict {
                name: registration.name,
            });
        }

        match self.by_name.entry(registration.name) {
            Entry::Occupied(existing) if existing.get().same_as(&registration) => Ok(()),
            Entry::Occupied(existing) => {
                tracing::error!(
                    interface = registration.name,
                    existing = ?existing.get(),
                    rejected = ?registration,
                    "conflicting stub registration"
                );
                Err(RegistryError::Conflict {
                    name: registration.name,
                })
            }
            Entry::Vacant(entry) => {
                tracing::debug!(interface = registration.name, "registered stubs");
                entry.insert(registration);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Registration> {
        self.by_name.get(name)
    }

    pub fn find(&self, interface: TypeId) -> Option<&Registration> {
        self.by_name.values().find(|r| r.interface == interface)
    }

    pub fn find_for<I: ?Sized + 'static>(&self) -> Result<&Registration, RegistryError> {
        self.find(TypeId::of::<I>())
            .ok_or(RegistryError::NotRegistered(std::any::type_name::<I>()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
