/// Position of a method within its interface; this is what goes on the wire.
pub type MethodOrdinal = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub ordinal: MethodOrdinal,
    /// Routed methods carry a shard key derived from their routing argument.
    pub routed: bool,
}

impl MethodDescriptor {
    pub const fn new(name: &'static str, ordinal: MethodOrdinal) -> Self {
        Self {
            name,
            ordinal,
            routed: false,
        }
    }

    pub const fn routed(name: &'static str, ordinal: MethodOrdinal) -> Self {
        Self {
            name,
            ordinal,
            routed: true,
        }
    }
}

/// Static description of a remotely callable interface.
///
/// The order of `methods` is part of the wire contract: appending is
/// compatible, reordering or removing is not.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor {
    /// Globally unique, e.g. `"shop.ProductCatalog"`.
    pub name: &'static str,
    pub methods: &'static [MethodDescriptor],
}

impl InterfaceDescriptor {
    pub fn method(&self, ordinal: MethodOrdinal) -> Option<&'static MethodDescriptor> {
        self.methods
            .get(ordinal as usize)
            .filter(|m| m.ordinal == ordinal)
    }

    pub fn method_by_name(&self, name: &str) -> Option<&'static MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// `"<interface>.<method>"`, used for span names.
    pub fn span_name(&self, method: &MethodDescriptor) -> String {
        format!("{}.{}", self.name, method.name)
    }

    /// Checks that every ordinal equals its position and names are unique.
    pub fn is_well_formed(&self) -> bool {
        self.methods.iter().enumerate().all(|(i, m)| {
            m.ordinal as usize == i && !self.methods[..i].iter().any(|p| p.name == m.name)
        })
    }
}
