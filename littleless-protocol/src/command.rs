//! Command identifiers and the name table
//!
//! On the wire a command is named by exactly three characters; inside the
//! program it is an 8-bit id. The application layer owns the mapping.

/// Numeric command identifier
///
/// Valid ids are 0-254. 255 is reserved to mean "unresolved" and can never
/// be constructed through [`CommandId::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandId(u8);

impl CommandId {
    /// The reserved "unknown command" value
    pub const UNRESOLVED: u8 = 0xFF;

    /// Create an id, rejecting the reserved value
    pub const fn new(id: u8) -> Option<Self> {
        if id == Self::UNRESOLVED {
            None
        } else {
            Some(Self(id))
        }
    }

    /// Create an id in a const context
    ///
    /// Fails to compile when used in a const item with the reserved value.
    pub const fn from_const(id: u8) -> Self {
        assert!(id != Self::UNRESOLVED, "command id 255 is reserved");
        Self(id)
    }

    /// Get the raw id
    pub const fn raw(self) -> u8 {
        self.0
    }
}

/// Three-character wire name of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CommandName([u8; 3]);

impl CommandName {
    /// Create a name from its three wire characters
    pub const fn new(name: [u8; 3]) -> Self {
        Self(name)
    }

    /// The wire characters
    pub const fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl From<&[u8; 3]> for CommandName {
    fn from(name: &[u8; 3]) -> Self {
        Self(*name)
    }
}

/// Bidirectional mapping between command ids and wire names
pub trait CommandTable {
    /// Look up the id for a received name
    fn resolve(&self, name: &CommandName) -> Option<CommandId>;

    /// Look up the wire name for an outgoing id
    fn describe(&self, id: CommandId) -> Option<CommandName>;
}

impl<T: CommandTable + ?Sized> CommandTable for &T {
    fn resolve(&self, name: &CommandName) -> Option<CommandId> {
        T::resolve(self, name)
    }

    fn describe(&self, id: CommandId) -> Option<CommandName> {
        T::describe(self, id)
    }
}

impl<T: CommandTable + ?Sized> CommandTable for &mut T {
    fn resolve(&self, name: &CommandName) -> Option<CommandId> {
        T::resolve(self, name)
    }

    fn describe(&self, id: CommandId) -> Option<CommandName> {
        T::describe(self, id)
    }
}

/// One row of a command table
pub type CommandEntry = (CommandId, CommandName);

/// Read-only command table backed by a slice, usually a `static`
#[derive(Debug, Clone, Copy)]
pub struct StaticCommandTable<'a> {
    entries: &'a [CommandEntry],
}

impl<'a> StaticCommandTable<'a> {
    /// Wrap a list of entries
    pub const fn new(entries: &'a [CommandEntry]) -> Self {
        Self { entries }
    }

    /// The underlying entries
    pub const fn entries(&self) -> &'a [CommandEntry] {
        self.entries
    }
}

impl CommandTable for StaticCommandTable<'_> {
    fn resolve(&self, name: &CommandName) -> Option<CommandId> {
        self.entries
            .iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| *id)
    }

    fn describe(&self, id: CommandId) -> Option<CommandName> {
        self.entries
            .iter()
            .find(|(i, _)| *i == id)
            .map(|(_, name)| *name)
    }
}
