//! Base command set
//!
//! Ids below [`FIRST_USER`] belong to the link itself. Applications add
//! their commands through any [`Dispatch`] implementation, typically a
//! [`littleless_protocol::HandlerRegistry`], using ids from [`FIRST_USER`]
//! upward.

use littleless_protocol::{
    CommandEntry, CommandId, CommandName, CommandTable, Dispatch, MessageHandler,
    StaticCommandTable,
};

/// Version handshake, `ver`
pub const VERSION: CommandId = CommandId::from_const(0);
/// Echo, `ech`
pub const ECHO: CommandId = CommandId::from_const(1);
/// Debug output from the peer, `dbg`
pub const DEBUG: CommandId = CommandId::from_const(2);

/// First id available to applications; 3 through 7 are reserved
pub const FIRST_USER: u8 = 8;

/// Wire names of the base commands
pub const BASE_COMMANDS: [CommandEntry; 3] = [
    (VERSION, CommandName::new(*b"ver")),
    (ECHO, CommandName::new(*b"ech")),
    (DEBUG, CommandName::new(*b"dbg")),
];

/// Table over [`BASE_COMMANDS`]
pub const BASE_TABLE: StaticCommandTable<'static> = StaticCommandTable::new(&BASE_COMMANDS);

/// Returns true if `id` is in the application range
pub const fn is_user(id: CommandId) -> bool {
    id.raw() >= FIRST_USER
}

/// Application extension with no commands
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCommands;

impl CommandTable for NoCommands {
    fn resolve(&self, _name: &CommandName) -> Option<CommandId> {
        None
    }

    fn describe(&self, _id: CommandId) -> Option<CommandName> {
        None
    }
}

impl Dispatch for NoCommands {
    fn handler(&mut self, _cmd: CommandId) -> Option<&mut dyn MessageHandler> {
        None
    }
}

/// Base commands first, then the application's
///
/// Application entries that collide with a base name, or that use an id
/// below [`FIRST_USER`], are ignored.
pub struct LinkTable<'a, U: ?Sized> {
    user: &'a U,
}

impl<'a, U: CommandTable + ?Sized> LinkTable<'a, U> {
    pub fn new(user: &'a U) -> Self {
        Self { user }
    }
}

impl<U: CommandTable + ?Sized> CommandTable for LinkTable<'_, U> {
    fn resolve(&self, name: &CommandName) -> Option<CommandId> {
        if let Some(id) = BASE_TABLE.resolve(name) {
            return Some(id);
        }
        match self.user.resolve(name) {
            Some(id) if is_user(id) => Some(id),
            Some(id) => {
                warn!("application command uses reserved id {}", id);
                None
            }
            None => None,
        }
    }

    fn describe(&self, id: CommandId) -> Option<CommandName> {
        if is_user(id) {
            self.user.describe(id)
        } else {
            BASE_TABLE.describe(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: [CommandEntry; 3] = [
        (CommandId::from_const(8), CommandName::new(*b"led")),
        (CommandId::from_const(3), CommandName::new(*b"bad")),
        (CommandId::from_const(9), CommandName::new(*b"ver")),
    ];

    #[test]
    fn test_base_names() {
        assert_eq!(BASE_TABLE.resolve(&CommandName::from(b"ver")), Some(VERSION));
        assert_eq!(BASE_TABLE.resolve(&CommandName::from(b"ech")), Some(ECHO));
        assert_eq!(BASE_TABLE.resolve(&CommandName::from(b"dbg")), Some(DEBUG));
        assert_eq!(BASE_TABLE.describe(DEBUG), Some(CommandName::new(*b"dbg")));
        assert_eq!(BASE_TABLE.resolve(&CommandName::from(b"xyz")), None);
    }

    #[test]
    fn test_no_commands() {
        let table = LinkTable::new(&NoCommands);
        assert_eq!(table.resolve(&CommandName::from(b"ech")), Some(ECHO));
        assert_eq!(table.resolve(&CommandName::from(b"led")), None);
        assert_eq!(table.describe(CommandId::from_const(8)), None);
    }

    #[test]
    fn test_user_range() {
        let user = StaticCommandTable::new(&USER);
        let table = LinkTable::new(&user);

        assert_eq!(
            table.resolve(&CommandName::from(b"led")),
            Some(CommandId::from_const(8))
        );
        assert_eq!(table.describe(CommandId::from_const(8)), Some(CommandName::new(*b"led")));

        // reserved id is refused
        assert_eq!(table.resolve(&CommandName::from(b"bad")), None);
        assert_eq!(table.describe(CommandId::from_const(3)), None);

        // base names win
        assert_eq!(table.resolve(&CommandName::from(b"ver")), Some(VERSION));
        assert_eq!(table.describe(VERSION), Some(CommandName::new(*b"ver")));
    }

    #[test]
    fn test_is_user() {
        assert!(!is_user(DEBUG));
        assert!(!is_user(CommandId::from_const(7)));
        assert!(is_user(CommandId::from_const(8)));
    }
}
