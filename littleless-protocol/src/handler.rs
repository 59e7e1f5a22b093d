//! Message handler capability and command dispatch
//!
//! The reader never buffers a whole payload. Once a frame's length is known
//! it asks the handler registered for the command whether it wants the frame
//! and in what chunk size; payload bytes are then delivered in chunks of that
//! size (the last chunk may be shorter), followed by exactly one finish call.

use heapless::Vec;

use crate::command::{CommandId, CommandName, CommandTable};
use crate::frame::{FrameHeader, FrameOutcome};

/// Capacity of the reader's staging window
pub const MAX_CHUNK_SIZE: usize = 32;

/// Number of payload bytes delivered per [`MessageHandler::on_chunk`] call
///
/// Always in `1..=MAX_CHUNK_SIZE`. A size of one delivers every byte as soon
/// as it is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChunkSize(u8);

impl ChunkSize {
    /// Byte-at-a-time delivery
    pub const SINGLE: Self = Self(1);

    /// Largest supported chunk
    pub const MAX: Self = Self(MAX_CHUNK_SIZE as u8);

    /// Create a chunk size, rejecting 0 and anything above [`MAX_CHUNK_SIZE`]
    pub const fn new(size: usize) -> Option<Self> {
        if size == 0 || size > MAX_CHUNK_SIZE {
            None
        } else {
            Some(Self(size as u8))
        }
    }

    /// The size in bytes
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

/// Consumer of incoming frames for one command
pub trait MessageHandler {
    /// Decide whether to take a frame
    ///
    /// Returning `None` rejects the frame; it is then dropped without any
    /// further calls.
    fn accept(&mut self, header: &FrameHeader) -> Option<ChunkSize>;

    /// Payload bytes `offset..offset + chunk.len()` of an accepted frame
    fn on_chunk(&mut self, header: &FrameHeader, offset: usize, chunk: &[u8]);

    /// An accepted frame ended
    ///
    /// Called exactly once per accepted frame, on success or failure.
    fn on_finish(&mut self, header: &FrameHeader, outcome: FrameOutcome);
}

/// Everything the reader needs from the layer above
pub trait Dispatch: CommandTable {
    /// The handler registered for `cmd`, if any
    fn handler(&mut self, cmd: CommandId) -> Option<&mut dyn MessageHandler>;
}

impl<T: Dispatch + ?Sized> Dispatch for &mut T {
    fn handler(&mut self, cmd: CommandId) -> Option<&mut dyn MessageHandler> {
        T::handler(self, cmd)
    }
}

/// Errors from handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// No free slot left
    Full,
    /// A handler is already registered for this command
    Duplicate,
    /// The id has no entry in the command table
    UnknownCommand,
}

/// Fixed-capacity map from command id to handler
///
/// Names are resolved through the wrapped [`CommandTable`]; a frame for a
/// command without a registered handler is rejected.
pub struct HandlerRegistry<'a, T, const N: usize> {
    table: T,
    handlers: Vec<(CommandId, &'a mut dyn MessageHandler), N>,
}

impl<'a, T: CommandTable, const N: usize> HandlerRegistry<'a, T, N> {
    /// Create an empty registry over a command table
    pub fn new(table: T) -> Self {
        Self {
            table,
            handlers: Vec::new(),
        }
    }

    /// Register the handler for a command
    pub fn register(
        &mut self,
        cmd: CommandId,
        handler: &'a mut dyn MessageHandler,
    ) -> Result<(), RegistryError> {
        if self.table.describe(cmd).is_none() {
            return Err(RegistryError::UnknownCommand);
        }
        if self.handlers.iter().any(|(id, _)| *id == cmd) {
            return Err(RegistryError::Duplicate);
        }
        self.handlers
            .push((cmd, handler))
            .map_err(|_| RegistryError::Full)
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns true if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T: CommandTable, const N: usize> CommandTable for HandlerRegistry<'_, T, N> {
    fn resolve(&self, name: &CommandName) -> Option<CommandId> {
        self.table.resolve(name)
    }

    fn describe(&self, id: CommandId) -> Option<CommandName> {
        self.table.describe(id)
    }
}

impl<T: CommandTable, const N: usize> Dispatch for HandlerRegistry<'_, T, N> {
    fn handler(&mut self, cmd: CommandId) -> Option<&mut dyn MessageHandler> {
        for (id, handler) in self.handlers.iter_mut() {
            if *id == cmd {
                return Some(&mut **handler);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::StaticCommandTable;
    use crate::frame::MsgType;

    const TABLE: [(CommandId, CommandName); 2] = [
        (CommandId::from_const(0), CommandName::new(*b"ver")),
        (CommandId::from_const(1), CommandName::new(*b"ech")),
    ];

    #[derive(Default)]
    struct Counter {
        accepted: u8,
    }

    impl MessageHandler for Counter {
        fn accept(&mut self, _header: &FrameHeader) -> Option<ChunkSize> {
            self.accepted += 1;
            Some(ChunkSize::SINGLE)
        }

        fn on_chunk(&mut self, _header: &FrameHeader, _offset: usize, _chunk: &[u8]) {}

        fn on_finish(&mut self, _header: &FrameHeader, _outcome: FrameOutcome) {}
    }

    #[test]
    fn test_chunk_size_bounds() {
        assert!(ChunkSize::new(0).is_none());
        assert_eq!(ChunkSize::new(1), Some(ChunkSize::SINGLE));
        assert_eq!(ChunkSize::new(MAX_CHUNK_SIZE), Some(ChunkSize::MAX));
        assert!(ChunkSize::new(MAX_CHUNK_SIZE + 1).is_none());
    }

    #[test]
    fn test_registry_routes_by_id() {
        let mut ver = Counter::default();
        let mut registry: HandlerRegistry<'_, _, 2> =
            HandlerRegistry::new(StaticCommandTable::new(&TABLE));
        registry
            .register(CommandId::from_const(0), &mut ver)
            .unwrap();

        let header = FrameHeader {
            msg_type: MsgType::Request,
            cmd: CommandId::from_const(0),
            len: 4,
        };
        let handler = registry.handler(CommandId::from_const(0)).unwrap();
        assert_eq!(handler.accept(&header), Some(ChunkSize::SINGLE));
        assert!(registry.handler(CommandId::from_const(1)).is_none());

        drop(registry);
        assert_eq!(ver.accepted, 1);
    }

    #[test]
    fn test_registry_rejects_duplicates_and_unknown() {
        let mut a = Counter::default();
        let mut b = Counter::default();
        let mut c = Counter::default();
        let mut registry: HandlerRegistry<'_, _, 4> =
            HandlerRegistry::new(StaticCommandTable::new(&TABLE));

        registry.register(CommandId::from_const(1), &mut a).unwrap();
        assert_eq!(
            registry.register(CommandId::from_const(1), &mut b),
            Err(RegistryError::Duplicate)
        );
        assert_eq!(
            registry.register(CommandId::from_const(9), &mut c),
            Err(RegistryError::UnknownCommand)
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_full() {
        let mut a = Counter::default();
        let mut b = Counter::default();
        let mut registry: HandlerRegistry<'_, _, 1> =
            HandlerRegistry::new(StaticCommandTable::new(&TABLE));

        registry.register(CommandId::from_const(0), &mut a).unwrap();
        assert_eq!(
            registry.register(CommandId::from_const(1), &mut b),
            Err(RegistryError::Full)
        );
    }
}
