//! Link driver
//!
//! [`Link`] owns both codec halves and the base command handlers. The
//! application calls [`Link::poll`] from its main loop: each call moves at
//! most one byte in and one pending frame out, so the link never blocks.

use littleless_hal::{ByteSink, ByteSource};
use littleless_protocol::{
    Checksum, CommandId, CommandName, CommandTable, Dispatch, EncodeError, Finished,
    FrameReader, FrameWriter, MessageHandler, MsgType, Unchecked,
};

use crate::commands::{self, is_user, LinkTable, NoCommands, BASE_TABLE};
use crate::config::LinkConfig;
use crate::debug::DebugHandler;
use crate::echo::EchoHandler;
use crate::negotiation::{ConnectionObserver, VersionNegotiator};

/// Transport errors surfaced by [`Link::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<R, W> {
    Read(R),
    Write(W),
}

/// One end of a Little Less link
pub struct Link<O = (), U = NoCommands, C = Unchecked> {
    reader: FrameReader<C>,
    writer: FrameWriter<C>,
    negotiator: VersionNegotiator<O>,
    echo: EchoHandler,
    debug: DebugHandler,
    user: U,
}

impl<O: ConnectionObserver> Link<O> {
    /// Link with only the base commands
    pub fn new(config: LinkConfig, observer: O) -> Self {
        Self::with_commands(config, observer, NoCommands)
    }
}

impl<O: ConnectionObserver, U: Dispatch> Link<O, U> {
    /// Link with application commands dispatched to `user`
    pub fn with_commands(config: LinkConfig, observer: O, user: U) -> Self {
        Self::with_checksum(config, observer, user, Unchecked)
    }
}

impl<O, U, C> Link<O, U, C>
where
    O: ConnectionObserver,
    U: Dispatch,
    C: Checksum + Clone,
{
    pub fn with_checksum(config: LinkConfig, observer: O, user: U, checksum: C) -> Self {
        Self {
            reader: FrameReader::with_checksum(checksum.clone()),
            writer: FrameWriter::with_checksum(checksum),
            negotiator: VersionNegotiator::new(config, observer),
            echo: EchoHandler::new(),
            debug: DebugHandler::new(),
            user,
        }
    }

    /// Read at most one byte, then send at most one pending frame
    ///
    /// Returns the finish notification of a frame that ended with this
    /// byte, if any.
    pub fn poll<R, W>(
        &mut self,
        rx: &mut R,
        tx: &mut W,
    ) -> Result<Option<Finished>, LinkError<R::Error, W::Error>>
    where
        R: ByteSource + ?Sized,
        W: ByteSink + ?Sized,
    {
        let finished = match rx.read_byte().map_err(LinkError::Read)? {
            Some(byte) => self.receive(byte),
            None => None,
        };
        self.send_pending(tx).map_err(LinkError::Write)?;
        Ok(finished)
    }

    /// Feed one received byte to the frame reader
    pub fn receive(&mut self, byte: u8) -> Option<Finished> {
        let mut router = Router {
            negotiator: &mut self.negotiator,
            echo: &mut self.echo,
            debug: &mut self.debug,
            user: &mut self.user,
        };
        self.reader.feed(byte, &mut router)
    }

    /// Send one pending handshake or echo reply
    ///
    /// Handshake frames take priority. Encoding errors other than sink
    /// failures drop the frame and are only logged.
    pub fn send_pending<W: ByteSink + ?Sized>(&mut self, tx: &mut W) -> Result<bool, W::Error> {
        let sent = match self.negotiator.poll_send(&mut self.writer, tx, &BASE_TABLE) {
            Ok(false) => self.echo.poll_send(&mut self.writer, tx, &BASE_TABLE),
            other => other,
        };
        match sent {
            Ok(sent) => Ok(sent),
            Err(EncodeError::Sink(e)) => Err(e),
            Err(_) => {
                warn!("pending frame dropped");
                Ok(false)
            }
        }
    }

    /// Write a complete application frame
    pub fn send<W: ByteSink + ?Sized>(
        &mut self,
        tx: &mut W,
        msg_type: MsgType,
        cmd: CommandId,
        payload: &[u8],
    ) -> Result<(), EncodeError<W::Error>> {
        let table = LinkTable::new(&self.user);
        self.writer.send_frame(tx, &table, msg_type, cmd, payload)
    }

    /// Writer and command table for building a frame piece by piece
    pub fn writer(&mut self) -> (&mut FrameWriter<C>, LinkTable<'_, U>) {
        (&mut self.writer, LinkTable::new(&self.user))
    }

    /// Returns true if a new outgoing frame can be started
    pub fn can_send(&self) -> bool {
        self.writer.can_send()
    }

    /// Queue a handshake request
    pub fn request_handshake(&mut self) {
        self.negotiator.request_handshake();
    }

    pub fn is_connected(&self) -> bool {
        self.negotiator.is_connected()
    }

    pub fn negotiator(&self) -> &VersionNegotiator<O> {
        &self.negotiator
    }

    pub fn negotiator_mut(&mut self) -> &mut VersionNegotiator<O> {
        &mut self.negotiator
    }

    pub fn debug(&self) -> &DebugHandler {
        &self.debug
    }

    pub fn user(&self) -> &U {
        &self.user
    }

    pub fn user_mut(&mut self) -> &mut U {
        &mut self.user
    }

    /// Returns true if no frame is being received
    pub fn is_idle(&self) -> bool {
        self.reader.is_idle()
    }
}

/// Routes frames to the base handlers or the application
struct Router<'a, O, U> {
    negotiator: &'a mut VersionNegotiator<O>,
    echo: &'a mut EchoHandler,
    debug: &'a mut DebugHandler,
    user: &'a mut U,
}

impl<O, U: CommandTable> CommandTable for Router<'_, O, U> {
    fn resolve(&self, name: &CommandName) -> Option<CommandId> {
        LinkTable::new(&*self.user).resolve(name)
    }

    fn describe(&self, id: CommandId) -> Option<CommandName> {
        LinkTable::new(&*self.user).describe(id)
    }
}

impl<O: ConnectionObserver, U: Dispatch> Dispatch for Router<'_, O, U> {
    fn handler(&mut self, cmd: CommandId) -> Option<&mut dyn MessageHandler> {
        match cmd {
            commands::VERSION => Some(&mut *self.negotiator),
            commands::ECHO => Some(&mut *self.echo),
            commands::DEBUG => Some(&mut *self.debug),
            id if is_user(id) => self.user.handler(id),
            _ => None,
        }
    }
}
