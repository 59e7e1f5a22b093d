//! Version handshake
//!
//! Either peer opens with a `ver` request; the other answers with a `ver`
//! response. Both frames carry the same payload:
//!
//! ```text
//! ┌──────────┬─────────┬──────────┬─────────────┬──────────┬───────────┐
//! │ PROTOCOL │ APP     │ COMBINED │ LENGTHS     │ NAME     │ EXTRA     │
//! │ version  │ version │ app ver. │ name│extra  │ 0-15 B   │ 0-15 B    │
//! └──────────┴─────────┴──────────┴─────────────┴──────────┴───────────┘
//! ```
//!
//! The receiver intersects each range with its own and requires the
//! application names to match. A complete and consistent frame marks the
//! link connected; anything else marks it disconnected.

use littleless_hal::ByteSink;
use littleless_protocol::{
    Checksum, ChunkSize, CommandTable, EncodeError, FrameHeader, FrameOutcome, FrameWriter,
    MessageHandler, MsgType,
};

use crate::commands::VERSION;
use crate::config::LinkConfig;
use crate::version::Version;

/// Fixed bytes ahead of the name in a `ver` payload
pub const VERSION_HEADER_LEN: u8 = 4;

/// Notified when the link connects or disconnects
pub trait ConnectionObserver {
    fn connection_changed(&mut self, connected: bool);
}

impl ConnectionObserver for () {
    fn connection_changed(&mut self, _connected: bool) {}
}

impl<T: ConnectionObserver + ?Sized> ConnectionObserver for &mut T {
    fn connection_changed(&mut self, connected: bool) {
        (**self).connection_changed(connected)
    }
}

/// Progress through a `ver` payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandshakeState {
    /// No handshake yet
    Disconnected,
    WaitProtocolVersion,
    WaitAppVersion,
    WaitCombinedVersion,
    WaitIdentityLengths,
    WaitName,
    WaitExtra,
    /// Payload consumed, waiting for the frame to end
    WaitDone,
    /// Handshake rejected; stays here until the next `ver` frame
    Failed,
    /// Last handshake succeeded
    Connected,
}

/// Handler for the `ver` command
pub struct VersionNegotiator<O = ()> {
    config: LinkConfig,
    observer: O,
    state: HandshakeState,
    connected: bool,
    protocol_version: Version,
    peer_version: Version,
    combined_version: Version,
    name_len: u8,
    extra_len: u8,
    position: u8,
    reply_pending: bool,
    request_pending: bool,
}

impl<O: ConnectionObserver> VersionNegotiator<O> {
    pub fn new(config: LinkConfig, observer: O) -> Self {
        Self {
            protocol_version: config.protocol_version,
            peer_version: Version::DEBUG,
            combined_version: config.app_version,
            config,
            observer,
            state: HandshakeState::Disconnected,
            connected: false,
            name_len: 0,
            extra_len: 0,
            position: 0,
            reply_pending: false,
            request_pending: false,
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Negotiated protocol range, the local range while disconnected
    pub fn protocol_version(&self) -> Version {
        self.protocol_version
    }

    /// Application range reported by the peer
    pub fn peer_version(&self) -> Version {
        self.peer_version
    }

    /// Intersection of the local and peer application ranges
    pub fn combined_version(&self) -> Version {
        self.combined_version
    }

    /// Application version to expect in frames from the peer
    pub fn effective_rx_version(&self) -> u8 {
        self.peer_version.max_version()
    }

    /// Application version to use in frames to the peer
    pub fn effective_tx_version(&self) -> u8 {
        self.combined_version.max_version()
    }

    /// Queue a `ver` request; sent by [`VersionNegotiator::poll_send`]
    pub fn request_handshake(&mut self) {
        self.request_pending = true;
    }

    /// Returns true if a response or request is waiting to be sent
    pub fn has_pending_send(&self) -> bool {
        self.reply_pending || self.request_pending
    }

    /// Send the pending `ver` frame, if any and if the writer is free
    ///
    /// A pending response goes out before a pending request. Returns
    /// whether a frame was written.
    pub fn poll_send<C, S, T>(
        &mut self,
        writer: &mut FrameWriter<C>,
        sink: &mut S,
        table: &T,
    ) -> Result<bool, EncodeError<S::Error>>
    where
        C: Checksum,
        S: ByteSink + ?Sized,
        T: CommandTable + ?Sized,
    {
        if !writer.can_send() {
            return Ok(false);
        }

        let msg_type = if self.reply_pending {
            self.reply_pending = false;
            MsgType::Response
        } else if self.request_pending {
            self.request_pending = false;
            MsgType::Request
        } else {
            return Ok(false);
        };

        self.send_version(writer, sink, table, msg_type)?;
        Ok(true)
    }

    fn send_version<C, S, T>(
        &self,
        writer: &mut FrameWriter<C>,
        sink: &mut S,
        table: &T,
        msg_type: MsgType,
    ) -> Result<(), EncodeError<S::Error>>
    where
        C: Checksum,
        S: ByteSink + ?Sized,
        T: CommandTable + ?Sized,
    {
        let config = &self.config;
        let len = VERSION_HEADER_LEN + config.name.len() as u8 + config.extra.len() as u8;

        debug!(
            "sending ver {}, app {=u8:#x} combined {=u8:#x}",
            msg_type,
            config.app_version.raw(),
            self.combined_version.raw()
        );

        writer.start_frame(sink, table, msg_type, VERSION, len)?;
        if let Err(e) = self.send_payload(writer, sink) {
            let _ = writer.abort_frame(sink);
            return Err(e);
        }
        writer.end_frame(sink)
    }

    fn send_payload<C, S>(
        &self,
        writer: &mut FrameWriter<C>,
        sink: &mut S,
    ) -> Result<(), EncodeError<S::Error>>
    where
        C: Checksum,
        S: ByteSink + ?Sized,
    {
        let config = &self.config;
        writer.send_byte(sink, config.protocol_version.raw())?;
        writer.send_byte(sink, config.app_version.raw())?;
        writer.send_byte(sink, self.combined_version.raw())?;
        writer.send_byte(sink, config.identity_lengths())?;
        writer.send_str(sink, config.name.as_bytes())?;
        writer.send_str(sink, config.extra.as_bytes())
    }

    /// Advance over one payload byte
    fn step(&mut self, byte: u8) -> HandshakeState {
        use HandshakeState::*;

        match self.state {
            WaitProtocolVersion => {
                self.protocol_version = self.config.protocol_version.combine(Version::from_raw(byte));
                if self.protocol_version.is_valid() {
                    WaitAppVersion
                } else {
                    warn!("no common protocol version with peer {=u8:#x}", byte);
                    Failed
                }
            }
            WaitAppVersion => {
                self.peer_version = Version::from_raw(byte);
                WaitCombinedVersion
            }
            WaitCombinedVersion => {
                self.peer_version = self.peer_version.combine(Version::from_raw(byte));
                self.combined_version = self.config.app_version.combine(self.peer_version);
                if self.combined_version.is_valid() {
                    WaitIdentityLengths
                } else {
                    warn!(
                        "no common app version, local {=u8:#x} peer {=u8:#x}",
                        self.config.app_version.raw(),
                        self.peer_version.raw()
                    );
                    Failed
                }
            }
            WaitIdentityLengths => {
                self.name_len = byte >> 4;
                self.extra_len = byte & 0x0F;
                self.position = 0;
                if self.name_len as usize != self.config.name.len() {
                    warn!("peer name has {} bytes, expected {}", self.name_len, self.config.name.len());
                    Failed
                } else if self.name_len > 0 {
                    WaitName
                } else {
                    self.after_name()
                }
            }
            WaitName => {
                let expected = self.config.name.as_bytes()[self.position as usize];
                if byte != expected {
                    warn!("peer name differs at byte {}", self.position);
                    return Failed;
                }
                self.position += 1;
                if self.position < self.name_len {
                    WaitName
                } else {
                    self.after_name()
                }
            }
            WaitExtra => {
                self.position += 1;
                if self.position < self.extra_len {
                    WaitExtra
                } else {
                    WaitDone
                }
            }
            WaitDone => {
                warn!("trailing byte in ver payload");
                Failed
            }
            Failed | Disconnected | Connected => Failed,
        }
    }

    fn after_name(&mut self) -> HandshakeState {
        self.position = 0;
        if self.extra_len > 0 {
            HandshakeState::WaitExtra
        } else {
            HandshakeState::WaitDone
        }
    }

    fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            self.connected = connected;
            info!("link {}", if connected { "connected" } else { "disconnected" });
            self.observer.connection_changed(connected);
        }
    }
}

impl<O: ConnectionObserver> MessageHandler for VersionNegotiator<O> {
    fn accept(&mut self, header: &FrameHeader) -> Option<ChunkSize> {
        if header.len < VERSION_HEADER_LEN {
            warn!("ver frame too short: {} bytes", header.len);
            return None;
        }
        self.state = HandshakeState::WaitProtocolVersion;
        Some(ChunkSize::MAX)
    }

    fn on_chunk(&mut self, _header: &FrameHeader, _offset: usize, chunk: &[u8]) {
        for &byte in chunk {
            self.state = self.step(byte);
        }
    }

    fn on_finish(&mut self, header: &FrameHeader, outcome: FrameOutcome) {
        if outcome.is_ok() && self.state == HandshakeState::WaitDone {
            self.state = HandshakeState::Connected;
            if header.msg_type == MsgType::Request {
                self.reply_pending = true;
            }
            debug!(
                "handshake ok: rx v{} tx v{}",
                self.effective_rx_version(),
                self.effective_tx_version()
            );
            self.set_connected(true);
        } else {
            if self.state != HandshakeState::Failed {
                debug!("ver frame ended in {}: {}", self.state, outcome);
            }
            self.state = HandshakeState::Failed;
            self.protocol_version = self.config.protocol_version;
            self.set_connected(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BASE_TABLE;
    use heapless::Vec;

    #[derive(Default)]
    struct Changes(Vec<bool, 8>);

    impl ConnectionObserver for Changes {
        fn connection_changed(&mut self, connected: bool) {
            self.0.push(connected).unwrap();
        }
    }

    fn negotiator(app: u8) -> VersionNegotiator<Changes> {
        let config = LinkConfig::new("Test", "Mock", Version::from_raw(app)).unwrap();
        VersionNegotiator::new(config, Changes::default())
    }

    fn header(msg_type: MsgType, len: usize) -> FrameHeader {
        FrameHeader {
            msg_type,
            cmd: VERSION,
            len: len as u8,
        }
    }

    /// Deliver a whole payload in one chunk
    fn deliver(
        neg: &mut VersionNegotiator<Changes>,
        msg_type: MsgType,
        payload: &[u8],
        outcome: FrameOutcome,
    ) {
        let header = header(msg_type, payload.len());
        assert!(neg.accept(&header).is_some());
        neg.on_chunk(&header, 0, payload);
        neg.on_finish(&header, outcome);
    }

    const TEST_APP: &[u8] = b"\x10\x10\x10\x43TestApp";

    #[test]
    fn test_request_connects_and_queues_reply() {
        let mut neg = negotiator(0xF0);
        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Complete);

        assert!(neg.is_connected());
        assert_eq!(neg.state(), HandshakeState::Connected);
        assert_eq!(neg.effective_rx_version(), 1);
        assert_eq!(neg.effective_tx_version(), 1);
        assert_eq!(neg.combined_version().raw(), 0x10);
        assert!(neg.has_pending_send());
        assert_eq!(&neg.observer().0[..], &[true]);
    }

    #[test]
    fn test_response_connects_without_reply() {
        let mut neg = negotiator(0xF0);
        deliver(&mut neg, MsgType::Response, TEST_APP, FrameOutcome::Complete);

        assert!(neg.is_connected());
        assert!(!neg.has_pending_send());
    }

    #[test]
    fn test_chunking_does_not_matter() {
        let mut neg = negotiator(0xF0);
        let header = header(MsgType::Response, TEST_APP.len());
        neg.accept(&header);
        for (i, byte) in TEST_APP.iter().enumerate() {
            neg.on_chunk(&header, i, core::slice::from_ref(byte));
        }
        neg.on_finish(&header, FrameOutcome::Complete);
        assert!(neg.is_connected());
    }

    #[test]
    fn test_name_mismatch() {
        let mut neg = negotiator(0xF0);
        deliver(
            &mut neg,
            MsgType::Request,
            b"\x10\x10\x10\x43TesxApp",
            FrameOutcome::Complete,
        );

        assert!(!neg.is_connected());
        assert_eq!(neg.state(), HandshakeState::Failed);
        assert!(!neg.has_pending_send());
        assert!(neg.observer().0.is_empty());
    }

    #[test]
    fn test_name_length_mismatch() {
        let mut neg = negotiator(0xF0);
        deliver(
            &mut neg,
            MsgType::Request,
            b"\x10\x10\x10\x30Tes",
            FrameOutcome::Complete,
        );
        assert_eq!(neg.state(), HandshakeState::Failed);
    }

    #[test]
    fn test_disjoint_app_versions() {
        let mut neg = negotiator(0x55);
        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Complete);

        assert!(!neg.is_connected());
        assert_eq!(neg.state(), HandshakeState::Failed);
    }

    #[test]
    fn test_disjoint_protocol_versions() {
        let mut neg = negotiator(0xF0);
        deliver(
            &mut neg,
            MsgType::Request,
            b"\x0F\x10\x10\x43TestApp",
            FrameOutcome::Complete,
        );

        assert!(!neg.is_connected());
        assert_eq!(neg.protocol_version(), Version::DEBUG);
    }

    #[test]
    fn test_peer_combined_narrows_peer_range() {
        let mut neg = negotiator(0xF0);
        deliver(
            &mut neg,
            MsgType::Response,
            b"\xF0\x51\x32\x40Test",
            FrameOutcome::Complete,
        );
        assert!(neg.is_connected());
        assert_eq!(neg.peer_version().raw(), 0x32);
        assert_eq!(neg.effective_rx_version(), 3);
        assert_eq!(neg.combined_version().raw(), 0x32);
    }

    #[test]
    fn test_empty_name_and_extra() {
        let config = LinkConfig::new("", "", Version::DEBUG).unwrap();
        let mut neg = VersionNegotiator::new(config, ());
        let header = header(MsgType::Request, 4);
        neg.accept(&header);
        neg.on_chunk(&header, 0, b"\xF0\x21\x21\x00");
        assert_eq!(neg.state(), HandshakeState::WaitDone);
        neg.on_finish(&header, FrameOutcome::Complete);
        assert!(neg.is_connected());
    }

    #[test]
    fn test_empty_name_with_extra() {
        let config = LinkConfig::new("", "", Version::DEBUG).unwrap();
        let mut neg = VersionNegotiator::new(config, ());
        let header = header(MsgType::Request, 6);
        neg.accept(&header);
        neg.on_chunk(&header, 0, b"\xF0\x21\x21\x02");
        assert_eq!(neg.state(), HandshakeState::WaitExtra);
        neg.on_chunk(&header, 4, b"hi");
        assert_eq!(neg.state(), HandshakeState::WaitDone);
    }

    #[test]
    fn test_short_frame_rejected() {
        let mut neg = negotiator(0xF0);
        assert!(neg.accept(&header(MsgType::Request, 3)).is_none());
        assert_eq!(neg.state(), HandshakeState::Disconnected);
    }

    #[test]
    fn test_incomplete_frame_disconnects() {
        let mut neg = negotiator(0xF0);
        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Complete);
        assert!(neg.is_connected());

        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Truncated);
        assert!(!neg.is_connected());
        assert_eq!(&neg.observer().0[..], &[true, false]);
    }

    #[test]
    fn test_missing_bytes_fail() {
        let mut neg = negotiator(0xF0);
        deliver(
            &mut neg,
            MsgType::Request,
            b"\x10\x10\x10\x43Test",
            FrameOutcome::Complete,
        );
        assert!(!neg.is_connected());
        assert_eq!(neg.state(), HandshakeState::Failed);
    }

    #[test]
    fn test_repeated_success_notifies_once() {
        let mut neg = negotiator(0xF0);
        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Complete);
        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Complete);
        deliver(&mut neg, MsgType::Response, TEST_APP, FrameOutcome::Complete);
        assert_eq!(&neg.observer().0[..], &[true]);
    }

    #[test]
    fn test_reply_payload() {
        let mut neg = negotiator(0xF0);
        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Complete);

        let mut out: Vec<u8, 64> = Vec::new();
        let mut writer = FrameWriter::new();
        assert_eq!(neg.poll_send(&mut writer, &mut out, &BASE_TABLE), Ok(true));
        assert_eq!(&out[..], b"<ver:0C:F0F01044\"Test\"\"Mock\":FF\r\n");

        // nothing left
        assert_eq!(neg.poll_send(&mut writer, &mut out, &BASE_TABLE), Ok(false));
    }

    #[test]
    fn test_request_uses_own_range() {
        let mut neg = negotiator(0x31);
        neg.request_handshake();

        let mut out: Vec<u8, 64> = Vec::new();
        let mut writer = FrameWriter::new();
        assert_eq!(neg.poll_send(&mut writer, &mut out, &BASE_TABLE), Ok(true));
        assert_eq!(&out[..], b">ver:0C:F0313144\"Test\"\"Mock\":FF\r\n");
    }

    #[test]
    fn test_reply_before_request() {
        let mut neg = negotiator(0xF0);
        neg.request_handshake();
        deliver(&mut neg, MsgType::Request, TEST_APP, FrameOutcome::Complete);

        let mut out: Vec<u8, 128> = Vec::new();
        let mut writer = FrameWriter::new();
        neg.poll_send(&mut writer, &mut out, &BASE_TABLE).unwrap();
        assert_eq!(out[0], b'<');

        out.clear();
        neg.poll_send(&mut writer, &mut out, &BASE_TABLE).unwrap();
        assert_eq!(out[0], b'>');
        assert!(!neg.has_pending_send());
    }

    #[test]
    fn test_busy_writer_keeps_pending() {
        let mut neg = negotiator(0xF0);
        neg.request_handshake();

        let mut out: Vec<u8, 64> = Vec::new();
        let mut writer = FrameWriter::new();
        writer
            .start_frame(&mut out, &BASE_TABLE, MsgType::Update, VERSION, 0)
            .unwrap();

        assert_eq!(neg.poll_send(&mut writer, &mut out, &BASE_TABLE), Ok(false));
        assert!(neg.has_pending_send());
    }
}
