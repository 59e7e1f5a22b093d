//! Little Less link layer
//!
//! Builds a usable link on top of the frame codec:
//!
//! - Version ranges and their intersection
//! - The `ver` handshake that connects two peers
//! - The base commands `ver`, `ech` and `dbg`
//! - Link configuration (application identity, supported versions)
//! - A poll-driven [`Link`] tying reader, writer and handlers together
//!
//! ```text
//! ByteSource ──▶ FrameReader ──▶ Router ──┬──▶ VersionNegotiator
//!                                         ├──▶ EchoHandler
//!                                         ├──▶ DebugHandler
//!                                         └──▶ application Dispatch
//! ByteSink   ◀── FrameWriter ◀── pending handshake / echo replies
//! ```

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod commands;
pub mod config;
pub mod debug;
pub mod echo;
pub mod link;
pub mod negotiation;
pub mod version;

pub use commands::{LinkTable, NoCommands, FIRST_USER};
pub use config::{ConfigError, LinkConfig, MAX_IDENTITY_LEN};
pub use link::{Link, LinkError};
pub use negotiation::{ConnectionObserver, HandshakeState, VersionNegotiator};
pub use version::Version;
