//! Little Less frame codec
//!
//! This crate implements the line-oriented framing used between small
//! devices on a point-to-point serial link. Frames are printable ASCII so
//! they can be typed into a terminal or read in a log, yet still carry binary
//! payloads.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌──────┬──────┬───┬─────────┬───┬──────────────────┬───┬──────────┬──────┐
//! │ TYPE │ CMD  │ : │ LEN     │ : │ PAYLOAD          │ : │ CHECKSUM │ \r\n │
//! │ 1ch  │ 3ch  │   │ 2 hex   │   │ hex / "ascii"    │   │ 2 hex    │      │
//! └──────┴──────┴───┴─────────┴───┴──────────────────┴───┴──────────┴──────┘
//! ```
//!
//! Example: `<XyZ:05:AA"abc"BB:FF\r\n` is a response for command `XyZ`
//! carrying the bytes `AA 61 62 63 BB`.
//!
//! Both directions are incremental: [`FrameReader`] consumes one byte per
//! call and hands payload chunks to a [`MessageHandler`]; [`FrameWriter`]
//! writes a frame piece by piece to a [`littleless_hal::ByteSink`].

#![no_std]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod checksum;
pub mod command;
pub mod frame;
pub mod handler;
pub mod hex;
pub mod reader;
pub mod writer;

pub use checksum::{Checksum, Unchecked, Xor8};
pub use command::{CommandEntry, CommandId, CommandName, CommandTable, StaticCommandTable};
pub use frame::{Finished, FrameHeader, FrameOutcome, MsgType, MAX_PAYLOAD_SIZE};
pub use handler::{
    ChunkSize, Dispatch, HandlerRegistry, MessageHandler, RegistryError, MAX_CHUNK_SIZE,
};
pub use reader::FrameReader;
pub use writer::{EncodeError, FrameWriter};
