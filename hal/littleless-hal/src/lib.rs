//! Little Less Hardware Abstraction Layer
//!
//! This crate defines the byte transport the protocol runs over. Anything
//! that can hand out received bytes one at a time without blocking and accept
//! outgoing bytes can carry Little Less frames: a UART, a USB CDC pipe, or an
//! in-memory buffer in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  littleless-core (link, negotiation)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  littleless-protocol (frame codec)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  littleless-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  embedded-io  │       │   heapless    │
//! │  (IoPort)     │       │  Deque / Vec  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::ByteSource`] - Non-blocking byte input
//! - [`uart::ByteSink`] - Byte output

#![no_std]
#![deny(unsafe_code)]

#[cfg(feature = "embedded-io")]
pub mod io;
pub mod uart;

// Re-export key traits at crate root for convenience
#[cfg(feature = "embedded-io")]
pub use io::IoPort;
pub use uart::{BufferFull, ByteSink, ByteSource};
