//! Link configuration
//!
//! The identity a peer announces during the version handshake. Names and
//! extra strings are carried in a single nibble each, so both are capped at
//! fifteen bytes.

use heapless::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::version::Version;

/// Maximum length of the application name and extra string
pub const MAX_IDENTITY_LEN: usize = 15;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Name or extra string longer than [`MAX_IDENTITY_LEN`]
    IdentityTooLong,
    /// Version range is empty
    InvalidVersion,
}

/// Identity and version ranges of the local peer
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkConfig {
    /// Application name, must match the peer's exactly
    pub name: String<MAX_IDENTITY_LEN>,
    /// Free-form string sent along, not compared
    pub extra: String<MAX_IDENTITY_LEN>,
    /// Supported application versions
    pub app_version: Version,
    /// Supported protocol versions
    #[cfg_attr(feature = "serde", serde(default))]
    pub protocol_version: Version,
}

impl LinkConfig {
    /// Build a configuration with the debug protocol version range
    pub fn new(name: &str, extra: &str, app_version: Version) -> Result<Self, ConfigError> {
        let config = Self {
            name: identity(name)?,
            extra: identity(extra)?,
            app_version,
            protocol_version: Version::DEBUG,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the supported protocol version range
    pub fn with_protocol_version(mut self, version: Version) -> Result<Self, ConfigError> {
        self.protocol_version = version;
        self.validate()?;
        Ok(self)
    }

    /// Check the version ranges
    ///
    /// String lengths are enforced by their capacity; this is mostly useful
    /// for configurations that were deserialized.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.app_version.is_valid() || !self.protocol_version.is_valid() {
            return Err(ConfigError::InvalidVersion);
        }
        Ok(())
    }

    /// Identity length byte: name length high nibble, extra length low
    pub(crate) fn identity_lengths(&self) -> u8 {
        ((self.name.len() as u8) << 4) | (self.extra.len() as u8 & 0x0F)
    }
}

fn identity(s: &str) -> Result<String<MAX_IDENTITY_LEN>, ConfigError> {
    let mut out = String::new();
    out.push_str(s).map_err(|_| ConfigError::IdentityTooLong)?;
    Ok(out)
}
