//! Packed version ranges
//!
//! A version byte holds a supported range: the high nibble is the newest
//! version a peer speaks, the low nibble the oldest. Two peers agree on the
//! intersection of their ranges.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Supported version range packed as `(max << 4) | min`
///
/// Bytes received from a peer are taken as-is and may describe an empty
/// range; check [`Version::is_valid`] after every [`Version::combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Version(u8);

impl Version {
    /// Versions 0 through 15: what a peer reports before it is configured
    pub const DEBUG: Version = Version(0xF0);

    /// Wrap a packed byte without validation
    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    /// Build a range, rejecting nibbles above 15 and empty ranges
    pub const fn new(max: u8, min: u8) -> Option<Self> {
        if max > 0x0F || min > 0x0F || max < min {
            None
        } else {
            Some(Self((max << 4) | min))
        }
    }

    /// The packed byte
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Newest supported version
    pub const fn max_version(self) -> u8 {
        self.0 >> 4
    }

    /// Oldest supported version
    pub const fn min_version(self) -> u8 {
        self.0 & 0x0F
    }

    /// Returns true if the range is not empty
    pub const fn is_valid(self) -> bool {
        self.max_version() >= self.min_version()
    }

    /// Intersect two ranges
    ///
    /// The result may be empty; see [`Version::intersect`].
    pub const fn combine(self, other: Version) -> Version {
        let max = if self.max_version() < other.max_version() {
            self.max_version()
        } else {
            other.max_version()
        };
        let min = if self.min_version() > other.min_version() {
            self.min_version()
        } else {
            other.min_version()
        };
        Version((max << 4) | min)
    }

    /// Intersect two ranges, `None` if they do not overlap
    pub fn intersect(self, other: Version) -> Option<Version> {
        let combined = self.combine(other);
        combined.is_valid().then_some(combined)
    }

    /// Returns true if `version` lies inside the range
    pub const fn supports(self, version: u8) -> bool {
        version >= self.min_version() && version <= self.max_version()
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::DEBUG
    }
}

impl From<u8> for Version {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl From<Version> for u8 {
    fn from(version: Version) -> Self {
        version.0
    }
}
