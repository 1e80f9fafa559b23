//! GUID type with the canonical `8-4-4-4-12` hyphenated text form.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A 16-byte globally unique identifier.
///
/// Bytes are stored in text order: the first byte renders as the first two
/// hex digits. Format: `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Guid {
    bytes: [u8; 16],
}

/// Positions of the hex pairs within the 36-character text form.
const PAIR_OFFSETS: [usize; 16] = [0, 2, 4, 6, 9, 11, 14, 16, 19, 21, 24, 26, 28, 30, 32, 34];

impl Guid {
    /// Empty GUID (all zeros).
    pub const EMPTY: Self = Self { bytes: [0; 16] };

    /// Create a GUID from raw bytes.
    #[inline]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Create a GUID from a 128-bit integer (big-endian byte order).
    #[inline]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            bytes: value.to_be_bytes(),
        }
    }

    /// Get the raw bytes of the GUID.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Check if the GUID is empty (all zeros).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes == [0; 16]
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3],
            b[4], b[5],
            b[6], b[7],
            b[8], b[9],
            b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Registry-style braces are accepted on input.
        let s = s.trim();
        let s = s
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(s);

        if s.len() != 36 || !s.is_ascii() {
            return Err(Error::InvalidGuid(format!(
                "expected 36 characters, got {}",
                s.len()
            )));
        }

        let raw = s.as_bytes();
        if raw[8] != b'-' || raw[13] != b'-' || raw[18] != b'-' || raw[23] != b'-' {
            return Err(Error::InvalidGuid("invalid hyphen positions".into()));
        }

        let mut bytes = [0u8; 16];
        for (byte, &start) in bytes.iter_mut().zip(PAIR_OFFSETS.iter()) {
            *byte = u8::from_str_radix(&s[start..start + 2], 16)
                .map_err(|_| Error::InvalidGuid(format!("invalid hex at position {}", start)))?;
        }

        Ok(Self { bytes })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Guid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Guid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
