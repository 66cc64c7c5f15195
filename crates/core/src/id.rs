// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity identifiers.
//!
//! Every entity id is `PREFIX-<10 hex>` (e.g. `TASK-4f09c2d1ab`), at most 15
//! ASCII bytes, so ids are stored inline in a zero-padded array and stay
//! `Copy`. Architecture decision records use the shorter `ADR-<6 hex>` form
//! built directly from [`hex_suffix`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inline capacity: one byte above the longest generated id (`TASK-` + 10).
pub const SHORT_ID_CAP: usize = 16;

const HEX: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

/// Random lowercase-hex tail of `len` characters.
pub fn hex_suffix(len: usize) -> String {
    nanoid::nanoid!(len, &HEX)
}

/// Zero-padded inline id storage.
///
/// Equality and hashing work on the whole padded array, so two ids are equal
/// exactly when their strings are. Input longer than the capacity is cut at
/// a character boundary; a truncated foreign id simply never matches any
/// generated one, which is all lookups need.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortId {
    bytes: [u8; SHORT_ID_CAP],
}

impl ShortId {
    pub fn parse(raw: &str) -> Self {
        let mut end = raw.len().min(SHORT_ID_CAP);
        while end > 0 && !raw.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; SHORT_ID_CAP];
        bytes[..end].copy_from_slice(&raw.as_bytes()[..end]);
        Self { bytes }
    }

    pub fn as_str(&self) -> &str {
        let end = self
            .bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(SHORT_ID_CAP);
        std::str::from_utf8(&self.bytes[..end]).unwrap_or("")
    }
}

impl fmt::Debug for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ShortId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ShortId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Declare an id newtype with a dash-terminated prefix and a 10-character
/// random hex tail.
///
/// ```ignore
/// crate::id::id_type! {
///     /// Doc comment for the id type.
///     TaskId, "TASK-"
/// }
/// ```
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal $(,)?) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($crate::id::ShortId);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Mint a fresh random id.
            pub fn new() -> Self {
                let mut raw = String::from(Self::PREFIX);
                raw.push_str(&$crate::id::hex_suffix(10));
                Self($crate::id::ShortId::parse(&raw))
            }

            /// Wrap an id received from a caller or a stored document.
            pub fn from_string(raw: impl AsRef<str>) -> Self {
                Self($crate::id::ShortId::parse(raw.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.as_str() == *other
            }
        }
    };
}

pub(crate) use id_type;

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
