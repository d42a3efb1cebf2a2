// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Errors returned by snapshot replication operations.

use crate::core::ser::SerError;

/// Errors surfaced by the snapshot core.
///
/// All failures are handled locally by the caller that observes them:
/// receive-path integrity errors discard the rest of the message but leave
/// connection state intact, and capacity errors drop the single update that
/// did not fit.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Integrity Errors
    // ========================================================================
    /// A framing sentinel did not match during receive parsing. Parsing of
    /// the remaining sections is abandoned.
    SentinelMismatch {
        /// Section whose trailing sentinel failed verification.
        section: &'static str,
        /// Sentinel value expected at this boundary.
        expected: u16,
        /// Value actually read from the wire.
        found: u16,
    },

    // ========================================================================
    // Capacity Errors
    // ========================================================================
    /// The variable entry table is full; the update was dropped.
    EntryTableFull,
    /// The spawn table is full; the spawn was dropped.
    SpawnTableFull,
    /// The index allocator could not place the requested region; the
    /// variable update was dropped.
    ArenaExhausted {
        /// Region size in bytes that could not be placed.
        requested: usize,
    },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// Wire-level encode/decode failure.
    Ser(SerError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::SentinelMismatch {
                section,
                expected,
                found,
            } => write!(
                f,
                "snapshot framing corrupt after {} section: expected sentinel 0x{:04X}, found 0x{:04X}",
                section, expected, found
            ),
            Error::EntryTableFull => write!(f, "variable entry table full"),
            Error::SpawnTableFull => write!(f, "spawn table full"),
            Error::ArenaExhausted { requested } => {
                write!(f, "variable arena exhausted ({} bytes requested)", requested)
            }
            Error::Ser(e) => write!(f, "serialization failed: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Ser(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SerError> for Error {
    fn from(e: SerError) -> Self {
        Error::Ser(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
