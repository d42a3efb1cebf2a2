// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot core configuration - single source of truth.
//!
//! This module centralizes ALL wire constants and capacity defaults.
//! **NEVER hardcode elsewhere!**
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (buffer sizes, sentinels)
//! - **Level 2 (Dynamic)**: [`RuntimeConfig`] for host-tunable feature toggles
//!
//! Feature toggles are published through `ArcSwap` so the host can flip them
//! between ticks without taking a lock on the replication path.

use arc_swap::ArcSwap;
use std::sync::Arc;

// =======================================================================
// Capacity Defaults
// =======================================================================

/// Size in bytes of the variable arena (and of the receive staging buffer).
///
/// Every serialized variable value lives somewhere in `[0, BUF_SIZE)`;
/// entry positions are carried on the wire as `u16`, so this must stay
/// below 65536.
pub const BUF_SIZE: usize = 30000;

/// Maximum number of variable entries in the snapshot table.
pub const MAX_ENTRIES: usize = 2000;

/// Maximum number of pending spawn commands.
pub const MAX_SPAWNS: usize = 100;

/// Sequence window after which unacknowledged sent-spawn records are pruned.
///
/// Measured in outbound messages per client (wrapping `u16` distance). A
/// peer that has not acknowledged a spawn within this many messages will
/// still receive retransmissions; only the ack bookkeeping for long-dead
/// sequences is dropped.
pub const SENT_SPAWN_ACK_WINDOW: u16 = 64;

// =======================================================================
// Wire Sentinels
// =======================================================================
// A fixed 16-bit constant is embedded between message sections so framing
// corruption is caught at the section boundary instead of misparsing the
// rest of the message. Each section uses the base value plus its index.
// =======================================================================

/// Sentinel written after the message header (tick + sequence).
pub const SENTINEL_HEADER: u16 = 0x4246;

/// Sentinel written after the buffer + index sections.
pub const SENTINEL_INDEX: u16 = SENTINEL_HEADER + 1;

/// Sentinel written after the spawn section.
pub const SENTINEL_SPAWN: u16 = SENTINEL_HEADER + 2;

/// Sentinel terminating the message, after the ack section.
pub const SENTINEL_ACK: u16 = SENTINEL_HEADER + 3;

/// Trailing guard on each serialized spawn body (widened to `u32` on the
/// wire).
pub const SPAWN_GUARD: u32 = SENTINEL_HEADER as u32;

// =======================================================================
// Capacity Tuning
// =======================================================================

/// Capacity tuning for one snapshot store.
///
/// The defaults match the compile-time constants above; embedders with
/// smaller worlds can shrink them at construction time. Capacities are
/// fixed for the life of the store.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotLimits {
    /// Arena size in bytes (must stay below 65536).
    pub buf_size: usize,
    /// Maximum variable entries.
    pub max_entries: usize,
    /// Maximum pending spawns.
    pub max_spawns: usize,
}

impl SnapshotLimits {
    /// Handle slots reserved in the index allocator.
    ///
    /// Twice the entry count so that one free gap between each pair of
    /// live allocations stays representable during reallocation churn.
    pub fn allocator_slots(&self) -> usize {
        2 * self.max_entries
    }
}

impl Default for SnapshotLimits {
    fn default() -> Self {
        Self {
            buf_size: BUF_SIZE,
            max_entries: MAX_ENTRIES,
            max_spawns: MAX_SPAWNS,
        }
    }
}

// =======================================================================
// Runtime Feature Toggles
// =======================================================================

/// Global replication feature toggles.
///
/// When both are disabled the per-tick snapshot hook is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureToggles {
    /// Capture and transmit variable deltas.
    pub delta_enabled: bool,
    /// Capture and transmit spawn commands.
    pub spawn_enabled: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self {
            delta_enabled: true,
            spawn_enabled: true,
        }
    }
}

/// Host-tunable runtime configuration.
///
/// Toggle reads happen once per tick on the replication path; writes come
/// from the host at arbitrary times. `ArcSwap` gives lock-free reads with
/// atomic whole-struct replacement on write.
#[derive(Debug)]
pub struct RuntimeConfig {
    toggles: ArcSwap<FeatureToggles>,
}

impl RuntimeConfig {
    /// Create a configuration with both replication features enabled.
    pub fn new() -> Self {
        Self {
            toggles: ArcSwap::from_pointee(FeatureToggles::default()),
        }
    }

    /// Current feature toggles (lock-free snapshot).
    pub fn toggles(&self) -> FeatureToggles {
        **self.toggles.load()
    }

    /// Replace the feature toggles atomically.
    pub fn set_toggles(&self, toggles: FeatureToggles) {
        self.toggles.store(Arc::new(toggles));
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}
