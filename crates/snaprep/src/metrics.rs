// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot replication metrics.
//!
//! Lock-free atomic counters incremented from the send/receive hot paths.
//! Capacity drops are invisible in the data flow (the update is simply
//! absent from the next snapshot), so the counters are the place they
//! become observable.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter collector for one snapshot system.
///
/// All updates use relaxed ordering; readers see eventually consistent
/// totals, which is sufficient for drop detection and dashboards.
#[derive(Debug, Default)]
pub struct SnapshotMetrics {
    /// Snapshot messages composed and committed to the transport.
    snapshots_sent: AtomicU64,
    /// Snapshot messages parsed to completion.
    snapshots_received: AtomicU64,
    /// Variable updates dropped because the entry table was full.
    entries_dropped: AtomicU64,
    /// Spawns dropped because the spawn table was full.
    spawns_dropped: AtomicU64,
    /// Arena placements that failed (variable update dropped).
    alloc_failures: AtomicU64,
    /// Sentinel or guard mismatches during receive parsing.
    integrity_errors: AtomicU64,
    /// Received entries ignored because the local tick was newer or equal.
    stale_entries: AtomicU64,
    /// Received spawns ignored because the object already applied a spawn
    /// at the same or newer tick.
    stale_spawns: AtomicU64,
    /// Spawns handed to the host runtime for instantiation.
    spawns_applied: AtomicU64,
    /// Sent spawns confirmed by an acknowledgement.
    spawns_acked: AtomicU64,
}

/// Generate an increment/getter pair for one counter field.
macro_rules! counter {
    ($record:ident, $field:ident) => {
        #[inline]
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        pub fn $field(&self) -> u64 {
            self.$field.load(Ordering::Relaxed)
        }
    };
}

impl SnapshotMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_snapshot_sent, snapshots_sent);
    counter!(record_snapshot_received, snapshots_received);
    counter!(record_entry_dropped, entries_dropped);
    counter!(record_spawn_dropped, spawns_dropped);
    counter!(record_alloc_failure, alloc_failures);
    counter!(record_integrity_error, integrity_errors);
    counter!(record_stale_entry, stale_entries);
    counter!(record_stale_spawn, stale_spawns);
    counter!(record_spawn_applied, spawns_applied);
    counter!(record_spawn_acked, spawns_acked);
}
