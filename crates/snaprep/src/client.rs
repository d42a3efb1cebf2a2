// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-peer replication state.
//!
//! One [`ClientData`] exists for each peer the local process exchanges
//! snapshots with: the outbound sequence counter, the last sequence heard
//! from that peer (echoed back as an acknowledgement), the ticks of spawns
//! the peer has confirmed, and the log of spawns sent to it.

use std::collections::HashMap;

use crate::config::SENT_SPAWN_ACK_WINDOW;

/// One record of a spawn emitted to this peer.
///
/// Each retransmission appends its own record: every outgoing message is
/// independently acknowledgeable, so the same spawn may appear under
/// several sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentSpawn {
    /// Outbound message sequence the spawn rode on.
    pub sequence: u64,
    /// Spawned object identity.
    pub object_id: u64,
    /// Tick stamped on the spawn when it was captured.
    pub tick: i32,
}

/// Replication state for one peer.
#[derive(Debug, Default)]
pub struct ClientData {
    /// Sequence number the next outbound message will carry. Incremented
    /// exactly once per successfully composed message; wraps.
    pub next_sequence: u16,
    /// Sequence of the latest snapshot received from this peer.
    pub last_received_sequence: u16,
    /// Highest spawn tick this peer has acknowledged, per object.
    spawn_ack: HashMap<u64, i32>,
    /// Spawns sent and not yet acknowledged or pruned.
    sent_spawns: Vec<SentSpawn>,
}

impl ClientData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one spawn emitted on the message currently being composed.
    pub fn record_sent_spawn(&mut self, object_id: u64, tick: i32) {
        self.sent_spawns.push(SentSpawn {
            sequence: u64::from(self.next_sequence),
            object_id,
            tick,
        });
    }

    /// Tick this peer has acknowledged for `object_id`, if any.
    pub fn acked_tick(&self, object_id: u64) -> Option<i32> {
        self.spawn_ack.get(&object_id).copied()
    }

    /// Consume every sent-spawn record matching `ack_sequence`.
    ///
    /// Matched records update the per-object acknowledged tick and are
    /// removed from the log; the caller reconciles them against the live
    /// spawn table. Acks may arrive out of order, so non-matching records
    /// are left untouched.
    pub fn take_acked(&mut self, ack_sequence: u16) -> Vec<SentSpawn> {
        let ack = u64::from(ack_sequence);
        let mut acked = Vec::new();
        self.sent_spawns.retain(|sent| {
            if sent.sequence == ack {
                acked.push(*sent);
                false
            } else {
                true
            }
        });
        for sent in &acked {
            self.spawn_ack.insert(sent.object_id, sent.tick);
        }
        acked
    }

    /// Advance the outbound sequence after a message is composed.
    ///
    /// Sent-spawn records older than the ack window are pruned here; a
    /// peer that silent-drops for longer than the window keeps receiving
    /// retransmissions, only the ack bookkeeping for those stale sequences
    /// is released.
    pub fn advance_sequence(&mut self) {
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let next = self.next_sequence;
        self.sent_spawns
            .retain(|sent| next.wrapping_sub(sent.sequence as u16) <= SENT_SPAWN_ACK_WINDOW);
    }

    /// Number of unacknowledged sent-spawn records.
    pub fn pending_spawn_count(&self) -> usize {
        self.sent_spawns.len()
    }

    /// Drop the acknowledgement state for `object_id`.
    pub fn forget_object(&mut self, object_id: u64) {
        self.spawn_ack.remove(&object_id);
        self.sent_spawns.retain(|sent| sent.object_id != object_id);
    }
}
