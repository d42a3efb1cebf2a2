// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot system: tick hook, message framing, receive parsing.
//!
//! One [`SnapshotSystem`] owns the snapshot store and the per-peer state
//! map. On the early phase of each tick it composes one framed message per
//! recipient (variable table, spawn commands, acknowledgement); on message
//! arrival it parses the peer's frame section by section, verifying the
//! sentinel at every boundary.
//!
//! The system is an explicit handle: the host constructs it at connection
//! time, drives it from its tick and message callbacks, and drops it at
//! teardown. Nothing here is process-global.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::client::ClientData;
use crate::config::{
    RuntimeConfig, SnapshotLimits, SENTINEL_ACK, SENTINEL_HEADER, SENTINEL_INDEX, SENTINEL_SPAWN,
};
use crate::core::ser::{Cursor, CursorMut};
use crate::error::{Error, Result};
use crate::metrics::SnapshotMetrics;
use crate::runtime::{ClientId, DeltaVar, HostRuntime, SnapshotTransport};
use crate::store::entry::VarKey;
use crate::store::spawn::SpawnCommand;
use crate::store::SnapshotStore;

/// Snapshot replication driver for one connection.
pub struct SnapshotSystem {
    store: SnapshotStore,
    clients: HashMap<ClientId, ClientData>,
    config: Arc<RuntimeConfig>,
    metrics: Arc<SnapshotMetrics>,
    /// Tick of the last snapshot round, to fire once per distinct tick.
    last_tick: i32,
    /// Staging space for variable delta serialization.
    scratch: Vec<u8>,
}

impl SnapshotSystem {
    pub fn new(limits: SnapshotLimits, config: Arc<RuntimeConfig>) -> Self {
        let metrics = Arc::new(SnapshotMetrics::new());
        Self {
            store: SnapshotStore::new(limits, Arc::clone(&metrics)),
            clients: HashMap::new(),
            config,
            metrics,
            last_tick: i32::MIN,
            scratch: vec![0; limits.buf_size],
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn metrics(&self) -> Arc<SnapshotMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Replication state for one peer, if any messages were exchanged.
    pub fn client_state(&self, client_id: ClientId) -> Option<&ClientData> {
        self.clients.get(&client_id)
    }

    // ========================================================================
    // Capture paths
    // ========================================================================

    /// Capture the current value of one replicated variable.
    ///
    /// The variable serializes itself into scratch space; the store then
    /// places the bytes in the arena, growing the entry's region when the
    /// value outgrew it. The next composed snapshot carries the update.
    pub fn store_variable(
        &mut self,
        tick: i32,
        object_id: u64,
        behaviour_index: u16,
        variable_index: u16,
        var: &mut dyn DeltaVar,
    ) -> Result<()> {
        let key = VarKey {
            object_id,
            behaviour_index,
            variable_index,
        };
        let slot = match self.store.find(key) {
            Some(slot) => slot,
            None => self.store.add_entry(key, tick)?,
        };

        let size = {
            let mut w = CursorMut::new(&mut self.scratch);
            var.write_delta(&mut w)?;
            w.offset()
        };
        self.store.write_value(slot, &self.scratch[..size], tick)
    }

    /// Queue an object spawn for replication.
    ///
    /// The command is stamped with the current tick and targeted at every
    /// peer that must instantiate it: all connected non-server clients
    /// when called on the server, the server alone when called on a
    /// client.
    pub fn queue_spawn(&mut self, mut cmd: SpawnCommand, runtime: &dyn HostRuntime) -> Result<()> {
        cmd.tick_written = runtime.current_tick() as u16;
        cmd.target_client_ids = Self::spawn_targets(runtime);
        self.store.add_spawn(cmd)
    }

    fn spawn_targets(runtime: &dyn HostRuntime) -> HashSet<u64> {
        let server = runtime.server_client_id();
        if runtime.is_server() {
            runtime
                .connected_clients()
                .into_iter()
                .filter(|&id| id != server)
                .collect()
        } else {
            std::iter::once(server).collect()
        }
    }

    // ========================================================================
    // Tick hook
    // ========================================================================

    /// Per-tick snapshot round, driven from the host's early update phase.
    ///
    /// Fires once per distinct tick. A server sends one snapshot to every
    /// connected client; a connected client sends one to the server. With
    /// both replication features disabled this is a no-op.
    pub fn early_update(
        &mut self,
        runtime: &mut dyn HostRuntime,
        transport: &mut dyn SnapshotTransport,
    ) {
        let toggles = self.config.toggles();
        if !toggles.delta_enabled && !toggles.spawn_enabled {
            return;
        }

        let tick = runtime.current_tick();
        if tick == self.last_tick {
            return;
        }
        self.last_tick = tick;

        if runtime.is_server() {
            let local = runtime.local_client_id();
            for client_id in runtime.connected_clients() {
                if client_id == local {
                    continue;
                }
                self.send_snapshot(client_id, tick, transport);
            }
        } else if runtime.is_connected() {
            self.send_snapshot(runtime.server_client_id(), tick, transport);
        }
    }

    /// Compose and commit one snapshot message for `recipient`.
    fn send_snapshot(
        &mut self,
        recipient: ClientId,
        tick: i32,
        transport: &mut dyn SnapshotTransport,
    ) {
        self.clients.entry(recipient).or_default();
        let Some(buffer) = transport.acquire(recipient) else {
            log::debug!(
                "[snapshot] transport unavailable for client {}, skipped this tick",
                recipient
            );
            return;
        };
        let Some(client) = self.clients.get_mut(&recipient) else {
            return;
        };

        let mut w = CursorMut::new(buffer);
        match Self::compose_snapshot(&self.store, client, recipient, tick, &mut w) {
            Ok(()) => {
                let len = w.offset();
                transport.commit(recipient, len);
                self.metrics.record_snapshot_sent();
                log::trace!(
                    "[snapshot] sent {} bytes to client {} at tick {}",
                    len,
                    recipient,
                    tick
                );
            }
            Err(e) => {
                // Frame abandoned; nothing partial reaches the transport.
                log::warn!(
                    "[snapshot] failed to compose message for client {}: {}",
                    recipient,
                    e
                );
            }
        }
    }

    /// Frame one snapshot message in wire order.
    ///
    /// Spawns the recipient already acknowledged, or that do not target
    /// it, are skipped; the spawn count is back-patched once the section
    /// is complete. The sequence advances only after the full frame
    /// composed.
    fn compose_snapshot(
        store: &SnapshotStore,
        client: &mut ClientData,
        recipient: ClientId,
        tick: i32,
        w: &mut CursorMut<'_>,
    ) -> Result<()> {
        w.write_packed_i32(tick)?;
        w.write_u16_le(client.next_sequence)?;
        w.write_u16_le(SENTINEL_HEADER)?;

        store.write_buffer_section(w)?;
        store.write_index_section(w)?;
        w.write_u16_le(SENTINEL_INDEX)?;

        let count_at = w.offset();
        w.write_i16_le(0)?;
        let mut written: i16 = 0;
        for index in 0..store.spawn_count() {
            let spawn = store.spawn(index);
            if !spawn.target_client_ids.contains(&recipient) {
                continue;
            }
            if client.acked_tick(spawn.object_id) == Some(i32::from(spawn.tick_written)) {
                continue;
            }
            store.write_spawn(client, w, index)?;
            written += 1;
        }
        w.patch_i16_le(count_at, written)?;
        w.write_u16_le(SENTINEL_SPAWN)?;

        w.write_u16_le(client.last_received_sequence)?;
        client.advance_sequence();
        w.write_u16_le(SENTINEL_ACK)?;
        Ok(())
    }

    // ========================================================================
    // Receive path
    // ========================================================================

    /// Parse one snapshot message received from `sender`.
    ///
    /// Sections are parsed in wire order: header, arena buffer, variable
    /// index, spawns, acknowledgement. A sentinel mismatch abandons the
    /// rest of the message; sections parsed before the corruption stay
    /// applied and connection state is left intact.
    pub fn handle_snapshot(
        &mut self,
        sender: ClientId,
        payload: &[u8],
        runtime: &mut dyn HostRuntime,
    ) -> Result<()> {
        let result = self.parse_snapshot(sender, payload, runtime);
        if let Err(e) = &result {
            self.metrics.record_integrity_error();
            log::error!("[snapshot] corrupt snapshot from client {}: {}", sender, e);
        }
        result
    }

    fn parse_snapshot(
        &mut self,
        sender: ClientId,
        payload: &[u8],
        runtime: &mut dyn HostRuntime,
    ) -> Result<()> {
        let mut r = Cursor::new(payload);
        let _sender_tick = r.read_packed_i32()?;
        let sequence = r.read_u16_le()?;
        self.clients.entry(sender).or_default().last_received_sequence = sequence;
        Self::verify_sentinel(&mut r, SENTINEL_HEADER, "header")?;

        self.store.read_buffer(&mut r)?;
        self.store.read_index(&mut r, runtime)?;
        Self::verify_sentinel(&mut r, SENTINEL_INDEX, "index")?;

        self.store.read_spawns(&mut r, runtime)?;
        Self::verify_sentinel(&mut r, SENTINEL_SPAWN, "spawn")?;

        let client = self.clients.entry(sender).or_default();
        self.store.read_acks(sender, client, &mut r)?;
        Self::verify_sentinel(&mut r, SENTINEL_ACK, "ack")?;

        self.metrics.record_snapshot_received();
        Ok(())
    }

    fn verify_sentinel(r: &mut Cursor<'_>, expected: u16, section: &'static str) -> Result<()> {
        let found = r.read_u16_le()?;
        if found == expected {
            Ok(())
        } else {
            Err(Error::SentinelMismatch {
                section,
                expected,
                found,
            })
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Reset the store's logical contents (buffers keep their allocation).
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Forget a departed peer: its replication state and its slot in every
    /// pending spawn's audience.
    pub fn remove_client(&mut self, client_id: ClientId) {
        self.clients.remove(&client_id);
        self.store.remove_client(client_id);
    }
}
