// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot store: variable table, byte arena, spawn table.
//!
//! The store owns the arena that holds every serialized variable value,
//! the entry table addressing into it, the table of pending spawn
//! commands, and the per-object record of spawn ticks already applied
//! locally. Values are overwritten in place as variables change; the
//! arena is never compacted or freed for the life of the store.

pub mod entry;
pub mod spawn;

use std::collections::HashMap;
use std::sync::Arc;

use crate::arena::IndexAllocator;
use crate::client::ClientData;
use crate::config::SnapshotLimits;
use crate::core::ser::{Cursor, CursorMut, SerError, SerResult};
use crate::error::{Error, Result};
use crate::metrics::SnapshotMetrics;
use crate::runtime::{ClientId, HostRuntime};

use entry::{Entry, VarKey};
use spawn::SpawnCommand;

/// Variable table, arena, and spawn table for one snapshot system.
pub struct SnapshotStore {
    /// Arena of serialized variable values, addressed by entry positions.
    main_buffer: Vec<u8>,
    /// Staging buffer for the byte payload of an incoming snapshot.
    recv_buffer: Vec<u8>,
    /// Bytes of `recv_buffer` valid for the message being parsed.
    recv_len: usize,
    allocator: IndexAllocator,
    entries: Vec<Entry>,
    spawns: Vec<SpawnCommand>,
    /// Highest spawn tick already applied locally, per object.
    tick_applied: HashMap<u64, u16>,
    limits: SnapshotLimits,
    metrics: Arc<SnapshotMetrics>,
}

impl SnapshotStore {
    pub fn new(limits: SnapshotLimits, metrics: Arc<SnapshotMetrics>) -> Self {
        Self {
            main_buffer: vec![0; limits.buf_size],
            recv_buffer: vec![0; limits.buf_size],
            recv_len: 0,
            allocator: IndexAllocator::new(limits.buf_size, limits.allocator_slots()),
            entries: Vec::with_capacity(limits.max_entries),
            spawns: Vec::with_capacity(limits.max_spawns),
            tick_applied: HashMap::new(),
            limits,
            metrics,
        }
    }

    // ========================================================================
    // Entry table
    // ========================================================================

    /// Slot index of the entry matching `key`, if present.
    ///
    /// Linear scan; the table holds at most one entry per key.
    pub fn find(&self, key: VarKey) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Append an empty entry for `key` and return its slot index.
    pub fn add_entry(&mut self, key: VarKey, tick: i32) -> Result<usize> {
        if self.entries.len() == self.limits.max_entries {
            self.metrics.record_entry_dropped();
            log::warn!(
                "[store] entry table full ({}), dropping variable {:?}",
                self.limits.max_entries,
                key
            );
            return Err(Error::EntryTableFull);
        }
        self.entries.push(Entry::new(key, tick));
        Ok(self.entries.len() - 1)
    }

    /// Place (or re-place) `size` bytes of arena space for `slot`.
    ///
    /// An existing region is released first, so a grown value can reclaim
    /// its own space. On placement failure the slot is left empty rather
    /// than pointing at released bytes.
    pub fn allocate_entry(&mut self, slot: usize, size: usize) -> Result<()> {
        // Release any current region first (no-op for an empty slot), so a
        // grown value can reclaim its own space.
        self.allocator.deallocate(slot);
        match self.allocator.allocate(slot, size) {
            Some(offset) => {
                let entry = &mut self.entries[slot];
                entry.position = offset as u16;
                entry.length = size as u16;
                Ok(())
            }
            None => {
                self.entries[slot].length = 0;
                self.metrics.record_alloc_failure();
                log::warn!(
                    "[alloc] arena exhausted placing {} bytes for slot {}",
                    size,
                    slot
                );
                Err(Error::ArenaExhausted { requested: size })
            }
        }
    }

    /// Store a freshly captured value into `slot`, growing its region if
    /// needed, and stamp the capture tick.
    pub fn write_value(&mut self, slot: usize, payload: &[u8], tick: i32) -> Result<()> {
        let size = payload.len();
        if size > usize::from(self.entries[slot].length) {
            self.allocate_entry(slot, size)?;
        }
        let entry = &mut self.entries[slot];
        entry.tick_written = tick;
        entry.length = size as u16;
        let position = usize::from(entry.position);
        self.main_buffer[position..position + size].copy_from_slice(payload);
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, slot: usize) -> &Entry {
        &self.entries[slot]
    }

    /// Serialized value currently held for `slot`.
    pub fn entry_payload(&self, slot: usize) -> &[u8] {
        let entry = &self.entries[slot];
        let position = usize::from(entry.position);
        &self.main_buffer[position..position + usize::from(entry.length)]
    }

    /// Smallest arena prefix containing every live value.
    pub fn buffer_range(&self) -> usize {
        self.allocator.range()
    }

    /// Live allocator regions (diagnostics and tests).
    pub fn live_regions(&self) -> usize {
        self.allocator.live_count()
    }

    // ========================================================================
    // Spawn table
    // ========================================================================

    /// Queue a spawn command for delivery to its targets.
    ///
    /// A command with no targets is dropped silently (a server with no
    /// connected clients has nobody to tell).
    pub fn add_spawn(&mut self, cmd: SpawnCommand) -> Result<()> {
        if cmd.target_client_ids.is_empty() {
            log::debug!("[store] spawn {} has no recipients, dropped", cmd.object_id);
            return Ok(());
        }
        if self.spawns.len() == self.limits.max_spawns {
            self.metrics.record_spawn_dropped();
            log::warn!(
                "[store] spawn table full ({}), dropping spawn {}",
                self.limits.max_spawns,
                cmd.object_id
            );
            return Err(Error::SpawnTableFull);
        }
        self.spawns.push(cmd);
        Ok(())
    }

    pub fn spawn_count(&self) -> usize {
        self.spawns.len()
    }

    pub fn spawn(&self, index: usize) -> &SpawnCommand {
        &self.spawns[index]
    }

    /// Highest spawn tick already applied locally for `object_id`.
    pub fn applied_tick(&self, object_id: u64) -> Option<u16> {
        self.tick_applied.get(&object_id).copied()
    }

    // ========================================================================
    // Outgoing sections
    // ========================================================================

    /// Write the arena section: byte count, then the live arena prefix.
    pub fn write_buffer_section(&self, w: &mut CursorMut<'_>) -> SerResult<()> {
        let range = self.allocator.range();
        w.write_u16_le(range as u16)?;
        w.write_bytes(&self.main_buffer[..range])
    }

    /// Write the index section: entry count, then every table row.
    pub fn write_index_section(&self, w: &mut CursorMut<'_>) -> SerResult<()> {
        w.write_i16_le(self.entries.len() as i16)?;
        for entry in &self.entries {
            entry.encode(w)?;
        }
        Ok(())
    }

    /// Emit one spawn to `w` and log it against the message being composed.
    ///
    /// The log append is unconditional, retransmissions included: each
    /// outgoing copy must be independently acknowledgeable.
    pub fn write_spawn(
        &self,
        client: &mut ClientData,
        w: &mut CursorMut<'_>,
        index: usize,
    ) -> SerResult<()> {
        let spawn = &self.spawns[index];
        client.record_sent_spawn(spawn.object_id, i32::from(spawn.tick_written));
        spawn.encode(w)
    }

    // ========================================================================
    // Incoming sections
    // ========================================================================

    /// Read the arena section into the staging buffer.
    pub fn read_buffer(&mut self, r: &mut Cursor<'_>) -> SerResult<()> {
        let len = usize::from(r.read_u16_le()?);
        if len > self.limits.buf_size {
            return Err(SerError::InvalidData {
                reason: format!("buffer section of {} bytes exceeds arena size", len),
            });
        }
        let bytes = r.read_bytes(len)?;
        self.recv_buffer[..len].copy_from_slice(bytes);
        self.recv_len = len;
        Ok(())
    }

    /// Merge the received entry table into the local one.
    ///
    /// Each received entry lands in its local slot (created on first
    /// sight), its payload is copied from the staging buffer into the
    /// local arena, and the host decodes it in place. An entry loses
    /// against a local one holding the same or a newer tick. The stored
    /// position is always the locally allocated offset, never the
    /// sender's.
    pub fn read_index(&mut self, r: &mut Cursor<'_>, runtime: &mut dyn HostRuntime) -> Result<()> {
        let count = r.read_i16_le()?;
        if count < 0 {
            return Err(Error::Ser(SerError::InvalidData {
                reason: format!("negative entry count {}", count),
            }));
        }

        for _ in 0..count {
            let incoming = Entry::decode(r)?;
            let length = usize::from(incoming.length);
            let src = usize::from(incoming.position);
            if src + length > self.recv_len {
                return Err(Error::Ser(SerError::InvalidData {
                    reason: format!(
                        "entry payload [{}, {}) outside received buffer of {} bytes",
                        src,
                        src + length,
                        self.recv_len
                    ),
                }));
            }

            let mut added = false;
            let slot = match self.find(incoming.key) {
                Some(slot) => slot,
                None => {
                    added = true;
                    match self.add_entry(incoming.key, incoming.tick_written) {
                        Ok(slot) => slot,
                        // Table full: skip this entry, keep parsing the rest.
                        Err(_) => continue,
                    }
                }
            };

            if usize::from(self.entries[slot].length) < length {
                if self.allocate_entry(slot, length).is_err() {
                    continue;
                }
                added = true;
            }

            if added || incoming.tick_written > self.entries[slot].tick_written {
                let dst = usize::from(self.entries[slot].position);
                self.main_buffer[dst..dst + length]
                    .copy_from_slice(&self.recv_buffer[src..src + length]);
                let entry = &mut self.entries[slot];
                entry.tick_written = incoming.tick_written;
                entry.length = incoming.length;

                if length > 0 {
                    if let Some(var) = runtime.lookup_variable(incoming.key) {
                        let mut value = Cursor::new(&self.main_buffer[dst..dst + length]);
                        if let Err(e) = var.read_delta(&mut value) {
                            log::warn!(
                                "[snapshot] variable {:?} failed to decode: {}",
                                incoming.key,
                                e
                            );
                        }
                    }
                }
            } else {
                self.metrics.record_stale_entry();
            }
        }
        Ok(())
    }

    /// Parse the spawn section and instantiate objects not yet seen.
    ///
    /// A spawn whose tick does not exceed the last applied tick for its
    /// object is dropped; retransmissions are therefore idempotent.
    pub fn read_spawns(&mut self, r: &mut Cursor<'_>, runtime: &mut dyn HostRuntime) -> Result<()> {
        let count = r.read_i16_le()?;
        if count < 0 {
            return Err(Error::Ser(SerError::InvalidData {
                reason: format!("negative spawn count {}", count),
            }));
        }

        for _ in 0..count {
            let cmd = SpawnCommand::decode(r).map_err(Error::Ser)?;
            if let Some(applied) = self.tick_applied.get(&cmd.object_id) {
                if cmd.tick_written <= *applied {
                    self.metrics.record_stale_spawn();
                    continue;
                }
            }
            self.tick_applied.insert(cmd.object_id, cmd.tick_written);
            runtime.apply_spawn(&cmd, cmd.parent());
            self.metrics.record_spawn_applied();
        }
        Ok(())
    }

    /// Reconcile the acknowledgement a peer echoed back.
    ///
    /// Every sent-spawn record carried on the acknowledged sequence marks
    /// its object as delivered to `client_id`; the peer leaves the spawn's
    /// target set, and a spawn with nobody left to reach is removed
    /// (unordered compaction).
    pub fn read_acks(
        &mut self,
        client_id: ClientId,
        client: &mut ClientData,
        r: &mut Cursor<'_>,
    ) -> SerResult<()> {
        let ack_sequence = r.read_u16_le()?;
        for sent in client.take_acked(ack_sequence) {
            let index = self.spawns.iter().position(|s| {
                s.object_id == sent.object_id && i32::from(s.tick_written) == sent.tick
            });
            if let Some(index) = index {
                self.spawns[index].target_client_ids.remove(&client_id);
                self.metrics.record_spawn_acked();
                if self.spawns[index].target_client_ids.is_empty() {
                    self.spawns.swap_remove(index);
                }
            }
        }
        Ok(())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Reset the logical contents; buffers keep their allocation.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.spawns.clear();
        self.allocator.reset();
        self.tick_applied.clear();
        self.recv_len = 0;
    }

    /// Drop a departed peer from every pending spawn's audience.
    pub fn remove_client(&mut self, client_id: ClientId) {
        for spawn in &mut self.spawns {
            spawn.target_client_ids.remove(&client_id);
        }
        self.spawns.retain(|s| !s.target_client_ids.is_empty());
    }
}
