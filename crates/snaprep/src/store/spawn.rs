// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Spawn commands and their wire layout.
//!
//! A spawn command describes one object to instantiate on a peer. The
//! `target_client_ids` set tracks which recipients have not yet
//! acknowledged the spawn; it is local bookkeeping and never serialized.

use std::collections::HashSet;

use crate::config::SPAWN_GUARD;
use crate::core::ser::{Cursor, CursorMut, SerError, SerResult};

/// Three-component vector (position, scale).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    fn encode(self, w: &mut CursorMut<'_>) -> SerResult<()> {
        w.write_f32_le(self.x)?;
        w.write_f32_le(self.y)?;
        w.write_f32_le(self.z)
    }

    fn decode(r: &mut Cursor<'_>) -> SerResult<Self> {
        Ok(Self {
            x: r.read_f32_le()?,
            y: r.read_f32_le()?,
            z: r.read_f32_le()?,
        })
    }
}

/// Unit quaternion rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    fn encode(self, w: &mut CursorMut<'_>) -> SerResult<()> {
        w.write_f32_le(self.x)?;
        w.write_f32_le(self.y)?;
        w.write_f32_le(self.z)?;
        w.write_f32_le(self.w)
    }

    fn decode(r: &mut Cursor<'_>) -> SerResult<Self> {
        Ok(Self {
            x: r.read_f32_le()?,
            y: r.read_f32_le()?,
            z: r.read_f32_le()?,
            w: r.read_f32_le()?,
        })
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One object-creation command pending delivery.
#[derive(Debug, Clone)]
pub struct SpawnCommand {
    /// Network identity the spawned object will carry.
    pub object_id: u64,
    /// Which archetype the receiver instantiates (low 32 bits meaningful
    /// on the wire).
    pub archetype_hash: u32,
    /// Object originates from the scene rather than a runtime archetype.
    pub is_scene_object: bool,
    /// Object is a player avatar for `owner_client_id`.
    pub is_player_object: bool,
    /// Client that owns the spawned object.
    pub owner_client_id: u64,
    /// Parent object identity; equal to `object_id` for root objects.
    pub parent_object_id: u64,
    /// Instantiation transform.
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Simulation tick at which the spawn was captured.
    pub tick_written: u16,
    /// Recipients that have not yet acknowledged this spawn. Local
    /// bookkeeping, never serialized; a spawn with no remaining targets is
    /// removed from the table.
    pub target_client_ids: HashSet<u64>,
}

impl SpawnCommand {
    /// Serialize the spawn body followed by its trailing guard.
    pub fn encode(&self, w: &mut CursorMut<'_>) -> SerResult<()> {
        w.write_u64_le(self.object_id)?;
        w.write_u64_le(u64::from(self.archetype_hash))?;
        w.write_bool(self.is_scene_object)?;
        w.write_bool(self.is_player_object)?;
        w.write_u64_le(self.owner_client_id)?;
        w.write_u64_le(self.parent_object_id)?;
        self.position.encode(w)?;
        self.rotation.encode(w)?;
        self.scale.encode(w)?;
        w.write_u16_le(self.tick_written)?;
        w.write_u32_le(SPAWN_GUARD)
    }

    /// Deserialize one spawn body and verify its trailing guard.
    ///
    /// A guard mismatch means the message is corrupt from this point on;
    /// the caller abandons spawn parsing for the rest of the message.
    pub fn decode(r: &mut Cursor<'_>) -> SerResult<Self> {
        let object_id = r.read_u64_le()?;
        let archetype_hash = r.read_u64_le()? as u32;
        let is_scene_object = r.read_bool()?;
        let is_player_object = r.read_bool()?;
        let owner_client_id = r.read_u64_le()?;
        let parent_object_id = r.read_u64_le()?;
        let position = Vec3::decode(r)?;
        let rotation = Quat::decode(r)?;
        let scale = Vec3::decode(r)?;
        let tick_written = r.read_u16_le()?;

        let guard = r.read_u32_le()?;
        if guard != SPAWN_GUARD {
            return Err(SerError::InvalidData {
                reason: format!(
                    "spawn guard mismatch: expected 0x{:08X}, found 0x{:08X}",
                    SPAWN_GUARD, guard
                ),
            });
        }

        Ok(Self {
            object_id,
            archetype_hash,
            is_scene_object,
            is_player_object,
            owner_client_id,
            parent_object_id,
            position,
            rotation,
            scale,
            tick_written,
            target_client_ids: HashSet::new(),
        })
    }

    /// Parent to instantiate under, or `None` for a root object.
    ///
    /// A spawn that names itself as parent is a root; re-parenting an
    /// object onto itself is never attempted.
    pub fn parent(&self) -> Option<u64> {
        if self.parent_object_id == self.object_id {
            None
        } else {
            Some(self.parent_object_id)
        }
    }
}
