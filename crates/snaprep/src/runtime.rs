// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Host runtime seam.
//!
//! The snapshot core never instantiates objects, enumerates connections,
//! or touches sockets itself. The host runtime plugs in through the traits
//! here: [`HostRuntime`] for object and peer bookkeeping, [`DeltaVar`] for
//! per-variable serialization, and [`SnapshotTransport`] for framed
//! outgoing messages.

use crate::core::ser::{Cursor, CursorMut, SerResult};
use crate::store::entry::VarKey;
use crate::store::spawn::SpawnCommand;

/// Network identity of a connected peer.
pub type ClientId = u64;

/// Serialization handle for one replicated variable.
///
/// The core treats the value as opaque: it asks the variable to write its
/// current delta when capturing, and to read one back when applying a
/// received snapshot.
pub trait DeltaVar {
    /// Serialize the current value.
    fn write_delta(&mut self, w: &mut CursorMut<'_>) -> SerResult<()>;

    /// Deserialize and apply a received value.
    fn read_delta(&mut self, r: &mut Cursor<'_>) -> SerResult<()>;
}

/// Callbacks the snapshot core requires from the host runtime.
pub trait HostRuntime {
    /// Resolve a replicated variable by identity.
    ///
    /// `None` is not an error: a snapshot can carry variables for objects
    /// that have not spawned locally yet. The entry is stored anyway and
    /// decoded once the object exists.
    fn lookup_variable(&mut self, key: VarKey) -> Option<&mut dyn DeltaVar>;

    /// Create and register the local object described by `cmd`.
    ///
    /// `parent` is `None` for root objects (including spawns that name
    /// themselves as parent).
    fn apply_spawn(&mut self, cmd: &SpawnCommand, parent: Option<u64>);

    /// Identities of every connected peer, including the local one when it
    /// is connected.
    fn connected_clients(&self) -> Vec<ClientId>;

    /// Whether this process is the server.
    fn is_server(&self) -> bool;

    /// Whether this process currently has a live connection.
    fn is_connected(&self) -> bool;

    /// Identity of the local process.
    fn local_client_id(&self) -> ClientId;

    /// Identity of the server.
    fn server_client_id(&self) -> ClientId;

    /// Monotone simulation tick counter.
    fn current_tick(&self) -> i32;
}

/// Framed outgoing message buffers.
///
/// One snapshot message is composed per recipient per tick: `acquire` a
/// buffer, write the frame, then `commit` the written length. Dropping an
/// acquired buffer without committing abandons the frame; nothing partial
/// is ever transmitted.
pub trait SnapshotTransport {
    /// Borrow a buffer for one outgoing message to `recipient`.
    ///
    /// `None` means the transport cannot take a message for this recipient
    /// right now; the caller skips the recipient for this tick.
    fn acquire(&mut self, recipient: ClientId) -> Option<&mut [u8]>;

    /// Transmit the first `len` bytes of the buffer last acquired for
    /// `recipient`.
    fn commit(&mut self, recipient: ClientId, len: usize);
}
