// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # snaprep - Snapshot replication core for networked game objects
//!
//! On each simulation tick, `snaprep` captures the latest value of every
//! replicated state variable and every pending object spawn into a compact
//! snapshot, frames one message per recipient, reconciles the
//! acknowledgements peers send back so delivered spawns stop
//! retransmitting, and applies received snapshots by decoding variable
//! deltas in place and instantiating spawned objects through the host.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snaprep::{RuntimeConfig, SnapshotLimits, SnapshotSystem};
//! use std::sync::Arc;
//!
//! let config = Arc::new(RuntimeConfig::new());
//! let mut system = SnapshotSystem::new(SnapshotLimits::default(), config);
//!
//! // Tick callback (early phase):
//! //   system.early_update(&mut runtime, &mut transport);
//! // Message arrival callback:
//! //   system.handle_snapshot(sender, payload, &mut runtime)?;
//! // Variable capture from the host runtime:
//! //   system.store_variable(tick, object_id, behaviour, variable, &mut var)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                          Host Runtime                              |
//! |   object lifetimes | tick clock | transport | variable handles     |
//! +--------------------------------------------------------------------+
//! |                        SnapshotSystem                              |
//! |   tick hook | per-recipient framing | receive parsing | acks       |
//! +--------------------------------------------------------------------+
//! |                        SnapshotStore                               |
//! |   entry table | variable arena | spawn table | tick-applied map    |
//! +--------------------------------------------------------------------+
//! |                        IndexAllocator                              |
//! |   handle-keyed region placement inside the fixed arena             |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SnapshotSystem`] | Owns one store and the per-peer state; entry point |
//! | [`SnapshotStore`] | Variable table, arena, spawn table |
//! | [`SpawnCommand`] | One object creation pending delivery |
//! | [`HostRuntime`] | Callbacks the core requires from the host |
//! | [`SnapshotTransport`] | Framed outgoing message buffers |
//!
//! The core is single-threaded cooperative: every mutation happens on the
//! host's tick and message callbacks, and the wire protocol tolerates
//! reordering via per-message sequence numbers and tick-based
//! last-writer-wins filtering.

/// Handle-keyed sub-allocation of byte regions inside the fixed arena.
pub mod arena;
/// Per-peer sequence counters and sent-spawn bookkeeping.
pub mod client;
/// Wire constants, capacity defaults, runtime feature toggles.
pub mod config;
/// Wire-level cursors and serialization errors.
pub mod core;
/// Crate error type.
pub mod error;
/// Lock-free replication counters.
pub mod metrics;
/// Host runtime seam (variable handles, spawn application, transport).
pub mod runtime;
/// Snapshot store: entry table, arena, spawn table.
pub mod store;
/// Snapshot system: tick hook, framing, receive parsing.
pub mod system;

pub use client::ClientData;
pub use config::{FeatureToggles, RuntimeConfig, SnapshotLimits};
pub use error::{Error, Result};
pub use metrics::SnapshotMetrics;
pub use runtime::{ClientId, DeltaVar, HostRuntime, SnapshotTransport};
pub use store::entry::{Entry, VarKey};
pub use store::spawn::{Quat, SpawnCommand, Vec3};
pub use store::SnapshotStore;
pub use system::SnapshotSystem;
