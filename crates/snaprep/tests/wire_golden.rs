// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Wire-format pins: byte-exact reference vectors for the snapshot frame
// layout. A change that breaks one of these tests breaks every deployed
// peer; bump the protocol, don't edit the expectation.

use snaprep::core::ser::{Cursor, CursorMut, SerResult};
use snaprep::{
    ClientId, DeltaVar, HostRuntime, RuntimeConfig, SnapshotLimits, SnapshotSystem,
    SnapshotTransport, SpawnCommand, VarKey,
};
use std::sync::Arc;

const SERVER: u64 = 0;
const CLIENT: u64 = 1;

struct FixedHost {
    tick: i32,
}

impl HostRuntime for FixedHost {
    fn lookup_variable(&mut self, _key: VarKey) -> Option<&mut dyn DeltaVar> {
        None
    }

    fn apply_spawn(&mut self, _cmd: &SpawnCommand, _parent: Option<u64>) {}

    fn connected_clients(&self) -> Vec<ClientId> {
        vec![SERVER, CLIENT]
    }

    fn is_server(&self) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn local_client_id(&self) -> ClientId {
        SERVER
    }

    fn server_client_id(&self) -> ClientId {
        SERVER
    }

    fn current_tick(&self) -> i32 {
        self.tick
    }
}

struct CaptureTransport {
    scratch: Vec<u8>,
    frame: Option<Vec<u8>>,
}

impl CaptureTransport {
    fn new() -> Self {
        Self {
            scratch: vec![0; 4096],
            frame: None,
        }
    }
}

impl SnapshotTransport for CaptureTransport {
    fn acquire(&mut self, _recipient: ClientId) -> Option<&mut [u8]> {
        Some(&mut self.scratch)
    }

    fn commit(&mut self, _recipient: ClientId, len: usize) {
        self.frame = Some(self.scratch[..len].to_vec());
    }
}

struct ByteVar(&'static [u8]);

impl DeltaVar for ByteVar {
    fn write_delta(&mut self, w: &mut CursorMut<'_>) -> SerResult<()> {
        w.write_bytes(self.0)
    }

    fn read_delta(&mut self, _r: &mut Cursor<'_>) -> SerResult<()> {
        Ok(())
    }
}

fn compose_frame(system: &mut SnapshotSystem, tick: i32) -> Vec<u8> {
    let mut host = FixedHost { tick };
    let mut transport = CaptureTransport::new();
    system.early_update(&mut host, &mut transport);
    transport.frame.expect("frame committed")
}

#[test]
fn test_empty_snapshot_frame_bytes() {
    let mut system = SnapshotSystem::new(SnapshotLimits::default(), Arc::new(RuntimeConfig::new()));
    let frame = compose_frame(&mut system, 10);

    #[rustfmt::skip]
    let expected: &[u8] = &[
        20,         // tick 10, zigzag-packed
        0x00, 0x00, // sequence 0
        0x46, 0x42, // header sentinel
        0x00, 0x00, // buffer section: 0 bytes
        0x00, 0x00, // index section: 0 entries
        0x47, 0x42, // index sentinel
        0x00, 0x00, // spawn section: 0 spawns
        0x48, 0x42, // spawn sentinel
        0x00, 0x00, // acknowledged sequence 0
        0x49, 0x42, // ack sentinel
    ];
    assert_eq!(frame, expected);
}

#[test]
fn test_single_variable_frame_bytes() {
    let mut system = SnapshotSystem::new(SnapshotLimits::default(), Arc::new(RuntimeConfig::new()));
    let mut var = ByteVar(b"AB");
    system
        .store_variable(10, 7, 1, 2, &mut var)
        .expect("store should succeed");
    let frame = compose_frame(&mut system, 10);

    #[rustfmt::skip]
    let expected: &[u8] = &[
        20,         // tick 10, zigzag-packed
        0x00, 0x00, // sequence 0
        0x46, 0x42, // header sentinel
        0x02, 0x00, // buffer section: 2 bytes
        0x41, 0x42, // arena contents "AB"
        0x01, 0x00, // index section: 1 entry
        // entry: object 7, behaviour 1, variable 2, tick 10, at [0, 2)
        0x07, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x01, 0x00,
        0x02, 0x00,
        20,
        0x00, 0x00,
        0x02, 0x00,
        0x47, 0x42, // index sentinel
        0x00, 0x00, // spawn section: 0 spawns
        0x48, 0x42, // spawn sentinel
        0x00, 0x00, // acknowledged sequence 0
        0x49, 0x42, // ack sentinel
    ];
    assert_eq!(frame, expected);
}

#[test]
fn test_second_frame_carries_next_sequence() {
    let mut system = SnapshotSystem::new(SnapshotLimits::default(), Arc::new(RuntimeConfig::new()));
    let _ = compose_frame(&mut system, 1);
    let frame = compose_frame(&mut system, 2);

    // packed tick 2 -> zigzag 4; sequence bytes follow immediately.
    assert_eq!(frame[0], 4);
    assert_eq!(&frame[1..3], &[0x01, 0x00]);
}

#[test]
fn test_packed_i32_reference_encodings() {
    let vectors: &[(i32, &[u8])] = &[
        (0, &[0x00]),
        (-1, &[0x01]),
        (1, &[0x02]),
        (63, &[0x7E]),
        (-64, &[0x7F]),
        (64, &[0x80, 0x01]),
        (300, &[0xD8, 0x04]),
        (i32::MAX, &[0xFE, 0xFF, 0xFF, 0xFF, 0x0F]),
        (i32::MIN, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
    ];

    for (value, bytes) in vectors {
        let mut buffer = [0u8; 8];
        let mut w = CursorMut::new(&mut buffer);
        w.write_packed_i32(*value).expect("write should succeed");
        let written = w.offset();
        assert_eq!(&buffer[..written], *bytes, "encoding of {}", value);

        let mut r = Cursor::new(bytes);
        assert_eq!(
            r.read_packed_i32().expect("read should succeed"),
            *value,
            "decoding of {:02X?}",
            bytes
        );
    }
}
