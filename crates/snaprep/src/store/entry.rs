// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Variable entry table records and their wire layout.

use crate::core::ser::{Cursor, CursorMut, SerResult};

/// Identity of one replicated variable.
///
/// Table lookups match on this triple alone; the tick at which the value
/// was captured is an attribute of the stored entry, not of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarKey {
    /// Network identity of the owning object.
    pub object_id: u64,
    /// Behaviour component index on that object.
    pub behaviour_index: u16,
    /// Variable index within the behaviour.
    pub variable_index: u16,
}

/// One row of the snapshot variable table.
///
/// `position`/`length` address the serialized value inside the arena;
/// `length == 0` means the slot exists but holds no payload yet.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub key: VarKey,
    /// Simulation tick at which the value was last captured.
    pub tick_written: i32,
    /// Byte offset of the value in the arena.
    pub position: u16,
    /// Serialized value length in bytes.
    pub length: u16,
}

impl Entry {
    /// Create an empty slot for `key`, stamped with the capture tick.
    pub fn new(key: VarKey, tick_written: i32) -> Self {
        Self {
            key,
            tick_written,
            position: 0,
            length: 0,
        }
    }

    /// Serialize to the wire: identity triple, packed tick, then the arena
    /// address of the value.
    pub fn encode(&self, w: &mut CursorMut<'_>) -> SerResult<()> {
        w.write_u64_le(self.key.object_id)?;
        w.write_u16_le(self.key.behaviour_index)?;
        w.write_u16_le(self.key.variable_index)?;
        w.write_packed_i32(self.tick_written)?;
        w.write_u16_le(self.position)?;
        w.write_u16_le(self.length)
    }

    /// Deserialize one entry from the wire.
    pub fn decode(r: &mut Cursor<'_>) -> SerResult<Self> {
        let key = VarKey {
            object_id: r.read_u64_le()?,
            behaviour_index: r.read_u16_le()?,
            variable_index: r.read_u16_le()?,
        };
        let tick_written = r.read_packed_i32()?;
        let position = r.read_u16_le()?;
        let length = r.read_u16_le()?;
        Ok(Self {
            key,
            tick_written,
            position,
            length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_wire_roundtrip() {
        let entry = Entry {
            key: VarKey {
                object_id: 0x0102_0304_0506_0708,
                behaviour_index: 3,
                variable_index: 11,
            },
            tick_written: -42,
            position: 1200,
            length: 16,
        };

        let mut buffer = [0u8; 32];
        let mut writer = CursorMut::new(&mut buffer);
        entry.encode(&mut writer).expect("Encode should succeed");
        let len = writer.offset();

        let mut reader = Cursor::new(&buffer);
        let decoded = Entry::decode(&mut reader).expect("Decode should succeed");
        assert_eq!(reader.offset(), len);
        assert_eq!(decoded.key, entry.key);
        assert_eq!(decoded.tick_written, entry.tick_written);
        assert_eq!(decoded.position, entry.position);
        assert_eq!(decoded.length, entry.length);
    }

    #[test]
    fn test_entry_wire_layout_exact() {
        let entry = Entry {
            key: VarKey {
                object_id: 7,
                behaviour_index: 1,
                variable_index: 2,
            },
            tick_written: 10,
            position: 0x0010,
            length: 2,
        };

        let mut buffer = [0u8; 32];
        let mut writer = CursorMut::new(&mut buffer);
        entry.encode(&mut writer).expect("Encode should succeed");

        // 8 (object) + 2 + 2 (indices) + 1 (packed tick 10) + 2 + 2
        assert_eq!(writer.offset(), 17);
        assert_eq!(
            &buffer[..17],
            &[
                7, 0, 0, 0, 0, 0, 0, 0, // object_id
                1, 0, // behaviour_index
                2, 0, // variable_index
                20, // tick 10, zigzag-packed
                0x10, 0, // position
                2, 0, // length
            ]
        );
    }

    #[test]
    fn test_key_equality_ignores_nothing() {
        let a = VarKey {
            object_id: 1,
            behaviour_index: 2,
            variable_index: 3,
        };
        let b = VarKey {
            object_id: 1,
            behaviour_index: 2,
            variable_index: 4,
        };
        assert_ne!(a, b);
        assert_eq!(
            a,
            VarKey {
                object_id: 1,
                behaviour_index: 2,
                variable_index: 3
            }
        );
    }

    #[test]
    fn test_empty_slot_has_no_payload() {
        let entry = Entry::new(
            VarKey {
                object_id: 9,
                behaviour_index: 0,
                variable_index: 0,
            },
            5,
        );
        assert_eq!(entry.length, 0);
        assert_eq!(entry.position, 0);
        assert_eq!(entry.tick_written, 5);
    }
}
