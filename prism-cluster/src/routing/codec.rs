//! Compact wire form for `IndexShardRoutingTable`.
//!
//! Unsigned integers use the conventional 7-bits-per-byte continuation
//! scheme (low bit of each byte signals "more bytes follow"). Two pairs of
//! encoders exist — *fat* (carries the index name) and *thin* (the reader
//! already knows it) — and both are canonical: the same logical table
//! always produces byte-identical output.

use super::builder::IndexShardRoutingTableBuilder;
use super::shard_id::ShardId;
use super::shard_routing::{ShardRouting, ShardRoutingState};
use super::table::IndexShardRoutingTable;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Framing cap on declared lengths (string length, shard count) so a
/// corrupt or adversarial payload cannot force a multi-gigabyte allocation
/// before the real length is known to be garbage.
const MAX_DECLARED_LEN: u64 = 1 << 20;

/// Decode-time failures. Construction/Builder issues are never
/// fatal and do not appear here — only malformed bytes do.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("truncated routing table payload")]
    Truncated,
    #[error("invalid shard state byte: {0}")]
    InvalidState(u8),
    #[error("oversized declared length: {declared} exceeds max {max}")]
    OversizedLength { declared: u64, max: u64 },
    #[error("unassigned shard carries a current node id")]
    UnassignedWithNode,
}

impl RoutingError {
    /// Stable string for metrics labeling, matching `ClusterError::error_type`.
    pub fn error_type(&self) -> &'static str {
        match self {
            RoutingError::Truncated => "truncated",
            RoutingError::InvalidState(_) => "invalid_state",
            RoutingError::OversizedLength { .. } => "oversized_length",
            RoutingError::UnassignedWithNode => "unassigned_with_node",
        }
    }
}

impl From<RoutingError> for crate::error::ClusterError {
    fn from(err: RoutingError) -> Self {
        crate::error::ClusterError::Serialization(err.to_string())
    }
}

pub fn write_vu64(buf: &mut BytesMut, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            buf.put_u8(byte | 0x80);
        } else {
            buf.put_u8(byte);
            break;
        }
    }
}

pub fn read_vu64(buf: &mut Bytes) -> Result<u64, RoutingError> {
    let mut result: u64 = 0;
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(RoutingError::Truncated);
        }
        let byte = buf.get_u8();
        result |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 64 {
            return Err(RoutingError::Truncated);
        }
    }
}

pub fn write_vu32(buf: &mut BytesMut, value: u32) {
    write_vu64(buf, value as u64);
}

pub fn read_vu32(buf: &mut Bytes) -> Result<u32, RoutingError> {
    let value = read_vu64(buf)?;
    if value > u32::MAX as u64 {
        return Err(RoutingError::OversizedLength {
            declared: value,
            max: u32::MAX as u64,
        });
    }
    Ok(value as u32)
}

fn write_string(buf: &mut BytesMut, s: &str) {
    write_vu32(buf, s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn read_string(buf: &mut Bytes) -> Result<String, RoutingError> {
    let len = read_vu32(buf)? as u64;
    if len > MAX_DECLARED_LEN {
        return Err(RoutingError::OversizedLength {
            declared: len,
            max: MAX_DECLARED_LEN,
        });
    }
    let len = len as usize;
    if buf.remaining() < len {
        return Err(RoutingError::Truncated);
    }
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| RoutingError::Truncated)
}

fn write_optional_string(buf: &mut BytesMut, s: Option<&str>) {
    match s {
        Some(v) => {
            buf.put_u8(1);
            write_string(buf, v);
        }
        None => buf.put_u8(0),
    }
}

fn read_optional_string(buf: &mut Bytes) -> Result<Option<String>, RoutingError> {
    if !buf.has_remaining() {
        return Err(RoutingError::Truncated);
    }
    match buf.get_u8() {
        0 => Ok(None),
        _ => Ok(Some(read_string(buf)?)),
    }
}

fn write_entry(buf: &mut BytesMut, entry: &ShardRouting) {
    buf.put_u8(if entry.primary() { 1 } else { 0 });
    write_optional_string(buf, entry.current_node_id());
    write_optional_string(buf, entry.relocating_node_id());
    buf.put_u8(entry.state().to_wire_byte());
    write_vu64(buf, entry.version());
    write_optional_string(buf, entry.allocation_id());
}

fn read_entry(buf: &mut Bytes, shard_id: ShardId) -> Result<ShardRouting, RoutingError> {
    if !buf.has_remaining() {
        return Err(RoutingError::Truncated);
    }
    let primary = buf.get_u8() != 0;
    let current_node_id = read_optional_string(buf)?;
    let relocating_node_id = read_optional_string(buf)?;
    if !buf.has_remaining() {
        return Err(RoutingError::Truncated);
    }
    let state_byte = buf.get_u8();
    let state = ShardRoutingState::from_wire_byte(state_byte).ok_or(RoutingError::InvalidState(state_byte))?;
    let version = read_vu64(buf)?;
    let allocation_id = read_optional_string(buf)?;

    if state == ShardRoutingState::Unassigned && current_node_id.is_some() {
        return Err(RoutingError::UnassignedWithNode);
    }

    Ok(ShardRouting::new(
        shard_id,
        primary,
        current_node_id,
        relocating_node_id,
        state,
        version,
        allocation_id,
    ))
}

fn write_body(buf: &mut BytesMut, table: &IndexShardRoutingTable) {
    buf.put_u8(if table.allocated_post_api() { 1 } else { 0 });
    write_vu32(buf, table.size() as u32);
    for entry in table.shards() {
        write_entry(buf, entry);
    }
}

fn read_body(buf: &mut Bytes, shard_id: ShardId) -> Result<IndexShardRoutingTable, RoutingError> {
    if !buf.has_remaining() {
        return Err(RoutingError::Truncated);
    }
    let allocated_post_api = buf.get_u8() != 0;
    let count = read_vu32(buf)? as u64;
    if count > MAX_DECLARED_LEN {
        return Err(RoutingError::OversizedLength {
            declared: count,
            max: MAX_DECLARED_LEN,
        });
    }

    let mut builder = IndexShardRoutingTableBuilder::new(shard_id.clone());
    builder.set_allocated_post_api(allocated_post_api);
    for _ in 0..count {
        let entry = read_entry(buf, shard_id.clone())?;
        builder.add_shard(entry);
    }
    Ok(builder.build())
}

/// Fat encoding: carries the index name.
pub fn encode_fat(table: &IndexShardRoutingTable) -> BytesMut {
    let mut buf = BytesMut::new();
    write_string(&mut buf, table.shard_id().index_name());
    write_vu32(&mut buf, table.shard_id().shard_number());
    write_body(&mut buf, table);
    buf
}

/// Thin encoding: omits the index name; the reader must supply it.
pub fn encode_thin(table: &IndexShardRoutingTable) -> BytesMut {
    let mut buf = BytesMut::new();
    write_vu32(&mut buf, table.shard_id().shard_number());
    write_body(&mut buf, table);
    buf
}

pub fn decode_fat(mut bytes: Bytes) -> Result<IndexShardRoutingTable, RoutingError> {
    let index_name = read_string(&mut bytes)?;
    let shard_number = read_vu32(&mut bytes)?;
    read_body(&mut bytes, ShardId::new(index_name, shard_number))
}

pub fn decode_thin(mut bytes: Bytes, index_name: &str) -> Result<IndexShardRoutingTable, RoutingError> {
    let shard_number = read_vu32(&mut bytes)?;
    read_body(&mut bytes, ShardId::new(index_name.to_string(), shard_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::builder::IndexShardRoutingTableBuilder;
    use crate::routing::shard_routing::ShardRoutingState;

    #[test]
    fn varint_boundary_values_roundtrip() {
        for value in [0u64, 1, 127, 128, 255, 300, u32::MAX as u64, u64::MAX, (1u64 << 63)] {
            let mut buf = BytesMut::new();
            write_vu64(&mut buf, value);
            let mut bytes = buf.freeze();
            assert_eq!(read_vu64(&mut bytes).unwrap(), value);
        }
    }

    #[test]
    fn vu32_rejects_values_above_u32_max() {
        let mut buf = BytesMut::new();
        write_vu64(&mut buf, u32::MAX as u64 + 1);
        let mut bytes = buf.freeze();
        assert!(matches!(read_vu32(&mut bytes), Err(RoutingError::OversizedLength { .. })));
    }

    fn sample_table() -> IndexShardRoutingTable {
        let mut builder = IndexShardRoutingTableBuilder::new(ShardId::new("products", 2));
        builder.add_shard(ShardRouting::new(
            ShardId::new("products", 2),
            true,
            Some("node-1".into()),
            None,
            ShardRoutingState::Started,
            9,
            Some("alloc-a".into()),
        ));
        builder.add_shard(ShardRouting::new(
            ShardId::new("products", 2),
            false,
            Some("node-2".into()),
            Some("node-3".into()),
            ShardRoutingState::Relocating,
            9,
            None,
        ));
        builder.add_shard(ShardRouting::new_unassigned(ShardId::new("products", 2), false));
        builder.build()
    }

    #[test]
    fn fat_roundtrip_preserves_shape() {
        let table = sample_table();
        let encoded = encode_fat(&table).freeze();
        let decoded = decode_fat(encoded).unwrap();

        assert_eq!(decoded.shard_id(), table.shard_id());
        assert_eq!(decoded.size(), table.size());
        assert_eq!(decoded.allocated_post_api(), table.allocated_post_api());
        for (a, b) in table.shards().iter().zip(decoded.shards().iter()) {
            assert_eq!(a.primary(), b.primary());
            assert_eq!(a.current_node_id(), b.current_node_id());
            assert_eq!(a.relocating_node_id(), b.relocating_node_id());
            assert_eq!(a.state(), b.state());
            assert_eq!(a.version(), b.version());
            assert_eq!(a.allocation_id(), b.allocation_id());
        }
    }

    #[test]
    fn fat_encoding_is_byte_identical_across_calls() {
        let table = sample_table();
        assert_eq!(encode_fat(&table), encode_fat(&table));
    }

    #[test]
    fn thin_roundtrip_requires_caller_supplied_index_name() {
        let table = sample_table();
        let encoded = encode_thin(&table).freeze();
        let decoded = decode_thin(encoded, "products").unwrap();
        assert_eq!(decoded.shard_id(), table.shard_id());
        assert_eq!(decoded.size(), table.size());
    }

    #[test]
    fn decode_rejects_truncated_payload() {
        let table = sample_table();
        let mut encoded = encode_fat(&table);
        encoded.truncate(encoded.len() - 1);
        assert!(decode_fat(encoded.freeze()).is_err());
    }

    #[test]
    fn decode_rejects_invalid_state_byte() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "idx");
        write_vu32(&mut buf, 0);
        buf.put_u8(0); // allocated_post_api
        write_vu32(&mut buf, 1); // one shard
        buf.put_u8(1); // primary
        buf.put_u8(0); // no current node
        buf.put_u8(0); // no relocating node
        buf.put_u8(200); // invalid state byte
        write_vu64(&mut buf, 1); // version
        buf.put_u8(0); // no allocation id

        let err = decode_fat(buf.freeze()).unwrap_err();
        assert_eq!(err, RoutingError::InvalidState(200));
    }

    #[test]
    fn decode_rejects_unassigned_with_node() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "idx");
        write_vu32(&mut buf, 0);
        buf.put_u8(0);
        write_vu32(&mut buf, 1);
        buf.put_u8(0); // not primary
        write_optional_string(&mut buf, Some("node-1"));
        buf.put_u8(0); // no relocating node
        buf.put_u8(ShardRoutingState::Unassigned.to_wire_byte());
        write_vu64(&mut buf, 0);
        buf.put_u8(0);

        let err = decode_fat(buf.freeze()).unwrap_err();
        assert_eq!(err, RoutingError::UnassignedWithNode);
    }
}
