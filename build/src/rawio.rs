//! Parsing for the build-phase raw files named in spec §6: zstd-compressed
//! agglomeration pair arrays, and typed atomic-edge records in the v2/v3/v4
//! layouts `meta.py`'s `edge_dtype` produces. Build-time only — these bytes
//! never cross into the core edit path.

use crate::errors::{BuildError, BuildResult};
use chunkedgraph_ids::NodeId;

/// One atomic edge as read off disk: a supervoxel pair plus its total
/// affinity and boundary area. v3/v4 records carry three axis-decomposed
/// `(affinity, area)` pairs (one per `{x, y, z}` crossing); those are summed
/// into the single scalar pair callers use everywhere else, matching how
/// the original ingestion collapses per-axis contributions before grouping
/// by `(sv1, sv2)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawEdge {
    pub sv1: NodeId,
    pub sv2: NodeId,
    pub affinity: f32,
    pub area: u64,
}

fn read_u64(bytes: &[u8], offset: usize) -> BuildResult<u64> {
    let slice = bytes
        .get(offset..offset + 8)
        .ok_or_else(|| BuildError::MalformedRecord(format!("truncated record at offset {offset}")))?;
    Ok(u64::from_le_bytes(slice.try_into().unwrap()))
}

fn read_f32(bytes: &[u8], offset: usize) -> BuildResult<f32> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| BuildError::MalformedRecord(format!("truncated record at offset {offset}")))?;
    Ok(f32::from_le_bytes(slice.try_into().unwrap()))
}

fn read_f64(bytes: &[u8], offset: usize) -> BuildResult<f64> {
    let slice = bytes
        .get(offset..offset + 8)
        .ok_or_else(|| BuildError::MalformedRecord(format!("truncated record at offset {offset}")))?;
    Ok(f64::from_le_bytes(slice.try_into().unwrap()))
}

/// Record byte layout per version: `sv1:u64, sv2:u64` always lead, followed
/// by the version-specific affinity/area fields.
fn record_len(version: u8) -> BuildResult<usize> {
    match version {
        2 => Ok(8 + 8 + 4 + 8),
        3 => Ok(8 + 8 + 3 * (8 + 8)),
        4 => Ok(8 + 8 + 3 * (4 + 8)),
        other => Err(BuildError::MalformedRecord(format!("unsupported edge record version {other}"))),
    }
}

/// Parses a flat byte buffer of fixed-width edge records (little-endian,
/// matching the numpy structured dtype `meta.py::edge_dtype` produces) into
/// [`RawEdge`]s.
pub fn parse_edge_records(bytes: &[u8], version: u8) -> BuildResult<Vec<RawEdge>> {
    let len = record_len(version)?;
    if bytes.len() % len != 0 {
        return Err(BuildError::MalformedRecord(format!(
            "buffer length {} is not a multiple of v{version} record length {len}",
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(len)
        .map(|record| {
            let sv1 = NodeId::new(read_u64(record, 0)?);
            let sv2 = NodeId::new(read_u64(record, 8)?);
            let (affinity, area) = match version {
                2 => (read_f32(record, 16)?, read_u64(record, 20)?),
                3 => {
                    let mut aff = 0f64;
                    let mut area = 0u64;
                    for axis in 0..3 {
                        let base = 16 + axis * 16;
                        aff += read_f64(record, base)?;
                        area += read_u64(record, base + 8)?;
                    }
                    (aff as f32, area)
                }
                4 => {
                    let mut aff = 0f32;
                    let mut area = 0u64;
                    for axis in 0..3 {
                        let base = 16 + axis * 12;
                        aff += read_f32(record, base)?;
                        area += read_u64(record, base + 4)?;
                    }
                    (aff, area)
                }
                other => return Err(BuildError::MalformedRecord(format!("unsupported edge record version {other}"))),
            };
            Ok(RawEdge { sv1, sv2, affinity, area })
        })
        .collect()
}

/// Decompresses and parses an agglomeration file: a zstd-compressed flat
/// array of `(u64, u64)` supervoxel pairs that the upstream watershed/
/// agglomeration step has already decided belong together, independent of
/// edge affinity (`_read_agg_files`).
pub fn parse_agglomeration_pairs(compressed: &[u8]) -> BuildResult<Vec<(NodeId, NodeId)>> {
    let decompressed = zstd::decode_all(compressed).map_err(|e| BuildError::Decompress(e.to_string()))?;
    if decompressed.len() % 16 != 0 {
        return Err(BuildError::Decompress(format!(
            "decompressed agglomeration buffer length {} is not a multiple of 16",
            decompressed.len()
        )));
    }
    decompressed
        .chunks_exact(16)
        .map(|pair| Ok((NodeId::new(read_u64(pair, 0)?), NodeId::new(read_u64(pair, 8)?))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_record_round_trips() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&7u64.to_le_bytes());
        bytes.extend_from_slice(&9u64.to_le_bytes());
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&42u64.to_le_bytes());

        let edges = parse_edge_records(&bytes, 2).unwrap();
        assert_eq!(edges, vec![RawEdge { sv1: NodeId::new(7), sv2: NodeId::new(9), affinity: 1.5, area: 42 }]);
    }

    #[test]
    fn v4_record_sums_axis_components() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&2u64.to_le_bytes());
        for (aff, area) in [(1.0f32, 10u64), (2.0, 20), (3.0, 30)] {
            bytes.extend_from_slice(&aff.to_le_bytes());
            bytes.extend_from_slice(&area.to_le_bytes());
        }

        let edges = parse_edge_records(&bytes, 4).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].affinity, 6.0);
        assert_eq!(edges[0].area, 60);
    }

    #[test]
    fn rejects_truncated_buffer() {
        let err = parse_edge_records(&[0u8; 10], 2).unwrap_err();
        assert!(matches!(err, BuildError::MalformedRecord(_)));
    }

    #[test]
    fn agglomeration_pairs_round_trip_through_zstd() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&3u64.to_le_bytes());
        raw.extend_from_slice(&4u64.to_le_bytes());
        let compressed = zstd::encode_all(raw.as_slice(), 0).unwrap();

        let pairs = parse_agglomeration_pairs(&compressed).unwrap();
        assert_eq!(pairs, vec![(NodeId::new(3), NodeId::new(4))]);
    }
}
