use crate::errors::{IdError, IdResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 64-bit packed graph node identity: `[layer][x][y][z][segment]`, MSB first.
///
/// Identities are only meaningful relative to the [`IdCodec`] (equivalently, the
/// [`crate::Meta`]) that produced them: the spatial field widths are per-layer and
/// per-graph, so the same raw `u64` decodes differently under a different fan-out
/// or atomic spatial bit budget.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// A [`NodeId`] whose segment field is zero: the identity of a spatial chunk at some layer.
pub type ChunkId = NodeId;

/// Unpacked components of a [`NodeId`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeComponents {
    pub layer: u8,
    pub x: u64,
    pub y: u64,
    pub z: u64,
    pub segment: u64,
}

/// Packs and unpacks [`NodeId`]s for one fixed graph configuration.
///
/// `L` (layer bits) is fixed at 8. Per-layer spatial field widths `S_l` come from
/// [`crate::bitmask::compute_bitmasks`]; the segment field takes whatever bits remain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCodec {
    layer_bits: u8,
    layer_count: u8,
    fanout: u32,
    /// `spatial_bits[l - 1] == S_l` for `l` in `1..=layer_count`.
    spatial_bits: Vec<u8>,
}

const LAYER_BITS: u8 = 8;

impl IdCodec {
    pub fn new(layer_count: u8, fanout: u32, s_bits_atomic: u8) -> Self {
        let spatial_bits = crate::bitmask::compute_bitmasks(layer_count, fanout, s_bits_atomic);
        Self { layer_bits: LAYER_BITS, layer_count, fanout, spatial_bits }
    }

    pub fn layer_count(&self) -> u8 {
        self.layer_count
    }

    pub fn fanout(&self) -> u32 {
        self.fanout
    }

    pub fn spatial_bits(&self, layer: u8) -> IdResult<u8> {
        if layer == 0 || layer > self.layer_count {
            return Err(IdError::InvalidLayer(layer, self.layer_count));
        }
        Ok(self.spatial_bits[(layer - 1) as usize])
    }

    fn segment_bits(&self, layer: u8) -> IdResult<u8> {
        let s = self.spatial_bits(layer)?;
        Ok(64 - self.layer_bits - 3 * s)
    }

    /// Packs `(layer, x, y, z, segment)` into a [`NodeId`], or fails with
    /// [`IdError`] if any field overflows its bit width.
    pub fn pack(&self, layer: u8, x: u64, y: u64, z: u64, segment: u64) -> IdResult<NodeId> {
        if layer == 0 || layer > self.layer_count {
            return Err(IdError::InvalidLayer(layer, self.layer_count));
        }
        let s = self.spatial_bits(layer)?;
        let seg_bits = self.segment_bits(layer)?;
        let check = |value: u64, bits: u8| value < (1u64 << bits);
        if !check(x, s) {
            return Err(IdError::CoordinateOutOfRange { value: x, bits: s, layer });
        }
        if !check(y, s) {
            return Err(IdError::CoordinateOutOfRange { value: y, bits: s, layer });
        }
        if !check(z, s) {
            return Err(IdError::CoordinateOutOfRange { value: z, bits: s, layer });
        }
        if !check(segment, seg_bits) {
            return Err(IdError::SegmentOutOfRange { segment, bits: seg_bits, layer });
        }

        let mut raw = (layer as u64) << (64 - self.layer_bits);
        raw |= x << (64 - self.layer_bits - s);
        raw |= y << (64 - self.layer_bits - 2 * s);
        raw |= z << (64 - self.layer_bits - 3 * s);
        raw |= segment;
        Ok(NodeId(raw))
    }

    pub fn layer_of(&self, node: NodeId) -> u8 {
        (node.0 >> (64 - self.layer_bits)) as u8
    }

    pub fn unpack(&self, node: NodeId) -> IdResult<NodeComponents> {
        let layer = self.layer_of(node);
        let s = self.spatial_bits(layer)?;
        let seg_bits = self.segment_bits(layer)?;
        let mask = |bits: u8| if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
        let x = (node.0 >> (64 - self.layer_bits - s)) & mask(s);
        let y = (node.0 >> (64 - self.layer_bits - 2 * s)) & mask(s);
        let z = (node.0 >> (64 - self.layer_bits - 3 * s)) & mask(s);
        let segment = node.0 & mask(seg_bits);
        Ok(NodeComponents { layer, x, y, z, segment })
    }

    pub fn segment_of(&self, node: NodeId) -> IdResult<u64> {
        Ok(self.unpack(node)?.segment)
    }

    /// The chunk (segment zeroed) that `node` belongs to.
    pub fn chunk_of(&self, node: NodeId) -> IdResult<ChunkId> {
        let c = self.unpack(node)?;
        self.pack(c.layer, c.x, c.y, c.z, 0)
    }

    pub fn chunk_layer_of(&self, node: NodeId) -> u8 {
        self.layer_of(node)
    }

    /// The ancestor chunk of `chunk` at `target_layer`, dividing each coordinate
    /// by `fanout` once per intervening layer.
    pub fn parent_chunk_of(&self, chunk: ChunkId, target_layer: u8) -> IdResult<ChunkId> {
        let c = self.unpack(chunk)?;
        if target_layer <= c.layer {
            return Err(IdError::InvalidConfig(format!(
                "parent_chunk_of requires target_layer > {} (got {})",
                c.layer, target_layer
            )));
        }
        let steps = (target_layer - c.layer) as u32;
        let divisor = (self.fanout as u64).pow(steps);
        self.pack(target_layer, c.x / divisor, c.y / divisor, c.z / divisor, 0)
    }

    /// Up to `fanout^3` children of `chunk` at `chunk`'s layer minus one.
    ///
    /// Atomic parents (layer 2) have exactly one child: the layer-1 chunk with
    /// identical coordinates (level 1 is not spatially subdivided further).
    pub fn child_chunks(&self, chunk: ChunkId) -> IdResult<Vec<ChunkId>> {
        let c = self.unpack(chunk)?;
        if c.layer <= 1 {
            return Err(IdError::InvalidLayer(c.layer.saturating_sub(1), self.layer_count));
        }
        let child_layer = c.layer - 1;
        if c.layer == 2 {
            return Ok(vec![self.pack(child_layer, c.x, c.y, c.z, 0)?]);
        }
        let f = self.fanout as u64;
        let mut out = Vec::with_capacity((f * f * f) as usize);
        for dx in 0..f {
            for dy in 0..f {
                for dz in 0..f {
                    out.push(self.pack(child_layer, c.x * f + dx, c.y * f + dy, c.z * f + dz, 0)?);
                }
            }
        }
        Ok(out)
    }

    /// Smallest layer `l >= 2` at which the chunks containing atomic nodes `a` and
    /// `b` coincide; `1` if `a` and `b` already share a chunk at their own layer.
    pub fn cross_chunk_layer(&self, a: NodeId, b: NodeId) -> IdResult<u8> {
        let ca = self.unpack(a)?;
        let cb = self.unpack(b)?;
        let (mut xa, mut ya, mut za) = (ca.x, ca.y, ca.z);
        let (mut xb, mut yb, mut zb) = (cb.x, cb.y, cb.z);
        if (xa, ya, za) == (xb, yb, zb) {
            return Ok(1);
        }
        let f = self.fanout as u64;
        let mut layer = ca.layer.max(1);
        while layer < self.layer_count {
            xa /= f;
            ya /= f;
            za /= f;
            xb /= f;
            yb /= f;
            zb /= f;
            layer += 1;
            if (xa, ya, za) == (xb, yb, zb) {
                return Ok(layer);
            }
        }
        Ok(self.layer_count)
    }

    /// True if any coordinate is negative or exceeds the atomic-layer spatial
    /// budget `2^S_1`. Accepts signed coordinates since callers may compute a
    /// candidate chunk position before it is known to be valid.
    pub fn is_out_of_bounds(&self, x: i64, y: i64, z: i64) -> bool {
        let bound = 1i64 << self.spatial_bits[0];
        x < 0 || y < 0 || z < 0 || x > bound || y > bound || z > bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> IdCodec {
        IdCodec::new(4, 2, 10)
    }

    #[test]
    fn pack_unpack_round_trip() {
        let c = codec();
        for &(layer, x, y, z, seg) in &[(1u8, 3u64, 2, 1, 7), (2, 0, 0, 0, 5), (4, 0, 0, 0, 0)] {
            let id = c.pack(layer, x, y, z, seg).unwrap();
            let parts = c.unpack(id).unwrap();
            assert_eq!((parts.layer, parts.x, parts.y, parts.z, parts.segment), (layer, x, y, z, seg));
        }
    }

    #[test]
    fn chunk_of_strips_segment() {
        let c = codec();
        let id = c.pack(1, 3, 2, 1, 7).unwrap();
        let chunk = c.chunk_of(id).unwrap();
        assert_eq!(c.segment_of(chunk).unwrap(), 0);
        assert_eq!(c.chunk_layer_of(id), 1);
    }

    #[test]
    fn s1_identity_layout() {
        // S1 from spec.md: pack(1, 3, 2, 1, 7) decodes to the same tuple.
        let c = codec();
        let id = c.pack(1, 3, 2, 1, 7).unwrap();
        assert_eq!(c.chunk_layer_of(id), 1);
        let parts = c.unpack(id).unwrap();
        assert_eq!((parts.x, parts.y, parts.z, parts.segment), (3, 2, 1, 7));
    }

    #[test]
    fn s2_cross_chunk_layer() {
        let c = codec();
        let a = c.pack(1, 0, 0, 0, 1).unwrap();
        let b = c.pack(1, 1, 0, 0, 1).unwrap();
        assert_eq!(c.cross_chunk_layer(a, b).unwrap(), 2);
        let b2 = c.pack(1, 2, 0, 0, 1).unwrap();
        assert_eq!(c.cross_chunk_layer(a, b2).unwrap(), 3);
    }

    #[test]
    fn same_chunk_is_layer_one() {
        let c = codec();
        let a = c.pack(1, 5, 5, 5, 1).unwrap();
        let b = c.pack(1, 5, 5, 5, 2).unwrap();
        assert_eq!(c.cross_chunk_layer(a, b).unwrap(), 1);
    }

    #[test]
    fn atomic_parent_has_single_identical_child() {
        let c = codec();
        let l2 = c.pack(2, 4, 4, 4, 0).unwrap();
        let children = c.child_chunks(l2).unwrap();
        assert_eq!(children.len(), 1);
        let parts = c.unpack(children[0]).unwrap();
        assert_eq!((parts.layer, parts.x, parts.y, parts.z), (1, 4, 4, 4));
    }

    #[test]
    fn parent_and_children_round_trip() {
        let c = codec();
        let l2 = c.pack(2, 5, 3, 1, 0).unwrap();
        let l3 = c.parent_chunk_of(l2, 3).unwrap();
        let children = c.child_chunks(l3).unwrap();
        assert!(children.contains(&l2));
        assert_eq!(children.len(), (c.fanout() as usize).pow(3));
    }

    #[test]
    fn out_of_range_fields_fail() {
        let c = codec();
        assert!(c.pack(1, 1 << 10, 0, 0, 0).is_err());
        assert!(c.pack(0, 0, 0, 0, 0).is_err());
        assert!(c.pack(5, 0, 0, 0, 0).is_err());
    }
}
