use crate::errors::{IdError, IdResult};
use crate::id::IdCodec;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The persisted, serializable half of [`Meta`] — what actually gets written to
/// and compared against the `GraphSettings` row on open.
///
/// Mirrors the original `GraphConfig`/`DataSource` pair (`meta.py`): those two
/// namedtuples are flattened into one struct here since this crate does not model
/// a separate watershed/agglomeration dataset handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetaConfig {
    pub fanout: u32,
    pub layer_count: u8,
    pub atomic_spatial_bits: u8,
    /// Chunk size in voxels, one entry per spatial axis.
    pub chunk_size: [u32; 3],
    /// Number of bits used to shard the root chunk's segment counter.
    pub root_counter_bits: u8,
    pub lock_expiry_secs: u64,
    pub overwrite: bool,
    /// Parsed for config-row compatibility; rejected at construction if `true` (§9).
    pub use_skip_connections: bool,
}

/// Immutable graph configuration plus the [`IdCodec`] it derives.
#[derive(Clone, Debug)]
pub struct Meta {
    config: MetaConfig,
    codec: IdCodec,
}

impl Meta {
    pub fn new(
        fanout: u32,
        layer_count: u8,
        atomic_spatial_bits: u8,
        chunk_size: [u32; 3],
        root_counter_bits: u8,
        lock_expiry: Duration,
        overwrite: bool,
        use_skip_connections: bool,
    ) -> IdResult<Self> {
        Self::from_config(MetaConfig {
            fanout,
            layer_count,
            atomic_spatial_bits,
            chunk_size,
            root_counter_bits,
            lock_expiry_secs: lock_expiry.as_secs(),
            overwrite,
            use_skip_connections,
        })
    }

    pub fn from_config(config: MetaConfig) -> IdResult<Self> {
        if config.use_skip_connections {
            return Err(IdError::SkipConnectionsUnsupported);
        }
        if config.fanout < 1 {
            return Err(IdError::InvalidConfig("fanout must be >= 1".into()));
        }
        if config.layer_count < 2 {
            return Err(IdError::InvalidConfig("layer_count must be >= 2".into()));
        }
        if config.atomic_spatial_bits == 0 {
            return Err(IdError::InvalidConfig("atomic_spatial_bits must be >= 1".into()));
        }
        if config.root_counter_bits >= 32 {
            return Err(IdError::InvalidConfig("root_counter_bits too large".into()));
        }
        if config.chunk_size.iter().any(|&c| c == 0) {
            return Err(IdError::InvalidConfig("chunk_size components must be > 0".into()));
        }
        let codec = IdCodec::new(config.layer_count, config.fanout, config.atomic_spatial_bits);
        Ok(Self { config, codec })
    }

    /// Default configuration for the spec's worked examples: `F=2`, `S_1=10`,
    /// `layer_count=4`, `chunk_size=(512,512,128)`.
    pub fn default_example() -> Self {
        Self::new(2, 4, 10, [512, 512, 128], 0, Duration::from_secs(180), false, false).unwrap()
    }

    pub fn config(&self) -> &MetaConfig {
        &self.config
    }

    pub fn codec(&self) -> &IdCodec {
        &self.codec
    }

    pub fn fanout(&self) -> u32 {
        self.config.fanout
    }

    pub fn layer_count(&self) -> u8 {
        self.config.layer_count
    }

    pub fn root_layer(&self) -> u8 {
        self.config.layer_count
    }

    pub fn chunk_size(&self) -> [u32; 3] {
        self.config.chunk_size
    }

    pub fn root_counter_bits(&self) -> u8 {
        self.config.root_counter_bits
    }

    pub fn lock_expiry(&self) -> Duration {
        Duration::from_secs(self.config.lock_expiry_secs)
    }

    /// The root chunk id: layer `layer_count`, coordinates `(0, 0, 0)`.
    pub fn root_chunk_id(&self) -> IdResult<crate::id::ChunkId> {
        self.codec.pack(self.config.layer_count, 0, 0, 0, 0)
    }

    pub fn is_out_of_bounds(&self, x: i64, y: i64, z: i64) -> bool {
        self.codec.is_out_of_bounds(x, y, z)
    }

    /// Number of addressable chunks per axis at `layer`, derived from the
    /// per-layer spatial bit budget (supplements `layer_chunk_bounds`/
    /// `layer_chunk_counts` from `meta.py`, without requiring an external
    /// dataset bounds handle).
    pub fn layer_chunk_bound(&self, layer: u8) -> IdResult<u64> {
        Ok(1u64 << self.codec.spatial_bits(layer)?)
    }

    pub fn layer_chunk_count(&self, layer: u8) -> IdResult<u64> {
        let bound = self.layer_chunk_bound(layer)?;
        Ok(bound.saturating_mul(bound).saturating_mul(bound))
    }

    /// Resolves a voxel-space coordinate to the chunk id containing it at `layer`,
    /// dividing by `chunk_size * fanout^(layer-2)` per axis (ported from the
    /// original `get_chunk_id`-from-coordinate helper).
    pub fn chunk_id_from_voxel(&self, layer: u8, voxel: [u64; 3]) -> IdResult<crate::id::ChunkId> {
        if layer < 2 {
            return Err(IdError::InvalidLayer(layer, self.config.layer_count));
        }
        let scale = (self.config.fanout as u64).pow((layer - 2) as u32);
        let x = voxel[0] / (self.config.chunk_size[0] as u64 * scale);
        let y = voxel[1] / (self.config.chunk_size[1] as u64 * scale);
        let z = voxel[2] / (self.config.chunk_size[2] as u64 * scale);
        self.codec.pack(layer, x, y, z, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_skip_connections() {
        let err = Meta::new(2, 4, 10, [512, 512, 128], 0, Duration::from_secs(180), false, true).unwrap_err();
        assert_eq!(err, IdError::SkipConnectionsUnsupported);
    }

    #[test]
    fn default_example_matches_spec_literals() {
        let meta = Meta::default_example();
        assert_eq!(meta.fanout(), 2);
        assert_eq!(meta.layer_count(), 4);
        assert_eq!(meta.root_chunk_id().unwrap(), meta.codec().pack(4, 0, 0, 0, 0).unwrap());
    }

    #[test]
    fn voxel_resolves_to_chunk() {
        let meta = Meta::default_example();
        let chunk = meta.chunk_id_from_voxel(2, [600, 10, 10]).unwrap();
        let parts = meta.codec().unpack(chunk).unwrap();
        assert_eq!((parts.layer, parts.x, parts.y, parts.z), (2, 1, 0, 0));
    }

    #[test]
    fn config_round_trips_through_serde() {
        let meta = Meta::default_example();
        let json = serde_json::to_string(meta.config()).unwrap();
        let config: MetaConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(&config, meta.config());
    }
}
