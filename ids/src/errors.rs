use thiserror::Error;

/// Errors raised while packing/unpacking node identities or validating graph configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("layer {layer} does not fit in {layer_bits} bits")]
    LayerOutOfRange { layer: u64, layer_bits: u8 },

    #[error("coordinate {value} does not fit in {bits} bits at layer {layer}")]
    CoordinateOutOfRange { value: u64, bits: u8, layer: u8 },

    #[error("segment {segment} does not fit in {bits} bits at layer {layer}")]
    SegmentOutOfRange { segment: u64, bits: u8, layer: u8 },

    #[error("layer {0} is not a valid layer for this graph (layer_count={1})")]
    InvalidLayer(u8, u8),

    #[error("invalid graph configuration: {0}")]
    InvalidConfig(String),

    #[error("skip connections are not implemented; refusing use_skip_connections=true")]
    SkipConnectionsUnsupported,
}

pub type IdResult<T> = std::result::Result<T, IdError>;
