//! Bit-packed node identities ([`IdCodec`]) and immutable graph configuration
//! ([`Meta`]) for the chunked connectivity graph. No other crate in the
//! workspace depends on a particular backing store; everything here is pure
//! arithmetic over `u64`.

mod bitmask;
mod errors;
mod id;
mod meta;

pub use bitmask::{ceil_log2, compute_bitmasks};
pub use errors::{IdError, IdResult};
pub use id::{ChunkId, IdCodec, NodeComponents, NodeId};
pub use meta::{Meta, MetaConfig};
