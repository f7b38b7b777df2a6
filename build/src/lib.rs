pub mod chunk_builder;
pub mod errors;
pub mod rawio;

pub use chunk_builder::{ChunkBuilder, EdgeCategory, EdgeLoader};
pub use errors::{BuildError, BuildResult};
pub use rawio::{parse_agglomeration_pairs, parse_edge_records, RawEdge};
