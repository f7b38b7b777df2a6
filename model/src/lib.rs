pub mod allocator;
pub mod codec;
pub mod errors;
pub mod log_entry;
pub mod schema;
pub mod settings;

pub use allocator::IdAllocator;
pub use errors::{GraphError, GraphResult};
pub use log_entry::{Coordinate, EdgeRecord, LogEntry};
pub use settings::open_or_create;
