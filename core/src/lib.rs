extern crate self as chunkedgraph_core;

pub mod assert;
pub mod log;
pub mod time;
