pub mod error;
pub mod location;
pub mod sink;
pub mod source;
pub mod storage;
pub mod store;

pub use sink::OutputSink;
pub use source::{LineReader, RequestSource};
pub use storage::Storage;
