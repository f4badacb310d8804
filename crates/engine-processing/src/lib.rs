pub mod error;
pub mod flusher;
pub mod producer;
pub mod queue;
pub mod worker;
