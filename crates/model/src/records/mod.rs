pub mod partition;
pub mod queue;
pub mod request;
pub mod result;
