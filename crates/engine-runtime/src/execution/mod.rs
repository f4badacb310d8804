pub mod executor;
pub mod workers;

pub use executor::{RunSummary, run};
