pub mod cycle;
pub mod error;
pub mod report;

pub use cycle::Harness;
pub use error::HarnessError;
pub use report::CycleReport;
