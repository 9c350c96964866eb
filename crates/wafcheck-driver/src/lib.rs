pub mod aws;
pub mod driver;
pub mod error;
pub mod random;
pub mod teardown;
pub mod terraform;
pub mod workspace;

pub use aws::AwsZoneLookup;
pub use driver::{IacStep, IacTool, Outputs, RunLog, ZoneLookup};
pub use error::DriverError;
pub use random::random_unique_id;
pub use teardown::TeardownGuard;
pub use terraform::TerraformRunner;
pub use workspace::{remove_workspace, stage_workspace, StagedWorkspace};
