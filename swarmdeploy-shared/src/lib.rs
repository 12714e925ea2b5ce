//! Types shared between the swarmdeploy library and its CLI.

pub mod constants;
pub mod errors;

pub use errors::{DeployError, DeployResult};
