//! Deployment toolkit for the statechecker Docker Swarm stack.
//!
//! The library assembles `.env` and `swarm-stack.yml` from modular templates,
//! manages Swarm secrets, deploys and inspects the stack, and runs the
//! day-2 operations the CLI exposes (scaling, image updates, migrations,
//! backup-network attachment, Keycloak bootstrap).

pub mod backup_network;
pub mod cicd;
pub mod compose;
pub mod db;
pub mod docker;
pub mod env;
pub mod health;
pub mod keycloak;
pub mod layout;
pub mod options;
pub mod preflight;
pub mod prompt;
pub mod secrets;
pub mod stack;
pub mod state;
pub mod template;
pub mod wizard;

mod fsutil;

pub use docker::{DockerCli, DockerEngine};
pub use env::{EnvFile, ProxyType, SslMode, StackSettings};
pub use layout::ProjectLayout;
pub use options::DeployOptions;
pub use swarmdeploy_shared::{DeployError, DeployResult};
