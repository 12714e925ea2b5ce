pub mod assemble;
pub mod backup_network;
pub mod cicd;
pub mod completion;
pub mod deploy;
pub mod env;
pub mod keycloak;
pub mod menu;
pub mod migrate;
pub mod no_proxy;
pub mod scale;
pub mod secrets;
pub mod setup;
pub mod status;
