//! Deployment configuration: the `.env` document and its typed view.

mod file;
mod server_config;
mod settings;

pub use file::{EnvFile, update_env_values};
pub use server_config::{EmailSettings, GoogleDriveSettings, ServerConfig, TelegramSettings, Website};
pub use settings::{Component, ProxyType, SslMode, StackSettings};
