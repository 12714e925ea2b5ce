//! Typed view over the `.env` document.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use swarmdeploy_shared::constants::{defaults, env_keys as keys};
use swarmdeploy_shared::{DeployError, DeployResult};

use super::file::EnvFile;
use super::server_config::ServerConfig;

/// How the stack's HTTP services are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyType {
    /// Behind the Traefik reverse proxy on an external overlay network.
    Traefik,
    /// Published directly on host ports.
    #[default]
    None,
}

impl ProxyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Traefik => "traefik",
            ProxyType::None => "none",
        }
    }
}

impl FromStr for ProxyType {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "traefik" => Ok(ProxyType::Traefik),
            "none" | "" => Ok(ProxyType::None),
            other => Err(DeployError::Config(format!(
                "{}: unknown proxy type '{}' (expected traefik or none)",
                keys::PROXY_TYPE,
                other
            ))),
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where TLS terminates in Traefik mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    /// Traefik terminates TLS itself (websecure entrypoint + cert resolver).
    #[default]
    Direct,
    /// An upstream proxy terminates TLS; Traefik serves plain HTTP.
    Proxy,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Direct => "direct",
            SslMode::Proxy => "proxy",
        }
    }
}

impl FromStr for SslMode {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "" => Ok(SslMode::Direct),
            "proxy" => Ok(SslMode::Proxy),
            other => Err(DeployError::Config(format!(
                "{}: unknown ssl mode '{}' (expected direct or proxy)",
                keys::SSL_MODE,
                other
            ))),
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalable stack services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Api,
    Check,
    Web,
    Phpmyadmin,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::Api,
        Component::Check,
        Component::Web,
        Component::Phpmyadmin,
    ];

    /// Service name inside the stack file.
    pub fn service_name(&self) -> &'static str {
        match self {
            Component::Api => "api",
            Component::Check => "check",
            Component::Web => "web",
            Component::Phpmyadmin => "phpmyadmin",
        }
    }

    /// `.env` key holding this component's replica count.
    pub fn replicas_key(&self) -> &'static str {
        match self {
            Component::Api => keys::API_REPLICAS,
            Component::Check => keys::CHECK_REPLICAS,
            Component::Web => keys::WEB_REPLICAS,
            Component::Phpmyadmin => keys::PHPMYADMIN_REPLICAS,
        }
    }
}

impl FromStr for Component {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.service_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DeployError::InvalidInput(format!(
                    "unknown component '{}' (expected api, check, web or phpmyadmin)",
                    s
                ))
            })
    }
}

/// Settings the toolkit needs, read once from `.env`.
#[derive(Debug, Clone)]
pub struct StackSettings {
    pub stack_name: String,
    pub data_root: PathBuf,
    pub proxy_type: ProxyType,
    pub ssl_mode: SslMode,
    pub image_name: String,
    pub image_version: String,
    pub web_image_name: String,
    pub web_image_version: String,
    pub web_enabled: bool,
    pub phpmyadmin_enabled: bool,
    pub api_url: Option<String>,
    pub web_url: Option<String>,
    pub phpmyadmin_url: Option<String>,
    pub api_port: u16,
    pub web_port: u16,
    pub phpmyadmin_port: u16,
    pub traefik_network: String,
    pub api_replicas: u32,
    pub check_replicas: u32,
    pub web_replicas: u32,
    pub phpmyadmin_replicas: u32,
    pub backup_network_enabled: bool,
    pub backup_network: String,
    pub telegram_enabled: bool,
    pub email_enabled: bool,
    pub google_drive_enabled: bool,
    pub keycloak_enabled: bool,
    pub db_name: String,
    pub server_config: ServerConfig,
}

impl StackSettings {
    /// Build settings from an env document.
    ///
    /// A relative `DATA_ROOT` is resolved against `project_root`.
    pub fn from_env(env: &EnvFile, project_root: &Path) -> DeployResult<Self> {
        let server_config = match env.get_non_empty(keys::SERVER_CONFIG) {
            Some(raw) => ServerConfig::parse(raw)?,
            None => ServerConfig::default(),
        };

        let data_root = match env.get_non_empty(keys::DATA_ROOT) {
            Some(p) if Path::new(p).is_absolute() => PathBuf::from(p),
            Some(p) => project_root.join(p),
            None => project_root.to_path_buf(),
        };

        let image_version = string_or(env, keys::IMAGE_VERSION, defaults::IMAGE_VERSION);

        Ok(Self {
            stack_name: string_or(env, keys::STACK_NAME, defaults::STACK_NAME),
            data_root,
            proxy_type: env.get(keys::PROXY_TYPE).unwrap_or_default().parse()?,
            ssl_mode: env.get(keys::SSL_MODE).unwrap_or_default().parse()?,
            image_name: string_or(env, keys::IMAGE_NAME, defaults::IMAGE_NAME),
            web_image_name: string_or(env, keys::WEB_IMAGE_NAME, defaults::WEB_IMAGE_NAME),
            web_image_version: string_or(env, keys::WEB_IMAGE_VERSION, &image_version),
            image_version,
            web_enabled: bool_or(env, keys::WEB_ENABLED, false)?,
            phpmyadmin_enabled: bool_or(env, keys::PHPMYADMIN_ENABLED, false)?,
            api_url: env.get_non_empty(keys::API_URL).map(str::to_string),
            web_url: env.get_non_empty(keys::WEB_URL).map(str::to_string),
            phpmyadmin_url: env.get_non_empty(keys::PHPMYADMIN_URL).map(str::to_string),
            api_port: number_or(env, keys::API_PORT, defaults::API_PORT)?,
            web_port: number_or(env, keys::WEB_PORT, defaults::WEB_PORT)?,
            phpmyadmin_port: number_or(env, keys::PHPMYADMIN_PORT, defaults::PHPMYADMIN_PORT)?,
            traefik_network: string_or(
                env,
                keys::TRAEFIK_NETWORK_NAME,
                defaults::TRAEFIK_NETWORK_NAME,
            ),
            api_replicas: number_or(env, keys::API_REPLICAS, defaults::REPLICAS)?,
            check_replicas: number_or(env, keys::CHECK_REPLICAS, defaults::REPLICAS)?,
            web_replicas: number_or(env, keys::WEB_REPLICAS, defaults::REPLICAS)?,
            phpmyadmin_replicas: number_or(env, keys::PHPMYADMIN_REPLICAS, defaults::REPLICAS)?,
            backup_network_enabled: bool_or(env, keys::ENABLE_BACKUP_NETWORK, false)?,
            backup_network: string_or(env, keys::BACKUP_NETWORK_NAME, defaults::BACKUP_NETWORK_NAME),
            telegram_enabled: bool_or(env, keys::TELEGRAM_ENABLED, false)?
                || server_config.telegram_enabled(),
            email_enabled: bool_or(env, keys::EMAIL_ENABLED, false)?
                || server_config.email_enabled(),
            google_drive_enabled: bool_or(env, keys::GOOGLE_DRIVE_ENABLED, false)?
                || server_config.google_drive_enabled(),
            keycloak_enabled: bool_or(env, keys::KEYCLOAK_ENABLED, false)?,
            db_name: string_or(env, keys::DB_NAME, defaults::DB_NAME),
            server_config,
        })
    }

    pub fn image(&self) -> String {
        format!("{}:{}", self.image_name, self.image_version)
    }

    pub fn web_image(&self) -> String {
        format!("{}:{}", self.web_image_name, self.web_image_version)
    }

    /// Fully qualified Swarm service name, e.g. `statechecker_api`.
    pub fn service(&self, name: &str) -> String {
        format!("{}_{}", self.stack_name, name)
    }

    pub fn replicas(&self, component: Component) -> u32 {
        match component {
            Component::Api => self.api_replicas,
            Component::Check => self.check_replicas,
            Component::Web => self.web_replicas,
            Component::Phpmyadmin => self.phpmyadmin_replicas,
        }
    }

    /// Whether the component is part of the assembled stack at all.
    pub fn is_included(&self, component: Component) -> bool {
        match component {
            Component::Api | Component::Check => true,
            Component::Web => self.web_enabled,
            Component::Phpmyadmin => self.phpmyadmin_enabled,
        }
    }
}

fn string_or(env: &EnvFile, key: &str, default: &str) -> String {
    env.get_non_empty(key).unwrap_or(default).to_string()
}

fn bool_or(env: &EnvFile, key: &str, default: bool) -> DeployResult<bool> {
    match env.get_non_empty(key) {
        None => Ok(default),
        Some(v) => parse_bool(v)
            .ok_or_else(|| DeployError::Config(format!("{}: '{}' is not a boolean", key, v))),
    }
}

fn number_or<T: FromStr>(env: &EnvFile, key: &str, default: T) -> DeployResult<T> {
    match env.get_non_empty(key) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| DeployError::Config(format!("{}: '{}' is not a valid number", key, v))),
    }
}

pub(crate) fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}
