//! The secrets the stack file references.

use swarmdeploy_shared::constants::secrets as names;

use crate::env::StackSettings;

/// Feature a non-required secret belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integration {
    Telegram,
    Email,
    GoogleDrive,
    Keycloak,
}

impl Integration {
    pub fn is_enabled(&self, settings: &StackSettings) -> bool {
        match self {
            Integration::Telegram => settings.telegram_enabled,
            Integration::Email => settings.email_enabled,
            Integration::GoogleDrive => settings.google_drive_enabled,
            Integration::Keycloak => settings.keycloak_enabled,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SecretSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// `None` for required secrets.
    pub integration: Option<Integration>,
}

impl SecretSpec {
    pub fn is_required(&self) -> bool {
        self.integration.is_none()
    }
}

pub const CATALOG: [SecretSpec; 7] = [
    SecretSpec {
        name: names::AUTHENTICATION_TOKEN,
        description: "token API clients present to the statechecker server",
        integration: None,
    },
    SecretSpec {
        name: names::DB_ROOT_USER_PW,
        description: "MySQL root password",
        integration: None,
    },
    SecretSpec {
        name: names::DB_USER_PW,
        description: "MySQL application user password",
        integration: None,
    },
    SecretSpec {
        name: names::TELEGRAM_SENDER_BOT_TOKEN,
        description: "Telegram bot token for notifications",
        integration: Some(Integration::Telegram),
    },
    SecretSpec {
        name: names::EMAIL_SENDER_PASSWORD,
        description: "SMTP password of the notification sender",
        integration: Some(Integration::Email),
    },
    SecretSpec {
        name: names::GOOGLE_DRIVE_SERVICE_ACCOUNT_JSON,
        description: "Google Drive service account key (JSON)",
        integration: Some(Integration::GoogleDrive),
    },
    SecretSpec {
        name: names::KEYCLOAK_CLIENT_SECRET,
        description: "Keycloak backend client secret",
        integration: Some(Integration::Keycloak),
    },
];

pub fn lookup(name: &str) -> Option<&'static SecretSpec> {
    CATALOG.iter().find(|s| s.name == name)
}

pub fn required() -> impl Iterator<Item = &'static SecretSpec> {
    CATALOG.iter().filter(|s| s.is_required())
}

pub fn optional() -> impl Iterator<Item = &'static SecretSpec> {
    CATALOG.iter().filter(|s| !s.is_required())
}
