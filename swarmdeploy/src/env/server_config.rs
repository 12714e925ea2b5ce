//! The `STATECHECKER_SERVER_CONFIG` JSON blob.

use serde::{Deserialize, Serialize};
use swarmdeploy_shared::{DeployError, DeployResult};

/// Checker configuration shipped to the server through one env value.
///
/// Only the parts the toolkit edits are typed; anything else the server
/// understands is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub websites: Vec<Website>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_drive: Option<GoogleDriveSettings>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelegramSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub chat_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleDriveSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl ServerConfig {
    pub fn parse(raw: &str) -> DeployResult<Self> {
        serde_json::from_str(raw).map_err(|e| {
            DeployError::Config(format!("STATECHECKER_SERVER_CONFIG is not valid JSON: {}", e))
        })
    }

    /// Compact JSON suitable for a single `.env` line.
    pub fn to_env_value(&self) -> DeployResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn telegram_enabled(&self) -> bool {
        self.telegram.as_ref().is_some_and(|t| t.enabled)
    }

    pub fn email_enabled(&self) -> bool {
        self.email.as_ref().is_some_and(|e| e.enabled)
    }

    pub fn google_drive_enabled(&self) -> bool {
        self.google_drive.as_ref().is_some_and(|g| g.enabled)
    }

    /// Add a website, replacing an existing entry with the same name.
    pub fn upsert_website(&mut self, website: Website) {
        match self.websites.iter_mut().find(|w| w.name == website.name) {
            Some(existing) => *existing = website,
            None => self.websites.push(website),
        }
    }

    pub fn remove_website(&mut self, name: &str) -> bool {
        let before = self.websites.len();
        self.websites.retain(|w| w.name != name);
        before != self.websites.len()
    }
}
