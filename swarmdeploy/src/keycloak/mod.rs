//! Keycloak realm bootstrap for statechecker.
//!
//! Creates (or reuses) the realm, the granular realm roles, a public
//! frontend client with PKCE, a confidential backend client and the initial
//! users, then hands back the backend client secret. Every step is
//! idempotent, so rerunning against a configured realm only fills gaps.

mod client;
#[cfg(test)]
mod fake;

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use swarmdeploy_shared::constants::{env_keys as keys, secrets as names};
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::docker::DockerEngine;
use crate::env::EnvFile;
use crate::options::DeployOptions;
use crate::prompt::Prompter;
use crate::secrets::{RecreatePolicy, SecretManager, SecretOutcome};

pub use client::{AdminApi, AdminResponse, HttpAdmin, Method};

/// Realm roles and their descriptions.
pub const GRANULAR_ROLES: [(&str, &str); 2] = [
    (
        "statechecker:read",
        "View monitoring data and status (LOW criticality)",
    ),
    (
        "statechecker:admin",
        "Full access including configuration changes",
    ),
];

pub const DEFAULT_BASE_URL: &str = "http://localhost:9090";
pub const DEFAULT_REALM: &str = "statechecker";
pub const DEFAULT_FRONTEND_CLIENT_ID: &str = "statechecker-frontend";
pub const DEFAULT_BACKEND_CLIENT_ID: &str = "statechecker-backend";
pub const DEFAULT_FRONTEND_ROOT_URL: &str = "http://localhost:8788";
pub const DEFAULT_API_ROOT_URL: &str = "http://localhost:8787";
pub const DEFAULT_SERVICE_ACCOUNT_ROLE: &str = "statechecker:admin";

/// A user to create, parsed from `username:password:role1,role2`.
///
/// Everything after the second colon is the role list, so role names may
/// contain colons (`admin:secret:statechecker:admin`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSpec {
    pub username: String,
    pub password: String,
    pub roles: Vec<String>,
}

impl FromStr for UserSpec {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |why: &str| {
            DeployError::InvalidInput(format!(
                "invalid user spec '{}': {} (use username:password:role1,role2)",
                s, why
            ))
        };
        let mut parts = s.splitn(3, ':');
        let (Some(username), Some(password), Some(roles)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected three fields"));
        };
        let roles: Vec<String> = roles
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        if username.is_empty() || password.is_empty() || roles.is_empty() {
            return Err(invalid("username, password and roles are required"));
        }
        Ok(UserSpec {
            username: username.to_string(),
            password: password.to_string(),
            roles,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub base_url: String,
    pub admin_user: String,
    pub admin_password: String,
    pub realm: String,
    pub frontend_client_id: String,
    pub backend_client_id: String,
    pub frontend_root_url: String,
    pub api_root_url: String,
    /// Extra realm roles on top of [`GRANULAR_ROLES`].
    pub extra_roles: Vec<String>,
    pub users: Vec<UserSpec>,
    /// Realm role granted to the backend client's service account.
    pub service_account_role: Option<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            admin_user: "admin".into(),
            admin_password: "admin".into(),
            realm: DEFAULT_REALM.into(),
            frontend_client_id: DEFAULT_FRONTEND_CLIENT_ID.into(),
            backend_client_id: DEFAULT_BACKEND_CLIENT_ID.into(),
            frontend_root_url: DEFAULT_FRONTEND_ROOT_URL.into(),
            api_root_url: DEFAULT_API_ROOT_URL.into(),
            extra_roles: Vec::new(),
            users: Vec::new(),
            service_account_role: Some(DEFAULT_SERVICE_ACCOUNT_ROLE.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapUser {
    pub username: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapSummary {
    pub realm: String,
    pub frontend_client_id: String,
    pub backend_client_id: String,
    #[serde(skip)]
    pub backend_client_secret: String,
    pub roles: Vec<String>,
    pub users: Vec<BootstrapUser>,
}

/// Frontend (public, PKCE) and backend (confidential, service account) clients.
pub fn client_payloads(config: &BootstrapConfig) -> (Value, Value) {
    let frontend = json!({
        "clientId": config.frontend_client_id,
        "name": config.frontend_client_id,
        "protocol": "openid-connect",
        "publicClient": true,
        "standardFlowEnabled": true,
        "directAccessGrantsEnabled": true,
        "implicitFlowEnabled": false,
        "serviceAccountsEnabled": false,
        "rootUrl": config.frontend_root_url,
        "baseUrl": "/",
        "redirectUris": [format!("{}/*", config.frontend_root_url.trim_end_matches('/'))],
        "webOrigins": [config.frontend_root_url, config.api_root_url, "+"],
        "attributes": {"pkce.code.challenge.method": "S256"},
    });
    let backend = json!({
        "clientId": config.backend_client_id,
        "name": config.backend_client_id,
        "protocol": "openid-connect",
        "publicClient": false,
        "standardFlowEnabled": false,
        "directAccessGrantsEnabled": false,
        "implicitFlowEnabled": false,
        "serviceAccountsEnabled": true,
        "bearerOnly": false,
        "rootUrl": config.api_root_url,
        "baseUrl": "/",
    });
    (frontend, backend)
}

/// `my-realm` -> `My Realm`.
fn display_name(realm: &str) -> String {
    realm
        .split(['-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn id_of(value: &Value) -> Option<String> {
    value.get("id").and_then(Value::as_str).map(str::to_string)
}

fn first_id(response: &AdminResponse) -> Option<String> {
    if response.status != 200 {
        return None;
    }
    response.body.as_array().and_then(|a| a.first()).and_then(id_of)
}

/// One authenticated pass over the admin API.
struct Session<'a> {
    api: &'a dyn AdminApi,
    token: String,
    realm: String,
}

impl Session<'_> {
    fn realm_path(&self, rest: &str) -> String {
        format!("/admin/realms/{}{}", self.realm, rest)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> DeployResult<AdminResponse> {
        self.api.call(&self.token, Method::Get, path, query, None).await
    }

    async fn send(&self, method: Method, path: &str, body: &Value) -> DeployResult<AdminResponse> {
        self.api.call(&self.token, method, path, &[], Some(body)).await
    }

    async fn ensure_realm(&self) -> DeployResult<()> {
        let response = self.get(&self.realm_path(""), &[]).await?;
        if response.status == 200 {
            tracing::info!(realm = %self.realm, "Realm exists");
            return Ok(());
        }
        if !response.is(&[400, 404]) {
            return Err(DeployError::Keycloak(format!(
                "failed to check realm '{}': {}",
                self.realm,
                response.describe()
            )));
        }

        let payload = json!({
            "realm": self.realm,
            "displayName": display_name(&self.realm),
            "enabled": true,
            "loginWithEmailAllowed": true,
            "resetPasswordAllowed": true,
            "registrationAllowed": false,
        });
        let created = self.send(Method::Post, "/admin/realms", &payload).await?;
        if !created.is(&[201, 204]) {
            return Err(DeployError::Keycloak(format!(
                "failed to create realm '{}': {}",
                self.realm,
                created.describe()
            )));
        }
        tracing::info!(realm = %self.realm, "Created realm");
        Ok(())
    }

    async fn ensure_role(&self, role: &str, description: &str) -> DeployResult<()> {
        let path = self.realm_path(&format!("/roles/{}", role));
        if self.get(&path, &[]).await?.status == 200 {
            tracing::debug!(role, "Role exists");
            return Ok(());
        }
        let created = self
            .send(
                Method::Post,
                &self.realm_path("/roles"),
                &json!({"name": role, "description": description}),
            )
            .await?;
        match created.status {
            201 | 204 => tracing::info!(role, "Created role"),
            409 => tracing::debug!(role, "Role exists (conflict)"),
            _ => {
                return Err(DeployError::Keycloak(format!(
                    "failed to create role '{}': {}",
                    role,
                    created.describe()
                )));
            }
        }
        Ok(())
    }

    async fn find_client(&self, client_id: &str) -> DeployResult<Option<String>> {
        let response = self
            .get(&self.realm_path("/clients"), &[("clientId", client_id)])
            .await?;
        Ok(first_id(&response))
    }

    /// UUID of the client, creating it from `payload` if needed.
    async fn ensure_client(&self, client_id: &str, payload: &Value) -> DeployResult<String> {
        if let Some(uuid) = self.find_client(client_id).await? {
            tracing::info!(client_id, "Client exists");
            return Ok(uuid);
        }
        let created = self
            .send(Method::Post, &self.realm_path("/clients"), payload)
            .await?;
        if !created.is(&[201, 204]) {
            return Err(DeployError::Keycloak(format!(
                "failed to create client '{}': {}",
                client_id,
                created.describe()
            )));
        }
        tracing::info!(client_id, "Created client");
        self.find_client(client_id).await?.ok_or_else(|| {
            DeployError::Keycloak(format!("client '{}' not found after creation", client_id))
        })
    }

    async fn client_secret(&self, uuid: &str) -> DeployResult<String> {
        let response = self
            .get(&self.realm_path(&format!("/clients/{}/client-secret", uuid)), &[])
            .await?;
        if response.status != 200 {
            return Err(DeployError::Keycloak(format!(
                "failed to fetch client secret: {}",
                response.describe()
            )));
        }
        response
            .body
            .get("value")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DeployError::Keycloak("client secret response missing value".into()))
    }

    async fn find_user(&self, username: &str) -> DeployResult<Option<String>> {
        let response = self
            .get(&self.realm_path("/users"), &[("username", username)])
            .await?;
        Ok(first_id(&response))
    }

    async fn ensure_user(&self, user: &UserSpec) -> DeployResult<String> {
        if let Some(id) = self.find_user(&user.username).await? {
            return Ok(id);
        }
        let payload = json!({"username": user.username, "enabled": true, "emailVerified": true});
        let created = self
            .send(Method::Post, &self.realm_path("/users"), &payload)
            .await?;
        if !created.is(&[201, 204]) {
            return Err(DeployError::Keycloak(format!(
                "failed to create user '{}': {}",
                user.username,
                created.describe()
            )));
        }
        tracing::info!(username = %user.username, "Created user");
        self.find_user(&user.username).await?.ok_or_else(|| {
            DeployError::Keycloak(format!("user '{}' not found after creation", user.username))
        })
    }

    async fn set_password(&self, user_id: &str, password: &str) -> DeployResult<()> {
        let response = self
            .send(
                Method::Put,
                &self.realm_path(&format!("/users/{}/reset-password", user_id)),
                &json!({"type": "password", "value": password, "temporary": false}),
            )
            .await?;
        if response.status != 204 {
            return Err(DeployError::Keycloak(format!(
                "failed to set password: {}",
                response.describe()
            )));
        }
        Ok(())
    }

    /// Map existing realm roles onto the user; unknown roles are skipped.
    async fn assign_roles(&self, user_id: &str, roles: &[String], who: &str) -> DeployResult<Vec<String>> {
        let mut representations = Vec::new();
        let mut missing = Vec::new();
        for role in roles {
            let response = self
                .get(&self.realm_path(&format!("/roles/{}", role)), &[])
                .await?;
            if response.status == 200 {
                representations.push(response.body);
            } else {
                missing.push(role.as_str());
            }
        }
        if !missing.is_empty() {
            tracing::warn!(user = who, missing = %missing.join(", "), "Skipping unknown roles");
        }
        if representations.is_empty() {
            tracing::warn!(user = who, "No valid roles to assign");
            return Ok(Vec::new());
        }

        let assigned: Vec<String> = representations
            .iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str).map(str::to_string))
            .collect();
        let response = self
            .send(
                Method::Post,
                &self.realm_path(&format!("/users/{}/role-mappings/realm", user_id)),
                &Value::Array(representations),
            )
            .await?;
        if response.status != 204 {
            return Err(DeployError::Keycloak(format!(
                "failed to assign roles to '{}': {}",
                who,
                response.describe()
            )));
        }
        tracing::info!(user = who, roles = %assigned.join(", "), "Assigned roles");
        Ok(assigned)
    }

    async fn assign_service_account_role(&self, client_uuid: &str, role: &str) -> DeployResult<()> {
        let response = self
            .get(
                &self.realm_path(&format!("/clients/{}/service-account-user", client_uuid)),
                &[],
            )
            .await?;
        if response.status != 200 {
            return Err(DeployError::Keycloak(format!(
                "failed to fetch service account user: {}",
                response.describe()
            )));
        }
        let user_id = id_of(&response.body)
            .ok_or_else(|| DeployError::Keycloak("service account user id missing".into()))?;
        self.assign_roles(&user_id, &[role.to_string()], "service-account")
            .await?;
        Ok(())
    }
}

/// Run the bootstrap once.
pub async fn bootstrap(api: &dyn AdminApi, config: &BootstrapConfig) -> DeployResult<BootstrapSummary> {
    if config.users.is_empty() {
        return Err(DeployError::InvalidInput(
            "at least one user (username:password:role1,role2) is required".into(),
        ));
    }

    let token = api.admin_token(&config.admin_user, &config.admin_password).await?;
    let session = Session {
        api,
        token,
        realm: config.realm.clone(),
    };

    session.ensure_realm().await?;

    let mut roles: Vec<String> = Vec::new();
    for (role, description) in GRANULAR_ROLES {
        session.ensure_role(role, description).await?;
        roles.push(role.to_string());
    }
    for role in &config.extra_roles {
        if roles.contains(role) {
            continue;
        }
        session.ensure_role(role, &format!("Role {}", role)).await?;
        roles.push(role.clone());
    }

    let (frontend, backend) = client_payloads(config);
    session
        .ensure_client(&config.frontend_client_id, &frontend)
        .await?;
    let backend_uuid = session
        .ensure_client(&config.backend_client_id, &backend)
        .await?;
    let backend_client_secret = session.client_secret(&backend_uuid).await?;

    let mut users = Vec::new();
    for user in &config.users {
        let id = session.ensure_user(user).await?;
        session.set_password(&id, &user.password).await?;
        let assigned = session.assign_roles(&id, &user.roles, &user.username).await?;
        users.push(BootstrapUser {
            username: user.username.clone(),
            roles: assigned,
        });
    }

    if let Some(role) = &config.service_account_role {
        session.assign_service_account_role(&backend_uuid, role).await?;
    }

    Ok(BootstrapSummary {
        realm: config.realm.clone(),
        frontend_client_id: config.frontend_client_id.clone(),
        backend_client_id: config.backend_client_id.clone(),
        backend_client_secret,
        roles,
        users,
    })
}

/// Admin login rejected as `invalid_grant`, typically while Keycloak is
/// still importing its admin user right after startup.
pub fn is_invalid_grant(err: &DeployError) -> bool {
    matches!(err, DeployError::Keycloak(message) if message.contains("invalid_grant"))
}

/// [`bootstrap`], retried while the admin login reports `invalid_grant`.
pub async fn bootstrap_with_retry(
    api: &dyn AdminApi,
    config: &BootstrapConfig,
    attempts: u32,
    pause: Duration,
) -> DeployResult<BootstrapSummary> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match bootstrap(api, config).await {
            Err(e) if is_invalid_grant(&e) && attempt < attempts => {
                tracing::warn!(attempt, attempts, "Keycloak rejected the admin login, retrying");
                tokio::time::sleep(pause).await;
                attempt += 1;
            }
            Err(e) if is_invalid_grant(&e) => {
                return Err(DeployError::Keycloak(format!(
                    "{} (check the admin credentials; Keycloak may still be starting)",
                    e
                )));
            }
            result => return result,
        }
    }
}

/// Store the backend client secret as a Swarm secret and record the
/// Keycloak settings in `.env`.
pub async fn store_bootstrap_result(
    engine: &dyn DockerEngine,
    env: &mut EnvFile,
    config: &BootstrapConfig,
    summary: &BootstrapSummary,
    options: &DeployOptions,
    prompter: &mut dyn Prompter,
) -> DeployResult<SecretOutcome> {
    let outcome = SecretManager::new(engine, options)
        .create(
            names::KEYCLOAK_CLIENT_SECRET,
            summary.backend_client_secret.as_bytes(),
            RecreatePolicy::Ask,
            prompter,
        )
        .await?;
    if outcome == SecretOutcome::Kept {
        tracing::warn!(
            secret = names::KEYCLOAK_CLIENT_SECRET,
            "Kept the existing secret; it may not match the backend client"
        );
    }

    env.set(keys::KEYCLOAK_ENABLED, "true");
    env.set(keys::KEYCLOAK_URL, config.base_url.as_str());
    env.set(keys::KEYCLOAK_REALM, summary.realm.as_str());
    env.set(
        keys::KEYCLOAK_FRONTEND_CLIENT_ID,
        summary.frontend_client_id.as_str(),
    );
    env.set(
        keys::KEYCLOAK_BACKEND_CLIENT_ID,
        summary.backend_client_id.as_str(),
    );
    env.save()?;
    Ok(outcome)
}
