//! In-memory Keycloak admin API for tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use swarmdeploy_shared::{DeployError, DeployResult};

use super::client::{AdminApi, AdminResponse, Method};

const TOKEN: &str = "token-1";

#[derive(Default)]
pub(crate) struct KeycloakState {
    pub realms: BTreeSet<String>,
    pub created_realms: u32,
    pub roles: BTreeSet<String>,
    /// clientId -> (uuid, payload)
    pub clients: BTreeMap<String, (String, Value)>,
    /// username -> id
    pub users: BTreeMap<String, String>,
    pub passwords: BTreeMap<String, String>,
    /// username -> assigned roles
    pub user_roles: BTreeMap<String, Vec<String>>,
    pub token_requests: u32,
    /// Logins still to reject with `invalid_grant`.
    pub reject_logins: u32,
    pub fail_client_create: bool,
}

pub(crate) struct FakeKeycloak {
    pub state: Mutex<KeycloakState>,
}

fn respond(status: u16, body: Value) -> DeployResult<AdminResponse> {
    Ok(AdminResponse { status, body })
}

impl FakeKeycloak {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(KeycloakState::default()),
        }
    }

    fn username_for(state: &KeycloakState, id: &str) -> Option<String> {
        state
            .users
            .iter()
            .find(|(_, uid)| uid.as_str() == id)
            .map(|(name, _)| name.clone())
    }

    fn add_user(state: &mut KeycloakState, username: &str) {
        let id = format!("user-{}", username);
        state.users.insert(username.to_string(), id);
    }
}

#[async_trait]
impl AdminApi for FakeKeycloak {
    async fn admin_token(&self, username: &str, password: &str) -> DeployResult<String> {
        let mut state = self.state.lock();
        state.token_requests += 1;
        if state.reject_logins > 0 {
            state.reject_logins -= 1;
            return Err(DeployError::Keycloak(format!(
                "failed to obtain admin token: 401 {}",
                r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#
            )));
        }
        assert_eq!((username, password), ("admin", "admin"));
        Ok(TOKEN.into())
    }

    async fn call(
        &self,
        token: &str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> DeployResult<AdminResponse> {
        assert_eq!(token, TOKEN);
        let mut state = self.state.lock();
        let segments: Vec<&str> = path
            .trim_start_matches("/admin/realms")
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let param = |key: &str| {
            query
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        };

        match (method, segments.as_slice()) {
            (Method::Post, []) => {
                let realm = body.and_then(|b| b["realm"].as_str()).unwrap_or_default();
                state.realms.insert(realm.to_string());
                state.created_realms += 1;
                respond(201, Value::Null)
            }
            (Method::Get, [realm]) => {
                let status = if state.realms.contains(*realm) { 200 } else { 404 };
                respond(status, json!({"realm": realm}))
            }
            (Method::Get, [_, "roles", role]) => match state.roles.get(*role) {
                Some(name) => respond(200, json!({"id": format!("role-{}", name), "name": name})),
                None => respond(404, json!({"error": "Could not find role"})),
            },
            (Method::Post, [_, "roles"]) => {
                let name = body.and_then(|b| b["name"].as_str()).unwrap_or_default();
                if !state.roles.insert(name.to_string()) {
                    return respond(409, Value::Null);
                }
                respond(201, Value::Null)
            }
            (Method::Get, [_, "clients"]) => {
                let client_id = param("clientId");
                let found: Vec<Value> = state
                    .clients
                    .get(&client_id)
                    .map(|(uuid, _)| json!({"id": uuid, "clientId": client_id}))
                    .into_iter()
                    .collect();
                respond(200, Value::Array(found))
            }
            (Method::Post, [_, "clients"]) => {
                if state.fail_client_create {
                    return respond(500, json!({"error": "unknown_error"}));
                }
                let payload = body.cloned().unwrap_or_default();
                let client_id = payload["clientId"].as_str().unwrap_or_default().to_string();
                if payload["serviceAccountsEnabled"] == true {
                    Self::add_user(&mut state, &format!("service-account-{}", client_id));
                }
                state
                    .clients
                    .insert(client_id.clone(), (format!("uuid-{}", client_id), payload));
                respond(201, Value::Null)
            }
            (Method::Get, [_, "clients", uuid, "client-secret"]) => {
                let client_id = uuid.trim_start_matches("uuid-");
                respond(200, json!({"type": "secret", "value": format!("secret-{}", client_id)}))
            }
            (Method::Get, [_, "clients", uuid, "service-account-user"]) => {
                let client_id = uuid.trim_start_matches("uuid-");
                match state.users.get(&format!("service-account-{}", client_id)) {
                    Some(id) => respond(200, json!({"id": id})),
                    None => respond(400, Value::Null),
                }
            }
            (Method::Get, [_, "users"]) => {
                let username = param("username");
                let found: Vec<Value> = state
                    .users
                    .get(&username)
                    .map(|id| json!({"id": id, "username": username}))
                    .into_iter()
                    .collect();
                respond(200, Value::Array(found))
            }
            (Method::Post, [_, "users"]) => {
                let username = body.and_then(|b| b["username"].as_str()).unwrap_or_default();
                Self::add_user(&mut state, username);
                respond(201, Value::Null)
            }
            (Method::Put, [_, "users", id, "reset-password"]) => {
                let Some(username) = Self::username_for(&state, id) else {
                    return respond(404, Value::Null);
                };
                let password = body.and_then(|b| b["value"].as_str()).unwrap_or_default();
                state.passwords.insert(username, password.to_string());
                respond(204, Value::Null)
            }
            (Method::Post, [_, "users", id, "role-mappings", "realm"]) => {
                let Some(username) = Self::username_for(&state, id) else {
                    return respond(404, Value::Null);
                };
                let names: Vec<String> = body
                    .and_then(Value::as_array)
                    .map(|reps| {
                        reps.iter()
                            .filter_map(|r| r["name"].as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
                let assigned = state.user_roles.entry(username).or_default();
                for name in names {
                    if !assigned.contains(&name) {
                        assigned.push(name);
                    }
                }
                respond(204, Value::Null)
            }
            other => panic!("unexpected admin call {:?}", other),
        }
    }
}
