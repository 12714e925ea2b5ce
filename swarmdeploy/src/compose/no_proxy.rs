//! Turns a Traefik-flavoured stack document into a direct-port one.

use serde_yaml::{Mapping, Value};
use swarmdeploy_shared::constants::defaults;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::env::StackSettings;

const TRAEFIK: &str = "traefik";
const TRAEFIK_LABEL_PREFIX: &str = "traefik.";
/// The API container always listens here; `API_PORT` only picks the host side.
const API_CONTAINER_PORT: u16 = 8787;
/// web and phpMyAdmin serve plain HTTP inside the container.
const HTTP_CONTAINER_PORT: u16 = 80;

/// Host ports published when a service is not behind the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoProxyPorts {
    pub api: u16,
    pub web: u16,
    pub phpmyadmin: u16,
}

impl Default for NoProxyPorts {
    fn default() -> Self {
        Self {
            api: defaults::API_PORT,
            web: defaults::WEB_PORT,
            phpmyadmin: defaults::PHPMYADMIN_PORT,
        }
    }
}

impl NoProxyPorts {
    pub fn from_settings(settings: &StackSettings) -> Self {
        Self {
            api: settings.api_port,
            web: settings.web_port,
            phpmyadmin: settings.phpmyadmin_port,
        }
    }

    /// `(service, host port, container port)` for every service that gets ports.
    fn bindings(&self) -> [(&'static str, u16, u16); 3] {
        [
            ("api", self.api, API_CONTAINER_PORT),
            ("web", self.web, HTTP_CONTAINER_PORT),
            ("phpmyadmin", self.phpmyadmin, HTTP_CONTAINER_PORT),
        ]
    }
}

/// Strip Traefik wiring from `doc` and publish ports for the HTTP services.
///
/// - `networks.traefik` is removed, as is every `traefik` attachment
///   (list or map form) on a service.
/// - `traefik.*` labels are removed from `labels` and `deploy.labels`;
///   a label key left empty is dropped.
/// - `api`, `web` and `phpmyadmin` get a `ports` entry unless they already
///   declare one. `api` must exist; the other two are optional.
///
/// Running it twice yields the same document.
pub fn apply_no_proxy(doc: &mut Value, ports: &NoProxyPorts) -> DeployResult<()> {
    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| DeployError::Compose("stack document is not a mapping".into()))?;

    if let Some(networks) = root.get_mut("networks").and_then(Value::as_mapping_mut) {
        networks.remove(TRAEFIK);
    }
    remove_if_empty(root, "networks");

    let services = root
        .get_mut("services")
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| DeployError::Compose("stack document has no services".into()))?;

    if !services.contains_key("api") {
        return Err(DeployError::Compose(
            "service 'api' not found in stack document".into(),
        ));
    }

    for (_, service) in services.iter_mut() {
        let Some(service) = service.as_mapping_mut() else {
            continue;
        };
        detach_traefik_network(service);
        strip_traefik_labels(service);
        if let Some(deploy) = service.get_mut("deploy").and_then(Value::as_mapping_mut) {
            strip_traefik_labels(deploy);
        }
    }

    for (name, published, target) in ports.bindings() {
        let Some(service) = services.get_mut(name).and_then(Value::as_mapping_mut) else {
            tracing::debug!(service = name, "Service not in stack, no ports to publish");
            continue;
        };
        if service.contains_key("ports") {
            continue;
        }
        service.insert(
            Value::from("ports"),
            Value::Sequence(vec![Value::from(format!("{}:{}", published, target))]),
        );
    }
    Ok(())
}

/// Text-in, text-out form of [`apply_no_proxy`].
pub fn rewrite_no_proxy(content: &str, ports: &NoProxyPorts) -> DeployResult<String> {
    let mut doc: Value = serde_yaml::from_str(content)?;
    apply_no_proxy(&mut doc, ports)?;
    Ok(serde_yaml::to_string(&doc)?)
}

fn detach_traefik_network(service: &mut Mapping) {
    match service.get_mut("networks") {
        Some(Value::Sequence(list)) => list.retain(|n| n.as_str() != Some(TRAEFIK)),
        Some(Value::Mapping(map)) => {
            map.remove(TRAEFIK);
        }
        _ => {}
    }
    remove_if_empty(service, "networks");
}

fn strip_traefik_labels(owner: &mut Mapping) {
    match owner.get_mut("labels") {
        Some(Value::Sequence(list)) => list.retain(|label| {
            !label
                .as_str()
                .is_some_and(|l| l.trim().starts_with(TRAEFIK_LABEL_PREFIX))
        }),
        Some(Value::Mapping(map)) => map.retain(|key, _| {
            !key
                .as_str()
                .is_some_and(|k| k.starts_with(TRAEFIK_LABEL_PREFIX))
        }),
        _ => {}
    }
    remove_if_empty(owner, "labels");
}

fn remove_if_empty(owner: &mut Mapping, key: &str) {
    let empty = match owner.get(key) {
        Some(Value::Sequence(s)) => s.is_empty(),
        Some(Value::Mapping(m)) => m.is_empty(),
        Some(Value::Null) => true,
        _ => false,
    };
    if empty {
        owner.remove(key);
    }
}
