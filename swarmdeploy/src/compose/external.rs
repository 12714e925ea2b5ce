//! Attach stack services to networks created outside the stack.

use serde_yaml::{Mapping, Value};
use swarmdeploy_shared::{DeployError, DeployResult};

/// Declare `network` as external and attach `service` to it.
///
/// The network is keyed by its own name. Attachments in list or map form are
/// both understood; running it twice changes nothing.
pub fn attach_external_network(doc: &mut Value, service: &str, network: &str) -> DeployResult<()> {
    let root = doc
        .as_mapping_mut()
        .ok_or_else(|| DeployError::Compose("stack document is not a mapping".into()))?;

    let target = root
        .get_mut("services")
        .and_then(Value::as_mapping_mut)
        .and_then(|services| services.get_mut(service))
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| {
            DeployError::Compose(format!("service '{}' not found in stack document", service))
        })?;

    match target.get_mut("networks") {
        Some(Value::Sequence(list)) => {
            if !list.iter().any(|n| n.as_str() == Some(network)) {
                list.push(Value::from(network));
            }
        }
        Some(Value::Mapping(map)) => {
            if !map.contains_key(network) {
                map.insert(Value::from(network), Value::Null);
            }
        }
        _ => {
            target.insert(
                Value::from("networks"),
                Value::Sequence(vec![Value::from(network)]),
            );
        }
    }

    if !root.get("networks").is_some_and(Value::is_mapping) {
        root.insert(Value::from("networks"), Value::Mapping(Mapping::new()));
    }
    if let Some(networks) = root.get_mut("networks").and_then(Value::as_mapping_mut)
        && !networks.contains_key(network)
    {
        let mut spec = Mapping::new();
        spec.insert(Value::from("external"), Value::from(true));
        spec.insert(Value::from("name"), Value::from(network));
        networks.insert(Value::from(network), Value::Mapping(spec));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_attachment() {
        let mut doc: Value = serde_yaml::from_str(
            "services:\n  db:\n    networks: [backend]\nnetworks:\n  backend: {driver: overlay}\n",
        )
        .unwrap();
        attach_external_network(&mut doc, "db", "backup-net").unwrap();
        attach_external_network(&mut doc, "db", "backup-net").unwrap();

        let attached = doc["services"]["db"]["networks"].as_sequence().unwrap();
        assert_eq!(attached.len(), 2);
        assert_eq!(attached[1].as_str(), Some("backup-net"));
        assert_eq!(doc["networks"]["backup-net"]["external"].as_bool(), Some(true));
        assert_eq!(doc["networks"]["backup-net"]["name"].as_str(), Some("backup-net"));
        assert!(doc["networks"].get("backend").is_some());
    }

    #[test]
    fn test_map_attachment_and_missing_networks_block() {
        let mut doc: Value =
            serde_yaml::from_str("services:\n  db:\n    networks:\n      backend: null\n").unwrap();
        attach_external_network(&mut doc, "db", "backup-net").unwrap();
        assert!(doc["services"]["db"]["networks"].get("backup-net").is_some());
        assert!(doc["networks"].get("backup-net").is_some());
    }

    #[test]
    fn test_missing_service_fails() {
        let mut doc: Value = serde_yaml::from_str("services:\n  api: {}\n").unwrap();
        let err = attach_external_network(&mut doc, "db", "backup-net").unwrap_err();
        assert!(err.to_string().contains("'db'"));
    }
}
