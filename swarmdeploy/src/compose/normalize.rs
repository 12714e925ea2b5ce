//! Reshape `docker compose config` output into what `docker stack deploy` accepts.

use serde_yaml::{Mapping, Value};

const STACK_FILE_VERSION: &str = "3.8";

/// Drop the top-level `name`, make sure a `version` is present and turn
/// quoted `published`/`target` port numbers into integers.
pub fn normalize_for_stack(doc: &mut Value) {
    let Some(root) = doc.as_mapping_mut() else {
        return;
    };
    root.remove("name");
    if !root.contains_key("version") {
        root.insert(Value::from("version"), Value::from(STACK_FILE_VERSION));
    }

    let Some(services) = root.get_mut("services").and_then(Value::as_mapping_mut) else {
        return;
    };
    for (_, service) in services.iter_mut() {
        let Some(ports) = service.get_mut("ports").and_then(Value::as_sequence_mut) else {
            continue;
        };
        for port in ports.iter_mut().filter_map(Value::as_mapping_mut) {
            coerce_number(port, "published");
            coerce_number(port, "target");
        }
    }
}

fn coerce_number(port: &mut Mapping, key: &str) {
    let parsed = port
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u16>().ok());
    if let Some(n) = parsed {
        port.insert(Value::from(key), Value::from(n));
    }
}
