//! Assembles `.env` and `swarm-stack.yml` from the fragments under `setup/`.
//!
//! The stack file is a concatenation of per-service fragments. Services that
//! can sit behind Traefik carry three placeholder lines which are swapped for
//! snippet files depending on the proxy mode:
//!
//! | placeholder             | traefik                              | none              |
//! |-------------------------|--------------------------------------|-------------------|
//! | `###PROXY_NETWORK###`   | `traefik-network-attach.yml`         | removed           |
//! | `###PROXY_LABELS###`    | `<svc>-traefik-labels-<ssl>.yml`     | removed           |
//! | `###PROXY_PORTS###`     | removed                              | `<svc>-ports.yml` |

mod placeholder;

use std::path::{Path, PathBuf};

use swarmdeploy_shared::constants::files;
use swarmdeploy_shared::{DeployError, DeployResult};

use crate::env::{ProxyType, SslMode, StackSettings};
use crate::fsutil;
use crate::layout::ProjectLayout;

pub use placeholder::{
    PROXY_LABELS, PROXY_NETWORK, PROXY_PORTS, ensure_resolved, find_unresolved, inject,
};

pub const COMPOSE_MODULES_DIR: &str = "compose-modules";
pub const ENV_TEMPLATES_DIR: &str = "env-templates";
const SNIPPETS_DIR: &str = "snippets";

/// Which stack variant to assemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub proxy_type: ProxyType,
    pub ssl_mode: SslMode,
    pub include_phpmyadmin: bool,
    pub include_web: bool,
}

impl AssemblyOptions {
    pub fn from_settings(settings: &StackSettings) -> Self {
        Self {
            proxy_type: settings.proxy_type,
            ssl_mode: settings.ssl_mode,
            include_phpmyadmin: settings.phpmyadmin_enabled,
            include_web: settings.web_enabled,
        }
    }
}

struct ServiceFragment {
    name: &'static str,
    proxied: bool,
}

// Order of the services in the assembled document.
const SERVICES: [ServiceFragment; 6] = [
    ServiceFragment { name: "api", proxied: true },
    ServiceFragment { name: "check", proxied: false },
    ServiceFragment { name: "db", proxied: false },
    ServiceFragment { name: "db-migration", proxied: false },
    ServiceFragment { name: "phpmyadmin", proxied: true },
    ServiceFragment { name: "web", proxied: true },
];

impl ServiceFragment {
    fn included(&self, opts: &AssemblyOptions) -> bool {
        match self.name {
            "phpmyadmin" => opts.include_phpmyadmin,
            "web" => opts.include_web,
            _ => true,
        }
    }
}

/// Base `.env` template followed by the proxy-specific one.
pub fn assemble_env(setup_dir: &Path, proxy_type: ProxyType) -> DeployResult<String> {
    let dir = setup_dir.join(ENV_TEMPLATES_DIR);
    let mut out = read_fragment(&dir.join(".env.template"))?;
    push_fragment(
        &mut out,
        &read_fragment(&dir.join(format!(".env.{}.template", proxy_type)))?,
    );
    Ok(out)
}

/// Build the stack document for `opts`.
///
/// The result has no placeholder left and parses as YAML; anything else is
/// an error and nothing is returned.
pub fn assemble_stack(setup_dir: &Path, opts: &AssemblyOptions) -> DeployResult<String> {
    let modules = setup_dir.join(COMPOSE_MODULES_DIR);
    let mut doc = read_fragment(&modules.join("base.yml"))?;

    for service in SERVICES.iter().filter(|s| s.included(opts)) {
        let mut fragment = read_fragment(&modules.join(format!("{}.yml", service.name)))?;
        if service.proxied {
            fragment = resolve_proxy_placeholders(&modules, service.name, &fragment, opts)?;
        }
        push_fragment(&mut doc, &fragment);
    }

    push_fragment(&mut doc, &read_fragment(&modules.join("footer.yml"))?);
    if opts.proxy_type == ProxyType::Traefik {
        push_fragment(&mut doc, &read_fragment(&modules.join("traefik-network.yml"))?);
    }

    ensure_resolved(&doc, files::STACK_FILE)?;
    serde_yaml::from_str::<serde_yaml::Value>(&doc).map_err(|e| {
        DeployError::Template(format!("assembled {} is not valid YAML: {}", files::STACK_FILE, e))
    })?;

    tracing::debug!(
        proxy = %opts.proxy_type,
        ssl = %opts.ssl_mode,
        phpmyadmin = opts.include_phpmyadmin,
        web = opts.include_web,
        "Assembled stack document"
    );
    Ok(doc)
}

fn resolve_proxy_placeholders(
    modules: &Path,
    service: &str,
    fragment: &str,
    opts: &AssemblyOptions,
) -> DeployResult<String> {
    let snippets = modules.join(SNIPPETS_DIR);
    let (network, labels, ports) = match opts.proxy_type {
        ProxyType::Traefik => (
            Some(read_fragment(&snippets.join("traefik-network-attach.yml"))?),
            Some(read_fragment(&snippets.join(format!(
                "{}-traefik-labels-{}.yml",
                service, opts.ssl_mode
            )))?),
            None,
        ),
        ProxyType::None => (
            None,
            None,
            Some(read_fragment(&snippets.join(format!("{}-ports.yml", service)))?),
        ),
    };

    let out = inject(fragment, PROXY_NETWORK, network.as_deref());
    let out = inject(&out, PROXY_LABELS, labels.as_deref());
    Ok(inject(&out, PROXY_PORTS, ports.as_deref()))
}

fn read_fragment(path: &Path) -> DeployResult<String> {
    if !path.is_file() {
        return Err(DeployError::missing_file(path));
    }
    Ok(std::fs::read_to_string(path)?)
}

fn push_fragment(doc: &mut String, fragment: &str) {
    if !doc.is_empty() && !doc.ends_with('\n') {
        doc.push('\n');
    }
    doc.push_str(fragment);
}

/// Back up the current file at `path` into `backup_dir`, then replace it
/// atomically with `content`. Returns the backup path, if one was made.
pub fn write_generated(
    path: &Path,
    content: &str,
    backup_dir: &Path,
) -> DeployResult<Option<PathBuf>> {
    let backup = fsutil::backup_file(path, backup_dir)?;
    fsutil::write_atomic(path, content)?;
    tracing::info!(path = %path.display(), "Wrote generated file");
    Ok(backup)
}

/// Assemble the stack for `opts` and write it to the project's stack file.
pub fn generate_stack_file(layout: &ProjectLayout, opts: &AssemblyOptions) -> DeployResult<PathBuf> {
    let doc = assemble_stack(layout.setup_dir(), opts)?;
    let path = layout.stack_file();
    write_generated(&path, &doc, &layout.stack_backup_dir())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvFile;
    use rstest::rstest;
    use serde_yaml::Value;
    use tempfile::TempDir;

    fn setup_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../setup")
    }

    fn copy_setup_dir(dest: &Path) {
        let src = setup_dir();
        for entry in walkdir::WalkDir::new(&src) {
            let entry = entry.unwrap();
            let rel = entry.path().strip_prefix(&src).unwrap();
            let target = dest.join(rel);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target).unwrap();
            } else {
                std::fs::copy(entry.path(), &target).unwrap();
            }
        }
    }

    fn service<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
        doc.get("services").and_then(|s| s.get(name))
    }

    fn attached_networks(svc: &Value) -> Vec<String> {
        svc.get("networks")
            .and_then(Value::as_sequence)
            .map(|seq| {
                seq.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    #[rstest]
    fn test_every_combination_assembles(
        #[values(ProxyType::Traefik, ProxyType::None)] proxy_type: ProxyType,
        #[values(SslMode::Direct, SslMode::Proxy)] ssl_mode: SslMode,
        #[values(true, false)] include_phpmyadmin: bool,
        #[values(true, false)] include_web: bool,
    ) {
        let opts = AssemblyOptions {
            proxy_type,
            ssl_mode,
            include_phpmyadmin,
            include_web,
        };
        let raw = assemble_stack(&setup_dir(), &opts).unwrap();
        assert!(find_unresolved(&raw).is_none());

        let doc: Value = serde_yaml::from_str(&raw).unwrap();
        for name in ["api", "check", "db", "db-migration"] {
            assert!(service(&doc, name).is_some(), "missing service {name}");
        }
        assert_eq!(service(&doc, "phpmyadmin").is_some(), include_phpmyadmin);
        assert_eq!(service(&doc, "web").is_some(), include_web);

        let api = service(&doc, "api").unwrap();
        let has_traefik_network = doc
            .get("networks")
            .and_then(|n| n.get("traefik"))
            .is_some();
        match proxy_type {
            ProxyType::Traefik => {
                assert!(has_traefik_network);
                assert!(attached_networks(api).contains(&"traefik".to_string()));
                assert!(api.get("ports").is_none());
                let labels = serde_yaml::to_string(&api["deploy"]["labels"]).unwrap();
                assert_eq!(
                    labels.contains("entrypoints=websecure"),
                    ssl_mode == SslMode::Direct
                );
            }
            ProxyType::None => {
                assert!(!has_traefik_network);
                assert!(!raw.contains("traefik"));
                assert!(api.get("ports").is_some());
                assert!(api["deploy"].get("labels").is_none());
            }
        }
        // check never sits behind the proxy
        let check = service(&doc, "check").unwrap();
        assert_eq!(attached_networks(check), vec!["backend".to_string()]);
    }

    #[test]
    fn test_services_follow_fixed_order() {
        let opts = AssemblyOptions {
            proxy_type: ProxyType::Traefik,
            ssl_mode: SslMode::Direct,
            include_phpmyadmin: true,
            include_web: true,
        };
        let raw = assemble_stack(&setup_dir(), &opts).unwrap();
        let pos = |needle: &str| raw.find(needle).unwrap();
        assert!(pos("\n  api:") < pos("\n  check:"));
        assert!(pos("\n  check:") < pos("\n  db:"));
        assert!(pos("\n  db:") < pos("\n  db-migration:"));
        assert!(pos("\n  db-migration:") < pos("\n  phpmyadmin:"));
        assert!(pos("\n  phpmyadmin:") < pos("\n  web:"));
        assert!(pos("\n  web:") < pos("\nsecrets:"));
        assert!(pos("\nnetworks:") < pos("\n  traefik:"));
    }

    #[test]
    fn test_missing_snippet_names_path() {
        let dir = TempDir::new().unwrap();
        copy_setup_dir(dir.path());
        let missing = dir.path().join("compose-modules/snippets/web-ports.yml");
        std::fs::remove_file(&missing).unwrap();

        let mut opts = AssemblyOptions {
            proxy_type: ProxyType::None,
            ssl_mode: SslMode::Direct,
            include_phpmyadmin: false,
            include_web: true,
        };
        match assemble_stack(dir.path(), &opts).unwrap_err() {
            DeployError::MissingFile { path } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }

        // the snippet is only needed when web is part of the stack
        opts.include_web = false;
        assert!(assemble_stack(dir.path(), &opts).is_ok());
    }

    #[test]
    fn test_stray_placeholder_is_rejected() {
        let dir = TempDir::new().unwrap();
        copy_setup_dir(dir.path());
        let check = dir.path().join("compose-modules/check.yml");
        let mut content = std::fs::read_to_string(&check).unwrap();
        content.push_str("###EXTRA_VOLUMES###\n");
        std::fs::write(&check, content).unwrap();

        let opts = AssemblyOptions {
            proxy_type: ProxyType::None,
            ssl_mode: SslMode::Direct,
            include_phpmyadmin: false,
            include_web: false,
        };
        let err = assemble_stack(dir.path(), &opts).unwrap_err();
        assert!(matches!(err, DeployError::UnresolvedPlaceholder { ref token, .. } if token == "###EXTRA_VOLUMES###"));
    }

    #[test]
    fn test_assemble_env_none() {
        let raw = assemble_env(&setup_dir(), ProxyType::None).unwrap();
        let env = EnvFile::parse(&raw);
        assert_eq!(env.get("PROXY_TYPE"), Some("none"));
        assert_eq!(env.get("WEB_PORT"), Some("8080"));
        assert_eq!(env.get("PHPMYADMIN_PORT"), Some("8081"));
        assert_eq!(env.get("STACK_NAME"), Some("statechecker"));
        assert!(env.get("API_URL").is_none());
    }

    #[test]
    fn test_assemble_env_traefik() {
        let raw = assemble_env(&setup_dir(), ProxyType::Traefik).unwrap();
        let env = EnvFile::parse(&raw);
        assert_eq!(env.get("PROXY_TYPE"), Some("traefik"));
        assert_eq!(env.get("TRAEFIK_NETWORK_NAME"), Some("traefik-public"));
        assert!(env.get("WEB_PORT").is_none());
    }

    #[test]
    fn test_write_generated_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("swarm-stack.yml");
        let backups = dir.path().join("backup/swarm-stack-yml");

        assert!(write_generated(&path, "old: 1\n", &backups).unwrap().is_none());
        let backup = write_generated(&path, "new: 2\n", &backups).unwrap().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new: 2\n");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "old: 1\n");
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("swarm-stack.yml.")
        );
    }

    #[test]
    fn test_generate_stack_file_uses_layout() {
        let dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(dir.path()).with_setup_dir(setup_dir());
        let opts = AssemblyOptions {
            proxy_type: ProxyType::None,
            ssl_mode: SslMode::Direct,
            include_phpmyadmin: true,
            include_web: false,
        };
        let path = generate_stack_file(&layout, &opts).unwrap();
        assert_eq!(path, dir.path().join("swarm-stack.yml"));
        assert!(std::fs::read_to_string(path).unwrap().contains("phpmyadmin:"));
    }
}
