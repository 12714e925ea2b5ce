//! Names and defaults shared by every swarmdeploy component.

/// Keys read from and written to the project's `.env` file.
pub mod env_keys {
    pub const STACK_NAME: &str = "STACK_NAME";
    pub const DATA_ROOT: &str = "DATA_ROOT";
    pub const PROXY_TYPE: &str = "PROXY_TYPE";
    pub const SSL_MODE: &str = "SSL_MODE";
    pub const IMAGE_NAME: &str = "IMAGE_NAME";
    pub const IMAGE_VERSION: &str = "IMAGE_VERSION";
    pub const WEB_IMAGE_NAME: &str = "WEB_IMAGE_NAME";
    pub const WEB_IMAGE_VERSION: &str = "WEB_IMAGE_VERSION";
    pub const WEB_ENABLED: &str = "WEB_ENABLED";
    pub const PHPMYADMIN_ENABLED: &str = "PHPMYADMIN_ENABLED";
    pub const API_URL: &str = "API_URL";
    pub const WEB_URL: &str = "WEB_URL";
    pub const PHPMYADMIN_URL: &str = "PHPMYADMIN_URL";
    pub const API_PORT: &str = "API_PORT";
    pub const WEB_PORT: &str = "WEB_PORT";
    pub const PHPMYADMIN_PORT: &str = "PHPMYADMIN_PORT";
    pub const TRAEFIK_NETWORK_NAME: &str = "TRAEFIK_NETWORK_NAME";
    pub const API_REPLICAS: &str = "API_REPLICAS";
    pub const CHECK_REPLICAS: &str = "CHECK_REPLICAS";
    pub const WEB_REPLICAS: &str = "WEB_REPLICAS";
    pub const PHPMYADMIN_REPLICAS: &str = "PHPMYADMIN_REPLICAS";
    pub const ENABLE_BACKUP_NETWORK: &str = "ENABLE_BACKUP_NETWORK";
    pub const BACKUP_NETWORK_NAME: &str = "BACKUP_NETWORK_NAME";
    pub const TELEGRAM_ENABLED: &str = "TELEGRAM_ENABLED";
    pub const EMAIL_ENABLED: &str = "EMAIL_ENABLED";
    pub const GOOGLE_DRIVE_ENABLED: &str = "GOOGLE_DRIVE_ENABLED";
    pub const KEYCLOAK_ENABLED: &str = "KEYCLOAK_ENABLED";
    pub const KEYCLOAK_URL: &str = "KEYCLOAK_URL";
    pub const KEYCLOAK_REALM: &str = "KEYCLOAK_REALM";
    pub const KEYCLOAK_FRONTEND_CLIENT_ID: &str = "KEYCLOAK_FRONTEND_CLIENT_ID";
    pub const KEYCLOAK_BACKEND_CLIENT_ID: &str = "KEYCLOAK_BACKEND_CLIENT_ID";
    pub const DB_NAME: &str = "DB_NAME";
    pub const SERVER_CONFIG: &str = "STATECHECKER_SERVER_CONFIG";
}

/// Swarm secret names consumed by the stack file.
pub mod secrets {
    pub const AUTHENTICATION_TOKEN: &str = "STATECHECKER_SERVER_AUTHENTICATION_TOKEN";
    pub const DB_ROOT_USER_PW: &str = "STATECHECKER_SERVER_DB_ROOT_USER_PW";
    pub const DB_USER_PW: &str = "STATECHECKER_SERVER_DB_USER_PW";
    pub const TELEGRAM_SENDER_BOT_TOKEN: &str = "STATECHECKER_SERVER_TELEGRAM_SENDER_BOT_TOKEN";
    pub const EMAIL_SENDER_PASSWORD: &str = "STATECHECKER_SERVER_EMAIL_SENDER_PASSWORD";
    pub const GOOGLE_DRIVE_SERVICE_ACCOUNT_JSON: &str =
        "STATECHECKER_SERVER_GOOGLE_DRIVE_SERVICE_ACCOUNT_JSON";
    pub const KEYCLOAK_CLIENT_SECRET: &str = "STATECHECKER_SERVER_KEYCLOAK_CLIENT_SECRET";

    pub const REQUIRED: [&str; 3] = [AUTHENTICATION_TOKEN, DB_ROOT_USER_PW, DB_USER_PW];

    pub const OPTIONAL: [&str; 4] = [
        TELEGRAM_SENDER_BOT_TOKEN,
        EMAIL_SENDER_PASSWORD,
        GOOGLE_DRIVE_SERVICE_ACCOUNT_JSON,
        KEYCLOAK_CLIENT_SECRET,
    ];

    /// Value stored in placeholder secrets for integrations that are turned off.
    pub const DISABLED_VALUE: &str = "disabled";

    /// Directory where Swarm mounts secrets inside task containers.
    pub const MOUNT_DIR: &str = "/run/secrets";
}

/// Defaults applied when a key is absent from `.env`.
pub mod defaults {
    pub const STACK_NAME: &str = "statechecker";
    pub const IMAGE_NAME: &str = "ghcr.io/statechecker/statechecker-server";
    pub const IMAGE_VERSION: &str = "latest";
    pub const WEB_IMAGE_NAME: &str = "ghcr.io/statechecker/statechecker-web";
    pub const API_PORT: u16 = 8787;
    pub const WEB_PORT: u16 = 8080;
    pub const PHPMYADMIN_PORT: u16 = 8081;
    pub const TRAEFIK_NETWORK_NAME: &str = "traefik-public";
    pub const BACKUP_NETWORK_NAME: &str = "backup-net";
    pub const DB_NAME: &str = "state_checker";
    pub const REPLICAS: u32 = 1;
}

/// Labels Docker attaches to stack resources.
pub mod labels {
    pub const STACK_NAMESPACE: &str = "com.docker.stack.namespace";
    pub const SWARM_SERVICE_NAME: &str = "com.docker.swarm.service.name";
}

/// Files and directories inside a project checkout.
pub mod files {
    pub const ENV_FILE: &str = ".env";
    pub const STACK_FILE: &str = "swarm-stack.yml";
    pub const SECRETS_FILE: &str = "secrets.env";
    pub const SETUP_COMPLETE_MARKER: &str = ".setup-complete";
    pub const OPTIONS_FILE: &str = ".swarmdeploy.json";
    pub const SETUP_DIR: &str = "setup";
    pub const BACKUP_ENV_DIR: &str = "backup/env";
    pub const BACKUP_STACK_DIR: &str = "backup/swarm-stack-yml";
    pub const DATABASE_DIR: &str = "install/database";
    pub const SCHEMA_FILE: &str = "state_checker.sql";
    pub const MIGRATIONS_DIR: &str = "migrations";
}
