//! Error types used across swarmdeploy.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for swarmdeploy operations.
pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, Error)]
pub enum DeployError {
    /// Docker missing, daemon down, node not in Swarm mode, Swarm TLS trouble.
    #[error("precondition failed: {message}")]
    Precondition { message: String, hint: Option<String> },

    /// A template, snippet, schema or env file the operation needs is absent.
    #[error("missing file: {}", path.display())]
    MissingFile { path: PathBuf },

    /// An external command returned non-zero.
    #[error("command `{command}` failed (exit {}): {stderr}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into()))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// A bounded readiness/removal wait ran out.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Operator or flag input that does not validate.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("template error: {0}")]
    Template(String),

    /// A `###NAME###` token survived stack assembly.
    #[error("unresolved placeholder {token} in {document}")]
    UnresolvedPlaceholder { token: String, document: String },

    #[error("compose error: {0}")]
    Compose(String),

    /// The named stack is not deployed.
    #[error("stack not found: {0}")]
    StackNotFound(String),

    /// Secret recreation refused while stacks that may consume it are deployed.
    #[error("secret {secret} is in use by deployed stack(s): {}", stacks.join(", "))]
    SecretInUse { secret: String, stacks: Vec<String> },

    /// Recreation removed the old secret and the create that followed failed.
    #[error("secret {secret} was removed but could not be recreated: {reason}")]
    SecretLost { secret: String, reason: String },

    /// The operator declined a required confirmation.
    #[error("aborted: {0}")]
    Aborted(String),

    /// A migration file failed; later files were not attempted.
    #[error("migration {version} failed: {message}")]
    Migration { version: String, message: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("keycloak error: {0}")]
    Keycloak(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DeployError {
    pub fn precondition(message: impl Into<String>) -> Self {
        DeployError::Precondition {
            message: message.into(),
            hint: None,
        }
    }

    pub fn precondition_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        DeployError::Precondition {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn missing_file(path: impl Into<PathBuf>) -> Self {
        DeployError::MissingFile { path: path.into() }
    }

    /// Remediation hint to print under the error, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            DeployError::Precondition { hint, .. } => hint.as_deref(),
            DeployError::SecretInUse { .. } => {
                Some("remove the stack first, then recreate the secret")
            }
            DeployError::StackNotFound(_) => Some("deploy the stack or check STACK_NAME in .env"),
            DeployError::SecretLost { .. } => {
                Some("create it again with `swarmdeploy secrets create` before deploying")
            }
            _ => None,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            DeployError::InvalidInput(_) => 2,
            DeployError::StackNotFound(_) => 3,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for DeployError {
    fn from(err: std::io::Error) -> Self {
        DeployError::Internal(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for DeployError {
    fn from(err: serde_json::Error) -> Self {
        DeployError::Internal(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for DeployError {
    fn from(err: serde_yaml::Error) -> Self {
        DeployError::Compose(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = DeployError::CommandFailed {
            command: "docker stack deploy".into(),
            code: Some(1),
            stderr: "no such network".into(),
        };
        assert_eq!(
            err.to_string(),
            "command `docker stack deploy` failed (exit 1): no such network"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(DeployError::InvalidInput("x".into()).exit_code(), 2);
        assert_eq!(DeployError::StackNotFound("s".into()).exit_code(), 3);
        assert_eq!(DeployError::precondition("swarm inactive").exit_code(), 1);
    }

    #[test]
    fn test_precondition_hint() {
        let err = DeployError::precondition_with_hint("not in swarm mode", "run `docker swarm init`");
        assert_eq!(err.hint(), Some("run `docker swarm init`"));
        assert!(DeployError::Timeout("x".into()).hint().is_none());
    }

    #[test]
    fn test_secret_lost_names_the_secret() {
        let err = DeployError::SecretLost {
            secret: "STATECHECKER_SERVER_DB_USER_PW".into(),
            reason: "daemon went away".into(),
        };
        assert_eq!(
            err.to_string(),
            "secret STATECHECKER_SERVER_DB_USER_PW was removed but could not be recreated: daemon went away"
        );
        assert!(err.hint().is_some_and(|h| h.contains("secrets create")));
    }
}
