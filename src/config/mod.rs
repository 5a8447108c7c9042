use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::models::{env_var, Credentials, SnmpConfig};

/// Config holds all run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub snmp: SnmpConfig,
    /// Passwords pushed to the ACI controller; the controller may use its own pair
    pub controller_auth_password: String,
    pub controller_priv_password: String,
    pub ssh_port: u16,
    /// 0 disables the timeout
    pub ssh_timeout_secs: u64,
    pub controller_tls: ControllerTls,
}

/// Trust settings for the controller's HTTPS endpoint.
/// APIC controllers usually ship self-signed certificates, so verification is off unless opted in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerTls {
    pub verify: bool,
    pub ca_cert: Option<PathBuf>,
}

/// Every required variable that was absent or empty at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEnvError {
    pub missing: Vec<String>,
}

impl fmt::Display for MissingEnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "missing required environment variables: {}",
            self.missing.join(", ")
        )
    }
}

impl std::error::Error for MissingEnvError {}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Result<Self, MissingEnvError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup. Fails with every missing required key at once.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MissingEnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let missing: Vec<String> = env_var::REQUIRED
            .iter()
            .filter(|key| get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MissingEnvError { missing });
        }

        let auth_password = get_or(env_var::SNMP_AUTH_PASSWORD, "");
        let priv_password = get_or(env_var::SNMP_PRIV_PASSWORD, "");

        Ok(Self {
            credentials: Credentials {
                username: get_or(env_var::USERNAME, ""),
                password: get_or(env_var::PASSWORD, ""),
                secret: get_or(env_var::SECRET, ""),
            },
            controller_auth_password: get_or(env_var::CONTROLLER_AUTH_PASSWORD, &auth_password),
            controller_priv_password: get_or(env_var::CONTROLLER_PRIV_PASSWORD, &priv_password),
            snmp: SnmpConfig {
                community: get_or(env_var::SNMP_COMMUNITY, "public"),
                username: get_or(env_var::SNMP_USERNAME, "snmpuser"),
                auth_protocol: get_or(env_var::SNMP_AUTH_PROTOCOL, "sha"),
                auth_password,
                priv_protocol: get_or(env_var::SNMP_PRIV_PROTOCOL, "aes128"),
                priv_bits: get_or(env_var::SNMP_PRIV_BITS, "128"),
                priv_password,
            },
            ssh_port: get_or(env_var::SSH_PORT, "22").parse().unwrap_or(22),
            ssh_timeout_secs: get_or(env_var::SSH_TIMEOUT_SECS, "0").parse().unwrap_or(0),
            controller_tls: ControllerTls {
                verify: get(env_var::CONTROLLER_VERIFY_TLS)
                    .map(|v| parse_bool(&v))
                    .unwrap_or(false),
                ca_cert: get(env_var::CONTROLLER_CA_CERT).map(PathBuf::from),
            },
        })
    }
}

#[cfg(test)]
impl Config {
    /// Fixed configuration for tests: CLI and controller password pairs differ on purpose
    pub fn sample() -> Self {
        Self {
            credentials: Credentials {
                username: "admin".into(),
                password: "hunter2".into(),
                secret: String::new(),
            },
            snmp: SnmpConfig {
                community: "public".into(),
                username: "snmpuser".into(),
                auth_protocol: "sha".into(),
                auth_password: "cli-auth".into(),
                priv_protocol: "aes128".into(),
                priv_bits: "128".into(),
                priv_password: "cli-priv".into(),
            },
            controller_auth_password: "apic-auth".into(),
            controller_priv_password: "apic-priv".into(),
            ssh_port: 22,
            ssh_timeout_secs: 0,
            controller_tls: ControllerTls::default(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
