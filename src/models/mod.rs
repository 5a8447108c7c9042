use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Device family tag as it appears in the inventory's DEVICE_TYPE column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Ios,
    Nxos,
    Fxos,
    Asa,
    Aci,
}

impl DeviceType {
    pub const ALL: [DeviceType; 5] = [
        DeviceType::Ios,
        DeviceType::Nxos,
        DeviceType::Fxos,
        DeviceType::Asa,
        DeviceType::Aci,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            DeviceType::Ios => "IOS",
            DeviceType::Nxos => "NXOS",
            DeviceType::Fxos => "FXOS",
            DeviceType::Asa => "ASA",
            DeviceType::Aci => "ACI",
        }
    }

    /// Families that need `enable` before configuration commands are accepted
    pub fn has_privileged_mode(&self) -> bool {
        matches!(self, DeviceType::Ios | DeviceType::Asa)
    }

    /// Families whose commands must be issued from `configure terminal`.
    /// FXOS uses scoped commands and a commit buffer instead.
    pub fn uses_config_mode(&self) -> bool {
        matches!(self, DeviceType::Ios | DeviceType::Nxos | DeviceType::Asa)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DeviceType {
    type Err = UnsupportedDeviceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Tags are case sensitive
        DeviceType::ALL
            .iter()
            .copied()
            .find(|t| t.tag() == s)
            .ok_or_else(|| UnsupportedDeviceType::new(s))
    }
}

/// Raised for inventory rows whose DEVICE_TYPE is not one of the known tags.
/// Not fatal: the driver loop logs it and moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedDeviceType {
    pub tag: String,
}

impl UnsupportedDeviceType {
    pub fn new(tag: &str) -> Self {
        Self { tag: tag.to_string() }
    }
}

impl fmt::Display for UnsupportedDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is not a readable type (tags are case sensitive). The possible DEVICE_TYPES are IOS, NXOS, FXOS, ASA, and ACI",
            self.tag
        )
    }
}

impl std::error::Error for UnsupportedDeviceType {}

/// One row of the inventory file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InventoryRecord {
    #[serde(rename = "DEVICE_TYPE")]
    pub device_type: String,
    #[serde(rename = "IP_ADDRESS")]
    pub ip_address: String,
    #[serde(rename = "CONTROLLER_IP", default, deserialize_with = "empty_as_none")]
    pub controller_ip: Option<String>,
}

impl InventoryRecord {
    /// Controller address for ACI rows. A missing CONTROLLER_IP aborts the run.
    pub fn controller_address(&self) -> anyhow::Result<&str> {
        self.controller_ip.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "inventory row for {} ({}) has no CONTROLLER_IP",
                self.ip_address,
                self.device_type
            )
        })
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Operator credentials shared by every CLI session and controller login
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Privileged-mode secret; empty when the devices drop operators straight into enable mode
    pub secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Canonical SNMPv3 parameters. Built once at startup and never reshaped;
/// each device family derives what it needs from it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SnmpConfig {
    pub community: String,
    pub username: String,
    pub auth_protocol: String,
    pub auth_password: String,
    pub priv_protocol: String,
    pub priv_bits: String,
    pub priv_password: String,
}

impl SnmpConfig {
    /// `aes128` + `128` -> `aes128-128`, as NX-OS and FXOS spell the privacy protocol
    pub fn privacy_suffix(&self) -> String {
        format!("{}-{}", self.priv_protocol, self.priv_bits)
    }

    /// `aes128` + `128` -> `aes128128`, as the APIC snmpUser object expects it
    pub fn controller_priv_type(&self) -> String {
        format!("{}{}", self.priv_protocol, self.priv_bits)
    }
}

/// Everything needed to reach one CLI-managed device
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    pub device_type: DeviceType,
    pub host: String,
    pub port: u16,
    pub credentials: Credentials,
}

/// Canonical environment variable names
pub mod env_var {
    pub const USERNAME: &str = "CISCO_USERNAME";
    pub const PASSWORD: &str = "CISCO_PASSWORD";
    pub const SECRET: &str = "CISCO_SECRET";
    pub const SNMP_AUTH_PASSWORD: &str = "SNMPv3_AUTH_PASSWORD";
    pub const SNMP_PRIV_PASSWORD: &str = "SNMPv3_PRIV_PASSWORD";
    pub const CONTROLLER_AUTH_PASSWORD: &str = "AUTH_PASSWORD";
    pub const CONTROLLER_PRIV_PASSWORD: &str = "PRIV_PASSWORD";
    pub const SNMP_COMMUNITY: &str = "SNMP_COMMUNITY";
    pub const SNMP_USERNAME: &str = "SNMP_USERNAME";
    pub const SNMP_AUTH_PROTOCOL: &str = "SNMP_AUTH_PROTOCOL";
    pub const SNMP_PRIV_PROTOCOL: &str = "SNMP_PRIV_PROTOCOL";
    pub const SNMP_PRIV_BITS: &str = "SNMP_PRIV_BITS";
    pub const SSH_PORT: &str = "SSH_PORT";
    pub const SSH_TIMEOUT_SECS: &str = "SSH_TIMEOUT_SECS";
    pub const CONTROLLER_VERIFY_TLS: &str = "CONTROLLER_VERIFY_TLS";
    pub const CONTROLLER_CA_CERT: &str = "CONTROLLER_CA_CERT";

    /// Variables that must be present and non-empty
    pub const REQUIRED: &[&str] = &[USERNAME, PASSWORD, SNMP_AUTH_PASSWORD, SNMP_PRIV_PASSWORD];
}
