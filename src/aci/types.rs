use serde::{Deserialize, Serialize};

// --- APIC object-model types ---

/// Body of `POST /api/aaaLogin.json`
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    #[serde(rename = "aaaUser")]
    pub aaa_user: AaaUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct AaaUser {
    pub attributes: AaaUserAttributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct AaaUserAttributes {
    pub name: String,
    pub pwd: String,
}

impl LoginRequest {
    pub fn new(name: &str, pwd: &str) -> Self {
        Self {
            aaa_user: AaaUser {
                attributes: AaaUserAttributes {
                    name: name.to_string(),
                    pwd: pwd.to_string(),
                },
            },
        }
    }
}

/// Successful login reply; only the token is of interest
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub imdata: Vec<LoginImdata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginImdata {
    #[serde(rename = "aaaLogin")]
    pub aaa_login: Option<AaaLogin>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AaaLogin {
    pub attributes: AaaLoginAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AaaLoginAttributes {
    pub token: String,
}

impl LoginResponse {
    /// `imdata[0].aaaLogin.attributes.token`
    pub fn token(&self) -> Option<&str> {
        self.imdata
            .first()
            .and_then(|d| d.aaa_login.as_ref())
            .map(|l| l.attributes.token.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Bearer token from `aaaLogin`; lives for a single controller interaction
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(pub String);

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Body of `POST /api/mo/uni/userext/user-{userName}.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpUserPayload {
    #[serde(rename = "snmpUser")]
    pub snmp_user: SnmpUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpUser {
    pub attributes: SnmpUserAttributes,
    pub children: Vec<SnmpUserChild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnmpUserAttributes {
    pub user_name: String,
    pub auth_password: String,
    pub auth_type: String,
    pub priv_password: String,
    pub priv_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpUserChild {
    #[serde(rename = "snmpUserP")]
    pub snmp_user_p: SnmpUserPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnmpUserPolicy {
    pub attributes: SnmpUserPolicyAttributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnmpUserPolicyAttributes {
    pub admin_state: String,
}

impl SnmpUserPayload {
    pub fn user_name(&self) -> &str {
        &self.snmp_user.attributes.user_name
    }
}
