pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use client::{ControllerClient, ControllerError, PushOutcome};

use anyhow::Result;

use crate::config::Config;
use types::*;

/// Project the canonical SNMP config into the APIC snmpUser object.
/// The controller gets its own password pair; `privType` joins protocol and key length with no separator.
pub fn snmp_user_payload(config: &Config) -> SnmpUserPayload {
    SnmpUserPayload {
        snmp_user: SnmpUser {
            attributes: SnmpUserAttributes {
                user_name: config.snmp.username.clone(),
                auth_password: config.controller_auth_password.clone(),
                auth_type: config.snmp.auth_protocol.clone(),
                priv_password: config.controller_priv_password.clone(),
                priv_type: config.snmp.controller_priv_type(),
            },
            children: vec![SnmpUserChild {
                snmp_user_p: SnmpUserPolicy {
                    attributes: SnmpUserPolicyAttributes {
                        admin_state: "enabled".to_string(),
                    },
                },
            }],
        },
    }
}

/// Log in to the controller and push the SNMPv3 user.
/// A login failure comes back as [`ControllerError`]; a rejected push is a normal outcome.
pub async fn dispatch_controller(client: &ControllerClient, config: &Config) -> Result<PushOutcome> {
    let token = client
        .login(&config.credentials.username, &config.credentials.password)
        .await?;
    tracing::info!("API authentication successful on {}", client.base_url());

    let payload = snmp_user_payload(config);
    let outcome = client.push_snmp_user(&token, &payload).await?;
    match &outcome {
        PushOutcome::Applied => {
            tracing::info!("SNMPv3 configuration successfully applied on {}", client.base_url());
        }
        PushOutcome::Rejected { status, body } => {
            tracing::error!(
                "Error applying SNMPv3 configuration on {} (HTTP {}): {}",
                client.base_url(),
                status,
                body
            );
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::fake::spawn_fake_apic;
    use super::*;
    use crate::config::ControllerTls;
    use axum::http::StatusCode;
    use serde_json::json;

    fn test_config() -> Config {
        Config::sample()
    }

    #[test]
    fn test_payload_shape() {
        let payload = serde_json::to_value(snmp_user_payload(&test_config())).unwrap();
        assert_eq!(payload, json!({
            "snmpUser": {
                "attributes": {
                    "userName": "snmpuser",
                    "authPassword": "apic-auth",
                    "authType": "sha",
                    "privPassword": "apic-priv",
                    "privType": "aes128128"
                },
                "children": [
                    { "snmpUserP": { "attributes": { "adminState": "enabled" } } }
                ]
            }
        }));
    }

    #[test]
    fn test_priv_type_is_plain_concatenation() {
        let mut cfg = test_config();
        cfg.snmp.priv_protocol = "aes".into();
        cfg.snmp.priv_bits = "256".into();
        let payload = snmp_user_payload(&cfg);
        assert_eq!(payload.snmp_user.attributes.priv_type, "aes256");
    }

    #[test]
    fn test_payload_leaves_canonical_config_alone() {
        let cfg = test_config();
        let before = cfg.snmp.clone();
        let _ = snmp_user_payload(&cfg);
        assert_eq!(cfg.snmp, before);
    }

    #[tokio::test]
    async fn test_login_then_push() {
        let (url, seen) = spawn_fake_apic(StatusCode::OK, StatusCode::OK).await;
        let client = ControllerClient::new(&url, &ControllerTls::default()).unwrap();

        let outcome = dispatch_controller(&client, &test_config()).await.unwrap();
        assert_eq!(outcome, PushOutcome::Applied);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].path, "/api/aaaLogin.json");
        assert_eq!(seen[0].body, json!({ "aaaUser": { "attributes": { "name": "admin", "pwd": "hunter2" } } }));
        assert_eq!(seen[0].authorization, None);
        assert_eq!(seen[1].path, "/api/mo/uni/userext/user-snmpuser.json");
        assert_eq!(seen[1].authorization.as_deref(), Some("APIC-cookie tok-123"));
        assert_eq!(seen[1].accept.as_deref(), Some("application/json"));
        assert_eq!(seen[1].body["snmpUser"]["attributes"]["privType"], "aes128128");
    }

    #[tokio::test]
    async fn test_login_failure_skips_push() {
        let (url, seen) = spawn_fake_apic(StatusCode::UNAUTHORIZED, StatusCode::OK).await;
        let client = ControllerClient::new(&url, &ControllerTls::default()).unwrap();

        let err = dispatch_controller(&client, &test_config()).await.unwrap_err();
        match err.downcast_ref::<ControllerError>() {
            Some(ControllerError::AuthFailed { status, body, .. }) => {
                assert_eq!(*status, 401);
                assert!(body.contains("bad creds"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_push_is_an_outcome() {
        let (url, _seen) = spawn_fake_apic(StatusCode::OK, StatusCode::BAD_REQUEST).await;
        let client = ControllerClient::new(&url, &ControllerTls::default()).unwrap();

        let outcome = tokio_test::assert_ok!(dispatch_controller(&client, &test_config()).await);
        assert_eq!(outcome, PushOutcome::Rejected {
            status: 400,
            body: "{\"imdata\":[]}".into(),
        });
    }
}
