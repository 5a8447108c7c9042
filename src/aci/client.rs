use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};

use super::types::*;
use crate::config::ControllerTls;

/// Failures of the controller exchange that the driver loop has to tell apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// aaaLogin answered with anything but 200. Aborts the whole run.
    AuthFailed { controller: String, status: u16, body: String },
    /// aaaLogin answered 200 but carried no token
    MalformedLogin { controller: String, body: String },
}

impl std::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerError::AuthFailed { controller, status, body } => {
                write!(f, "API authentication failure on {} (HTTP {}): {}", controller, status, body)
            }
            ControllerError::MalformedLogin { controller, body } => {
                write!(f, "API authentication on {} returned no token: {}", controller, body)
            }
        }
    }
}

impl std::error::Error for ControllerError {}

/// Result of pushing the snmpUser object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Applied,
    Rejected { status: u16, body: String },
}

/// APIC REST client for a single controller
pub struct ControllerClient {
    base_url: String,
    client: Client,
}

impl ControllerClient {
    pub fn new(address: &str, tls: &ControllerTls) -> Result<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(!tls.verify);

        if let Some(ref path) = tls.ca_cert {
            let pem = std::fs::read(path)
                .with_context(|| format!("Failed to read CA certificate {}", path.display()))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| anyhow::anyhow!("Invalid CA certificate {}: {}", path.display(), e))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: controller_base_url(address),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Authenticate and obtain the APIC-cookie token
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken> {
        let resp = self
            .client
            .post(self.api_url("/aaaLogin.json"))
            .header("Content-Type", "application/json")
            .json(&LoginRequest::new(username, password))
            .send()
            .await
            .with_context(|| format!("Login request to {} failed", self.base_url))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if status != StatusCode::OK {
            return Err(ControllerError::AuthFailed {
                controller: self.base_url.clone(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: Option<LoginResponse> = serde_json::from_str(&body).ok();
        match parsed.as_ref().and_then(|r| r.token()) {
            Some(token) => Ok(AuthToken(token.to_string())),
            None => Err(ControllerError::MalformedLogin {
                controller: self.base_url.clone(),
                body,
            }
            .into()),
        }
    }

    /// Create or update the SNMPv3 user object
    pub async fn push_snmp_user(&self, token: &AuthToken, payload: &SnmpUserPayload) -> Result<PushOutcome> {
        let url = self.api_url(&format!("/mo/uni/userext/user-{}.json", payload.user_name()));

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .header("Authorization", format!("APIC-cookie {}", token.0))
            .json(payload)
            .send()
            .await
            .with_context(|| format!("SNMPv3 push to {} failed", self.base_url))?;

        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(PushOutcome::Applied);
        }

        let body = resp.text().await.unwrap_or_default();
        Ok(PushOutcome::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Inventory CONTROLLER_IP values may be bare hosts; the API is always HTTPS unless a scheme is given
pub fn controller_base_url(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aci::fake::spawn_fake_apic_tls;
    use axum::http::StatusCode as FakeStatus;

    #[test]
    fn test_controller_base_url() {
        assert_eq!(controller_base_url("10.0.0.5"), "https://10.0.0.5");
        assert_eq!(controller_base_url("https://apic.lab/"), "https://apic.lab");
        assert_eq!(controller_base_url(" http://127.0.0.1:8080 "), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_auth_failed_message_includes_body() {
        let err = ControllerError::AuthFailed {
            controller: "https://apic".into(),
            status: 401,
            body: "{\"error\":\"bad creds\"}".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("bad creds"));
    }

    #[test]
    fn test_missing_ca_cert() {
        let tls = ControllerTls {
            verify: true,
            ca_cert: Some("/nonexistent/ca.pem".into()),
        };
        assert!(ControllerClient::new("apic", &tls).is_err());
    }

    #[tokio::test]
    async fn test_self_signed_controller_accepted_by_default() {
        let (url, seen, _ca_pem) = spawn_fake_apic_tls(FakeStatus::OK, FakeStatus::OK).await;
        let client = ControllerClient::new(&url, &ControllerTls::default()).unwrap();

        let token = tokio_test::assert_ok!(client.login("admin", "hunter2").await);
        assert_eq!(token.0, "tok-123");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_verification_without_ca_rejects_self_signed() {
        let (url, seen, _ca_pem) = spawn_fake_apic_tls(FakeStatus::OK, FakeStatus::OK).await;
        let tls = ControllerTls { verify: true, ca_cert: None };
        let client = ControllerClient::new(&url, &tls).unwrap();

        let err = tokio_test::assert_err!(client.login("admin", "hunter2").await);
        // a transport failure, not an answer from the controller
        assert!(err.downcast_ref::<ControllerError>().is_none());
        assert!(err.to_string().contains("Login request"));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ca_cert_opt_in_trusts_controller() {
        let (url, seen, ca_pem) = spawn_fake_apic_tls(FakeStatus::OK, FakeStatus::OK).await;
        let dir = tempfile::tempdir().unwrap();
        let ca_path = dir.path().join("apic-ca.pem");
        std::fs::write(&ca_path, ca_pem).unwrap();

        let tls = ControllerTls { verify: true, ca_cert: Some(ca_path) };
        let client = ControllerClient::new(&url, &tls).unwrap();

        tokio_test::assert_ok!(client.login("admin", "hunter2").await);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
