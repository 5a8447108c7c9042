//! Minimal APIC stand-in for tests: answers aaaLogin and the snmpUser push
//! with fixed status codes and records every request it sees.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One request as the fake controller received it
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub accept: Option<String>,
    pub body: Value,
}

pub type Seen = Arc<Mutex<Vec<SeenRequest>>>;

#[derive(Clone)]
struct FakeApic {
    login_status: StatusCode,
    push_status: StatusCode,
    seen: Seen,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

async fn fake_login(
    State(apic): State<FakeApic>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    apic.seen.lock().unwrap().push(SeenRequest {
        path: "/api/aaaLogin.json".into(),
        authorization: header(&headers, "authorization"),
        accept: header(&headers, "accept"),
        body,
    });
    if apic.login_status == StatusCode::OK {
        (StatusCode::OK, Json(json!({
            "totalCount": "1",
            "imdata": [{ "aaaLogin": { "attributes": { "token": "tok-123" } } }]
        })))
    } else {
        (apic.login_status, Json(json!({ "imdata": [{ "error": { "attributes": { "text": "bad creds" } } }] })))
    }
}

async fn fake_push(
    State(apic): State<FakeApic>,
    Path(file): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    apic.seen.lock().unwrap().push(SeenRequest {
        path: format!("/api/mo/uni/userext/{}", file),
        authorization: header(&headers, "authorization"),
        accept: header(&headers, "accept"),
        body,
    });
    (apic.push_status, "{\"imdata\":[]}".to_string())
}

fn fake_router(login_status: StatusCode, push_status: StatusCode) -> (Router, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let state = FakeApic {
        login_status,
        push_status,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/api/aaaLogin.json", post(fake_login))
        .route("/api/mo/uni/userext/:file", post(fake_push))
        .with_state(state);
    (app, seen)
}

/// Serve a fake APIC on an ephemeral loopback port; returns its base URL and request log
pub async fn spawn_fake_apic(login_status: StatusCode, push_status: StatusCode) -> (String, Seen) {
    let (app, seen) = fake_router(login_status, push_status);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), seen)
}

/// HTTPS variant with a certificate from a throwaway CA; also returns the CA PEM
pub async fn spawn_fake_apic_tls(login_status: StatusCode, push_status: StatusCode) -> (String, Seen, String) {
    let (app, seen) = fake_router(login_status, push_status);
    let (server_config, ca_pem) = self_signed_server_config();
    let acceptor = tokio_rustls::TlsAcceptor::from(Arc::new(server_config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((tcp_stream, _remote_addr)) = listener.accept().await else {
                return;
            };
            let acceptor = acceptor.clone();
            let service = TowerToHyperService::new(app.clone());
            tokio::spawn(async move {
                // Clients that refuse the certificate end here
                let Ok(tls_stream) = acceptor.accept(tcp_stream).await else {
                    return;
                };
                let _ = auto::Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(tls_stream), service)
                    .await;
            });
        }
    });
    (format!("https://{}", addr), seen, ca_pem)
}

fn self_signed_server_config() -> (rustls::ServerConfig, String) {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    ca_params.distinguished_name.push(DnType::CommonName, "Fake APIC CA");
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();

    let leaf_key = KeyPair::generate().unwrap();
    let mut leaf_params = CertificateParams::new(vec!["127.0.0.1".to_string(), "localhost".to_string()]).unwrap();
    leaf_params.distinguished_name.push(DnType::CommonName, "apic");
    let leaf_cert = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(leaf_key.serialize_der()));
    let config = rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![leaf_cert.der().clone()], key)
        .unwrap();
    (config, ca_cert.pem())
}
