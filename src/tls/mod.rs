//! TLS certificate fingerprinting
//!
//! IAM OIDC providers pin the issuer by the SHA-1 thumbprint of the top
//! certificate the issuer presents, e.g. for `oidc.eks.eu-west-2.amazonaws.com`.

use crate::error::{Iam4saError, Result};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::Url;

/// Bound on TCP connect plus TLS handshake
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Prefix `https://` to endpoints that carry no scheme
pub fn normalize_endpoint(endpoint: &str) -> String {
    if has_scheme(endpoint) {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

/// Leading RFC 3986 `scheme://`, a `://` later in the path or query does not count
fn has_scheme(endpoint: &str) -> bool {
    endpoint.split_once("://").is_some_and(|(scheme, _)| {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Resolve an endpoint to the `host:port` to dial
///
/// An explicit non-zero port is used as is; otherwise `http` gets 80 and
/// every other scheme 443.
pub fn host_and_port(endpoint: &str) -> Result<String> {
    let normalized = normalize_endpoint(endpoint);
    let url = Url::parse(&normalized).map_err(|e| Iam4saError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| Iam4saError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "missing host".to_string(),
        })?;

    let port = match url.port() {
        Some(port) if port != 0 => port,
        _ if url.scheme() == "http" => 80,
        _ => 443,
    };

    Ok(format!("{host}:{port}"))
}

/// Lowercase hex SHA-1 digest
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

fn client_config() -> Result<ClientConfig> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| Iam4saError::Config(format!("tls config: {e}")))?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(config)
}

/// SHA-1 fingerprint of the last certificate in the chain presented by `endpoint`
pub async fn fingerprint_sha1(endpoint: &str) -> Result<String> {
    let addr = host_and_port(endpoint)?;
    let host = addr
        .rsplit_once(':')
        .map(|(host, _)| host)
        .unwrap_or(&addr)
        .trim_start_matches('[')
        .trim_end_matches(']');

    let server_name =
        ServerName::try_from(host.to_string()).map_err(|e| Iam4saError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
    let connector = TlsConnector::from(Arc::new(client_config()?));

    tracing::debug!(%addr, "fetching issuer certificate chain");
    let handshake = async {
        let stream = TcpStream::connect(&addr).await?;
        connector.connect(server_name, stream).await
    };

    let stream = tokio::time::timeout(CONNECT_TIMEOUT, handshake)
        .await
        .map_err(|_| Iam4saError::Timeout(format!("TLS handshake with {addr}")))?
        .map_err(|e| Iam4saError::TlsConnect {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

    let (_, session) = stream.get_ref();
    let certificates = session.peer_certificates().unwrap_or_default();
    let last = certificates
        .last()
        .ok_or_else(|| Iam4saError::NoCertificates(endpoint.to_string()))?;

    Ok(sha1_hex(last.as_ref()))
}
