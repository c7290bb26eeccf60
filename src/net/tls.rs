//! TLS client setup for the secure probe.
//!
//! Builds a rustls client configuration that validates the server's
//! certificate chain against a fixed trust anchor file. Validation is
//! mandatory; there is no unverified fallback.

use log::*;
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::RootCertStore;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::common::HarnessError;

/// Protocol version selection for the secure probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVersion {
    V12,
    V13,
}

impl TlsVersion {
    /// Parse a configured version string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1.2" | "tls1.2" => Some(TlsVersion::V12),
            "1.3" | "tls1.3" => Some(TlsVersion::V13),
            _ => None,
        }
    }

    fn supported(self) -> &'static rustls::SupportedProtocolVersion {
        match self {
            TlsVersion::V12 => &rustls::version::TLS12,
            TlsVersion::V13 => &rustls::version::TLS13,
        }
    }
}

/// Load trust-anchor certificates from a PEM file.
fn load_anchors(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .filter_map(|cert| cert.ok())
        .collect();
    if certs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("no certificates found in {}", path.display()),
        ));
    }
    Ok(certs)
}

/// Client-side TLS connector pinned to one trust anchor and one
/// protocol version.
#[derive(Clone)]
pub struct TlsClient {
    connector: TlsConnector,
    server_name: ServerName<'static>,
}

impl TlsClient {
    /// Build a connector from a PEM trust anchor.
    ///
    /// `server_name` is the name the presented certificate must be
    /// valid for. An empty or unparseable anchor file is an error.
    pub fn from_trust_anchor(
        path: &str,
        version: TlsVersion,
        server_name: &str,
    ) -> Result<Self, HarnessError> {
        let certs = load_anchors(Path::new(path))
            .map_err(|e| HarnessError::Tls(format!("trust anchor {}: {}", path, e)))?;

        let mut roots = RootCertStore::empty();
        for cert in certs {
            roots
                .add(cert)
                .map_err(|e| HarnessError::Tls(format!("bad trust anchor {}: {}", path, e)))?;
        }

        let config = rustls::ClientConfig::builder_with_protocol_versions(&[version.supported()])
            .with_root_certificates(roots)
            .with_no_client_auth();

        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|e| HarnessError::Tls(format!("bad server name {}: {}", server_name, e)))?;

        info!("tls client configured: anchor={} version={:?}", path, version);

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
            server_name,
        })
    }

    /// Perform the handshake over an established TCP stream.
    ///
    /// Any certificate validation failure surfaces here as an error;
    /// the caller never proceeds unverified.
    pub async fn handshake(&self, stream: TcpStream) -> Result<TlsStream<TcpStream>, HarnessError> {
        self.connector
            .connect(self.server_name.clone(), stream)
            .await
            .map_err(|e| HarnessError::Tls(format!("handshake: {}", e)))
    }
}
