//! TLS handshake-and-exchange smoke probe.
//!
//! Establishes a certificate-validated TLS connection and issues two
//! sequential textual request/response exchanges over it: one request
//! with a declared body length and body, one with no body. Certificate
//! validation is enforced by `net::tls`; a failed handshake aborts the
//! probe before any request is sent.

use bytes::BytesMut;
use log::*;

use super::TrialOutcome;
use crate::common::HarnessError;
use crate::net::conn::{Conn, Limits};
use crate::net::tls::TlsClient;

const PROBE_BODY: &str = "1234567890";

/// What the probe observed after the handshake.
///
/// Pass/fail judgement is the caller's; `outcome()` offers the default
/// reading (both exchanges yielded bytes) so the probe can sit under
/// the trial runner like any other scenario.
#[derive(Debug)]
pub struct ProbeReport {
    pub responses: Vec<BytesMut>,
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn outcome(&self) -> TrialOutcome {
        let observed: u64 = self.responses.iter().map(|r| r.len() as u64).sum();
        let complete =
            self.responses.len() == 2 && self.responses.iter().all(|r| !r.is_empty());
        if self.error.is_none() && complete {
            TrialOutcome::pass(observed)
        } else {
            let detail = self
                .error
                .clone()
                .unwrap_or_else(|| format!("{} of 2 responses received", self.responses.len()));
            TrialOutcome::fail(observed, observed, detail)
        }
    }
}

pub struct SecureChannelProbe {
    host: String,
    port: u16,
    tls: TlsClient,
    limits: Limits,
    response_buf_bytes: usize,
}

impl SecureChannelProbe {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tls: TlsClient,
        limits: Limits,
        response_buf_bytes: usize,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
            limits,
            response_buf_bytes,
        }
    }

    /// Run the probe.
    ///
    /// TLS setup and certificate validation failures abort with an
    /// error; transport trouble after the handshake is recorded in the
    /// report instead.
    pub async fn run(&self) -> Result<ProbeReport, HarnessError> {
        let mut conn =
            Conn::connect_tls(&self.host, self.port, &self.tls, self.limits).await?;
        info!("secure channel established with {}", conn.peer());

        let requests = [
            format!(
                "POST /cgi/echo HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\n\r\n{}",
                self.host,
                PROBE_BODY.len(),
                PROBE_BODY
            ),
            format!("GET /style.css HTTP/1.1\r\nHost: {}\r\n\r\n", self.host),
        ];

        let mut report = ProbeReport {
            responses: Vec::with_capacity(requests.len()),
            error: None,
        };

        for (i, req) in requests.iter().enumerate() {
            if let Err(e) = conn.send_all(req.as_bytes()).await {
                report.error = Some(format!("request {}: send: {}", i, e));
                return Ok(report);
            }
            match conn.recv_up_to(self.response_buf_bytes).await {
                Ok(resp) => {
                    debug!("probe exchange {}: {} response bytes", i, resp.len());
                    report.responses.push(resp);
                }
                Err(e) => {
                    report.error = Some(format!("request {}: recv: {}", i, e));
                    return Ok(report);
                }
            }
        }

        Ok(report)
    }
}
