//! Configuration type definitions.

/// Endpoint of the server under test.
#[derive(Clone, Debug)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9999,
        }
    }
}

/// Trial and scenario knobs.
#[derive(Clone, Debug)]
pub struct Harness {
    /// Which suite to run: "lifecycle", "manyconn", "secure" or "all".
    pub scenario: String,
    pub payload_bytes: usize,
    pub trials: u32,
    /// Connection count K for the many-connection scenario.
    pub connections: usize,
    pub stop_on_first_failure: bool,
    /// RNG seed; 0 draws one from entropy and logs it.
    pub seed: u64,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
    pub recv_buf_bytes: usize,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            scenario: "all".into(),
            payload_bytes: 1000,
            trials: 50,
            connections: 5,
            stop_on_first_failure: true,
            seed: 0,
            connect_timeout_ms: 3000,
            io_timeout_ms: 5000,
            recv_buf_bytes: 64 * 1024,
        }
    }
}

/// Secure probe configuration.
#[derive(Clone, Debug)]
pub struct Tls {
    /// TLS-terminated port; may differ from the plain target port.
    pub port: u16,
    pub trust_anchor_path: String,
    /// "1.2" or "1.3".
    pub protocol: String,
    /// Name the server certificate must be valid for.
    pub server_name: String,
    pub response_buf_bytes: usize,
}

impl Default for Tls {
    fn default() -> Self {
        Self {
            port: 0,
            trust_anchor_path: String::new(),
            protocol: "1.3".into(),
            server_name: "localhost".into(),
            response_buf_bytes: 4096,
        }
    }
}

/// Root configuration container.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub target: Target,
    pub harness: Harness,
    pub tls: Option<Tls>,
}
