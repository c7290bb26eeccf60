//! Configuration file parser.
//!
//! Parses TOML-style configuration files with a custom lightweight parser.

use super::types::*;
use std::{fs, io};

/// Load configuration from a file path.
pub fn load_config(path: &str) -> io::Result<Config> {
    let s = fs::read_to_string(path)?;
    parse_config(&s)
}

/// Parse configuration from a string.
fn parse_config(s: &str) -> io::Result<Config> {
    let mut cfg = Config::default();

    for (lineno, line) in s.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((lhs, rhs)) = line.split_once('=') else {
            continue;
        };
        let lhs = lhs.trim();
        let mut val = rhs.trim();
        if let Some(pos) = comment_start(val) {
            val = val[..pos].trim_end();
        }

        let (section, key) = if let Some((a, b)) = lhs.split_once('.') {
            (a.trim(), b.trim())
        } else {
            ("", lhs)
        };

        if section.is_empty() {
            continue;
        }

        set_config_value(section, key, val, &mut cfg).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line {}: {}", lineno + 1, e),
            )
        })?;
    }

    Ok(cfg)
}

/// Byte offset of an inline `#` comment, skipping quoted values.
fn comment_start(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '#' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Set a configuration value based on section, key, and value strings.
fn set_config_value(section: &str, key: &str, val: &str, cfg: &mut Config) -> Result<(), String> {
    macro_rules! parse {
        (s) => {
            val.trim_matches('"').to_string()
        };
        (b) => {
            match val {
                "true" => true,
                "false" => false,
                _ => return Err(format!("bad bool {val}")),
            }
        };
        (u) => {
            val.parse::<u64>().map_err(|e| e.to_string())?
        };
        (usize_) => {
            val.parse::<usize>().map_err(|e| e.to_string())?
        };
        (u32_) => {
            val.parse::<u32>().map_err(|e| e.to_string())?
        };
        (u16_) => {
            val.parse::<u16>().map_err(|e| e.to_string())?
        };
    }

    match (section, key) {
        // Target section
        ("target", "host") => cfg.target.host = parse!(s),
        ("target", "port") => cfg.target.port = parse!(u16_),

        // Harness section
        ("harness", "scenario") => cfg.harness.scenario = parse!(s),
        ("harness", "payload_bytes") => cfg.harness.payload_bytes = parse!(usize_),
        ("harness", "trials") => cfg.harness.trials = parse!(u32_),
        ("harness", "connections") => cfg.harness.connections = parse!(usize_),
        ("harness", "stop_on_first_failure") => cfg.harness.stop_on_first_failure = parse!(b),
        ("harness", "seed") => cfg.harness.seed = parse!(u),
        ("harness", "connect_timeout_ms") => cfg.harness.connect_timeout_ms = parse!(u),
        ("harness", "io_timeout_ms") => cfg.harness.io_timeout_ms = parse!(u),
        ("harness", "recv_buf_bytes") => cfg.harness.recv_buf_bytes = parse!(usize_),

        // TLS section
        ("tls", "port") => {
            cfg.tls.get_or_insert_with(Tls::default).port = parse!(u16_);
        }
        ("tls", "trust_anchor_path") => {
            cfg.tls.get_or_insert_with(Tls::default).trust_anchor_path = parse!(s);
        }
        ("tls", "protocol") => {
            cfg.tls.get_or_insert_with(Tls::default).protocol = parse!(s);
        }
        ("tls", "server_name") => {
            cfg.tls.get_or_insert_with(Tls::default).server_name = parse!(s);
        }
        ("tls", "response_buf_bytes") => {
            cfg.tls.get_or_insert_with(Tls::default).response_buf_bytes = parse!(usize_);
        }

        _ => return Err(format!("unknown key {section}.{key}")),
    }

    Ok(())
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &str) -> io::Result<Self> {
        load_config(path)
    }
}
