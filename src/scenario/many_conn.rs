//! Randomized close-order scenario across many connections.
//!
//! Each of K connections is sent a unique identity token and must
//! return exactly that token when verified, regardless of the order
//! connections are finalized in. A server that indexes connections by
//! mutable list position instead of a stable identity returns the
//! wrong token at the first close after a removal.

use log::*;
use rand::seq::SliceRandom;
use rand::Rng;

use super::{oracle, ScenarioResult, TrialOutcome};
use crate::common::HarnessError;
use crate::net::{Conn, Limits};

pub struct ManyConnectionScenario<R: Rng> {
    host: String,
    port: u16,
    connections: usize,
    limits: Limits,
    rng: R,
}

impl<R: Rng> ManyConnectionScenario<R> {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        connections: usize,
        limits: Limits,
        rng: R,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            connections,
            limits,
            rng,
        }
    }

    pub async fn run(mut self) -> ScenarioResult {
        if self.connections == 0 {
            return Err(HarnessError::InvalidParameter(
                "connection count must be at least 1",
            ));
        }

        // Open all K connections up front; each gets a token unique by
        // ordinal and stable for its lifetime.
        let mut conns: Vec<(Conn, String)> = Vec::with_capacity(self.connections);
        for i in 0..self.connections {
            let conn = Conn::connect(&self.host, self.port, self.limits).await?;
            let identity = conn.identity(i);
            conns.push((conn, identity));
        }

        for (conn, identity) in conns.iter_mut() {
            if let Err(e) = conn.send_all(identity.as_bytes()).await {
                return Ok(TrialOutcome::fail(
                    identity.len() as u64,
                    0,
                    format!("send identity: {}", e),
                ));
            }
        }

        // Uniform shuffle; computed once, read-only afterwards.
        let mut close_order: Vec<usize> = (0..self.connections).collect();
        close_order.shuffle(&mut self.rng);
        debug!("close order: {:?}", close_order);

        // Slots are emptied in close order; the permutation visits each
        // index exactly once.
        let mut slots: Vec<Option<(Conn, String)>> = conns.into_iter().map(Some).collect();
        let mut verified = 0u64;
        for &idx in &close_order {
            let (mut conn, identity) = slots[idx].take().unwrap();
            let echoed = match conn.recv_until(identity.len()).await {
                Ok(buf) => buf,
                Err(e) => {
                    return Ok(TrialOutcome::fail(
                        identity.len() as u64,
                        conn.received(),
                        format!("connection {}: recv: {}", idx, e),
                    ));
                }
            };
            let out = oracle::verdict(identity.as_bytes(), &echoed);
            // Closed immediately after verification either way.
            drop(conn);
            if !out.passed {
                // First mismatch localizes the corruption; stop here.
                return Ok(TrialOutcome::fail(
                    out.bytes_expected,
                    out.bytes_observed,
                    format!("connection {}: {}", idx, out.detail.unwrap_or_default()),
                ));
            }
            verified += identity.len() as u64;
        }

        Ok(TrialOutcome::pass(verified))
    }
}
