//! Abrupt-disconnect scenario.
//!
//! Perturbs the server with a connection that is either closed without
//! reading or abandoned after a single partial read, then validates
//! that an unrelated follow-up connection still gets correct echo
//! behavior. A server that leaks state between connections fails the
//! second exchange.

use log::*;
use rand::Rng;

use super::{oracle, ScenarioResult};
use crate::net::{Conn, Limits};
use crate::payload;

pub struct LifecycleScenario<R: Rng> {
    host: String,
    port: u16,
    payload_bytes: usize,
    limits: Limits,
    rng: R,
}

impl<R: Rng> LifecycleScenario<R> {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        payload_bytes: usize,
        limits: Limits,
        rng: R,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            payload_bytes,
            limits,
            rng,
        }
    }

    pub async fn run(mut self) -> ScenarioResult {
        // Perturbation connection. Its errors never decide pass/fail;
        // it exists purely to disturb server state.
        let mut conn = Conn::connect(&self.host, self.port, self.limits).await?;
        let data = payload::generate(&mut self.rng, self.payload_bytes);
        if let Err(e) = conn.send_all(&data).await {
            debug!("perturb send failed (ignored): {}", e);
        }

        if self.rng.gen_bool(0.5) {
            debug!("perturb: closing {} without reading", conn.peer());
            drop(conn);
        } else {
            let want = self.rng.gen_range(0..=self.payload_bytes);
            match conn.recv_up_to(want).await {
                Ok(got) => debug!(
                    "perturb: read {} of {} requested bytes, abandoning {}",
                    got.len(),
                    want,
                    conn.peer()
                ),
                Err(e) => debug!("perturb recv failed (ignored): {}", e),
            }
            drop(conn);
        }

        // Clean validation exchange on a fresh, independent connection.
        let mut conn = Conn::connect(&self.host, self.port, self.limits).await?;
        let data = payload::generate(&mut self.rng, self.payload_bytes);
        Ok(oracle::full_exchange(&mut conn, &data).await)
    }
}
