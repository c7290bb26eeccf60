//! Echo correctness oracle for a single connection.

use log::*;

use super::TrialOutcome;
use crate::net::Conn;

/// Send `payload` and verify the connection echoes it back exactly.
///
/// The receive loop terminates when `payload.len()` bytes have
/// accumulated or the stream closes, so a misbehaving server fails the
/// exchange instead of hanging it. Transport errors mid-exchange are
/// failures too: observing them is what the harness is for.
pub async fn full_exchange(conn: &mut Conn, payload: &[u8]) -> TrialOutcome {
    let n = payload.len() as u64;

    if let Err(e) = conn.send_all(payload).await {
        debug!("send to {} failed: {}", conn.peer(), e);
        return TrialOutcome::fail(n, 0, format!("send: {}", e));
    }

    match conn.recv_until(payload.len()).await {
        Ok(echoed) => verdict(payload, &echoed),
        Err(e) => {
            debug!("recv from {} failed: {}", conn.peer(), e);
            TrialOutcome::fail(n, conn.received(), format!("recv: {}", e))
        }
    }
}

/// Compare expected vs observed bytes, reporting the first difference.
pub(crate) fn verdict(expected: &[u8], observed: &[u8]) -> TrialOutcome {
    let n = expected.len() as u64;
    if observed.len() < expected.len() {
        return TrialOutcome::fail(
            n,
            observed.len() as u64,
            format!(
                "stream closed after {} of {} bytes",
                observed.len(),
                expected.len()
            ),
        );
    }
    match expected
        .iter()
        .zip(observed.iter())
        .position(|(a, b)| a != b)
    {
        None => TrialOutcome::pass(n),
        Some(off) => TrialOutcome::fail(
            n,
            observed.len() as u64,
            format!("content mismatch at offset {}", off),
        ),
    }
}
