//! Random payload generation.

use bytes::{Bytes, BytesMut};
use rand::RngCore;

/// Generate a payload of exactly `size` bytes.
///
/// Each byte is drawn independently and uniformly from 0..=255. A size
/// of 0 yields an empty payload; downstream consumers handle it like
/// any other. The random source is injected so runs can be reproduced
/// from a seed.
pub fn generate<R: RngCore>(rng: &mut R, size: usize) -> Bytes {
    let mut buf = BytesMut::zeroed(size);
    rng.fill_bytes(&mut buf);
    buf.freeze()
}
