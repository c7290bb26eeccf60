//! Client connection to the server under test.
//!
//! One `Conn` wraps either a plain TCP or a TLS stream so the scenarios
//! can drive both transports through the same primitives. A connection
//! is opened, bound to one payload, and closed or abandoned within a
//! single trial; it is never reused across trials.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::BytesMut;
use log::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::common::HarnessError;
use crate::metrics::METRICS;
use crate::net::tls::TlsClient;

/// Per-call deadlines and buffer sizing for connection I/O.
///
/// Every send and receive is bounded by `io_timeout_ms` so an
/// unresponsive server fails a trial instead of hanging the run.
#[derive(Clone, Copy, Debug)]
pub struct Limits {
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
    pub recv_buf_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 3000,
            io_timeout_ms: 5000,
            recv_buf_bytes: 64 * 1024,
        }
    }
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

/// A live bidirectional byte stream to the server under test.
pub struct Conn {
    stream: Stream,
    peer: SocketAddr,
    local: SocketAddr,
    limits: Limits,
    received: u64,
}

async fn open_tcp(host: &str, port: u16, limits: Limits) -> Result<TcpStream, HarnessError> {
    let addr = format!("{}:{}", host, port);
    let stream = tokio::time::timeout(
        Duration::from_millis(limits.connect_timeout_ms),
        TcpStream::connect(&addr),
    )
    .await
    .map_err(|_| HarnessError::Connect(io::Error::new(io::ErrorKind::TimedOut, "connect timeout")))?
    .map_err(HarnessError::Connect)?;
    Ok(stream)
}

impl Conn {
    /// Open a plain TCP connection.
    ///
    /// A connect failure means the scenario cannot start at all, so it
    /// aborts the run rather than counting as a trial failure.
    pub async fn connect(host: &str, port: u16, limits: Limits) -> Result<Self, HarnessError> {
        let stream = open_tcp(host, port, limits).await?;
        let peer = stream.peer_addr().map_err(HarnessError::Connect)?;
        let local = stream.local_addr().map_err(HarnessError::Connect)?;
        METRICS.connections_opened.fetch_add(1, Ordering::Relaxed);
        debug!("connected to {} from {}", peer, local);
        Ok(Self {
            stream: Stream::Plain(stream),
            peer,
            local,
            limits,
            received: 0,
        })
    }

    /// Open a TLS connection, performing a validated handshake.
    pub async fn connect_tls(
        host: &str,
        port: u16,
        tls: &TlsClient,
        limits: Limits,
    ) -> Result<Self, HarnessError> {
        let stream = open_tcp(host, port, limits).await?;
        let peer = stream.peer_addr().map_err(HarnessError::Connect)?;
        let local = stream.local_addr().map_err(HarnessError::Connect)?;
        let tls_stream = tokio::time::timeout(
            Duration::from_millis(limits.connect_timeout_ms),
            tls.handshake(stream),
        )
        .await
        .map_err(|_| HarnessError::Tls("handshake timeout".into()))??;
        METRICS.connections_opened.fetch_add(1, Ordering::Relaxed);
        debug!("tls handshake complete with {}", peer);
        Ok(Self {
            stream: Stream::Tls(Box::new(tls_stream)),
            peer,
            local,
            limits,
            received: 0,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Stable identity token for this connection.
    ///
    /// Incorporates the ordinal so tokens stay pairwise distinct within
    /// a run even if the OS reuses a local port.
    pub fn identity(&self, ordinal: usize) -> String {
        format!("conn-{}/{}", ordinal, self.local)
    }

    /// Bytes received over the lifetime of this connection.
    pub fn received(&self) -> u64 {
        self.received
    }

    async fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::Plain(s) => s.read(buf).await,
            Stream::Tls(s) => s.read(buf).await,
        }
    }

    async fn write_every(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.stream {
            Stream::Plain(s) => {
                s.write_all(data).await?;
                s.flush().await
            }
            Stream::Tls(s) => {
                s.write_all(data).await?;
                s.flush().await
            }
        }
    }

    /// Send the whole buffer, retrying partial writes transparently.
    pub async fn send_all(&mut self, data: &[u8]) -> io::Result<()> {
        tokio::time::timeout(
            Duration::from_millis(self.limits.io_timeout_ms),
            self.write_every(data),
        )
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "send timeout"))??;
        METRICS.bytes_sent.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Receive until exactly `n` bytes have accumulated or the stream
    /// reaches EOF, whichever comes first.
    ///
    /// The returned buffer is shorter than `n` exactly when the server
    /// closed early; callers decide what that means. `n == 0` returns
    /// an empty buffer without touching the socket.
    pub async fn recv_until(&mut self, n: usize) -> io::Result<BytesMut> {
        let mut acc = BytesMut::with_capacity(n.min(self.limits.recv_buf_bytes));
        if n == 0 {
            return Ok(acc);
        }
        let mut chunk = vec![0u8; n.min(self.limits.recv_buf_bytes)];
        while acc.len() < n {
            let want = (n - acc.len()).min(chunk.len());
            let got = tokio::time::timeout(
                Duration::from_millis(self.limits.io_timeout_ms),
                self.read_some(&mut chunk[..want]),
            )
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "recv timeout"))??;
            if got == 0 {
                // EOF before n bytes; return the short accumulator.
                break;
            }
            acc.extend_from_slice(&chunk[..got]);
            self.received += got as u64;
            METRICS.bytes_received.fetch_add(got as u64, Ordering::Relaxed);
        }
        Ok(acc)
    }

    /// Exactly one receive call for at most `n` bytes.
    ///
    /// May return fewer bytes than requested; `n == 0` is a well-defined
    /// no-op returning an empty buffer.
    pub async fn recv_up_to(&mut self, n: usize) -> io::Result<BytesMut> {
        if n == 0 {
            return Ok(BytesMut::new());
        }
        let mut buf = vec![0u8; n.min(self.limits.recv_buf_bytes)];
        let got = tokio::time::timeout(
            Duration::from_millis(self.limits.io_timeout_ms),
            self.read_some(&mut buf),
        )
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "recv timeout"))??;
        self.received += got as u64;
        METRICS.bytes_received.fetch_add(got as u64, Ordering::Relaxed);
        buf.truncate(got);
        Ok(BytesMut::from(&buf[..]))
    }
}
