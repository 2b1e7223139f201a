//! Byte-stream transport to the device.
//!
//! The engine never opens a device node itself. A [`Connector`] produces a
//! [`Transport`] on demand; [`StreamTransport`] adapts any tokio byte stream
//! (a serial port stream, a TCP socket to a serial bridge, an in-memory pipe).

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// An open, bidirectional byte stream to the device.
#[async_trait]
pub trait Transport: Send {
    /// Write all of `data`.
    async fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`. Returns 0 at end of stream.
    ///
    /// Must be cancel-safe: the connection task races it against timers and
    /// requests, and drops it when another branch wins.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Drop any input already buffered by the OS or the driver.
    async fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()>;
}

/// Opens transports. Called once per [`RfxEngine::open`](crate::RfxEngine::open).
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> io::Result<Box<dyn Transport>>;
}

/// [`Transport`] over any `AsyncRead + AsyncWrite` stream.
#[derive(Debug)]
pub struct StreamTransport<S> {
    inner: S,
}

impl<S> StreamTransport<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data).await?;
        self.inner.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).await
    }

    async fn discard_input(&mut self) -> io::Result<()> {
        let mut scratch = [0u8; 256];
        let mut dropped = 0usize;
        // Drain only what is ready right now; stop at the first pending read.
        loop {
            match tokio::time::timeout(Duration::ZERO, self.inner.read(&mut scratch)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => dropped += n,
                Ok(Err(e)) => return Err(e),
            }
        }
        if dropped > 0 {
            trace!(dropped, "discarded pending input");
        }
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }
}

/// Connects over TCP, e.g. to a ser2net-style serial bridge.
#[derive(Clone, Debug)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn open(&self) -> io::Result<Box<dyn Transport>> {
        debug!(addr = %self.addr, "TCP connecting");
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true).ok();
        Ok(Box::new(StreamTransport::new(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn stream_transport_roundtrip() {
        let (near, mut far) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(near);

        transport.write(&[0x04, 0x02, 0x01, 0x00, 0x00]).await.unwrap();
        let mut buf = [0u8; 8];
        let n = far.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x04, 0x02, 0x01, 0x00, 0x00]);

        far.write_all(&[0xAA, 0xBB]).await.unwrap();
        let n = transport.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0xAA, 0xBB]);
    }

    #[tokio::test]
    async fn discard_input_drops_buffered_bytes() {
        let (near, mut far) = tokio::io::duplex(1024);
        let mut transport = StreamTransport::new(near);

        far.write_all(&[0x55; 600]).await.unwrap();
        transport.discard_input().await.unwrap();

        far.write_all(&[0x01]).await.unwrap();
        let mut buf = [0u8; 8];
        let n = transport.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[0x01]);
    }

    #[tokio::test]
    async fn read_returns_zero_at_eof() {
        let (near, far) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(near);
        drop(far);
        let mut buf = [0u8; 8];
        assert_eq!(transport.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn tcp_connector_opens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connector = TcpConnector::new(addr.to_string());

        let (transport, accepted) = tokio::join!(connector.open(), listener.accept());
        let mut transport = transport.unwrap();
        let (mut server, _) = accepted.unwrap();

        transport.write(b"\x04\x02\x01\x00\x00").await.unwrap();
        let mut buf = [0u8; 8];
        let n = server.read(&mut buf).await.unwrap();
        assert_eq!(n, 5);
    }
}
