//! TCP uplink adapter.
//!
//! Implements [`Connector`] and [`Link`] over a plain
//! `std::net::TcpStream`.
//!
//! ## Connection model
//!
//! 1. `open()` resolves `host:port` and tries each address with
//!    `connect_timeout`, returning the first that answers.
//! 2. The stream is left blocking with a write timeout, so a stalled
//!    peer bounds each `send()` instead of hanging the worker.
//! 3. `send()` writes the whole record and flushes, then checks the
//!    socket's pending error (`SO_ERROR`).  Any failure drops the stream;
//!    `is_open()` is false from then on.
//! 4. `close()` shuts both directions down and ignores errors.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::{Connector, Link};
use crate::endpoint::Endpoint;
use crate::error::UplinkError;

// ───────────────────────────────────────────────────────────────
// Connector
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TcpConnector {
    write_timeout: Duration,
}

impl TcpConnector {
    pub fn new(write_timeout: Duration) -> Self {
        Self { write_timeout }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Connector for TcpConnector {
    type Link = TcpLink;

    fn open(&self, endpoint: &Endpoint, timeout: Duration) -> Result<TcpLink, UplinkError> {
        let addrs = (endpoint.host(), endpoint.port())
            .to_socket_addrs()
            .map_err(|e| UplinkError::ConnectFailed(format!("cannot resolve {endpoint}: {e}")))?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return TcpLink::from_stream(stream, addr, self.write_timeout),
                Err(e) => {
                    debug!("TCP: connect {} failed: {}", addr, e);
                    last_err = Some(e);
                }
            }
        }

        Err(match last_err {
            Some(e) => UplinkError::from_connect(&e),
            None => UplinkError::ConnectFailed(format!("{endpoint} resolved to no addresses")),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Link
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct TcpLink {
    stream: Option<TcpStream>,
    peer: SocketAddr,
}

impl TcpLink {
    fn from_stream(
        stream: TcpStream,
        peer: SocketAddr,
        write_timeout: Duration,
    ) -> Result<Self, UplinkError> {
        let setup = |s: &TcpStream| -> std::io::Result<()> {
            s.set_nodelay(true)?;
            s.set_write_timeout(Some(write_timeout))
        };
        setup(&stream).map_err(|e| UplinkError::from_connect(&e))?;
        info!("TCP: connected to {}", peer);
        Ok(Self {
            stream: Some(stream),
            peer,
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    fn write_record(stream: &mut TcpStream, record: &[u8]) -> std::io::Result<()> {
        stream.write_all(record)?;
        stream.flush()?;
        match stream.take_error()? {
            Some(pending) => Err(pending),
            None => Ok(()),
        }
    }
}

impl Link for TcpLink {
    fn send(&mut self, record: &[u8]) -> Result<(), UplinkError> {
        let stream = self.stream.as_mut().ok_or(UplinkError::NotConnected)?;
        if let Err(e) = Self::write_record(stream, record) {
            warn!("TCP: write to {} failed: {}", self.peer, e);
            self.close();
            return Err(UplinkError::from_write(&e));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            info!("TCP: closed connection to {}", self.peer);
        }
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.close();
    }
}
