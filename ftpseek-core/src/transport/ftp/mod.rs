//! Minimal FTP client
//!
//! Implements only what the search needs: login, directory listing and
//! binary retrieval from an offset, over passive-mode data connections.
//! Every network operation is bounded by the session timeout.

mod listing;
mod reply;

use std::fmt;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::{debug, trace};

use ftpseek_common::{Credentials, RemoteEntry};

use self::listing::parse_listing;
use self::reply::{Reply, parse_epsv_port, parse_pasv_port, read_reply};
use super::{Session, Transport, TransportError};

/// Data channel read buffer size
const DATA_BUFFER_SIZE: usize = 64 * 1024;

/// Reply codes
const READY: u16 = 220;
const LOGGED_IN: u16 = 230;
const NEED_PASSWORD: u16 = 331;
const COMMAND_SUPERFLUOUS: u16 = 202;
const FILE_ACTION_OK: u16 = 250;
const TRANSFER_COMPLETE: u16 = 226;
const PENDING_FURTHER_INFO: u16 = 350;
const ENTERING_PASSIVE: u16 = 227;
const ENTERING_EXTENDED_PASSIVE: u16 = 229;
const FILE_UNAVAILABLE: u16 = 550;

/// Run `future`, failing with `TransportError::Timeout` after `limit`
async fn bounded<T, F>(operation: &'static str, limit: Duration, future: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            operation,
            timeout: limit,
        }),
    }
}

async fn connect_stream<A>(address: A, timeout: Duration) -> Result<TcpStream, TransportError>
where
    A: ToSocketAddrs + fmt::Display,
{
    bounded("connect", timeout, async {
        TcpStream::connect(&address)
            .await
            .map_err(|source| TransportError::Connect {
                address: address.to_string(),
                source,
            })
    })
    .await
}

/// Opens FTP sessions over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct FtpTransport;

impl FtpTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for FtpTransport {
    async fn connect(
        &self,
        hostname: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Box<dyn Session>, TransportError> {
        let address = format!("{hostname}:{port}");
        let stream = connect_stream(address.as_str(), timeout).await?;

        let peer = stream.peer_addr()?.ip();
        let (read, write) = stream.into_split();
        let mut session = FtpSession {
            reader: BufReader::new(read),
            writer: write,
            peer,
            timeout,
            closed: false,
        };

        let greeting = session.reply("greeting").await?;
        if greeting.code != READY {
            return Err(TransportError::Protocol(greeting.to_string()));
        }
        debug!(address = %address, "connected");
        Ok(Box::new(session))
    }
}

/// One FTP control connection
struct FtpSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Address data connections are opened to
    peer: IpAddr,
    timeout: Duration,
    closed: bool,
}

impl FtpSession {
    async fn send(&mut self, command: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if command.starts_with("PASS ") {
            trace!("> PASS ****");
        } else {
            trace!("> {command}");
        }

        let line = format!("{command}\r\n");
        let writer = &mut self.writer;
        bounded("send", self.timeout, async move {
            writer
                .write_all(line.as_bytes())
                .await
                .map_err(TransportError::from)
        })
        .await
    }

    async fn reply(&mut self, operation: &'static str) -> Result<Reply, TransportError> {
        let reply = bounded(operation, self.timeout, read_reply(&mut self.reader)).await?;
        trace!("< {reply}");
        Ok(reply)
    }

    async fn command(&mut self, command: &str, operation: &'static str) -> Result<Reply, TransportError> {
        self.send(command).await?;
        self.reply(operation).await
    }

    /// Open a passive data connection, preferring EPSV
    async fn open_data(&mut self) -> Result<TcpStream, TransportError> {
        let epsv = self.command("EPSV", "EPSV").await?;
        let port = if epsv.code == ENTERING_EXTENDED_PASSIVE {
            parse_epsv_port(&epsv.text)
                .ok_or_else(|| TransportError::Protocol(epsv.to_string()))?
        } else {
            let pasv = self.command("PASV", "PASV").await?;
            if pasv.code != ENTERING_PASSIVE {
                return Err(TransportError::Protocol(pasv.to_string()));
            }
            parse_pasv_port(&pasv.text).ok_or_else(|| TransportError::Protocol(pasv.to_string()))?
        };

        connect_stream(SocketAddr::new(self.peer, port), self.timeout).await
    }

    /// Copy a data connection into `sink` until the server closes it
    async fn drain_data(
        &self,
        mut data: TcpStream,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, TransportError> {
        let mut buf = vec![0u8; DATA_BUFFER_SIZE];
        let mut total = 0u64;
        loop {
            let read = bounded("data read", self.timeout, async {
                data.read(&mut buf).await.map_err(TransportError::from)
            })
            .await?;
            if read == 0 {
                return Ok(total);
            }
            sink.write_all(&buf[..read]).await?;
            total += read as u64;
        }
    }

    /// Read the reply that ends a transfer
    async fn finish_transfer(&mut self) -> Result<(), TransportError> {
        let done = self.reply("transfer").await?;
        if done.code == TRANSFER_COMPLETE || done.code == FILE_ACTION_OK {
            Ok(())
        } else {
            Err(TransportError::Protocol(done.to_string()))
        }
    }

    /// Start a transfer command; returns once the server has accepted it
    async fn start_transfer(&mut self, command: &str, path: &str) -> Result<(), TransportError> {
        let start = self.command(command, "transfer").await?;
        if start.is_preliminary() {
            Ok(())
        } else if start.code == FILE_UNAVAILABLE {
            Err(TransportError::NoSuchPath(path.to_string()))
        } else {
            Err(TransportError::Protocol(start.to_string()))
        }
    }
}

#[async_trait]
impl Session for FtpSession {
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), TransportError> {
        let user = self
            .command(&format!("USER {}", credentials.username), "login")
            .await?;
        match user.code {
            LOGGED_IN => {}
            NEED_PASSWORD => {
                let pass = self
                    .command(&format!("PASS {}", credentials.password), "login")
                    .await?;
                if pass.code != LOGGED_IN && pass.code != COMMAND_SUPERFLUOUS {
                    return Err(TransportError::Auth(pass.to_string()));
                }
            }
            _ => return Err(TransportError::Auth(user.to_string())),
        }

        let binary = self.command("TYPE I", "TYPE").await?;
        if !binary.is_completion() {
            return Err(TransportError::Protocol(binary.to_string()));
        }
        Ok(())
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, TransportError> {
        let cwd = self.command(&format!("CWD {path}"), "CWD").await?;
        match cwd.code {
            FILE_ACTION_OK => {}
            FILE_UNAVAILABLE => return Err(TransportError::NoSuchPath(path.to_string())),
            _ => return Err(TransportError::Protocol(cwd.to_string())),
        }

        let data = self.open_data().await?;
        self.start_transfer("LIST", path).await?;

        let mut body = Vec::new();
        self.drain_data(data, &mut body).await?;
        self.finish_transfer().await?;

        let entries = parse_listing(&String::from_utf8_lossy(&body));
        trace!(path, entries = entries.len(), "listed directory");
        Ok(entries)
    }

    async fn retrieve(
        &mut self,
        path: &str,
        offset: u64,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, TransportError> {
        let data = self.open_data().await?;

        if offset > 0 {
            let rest = self.command(&format!("REST {offset}"), "REST").await?;
            if rest.code != PENDING_FURTHER_INFO {
                return Err(TransportError::Protocol(rest.to_string()));
            }
        }

        self.start_transfer(&format!("RETR {path}"), path).await?;
        let written = self.drain_data(data, sink).await?;
        self.finish_transfer().await?;
        Ok(written)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        // Best effort: the server may already have hung up
        if self.command("QUIT", "QUIT").await.is_err() {
            trace!("QUIT not acknowledged");
        }
        self.closed = true;
        let _ = self.writer.shutdown().await;
        Ok(())
    }
}
