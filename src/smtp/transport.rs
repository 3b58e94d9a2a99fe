//! TCP stream handling for the SMTP dispatcher.
//!
//! [`SmtpStream`] is the seam between the transaction logic in
//! [`super::Mailer`] and the network, so the transaction can be tested
//! against a scripted stream.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::DispatchError;
use crate::smtp::protocol::Reply;

/// Byte-level SMTP stream operations.
#[async_trait]
pub trait SmtpStream: Send {
    /// Reads one (possibly multiline) reply.
    async fn read_reply(&mut self) -> Result<Reply, DispatchError>;

    /// Writes a single line followed by CRLF.
    async fn write_line(&mut self, line: &str) -> Result<(), DispatchError>;

    /// Writes raw bytes (the DATA payload).
    async fn write_raw(&mut self, data: &[u8]) -> Result<(), DispatchError>;

    /// Upgrades the connection to TLS via STARTTLS.
    async fn upgrade_tls(&mut self, host: &str) -> Result<(), DispatchError>;

    /// True once TLS is established.
    fn is_tls(&self) -> bool;

    /// Shuts the connection down. Safe to call more than once.
    async fn close(&mut self) -> Result<(), DispatchError>;
}

enum StreamState {
    Plain(BufReader<TcpStream>),
    Tls(BufReader<tokio_rustls::client::TlsStream<TcpStream>>),
    /// Placeholder while the plain stream is being handed to the TLS
    /// connector, and the terminal state after close.
    Detached,
}

/// A real TCP connection with optional STARTTLS upgrade.
pub struct TcpSmtpStream {
    stream: StreamState,
    command_timeout: Duration,
}

impl TcpSmtpStream {
    /// Connects to `address` ("host:port") with the given timeouts.
    pub async fn connect(
        address: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let stream = timeout(connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| DispatchError::Timeout(format!("connect to {address} timed out")))??;

        stream.set_nodelay(true).ok();

        Ok(Self {
            stream: StreamState::Plain(BufReader::new(stream)),
            command_timeout,
        })
    }

    async fn read_reply_from<R: AsyncBufReadExt + Unpin>(
        reader: &mut R,
        command_timeout: Duration,
    ) -> Result<Reply, DispatchError> {
        let mut raw = Vec::new();

        loop {
            let mut line = String::new();
            let n = timeout(command_timeout, reader.read_line(&mut line))
                .await
                .map_err(|_| DispatchError::Timeout("read timed out".to_string()))?
                .map_err(|e| DispatchError::Protocol(format!("read error: {e}")))?;

            if n == 0 {
                return Err(DispatchError::Connection(
                    "server closed the connection".to_string(),
                ));
            }

            let line = line.trim_end().to_string();
            let continuation = line.len() >= 4 && line.as_bytes()[3] == b'-';
            raw.push(line);

            if !continuation {
                break;
            }
        }

        let reply = Reply::parse(&raw)?;
        tracing::trace!(code = reply.code, "smtp reply");
        Ok(reply)
    }

    async fn write_to<W: AsyncWrite + Unpin>(
        writer: &mut W,
        data: &[u8],
        command_timeout: Duration,
    ) -> Result<(), DispatchError> {
        timeout(command_timeout, writer.write_all(data))
            .await
            .map_err(|_| DispatchError::Timeout("write timed out".to_string()))??;
        timeout(command_timeout, writer.flush())
            .await
            .map_err(|_| DispatchError::Timeout("flush timed out".to_string()))??;
        Ok(())
    }
}

#[async_trait]
impl SmtpStream for TcpSmtpStream {
    async fn read_reply(&mut self) -> Result<Reply, DispatchError> {
        match &mut self.stream {
            StreamState::Plain(reader) => {
                Self::read_reply_from(reader, self.command_timeout).await
            }
            StreamState::Tls(reader) => Self::read_reply_from(reader, self.command_timeout).await,
            StreamState::Detached => {
                Err(DispatchError::Connection("stream is closed".to_string()))
            }
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), DispatchError> {
        let data = format!("{line}\r\n");
        self.write_raw(data.as_bytes()).await
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<(), DispatchError> {
        match &mut self.stream {
            StreamState::Plain(reader) => {
                Self::write_to(reader.get_mut(), data, self.command_timeout).await
            }
            StreamState::Tls(reader) => {
                Self::write_to(reader.get_mut(), data, self.command_timeout).await
            }
            StreamState::Detached => {
                Err(DispatchError::Connection("stream is closed".to_string()))
            }
        }
    }

    async fn upgrade_tls(&mut self, host: &str) -> Result<(), DispatchError> {
        if self.is_tls() {
            return Ok(());
        }

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let connector = tokio_rustls::TlsConnector::from(Arc::new(tls_config));
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|_| DispatchError::Tls(format!("invalid server name: {host}")))?;

        let tcp = match std::mem::replace(&mut self.stream, StreamState::Detached) {
            StreamState::Plain(reader) => reader.into_inner(),
            other => {
                self.stream = other;
                return Err(DispatchError::Tls("stream not in plain state".to_string()));
            }
        };

        let tls_stream = timeout(Duration::from_secs(30), connector.connect(server_name, tcp))
            .await
            .map_err(|_| DispatchError::Timeout("TLS handshake timed out".to_string()))?
            .map_err(|e| DispatchError::Tls(format!("TLS handshake failed: {e}")))?;

        self.stream = StreamState::Tls(BufReader::new(tls_stream));
        Ok(())
    }

    fn is_tls(&self) -> bool {
        matches!(self.stream, StreamState::Tls(_))
    }

    async fn close(&mut self) -> Result<(), DispatchError> {
        match std::mem::replace(&mut self.stream, StreamState::Detached) {
            StreamState::Plain(reader) => {
                let mut stream = reader.into_inner();
                let _ = stream.shutdown().await;
            }
            StreamState::Tls(reader) => {
                let mut stream = reader.into_inner();
                let _ = stream.shutdown().await;
            }
            StreamState::Detached => {}
        }
        Ok(())
    }
}
