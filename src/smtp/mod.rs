//! SMTP dispatcher.
//!
//! [`Mailer`] drives a single submission transaction: greeting, EHLO,
//! STARTTLS upgrade, EHLO again, AUTH (LOGIN preferred, PLAIN fallback),
//! MAIL FROM, RCPT TO, DATA, QUIT. The connection is a scoped resource:
//! it is always closed, whether the transaction succeeds or not.

pub mod message;
pub mod protocol;
pub mod transport;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::ExposeSecret;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::DispatchError;

pub use message::{prepare_data, Address, OutgoingEmail};
pub use protocol::{codes, Capabilities, Command, Reply};
pub use transport::{SmtpStream, TcpSmtpStream};

/// Proof that the server accepted the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// The recipient address the message was accepted for.
    pub recipient: String,
    /// The server's final reply text.
    pub server_reply: String,
}

/// Anything that can deliver an [`OutgoingEmail`].
#[async_trait]
pub trait MailDispatch: Send + Sync {
    /// Delivers the message, returning a receipt on acceptance.
    async fn dispatch(&self, email: &OutgoingEmail) -> Result<Receipt, DispatchError>;
}

/// STARTTLS submission client.
pub struct Mailer {
    config: Arc<AppConfig>,
}

impl Mailer {
    /// Create a mailer for the configured server.
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// Connects, runs the transaction, and always closes the stream.
    pub async fn send(&self, email: &OutgoingEmail) -> Result<Receipt, DispatchError> {
        let address = self.config.smtp_address();
        tracing::info!(server = %address, to = %email.to.email, "dispatching email");

        let mut stream = TcpSmtpStream::connect(
            &address,
            self.config.connect_timeout,
            self.config.command_timeout,
        )
        .await?;

        let result = self.transact(&mut stream, email).await;

        // Best-effort QUIT; the socket is torn down either way.
        let _ = stream.write_line(&Command::Quit.to_wire()).await;
        let _ = stream.close().await;

        match &result {
            Ok(receipt) => {
                tracing::info!(recipient = %receipt.recipient, "message accepted")
            }
            Err(e) => tracing::warn!(error = %e, "dispatch failed"),
        }
        result
    }

    /// Runs the full transaction over any [`SmtpStream`].
    ///
    /// Exposed so tests can drive it with a scripted stream; the caller owns
    /// closing the stream.
    pub async fn transact<S: SmtpStream>(
        &self,
        stream: &mut S,
        email: &OutgoingEmail,
    ) -> Result<Receipt, DispatchError> {
        // Server greeting.
        let greeting = stream.read_reply().await?;
        if greeting.code != codes::SERVICE_READY {
            return Err(greeting.into_error());
        }

        let caps = self.ehlo(stream).await?;
        if !caps.starttls {
            return Err(DispatchError::Protocol(
                "server does not offer STARTTLS".to_string(),
            ));
        }

        let reply = self.command(stream, &Command::StartTls).await?;
        if reply.code != codes::SERVICE_READY {
            return Err(reply.into_error());
        }
        stream.upgrade_tls(&self.config.smtp_host).await?;

        // Capabilities can change after the TLS upgrade.
        let caps = self.ehlo(stream).await?;
        self.authenticate(stream, &caps, &email.from.email).await?;

        let reply = self
            .command(
                stream,
                &Command::MailFrom {
                    address: email.from.to_smtp(),
                },
            )
            .await?;
        if reply.code != codes::OK {
            return Err(reply.into_error());
        }

        let reply = self
            .command(
                stream,
                &Command::RcptTo {
                    address: email.to.to_smtp(),
                },
            )
            .await?;
        if reply.code != codes::OK {
            return Err(reply.into_error());
        }

        let reply = self.command(stream, &Command::Data).await?;
        if reply.code != codes::START_MAIL_INPUT {
            return Err(reply.into_error());
        }

        let domain = email.from.email.split('@').nth(1).unwrap_or("localhost");
        let payload = prepare_data(&email.render(domain));
        stream.write_raw(&payload).await?;

        let reply = stream.read_reply().await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }

        Ok(Receipt {
            recipient: email.to.email.clone(),
            server_reply: reply.message(),
        })
    }

    async fn command<S: SmtpStream>(
        &self,
        stream: &mut S,
        command: &Command,
    ) -> Result<Reply, DispatchError> {
        stream.write_line(&command.to_wire()).await?;
        stream.read_reply().await
    }

    async fn ehlo<S: SmtpStream>(&self, stream: &mut S) -> Result<Capabilities, DispatchError> {
        let reply = self
            .command(stream, &Command::Ehlo(self.config.client_id.clone()))
            .await?;
        if !reply.is_success() {
            return Err(reply.into_error());
        }
        Ok(Capabilities::from_ehlo(&reply))
    }

    async fn authenticate<S: SmtpStream>(
        &self,
        stream: &mut S,
        caps: &Capabilities,
        username: &str,
    ) -> Result<(), DispatchError> {
        let password = self.config.mail_password.expose_secret();

        if caps.auth_login {
            let reply = self
                .command(
                    stream,
                    &Command::Auth {
                        mechanism: "LOGIN".to_string(),
                        initial_response: None,
                    },
                )
                .await?;
            if reply.code != codes::AUTH_CONTINUE {
                return Err(reply.into_error());
            }

            stream.write_line(&BASE64.encode(username)).await?;
            let reply = stream.read_reply().await?;
            if reply.code != codes::AUTH_CONTINUE {
                return Err(reply.into_error());
            }

            stream.write_line(&BASE64.encode(password)).await?;
            let reply = stream.read_reply().await?;
            if reply.code != codes::AUTH_SUCCESS {
                return Err(reply.into_error());
            }
            Ok(())
        } else if caps.auth_plain {
            let initial = BASE64.encode(format!("\0{username}\0{password}"));
            let reply = self
                .command(
                    stream,
                    &Command::Auth {
                        mechanism: "PLAIN".to_string(),
                        initial_response: Some(initial),
                    },
                )
                .await?;
            if reply.code != codes::AUTH_SUCCESS {
                return Err(reply.into_error());
            }
            Ok(())
        } else {
            Err(DispatchError::Protocol(
                "server offers no supported auth mechanism".to_string(),
            ))
        }
    }
}

#[async_trait]
impl MailDispatch for Mailer {
    async fn dispatch(&self, email: &OutgoingEmail) -> Result<Receipt, DispatchError> {
        self.send(email).await
    }
}
