//! SMTP commands, replies, and capability parsing (RFC 5321 subset).

use std::fmt;

use crate::error::DispatchError;

/// SMTP commands this client issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Extended HELLO with client identity.
    Ehlo(String),
    /// Start TLS negotiation.
    StartTls,
    /// Begin authentication.
    Auth {
        /// Mechanism name (LOGIN, PLAIN).
        mechanism: String,
        /// Optional initial response (base64).
        initial_response: Option<String>,
    },
    /// MAIL FROM command.
    MailFrom {
        /// Sender reverse-path, already bracketed.
        address: String,
    },
    /// RCPT TO command.
    RcptTo {
        /// Recipient forward-path, already bracketed.
        address: String,
    },
    /// DATA command.
    Data,
    /// Close the connection.
    Quit,
}

impl Command {
    /// Formats the command line without the trailing CRLF.
    pub fn to_wire(&self) -> String {
        match self {
            Command::Ehlo(domain) => format!("EHLO {domain}"),
            Command::StartTls => "STARTTLS".to_string(),
            Command::Auth {
                mechanism,
                initial_response,
            } => match initial_response {
                Some(response) => format!("AUTH {mechanism} {response}"),
                None => format!("AUTH {mechanism}"),
            },
            Command::MailFrom { address } => format!("MAIL FROM:{address}"),
            Command::RcptTo { address } => format!("RCPT TO:{address}"),
            Command::Data => "DATA".to_string(),
            Command::Quit => "QUIT".to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// A parsed server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Three-digit status code.
    pub code: u16,
    /// Message lines, one per reply line.
    pub lines: Vec<String>,
}

impl Reply {
    /// Builds a reply directly (used by tests and mocks).
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![message.into()],
        }
    }

    /// Parses a reply from raw lines as read off the wire.
    pub fn parse(raw: &[String]) -> Result<Self, DispatchError> {
        if raw.is_empty() {
            return Err(DispatchError::Protocol("empty reply".to_string()));
        }

        let mut code = 0u16;
        let mut lines = Vec::with_capacity(raw.len());

        for (i, line) in raw.iter().enumerate() {
            // get() rather than indexing: a multibyte character straddling
            // the boundary must be a protocol error, not a panic.
            let parsed: u16 = line
                .get(..3)
                .and_then(|digits| digits.parse().ok())
                .ok_or_else(|| DispatchError::Protocol(format!("invalid reply code: {line}")))?;
            if i == 0 {
                code = parsed;
            } else if parsed != code {
                return Err(DispatchError::Protocol(
                    "inconsistent codes in multiline reply".to_string(),
                ));
            }
            lines.push(line.get(4..).unwrap_or("").to_string());
        }

        Ok(Self { code, lines })
    }

    /// True for 2xx replies.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// All message lines joined.
    pub fn message(&self) -> String {
        self.lines.join(" ")
    }

    /// Converts a non-success reply into the matching error kind.
    pub fn into_error(self) -> DispatchError {
        let message = self.message();
        match self.code {
            codes::AUTH_FAILED | codes::AUTH_REQUIRED => DispatchError::Authentication {
                code: self.code,
                message,
            },
            _ => DispatchError::Rejected {
                code: self.code,
                message,
            },
        }
    }
}

/// Reply codes this client distinguishes.
pub mod codes {
    /// Service ready (greeting, STARTTLS go-ahead).
    pub const SERVICE_READY: u16 = 220;
    /// Requested action completed.
    pub const OK: u16 = 250;
    /// Authentication succeeded.
    pub const AUTH_SUCCESS: u16 = 235;
    /// Server expects more authentication data.
    pub const AUTH_CONTINUE: u16 = 334;
    /// Start mail input.
    pub const START_MAIL_INPUT: u16 = 354;
    /// Authentication required.
    pub const AUTH_REQUIRED: u16 = 530;
    /// Authentication credentials invalid.
    pub const AUTH_FAILED: u16 = 535;
}

/// The subset of EHLO capabilities the dispatcher cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// STARTTLS advertised.
    pub starttls: bool,
    /// AUTH LOGIN advertised.
    pub auth_login: bool,
    /// AUTH PLAIN advertised.
    pub auth_plain: bool,
}

impl Capabilities {
    /// Scans an EHLO reply for the supported extensions.
    pub fn from_ehlo(reply: &Reply) -> Self {
        let mut caps = Self::default();
        for line in &reply.lines {
            let line = line.trim().to_uppercase();
            if line == "STARTTLS" {
                caps.starttls = true;
            } else if let Some(mechs) = line.strip_prefix("AUTH ") {
                for mech in mechs.split_whitespace() {
                    match mech {
                        "LOGIN" => caps.auth_login = true,
                        "PLAIN" => caps.auth_plain = true,
                        _ => {}
                    }
                }
            }
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_formatting() {
        assert_eq!(Command::Ehlo("localhost".into()).to_wire(), "EHLO localhost");
        assert_eq!(Command::StartTls.to_wire(), "STARTTLS");
        assert_eq!(
            Command::MailFrom {
                address: "<a@x.com>".into()
            }
            .to_wire(),
            "MAIL FROM:<a@x.com>"
        );
        assert_eq!(
            Command::Auth {
                mechanism: "LOGIN".into(),
                initial_response: None
            }
            .to_wire(),
            "AUTH LOGIN"
        );
        assert_eq!(
            Command::Auth {
                mechanism: "PLAIN".into(),
                initial_response: Some("AGEAYg==".into())
            }
            .to_wire(),
            "AUTH PLAIN AGEAYg=="
        );
    }

    #[test]
    fn reply_parse_single_line() {
        let reply = Reply::parse(&["250 OK".to_string()]).unwrap();
        assert_eq!(reply.code, 250);
        assert!(reply.is_success());
        assert_eq!(reply.message(), "OK");
    }

    #[test]
    fn reply_parse_multiline() {
        let raw = vec![
            "250-smtp.gmail.com at your service".to_string(),
            "250-STARTTLS".to_string(),
            "250 AUTH LOGIN PLAIN".to_string(),
        ];
        let reply = Reply::parse(&raw).unwrap();
        assert_eq!(reply.code, 250);
        assert_eq!(reply.lines.len(), 3);

        let caps = Capabilities::from_ehlo(&reply);
        assert!(caps.starttls);
        assert!(caps.auth_login);
        assert!(caps.auth_plain);
    }

    #[test]
    fn reply_parse_rejects_garbage() {
        assert!(Reply::parse(&[]).is_err());
        assert!(Reply::parse(&["xx".to_string()]).is_err());
        assert!(Reply::parse(&["abc hello".to_string()]).is_err());
    }

    #[test]
    fn reply_parse_rejects_multibyte_code_without_panicking() {
        // A two-byte character straddling the code boundary.
        let result = Reply::parse(&["25\u{e9} oops".to_string()]);
        assert!(matches!(result, Err(DispatchError::Protocol(_))));

        let result = Reply::parse(&["\u{1f4e7}".to_string()]);
        assert!(matches!(result, Err(DispatchError::Protocol(_))));
    }

    #[test]
    fn auth_failure_maps_to_authentication_error() {
        let reply = Reply::new(535, "5.7.8 Username and Password not accepted");
        match reply.into_error() {
            DispatchError::Authentication { code, .. } => assert_eq!(code, 535),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn other_failure_maps_to_rejection() {
        let reply = Reply::new(550, "mailbox unavailable");
        match reply.into_error() {
            DispatchError::Rejected { code, .. } => assert_eq!(code, 550),
            other => panic!("unexpected error: {other}"),
        }
    }
}
