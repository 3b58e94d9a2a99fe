//! Message assembly: addresses, headers, and DATA payload preparation.
//!
//! Address syntax is deliberately not validated here. The mail server is the
//! authority on what it accepts, and its rejection surfaces as a
//! [`crate::error::DispatchError`].

use std::fmt;

/// An email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name (e.g. "Alice Example").
    pub name: Option<String>,
    /// Address as entered by the user.
    pub email: String,
}

impl Address {
    /// Address without a display name.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Address with a display name.
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Angle-bracketed form for MAIL FROM / RCPT TO.
    pub fn to_smtp(&self) -> String {
        format!("<{}>", self.email)
    }

    /// Header form, quoting the display name when it needs it.
    pub fn to_header(&self) -> String {
        match &self.name {
            Some(name) => {
                if name.contains(|c: char| !c.is_alphanumeric() && c != ' ') {
                    format!("\"{}\" <{}>", name, self.email)
                } else {
                    format!("{} <{}>", name, self.email)
                }
            }
            None => self.email.clone(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_header())
    }
}

/// A complete plain-text message ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    /// Sender; also the SMTP login user.
    pub from: Address,
    /// Single recipient.
    pub to: Address,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl OutgoingEmail {
    /// Renders the RFC 5322 message: header block, blank line, body.
    pub fn render(&self, message_id_domain: &str) -> String {
        let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), message_id_domain);
        let date = chrono::Utc::now().to_rfc2822();

        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", sanitize_header(&self.from.to_header())));
        out.push_str(&format!("To: {}\r\n", sanitize_header(&self.to.to_header())));
        out.push_str(&format!("Subject: {}\r\n", sanitize_header(&self.subject)));
        out.push_str(&format!("Date: {date}\r\n"));
        out.push_str(&format!("Message-ID: {message_id}\r\n"));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        out.push_str("Content-Transfer-Encoding: 8bit\r\n");
        out.push_str("\r\n");
        out.push_str(&normalize_crlf(&self.body));
        out
    }
}

/// Strips CR/LF from a header value so user input cannot inject headers.
fn sanitize_header(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Normalizes bare LF (and stray CR) to CRLF line endings.
fn normalize_crlf(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                out.push_str("\r\n");
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' => out.push_str("\r\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Prepares the DATA payload: dot-stuffing plus the terminating sequence.
pub fn prepare_data(message: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 8);
    for line in message.split_inclusive("\r\n") {
        if line.starts_with('.') {
            out.push(b'.');
        }
        out.extend_from_slice(line.as_bytes());
    }
    if !out.ends_with(b"\r\n") {
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b".\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_header_forms() {
        let plain = Address::new("a@x.com");
        assert_eq!(plain.to_header(), "a@x.com");
        assert_eq!(plain.to_smtp(), "<a@x.com>");

        let named = Address::with_name("Alice Example", "a@x.com");
        assert_eq!(named.to_header(), "Alice Example <a@x.com>");

        let quoted = Address::with_name("Example, Alice", "a@x.com");
        assert_eq!(quoted.to_header(), "\"Example, Alice\" <a@x.com>");
    }

    #[test]
    fn render_contains_required_headers() {
        let email = OutgoingEmail {
            from: Address::new("alice@x.com"),
            to: Address::new("bob@x.com"),
            subject: "Project Update".into(),
            body: "Hi Bob,\n\nHere's the update.\n\nAlice".into(),
        };
        let rendered = email.render("x.com");

        assert!(rendered.starts_with("From: alice@x.com\r\n"));
        assert!(rendered.contains("To: bob@x.com\r\n"));
        assert!(rendered.contains("Subject: Project Update\r\n"));
        assert!(rendered.contains("Message-ID: <"));
        assert!(rendered.contains("\r\n\r\nHi Bob,\r\n\r\nHere's the update.\r\n\r\nAlice"));
    }

    #[test]
    fn header_injection_is_neutralized() {
        let email = OutgoingEmail {
            from: Address::with_name("Alice\r\nBcc: evil@x.com", "a@x.com"),
            to: Address::with_name("Bob\nReply-To: evil@x.com", "b@x.com"),
            subject: "hi\r\nBcc: evil@x.com".into(),
            body: "body".into(),
        };
        let rendered = email.render("x.com");
        assert!(rendered.contains("Subject: hi  Bcc: evil@x.com\r\n"));
        assert!(!rendered.contains("\r\nBcc:"));
        assert!(!rendered.contains("\r\nReply-To:"));
    }

    #[test]
    fn data_payload_is_dot_stuffed_and_terminated() {
        let payload = prepare_data("line one\r\n.hidden\r\nlast");
        let text = String::from_utf8(payload).unwrap();
        assert_eq!(text, "line one\r\n..hidden\r\nlast\r\n.\r\n");
    }

    #[test]
    fn normalize_handles_mixed_line_endings() {
        assert_eq!(normalize_crlf("a\nb\r\nc\rd"), "a\r\nb\r\nc\r\nd");
    }
}
