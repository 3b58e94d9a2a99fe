//! # draftmail
//!
//! Console tool that drafts an email with the Gemini API and sends it over
//! SMTP.
//!
//! The flow mirrors a three-view form application: collect the parameters
//! (names, addresses, topic, tone, length), generate a subject and body with
//! two sequential `generateContent` calls, let the user edit the draft, then
//! submit it to the configured SMTP server over STARTTLS.
//!
//! ## Module organization
//!
//! - `config` - configuration and environment loading
//! - `error` - error taxonomy (generation vs. dispatch)
//! - `transport` - HTTP transport seam for the generation client
//! - `gemini` - Gemini `generateContent` client
//! - `draft` - request fields, prompt templates, draft generation
//! - `smtp` - SMTP dispatcher (protocol, stream, message assembly)
//! - `state` - session state machine with pure transitions
//! - `app` - orchestration of the three views
//! - `ui` - console front-end
//! - `mocks` - test doubles, shared with the integration tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod app;
pub mod config;
pub mod draft;
pub mod error;
pub mod gemini;
pub mod mocks;
pub mod smtp;
pub mod state;
pub mod transport;
pub mod ui;

pub use app::{App, SendError, SubmitError};
pub use config::{AppConfig, AppConfigBuilder};
pub use draft::{Draft, DraftGenerator, EmailRequest, Length, Tone};
pub use error::{AppError, AppResult, ConfigError, DispatchError, GenerationError};
pub use gemini::{GeminiClient, TextGenerator};
pub use smtp::{Address, MailDispatch, Mailer, OutgoingEmail, Receipt};
pub use state::{Session, View};
pub use transport::{HttpTransport, ReqwestTransport, TransportError};
