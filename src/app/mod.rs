//! Application orchestration: form submission, draft generation, dispatch,
//! and reset, over the pure session state.

use std::sync::Arc;

use thiserror::Error;

use crate::draft::{Draft, DraftGenerator, EmailRequest};
use crate::error::{DispatchError, GenerationError};
use crate::smtp::{Address, MailDispatch, OutgoingEmail, Receipt};
use crate::state::{Session, View};

/// Why a form submission did not produce a draft.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// One or more required fields were empty. State is unchanged.
    #[error("please fill in all fields (missing: {})", .0.join(", "))]
    Incomplete(Vec<&'static str>),

    /// The generation service failed. State is unchanged.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Why a send did not complete.
#[derive(Error, Debug)]
pub enum SendError {
    /// There is no draft; generate one first.
    #[error("no draft to send")]
    NoDraft,

    /// The mail transport failed. The draft is kept for retry.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// The application: wires the form, the draft generator, and the dispatcher
/// together over a [`Session`].
pub struct App {
    drafter: DraftGenerator,
    dispatcher: Arc<dyn MailDispatch>,
    session: Session,
    request: Option<EmailRequest>,
}

impl App {
    /// Create an application over the given collaborators.
    pub fn new(drafter: DraftGenerator, dispatcher: Arc<dyn MailDispatch>) -> Self {
        Self {
            drafter,
            dispatcher,
            session: Session::new(),
            request: None,
        }
    }

    /// Current session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The working draft, if any.
    pub fn draft(&self) -> Option<&Draft> {
        self.session.draft.as_ref()
    }

    /// The request the current draft was generated from, if any.
    pub fn request(&self) -> Option<&EmailRequest> {
        self.request.as_ref()
    }

    /// Form submission: validate, then generate a draft.
    ///
    /// On any failure the session is left exactly as it was.
    pub async fn submit(&mut self, request: EmailRequest) -> Result<(), SubmitError> {
        request.validate().map_err(SubmitError::Incomplete)?;

        let draft = self.drafter.generate(&request).await?;
        self.session = std::mem::take(&mut self.session).generated(draft);
        self.request = Some(request);
        Ok(())
    }

    /// Replace the draft's subject and body with the user's edits.
    pub fn update_draft(&mut self, subject: String, body: String) {
        if self.session.draft.is_some() {
            self.session = std::mem::take(&mut self.session).edited(subject, body);
        }
    }

    /// Send the current draft.
    ///
    /// On success the draft is consumed and the session moves to the Success
    /// view; on failure the session (draft included) is unchanged so the user
    /// can retry.
    pub async fn send(&mut self) -> Result<Receipt, SendError> {
        let (draft, request) = match (self.session.draft.as_ref(), self.request.as_ref()) {
            (Some(draft), Some(request)) => (draft, request),
            _ => return Err(SendError::NoDraft),
        };

        let email = OutgoingEmail {
            from: Address::with_name(request.sender_name.clone(), request.sender_email.clone()),
            to: Address::with_name(request.recipient_name.clone(), request.recipient_email.clone()),
            subject: draft.subject.clone(),
            body: draft.body.clone(),
        };

        let receipt = self.dispatcher.dispatch(&email).await?;
        self.session = std::mem::take(&mut self.session).sent(receipt.recipient.clone());
        Ok(receipt)
    }

    /// Mark the success confirmation as shown.
    pub fn confirm(&mut self) {
        self.session = std::mem::take(&mut self.session).confirmed();
    }

    /// Back to a fresh input view; draft and recipient are discarded.
    pub fn reset(&mut self) {
        self.session = std::mem::take(&mut self.session).reset();
        self.request = None;
    }

    /// Convenience for the view layer.
    pub fn view(&self) -> View {
        self.session.view
    }
}
