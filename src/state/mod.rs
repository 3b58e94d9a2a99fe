//! Session state for the input → preview → success flow.
//!
//! The session is a plain value with pure transition methods: each returns a
//! new `Session` rather than mutating shared state. The successful-send
//! transition consumes the draft, so a draft can be sent at most once per
//! generation.

use crate::draft::Draft;

/// The view currently presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Form plus, once a draft exists, the preview.
    #[default]
    Input,
    /// Confirmation after a successful send.
    Success,
}

/// Everything carried between render passes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    /// Current view.
    pub view: View,
    /// The working draft, if one has been generated.
    pub draft: Option<Draft>,
    /// Recipient of the last successful dispatch.
    pub last_recipient: Option<String>,
    /// Whether the success confirmation has already been celebrated.
    pub confirmation_shown: bool,
}

impl Session {
    /// Fresh session in the input view.
    pub fn new() -> Self {
        Self::default()
    }

    /// A draft was generated (or regenerated): store it, stay in Input.
    pub fn generated(self, draft: Draft) -> Self {
        Self {
            draft: Some(draft),
            ..self
        }
    }

    /// The user edited the draft in the preview.
    pub fn edited(self, subject: String, body: String) -> Self {
        Self {
            draft: Some(Draft { subject, body }),
            ..self
        }
    }

    /// Dispatch succeeded: consume the draft, record the recipient, move to
    /// the success view.
    pub fn sent(self, recipient: String) -> Self {
        Self {
            view: View::Success,
            draft: None,
            last_recipient: Some(recipient),
            confirmation_shown: false,
        }
    }

    /// The success confirmation has been shown once.
    pub fn confirmed(self) -> Self {
        Self {
            confirmation_shown: true,
            ..self
        }
    }

    /// Reset to a fresh input session.
    pub fn reset(self) -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Draft {
        Draft {
            subject: "s".into(),
            body: "b".into(),
        }
    }

    #[test]
    fn initial_state_is_input() {
        let session = Session::new();
        assert_eq!(session.view, View::Input);
        assert!(session.draft.is_none());
        assert!(session.last_recipient.is_none());
    }

    #[test]
    fn sent_consumes_draft_and_records_recipient() {
        let session = Session::new().generated(draft()).sent("bob@x.com".into());
        assert_eq!(session.view, View::Success);
        assert!(session.draft.is_none());
        assert_eq!(session.last_recipient.as_deref(), Some("bob@x.com"));
        assert!(!session.confirmation_shown);
    }

    #[test]
    fn edit_replaces_draft_in_place() {
        let session = Session::new()
            .generated(draft())
            .edited("new subject".into(), "new body".into());
        let draft = session.draft.unwrap();
        assert_eq!(draft.subject, "new subject");
        assert_eq!(draft.body, "new body");
    }

    #[test]
    fn reset_clears_everything() {
        let session = Session::new()
            .generated(draft())
            .sent("bob@x.com".into())
            .confirmed()
            .reset();
        assert_eq!(session, Session::new());
    }

    #[test]
    fn regeneration_replaces_the_old_draft() {
        let session = Session::new().generated(draft()).generated(Draft {
            subject: "second".into(),
            body: "draft".into(),
        });
        assert_eq!(session.draft.unwrap().subject, "second");
    }
}
