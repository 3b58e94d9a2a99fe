//! Email request, prompt templates, and draft generation.
//!
//! The draft generator issues two sequential generation calls, one for the
//! subject and one for the body. A [`Draft`] is produced only when both
//! succeed; a failure in either call discards the whole attempt so session
//! state is never left with half a draft.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::GenerationError;
use crate::gemini::TextGenerator;

/// Tone of the generated email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    /// Business-appropriate but approachable.
    #[default]
    Professional,
    /// Strictly formal.
    Formal,
    /// Relaxed and friendly.
    Casual,
}

impl Tone {
    /// All selectable tones, in display order.
    pub const ALL: [Tone; 3] = [Tone::Professional, Tone::Formal, Tone::Casual];
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tone::Professional => "Professional",
            Tone::Formal => "Formal",
            Tone::Casual => "Casual",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "professional" => Ok(Tone::Professional),
            "formal" => Ok(Tone::Formal),
            "casual" => Ok(Tone::Casual),
            other => Err(format!("unknown tone: {other}")),
        }
    }
}

/// Requested length of the generated body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Length {
    /// A few sentences.
    #[default]
    Short,
    /// A couple of paragraphs.
    Medium,
    /// A full-length message.
    Long,
}

impl Length {
    /// All selectable lengths, in display order.
    pub const ALL: [Length; 3] = [Length::Short, Length::Medium, Length::Long];
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Length::Short => "Short",
            Length::Medium => "Medium",
            Length::Long => "Long",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Length {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Ok(Length::Short),
            "medium" => Ok(Length::Medium),
            "long" => Ok(Length::Long),
            other => Err(format!("unknown length: {other}")),
        }
    }
}

/// The parameters collected from the form. Immutable once generation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    /// Sender display name.
    pub sender_name: String,
    /// Sender address; also the SMTP login user.
    pub sender_email: String,
    /// Recipient display name.
    pub recipient_name: String,
    /// Recipient address.
    pub recipient_email: String,
    /// Free-text description of what the email is about.
    pub topic: String,
    /// Tone selection.
    pub tone: Tone,
    /// Length selection.
    pub length: Length,
}

impl EmailRequest {
    /// Checks that every required field is non-empty. Returns the names of
    /// the missing fields otherwise.
    pub fn validate(&self) -> Result<(), Vec<&'static str>> {
        let mut missing = Vec::new();
        if self.sender_name.is_empty() {
            missing.push("sender name");
        }
        if self.sender_email.is_empty() {
            missing.push("sender email");
        }
        if self.recipient_name.is_empty() {
            missing.push("recipient name");
        }
        if self.recipient_email.is_empty() {
            missing.push("recipient email");
        }
        if self.topic.is_empty() {
            missing.push("topic");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }

    /// Prompt for the subject line.
    pub fn subject_prompt(&self) -> String {
        format!(
            "Write one short, catchy email subject for: {}. Tone: {}. \
             Return only the subject text.",
            self.topic, self.tone
        )
    }

    /// Prompt for the body.
    pub fn body_prompt(&self) -> String {
        format!(
            "Write a {} email body. Topic: {}. Tone: {}. From: {}. To: {}. \
             Do not include a subject line.",
            self.length, self.topic, self.tone, self.sender_name, self.recipient_name
        )
    }
}

/// A generated draft. Editable by the user before dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Generates drafts from an [`EmailRequest`] via a [`TextGenerator`].
pub struct DraftGenerator {
    generator: Arc<dyn TextGenerator>,
}

impl DraftGenerator {
    /// Create a draft generator over the given text generator.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Generates subject and body with two sequential calls.
    ///
    /// Either both calls succeed and a complete draft is returned, or the
    /// first error is propagated and nothing is kept.
    pub async fn generate(&self, request: &EmailRequest) -> Result<Draft, GenerationError> {
        tracing::info!(topic = %request.topic, tone = %request.tone, "generating draft");

        let subject = self
            .generator
            .generate_text(&request.subject_prompt())
            .await?;
        let body = self.generator.generate_text(&request.body_prompt()).await?;

        Ok(Draft { subject, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EmailRequest {
        EmailRequest {
            sender_name: "Alice".into(),
            sender_email: "alice@x.com".into(),
            recipient_name: "Bob".into(),
            recipient_email: "bob@x.com".into(),
            topic: "project update".into(),
            tone: Tone::Professional,
            length: Length::Short,
        }
    }

    #[test]
    fn complete_request_validates() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn missing_fields_are_named() {
        let mut req = request();
        req.sender_email.clear();
        req.topic.clear();
        let missing = req.validate().unwrap_err();
        assert_eq!(missing, vec!["sender email", "topic"]);
    }

    #[test]
    fn subject_prompt_mentions_topic_and_tone() {
        let prompt = request().subject_prompt();
        assert!(prompt.contains("project update"));
        assert!(prompt.contains("Professional"));
    }

    #[test]
    fn body_prompt_mentions_all_parameters() {
        let prompt = request().body_prompt();
        assert!(prompt.contains("Short"));
        assert!(prompt.contains("project update"));
        assert!(prompt.contains("Professional"));
        assert!(prompt.contains("Alice"));
        assert!(prompt.contains("Bob"));
    }

    #[test]
    fn tone_and_length_round_trip() {
        for tone in Tone::ALL {
            assert_eq!(tone.to_string().parse::<Tone>().unwrap(), tone);
        }
        for length in Length::ALL {
            assert_eq!(length.to_string().parse::<Length>().unwrap(), length);
        }
        assert!("breezy".parse::<Tone>().is_err());
    }
}
