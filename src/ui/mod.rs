//! Console front-end: the input form, the preview with in-place editing,
//! and the success view.

use std::fmt::Display;
use std::io;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::app::{App, SendError, SubmitError};
use crate::draft::{EmailRequest, Length, Tone};
use crate::state::View;

/// Interactive console session.
pub struct Console {
    lines: Lines<BufReader<Stdin>>,
}

impl Console {
    /// Console over stdin.
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Runs the input → preview → success loop until the user exits.
    pub async fn run(&mut self, app: &mut App) -> io::Result<()> {
        println!("draftmail - AI email generator");

        loop {
            match app.view() {
                View::Input => {
                    if !self.input_view(app).await? {
                        return Ok(());
                    }
                }
                View::Success => {
                    if !self.success_view(app).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// The form plus preview. Returns false when the user wants to quit.
    async fn input_view(&mut self, app: &mut App) -> io::Result<bool> {
        println!();
        println!("--- New email ---");

        let request = EmailRequest {
            sender_name: self.prompt("Your name").await?,
            sender_email: self.prompt("Your email").await?,
            recipient_name: self.prompt("Recipient name").await?,
            recipient_email: self.prompt("Recipient email").await?,
            tone: self.select("Tone", &Tone::ALL).await?,
            length: self.select("Length", &Length::ALL).await?,
            topic: self.prompt("What is the email about?").await?,
        };

        println!("Generating subject and body...");
        match app.submit(request).await {
            Ok(()) => {}
            Err(SubmitError::Incomplete(_missing)) => {
                println!("Please fill in all fields.");
                return Ok(true);
            }
            Err(SubmitError::Generation(e)) => {
                println!("AI generation error: {e}");
                return Ok(true);
            }
        }
        println!("Email generated!");

        self.preview(app).await
    }

    /// Preview and send. Returns false when the user wants to quit.
    async fn preview(&mut self, app: &mut App) -> io::Result<bool> {
        loop {
            let Some(draft) = app.draft() else {
                return Ok(true);
            };

            println!();
            println!("--- Preview ---");
            println!("Subject: {}", draft.subject);
            println!();
            println!("{}", draft.body);
            println!();

            let choice = self
                .prompt("[s]end, [e]dit, [d]iscard and start over, [q]uit")
                .await?;
            match choice.trim().to_ascii_lowercase().as_str() {
                "s" | "send" => {
                    println!("Connecting to mail server...");
                    match app.send().await {
                        Ok(_) => return Ok(true),
                        Err(SendError::NoDraft) => return Ok(true),
                        Err(SendError::Dispatch(e)) => {
                            println!("Failed to send email: {e}");
                            // Draft is kept; the user can retry or edit.
                        }
                    }
                }
                "e" | "edit" => self.edit(app).await?,
                "d" | "discard" => {
                    app.reset();
                    return Ok(true);
                }
                "q" | "quit" => return Ok(false),
                _ => println!("Unrecognized choice."),
            }
        }
    }

    /// In-place subject/body edit.
    async fn edit(&mut self, app: &mut App) -> io::Result<()> {
        let Some(draft) = app.draft() else {
            return Ok(());
        };
        let current_subject = draft.subject.clone();
        let current_body = draft.body.clone();

        let subject = self
            .prompt(&format!("Subject [{current_subject}] (empty keeps it)"))
            .await?;
        let subject = if subject.is_empty() {
            current_subject
        } else {
            subject
        };

        println!("Body (finish with a single '.' on its own line; empty body keeps it):");
        let mut body_lines = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line.trim() == "." {
                break;
            }
            body_lines.push(line);
        }
        let body = if body_lines.is_empty() {
            current_body
        } else {
            body_lines.join("\n")
        };

        app.update_draft(subject, body);
        Ok(())
    }

    /// The confirmation view. Returns false when the user wants to exit.
    async fn success_view(&mut self, app: &mut App) -> io::Result<bool> {
        if !app.session().confirmation_shown {
            let recipient = app
                .session()
                .last_recipient
                .clone()
                .unwrap_or_default();
            println!();
            println!("Email sent successfully to {recipient}!");
            app.confirm();
        }

        let choice = self.prompt("[a] send another, [x] exit").await?;
        match choice.trim().to_ascii_lowercase().as_str() {
            "a" | "another" => {
                app.reset();
                Ok(true)
            }
            "x" | "exit" => {
                println!("Bye.");
                Ok(false)
            }
            _ => {
                println!("Unrecognized choice.");
                Ok(true)
            }
        }
    }

    async fn prompt(&mut self, label: &str) -> io::Result<String> {
        use std::io::Write;
        print!("{label}: ");
        std::io::stdout().flush()?;
        self.read_line().await
    }

    async fn read_line(&mut self) -> io::Result<String> {
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed",
            )),
        }
    }

    /// Numbered picker; empty input selects the first option.
    async fn select<T: Copy + Display>(&mut self, label: &str, options: &[T]) -> io::Result<T> {
        loop {
            let menu: Vec<String> = options
                .iter()
                .enumerate()
                .map(|(i, o)| format!("{}={o}", i + 1))
                .collect();
            let answer = self.prompt(&format!("{label} ({})", menu.join(", "))).await?;

            if answer.is_empty() {
                return Ok(options[0]);
            }
            if let Ok(index) = answer.parse::<usize>() {
                if (1..=options.len()).contains(&index) {
                    return Ok(options[index - 1]);
                }
            }
            println!("Pick a number between 1 and {}.", options.len());
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
