//! Test doubles for the transport, generation, and dispatch seams.
//!
//! These are compiled into the crate (not behind `cfg(test)`) so the
//! integration tests under `tests/` can use them, mirroring how the rest of
//! the test suite is structured.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{DispatchError, GenerationError};
use crate::gemini::TextGenerator;
use crate::smtp::protocol::Reply;
use crate::smtp::transport::SmtpStream;
use crate::smtp::{MailDispatch, OutgoingEmail, Receipt};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Mock HTTP transport with enqueued responses and request capture.
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttpTransport {
    /// New empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a response for the next request.
    pub fn enqueue_response(&self, response: Result<HttpResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    /// Enqueue a JSON response with the given status.
    pub fn enqueue_json(&self, status: u16, body: &str) {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        self.enqueue_response(Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }));
    }

    /// Enqueue a transport error.
    pub fn enqueue_error(&self, error: TransportError) {
        self.enqueue_response(Err(error));
    }

    /// All captured requests.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("no response enqueued".to_string())))
    }
}

/// Text generator that replays a queue of canned results and records prompts.
#[derive(Default)]
pub struct FixedGenerator {
    outputs: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FixedGenerator {
    /// New empty generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator that answers with the given strings, in order.
    pub fn with_outputs<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let this = Self::new();
        for output in outputs {
            this.enqueue_ok(output);
        }
        this
    }

    /// Enqueue a successful output.
    pub fn enqueue_ok(&self, output: impl Into<String>) {
        self.outputs.lock().unwrap().push_back(Ok(output.into()));
    }

    /// Enqueue a failure.
    pub fn enqueue_err(&self, error: GenerationError) {
        self.outputs.lock().unwrap().push_back(Err(error));
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.outputs.lock().unwrap().pop_front() {
            Some(result) => result.map(|s| s.trim().to_string()),
            None => Err(GenerationError::EmptyResponse),
        }
    }
}

/// Dispatcher that replays canned results and records the emails it saw.
#[derive(Default)]
pub struct MockDispatcher {
    results: Mutex<VecDeque<Result<Receipt, DispatchError>>>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl MockDispatcher {
    /// New mock that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock wrapped in the `Arc<dyn MailDispatch>` the app expects.
    pub fn shared() -> (Arc<Self>, Arc<dyn MailDispatch>) {
        let mock = Arc::new(Self::new());
        let dispatch: Arc<dyn MailDispatch> = mock.clone();
        (mock, dispatch)
    }

    /// Enqueue a failure for the next dispatch.
    pub fn enqueue_err(&self, error: DispatchError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    /// Enqueue an explicit receipt.
    pub fn enqueue_ok(&self, receipt: Receipt) {
        self.results.lock().unwrap().push_back(Ok(receipt));
    }

    /// Emails handed to the dispatcher so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailDispatch for MockDispatcher {
    async fn dispatch(&self, email: &OutgoingEmail) -> Result<Receipt, DispatchError> {
        self.sent.lock().unwrap().push(email.clone());
        match self.results.lock().unwrap().pop_front() {
            Some(result) => result,
            // Default: accept, like a healthy server.
            None => Ok(Receipt {
                recipient: email.to.email.clone(),
                server_reply: "2.0.0 OK".to_string(),
            }),
        }
    }
}

/// Scripted SMTP stream for exercising the transaction logic.
#[derive(Default)]
pub struct ScriptedSmtpStream {
    replies: VecDeque<Reply>,
    /// Every line written (commands and AUTH continuations), in order.
    pub lines: Vec<String>,
    /// Raw payloads written via `write_raw`.
    pub payloads: Vec<Vec<u8>>,
    /// Whether `upgrade_tls` was called.
    pub tls_upgraded: bool,
    /// Whether `close` was called.
    pub closed: bool,
}

impl ScriptedSmtpStream {
    /// Stream that will answer with the given replies, in order.
    pub fn with_replies<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        Self {
            replies: replies.into_iter().collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SmtpStream for ScriptedSmtpStream {
    async fn read_reply(&mut self) -> Result<Reply, DispatchError> {
        self.replies
            .pop_front()
            .ok_or_else(|| DispatchError::Protocol("script exhausted".to_string()))
    }

    async fn write_line(&mut self, line: &str) -> Result<(), DispatchError> {
        self.lines.push(line.to_string());
        Ok(())
    }

    async fn write_raw(&mut self, data: &[u8]) -> Result<(), DispatchError> {
        self.payloads.push(data.to_vec());
        Ok(())
    }

    async fn upgrade_tls(&mut self, _host: &str) -> Result<(), DispatchError> {
        self.tls_upgraded = true;
        Ok(())
    }

    fn is_tls(&self) -> bool {
        self.tls_upgraded
    }

    async fn close(&mut self) -> Result<(), DispatchError> {
        self.closed = true;
        Ok(())
    }
}
