//! Application configuration.
//!
//! Credentials are read from the environment once at startup
//! (`GEMINI_API_KEY` / `GOOGLE_API_KEY` and `EMAIL_PASSWORD`). A missing
//! credential is not a startup error: the downstream call fails with an
//! authentication error instead, which is surfaced like any other failure.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;

/// Default Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "v1beta";

/// Default generation model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default SMTP host.
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Default SMTP port (submission with STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default connect timeout in seconds (HTTP and SMTP).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default per-command SMTP timeout in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// Configuration for the whole application.
#[derive(Clone)]
pub struct AppConfig {
    /// Gemini API key.
    pub api_key: SecretString,
    /// Mail account password or app password.
    pub mail_password: SecretString,
    /// Base URL for the generation API.
    pub base_url: Url,
    /// Generation API version.
    pub api_version: String,
    /// Generation model identifier.
    pub model: String,
    /// SMTP server host.
    pub smtp_host: String,
    /// SMTP server port.
    pub smtp_port: u16,
    /// Hostname announced in EHLO.
    pub client_id: String,
    /// HTTP request timeout.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Per-command SMTP timeout.
    pub command_timeout: Duration,
}

impl AppConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .unwrap_or_default();
        let mail_password = std::env::var("EMAIL_PASSWORD").unwrap_or_default();

        let mut builder = Self::builder()
            .api_key(SecretString::new(api_key))
            .mail_password(SecretString::new(mail_password));

        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            builder = builder.base_url(&base_url)?;
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            builder = builder.model(&model);
        }

        builder.build()
    }

    /// Address string for the SMTP connection.
    pub fn smtp_address(&self) -> String {
        format!("{}:{}", self.smtp_host, self.smtp_port)
    }
}

/// Builder for [`AppConfig`].
#[derive(Default)]
pub struct AppConfigBuilder {
    api_key: Option<SecretString>,
    mail_password: Option<SecretString>,
    base_url: Option<Url>,
    api_version: Option<String>,
    model: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    client_id: Option<String>,
    request_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    command_timeout: Option<Duration>,
}

impl AppConfigBuilder {
    /// Set the Gemini API key.
    pub fn api_key(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Set the mail password.
    pub fn mail_password(mut self, password: SecretString) -> Self {
        self.mail_password = Some(password);
        self
    }

    /// Set the generation API base URL.
    pub fn base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Set the generation API version.
    pub fn api_version(mut self, version: &str) -> Self {
        self.api_version = Some(version.to_string());
        self
    }

    /// Set the generation model.
    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    /// Set the SMTP host.
    pub fn smtp_host(mut self, host: &str) -> Self {
        self.smtp_host = Some(host.to_string());
        self
    }

    /// Set the SMTP port.
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.smtp_port = Some(port);
        self
    }

    /// Set the EHLO client identity.
    pub fn client_id(mut self, id: &str) -> Self {
        self.client_id = Some(id.to_string());
        self
    }

    /// Set the HTTP request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the TCP connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the per-command SMTP timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)
                .map_err(|e| ConfigError::InvalidBaseUrl(e.to_string()))?,
        };

        Ok(AppConfig {
            api_key: self.api_key.unwrap_or_else(|| SecretString::new(String::new())),
            mail_password: self
                .mail_password
                .unwrap_or_else(|| SecretString::new(String::new())),
            base_url,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            smtp_host: self
                .smtp_host
                .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            smtp_port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            client_id: self.client_id.unwrap_or_else(|| "localhost".to_string()),
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            connect_timeout: self
                .connect_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS)),
            command_timeout: self
                .command_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AppConfig::builder().build().unwrap();
        assert_eq!(
            config.base_url.as_str(),
            "https://generativelanguage.googleapis.com/"
        );
        assert_eq!(config.api_version, "v1beta");
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.smtp_host, "smtp.gmail.com");
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.smtp_address(), "smtp.gmail.com:587");
    }

    #[test]
    fn custom_config() {
        let config = AppConfig::builder()
            .model("gemini-1.5-pro")
            .smtp_host("mail.example.com")
            .smtp_port(2525)
            .request_timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.smtp_address(), "mail.example.com:2525");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = AppConfig::builder().base_url("not a url");
        assert!(result.is_err());
    }
}
