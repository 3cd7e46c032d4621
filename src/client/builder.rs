use crate::client::AnthropicClient;
use crate::config::AnthropicSettings;
use crate::drivers::AnthropicDriver;
use crate::error::{Error, ErrorContext};
use crate::transport::http::API_KEY_ENV;
use crate::transport::HttpTransport;
use crate::Result;

/// Builder for [`AnthropicClient`].
///
/// Starts from [`AnthropicSettings::default`]; every setter overrides one field.
pub struct AnthropicClientBuilder {
    settings: AnthropicSettings,
}

impl AnthropicClientBuilder {
    pub fn new() -> Self {
        Self {
            settings: AnthropicSettings::default(),
        }
    }

    /// Start from loaded configuration.
    pub fn from_settings(settings: &AnthropicSettings) -> Self {
        Self {
            settings: settings.clone(),
        }
    }

    /// Explicit API key. Without one, the OS keyring and then
    /// `ANTHROPIC_API_KEY` are consulted.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.settings.api_key = Some(key.into());
        self
    }

    /// Override the API base URL (mock servers, gateways).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.settings.base_url = base_url.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.settings.api_version = version.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.settings.timeout_secs = secs;
        self
    }

    pub fn proxy_url(mut self, url: impl Into<String>) -> Self {
        self.settings.proxy_url = Some(url.into());
        self
    }

    /// Build the client. Fails when no API key can be resolved.
    pub fn build(self) -> Result<AnthropicClient> {
        let transport = HttpTransport::new(&self.settings)?;
        if !transport.has_api_key() {
            return Err(Error::configuration_with_context(
                format!("No Anthropic API key found; set {} or store one in the keyring", API_KEY_ENV),
                ErrorContext::new().with_field_path("anthropic.api_key"),
            ));
        }
        let driver = AnthropicDriver::new(&self.settings.base_url, &self.settings.api_version);
        Ok(AnthropicClient { transport, driver })
    }
}

impl Default for AnthropicClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
