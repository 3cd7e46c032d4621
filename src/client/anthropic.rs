use async_trait::async_trait;
use tracing::{debug, warn};

use crate::drivers::{AnthropicDriver, MessagesApi, MessagesRequest, MessagesResponse};
use crate::transport::HttpTransport;
use crate::Result;

/// Anthropic Messages API client. One HTTP round trip per call, no retries.
pub struct AnthropicClient {
    pub(crate) transport: HttpTransport,
    pub(crate) driver: AnthropicDriver,
}

impl AnthropicClient {
    pub fn builder() -> super::AnthropicClientBuilder {
        super::AnthropicClientBuilder::new()
    }

    pub fn driver(&self) -> &AnthropicDriver {
        &self.driver
    }
}

#[async_trait]
impl MessagesApi for AnthropicClient {
    async fn create_message(&self, request: &MessagesRequest) -> Result<MessagesResponse> {
        let driver_request = self.driver.build_request(request)?;
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map(Vec::len).unwrap_or(0),
            "sending completion request"
        );

        let (status, body) = self.transport.post_json(&driver_request).await?;
        if !(200..300).contains(&status) {
            let err = self.driver.parse_error(status, &body);
            warn!(status, error = %err, "completion request rejected");
            return Err(err);
        }

        let response = self.driver.parse_response(&body)?;
        if let Some(usage) = &response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = ?response.stop_reason,
                "completion received"
            );
        }
        Ok(response)
    }
}
