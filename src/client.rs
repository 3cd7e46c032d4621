//! Messages API client.
//!
//! [`AnthropicClient`] pairs the HTTP transport with the Anthropic driver and
//! implements [`MessagesApi`](crate::drivers::MessagesApi) for the
//! orchestrator. Build one with [`AnthropicClientBuilder`].

pub mod anthropic;
pub mod builder;
pub(crate) mod error_classification;

pub use anthropic::AnthropicClient;
pub use builder::AnthropicClientBuilder;
