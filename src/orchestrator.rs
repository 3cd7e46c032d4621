//! 对话编排 — 一次用户消息的完整处理流程
//!
//! Conversation orchestration. One call to [`ChatOrchestrator::respond`]
//! handles one user message:
//!
//! 1. split off the system message (first one wins);
//! 2. offer the session's tool catalog to the model;
//! 3. if the model stops for `tool_use`, dispatch every requested call and
//!    send the results back in a second request without tools;
//! 4. return the concatenated text of the final response.
//!
//! At most one tool round is executed per call. Tool failures are visible to
//! the model as tool output; completion failures propagate to the caller.

use serde_json::json;
use tracing::{debug, warn};

use crate::config::{ChatSettings, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use crate::drivers::{MessagesApi, MessagesRequest, MessagesResponse, StopReason, UsageInfo};
use crate::mcp::{to_client_tools, DispatchMode, ToolDispatcher, ToolSession};
use crate::types::{ContentBlock, Message, MessageContent, MessageRole, ToolResult};
use crate::Result;

/// Split a history into the system text and the remaining messages.
///
/// Only the first system message is used; later ones are dropped.
pub fn split_system(history: &[Message]) -> (Option<String>, Vec<Message>) {
    let mut system = None;
    let mut rest = Vec::with_capacity(history.len());
    for message in history {
        if !message.is_system() {
            rest.push(message.clone());
        } else if system.is_none() {
            system = Some(message.text());
        } else {
            debug!("ignoring additional system message");
        }
    }
    (system, rest)
}

/// Everything observed while answering one message.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text of the final response.
    pub text: String,
    /// Results sent back to the model, in call order. Empty when no tool ran.
    pub tool_results: Vec<ToolResult>,
    /// Summed over both requests.
    pub usage: UsageInfo,
    /// Stop reason of the final response.
    pub stop_reason: Option<StopReason>,
    /// Completion requests made: 1 or 2.
    pub rounds: u8,
}

pub struct ChatOrchestrator<'a> {
    model: &'a dyn MessagesApi,
    session: &'a dyn ToolSession,
    dispatch: DispatchMode,
    follow_up_tools: bool,
    model_id: String,
    max_tokens: u32,
}

impl<'a> ChatOrchestrator<'a> {
    pub fn new(model: &'a dyn MessagesApi, session: &'a dyn ToolSession) -> Self {
        Self {
            model,
            session,
            dispatch: DispatchMode::Sequential,
            follow_up_tools: false,
            model_id: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn from_config(model: &'a dyn MessagesApi, session: &'a dyn ToolSession, chat: &ChatSettings) -> Self {
        Self::new(model, session)
            .with_defaults(chat.model.clone(), chat.max_tokens)
            .with_dispatch_mode(DispatchMode::from_concurrency(chat.dispatch_concurrency))
            .with_follow_up_tools(chat.follow_up_tools)
    }

    /// Model id and output limit used by [`respond_with_defaults`](Self::respond_with_defaults).
    pub fn with_defaults(mut self, model_id: impl Into<String>, max_tokens: u32) -> Self {
        self.model_id = model_id.into();
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch = mode;
        self
    }

    /// Re-send the tool list on the follow-up request, with
    /// `tool_choice: none` so no further tool round can start.
    pub fn with_follow_up_tools(mut self, enabled: bool) -> Self {
        self.follow_up_tools = enabled;
        self
    }

    /// Answer the last message of `history` and return the reply text.
    pub async fn respond(&self, history: &[Message], model_id: &str, max_tokens: u32) -> Result<String> {
        Ok(self.run_turn(history, model_id, max_tokens).await?.text)
    }

    pub async fn respond_with_defaults(&self, history: &[Message]) -> Result<String> {
        self.respond(history, &self.model_id, self.max_tokens).await
    }

    /// Like [`respond`](Self::respond), keeping tool results and usage.
    pub async fn run_turn(&self, history: &[Message], model_id: &str, max_tokens: u32) -> Result<TurnOutcome> {
        let (system, mut messages) = split_system(history);
        let tools = to_client_tools(self.session.catalog());

        let first_request = MessagesRequest::new(model_id, max_tokens, messages.clone())
            .system(system.clone())
            .tools(tools.clone());
        let first = self.model.create_message(&first_request).await?;
        let mut usage = first.usage.unwrap_or_default();

        let calls = first.tool_calls();
        if !first.is_tool_use() || calls.is_empty() {
            if first.is_tool_use() {
                warn!("stop_reason is tool_use but the response has no tool_use blocks");
            }
            return Ok(finish(first, Vec::new(), usage, 1));
        }

        debug!(
            calls = calls.len(),
            tools = ?calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            "model requested tools"
        );
        messages.push(Message::with_content(
            MessageRole::Assistant,
            MessageContent::blocks(first.content),
        ));

        let results = ToolDispatcher::new(self.session)
            .dispatch_all(&calls, self.dispatch)
            .await;
        messages.push(Message::with_content(
            MessageRole::User,
            MessageContent::blocks(results.iter().cloned().map(ContentBlock::from).collect()),
        ));

        let mut follow_up = MessagesRequest::new(model_id, max_tokens, messages).system(system);
        if self.follow_up_tools && !tools.is_empty() {
            follow_up = follow_up.tools(tools).tool_choice(json!({"type": "none"}));
        }
        let second = self.model.create_message(&follow_up).await?;
        if let Some(u) = &second.usage {
            usage.add(u);
        }
        if second.is_tool_use() {
            warn!("model requested another tool round; only one round is executed per message");
        }
        Ok(finish(second, results, usage, 2))
    }
}

fn finish(response: MessagesResponse, tool_results: Vec<ToolResult>, usage: UsageInfo, rounds: u8) -> TurnOutcome {
    match &response.stop_reason {
        Some(StopReason::MaxTokens) => warn!("response truncated at max_tokens"),
        Some(StopReason::Refusal) => warn!("model refused to answer"),
        Some(StopReason::Other(reason)) => debug!(%reason, "unrecognized stop reason"),
        _ => {}
    }
    TurnOutcome {
        text: response.text(),
        tool_results,
        usage,
        stop_reason: response.stop_reason,
        rounds,
    }
}
