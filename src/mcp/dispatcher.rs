//! Tool dispatch
//!
//! Runs model-requested tool calls against a [`ToolSession`]. Failures never
//! escape: they become the tool's output text so the model can see them.

use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use super::ToolSession;
use crate::types::{ToolCall, ToolResult};

/// How the calls of one turn are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// One call at a time, in request order.
    #[default]
    Sequential,
    /// Up to `limit` calls in flight; results are still returned in request order.
    Concurrent { limit: usize },
}

impl DispatchMode {
    /// 0 or 1 means sequential.
    pub fn from_concurrency(n: usize) -> Self {
        if n <= 1 {
            DispatchMode::Sequential
        } else {
            DispatchMode::Concurrent { limit: n }
        }
    }
}

pub struct ToolDispatcher<'a> {
    session: &'a dyn ToolSession,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(session: &'a dyn ToolSession) -> Self {
        Self { session }
    }

    /// Call one tool and return its output text.
    pub async fn invoke(&self, name: &str, arguments: Value) -> String {
        self.execute(name, arguments).await.0
    }

    pub async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let (content, is_error) = self.execute(&call.name, call.arguments.clone()).await;
        if is_error {
            warn!(tool = %call.name, call_id = %call.id, "tool call failed");
        } else {
            debug!(tool = %call.name, call_id = %call.id, bytes = content.len(), "tool call succeeded");
        }
        ToolResult {
            tool_use_id: call.id.clone(),
            content,
            is_error,
        }
    }

    /// Dispatch every call. The output is aligned with `calls`.
    pub async fn dispatch_all(&self, calls: &[ToolCall], mode: DispatchMode) -> Vec<ToolResult> {
        match mode {
            DispatchMode::Sequential => {
                let mut results = Vec::with_capacity(calls.len());
                for call in calls {
                    results.push(self.dispatch(call).await);
                }
                results
            }
            DispatchMode::Concurrent { limit } => {
                let mut indexed: Vec<(usize, ToolResult)> = futures::stream::iter(calls.iter().enumerate())
                    .map(|(idx, call)| async move { (idx, self.dispatch(call).await) })
                    .buffer_unordered(limit.max(1))
                    .collect()
                    .await;
                indexed.sort_by_key(|(idx, _)| *idx);
                indexed.into_iter().map(|(_, result)| result).collect()
            }
        }
    }

    async fn execute(&self, name: &str, arguments: Value) -> (String, bool) {
        let result = match self.session.call_tool(name, arguments).await {
            Ok(result) => result,
            Err(e) => return failure(name, e),
        };
        match result.content.first() {
            None if result.is_error => failure(name, "tool reported an error without content"),
            None => (
                format!("Tool {} executed successfully but returned no content.", name),
                false,
            ),
            Some(item) => match &item.text {
                Some(text) => (text.clone(), result.is_error),
                None => failure(name, format!("unsupported {} content in tool result", item.content_type)),
            },
        }
    }
}

fn failure(name: &str, message: impl std::fmt::Display) -> (String, bool) {
    (format!("Error executing tool {}: {}", name, message), true)
}
