//! Full turns: mocked Messages API + mocked Streamable HTTP MCP server.

use crate::mock_server::{completion, rpc_reply, weather_tool, MockServerFixture, SESSION_ID};
use mcp_chat_bridge::mcp::McpServerSpec;
use mcp_chat_bridge::{ChatOrchestrator, McpSession, Message};
use mockito::Matcher;
use serde_json::json;

const MODEL: &str = "claude-3-5-sonnet-20241022";

fn weather_history(question: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You are a helpful assistant that can check weather information for cities. \
             Use the available tools when users ask about weather.",
        ),
        Message::user(question),
    ]
}

#[tokio::test]
async fn test_weather_scenario() {
    let fixture = MockServerFixture::new().await;
    let _mcp = fixture.mock_mcp_server(json!([weather_tool()])).await;
    let tool_call = fixture
        .mock_tool_call(json!({"city": "Tokyo"}), "The weather in Tokyo is sunny.")
        .await;
    let _delete = fixture.mock_session_delete().await;

    let first = fixture
        .mock_messages(
            r#""tools":\[.*"name":"get_weather""#,
            200,
            completion(
                "tool_use",
                json!([
                    {"type": "text", "text": "Let me check the weather in Tokyo."},
                    {"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Tokyo"}}
                ]),
            ),
        )
        .await;
    let second = fixture
        .mock_messages(
            r#""tool_use_id":"toolu_1""#,
            200,
            completion("end_turn", json!([{"type": "text", "text": "It's sunny in Tokyo."}])),
        )
        .await;

    let model = fixture.anthropic_client();
    let session = McpSession::start(&McpServerSpec::streamable_http(fixture.mcp_url()))
        .await
        .expect("session");
    let orchestrator = ChatOrchestrator::new(&model, &session);

    let reply = orchestrator
        .respond(&weather_history("What's the weather in Tokyo?"), MODEL, 1024)
        .await
        .expect("reply");
    assert_eq!(reply, "It's sunny in Tokyo.");

    first.assert_async().await;
    second.assert_async().await;
    tool_call.assert_async().await;
    session.stop().await;
}

#[tokio::test]
async fn test_two_cities_single_round() {
    let fixture = MockServerFixture::new().await;
    let _mcp = fixture.mock_mcp_server(json!([weather_tool()])).await;
    let tokyo = fixture
        .mock_tool_call(json!({"city": "Tokyo"}), "The weather in Tokyo is sunny.")
        .await;
    let new_york = fixture
        .mock_tool_call(json!({"city": "New York"}), "The weather in New York is sunny.")
        .await;
    let _delete = fixture.mock_session_delete().await;

    let _first = fixture
        .mock_messages(
            r#""tools":\["#,
            200,
            completion(
                "tool_use",
                json!([
                    {"type": "tool_use", "id": "toolu_a", "name": "get_weather", "input": {"city": "Tokyo"}},
                    {"type": "tool_use", "id": "toolu_b", "name": "get_weather", "input": {"city": "New York"}}
                ]),
            ),
        )
        .await;
    let second = fixture
        .mock_messages(
            r#"Tokyo is sunny\..*New York is sunny\."#,
            200,
            completion(
                "end_turn",
                json!([{"type": "text", "text": "Both Tokyo and New York are sunny."}]),
            ),
        )
        .await;

    let model = fixture.anthropic_client();
    let session = McpSession::start(&McpServerSpec::streamable_http(fixture.mcp_url()))
        .await
        .expect("session");
    let outcome = ChatOrchestrator::new(&model, &session)
        .run_turn(
            &weather_history("What's the weather like in Tokyo and New York?"),
            MODEL,
            1024,
        )
        .await
        .expect("turn");

    assert_eq!(outcome.text, "Both Tokyo and New York are sunny.");
    assert_eq!(outcome.rounds, 2);
    assert_eq!(outcome.tool_results.len(), 2);
    tokyo.assert_async().await;
    new_york.assert_async().await;
    second.assert_async().await;
    session.stop().await;
}

#[tokio::test]
async fn test_empty_catalog_sends_no_tools() {
    let fixture = MockServerFixture::new().await;
    let _mcp = fixture.mock_mcp_server(json!([])).await;
    let _delete = fixture.mock_session_delete().await;

    let with_tools = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/v1/messages")
            .match_body(Matcher::Regex(r#""tools""#.to_string()))
            .with_status(500)
            .expect(0)
            .create_async()
            .await
    };
    let plain = fixture
        .mock_messages(
            r#""content":"Hi""#,
            200,
            completion("end_turn", json!([{"type": "text", "text": "Hello."}])),
        )
        .await;

    let model = fixture.anthropic_client();
    let session = McpSession::start(&McpServerSpec::streamable_http(fixture.mcp_url()))
        .await
        .expect("session");
    assert!(session.catalog().is_empty());

    let reply = ChatOrchestrator::new(&model, &session)
        .respond(&[Message::user("Hi")], MODEL, 1024)
        .await
        .expect("reply");
    assert_eq!(reply, "Hello.");

    plain.assert_async().await;
    with_tools.assert_async().await;
    session.stop().await;
}

#[tokio::test]
async fn test_tool_error_reaches_model() {
    let fixture = MockServerFixture::new().await;
    let _mcp = fixture.mock_mcp_server(json!([weather_tool()])).await;
    let _delete = fixture.mock_session_delete().await;
    let _failing_call = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/mcp")
            .match_body(Matcher::PartialJson(json!({"method": "tools/call"})))
            .match_header("mcp-session-id", SESSION_ID)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body_from_request(rpc_reply(json!({
                "error": {"code": -32603, "message": "weather service unavailable"}
            })))
            .create_async()
            .await
    };

    let _first = fixture
        .mock_messages(
            r#""tools":\["#,
            200,
            completion(
                "tool_use",
                json!([{"type": "tool_use", "id": "toolu_1", "name": "get_weather", "input": {"city": "Tokyo"}}]),
            ),
        )
        .await;
    let second = fixture
        .mock_messages(
            r#""content":"Error executing tool get_weather: [^"]*weather service unavailable","is_error":true"#,
            200,
            completion(
                "end_turn",
                json!([{"type": "text", "text": "Sorry, I couldn't get the weather right now."}]),
            ),
        )
        .await;

    let model = fixture.anthropic_client();
    let session = McpSession::start(&McpServerSpec::streamable_http(fixture.mcp_url()))
        .await
        .expect("session");
    let reply = ChatOrchestrator::new(&model, &session)
        .respond(&weather_history("Weather in Tokyo?"), MODEL, 1024)
        .await
        .expect("reply");

    assert!(!reply.is_empty());
    second.assert_async().await;
    session.stop().await;
}
