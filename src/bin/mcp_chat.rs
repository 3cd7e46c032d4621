//! mcp-chat — 连接 MCP 工具服务器的交互式对话命令行
//!
//! Usage:
//!   mcp-chat [--config <path>] [--server <url>] [--model <id>]   Demo conversation, then interactive chat
//!   mcp-chat [...] --once <prompt>                                 Answer one prompt and exit

use anyhow::{bail, Context};
use mcp_chat_bridge::{AnthropicClientBuilder, BridgeConfig, ChatOrchestrator, McpSession, Message};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that can check weather information for cities. \
Use the available tools when users ask about weather.";
const DEMO_PROMPT: &str = "What's the weather like in Tokyo and New York?";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    server: Option<String>,
    model: Option<String>,
    once: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    match raw.first().map(String::as_str) {
        Some("help" | "--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some("version" | "--version" | "-V") => {
            println!("mcp-chat {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }
    let args = parse_args(&raw)?;

    let mut config = BridgeConfig::load(args.config.as_deref())?;
    if let Some(url) = args.server {
        config.mcp.url = url;
    }
    if let Some(model) = args.model {
        config.chat.model = model;
    }
    config.validate()?;

    let model = AnthropicClientBuilder::from_settings(&config.anthropic)
        .build()
        .context("cannot create the Messages API client")?;
    let session = McpSession::start(&config.mcp)
        .await
        .with_context(|| format!("failed to connect to MCP server at {}", config.mcp.url))?;

    println!("Connected to MCP server {} ({})", session.server_info().name, config.mcp.url);
    if let Some(instructions) = session.instructions() {
        println!("Server instructions: {}", instructions);
    }
    let names: Vec<&str> = session.catalog().iter().map(|t| t.name.as_str()).collect();
    println!("Available tools: {:?}", names);
    println!();

    let orchestrator = ChatOrchestrator::from_config(&model, &session, &config.chat);
    let system_prompt = config
        .chat
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let outcome = match args.once {
        Some(prompt) => one_shot(&orchestrator, &system_prompt, &prompt).await,
        None => interactive(&orchestrator, &system_prompt).await,
    };

    session.stop().await;
    outcome
}

fn parse_args(raw: &[String]) -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut iter = raw.iter();
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .with_context(|| format!("{} requires a value", flag))
        };
        match flag.as_str() {
            "--config" => args.config = Some(PathBuf::from(value()?)),
            "--server" => args.server = Some(value()?),
            "--model" => args.model = Some(value()?),
            "--once" => args.once = Some(value()?),
            other => bail!("unknown argument: {} (see `mcp-chat help`)", other),
        }
    }
    Ok(args)
}

fn print_usage() {
    println!(
        r#"mcp-chat — chat with Claude using tools from an MCP server

USAGE:
    mcp-chat [OPTIONS]
    mcp-chat help | version

OPTIONS:
    --config <path>     YAML configuration file
    --server <url>      MCP server URL (overrides config)
    --model <id>        Model id (overrides config)
    --once <prompt>     Answer a single prompt and exit

ENVIRONMENT:
    ANTHROPIC_API_KEY   API key (if none is stored in the OS keyring)
    MCP_CHAT_CONFIG     Configuration file path
    MCP_SERVER_URL      MCP server URL
    RUST_LOG            Log filter, e.g. mcp_chat_bridge=debug"#
    );
}

async fn one_shot(orchestrator: &ChatOrchestrator<'_>, system_prompt: &str, prompt: &str) -> anyhow::Result<()> {
    let history = vec![Message::system(system_prompt), Message::user(prompt)];
    let reply = orchestrator.respond_with_defaults(&history).await?;
    println!("{}", reply);
    Ok(())
}

async fn interactive(orchestrator: &ChatOrchestrator<'_>, system_prompt: &str) -> anyhow::Result<()> {
    println!("Starting conversation...");
    println!("You: {}", DEMO_PROMPT);
    let demo = vec![Message::system(system_prompt), Message::user(DEMO_PROMPT)];
    match orchestrator.respond_with_defaults(&demo).await {
        Ok(reply) => println!("Claude: {}", reply),
        Err(e) => eprintln!("Error: {}", e),
    }
    println!("\n{}\n", "=".repeat(50));

    println!("Interactive chat mode (type 'quit' to exit):");
    let mut history = vec![Message::system(system_prompt)];
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "quit" | "exit" | "bye") {
            break;
        }

        history.push(Message::user(input));
        match orchestrator.respond_with_defaults(&history).await {
            Ok(reply) => {
                println!("Claude: {}", reply);
                history.push(Message::assistant(reply));
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}
