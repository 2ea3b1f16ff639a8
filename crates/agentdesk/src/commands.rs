//! AgentDesk command implementations

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use agentdesk_agent::{AgentError, ChatService};
use agentdesk_channels::{WhatsAppBridge, WhatsAppChannel};
use agentdesk_config::{self, AgentProfile, Config, RemoteToolDef, ToolServerKind};
use agentdesk_mcp::{CallToolResultExt, McpClient, McpClientOptions, McpRegistry};
use agentdesk_provider::ProviderKind;
use agentdesk_session::{ChatMessage, KnowledgeStore, MessageRole, SessionStore};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn rpc_options(config: &Config) -> McpClientOptions {
    McpClientOptions::default().with_timeouts(
        Duration::from_secs(config.rpc.connect_timeout_secs),
        Duration::from_secs(config.rpc.request_timeout_secs),
    )
}

/// Chat service over the default data directories
fn chat_service(config: Config) -> (Arc<ChatService>, Arc<McpRegistry>) {
    let registry = Arc::new(McpRegistry::new(rpc_options(&config)));
    let service = ChatService::new(
        Arc::new(config),
        SessionStore::new(agentdesk_config::sessions_dir()),
        KnowledgeStore::new(agentdesk_config::knowledge_dir()),
        registry.clone(),
    );
    (Arc::new(service), registry)
}

fn pick_agent<'a>(config: &'a Config, id: Option<&str>) -> Result<&'a AgentProfile> {
    match id {
        Some(id) => Ok(config.agent(id)?),
        None => config
            .default_agent()
            .context("No agents configured. Add one to ~/.agentdesk/config.json"),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        format!("{}…", line.chars().take(max).collect::<String>())
    } else {
        line.to_string()
    }
}

/// Initialize config and data directories
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing AgentDesk...");
    println!("{}", RULE);

    agentdesk_config::init().await?;

    println!("Config:    {}", agentdesk_config::config_path().display());
    println!("Sessions:  {}", agentdesk_config::sessions_dir().display());
    println!("Knowledge: {}", agentdesk_config::knowledge_dir().display());

    println!("\n◆ AgentDesk initialized");
    println!("\nNext steps:");
    println!("  1. Add provider keys and agents to ~/.agentdesk/config.json");
    println!("  2. Start chatting: agentdesk chat -m \"Hello!\"");

    Ok(())
}

/// Show status
pub async fn status_command() -> Result<()> {
    let config_path = agentdesk_config::config_path();

    println!("◆ AgentDesk Status");
    println!("{}", RULE);
    println!(
        "Config:    {} {}",
        config_path.display(),
        if config_path.exists() { "[OK]" } else { "[Missing]" }
    );

    if !config_path.exists() {
        println!("\nRun `agentdesk init` to get started");
        return Ok(());
    }

    let config = Config::load().await?;

    println!("\nProviders:");
    for kind in ProviderKind::ALL {
        println!(
            "  {:<10} {}",
            kind.display_name(),
            if config.api_key(kind.id()).is_some() { "[Set]" } else { "[Missing]" }
        );
    }

    println!("\nAgents:");
    if config.agents.is_empty() {
        println!("  (none)");
    }
    for agent in &config.agents {
        let model = if agent.model.is_empty() { "default model" } else { agent.model.as_str() };
        println!("  {} - {} ({}, {})", agent.id, agent.name, agent.provider, model);
    }

    let workflow = config
        .tools
        .iter()
        .filter(|t| t.kind == ToolServerKind::N8n)
        .count();
    println!(
        "\nTool servers: {} ({} workflow, {} notification)",
        config.tools.len(),
        workflow,
        config.tools.len() - workflow
    );
    println!(
        "WhatsApp:     {}",
        match (
            config.channels.whatsapp.enabled,
            config.channels.whatsapp.has_credentials()
        ) {
            (true, true) => "[Enabled]",
            (true, false) => "[Enabled, credentials missing]",
            _ => "[Disabled]",
        }
    );

    println!("\n◆ Ready");
    Ok(())
}

/// Chat with an agent
pub async fn chat_command(
    agent_id: Option<String>,
    session_id: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let config = Config::load().await?;
    let sessions = SessionStore::new(agentdesk_config::sessions_dir());

    // A resumed session is bound to the agent that started it
    let existing = match session_id {
        Some(id) => Some(sessions.load(&id).await?),
        None => None,
    };
    let agent = match (&existing, agent_id.as_deref()) {
        (Some(session), Some(requested)) if requested != session.agent_id => bail!(
            "Session {} belongs to agent {}, not {}",
            session.id,
            session.agent_id,
            requested
        ),
        (Some(session), _) => config.agent(&session.agent_id)?.clone(),
        (None, requested) => pick_agent(&config, requested)?.clone(),
    };
    let (chat, registry) = chat_service(config);

    let session = match existing {
        Some(session) => session,
        None => {
            let session = chat.start_session(&agent).await?;
            if let Some(greeting) = session.messages.first() {
                println!("\n◆ {}", greeting.content);
            }
            session
        }
    };
    debug!("Chatting with {} in session {}", agent.id, session.id);

    let result = match message {
        Some(msg) => match chat.send(&agent, &session.id, &msg).await {
            Ok(reply) => {
                println!("\n◆ {}", reply.text);
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        None => interactive_chat(&chat, &agent, &session.id).await,
    };

    registry.disconnect_all().await;
    result
}

async fn interactive_chat(chat: &ChatService, agent: &AgentProfile, session_id: &str) -> Result<()> {
    println!("◆ Chatting with {} (type 'exit' to quit)", agent.name);
    println!("Session: {}", session_id);
    println!("{}", RULE);

    loop {
        print!("◆ ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        match chat.send(agent, session_id, input).await {
            Ok(reply) => println!("\n◆ {}\n", reply.text),
            Err(e @ AgentError::MissingApiKey(_)) => return Err(e.into()),
            Err(e) => println!("\n✗ {}\n", e),
        }
    }

    Ok(())
}

/// List sessions
pub async fn sessions_list_command(agent: Option<String>) -> Result<()> {
    let store = SessionStore::new(agentdesk_config::sessions_dir());
    let sessions = store.list(agent.as_deref()).await?;

    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }

    println!("Sessions:");
    for session in sessions {
        println!(
            "  {} - {} ({} messages, updated {})",
            session.id,
            session.agent_id,
            session.messages.len(),
            session.updated_at.format("%Y-%m-%d %H:%M")
        );
        if let Some(preview) = session.preview() {
            println!("      {}", truncate(preview, 60));
        }
    }

    Ok(())
}

fn print_message(message: &ChatMessage) {
    let time = message.timestamp.format("%H:%M");
    match message.role {
        MessageRole::User => println!("[{}] You: {}", time, message.content),
        MessageRole::Assistant => println!("[{}] ◆ {}", time, message.content),
        MessageRole::Tool => {
            println!("[{}]   · {}", time, message.content);
            if let Some(details) = &message.tool_details {
                if let Some(error) = &details.error {
                    println!("          error: {}", error);
                }
            }
        }
    }
}

/// Print a session transcript
pub async fn sessions_show_command(id: String) -> Result<()> {
    let store = SessionStore::new(agentdesk_config::sessions_dir());
    let session = store.load(&id).await?;

    println!("◆ Session {} with {}", session.id, session.agent_id);
    println!("{}", RULE);
    for message in &session.messages {
        print_message(message);
    }

    Ok(())
}

/// Upload a knowledge document
pub async fn knowledge_add_command(agent: String, file: PathBuf) -> Result<()> {
    let config = Config::load().await?;
    config.agent(&agent)?;

    let store = KnowledgeStore::new(agentdesk_config::knowledge_dir());
    let document = store
        .add_file(&agent, &file)
        .await
        .with_context(|| format!("Failed to add {}", file.display()))?;

    println!(
        "✓ Added {} ({} bytes) as {}",
        document.file_name, document.file_size, document.id
    );
    Ok(())
}

/// List knowledge documents
pub async fn knowledge_list_command(agent: String) -> Result<()> {
    let store = KnowledgeStore::new(agentdesk_config::knowledge_dir());
    let documents = store.list(&agent).await?;

    if documents.is_empty() {
        println!("No documents for {}", agent);
        return Ok(());
    }

    println!("Documents for {}:", agent);
    for doc in documents {
        println!(
            "  {} - {} ({}, {} bytes)",
            doc.id, doc.file_name, doc.file_type, doc.file_size
        );
    }
    Ok(())
}

/// Remove a knowledge document
pub async fn knowledge_remove_command(agent: String, doc_id: String) -> Result<()> {
    let store = KnowledgeStore::new(agentdesk_config::knowledge_dir());

    if store.delete(&agent, &doc_id).await? {
        println!("✓ Document {} removed", doc_id);
    } else {
        println!("✗ Document {} not found", doc_id);
    }
    Ok(())
}

async fn connect(config: &Config, server_url: &str) -> Result<McpClient> {
    McpClient::connect(server_url, rpc_options(config))
        .await
        .with_context(|| format!("Could not connect to {}", server_url))
}

/// List a server's tools
pub async fn tools_list_command(server_url: String) -> Result<()> {
    let config = Config::load().await?;
    let client = connect(&config, &server_url).await?;
    let tools = client.list_tools().await;
    client.disconnect();
    let tools = tools?;

    if tools.is_empty() {
        println!("No tools advertised by {}", server_url);
        return Ok(());
    }

    println!("Tools at {}:", server_url);
    for tool in tools {
        println!(
            "  {} - {}",
            tool.name,
            tool.description.as_deref().unwrap_or("(no description)")
        );
    }
    Ok(())
}

/// Call one tool and print its output
pub async fn tools_call_command(server_url: String, name: String, args: Option<String>) -> Result<()> {
    let arguments = match args {
        Some(raw) => serde_json::from_str(&raw).context("--args must be valid JSON")?,
        None => serde_json::json!({}),
    };

    let config = Config::load().await?;
    let client = connect(&config, &server_url).await?;
    let result = client.call_tool(&name, arguments).await;
    client.disconnect();
    let result = result?;

    let text = result.text();
    let output = if text.is_empty() {
        serde_json::to_string_pretty(&result)?
    } else {
        text
    };

    if result.failed() {
        anyhow::bail!("{} reported an error: {}", name, output);
    }
    println!("{}", output);
    Ok(())
}

/// Store a configured server's advertised tools in the config
pub async fn tools_refresh_command(tool_id: String) -> Result<()> {
    let mut config = Config::load().await?;
    let mut server = config
        .tool_server(&tool_id)
        .cloned()
        .with_context(|| format!("Unknown tool server: {}", tool_id))?;

    if server.kind != ToolServerKind::N8n {
        anyhow::bail!("{} is a notification sender, not a tool server", tool_id);
    }

    let server_url = server.server_url.trim_end_matches('/').to_string();
    let client = connect(&config, &server_url).await?;
    let tools = client.list_tools().await;
    client.disconnect();

    server.available_tools = tools?
        .into_iter()
        .map(|tool| RemoteToolDef {
            name: tool.name.to_string(),
            description: tool.description.as_deref().unwrap_or_default().to_string(),
            input_schema: Value::Object(tool.input_schema.as_ref().clone()),
        })
        .collect();
    let count = server.available_tools.len();
    config.upsert_tool_server(server);
    config.save().await?;

    info!("Refreshed {} tools for {}", count, tool_id);
    println!("✓ {} tools stored for {}", count, tool_id);
    Ok(())
}

/// Start the webhook server
pub async fn serve_command(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = Config::load().await?;
    let whatsapp = config.channels.whatsapp.clone();

    if !whatsapp.enabled {
        warn!("WhatsApp channel is disabled in config; serving anyway");
    }
    if !whatsapp.has_credentials() {
        warn!("Twilio credentials missing; replies will fail to send");
    }

    let host = host.unwrap_or_else(|| whatsapp.host.clone());
    let port = port.unwrap_or(whatsapp.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let (chat, registry) = chat_service(config);
    let bridge = Arc::new(WhatsAppBridge::new(
        chat,
        Arc::new(WhatsAppChannel::new(whatsapp)),
    ));

    println!("◆ Starting AgentDesk webhook");
    println!("{}", RULE);
    println!("Listening on http://{}", addr);
    println!("  POST /whatsapp  Twilio webhook");
    println!("  GET  /health    health check");
    println!("Press Ctrl+C to stop");

    let result = agentdesk_channels::serve(bridge, addr, async {
        tokio::signal::ctrl_c().await.ok();
        info!("◆ Shutdown signal received");
    })
    .await;

    registry.disconnect_all().await;
    println!("\n◆ Webhook stopped");
    Ok(result?)
}
