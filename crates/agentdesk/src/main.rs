//! AgentDesk - configure and test conversational agents

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    chat_command, init_command, knowledge_add_command, knowledge_list_command,
    knowledge_remove_command, serve_command, sessions_list_command, sessions_show_command,
    status_command, tools_call_command, tools_list_command, tools_refresh_command,
};

/// AgentDesk - conversational agents in your terminal
#[derive(Parser)]
#[command(name = "agentdesk")]
#[command(about = "◆ Configure and test conversational AI agents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config and data directories
    Init,
    /// Show system status
    Status,
    /// Chat with an agent
    Chat {
        /// Agent ID (defaults to the configured default agent)
        #[arg(short, long)]
        agent: Option<String>,
        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
        /// Message to send; interactive when omitted
        #[arg(short, long)]
        message: Option<String>,
    },
    /// Inspect chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Manage knowledge documents
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },
    /// Talk to remote tool servers
    Tools {
        #[command(subcommand)]
        command: ToolCommands,
    },
    /// Start the WhatsApp webhook server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,
        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List sessions, most recent first
    List {
        /// Only sessions with this agent
        #[arg(short, long)]
        agent: Option<String>,
    },
    /// Print a session transcript
    Show { id: String },
}

#[derive(Subcommand)]
enum KnowledgeCommands {
    /// Upload a pdf, txt, md, json or csv file
    Add { agent: String, file: PathBuf },
    /// List an agent's documents
    List { agent: String },
    /// Remove a document
    Remove { agent: String, doc_id: String },
}

#[derive(Subcommand)]
enum ToolCommands {
    /// List the tools a server advertises
    List { server_url: String },
    /// Call a tool
    Call {
        server_url: String,
        name: String,
        /// JSON arguments
        #[arg(short, long)]
        args: Option<String>,
    },
    /// Store a configured server's advertised tools
    Refresh { tool_id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (label, result) = match cli.command {
        Commands::Init => ("Init", init_command().await),
        Commands::Status => ("Status", status_command().await),
        Commands::Chat {
            agent,
            session,
            message,
        } => ("Chat", chat_command(agent, session, message).await),
        Commands::Sessions { command } => match command {
            SessionCommands::List { agent } => ("Sessions list", sessions_list_command(agent).await),
            SessionCommands::Show { id } => ("Sessions show", sessions_show_command(id).await),
        },
        Commands::Knowledge { command } => match command {
            KnowledgeCommands::Add { agent, file } => {
                ("Knowledge add", knowledge_add_command(agent, file).await)
            }
            KnowledgeCommands::List { agent } => {
                ("Knowledge list", knowledge_list_command(agent).await)
            }
            KnowledgeCommands::Remove { agent, doc_id } => {
                ("Knowledge remove", knowledge_remove_command(agent, doc_id).await)
            }
        },
        Commands::Tools { command } => match command {
            ToolCommands::List { server_url } => ("Tools list", tools_list_command(server_url).await),
            ToolCommands::Call {
                server_url,
                name,
                args,
            } => ("Tools call", tools_call_command(server_url, name, args).await),
            ToolCommands::Refresh { tool_id } => {
                ("Tools refresh", tools_refresh_command(tool_id).await)
            }
        },
        Commands::Serve { host, port } => ("Serve", serve_command(host, port).await),
    };

    if let Err(e) = result {
        error!("{} failed: {:#}", label, e);
        eprintln!("✗ {:#}", e);
        std::process::exit(1);
    }
}
