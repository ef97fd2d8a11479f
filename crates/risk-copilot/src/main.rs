mod cli;
mod config;
mod error;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::AppError;
use risk_copilot_core::{KnowledgeBase, RiskCopilot};
use server::RiskCopilotServer;

#[derive(Parser, Debug)]
#[command(name = "risk-copilot")]
#[command(version, about = "Offline risk copilot: classify a risk question, rank local guidance, recommend actions")]
struct Args {
    /// Path to a JSON knowledge base (overrides RISK_COPILOT_KB_PATH)
    #[arg(long, global = true)]
    kb: Option<PathBuf>,

    /// Number of knowledge base entries to retrieve (overrides RISK_COPILOT_TOP_K)
    #[arg(long, global = true)]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the copilot over MCP (stdio, or TCP when MCP_TCP_LISTEN_ADDR is set)
    Serve,
    /// Analyse one question and print the report
    Ask {
        /// Risk-focused question to analyse
        #[arg(required = true)]
        query: Vec<String>,
        /// Print the reasoning trace after the report
        #[arg(long)]
        trace: bool,
    },
    /// Prompt for questions until 'exit' or 'quit'
    Interactive {
        /// Print the reasoning trace after each report
        #[arg(long)]
        trace: bool,
    },
}

fn load_copilot(config: &Config) -> Result<RiskCopilot, AppError> {
    let kb = KnowledgeBase::from_file(config.kb_path())?;
    Ok(RiskCopilot::new(kb))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // stdout carries MCP JSON-RPC or the printed report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Config::from_env(args.kb, args.top_k).inspect_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
    })?;
    info!(
        kb_path = %config.kb_path.display(),
        top_k = config.top_k,
        tcp = config.tcp_listen_addr.is_some(),
        "configuration loaded"
    );

    let copilot = Arc::new(load_copilot(&config).inspect_err(|e| {
        tracing::error!(error = %e, "failed to load knowledge base");
    })?);

    match args.command.unwrap_or(Command::Serve) {
        Command::Ask { query, trace } => {
            cli::run_query(&copilot, &query.join(" "), config.top_k, trace);
        }
        Command::Interactive { trace } => {
            cli::interactive_loop(&copilot, config.top_k, trace).await?;
        }
        Command::Serve => serve(copilot, config).await?,
    }
    Ok(())
}

async fn serve(copilot: Arc<RiskCopilot>, config: Config) -> anyhow::Result<()> {
    let listen_addr = config.tcp_listen_addr.clone();
    let server = RiskCopilotServer::new(copilot, config);

    if let Some(addr) = listen_addr {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
