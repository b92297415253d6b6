//! mcp-react CLI
//!
//! Connects to the configured MCP tool servers, runs one ReAct conversation
//! with the chosen provider and prints the answer.
//!
//! ```text
//! mcp-react --provider gemini "What is 15 multiplied by 3, then divided by 5?"
//! ```

use std::sync::Arc;

use agent_core::{AgentBuilder, BackendAdapter, ConfigSource, McpConfig};
use agent_runtime::{GeminiAdapter, McpConnector, OllamaAdapter, OpenAiAdapter, Settings};
use anyhow::Context;
use clap::{Parser, ValueEnum};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Provider {
    Openai,
    Gemini,
    Ollama,
}

#[derive(Debug, Parser)]
#[command(name = "mcp-react", about = "ReAct tool calling over MCP servers", version)]
struct Cli {
    /// LLM backend
    #[arg(short, long, value_enum, default_value_t = Provider::Openai, env = "MCP_REACT_PROVIDER")]
    provider: Provider,

    /// Model override (defaults to the provider's own default)
    #[arg(short, long)]
    model: Option<String>,

    /// Server config file, or inline JSON (defaults to MCP_SERVERS_PATH)
    #[arg(short, long)]
    config: Option<String>,

    /// Maximum tool calls before giving up
    #[arg(long, conflicts_with = "unbounded")]
    max_iterations: Option<usize>,

    /// Let the model call tools without limit
    #[arg(long)]
    unbounded: bool,

    /// What to ask
    prompt: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let settings = Settings::from_env();

    let source = cli.config.clone().map_or_else(
        || ConfigSource::from(settings.mcp_servers_path.clone()),
        ConfigSource::from,
    );
    let config = McpConfig::resolve(source).context("loading MCP server config")?;

    let answer = match cli.provider {
        Provider::Openai => {
            let key = settings
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY is not set")?;
            let mut adapter = OpenAiAdapter::new(key);
            if let Some(url) = &settings.openai_base_url {
                adapter = adapter.with_base_url(url);
            }
            run(adapter, &cli, &config).await?
        }
        Provider::Gemini => {
            let key = settings
                .gemini_api_key
                .clone()
                .context("GEMINI_API_KEY is not set")?;
            run(GeminiAdapter::new(key), &cli, &config).await?
        }
        Provider::Ollama => run(OllamaAdapter::from_config(settings.ollama.clone()), &cli, &config).await?,
    };

    println!("{answer}");
    Ok(())
}

/// Register servers, converse, and release every connection on the way out
async fn run<A: BackendAdapter>(adapter: A, cli: &Cli, config: &McpConfig) -> anyhow::Result<String> {
    let mut builder = AgentBuilder::new(adapter).connector(Arc::new(McpConnector::new()));
    if cli.unbounded {
        builder = builder.unbounded();
    } else if let Some(max) = cli.max_iterations {
        builder = builder.max_iterations(max);
    }
    let mut agent = builder.build()?;

    tracing::info!(provider = agent.adapter().name(), servers = config.len(), "Starting");

    let outcome = tokio::select! {
        result = async {
            agent.load_from_config(config).await?;
            agent.chat(&cli.prompt, cli.model.as_deref()).await
        } => result.map_err(|e| {
            tracing::error!("{}", e.user_message());
            anyhow::Error::new(e)
        }),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted");
            Err(anyhow::anyhow!("interrupted"))
        }
    };

    agent.cleanup().await;
    outcome
}
