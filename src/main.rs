//! Docsift CLI - serve the document API or inspect a local store

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docsift::agent::{schemas, AgentClient, AnthropicClient, MockAgentClient};
use docsift::config::{self, DocsiftConfig};
use docsift::service::{DocumentService, PromptHistory};
use docsift::storage::{open_store, BackendKind, SqliteStore};
use docsift::ui::{self, Icons};

#[derive(Parser)]
#[command(name = "docsift")]
#[command(version)]
#[command(about = "Classify PDF documents and extract structured data with an LLM agent")]
#[command(long_about = r#"
Docsift stores uploaded PDFs, classifies them into document types and
extracts schema-shaped data, keeping an audit trail of every agent call.

Example usage:
  docsift init
  docsift serve --port 8080
  docsift documents --limit 20
  docsift prompts <document-id>
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Path to the database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Storage backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default docsift.toml and ignore the data directory
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        #[command(flatten)]
        store: StoreArgs,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Model used for agent calls
        #[arg(short, long)]
        model: Option<String>,

        /// Answer agent calls with canned results instead of calling the API
        #[arg(long)]
        mock: bool,
    },

    /// List stored documents, newest first
    Documents {
        #[command(flatten)]
        store: StoreArgs,

        /// Maximum number of documents
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Number of documents to skip
        #[arg(short, long, default_value = "0")]
        offset: usize,
    },

    /// Show one document with its classification and extraction
    Show {
        /// Document id
        id: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Classify a stored document
    Classify {
        /// Document id
        id: String,

        #[command(flatten)]
        store: StoreArgs,

        /// Model used for the agent call
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Extract structured data from a stored document
    Extract {
        /// Document id
        id: String,

        /// Document type, overriding the stored classification
        #[arg(short = 't', long = "type")]
        document_type: Option<String>,

        #[command(flatten)]
        store: StoreArgs,

        /// Model used for the agent call
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show the prompt history of a document, or a single prompt record
    Prompts {
        /// Prompt id or document id
        id: String,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// List the known document types
    Types,

    /// Show database statistics
    Stats {
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Init { force } => {
            let path = config::default_config_path();
            let cwd = std::env::current_dir()?;
            let config = DocsiftConfig {
                database: Some(
                    config::default_database_path_in(Path::new("."))
                        .to_string_lossy()
                        .to_string(),
                ),
                backend: Some(BackendKind::Sqlite),
                port: Some(config::DEFAULT_PORT),
                model: Some(docsift::agent::anthropic::DEFAULT_MODEL.to_string()),
            };
            config::write_config(&path, &config, force)?;
            config::ensure_gitignore(&cwd)?;
            ui::success(&format!("Wrote {}", path.display()));
        }

        Commands::Serve { store, port, model, mock } => {
            let config = resolve_config(&store)?;
            let port = port.unwrap_or_else(|| config.port());
            let agent = build_agent(&config, model, mock)?;
            let service = open_service(&store, &config, Some(agent))?;

            ui::header(&format!("docsift listening on port {}", port));
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(docsift::server::start_server(port, service))?;
        }

        Commands::Documents { store, limit, offset } => {
            let service = open_service(&store, &resolve_config(&store)?, None)?;
            let docs = service.list_documents(limit, offset)?;
            if docs.is_empty() {
                println!("{} No documents", Icons::EMPTY);
            } else {
                println!("{}", ui::document_table(&docs));
            }
        }

        Commands::Show { id, store } => {
            let service = open_service(&store, &resolve_config(&store)?, None)?;
            let doc = service.document(&id)?;

            ui::section(&format!("{} {}", Icons::FILE, doc.filename));
            ui::summary_row("ID", &doc.id);
            ui::summary_row("Size", &ui::human_bytes(doc.size.max(0) as u64));
            ui::summary_row("Uploaded", &doc.created_at.to_rfc3339());
            if let Some(classification) = &doc.classification {
                ui::section(&format!("{} Classification", Icons::TAG));
                println!("{}", serde_json::to_string_pretty(classification)?);
            }
            if let Some(extraction) = &doc.extraction {
                ui::section(&format!("{} Extraction", Icons::BRAIN));
                println!("{}", serde_json::to_string_pretty(extraction)?);
            }
        }

        Commands::Classify { id, store, model } => {
            let config = resolve_config(&store)?;
            let agent = build_agent(&config, model, false)?;
            let service = open_service(&store, &config, Some(agent))?;

            let runtime = tokio::runtime::Runtime::new()?;
            let outcome = runtime.block_on(service.classify(&id))?;
            ui::success(&format!(
                "{} ({:.0}% confidence)",
                outcome.classification.document_type,
                outcome.classification.confidence * 100.0
            ));
            ui::info("Reasoning", &outcome.classification.reasoning);
            ui::info("Prompt", &outcome.prompt_id);
        }

        Commands::Extract { id, document_type, store, model } => {
            let config = resolve_config(&store)?;
            let agent = build_agent(&config, model, false)?;
            let service = open_service(&store, &config, Some(agent))?;

            let runtime = tokio::runtime::Runtime::new()?;
            let outcome = runtime.block_on(service.extract(&id, document_type.as_deref()))?;
            ui::success(&format!(
                "Extracted {} fields as {}",
                outcome.extraction.fields.len(),
                outcome.extraction.schema_used
            ));
            println!("{}", serde_json::to_string_pretty(&outcome.extraction.data)?);
            ui::info("Prompt", &outcome.prompt_id);
        }

        Commands::Prompts { id, store } => {
            let service = open_service(&store, &resolve_config(&store)?, None)?;
            match service.prompt_history(&id)? {
                PromptHistory::Single(record) => {
                    ui::section(&format!("{} {} prompt", Icons::BRAIN, record.agent_type));
                    println!("{}", ui::prompt_table(std::slice::from_ref(&record)));
                    ui::section("Prompt");
                    println!("{}", record.prompt);
                    ui::section("Response");
                    println!("{}", record.response);
                }
                PromptHistory::ForDocument(records) if records.is_empty() => {
                    ui::warn(&format!("No prompts recorded for {}", id));
                }
                PromptHistory::ForDocument(records) => {
                    println!("{}", ui::prompt_table(&records));
                    let cost: f64 = records.iter().map(|r| r.total_cost).sum();
                    ui::summary_row(&format!("{} Total cost", Icons::MONEY), &format!("${:.4}", cost));
                }
            }
        }

        Commands::Types => {
            for document_type in schemas::document_types() {
                let marker = if schemas::has_dedicated_schema(document_type) {
                    "dedicated schema"
                } else {
                    "generic schema"
                };
                println!("{} {:<16} {}", Icons::TAG, document_type, marker);
            }
        }

        Commands::Stats { store } => {
            let config = resolve_config(&store)?;
            let backend = store.backend.unwrap_or_else(|| config.backend());
            if backend != BackendKind::Sqlite {
                anyhow::bail!("stats are only available for the sqlite backend");
            }
            let db_path = database_path(&store, &config)?;
            let db = SqliteStore::open(&db_path)?;
            ui::section(&format!("{} {}", Icons::STATS, db_path.display()));
            println!("{}", ui::stats_table(&db.stats()?));
        }
    }

    Ok(())
}

fn resolve_config(store: &StoreArgs) -> anyhow::Result<DocsiftConfig> {
    let config = config::load_config(store.config.as_deref())?.unwrap_or_default();
    config.with_env_overrides()
}

fn database_path(store: &StoreArgs, config: &DocsiftConfig) -> anyhow::Result<PathBuf> {
    match &store.database {
        Some(path) => Ok(path.clone()),
        None => Ok(config.database_path_in(&std::env::current_dir()?)),
    }
}

fn open_service(
    store: &StoreArgs,
    config: &DocsiftConfig,
    agent: Option<Arc<dyn AgentClient>>,
) -> anyhow::Result<DocumentService> {
    let backend = store.backend.unwrap_or_else(|| config.backend());
    let db_path = database_path(store, config)?;
    if backend == BackendKind::Sqlite {
        config::ensure_db_dir(&db_path)?;
        tracing::debug!("Using database {}", db_path.display());
    }
    let shared = open_store(backend, &db_path)?;
    Ok(match agent {
        Some(agent) => DocumentService::new(shared, agent),
        None => DocumentService::read_only(shared),
    })
}

fn build_agent(
    config: &DocsiftConfig,
    model: Option<String>,
    mock: bool,
) -> anyhow::Result<Arc<dyn AgentClient>> {
    if mock {
        ui::warn("Using the mock agent; results are canned");
        return Ok(Arc::new(MockAgentClient::new()));
    }

    let mut client = AnthropicClient::from_env()?;
    if let Some(model) = model.or_else(|| config.model.clone()) {
        client = client.with_model(model);
    }
    tracing::info!("Using model {}", client.model());
    Ok(Arc::new(client))
}
