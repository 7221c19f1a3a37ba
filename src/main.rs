use anyhow::{Context, Result};
use askdb::config::{split_tables, AppConfig};
use askdb::db::{SchemaDescription, SchemaIntrospector};
use askdb::execution::PgExecutor;
use askdb::llm::client_from_config;
use askdb::safety::SafetyGate;
use askdb::{QueryOutcome, QueryPipeline};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "askdb")]
#[command(about = "Ask a PostgreSQL database questions in plain language")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Database host (or set PGHOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Database port (or set PGPORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Database name (or set PGDATABASE)
    #[arg(long, global = true)]
    dbname: Option<String>,

    /// Database user (or set PGUSER)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Database password (or set PGPASSWORD)
    #[arg(long, global = true)]
    password: Option<String>,

    /// Full connection URL (or set DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Comma separated tables the prompt is scoped to (or set ASKDB_TABLES)
    #[arg(long, global = true, value_delimiter = ',')]
    tables: Option<Vec<String>>,

    /// Completion backend
    #[arg(long, global = true, value_enum)]
    provider: Option<Provider>,

    /// Base URL of the completion backend
    #[arg(long, global = true)]
    llm_url: Option<String>,

    /// Path of the GGUF model served by llama.cpp (or set ASKDB_MODEL_PATH)
    #[arg(long, global = true)]
    model_path: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Also require the statement to parse as exactly one query
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session, one question per line (default)
    Repl,
    /// Answer a single question and exit
    Ask {
        /// The question in natural language
        question: String,
    },
    /// Print the schema description the prompt is grounded on
    Schema,
}

#[derive(Clone, Copy, ValueEnum)]
enum Provider {
    Llama,
    Openai,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("askdb=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let schema = SchemaIntrospector::new(&config.database)
        .describe(&config.tables)
        .await
        .context("Failed to load database schema")?;

    match args.command.unwrap_or(Commands::Repl) {
        Commands::Schema => {
            println!("{}", schema);
            Ok(())
        }
        Commands::Ask { question } => {
            let pipeline = build_pipeline(&config, &schema)?;
            print_outcome(&pipeline.run(&question).await)
        }
        Commands::Repl => {
            let pipeline = build_pipeline(&config, &schema)?;
            repl(&pipeline).await
        }
    }
}

fn build_config(args: &Args) -> Result<AppConfig> {
    let overrides = lookup_overrides(args);
    let mut config = AppConfig::from_lookup(|key| {
        overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    })?;

    let db = &mut config.database;
    if let Some(host) = &args.host {
        db.host = host.clone();
    }
    if let Some(port) = args.port {
        db.port = port;
    }
    if let Some(dbname) = &args.dbname {
        db.dbname = dbname.clone();
    }
    if let Some(user) = &args.user {
        db.user = user.clone();
    }
    if args.password.is_some() {
        db.password = args.password.clone();
    }
    if args.database_url.is_some() {
        db.url = args.database_url.clone();
    }

    if let Some(tables) = &args.tables {
        config.tables = split_tables(&tables.join(","));
    }

    config.strict |= args.strict;
    Ok(config)
}

/// Completion flags shadow their environment variables.
fn lookup_overrides(args: &Args) -> HashMap<&'static str, String> {
    let mut overrides = HashMap::new();
    if let Some(provider) = args.provider {
        let name = match provider {
            Provider::Llama => "llama",
            Provider::Openai => "openai",
        };
        overrides.insert("ASKDB_PROVIDER", name.to_string());
    }
    if let Some(url) = &args.llm_url {
        // only the selected provider reads its own key
        overrides.insert("ASKDB_LLM_URL", url.clone());
        overrides.insert("OPENAI_BASE_URL", url.clone());
    }
    if let Some(api_key) = &args.api_key {
        overrides.insert("OPENAI_API_KEY", api_key.clone());
    }
    if let Some(path) = &args.model_path {
        overrides.insert("ASKDB_MODEL_PATH", path.clone());
    }
    overrides
}

fn build_pipeline(config: &AppConfig, schema: &SchemaDescription) -> Result<QueryPipeline> {
    let completion = client_from_config(&config.provider, &config.model);
    let executor = PgExecutor::new(&config.database)?;

    let mut pipeline = QueryPipeline::new(schema, completion, Box::new(executor));
    if config.strict {
        info!("Strict safety gate enabled");
        pipeline = pipeline.with_gate(SafetyGate::strict());
    }
    Ok(pipeline)
}

async fn repl(pipeline: &QueryPipeline) -> Result<()> {
    println!("🔍 Ask your database a question (CTRL+C to exit)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        // an interrupt aborts whatever is in flight, including a running query
        let step = async {
            match lines.next_line().await? {
                Some(question) => {
                    let outcome = pipeline.run(&question).await;
                    print_outcome(&outcome)?;
                    Ok::<bool, anyhow::Error>(true)
                }
                None => Ok(false),
            }
        };

        tokio::select! {
            result = step => {
                if !result? {
                    println!("\nExiting...");
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nExiting...");
                // the stdin reader thread may still be blocked; don't wait for it
                std::process::exit(0);
            }
        }
    }
}

fn print_outcome(outcome: &QueryOutcome) -> Result<()> {
    println!("🧾 Result:\n{}", outcome.to_pretty_json()?);
    Ok(())
}
