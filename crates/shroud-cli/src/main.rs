//! Shroud CLI
//!
//! Hides personal information in text before it is sent to a third party and
//! restores it in the reply

mod commands;
mod config;
mod interactive;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::ShroudConfig;
use shroud_pii::parse_term_list;
use shroud_session::{Session, SessionStore};
use std::io::Read;
use std::path::PathBuf;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "shroud")]
#[command(about = "Anonymize text for third-party services and restore the replies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (YAML or TOML)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "SHROUD_CONFIG",
        global = true
    )]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace personal information with tags; prints the session id on stderr
    Anonymize {
        /// Read text from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Extra terms to hide, separated by commas
        #[arg(short, long)]
        terms: Option<String>,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Restore the originals behind a session's tags
    Revert {
        /// Read text from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(short, long)]
        session: String,

        /// Highlight restored text
        #[arg(long)]
        highlight: bool,
    },
    /// Forget a session and its stored mapping
    Reset {
        #[arg(short, long)]
        session: String,
    },
    /// Print a new base64 session key
    Keygen,
    /// Guided anonymize / restore flow in the terminal
    Interactive {
        /// Load and store this session (needs a session key)
        #[arg(short, long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if let Some(config_path) = &cli.config {
        ShroudConfig::from_file(config_path)?
    } else {
        ShroudConfig::default()
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    init_tracing(&config)?;
    debug!(config_file = ?cli.config, "Configuration loaded");

    match cli.command {
        Commands::Anonymize {
            input,
            terms,
            session,
        } => {
            let engine = config.build_engine()?;
            let store = commands::open_store(&config).await?;
            let session_id = session
                .as_deref()
                .map(commands::parse_session_id)
                .transpose()?;
            let terms = terms.as_deref().map(parse_term_list).unwrap_or_default();
            let text = read_input(input)?;

            let outcome = commands::anonymize(&engine, &store, session_id, &text, &terms).await?;
            eprintln!(
                "Session: {} ({} items hidden)",
                outcome.session_id, outcome.hidden
            );
            print!("{}", outcome.text);
        }
        Commands::Revert {
            input,
            session,
            highlight,
        } => {
            let store = commands::open_store(&config).await?;
            let session_id = commands::parse_session_id(&session)?;
            let text = read_input(input)?;

            let restored = commands::revert(
                &store,
                &session_id,
                &text,
                highlight || config.output.highlight,
            )
            .await?;
            print!("{}", restored);
        }
        Commands::Reset { session } => {
            let store = commands::open_store(&config).await?;
            let session_id = commands::parse_session_id(&session)?;

            if commands::reset(&store, &session_id).await? {
                eprintln!("Session {} reset", session_id);
            } else {
                eprintln!("Session {} had no stored mapping", session_id);
            }
        }
        Commands::Keygen => println!("{}", commands::keygen()),
        Commands::Interactive { session } => {
            let engine = config.build_engine()?;
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let mut output = std::io::stdout();

            match session {
                Some(id) => {
                    let store = commands::open_store(&config).await?;
                    let session_id = commands::parse_session_id(&id)?;
                    let mut session = Session::open(&store, session_id)
                        .await
                        .context("Failed to load session")?;

                    interactive::run(&engine, &mut session, &mut input, &mut output)?;
                    save(&store, &session).await?;
                }
                None => {
                    let mut session = Session::new();
                    interactive::run(&engine, &mut session, &mut input, &mut output)?;
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(config: &ShroudConfig) -> Result<()> {
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // stdout carries the tagged or restored text, so logs go to stderr
    let filter = EnvFilter::new(format!("{}", log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

fn read_input(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}

async fn save(store: &dyn SessionStore, session: &Session) -> Result<()> {
    session
        .save(store)
        .await
        .context("Failed to store session mapping")
}
