use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cv_rag::document::{convert_to_text, Document};
use cv_rag::openai::{OpenAiClient, OpenAiConfig};
use cv_rag::rag::{RagConfig, RagEngine};

/// Answer questions about a CV using retrieval-augmented generation
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the chat endpoint over HTTP (default)
    Serve(ServeArgs),
    /// Ask questions interactively on the terminal
    Ask {
        /// Path to the CV (text, markdown or PDF)
        #[arg(long, env = "CV_PATH", default_value = "assets/maia_cv.md")]
        cv: PathBuf,
    },
    /// Extract and clean a CV into a plain text file
    Convert {
        #[arg(index = 1)]
        input: PathBuf,
        #[arg(index = 2, default_value = "assets/maia_cv.md")]
        output: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Path to the CV (text, markdown or PDF)
    #[arg(long, env = "CV_PATH", default_value = "assets/maia_cv.md")]
    cv: PathBuf,
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
}

/// Load the CV and build the engine; any failure here stops startup
async fn build_engine(cv: &Path) -> Result<RagEngine> {
    let document = Document::from_file(cv).context("Failed to load CV")?;
    info!("Loaded {} ({})", document.document_id, document.mime_type);

    let openai_config = OpenAiConfig::from_env().context("Missing OpenAI configuration")?;
    let client = Arc::new(OpenAiClient::new(openai_config));

    RagEngine::build(
        &document.content,
        client.clone(),
        client,
        RagConfig::default(),
    )
    .await
    .context("Failed to build CV index")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Without a subcommand, serve using env vars and defaults
    let command = args
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::parse_from(["serve"])));

    match command {
        Command::Serve(ServeArgs { cv, host, port }) => {
            let engine = Arc::new(build_engine(&cv).await?);
            let addr = format!("{}:{}", host, port);
            cv_rag::server::serve(engine, &addr)
                .await
                .context("Server error")?;
        }
        Command::Ask { cv } => {
            let engine = build_engine(&cv).await?;
            engine
                .run_query_loop()
                .await
                .context("Error in query loop")?;
        }
        Command::Convert { input, output } => {
            let written = convert_to_text(&input, &output).context("Failed to convert CV")?;
            info!("Wrote {} bytes", written);
        }
    }

    Ok(())
}
