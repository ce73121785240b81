mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use revqa_core::config::{Config, Settings};
use revqa_rag::{ingest, Chatbot, ConversationTurn};

#[derive(Parser)]
#[command(name = "revqa")]
#[command(about = "Question answering over product reviews with hybrid retrieval", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed the review corpus and (re)build the dense store
    Ingest {
        /// Corpus JSON file or directory (defaults to data.corpus_path)
        #[arg(short, long)]
        corpus: Option<PathBuf>,
    },
    /// Answer a single question from the reviews
    Ask {
        query: String,
    },
    /// Interactive conversation; routes each message to reviews or plain chat
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let settings = load_settings()?;

    match cli.command {
        Commands::Ingest { corpus } => {
            let mut settings = settings;
            if let Some(path) = corpus {
                settings.data.corpus_path = path.to_string_lossy().into_owned();
            }
            let count = ingest(&settings).await?;
            println!("Indexed {} reviews into {}", count, settings.data.lancedb_dir);
        }
        Commands::Ask { query } => {
            let bot = Chatbot::from_settings(&settings)?;
            println!("{}", bot.orchestrator().answer(&query).await);
        }
        Commands::Chat => run_chat(&settings).await?,
    }
    Ok(())
}

fn load_settings() -> Result<Settings> {
    let config = Config::load()?;
    let mut settings = config.settings()?;
    settings.resolve_paths(&std::env::current_dir()?);
    tracing::debug!("Corpus at {}, dense store at {}", settings.data.corpus_path, settings.data.lancedb_dir);
    Ok(settings)
}

async fn run_chat(settings: &Settings) -> Result<()> {
    let bot = Chatbot::from_settings(settings)?;
    let mut turns: Vec<ConversationTurn> = Vec::new();
    let stdin = io::stdin();
    println!("Ask about the reviews, or anything else. Empty line or Ctrl-D quits.");
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
            break;
        }
        turns.push(ConversationTurn::human(line.trim()));
        let reply = bot.reply(&turns).await;
        println!("{reply}\n");
        turns.push(ConversationTurn::ai(reply));
    }
    Ok(())
}
