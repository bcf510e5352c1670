//! gaiabench - evaluate OpenAI models against the GAIA validation benchmark.
//!
//! Questions route through modality lanes based on their attachment: audio
//! is transcribed first, images go inline to a vision completion, documents
//! run through file-search retrieval, and bare questions hit chat directly.

mod cli;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "gaiabench", about = "GAIA validation benchmark harness", version)]
struct Cli {
    /// SQLite database holding test cases and benchmark results.
    #[arg(
        long,
        global = true,
        default_value = "gaiabench.db",
        env = "GAIA_DB_PATH"
    )]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question, optionally with a benchmark attachment.
    Ask {
        /// Question text.
        question: String,
        /// Attachment key or filename in the benchmark blob store.
        #[arg(short, long)]
        file: Option<String>,
        /// Model to invoke (defaults to the configured model).
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Run stored test cases and print each verdict.
    Run {
        /// Task id of a single case to run.
        #[arg(long, conflicts_with = "all")]
        task_id: Option<String>,
        /// Run every stored case.
        #[arg(long)]
        all: bool,
        /// Revised annotator steps appended to the question.
        #[arg(long)]
        steps: Option<String>,
        /// Model to invoke (defaults to the configured model).
        #[arg(short, long)]
        model: Option<String>,
        /// Record one benchmark result row per case.
        #[arg(long)]
        record: bool,
    },
    /// List stored test cases.
    Cases,
    /// Summarize recorded benchmark results per model.
    Report,
    /// Import test cases from a GAIA metadata JSONL file.
    Import {
        /// Path to the JSONL file.
        path: PathBuf,
    },
}

fn main() {
    // Logs go to stderr so stdout stays clean for answers and reports.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            question,
            file,
            model,
        } => cli::cmd_ask(question, file, model),
        Commands::Run {
            task_id,
            all,
            steps,
            model,
            record,
        } => cli::cmd_run(&cli.db, task_id, all, steps, model, record),
        Commands::Cases => cli::cmd_cases(&cli.db),
        Commands::Report => cli::cmd_report(&cli.db),
        Commands::Import { path } => cli::cmd_import(&cli.db, &path),
    }
}
