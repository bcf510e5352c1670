//! CLI subcommand handlers for gaiabench.
//!
//! Command implementations live here so main.rs stays focused on argument
//! parsing and routing. Handlers are synchronous and spin up a tokio
//! runtime only around the async invocation calls.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use gaiabench::config::loader::load_from_env;
use gaiabench::config::schema::Config;
use gaiabench::invoke::{Dispatcher, InvocationRequest};
use gaiabench::store::results::{
    format_summary, verdict_status, BenchmarkStore, TestCaseRow, STATUS_ACCEPTED,
};

pub(crate) fn cmd_ask(question: String, file: Option<String>, model: Option<String>) {
    let config = load_config_or_exit();
    let model = model.unwrap_or_else(|| config.invoke.model.clone());
    let dispatcher = build_dispatcher_or_exit(&config);

    let mut request = InvocationRequest::new(question, model);
    if let Some(key) = file {
        request = request.with_attachment(key);
    }

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let answer = runtime.block_on(dispatcher.invoke_displayable(&request));
    println!("{answer}");
}

pub(crate) fn cmd_run(
    db: &Path,
    task_id: Option<String>,
    all: bool,
    steps: Option<String>,
    model: Option<String>,
    record: bool,
) {
    let store = open_store_or_exit(db);
    let cases: Vec<TestCaseRow> = if all {
        let cases = store.fetch_all_tests();
        if cases.is_empty() {
            eprintln!("No test cases in {}. Import a dataset first.", db.display());
            std::process::exit(1);
        }
        cases
    } else {
        let Some(task_id) = task_id else {
            eprintln!("Pass --task-id <id> or --all.");
            std::process::exit(1);
        };
        match store.fetch_test_by_id(&task_id) {
            Some(case) => vec![case],
            None => {
                eprintln!("No test case with task id {task_id}.");
                std::process::exit(1);
            }
        }
    };

    let config = load_config_or_exit();
    let model = model.unwrap_or_else(|| config.invoke.model.clone());
    let dispatcher = build_dispatcher_or_exit(&config);

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    let total = cases.len();
    let mut accepted = 0usize;

    for case in &cases {
        let question = match &steps {
            Some(steps) => format!("{}\n\n{}", case.question, steps),
            None => case.question.clone(),
        };
        let mut request = InvocationRequest::new(question.clone(), model.clone());
        if let Some(key) = case.attachment_key() {
            request = request.with_attachment(key);
        }

        let answer = runtime.block_on(dispatcher.invoke_displayable(&request));
        let status = verdict_status(&case.answer, &answer);
        if status == STATUS_ACCEPTED {
            accepted += 1;
        }

        println!("== {} (level {})", case.task_id, case.level);
        println!("{answer}");
        println!("verdict: {status} (expected: {})", case.answer);
        println!();

        if record {
            if let Err(e) = store.create_benchmark_result(
                &answer,
                steps.is_some(),
                &model,
                &question,
                &case.task_id,
                status,
            ) {
                warn!("Failed to record result for {}: {}", case.task_id, e);
            }
        }
    }

    println!("{accepted}/{total} accepted");
}

pub(crate) fn cmd_cases(db: &Path) {
    let store = open_store_or_exit(db);
    let cases = store.fetch_all_tests();
    if cases.is_empty() {
        println!("No test cases found.");
        return;
    }

    println!(
        "{:<38} {:>5} {:<30} question",
        "task_id", "level", "attachment"
    );
    println!("{}", "-".repeat(110));
    for case in &cases {
        println!(
            "{:<38} {:>5} {:<30} {}",
            case.task_id,
            case.level,
            case.attachment_key().unwrap_or("-"),
            truncate(&case.question, 60)
        );
    }
    println!("\n{} case(s)", cases.len());
}

pub(crate) fn cmd_report(db: &Path) {
    let store = open_store_or_exit(db);
    let results = store.fetch_benchmark_results();
    print!("{}", format_summary(&results));
}

pub(crate) fn cmd_import(db: &Path, path: &Path) {
    let store = open_store_or_exit(db);
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to open {}: {e}", path.display());
            std::process::exit(1);
        }
    };

    let reader = BufReader::new(file);
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for (line_no, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Read error at line {}: {e}", line_no + 1);
                std::process::exit(1);
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let case: GaiaCase = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no + 1, e);
                skipped += 1;
                continue;
            }
        };
        let row = case.into_row(imported as i64);
        if let Err(e) = store.upsert_test_case(&row) {
            warn!("Failed to store case {}: {}", row.task_id, e);
            skipped += 1;
            continue;
        }
        imported += 1;
    }

    println!(
        "Imported {imported} case(s) from {} ({skipped} skipped).",
        path.display()
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_config_or_exit() -> Config {
    match load_from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    }
}

fn build_dispatcher_or_exit(config: &Config) -> Dispatcher {
    match Dispatcher::from_config(config) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            eprintln!("Failed to initialize model backend: {e}");
            std::process::exit(1);
        }
    }
}

fn open_store_or_exit(db: &Path) -> BenchmarkStore {
    match BenchmarkStore::open(db) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open database {}: {e}", db.display());
            std::process::exit(1);
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

// ---------------------------------------------------------------------------
// GAIA metadata import format
// ---------------------------------------------------------------------------

/// One line of the GAIA `metadata.jsonl` export.
#[derive(Debug, Deserialize)]
struct GaiaCase {
    task_id: String,
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Level")]
    level: LevelField,
    #[serde(rename = "Final answer")]
    final_answer: String,
    #[serde(default)]
    file_name: String,
    #[serde(default)]
    file_path: String,
    #[serde(rename = "Annotator Metadata", default)]
    annotator: AnnotatorMetadata,
}

/// Level appears as a number in some exports and a string in others.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LevelField {
    Number(i64),
    Text(String),
}

impl LevelField {
    fn as_i64(&self) -> i64 {
        match self {
            LevelField::Number(n) => *n,
            LevelField::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AnnotatorMetadata {
    #[serde(rename = "Steps", default)]
    steps: String,
    #[serde(rename = "Number of steps", default)]
    num_steps: String,
    #[serde(rename = "How long did this take?", default)]
    time_taken: String,
    #[serde(rename = "Tools", default)]
    tools: String,
    #[serde(rename = "Number of tools", default)]
    num_tools: String,
}

impl GaiaCase {
    fn into_row(self, case_index: i64) -> TestCaseRow {
        let optional = |s: String| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };
        TestCaseRow {
            case_index,
            task_id: self.task_id,
            question: self.question,
            level: self.level.as_i64(),
            answer: self.final_answer,
            file_name: optional(self.file_name),
            file_path: optional(self.file_path),
            steps: self.annotator.steps,
            num_steps: self.annotator.num_steps,
            time_taken: self.annotator.time_taken,
            tools: self.annotator.tools,
            num_tools: self.annotator.num_tools.trim().parse().ok(),
        }
    }
}
