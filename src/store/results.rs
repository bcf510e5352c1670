//! SQLite-backed benchmark store.
//!
//! Two tables: `test_cases` holds the imported GAIA validation cases,
//! `benchmark_results` records one row per reviewed model answer.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection};

/// Status recorded when the expected answer appears in the model's answer.
pub const STATUS_ACCEPTED: &str = "Accepted";
/// Status recorded otherwise.
pub const STATUS_FAILED: &str = "Failed";

/// Case-insensitive containment check between expected and model answers.
///
/// GAIA scores exact-match on short factoids; for review purposes the
/// model's longer prose counts as correct when the expected answer,
/// trimmed and lowercased, appears anywhere inside it.
pub fn answer_matches(expected: &str, actual: &str) -> bool {
    actual
        .trim()
        .to_lowercase()
        .contains(&expected.trim().to_lowercase())
}

pub fn verdict_status(expected: &str, actual: &str) -> &'static str {
    if answer_matches(expected, actual) {
        STATUS_ACCEPTED
    } else {
        STATUS_FAILED
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `test_cases` table.
#[derive(Debug, Clone)]
pub struct TestCaseRow {
    /// Position in the imported dataset, kept for stable listing order.
    pub case_index: i64,
    pub task_id: String,
    pub question: String,
    pub level: i64,
    pub answer: String,
    pub file_name: Option<String>,
    pub file_path: Option<String>,
    pub steps: String,
    pub num_steps: String,
    pub time_taken: String,
    pub tools: String,
    pub num_tools: Option<i64>,
}

impl TestCaseRow {
    /// Blob-store key for the case's attachment, if it has one.
    pub fn attachment_key(&self) -> Option<&str> {
        fn nonempty(s: &Option<String>) -> Option<&str> {
            s.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }
        nonempty(&self.file_path).or_else(|| nonempty(&self.file_name))
    }
}

/// A row from the `benchmark_results` table.
#[derive(Debug, Clone)]
pub struct BenchmarkResultRow {
    pub result_id: i64,
    pub llm_answer: String,
    pub is_cot: bool,
    pub model_name: String,
    pub prompted_question: String,
    pub task_id: String,
    pub status: String,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// BenchmarkStore
// ---------------------------------------------------------------------------

/// Thread-safe SQLite store for test cases and benchmark results.
///
/// rusqlite's `Connection` is not `Sync`, so it sits behind a sync
/// `Mutex`. All methods are synchronous; async callers wrap them in
/// `spawn_blocking` when contention matters.
pub struct BenchmarkStore {
    conn: Mutex<Connection>,
}

impl BenchmarkStore {
    /// Open the database at `db_path`, creating it and its schema on
    /// first use.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;

        // Performance pragmas.
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Idempotent schema creation.
    fn migrate(conn: &Connection) -> anyhow::Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS test_cases (
                 case_index INTEGER,
                 task_id TEXT PRIMARY KEY,
                 question TEXT NOT NULL,
                 level INTEGER NOT NULL,
                 answer TEXT NOT NULL,
                 file_name TEXT,
                 file_path TEXT,
                 metadata_steps TEXT NOT NULL,
                 metadata_num_steps TEXT NOT NULL,
                 metadata_time_taken TEXT NOT NULL,
                 metadata_tools TEXT NOT NULL,
                 metadata_num_tools INTEGER,
                 created_at TEXT NOT NULL,
                 modified_at TEXT NOT NULL
             );

             CREATE TABLE IF NOT EXISTS benchmark_results (
                 result_id INTEGER PRIMARY KEY AUTOINCREMENT,
                 llm_answer TEXT,
                 is_cot INTEGER NOT NULL DEFAULT 0,
                 model_name TEXT NOT NULL,
                 prompted_question TEXT NOT NULL,
                 task_id TEXT NOT NULL,
                 status TEXT NOT NULL,
                 created_at TEXT NOT NULL
             );

             CREATE INDEX IF NOT EXISTS idx_results_task ON benchmark_results(task_id);
             CREATE INDEX IF NOT EXISTS idx_results_model ON benchmark_results(model_name);",
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Test cases
    // ------------------------------------------------------------------

    /// Insert or replace a test case. Re-imports overwrite in place.
    pub fn upsert_test_case(&self, case: &TestCaseRow) -> anyhow::Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO test_cases (
                 case_index, task_id, question, level, answer,
                 file_name, file_path,
                 metadata_steps, metadata_num_steps, metadata_time_taken,
                 metadata_tools, metadata_num_tools,
                 created_at, modified_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                case.case_index,
                case.task_id,
                case.question,
                case.level,
                case.answer,
                case.file_name,
                case.file_path,
                case.steps,
                case.num_steps,
                case.time_taken,
                case.tools,
                case.num_tools,
                now,
            ],
        )?;
        Ok(())
    }

    /// All test cases in dataset order.
    pub fn fetch_all_tests(&self) -> Vec<TestCaseRow> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(&format!(
            "{SELECT_CASE} FROM test_cases ORDER BY case_index, task_id"
        )) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };

        stmt.query_map([], row_to_case)
            .map(|rows| rows.filter_map(Result::ok).collect())
            .unwrap_or_default()
    }

    pub fn fetch_test_by_id(&self, task_id: &str) -> Option<TestCaseRow> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("{SELECT_CASE} FROM test_cases WHERE task_id = ?1"),
            params![task_id],
            row_to_case,
        )
        .ok()
    }

    // ------------------------------------------------------------------
    // Benchmark results
    // ------------------------------------------------------------------

    /// Record one reviewed answer. Returns the new row id.
    #[allow(clippy::too_many_arguments)]
    pub fn create_benchmark_result(
        &self,
        llm_answer: &str,
        is_cot: bool,
        model_name: &str,
        prompted_question: &str,
        task_id: &str,
        status: &str,
    ) -> anyhow::Result<i64> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO benchmark_results (
                 llm_answer, is_cot, model_name, prompted_question,
                 task_id, status, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                llm_answer,
                is_cot,
                model_name,
                prompted_question,
                task_id,
                status,
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All recorded results, oldest first.
    pub fn fetch_benchmark_results(&self) -> Vec<BenchmarkResultRow> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = match conn.prepare(
            "SELECT result_id, llm_answer, is_cot, model_name,
                    prompted_question, task_id, status, created_at
             FROM benchmark_results ORDER BY result_id",
        ) {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };

        stmt.query_map([], |row| {
            Ok(BenchmarkResultRow {
                result_id: row.get(0)?,
                llm_answer: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                is_cot: row.get(2)?,
                model_name: row.get(3)?,
                prompted_question: row.get(4)?,
                task_id: row.get(5)?,
                status: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .map(|rows| rows.filter_map(Result::ok).collect())
        .unwrap_or_default()
    }
}

const SELECT_CASE: &str = "SELECT case_index, task_id, question, level, answer,
        file_name, file_path,
        metadata_steps, metadata_num_steps, metadata_time_taken,
        metadata_tools, metadata_num_tools";

fn row_to_case(row: &rusqlite::Row<'_>) -> rusqlite::Result<TestCaseRow> {
    Ok(TestCaseRow {
        case_index: row.get::<_, Option<i64>>(0)?.unwrap_or(0),
        task_id: row.get(1)?,
        question: row.get(2)?,
        level: row.get(3)?,
        answer: row.get(4)?,
        file_name: row.get(5)?,
        file_path: row.get(6)?,
        steps: row.get(7)?,
        num_steps: row.get(8)?,
        time_taken: row.get(9)?,
        tools: row.get(10)?,
        num_tools: row.get(11)?,
    })
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Table of per-model acceptance counts: model | accepted | failed | accuracy.
pub fn format_summary(results: &[BenchmarkResultRow]) -> String {
    if results.is_empty() {
        return "No benchmark results found.\n".to_string();
    }

    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for result in results {
        let entry = counts.entry(result.model_name.as_str()).or_default();
        if result.status == STATUS_ACCEPTED {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:<36} {:>9} {:>7} {:>9}\n",
        "Model", "Accepted", "Failed", "Accuracy"
    ));
    output.push_str(&"-".repeat(64));
    output.push('\n');

    for (model, (accepted, failed)) in counts {
        let total = accepted + failed;
        let accuracy = accepted as f64 / total as f64 * 100.0;
        output.push_str(&format!(
            "{:<36} {:>9} {:>7} {:>8.1}%\n",
            model, accepted, failed, accuracy
        ));
    }

    output
}
