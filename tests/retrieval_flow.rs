//! End-to-end tests for the document retrieval lane.
//!
//! 1. A full invocation uploads, runs, and returns the answer with its
//!    citations rewritten into a bibliography
//! 2. The assistant/vector-store binding is verified once per invoker,
//!    including under concurrent first invocations
//! 3. Failed and stuck runs surface as typed errors without output

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gaiabench::backend::base::AssistantBackend;
use gaiabench::backend::types::{
    Annotation, Assistant, FileCitation, FileObject, FileSearchResources, MessageContent,
    MessageObject, MessageText, RunObject, RunStatus, ThreadObject, ToolResources,
};
use gaiabench::blob::resolver::{extension_of, ResolvedFile};
use gaiabench::config::schema::{InvokeDefaults, OpenAiConfig};
use gaiabench::errors::InvokeError;
use gaiabench::invoke::retrieval::RetrievalInvoker;

// ─────────────────────────────────────────────────────────────
// Double
// ─────────────────────────────────────────────────────────────

/// Scripted assistants backend covering the whole retrieval flow.
struct ScriptedBackend {
    has_store: bool,
    initial_status: RunStatus,
    /// Statuses returned by successive polls; empty means stuck in progress.
    run_statuses: Mutex<Vec<RunStatus>>,
    answer_value: String,
    annotations: Vec<Annotation>,
    files: HashMap<String, String>,
    retrieve_assistant_calls: AtomicUsize,
    attach_calls: AtomicUsize,
    uploads: AtomicUsize,
    polls: AtomicUsize,
}

impl ScriptedBackend {
    /// Backend whose runs complete immediately and whose assistant already
    /// has the vector store bound.
    fn completing(answer: &str) -> Self {
        Self {
            has_store: true,
            initial_status: RunStatus::Completed,
            run_statuses: Mutex::new(Vec::new()),
            answer_value: answer.to_string(),
            annotations: Vec::new(),
            files: HashMap::new(),
            retrieve_assistant_calls: AtomicUsize::new(0),
            attach_calls: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn retrieve_assistant(&self, assistant_id: &str) -> Result<Assistant, InvokeError> {
        self.retrieve_assistant_calls.fetch_add(1, Ordering::SeqCst);
        let file_search = self.has_store.then(|| FileSearchResources {
            vector_store_ids: vec!["vs_1".to_string()],
        });
        Ok(Assistant {
            id: assistant_id.to_string(),
            tool_resources: ToolResources { file_search },
        })
    }

    async fn attach_vector_store(
        &self,
        assistant_id: &str,
        vector_store_id: &str,
    ) -> Result<Assistant, InvokeError> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Assistant {
            id: assistant_id.to_string(),
            tool_resources: ToolResources {
                file_search: Some(FileSearchResources {
                    vector_store_ids: vec![vector_store_id.to_string()],
                }),
            },
        })
    }

    async fn upload_file(&self, path: &Path) -> Result<FileObject, InvokeError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(FileObject {
            id: "file-up".to_string(),
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        })
    }

    async fn retrieve_file(&self, file_id: &str) -> Result<FileObject, InvokeError> {
        match self.files.get(file_id) {
            Some(filename) => Ok(FileObject {
                id: file_id.to_string(),
                filename: filename.clone(),
            }),
            None => Err(InvokeError::UpstreamStatus {
                status: 404,
                body: format!("unknown file {file_id}"),
            }),
        }
    }

    async fn create_thread_with_attachment(
        &self,
        _question: &str,
        _file_id: &str,
    ) -> Result<ThreadObject, InvokeError> {
        Ok(ThreadObject {
            id: "thread-1".to_string(),
        })
    }

    async fn create_run(
        &self,
        thread_id: &str,
        _assistant_id: &str,
        _model: &str,
    ) -> Result<RunObject, InvokeError> {
        Ok(RunObject {
            id: "run-1".to_string(),
            thread_id: thread_id.to_string(),
            status: self.initial_status,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, InvokeError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.run_statuses.lock().unwrap();
        let status = if statuses.is_empty() {
            RunStatus::InProgress
        } else {
            statuses.remove(0)
        };
        Ok(RunObject {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status,
        })
    }

    async fn list_run_messages(
        &self,
        _thread_id: &str,
        _run_id: &str,
    ) -> Result<Vec<MessageObject>, InvokeError> {
        Ok(vec![MessageObject {
            id: "msg-1".to_string(),
            role: "assistant".to_string(),
            content: vec![MessageContent::Text {
                text: MessageText {
                    value: self.answer_value.clone(),
                    annotations: self.annotations.clone(),
                },
            }],
        }])
    }
}

fn build_invoker(backend: Arc<ScriptedBackend>, defaults: InvokeDefaults) -> RetrievalInvoker {
    let openai = OpenAiConfig {
        api_key: "sk-test".to_string(),
        assistant_id: Some("asst_1".to_string()),
        vector_store_id: Some("vs_1".to_string()),
        ..OpenAiConfig::default()
    };
    RetrievalInvoker::new(backend, &openai, &defaults)
}

fn doc_file(dir: &Path, name: &str) -> ResolvedFile {
    ResolvedFile {
        bytes: b"attachment content".to_vec(),
        local_path: dir.join(name),
        extension: extension_of(name),
    }
}

fn annotation(value: &str, placeholder: &str, file_id: &str) -> Annotation {
    let start = value.find(placeholder).unwrap();
    Annotation {
        text: placeholder.to_string(),
        start_index: start,
        end_index: start + placeholder.len(),
        file_citation: Some(FileCitation {
            file_id: file_id.to_string(),
        }),
    }
}

// ─────────────────────────────────────────────────────────────
// Happy path
// ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_retrieval_answer_carries_citations() {
    let value = "Signed in 1951【4:0†src】 and ratified later【4:1†src】.";
    let mut backend = ScriptedBackend::completing(value);
    backend.annotations = vec![
        annotation(value, "【4:0†src】", "file-a"),
        annotation(value, "【4:1†src】", "file-b"),
    ];
    backend.files = HashMap::from([
        ("file-a".to_string(), "treaty.pdf".to_string()),
        ("file-b".to_string(), "ratification.pdf".to_string()),
    ]);
    let backend = Arc::new(backend);
    let invoker = build_invoker(backend.clone(), InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();

    let answer = invoker
        .invoke("gpt-4o", "When was it signed?", &doc_file(dir.path(), "treaty.txt"))
        .await
        .unwrap();

    assert_eq!(
        answer,
        "Signed in 1951[0] and ratified later[1].\n\n[0] treaty.pdf\n[1] ratification.pdf"
    );
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_answer_without_annotations_has_no_bibliography() {
    let backend = Arc::new(ScriptedBackend::completing("Plain answer."));
    let invoker = build_invoker(backend, InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();

    let answer = invoker
        .invoke("gpt-4o", "q", &doc_file(dir.path(), "notes.md"))
        .await
        .unwrap();

    assert_eq!(answer, "Plain answer.");
}

// ─────────────────────────────────────────────────────────────
// Vector store binding
// ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unbound_store_is_attached_once_per_invoker() {
    let mut backend = ScriptedBackend::completing("ok");
    backend.has_store = false;
    let backend = Arc::new(backend);
    let invoker = build_invoker(backend.clone(), InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();
    let file = doc_file(dir.path(), "a.txt");

    invoker.invoke("gpt-4o", "first", &file).await.unwrap();
    invoker.invoke("gpt-4o", "second", &file).await.unwrap();

    assert_eq!(backend.retrieve_assistant_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.attach_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bound_store_is_not_reattached() {
    let backend = Arc::new(ScriptedBackend::completing("ok"));
    let invoker = build_invoker(backend.clone(), InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();

    invoker
        .invoke("gpt-4o", "q", &doc_file(dir.path(), "a.txt"))
        .await
        .unwrap();

    assert_eq!(backend.retrieve_assistant_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.attach_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_concurrent_first_invocations_attach_once() {
    let mut backend = ScriptedBackend::completing("ok");
    backend.has_store = false;
    let backend = Arc::new(backend);
    let invoker = build_invoker(backend.clone(), InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();
    let file = doc_file(dir.path(), "a.txt");

    let (first, second) = tokio::join!(
        invoker.invoke("gpt-4o", "one", &file),
        invoker.invoke("gpt-4o", "two", &file),
    );

    first.unwrap();
    second.unwrap();
    assert_eq!(backend.retrieve_assistant_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.attach_calls.load(Ordering::SeqCst), 1);
}

// ─────────────────────────────────────────────────────────────
// Failure paths
// ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_failed_run_surfaces_job_status() {
    let mut backend = ScriptedBackend::completing("");
    backend.initial_status = RunStatus::InProgress;
    backend.run_statuses = Mutex::new(vec![RunStatus::Failed]);
    let backend = Arc::new(backend);
    let invoker = build_invoker(backend.clone(), InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();

    let err = invoker
        .invoke("gpt-4o", "q", &doc_file(dir.path(), "a.txt"))
        .await
        .unwrap_err();

    match err {
        InvokeError::UpstreamJob { status } => assert_eq!(status, "failed"),
        other => panic!("expected UpstreamJob, got {other}"),
    }
    assert_eq!(backend.polls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stuck_run_times_out_at_deadline() {
    let mut backend = ScriptedBackend::completing("");
    backend.initial_status = RunStatus::InProgress;
    let backend = Arc::new(backend);
    let defaults = InvokeDefaults {
        run_deadline_secs: 2,
        ..InvokeDefaults::default()
    };
    let invoker = build_invoker(backend.clone(), defaults);
    let dir = tempfile::tempdir().unwrap();

    let err = invoker
        .invoke("gpt-4o", "q", &doc_file(dir.path(), "a.txt"))
        .await
        .unwrap_err();

    match err {
        InvokeError::Timeout { waited_secs } => assert_eq!(waited_secs, 2),
        other => panic!("expected Timeout, got {other}"),
    }
    assert_eq!(backend.polls.load(Ordering::SeqCst), 4);
}

// ─────────────────────────────────────────────────────────────
// Preconditions
// ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unsupported_extension_never_reaches_backend() {
    let backend = Arc::new(ScriptedBackend::completing("ok"));
    let invoker = build_invoker(backend.clone(), InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();

    let err = invoker
        .invoke("gpt-4o", "q", &doc_file(dir.path(), "tool.exe"))
        .await
        .unwrap_err();

    match err {
        InvokeError::UnsupportedFormat { extension } => assert_eq!(extension, ".exe"),
        other => panic!("expected UnsupportedFormat, got {other}"),
    }
    assert_eq!(backend.retrieve_assistant_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_assistant_id_fails_before_any_call() {
    let backend = Arc::new(ScriptedBackend::completing("ok"));
    let openai = OpenAiConfig {
        api_key: "sk-test".to_string(),
        vector_store_id: Some("vs_1".to_string()),
        ..OpenAiConfig::default()
    };
    let invoker = RetrievalInvoker::new(backend.clone(), &openai, &InvokeDefaults::default());
    let dir = tempfile::tempdir().unwrap();

    let err = invoker
        .invoke("gpt-4o", "q", &doc_file(dir.path(), "a.txt"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InvokeError::MissingConfig {
            name: "OPENAI_ASSISTANT_ID"
        }
    ));
    assert_eq!(backend.retrieve_assistant_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.uploads.load(Ordering::SeqCst), 0);
}
