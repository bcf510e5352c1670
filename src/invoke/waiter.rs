//! Polling loop for assistant runs.
//!
//! Runs start `queued`, move to `in_progress`, and land on a terminal
//! status. Only `completed` counts as success; every other terminal
//! status surfaces as an error naming the status the backend reported.
//! A run that never settles is cut off at the deadline.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::backend::base::AssistantBackend;
use crate::backend::types::{RunObject, RunStatus};
use crate::errors::InvokeError;

/// What the waiter does with a run in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Still working, poll again.
    Poll,
    /// Finished with output.
    Done,
    /// Terminal without output.
    Failed,
}

/// Classify a run status. Total over [`RunStatus`].
pub fn disposition(status: RunStatus) -> Disposition {
    match status {
        RunStatus::Queued | RunStatus::InProgress => Disposition::Poll,
        RunStatus::Completed => Disposition::Done,
        RunStatus::RequiresAction
        | RunStatus::Cancelling
        | RunStatus::Cancelled
        | RunStatus::Failed
        | RunStatus::Incomplete
        | RunStatus::Expired => Disposition::Failed,
    }
}

/// Poll `run` at a fixed interval until it reaches a terminal status.
///
/// Returns the completed run, [`InvokeError::UpstreamJob`] for any other
/// terminal status, or [`InvokeError::Timeout`] once `deadline` elapses
/// with the run still unsettled. A run that is already terminal returns
/// without issuing a single poll.
pub async fn wait_for_run(
    backend: &dyn AssistantBackend,
    mut run: RunObject,
    poll_interval: Duration,
    deadline: Duration,
) -> Result<RunObject, InvokeError> {
    let started = Instant::now();
    loop {
        match disposition(run.status) {
            Disposition::Done => return Ok(run),
            Disposition::Failed => {
                return Err(InvokeError::UpstreamJob {
                    status: run.status.to_string(),
                })
            }
            Disposition::Poll => {}
        }
        let waited = started.elapsed();
        if waited >= deadline {
            return Err(InvokeError::Timeout {
                waited_secs: waited.as_secs(),
            });
        }
        sleep(poll_interval).await;
        run = backend.retrieve_run(&run.thread_id, &run.id).await?;
        debug!(run = %run.id, status = %run.status, "polled assistant run");
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::backend::types::{Assistant, FileObject, MessageObject, ThreadObject};

    /// Replays a scripted sequence of run statuses.
    struct ScriptedRuns {
        statuses: Mutex<Vec<RunStatus>>,
        polls: AtomicUsize,
    }

    impl ScriptedRuns {
        fn new(statuses: Vec<RunStatus>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                polls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AssistantBackend for ScriptedRuns {
        async fn retrieve_assistant(&self, _id: &str) -> Result<Assistant, InvokeError> {
            unimplemented!()
        }

        async fn attach_vector_store(
            &self,
            _assistant_id: &str,
            _vector_store_id: &str,
        ) -> Result<Assistant, InvokeError> {
            unimplemented!()
        }

        async fn upload_file(&self, _path: &Path) -> Result<FileObject, InvokeError> {
            unimplemented!()
        }

        async fn retrieve_file(&self, _file_id: &str) -> Result<FileObject, InvokeError> {
            unimplemented!()
        }

        async fn create_thread_with_attachment(
            &self,
            _question: &str,
            _file_id: &str,
        ) -> Result<ThreadObject, InvokeError> {
            unimplemented!()
        }

        async fn create_run(
            &self,
            _thread_id: &str,
            _assistant_id: &str,
            _model: &str,
        ) -> Result<RunObject, InvokeError> {
            unimplemented!()
        }

        async fn retrieve_run(
            &self,
            thread_id: &str,
            run_id: &str,
        ) -> Result<RunObject, InvokeError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let status = statuses.remove(0);
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
            unimplemented!()
        }
    }

    fn run_with(status: RunStatus) -> RunObject {
        RunObject {
            id: "run_1".to_string(),
            thread_id: "thread_1".to_string(),
            status,
        }
    }

    #[test]
    fn test_disposition_covers_all_statuses() {
        assert_eq!(disposition(RunStatus::Queued), Disposition::Poll);
        assert_eq!(disposition(RunStatus::InProgress), Disposition::Poll);
        assert_eq!(disposition(RunStatus::Completed), Disposition::Done);
        for status in [
            RunStatus::RequiresAction,
            RunStatus::Cancelling,
            RunStatus::Cancelled,
            RunStatus::Failed,
            RunStatus::Incomplete,
            RunStatus::Expired,
        ] {
            assert_eq!(disposition(status), Disposition::Failed, "{status}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_completed_run_returns_without_polling() {
        let backend = ScriptedRuns::new(vec![]);
        let run = wait_for_run(
            &backend,
            run_with(RunStatus::Completed),
            Duration::from_millis(500),
            Duration::from_secs(300),
        )
        .await
        .unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_completed() {
        let backend = ScriptedRuns::new(vec![RunStatus::InProgress, RunStatus::Completed]);
        let run = wait_for_run(
            &backend,
            run_with(RunStatus::Queued),
            Duration::from_millis(500),
            Duration::from_secs(300),
        )
        .await
        .unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(backend.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_reports_status() {
        let backend = ScriptedRuns::new(vec![RunStatus::Failed]);
        let err = wait_for_run(
            &backend,
            run_with(RunStatus::InProgress),
            Duration::from_millis(500),
            Duration::from_secs(300),
        )
        .await
        .unwrap_err();
        match err {
            InvokeError::UpstreamJob { status } => assert_eq!(status, "failed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_requires_action_is_terminal() {
        let backend = ScriptedRuns::new(vec![]);
        let err = wait_for_run(
            &backend,
            run_with(RunStatus::RequiresAction),
            Duration::from_millis(500),
            Duration::from_secs(300),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, InvokeError::UpstreamJob { .. }));
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_off_unsettled_run() {
        let backend = ScriptedRuns::new(vec![RunStatus::InProgress; 20]);
        let err = wait_for_run(
            &backend,
            run_with(RunStatus::Queued),
            Duration::from_millis(500),
            Duration::from_secs(3),
        )
        .await
        .unwrap_err();
        match err {
            InvokeError::Timeout { waited_secs } => assert!(waited_secs >= 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
