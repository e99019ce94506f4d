use std::sync::Arc;
use std::time::Duration;

use campus_core::TaskId;
use campus_logging::{campus_debug, campus_info, campus_warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, StatusFetcher};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` keeps polling until the job is terminal or the session is cancelled.
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: UnboundedSender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Keeps at most one poll session alive.
pub struct JobMonitor {
    fetcher: Arc<dyn StatusFetcher>,
    sink: Arc<dyn EventSink>,
    settings: PollSettings,
    session: Option<PollSession>,
}

impl JobMonitor {
    pub fn new(
        fetcher: Arc<dyn StatusFetcher>,
        sink: Arc<dyn EventSink>,
        settings: PollSettings,
    ) -> Self {
        Self {
            fetcher,
            sink,
            settings,
            session: None,
        }
    }

    /// Starts polling `task_id`, cancelling whatever was polled before.
    /// Must be called from within a tokio runtime.
    pub fn watch(&mut self, task_id: impl Into<TaskId>) {
        self.cancel();
        let session = PollSession::spawn(
            self.fetcher.clone(),
            self.sink.clone(),
            self.settings.clone(),
            task_id.into(),
        );
        self.session = Some(session);
    }

    /// Idempotent.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel();
        }
    }

    /// Task id of a session that is still running.
    pub fn current_task(&self) -> Option<&str> {
        self.session
            .as_ref()
            .filter(|session| !session.is_finished())
            .map(PollSession::task_id)
    }

    pub fn is_polling(&self) -> bool {
        self.current_task().is_some()
    }
}

/// One timer-driven loop tracking a single job. Dropping it cancels the loop.
pub struct PollSession {
    task_id: TaskId,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollSession {
    pub fn spawn(
        fetcher: Arc<dyn StatusFetcher>,
        sink: Arc<dyn EventSink>,
        settings: PollSettings,
        task_id: TaskId,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(run_session(
            fetcher,
            sink,
            settings,
            task_id.clone(),
            token.clone(),
        ));
        Self {
            task_id,
            token,
            handle,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.token.is_cancelled() || self.handle.is_finished()
    }
}

impl Drop for PollSession {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_session(
    fetcher: Arc<dyn StatusFetcher>,
    sink: Arc<dyn EventSink>,
    settings: PollSettings,
    task_id: TaskId,
    token: CancellationToken,
) {
    // First tick completes immediately, later ones every `interval`.
    let mut ticker = tokio::time::interval(settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts: u32 = 0;

    campus_info!("Polling task {} every {:?}", task_id, settings.interval);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        attempts = attempts.saturating_add(1);
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = fetcher.fetch_status(&task_id) => result,
        };
        if token.is_cancelled() {
            break;
        }

        let terminal = match &result {
            Ok(status) => {
                campus_debug!("Task {} is {}", task_id, status.state.label());
                status.state.is_terminal()
            }
            Err(err) => {
                campus_warn!("Status query for task {} failed ({}): {}", task_id, err.kind, err);
                false
            }
        };
        sink.emit(EngineEvent::TaskStatus {
            task_id: task_id.clone(),
            result,
        });
        if terminal {
            campus_info!("Task {} reached a terminal state after {} polls", task_id, attempts);
            return;
        }

        if settings.max_attempts.is_some_and(|max| attempts >= max) {
            campus_warn!("Giving up on task {} after {} polls", task_id, attempts);
            sink.emit(EngineEvent::PollingExhausted {
                task_id: task_id.clone(),
                attempts,
            });
            return;
        }
    }
    campus_debug!("Poll session for task {} cancelled", task_id);
}
