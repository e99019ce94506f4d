use crate::view_model::AppViewModel;
use crate::{Job, JobKind, TaskId};

/// Lifecycle of the job monitor owned by one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonitorPhase {
    /// No job tracked.
    #[default]
    Idle,
    /// A task id is assigned and its poll session is running.
    Polling,
    /// The tracked job reached a terminal state and polling was released.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    api_origin: String,
    phase: MonitorPhase,
    in_flight: Option<JobKind>,
    job: Option<Job>,
    download_href: Option<String>,
    notice: Option<String>,
    dirty: bool,
}

impl AppState {
    /// `api_origin` is used to absolutize root-relative download references.
    pub fn new(api_origin: impl Into<String>) -> Self {
        Self {
            api_origin: api_origin.into(),
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            in_flight: self.in_flight,
            task_id: self.job.as_ref().map(|job| job.id.clone()),
            job_state: self.job.as_ref().map(|job| job.state),
            progress: self.job.as_ref().and_then(|job| job.progress),
            result: self.job.as_ref().and_then(|job| job.result.clone()),
            error: self.job.as_ref().and_then(|job| job.error.clone()),
            download_href: self.download_href.clone(),
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn in_flight(&self) -> Option<JobKind> {
        self.in_flight
    }

    pub fn api_origin(&self) -> &str {
        &self.api_origin
    }

    /// Task id currently being polled, if any.
    pub fn polling_task(&self) -> Option<&str> {
        match self.phase {
            MonitorPhase::Polling => self.job.as_ref().map(|job| job.id.as_str()),
            MonitorPhase::Idle | MonitorPhase::Done => None,
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Forgets the previous job and marks `kind` as submitting.
    pub(crate) fn begin_submission(&mut self, kind: JobKind) {
        self.phase = MonitorPhase::Idle;
        self.in_flight = Some(kind);
        self.job = None;
        self.download_href = None;
        self.notice = None;
        self.mark_dirty();
    }

    pub(crate) fn start_polling(&mut self, kind: JobKind, task_id: TaskId) {
        self.phase = MonitorPhase::Polling;
        self.in_flight = Some(kind);
        self.job = Some(Job::new(task_id, kind));
        self.download_href = None;
        self.mark_dirty();
    }

    pub(crate) fn job_mut(&mut self) -> Option<&mut Job> {
        self.job.as_mut()
    }

    /// Releases the monitor after a terminal outcome.
    pub(crate) fn finish(&mut self, notice: String, download_href: Option<String>) {
        self.phase = MonitorPhase::Done;
        self.in_flight = None;
        self.download_href = download_href;
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn abandon_submission(&mut self, notice: String) {
        self.in_flight = None;
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn set_notice(&mut self, notice: String) {
        self.notice = Some(notice);
        self.mark_dirty();
    }

    pub(crate) fn tear_down(&mut self) {
        if self.phase == MonitorPhase::Polling {
            self.phase = MonitorPhase::Idle;
        }
        self.in_flight = None;
        self.mark_dirty();
    }
}
