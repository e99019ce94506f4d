use std::fmt;

pub type TaskId = String;

/// Which bulk operation a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Export,
    Import,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Export => write!(f, "export"),
            JobKind::Import => write!(f, "import"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Pending,
    Started,
    InProgress,
    Succeeded,
    Failed,
}

impl JobState {
    /// Parses a broker state name. `RETRY` counts as started, `REVOKED` as failed.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let state = match raw.to_ascii_uppercase().as_str() {
            "PENDING" => JobState::Pending,
            "STARTED" | "RETRY" => JobState::Started,
            "PROGRESS" | "IN_PROGRESS" => JobState::InProgress,
            "SUCCESS" => JobState::Succeeded,
            "FAILURE" | "REVOKED" => JobState::Failed,
            _ => return None,
        };
        Some(state)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Position in the forward-only lifecycle.
    pub fn rank(self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Started => 1,
            JobState::InProgress => 2,
            JobState::Succeeded | JobState::Failed => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Started => "STARTED",
            JobState::InProgress => "PROGRESS",
            JobState::Succeeded => "SUCCESS",
            JobState::Failed => "FAILURE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressMeta {
    pub ok: Option<u64>,
    pub fail: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskResult {
    pub download_url: Option<String>,
    pub ok: Option<u64>,
    pub fail: Option<u64>,
    pub count: Option<u64>,
}

/// One status report for a job, as returned by the task endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub state: JobState,
    pub meta: Option<ProgressMeta>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
}

impl TaskStatus {
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            meta: None,
            result: None,
            error: None,
        }
    }
}

/// Client-side view of a server job, folded from the status reports seen so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: TaskId,
    pub kind: JobKind,
    pub state: JobState,
    pub progress: Option<ProgressMeta>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(id: TaskId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            state: JobState::Pending,
            progress: None,
            result: None,
            error: None,
        }
    }

    /// Applies a status report. Returns false when the report would move the
    /// job backwards or the job is already terminal.
    pub fn apply(&mut self, status: TaskStatus) -> bool {
        if self.state.is_terminal() || status.state.rank() < self.state.rank() {
            return false;
        }
        self.state = status.state;
        match status.state {
            JobState::InProgress => {
                if status.meta.is_some() {
                    self.progress = status.meta;
                }
            }
            JobState::Succeeded => {
                self.progress = None;
                self.result = Some(status.result.unwrap_or_default());
            }
            JobState::Failed => {
                self.progress = None;
                self.error = Some(status.error.unwrap_or_default());
            }
            JobState::Pending | JobState::Started => {}
        }
        true
    }
}
