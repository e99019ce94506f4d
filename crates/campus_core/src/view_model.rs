use crate::{JobKind, JobState, MonitorPhase, ProgressMeta, TaskId, TaskResult};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: MonitorPhase,
    pub in_flight: Option<JobKind>,
    pub task_id: Option<TaskId>,
    pub job_state: Option<JobState>,
    pub progress: Option<ProgressMeta>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
    /// Resolved address of the finished export.
    pub download_href: Option<String>,
    pub notice: Option<String>,
    pub dirty: bool,
}
