#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User asked for a course export.
    ExportRequested { filters: crate::ExportFilters },
    /// User picked a CSV to import.
    ImportRequested { source: crate::ImportSource },
    /// Submission endpoint answered with a task id.
    SubmissionAccepted {
        kind: crate::JobKind,
        task_id: crate::TaskId,
    },
    /// Submission endpoint failed.
    SubmissionFailed {
        kind: crate::JobKind,
        message: String,
    },
    /// One poll tick answered.
    StatusReceived {
        task_id: crate::TaskId,
        status: crate::TaskStatus,
    },
    /// One poll tick could not be completed; the session keeps going.
    StatusQueryFailed {
        task_id: crate::TaskId,
        message: String,
    },
    /// The poll session hit its attempt limit.
    PollingExhausted { task_id: crate::TaskId, attempts: u32 },
    /// The surface owning the monitor is going away.
    Teardown,
    /// Fallback for placeholder wiring.
    NoOp,
}
