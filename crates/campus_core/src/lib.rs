//! Campus core: pure bulk-job state machine, error normalization and input policies.
mod effect;
mod error_payload;
mod href;
mod job;
mod msg;
mod password;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, ExportFilters, ImportSource};
pub use error_payload::{normalize_error, ErrorPayload, UNKNOWN_ERROR};
pub use href::resolve_href;
pub use job::{Job, JobKind, JobState, ProgressMeta, TaskId, TaskResult, TaskStatus};
pub use msg::Msg;
pub use password::{PasswordContext, PasswordPolicy, PolicyViolation, MIN_PASSWORD_LENGTH};
pub use state::{AppState, MonitorPhase};
pub use update::update;
pub use view_model::AppViewModel;
