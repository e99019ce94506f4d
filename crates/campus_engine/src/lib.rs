//! Campus engine: authenticated API client, job polling and local persistence.
mod api;
mod client;
mod engine;
mod monitor;
mod persist;
mod session_store;
mod types;

pub use api::{task_path, Registration, StatusFetcher, TokenPair, UserProfile};
pub use client::{
    AuthenticatedClient, ClientSettings, RequestBody, RequestConfig, Session, DEFAULT_API_BASE,
};
pub use engine::EngineHandle;
pub use monitor::{
    ChannelEventSink, EventSink, JobMonitor, PollSession, PollSettings, DEFAULT_POLL_INTERVAL,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use session_store::{SessionStore, SESSION_FILENAME};
pub use types::{ApiError, ApiErrorKind, EngineEvent};
