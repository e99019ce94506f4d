use std::sync::Arc;

use campus_core::{ExportFilters, ImportSource, JobKind, TaskId};
use campus_logging::campus_info;

use crate::client::AuthenticatedClient;
use crate::monitor::{EventSink, JobMonitor, PollSettings};
use crate::{ApiError, EngineEvent};

/// Executes submissions and owns the single poll session of one surface.
/// Results come back through the event sink.
pub struct EngineHandle {
    client: Arc<AuthenticatedClient>,
    sink: Arc<dyn EventSink>,
    monitor: JobMonitor,
}

impl EngineHandle {
    pub fn new(
        client: AuthenticatedClient,
        poll_settings: PollSettings,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let client = Arc::new(client);
        let monitor = JobMonitor::new(client.clone(), sink.clone(), poll_settings);
        Self {
            client,
            sink,
            monitor,
        }
    }

    pub fn client(&self) -> &AuthenticatedClient {
        &self.client
    }

    pub fn submit_export(&self, filters: ExportFilters) {
        let client = self.client.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let result = client.submit_export(&filters).await;
            report_submission(sink.as_ref(), JobKind::Export, result);
        });
    }

    pub fn submit_import(&self, source: ImportSource) {
        let client = self.client.clone();
        let sink = self.sink.clone();
        tokio::spawn(async move {
            let result = client.submit_import(&source).await;
            report_submission(sink.as_ref(), JobKind::Import, result);
        });
    }

    pub fn start_polling(&mut self, task_id: TaskId) {
        self.monitor.watch(task_id);
    }

    pub fn stop_polling(&mut self) {
        self.monitor.cancel();
    }

    pub fn is_polling(&self) -> bool {
        self.monitor.is_polling()
    }

    pub async fn download(&self, href: &str) -> Result<Vec<u8>, ApiError> {
        self.client.download(href).await
    }
}

fn report_submission(sink: &dyn EventSink, kind: JobKind, result: Result<TaskId, ApiError>) {
    if let Ok(task_id) = &result {
        campus_info!("Submitted {} job as task {}", kind, task_id);
    }
    sink.emit(EngineEvent::Submitted { kind, result });
}
