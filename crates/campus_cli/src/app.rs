use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use campus_core::{update, AppState, AppViewModel, MonitorPhase, Msg};
use campus_engine::{AuthenticatedClient, ChannelEventSink, EngineEvent, EngineHandle, PollSettings};
use campus_logging::{campus_debug, campus_warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::effects::{map_event, EffectRunner};
use crate::render::Renderer;

/// Runs one bulk job from submission to a terminal state (or Ctrl-C).
pub struct BulkApp {
    state: AppState,
    runner: EffectRunner,
    events: UnboundedReceiver<EngineEvent>,
    renderer: Renderer,
}

impl BulkApp {
    pub fn new(client: AuthenticatedClient, poll: PollSettings, output_dir: PathBuf) -> Self {
        let (event_tx, events) = unbounded_channel();
        let state = AppState::new(client.api_base());
        let engine = EngineHandle::new(client, poll, Arc::new(ChannelEventSink::new(event_tx)));
        Self {
            state,
            runner: EffectRunner::new(engine, output_dir),
            events,
            renderer: Renderer::default(),
        }
    }

    pub async fn run(mut self, first: Msg) -> Result<AppViewModel> {
        self.dispatch(first).await?;

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        while !self.is_settled() {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else { break };
                    self.dispatch(map_event(event)).await?;
                }
                _ = &mut ctrl_c => {
                    campus_warn!("Interrupted; stopping job monitor");
                    self.dispatch(Msg::Teardown).await?;
                    break;
                }
            }
        }
        Ok(self.state.view())
    }

    fn is_settled(&self) -> bool {
        self.state.in_flight().is_none() && self.state.phase() != MonitorPhase::Polling
    }

    async fn dispatch(&mut self, msg: Msg) -> Result<()> {
        if let Msg::StatusQueryFailed { task_id, message } = &msg {
            campus_warn!("Poll of task {} failed, retrying: {}", task_id, message);
        }
        campus_debug!("dispatch {:?}", msg);

        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.renderer.render(&state.view());
        }
        self.state = state;
        self.runner.run(effects).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use campus_core::{ExportFilters, JobState};
    use campus_engine::{ClientSettings, Session};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INTERVAL: Duration = Duration::from_millis(20);

    async fn task_queries(server: &MockServer) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().starts_with("/api/tasks/"))
            .count()
    }

    #[tokio::test]
    async fn export_polls_to_success_and_saves_the_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/exports/courses"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "exp-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/exp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "PROGRESS",
                "meta": {"ok": 10, "fail": 0},
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/tasks/exp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "SUCCESS",
                "result": {"download_url": "/media/export.csv"},
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/export.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("id,code\n1,CS101\n"))
            .expect(1)
            .mount(&server)
            .await;

        let output = tempfile::tempdir().unwrap();
        let settings = ClientSettings {
            api_base: server.uri(),
            ..ClientSettings::default()
        };
        let client = AuthenticatedClient::new(settings, Session::with_token("t")).unwrap();
        let poll = PollSettings {
            interval: INTERVAL,
            max_attempts: None,
        };

        let view = BulkApp::new(client, poll, output.path().to_path_buf())
            .run(Msg::ExportRequested {
                filters: ExportFilters::default(),
            })
            .await
            .unwrap();

        assert_eq!(view.phase, MonitorPhase::Done);
        assert_eq!(view.job_state, Some(JobState::Succeeded));
        assert_eq!(
            view.download_href,
            Some(format!("{}/media/export.csv", server.uri()))
        );
        let saved = std::fs::read_to_string(output.path().join("export.csv")).unwrap();
        assert_eq!(saved, "id,code\n1,CS101\n");

        assert_eq!(task_queries(&server).await, 2);
        tokio::time::sleep(INTERVAL * 10).await;
        assert_eq!(task_queries(&server).await, 2);
    }

    #[tokio::test]
    async fn rejected_submission_settles_without_polling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/exports/courses"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(json!({"detail": "You do not have permission."})),
            )
            .mount(&server)
            .await;
        Mock::given(path_regex("^/api/tasks/"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let output = tempfile::tempdir().unwrap();
        let settings = ClientSettings {
            api_base: server.uri(),
            ..ClientSettings::default()
        };
        let client = AuthenticatedClient::new(settings, Session::with_token("t")).unwrap();
        let poll = PollSettings {
            interval: INTERVAL,
            max_attempts: None,
        };

        let view = BulkApp::new(client, poll, output.path().to_path_buf())
            .run(Msg::ExportRequested {
                filters: ExportFilters::default(),
            })
            .await
            .unwrap();

        assert_eq!(view.phase, MonitorPhase::Idle);
        assert_eq!(view.task_id, None);
        assert!(view
            .notice
            .as_deref()
            .is_some_and(|notice| notice.contains("You do not have permission.")));
    }
}
