use crate::{resolve_href, AppState, Effect, JobKind, JobState, MonitorPhase, Msg, TaskResult};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ExportRequested { filters } => {
            let mut effects = begin_submission(&mut state, JobKind::Export);
            effects.push(Effect::SubmitExport { filters });
            effects
        }
        Msg::ImportRequested { source } => {
            let mut effects = begin_submission(&mut state, JobKind::Import);
            effects.push(Effect::SubmitImport { source });
            effects
        }
        Msg::SubmissionAccepted { kind, task_id } => {
            // A teardown or a newer request of the other kind already took over.
            if state.in_flight() != Some(kind) {
                return (state, Vec::new());
            }
            state.start_polling(kind, task_id.clone());
            let short: String = task_id.chars().take(8).collect();
            state.set_notice(format!("{kind} submitted (task {short}…)"));
            vec![Effect::StartPolling { task_id }]
        }
        Msg::SubmissionFailed { kind, message } => {
            if state.in_flight() == Some(kind) && state.phase() != MonitorPhase::Polling {
                state.abandon_submission(message);
            }
            Vec::new()
        }
        Msg::StatusReceived { task_id, status } => {
            if state.polling_task() != Some(task_id.as_str()) {
                return (state, Vec::new());
            }
            let Some(job) = state.job_mut() else {
                return (state, Vec::new());
            };
            if !job.apply(status) {
                return (state, Vec::new());
            }
            let job_state = job.state;
            let result = job.result.clone();
            let error = job.error.clone();
            state.mark_dirty();

            match job_state {
                JobState::Succeeded => {
                    let download = result
                        .as_ref()
                        .and_then(|result| result.download_url.as_deref())
                        .filter(|url| !url.is_empty())
                        .map(|url| resolve_href(state.api_origin(), url));
                    match download {
                        Some(url) => {
                            state.finish(
                                "export finished, downloading".to_string(),
                                Some(url.clone()),
                            );
                            vec![Effect::StopPolling, Effect::OpenDownload { url }]
                        }
                        None => {
                            state.finish(completion_notice(result.as_ref()), None);
                            vec![Effect::StopPolling]
                        }
                    }
                }
                JobState::Failed => {
                    state.finish(
                        format!("job failed: {}", error.unwrap_or_default()),
                        None,
                    );
                    vec![Effect::StopPolling]
                }
                JobState::Pending | JobState::Started | JobState::InProgress => Vec::new(),
            }
        }
        Msg::StatusQueryFailed { .. } => Vec::new(),
        Msg::PollingExhausted { task_id, attempts } => {
            if state.polling_task() != Some(task_id.as_str()) {
                return (state, Vec::new());
            }
            state.finish(
                format!("gave up waiting after {attempts} status checks"),
                None,
            );
            vec![Effect::StopPolling]
        }
        Msg::Teardown => {
            state.tear_down();
            vec![Effect::StopPolling]
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn begin_submission(state: &mut AppState, kind: JobKind) -> Vec<Effect> {
    let was_polling = state.phase() == MonitorPhase::Polling;
    state.begin_submission(kind);
    if was_polling {
        vec![Effect::StopPolling]
    } else {
        Vec::new()
    }
}

fn completion_notice(result: Option<&TaskResult>) -> String {
    match result {
        Some(TaskResult {
            ok: Some(ok),
            fail,
            ..
        }) => format!("job finished: {ok} ok, {} failed", fail.unwrap_or(0)),
        _ => "job finished".to_string(),
    }
}
