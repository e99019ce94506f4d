use campus_core::{AppViewModel, JobState, MonitorPhase};

/// Prints view changes, skipping lines identical to the previous ones.
/// A notice only counts as repeated when it belongs to the same task.
#[derive(Default)]
pub struct Renderer {
    last_status: Option<String>,
    last_notice: Option<(Option<String>, String)>,
}

impl Renderer {
    pub fn render(&mut self, view: &AppViewModel) {
        for line in self.changed_lines(view) {
            println!("{line}");
        }
    }

    fn changed_lines(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        let notice = view
            .notice
            .as_ref()
            .map(|notice| (view.task_id.clone(), notice.clone()));
        if let Some((_, text)) = notice.as_ref().filter(|_| notice != self.last_notice) {
            lines.push(text.clone());
        }
        self.last_notice = notice;

        let status = status_line(view);
        if let Some(line) = status.as_ref().filter(|_| status != self.last_status) {
            lines.push(line.clone());
        }
        self.last_status = status;
        lines
    }
}

pub fn status_line(view: &AppViewModel) -> Option<String> {
    let task_id = view.task_id.as_deref()?;
    let state = view.job_state.unwrap_or_default();
    let mut line = format!("task {task_id}: {}", state.label());
    if state == JobState::InProgress {
        if let Some(progress) = view.progress {
            if let Some(ok) = progress.ok {
                line.push_str(&format!(" processed {ok}"));
            }
            if let Some(fail) = progress.fail {
                line.push_str(&format!(" failed {fail}"));
            }
        }
    }
    if view.phase == MonitorPhase::Done {
        if let Some(href) = &view.download_href {
            line.push_str(&format!(" -> {href}"));
        }
        if let Some(error) = &view.error {
            line.push_str(&format!(" ({error})"));
        }
    }
    Some(line)
}
