use std::path::PathBuf;

use anyhow::{Context, Result};
use campus_core::{Effect, ImportSource, Msg};
use campus_engine::{AtomicFileWriter, EngineEvent, EngineHandle};
use campus_logging::{campus_info, campus_warn};

const FALLBACK_DOWNLOAD_NAME: &str = "courses_export.csv";

pub struct EffectRunner {
    engine: EngineHandle,
    downloads: AtomicFileWriter,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, output_dir: PathBuf) -> Self {
        Self {
            engine,
            downloads: AtomicFileWriter::new(output_dir),
        }
    }

    pub async fn run(&mut self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::SubmitExport { filters } => {
                    campus_info!(
                        "SubmitExport code={:?} title={:?}",
                        filters.code,
                        filters.title
                    );
                    self.engine.submit_export(filters);
                }
                Effect::SubmitImport { source } => {
                    match &source {
                        ImportSource::File(path) => {
                            campus_info!("SubmitImport file={}", path.display())
                        }
                        ImportSource::Url(url) => campus_info!("SubmitImport url={}", url),
                    }
                    self.engine.submit_import(source);
                }
                Effect::StartPolling { task_id } => {
                    self.engine.start_polling(task_id);
                }
                Effect::StopPolling => {
                    self.engine.stop_polling();
                }
                Effect::OpenDownload { url } => {
                    let path = self.save_download(&url).await?;
                    println!("Saved {}", path.display());
                }
            }
        }
        Ok(())
    }

    async fn save_download(&self, url: &str) -> Result<PathBuf> {
        campus_info!("Downloading {}", url);
        let bytes = self
            .engine
            .download(url)
            .await
            .with_context(|| format!("download of {url} failed"))?;
        let path = self
            .downloads
            .write(&download_filename(url), &bytes)
            .with_context(|| format!("could not save {url}"))?;
        Ok(path)
    }
}

/// Translates engine output into update messages.
pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted { kind, result } => match result {
            Ok(task_id) => Msg::SubmissionAccepted { kind, task_id },
            Err(err) => {
                campus_warn!("{} submission failed ({}): {}", kind, err.kind, err);
                Msg::SubmissionFailed {
                    kind,
                    message: err.message,
                }
            }
        },
        EngineEvent::TaskStatus { task_id, result } => match result {
            Ok(status) => Msg::StatusReceived { task_id, status },
            Err(err) => Msg::StatusQueryFailed {
                task_id,
                message: err.message,
            },
        },
        EngineEvent::PollingExhausted { task_id, attempts } => {
            Msg::PollingExhausted { task_id, attempts }
        }
    }
}

/// Last non-empty path segment of the download address.
fn download_filename(href: &str) -> String {
    url::Url::parse(href)
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .rev()
                .find(|segment| !segment.is_empty())
                .map(ToOwned::to_owned)
        })
        .filter(|name| name != "." && name != "..")
        .unwrap_or_else(|| FALLBACK_DOWNLOAD_NAME.to_string())
}
