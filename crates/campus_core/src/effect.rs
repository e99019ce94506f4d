use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SubmitExport { filters: ExportFilters },
    SubmitImport { source: ImportSource },
    /// Replace any running poll session with one for `task_id`.
    StartPolling { task_id: crate::TaskId },
    StopPolling,
    /// Absolute address of a finished export.
    OpenDownload { url: String },
}

/// Optional narrowing of a course export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportFilters {
    pub code: Option<String>,
    pub title: Option<String>,
}

impl ExportFilters {
    pub fn is_empty(&self) -> bool {
        self.code.is_none() && self.title.is_none()
    }
}

/// Where an import reads its CSV from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    File(PathBuf),
    Url(String),
}
