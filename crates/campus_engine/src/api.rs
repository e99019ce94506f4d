use std::path::Path;

use campus_core::{ExportFilters, ImportSource, JobState, ProgressMeta, TaskId, TaskResult, TaskStatus};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::client::{AuthenticatedClient, RequestConfig};
use crate::{ApiError, ApiErrorKind};

pub const LOGIN_PATH: &str = "/auth/login";
pub const ME_PATH: &str = "/auth/me";
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change_password";
pub const EXPORT_COURSES_PATH: &str = "/api/exports/courses";
pub const IMPORT_COURSES_PATH: &str = "/api/imports/courses";
pub const TASKS_PATH: &str = "/api/tasks";
pub const REGISTER_PATH: &str = "/auth/register";
pub const FORGOT_USERNAME_PATH: &str = "/auth/forgot_username";
pub const FORGOT_PASSWORD_PATH: &str = "/auth/forgot_password";
pub const RESET_PASSWORD_PATH: &str = "/auth/reset_password";

/// Unreserved characters stay literal; everything else in a task id is encoded.
const TASK_ID_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenPair {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Account data sent by `register`.
#[derive(Debug, Clone, Copy)]
pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct TaskStatusPayload {
    state: String,
    #[serde(default)]
    meta: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Source of job status reports; the poll session only needs this seam.
#[async_trait::async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self, task_id: &str) -> Result<TaskStatus, ApiError>;
}

#[async_trait::async_trait]
impl StatusFetcher for AuthenticatedClient {
    async fn fetch_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        self.task_status(task_id).await
    }
}

impl AuthenticatedClient {
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        let body = json!({ "username": username, "password": password });
        let value = self
            .request(LOGIN_PATH, RequestConfig::post_json(body))
            .await?;
        decode(value).map_err(|_| ApiError::new(ApiErrorKind::Decode, "login failed"))
    }

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let value = self.request(ME_PATH, RequestConfig::get()).await?;
        decode(value)
    }

    pub async fn change_password(&self, old: &str, new: &str) -> Result<(), ApiError> {
        let body = json!({ "old_password": old, "new_password": new });
        self.request(CHANGE_PASSWORD_PATH, RequestConfig::post_json(body))
            .await?;
        Ok(())
    }

    /// Creates an account. Returns the server's confirmation text.
    pub async fn register(&self, account: Registration<'_>) -> Result<String, ApiError> {
        let body = json!({
            "username": account.username,
            "email": account.email,
            "password": account.password,
        });
        let value = self
            .request(REGISTER_PATH, RequestConfig::post_json(body))
            .await?;
        Ok(detail_or(value, "account created"))
    }

    /// Asks the server to mail the usernames tied to `email`. The answer is
    /// the same whether or not the address is known.
    pub async fn forgot_username(&self, email: &str) -> Result<String, ApiError> {
        let value = self
            .request(
                FORGOT_USERNAME_PATH,
                RequestConfig::post_json(json!({ "email": email })),
            )
            .await?;
        Ok(detail_or(value, "request sent"))
    }

    /// Asks the server to mail a reset link carrying a `uid` and `token`.
    pub async fn forgot_password(&self, email: &str) -> Result<String, ApiError> {
        let value = self
            .request(
                FORGOT_PASSWORD_PATH,
                RequestConfig::post_json(json!({ "email": email })),
            )
            .await?;
        Ok(detail_or(value, "request sent"))
    }

    pub async fn reset_password(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
    ) -> Result<String, ApiError> {
        let body = json!({ "uid": uid, "token": token, "new_password": new_password });
        let value = self
            .request(RESET_PASSWORD_PATH, RequestConfig::post_json(body))
            .await?;
        Ok(detail_or(value, "password reset"))
    }

    /// Queues a CSV export and returns its task id.
    pub async fn submit_export(&self, filters: &ExportFilters) -> Result<TaskId, ApiError> {
        let mut body = Map::new();
        if let Some(code) = &filters.code {
            body.insert("code".to_string(), Value::String(code.clone()));
        }
        if let Some(title) = &filters.title {
            body.insert("title".to_string(), Value::String(title.clone()));
        }
        let value = self
            .request(
                EXPORT_COURSES_PATH,
                RequestConfig::post_json(Value::Object(body)),
            )
            .await?;
        decode::<SubmissionResponse>(value).map(|response| response.task_id)
    }

    /// Queues a CSV import from a local file (multipart) or a remote URL.
    pub async fn submit_import(&self, source: &ImportSource) -> Result<TaskId, ApiError> {
        let config = match source {
            ImportSource::File(path) => RequestConfig::post_multipart(csv_form(path).await?),
            ImportSource::Url(url) => RequestConfig::post_json(json!({ "file_url": url })),
        };
        let value = self.request(IMPORT_COURSES_PATH, config).await?;
        decode::<SubmissionResponse>(value).map(|response| response.task_id)
    }

    pub async fn task_status(&self, task_id: &str) -> Result<TaskStatus, ApiError> {
        let value = self
            .request(&task_path(task_id)?, RequestConfig::get())
            .await?;
        let payload: TaskStatusPayload = decode(value)?;
        task_status_from_payload(payload)
    }
}

async fn csv_form(path: &Path) -> Result<Form, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(|err| {
        ApiError::new(
            ApiErrorKind::Io,
            format!("cannot read {}: {err}", path.display()),
        )
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.csv".to_string());
    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("text/csv")
        .map_err(|err| ApiError::new(ApiErrorKind::InvalidRequest, err.to_string()))?;
    Ok(Form::new().part("file", part))
}

/// Status path for one task, with the id encoded as a single path segment.
pub fn task_path(task_id: &str) -> Result<String, ApiError> {
    if matches!(task_id, "" | "." | "..") {
        return Err(ApiError::new(
            ApiErrorKind::InvalidRequest,
            format!("invalid task id {task_id:?}"),
        ));
    }
    Ok(format!(
        "{TASKS_PATH}/{}",
        utf8_percent_encode(task_id, TASK_ID_SEGMENT)
    ))
}

fn detail_or(value: Value, fallback: &str) -> String {
    value
        .get("detail")
        .and_then(Value::as_str)
        .filter(|detail| !detail.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value)
        .map_err(|err| ApiError::new(ApiErrorKind::Decode, format!("unexpected response: {err}")))
}

fn task_status_from_payload(payload: TaskStatusPayload) -> Result<TaskStatus, ApiError> {
    let state = JobState::parse(&payload.state).ok_or_else(|| {
        ApiError::new(
            ApiErrorKind::Decode,
            format!("unrecognised task state {}", payload.state),
        )
    })?;

    let meta = payload
        .meta
        .as_ref()
        .and_then(Value::as_object)
        .map(|meta| ProgressMeta {
            ok: meta.get("ok").and_then(Value::as_u64),
            fail: meta.get("fail").and_then(Value::as_u64),
        });
    let result = payload
        .result
        .as_ref()
        .and_then(Value::as_object)
        .map(|result| TaskResult {
            download_url: result
                .get("download_url")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            ok: result.get("ok").and_then(Value::as_u64),
            fail: result.get("fail").and_then(Value::as_u64),
            count: result.get("count").and_then(Value::as_u64),
        });
    let error = match payload.error {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    };

    Ok(TaskStatus {
        state,
        meta,
        result,
        error,
    })
}
