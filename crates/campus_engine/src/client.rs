use std::time::Duration;

use campus_core::{normalize_error, ErrorPayload};
use campus_logging::{campus_debug, campus_trace};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};
use url::Url;

use crate::{ApiError, ApiErrorKind};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Origin every request path is appended to.
    pub api_base: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Credential context handed to the client at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An empty token counts as no token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.is_empty()).then_some(token),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

pub enum RequestBody {
    Empty,
    Json(Value),
    /// File upload; the transport picks the content type and boundary.
    Multipart(reqwest::multipart::Form),
}

pub struct RequestConfig {
    pub method: Method,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            method: Method::GET,
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }
}

impl RequestConfig {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn post_json(body: Value) -> Self {
        Self {
            method: Method::POST,
            body: RequestBody::Json(body),
            ..Self::default()
        }
    }

    pub fn post_multipart(form: reqwest::multipart::Form) -> Self {
        Self {
            method: Method::POST,
            body: RequestBody::Multipart(form),
            ..Self::default()
        }
    }
}

/// HTTP client that attaches the session's bearer token and reduces every
/// failure to one readable message.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    settings: ClientSettings,
    session: Session,
}

impl AuthenticatedClient {
    pub fn new(settings: ClientSettings, session: Session) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiErrorKind::Network, err.to_string()))?;
        Ok(Self {
            http,
            settings,
            session,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.settings.api_base
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Same connection pool, different credential.
    pub fn with_session(&self, session: Session) -> Self {
        Self {
            http: self.http.clone(),
            settings: self.settings.clone(),
            session,
        }
    }

    /// Performs one request against `api_base + path`.
    ///
    /// Success bodies that are empty, `204 No Content` or not JSON decode to an
    /// empty object.
    pub async fn request(&self, path: &str, config: RequestConfig) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.settings.api_base.trim_end_matches('/'), path);
        let RequestConfig {
            method,
            body,
            mut headers,
        } = config;

        match &body {
            RequestBody::Multipart(_) => {
                headers.remove(CONTENT_TYPE);
            }
            RequestBody::Empty | RequestBody::Json(_) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
        }
        self.attach_credential(&mut headers)?;

        campus_trace!("{} {}", method, url);
        let builder = self.http.request(method, &url).headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(
                serde_json::to_vec(&value)
                    .map_err(|err| ApiError::new(ApiErrorKind::InvalidRequest, err.to_string()))?,
            ),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let raw = response.text().await.map_err(map_reqwest_error)?;

        if !status.is_success() {
            return Err(failure(status, &raw));
        }
        if status == StatusCode::NO_CONTENT || raw.trim().is_empty() {
            return Ok(empty_object());
        }
        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            campus_debug!("Lenient decode of {} body: {}", url, err);
            empty_object()
        }))
    }

    /// Fetches an absolute download address as raw bytes. The bearer token is
    /// only sent when the address shares the API origin.
    pub async fn download(&self, href: &str) -> Result<Vec<u8>, ApiError> {
        let mut headers = HeaderMap::new();
        if self.is_api_origin(href)? {
            self.attach_credential(&mut headers)?;
        } else {
            campus_debug!("Downloading {} without credentials", href);
        }
        let response = self
            .http
            .get(href)
            .headers(headers)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.map_err(map_reqwest_error)?;
            return Err(failure(status, &raw));
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        Ok(bytes.to_vec())
    }

    fn is_api_origin(&self, href: &str) -> Result<bool, ApiError> {
        let target = Url::parse(href).map_err(|err| {
            ApiError::new(
                ApiErrorKind::InvalidRequest,
                format!("invalid download address {href}: {err}"),
            )
        })?;
        let same = Url::parse(&self.settings.api_base)
            .map(|base| base.origin() == target.origin())
            .unwrap_or(false);
        Ok(same)
    }

    fn attach_credential(&self, headers: &mut HeaderMap) -> Result<(), ApiError> {
        if let Some(token) = self.session.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
                ApiError::new(ApiErrorKind::InvalidRequest, format!("invalid token: {err}"))
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(())
    }
}

fn failure(status: StatusCode, raw: &str) -> ApiError {
    let message = normalize_error(&ErrorPayload::from_body(raw));
    campus_debug!("Request failed with {}: {}", status, message);
    ApiError::new(ApiErrorKind::HttpStatus(status.as_u16()), message)
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiErrorKind::Timeout, err.to_string());
    }
    if err.is_decode() || err.is_body() {
        return ApiError::new(ApiErrorKind::Decode, err.to_string());
    }
    ApiError::new(ApiErrorKind::Network, err.to_string())
}
