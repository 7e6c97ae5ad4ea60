//! HTTP client for the routine API.
//!
//! Listing endpoints are paged with `limit`/`offset`; the backend answers an
//! empty page with 404, which ends the listing. Errors carry the `error`
//! field of the response body verbatim.

use super::api::{ScheduleQuery, TimetableApi};
use super::auth::AuthHandle;
use super::config::ClientConfig;
use super::error::{TimetableError, TimetableResult};
use super::types::{AvailableYears, Room, SchedulePayload, ScheduleRecord, Subject, Teacher};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Backend's maximum page size for listings.
const MAX_PAGE_SIZE: u32 = 100;

/// Body code the backend sends when the bearer token has expired.
const TOKEN_EXPIRED_CODE: &str = "TOKEN_EXPIRED";

/// Error body: `{"error": "..."}`, plus `code` on auth failures.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

/// reqwest implementation of [`TimetableApi`].
pub struct HttpTimetableApi {
    client: Client,
    base_url: Url,
    config: ClientConfig,
    auth: AuthHandle,
}

impl HttpTimetableApi {
    pub fn new(config: ClientConfig, auth: AuthHandle) -> TimetableResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TimetableError::UrlError {
                message: format!("{} cannot be used as a base URL", config.base_url),
            });
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TimetableError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            config,
            auth,
        })
    }

    pub fn auth(&self) -> &AuthHandle {
        &self.auth
    }

    /// Builds `base_url/segment/segment...`, percent-encoding each segment.
    fn endpoint<S: AsRef<str>>(&self, segments: &[S]) -> TimetableResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TimetableError::UrlError {
                message: format!("{} cannot be used as a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, require_auth: bool) -> TimetableResult<RequestBuilder> {
        let token = self.auth.token();
        if require_auth && token.is_none() {
            return Err(TimetableError::Unauthorized {
                message: "sign in required".to_string(),
            });
        }

        let mut builder = self.client.request(method, url);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        Ok(builder)
    }

    /// Sends a request, logs it, and turns non-success statuses into errors.
    async fn execute(&self, builder: RequestBuilder) -> TimetableResult<Response> {
        let correlation_id = generate_correlation_id();
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(
            correlation_id = %correlation_id,
            method = %method,
            url = %url,
            "Sending request"
        );

        let start = Instant::now();
        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    correlation_id = %correlation_id,
                    method = %method,
                    url = %url,
                    error = %e,
                    "Request failed"
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        info!(
            correlation_id = %correlation_id,
            method = %method,
            path = %url.path(),
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );

        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(self.classify_failure(status, &text))
    }

    fn classify_failure(&self, status: StatusCode, text: &str) -> TimetableError {
        let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
        let message = body
            .error
            .or(body.message)
            .unwrap_or_else(|| text.trim().to_string());

        match status {
            StatusCode::UNAUTHORIZED if body.code.as_deref() == Some(TOKEN_EXPIRED_CODE) => {
                warn!("Bearer token expired, clearing session");
                self.auth.clear();
                TimetableError::SessionExpired
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                TimetableError::Unauthorized { message }
            }
            _ => TimetableError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, require_auth: bool) -> TimetableResult<T> {
        let response = self.execute(self.request(Method::GET, url, require_auth)?).await?;
        decode(response).await
    }

    async fn send_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> TimetableResult<T> {
        let builder = self.request(method, url, true)?.json(body);
        let response = self.execute(builder).await?;
        decode(response).await
    }

    /// Fetches a listing page by page until a short page, a 404 or `max_pages`.
    async fn list_paged<T: DeserializeOwned>(
        &self,
        resource: &str,
        page_size: u32,
    ) -> TimetableResult<Vec<T>> {
        let limit = page_size.clamp(1, MAX_PAGE_SIZE);
        let mut items = Vec::new();

        for page in 0..self.config.max_pages.max(1) {
            let mut url = self.endpoint(&[resource])?;
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string())
                .append_pair("offset", &(page * limit).to_string());

            let batch: Vec<T> = match self.get_json::<Option<Vec<T>>>(url, false).await {
                Ok(batch) => batch.unwrap_or_default(),
                Err(TimetableError::Api { status: 404, .. }) => Vec::new(),
                Err(e) => return Err(e),
            };

            let fetched = batch.len();
            items.extend(batch);
            if fetched < limit as usize {
                break;
            }
        }

        debug!(resource = resource, count = items.len(), "Listing fetched");
        Ok(items)
    }
}

#[async_trait]
impl TimetableApi for HttpTimetableApi {
    async fn schedules(&self, query: &ScheduleQuery) -> TimetableResult<Vec<ScheduleRecord>> {
        let mut url = self.endpoint(&query.segments)?;
        url.query_pairs_mut()
            .append_pair("year", &query.year.to_string());

        let records: Option<Vec<ScheduleRecord>> = self.get_json(url, query.requires_auth).await?;
        Ok(records.unwrap_or_default())
    }

    async fn subjects(&self) -> TimetableResult<Vec<Subject>> {
        self.list_paged("subjects", self.config.subjects_page_size).await
    }

    async fn rooms(&self) -> TimetableResult<Vec<Room>> {
        self.list_paged("rooms", self.config.rooms_page_size).await
    }

    async fn teachers(&self) -> TimetableResult<Vec<Teacher>> {
        let url = self.endpoint(&["teachers"])?;
        let teachers: Option<Vec<Teacher>> = self.get_json(url, true).await?;
        Ok(teachers.unwrap_or_default())
    }

    async fn subject_teachers(&self, subject_id: i64) -> TimetableResult<Vec<Teacher>> {
        let id = subject_id.to_string();
        let url = self.endpoint(&["subject", id.as_str(), "teachers"])?;
        let teachers: Option<Vec<Teacher>> = self.get_json(url, true).await?;
        Ok(teachers.unwrap_or_default())
    }

    async fn create_schedule(&self, payload: &SchedulePayload) -> TimetableResult<ScheduleRecord> {
        let url = self.endpoint(&["schedules"])?;
        self.send_json(Method::POST, url, payload).await
    }

    async fn update_schedule(
        &self,
        id: i64,
        payload: &SchedulePayload,
    ) -> TimetableResult<ScheduleRecord> {
        let id = id.to_string();
        let url = self.endpoint(&["schedules", id.as_str()])?;
        self.send_json(Method::PUT, url, payload).await
    }

    async fn available_years(&self) -> TimetableResult<Vec<i32>> {
        let url = self.endpoint(&["years", "schedules"])?;
        let body: AvailableYears = self.get_json(url, false).await?;
        Ok(body.years)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> TimetableResult<T> {
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}
