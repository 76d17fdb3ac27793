use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::live_stream;
use crate::error::AppError;

pub const DEFAULT_LIVE_LIMIT: u64 = 20;
pub const MAX_LIVE_LIMIT: u64 = 100;

/// Broadcast lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Scheduled,
    Live,
    Ended,
}

impl LiveStatus {
    /// Case-insensitive, whitespace-tolerant parse. Blank input is `None`.
    pub fn normalize(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(LiveStatus::Scheduled),
            "live" => Some(LiveStatus::Live),
            "ended" => Some(LiveStatus::Ended),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LiveStatus::Scheduled => "scheduled",
            LiveStatus::Live => "live",
            LiveStatus::Ended => "ended",
        }
    }

    fn parse_required(raw: &str) -> Result<Self, AppError> {
        Self::normalize(raw).ok_or_else(|| {
            AppError::Validation(format!(
                "status must be one of: scheduled, live, ended (got '{}')",
                raw.trim()
            ))
        })
    }
}

/// Status selector for stream listings; `None` means every status.
fn parse_filter(
    raw: Option<&str>,
    blank: Option<LiveStatus>,
) -> Result<Option<LiveStatus>, AppError> {
    let raw = raw.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Ok(blank);
    }
    if raw.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    LiveStatus::parse_required(raw).map(Some)
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LiveStreamListQuery {
    /// `live` (default), `scheduled`, `ended` or `all`.
    pub status: Option<String>,
    /// Maximum results (default 20, capped at 100).
    pub limit: Option<u64>,
}

impl LiveStreamListQuery {
    pub fn status_filter(&self) -> Result<Option<LiveStatus>, AppError> {
        parse_filter(self.status.as_deref(), Some(LiveStatus::Live))
    }

    pub fn effective_limit(&self) -> u64 {
        match self.limit {
            Some(0) | None => DEFAULT_LIVE_LIMIT,
            Some(n) => n.min(MAX_LIVE_LIMIT),
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyLiveStreamQuery {
    /// `live`, `scheduled`, `ended` or `all` (default).
    pub status: Option<String>,
}

impl MyLiveStreamQuery {
    pub fn status_filter(&self) -> Result<Option<LiveStatus>, AppError> {
        parse_filter(self.status.as_deref(), None)
    }
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateLiveStreamRequest {
    #[schema(example = "Friday night session")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[schema(example = "https://live.example.com/hls/abc.m3u8")]
    pub stream_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    /// RFC 3339 start time; blank means unscheduled.
    pub scheduled_at: Option<String>,
    /// Initial status, `scheduled` when omitted.
    pub status: Option<String>,
}

impl CreateLiveStreamRequest {
    pub fn initial_status(&self) -> Result<LiveStatus, AppError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(LiveStatus::Scheduled),
            Some(raw) => LiveStatus::parse_required(raw),
        }
    }
}

/// Full replacement of a stream's descriptive fields.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateLiveStreamRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub stream_url: String,
    #[serde(default)]
    pub thumbnail_url: String,
    /// Absent keeps the current schedule, blank clears it.
    pub scheduled_at: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LiveStatusRequest {
    #[schema(example = "live")]
    pub status: String,
}

impl LiveStatusRequest {
    pub fn status(&self) -> Result<LiveStatus, AppError> {
        LiveStatus::parse_required(&self.status)
    }
}

/// Title and stream URL are both required.
pub fn validate_stream_fields(title: &str, stream_url: &str) -> Result<(), AppError> {
    super::shared::validate_title(title)?;
    if stream_url.trim().is_empty() {
        return Err(AppError::Validation("Stream URL is required".into()));
    }
    Ok(())
}

/// Parse an optional RFC 3339 timestamp; blank input yields `None`.
pub fn parse_schedule(raw: &str) -> Result<Option<DateTime<Utc>>, AppError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|_| AppError::Validation(format!("Invalid scheduled_at '{raw}'")))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LiveStreamResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub description: String,
    pub stream_url: String,
    pub thumbnail_url: String,
    #[schema(example = "live")]
    pub status: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<live_stream::Model> for LiveStreamResponse {
    fn from(m: live_stream::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            title: m.title,
            description: m.description,
            stream_url: m.stream_url,
            thumbnail_url: m.thumbnail_url,
            status: m.status,
            scheduled_at: m.scheduled_at,
            started_at: m.started_at,
            ended_at: m.ended_at,
            created_at: m.created_at,
        }
    }
}
