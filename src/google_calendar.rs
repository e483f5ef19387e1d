use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::event::CalendarEvent;

/// Google Calendar APIのベースURL。
const API_URL: &str = "https://www.googleapis.com/calendar/v3";

/// 1ページあたりの最大取得件数。
///
/// APIの既定値は250件で、期間内のイベントが取得しきれないことがあるため引き上げる。
const MAX_RESULTS: u32 = 2500;

/// カレンダー取得のエラー。
#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("malformed event '{summary}': {reason}")]
    MalformedEvent { summary: String, reason: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Google Calendar APIのイベント一覧レスポンス。
#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    summary: Option<String>,
    start: Option<GoogleEventTime>,
    end: Option<GoogleEventTime>,
}

#[derive(Debug, Deserialize)]
struct GoogleEventTime {
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    date: Option<String>,
}

/// カレンダーからイベントを取得するためのtrait。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarRepository {
    /// 指定された期間のイベントを開始時刻の昇順で取得する。
    ///
    /// # Arguments
    ///
    /// * `start_at` - 取得するイベントの開始日時
    /// * `end_at` - 取得するイベントの終了日時
    async fn read_events(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;
}

/// Google Calendar APIと通信するためのクライアント。
///
/// # Examples
///
/// ```
/// let client = GoogleCalendarClient::new(access_token);
/// let events = client.read_events(&start_at, &end_at).await.unwrap();
/// ```
pub struct GoogleCalendarClient {
    client: Client,
    api_url: String,
    access_token: String,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// 新しい`GoogleCalendarClient`を返す。
    ///
    /// # Arguments
    ///
    /// * `access_token` - Google Calendar APIのアクセストークン
    pub fn new(access_token: String) -> Self {
        Self {
            client: Client::new(),
            api_url: API_URL.to_string(),
            access_token,
            calendar_id: "primary".to_string(),
        }
    }
}

#[async_trait]
impl CalendarRepository for GoogleCalendarClient {
    /// 指定された期間のイベントを全ページ分取得する。
    async fn read_events(
        &self,
        start_at: &DateTime<Utc>,
        end_at: &DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeMin", start_at.to_rfc3339()),
                ("timeMax", end_at.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", MAX_RESULTS.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let response = self
                .client
                .get(format!(
                    "{}/calendars/{}/events",
                    self.api_url, self.calendar_id
                ))
                .bearer_auth(&self.access_token)
                .query(&query)
                .send()
                .await?;
            if response.status() == StatusCode::UNAUTHORIZED
                || response.status() == StatusCode::FORBIDDEN
            {
                return Err(CalendarError::Authentication(format!(
                    "HTTP {}",
                    response.status()
                )));
            }
            let page = response.error_for_status()?.json::<EventsPage>().await?;

            for item in page.items {
                if let Some(event) = to_calendar_event(item)? {
                    events.push(event);
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!("length of calendar events: {}", events.len());

        Ok(events)
    }
}

/// APIのイベントをドメインのイベントに変換する。
///
/// タイトルのないイベントと終日イベント(`dateTime`ではなく`date`を持つ)は
/// 集計対象の時間を持たないため、警告を出してスキップする。
/// 時刻付きのはずのイベントが壊れている場合はエラーを返す。
fn to_calendar_event(item: GoogleEvent) -> Result<Option<CalendarEvent>, CalendarError> {
    let Some(summary) = item.summary else {
        warn!("skipping event without summary");
        return Ok(None);
    };

    let start = match event_time(item.start, &summary, "start")? {
        Some(start) => start,
        None => return Ok(None),
    };
    let end = match event_time(item.end, &summary, "end")? {
        Some(end) => end,
        None => return Ok(None),
    };
    if end < start {
        return Err(CalendarError::MalformedEvent {
            summary,
            reason: "end precedes start".to_string(),
        });
    }

    Ok(Some(CalendarEvent {
        summary,
        start,
        end,
    }))
}

/// イベントの開始または終了の時刻を取り出す。終日イベントは`None`を返す。
fn event_time(
    time: Option<GoogleEventTime>,
    summary: &str,
    field: &str,
) -> Result<Option<DateTime<FixedOffset>>, CalendarError> {
    let Some(time) = time else {
        return Err(CalendarError::MalformedEvent {
            summary: summary.to_string(),
            reason: format!("missing {}", field),
        });
    };

    let Some(date_time) = time.date_time else {
        if time.date.is_some() {
            warn!("skipping all-day event: {}", summary);
            return Ok(None);
        }
        return Err(CalendarError::MalformedEvent {
            summary: summary.to_string(),
            reason: format!("{} has neither dateTime nor date", field),
        });
    };

    let parsed = DateTime::parse_from_rfc3339(&date_time).map_err(|error| {
        CalendarError::MalformedEvent {
            summary: summary.to_string(),
            reason: format!("invalid {} dateTime: {}", field, error),
        }
    })?;

    Ok(Some(parsed))
}
