//! Google Calendar events source.
//!
//! Fetches events from the public REST API and converts them into
//! [`ActivityItem`]s. This is the only place where provider timestamps are
//! turned into calendar dates: timed events are truncated to the date in the
//! viewer's timezone, all-day dates are taken as already local, and the
//! provider's exclusive end is made inclusive exactly once.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::GoogleCalendarConfig;
use crate::error::{EventError, FetchError};
use crate::types::{ActivityItem, Category};

/// Upper bound accepted by the events endpoint.
const PAGE_SIZE: &str = "2500";

/// Longest error body kept in a [`FetchError::Status`].
const MAX_ERROR_BODY: usize = 200;

/// `colorId` palette of the camp calendar, mapped to categories.
const COLOR_CATEGORIES: &[(&str, Category)] = &[
    ("1", Category::Spiritual),   // Lavender
    ("2", Category::Adventure),   // Sage
    ("3", Category::Educational), // Grape
    ("4", Category::Leisure),     // Flamingo
    ("5", Category::Travel),      // Banana
    ("6", Category::Cultural),    // Tangerine
    ("7", Category::Spiritual),   // Peacock
    ("8", Category::Adventure),   // Graphite
    ("9", Category::Educational), // Blueberry
    ("10", Category::Leisure),    // Basil
    ("11", Category::Travel),     // Tomato
];

/// Start or end of a provider event. Exactly one field is expected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    /// RFC 3339 timestamp, for timed events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    /// `YYYY-MM-DD`, for all-day events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// Raw event record as returned by the events endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEvent {
    pub id: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub start: EventTime,

    #[serde(default)]
    pub end: EventTime,

    #[serde(default)]
    pub color_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsPage {
    #[serde(default)]
    items: Vec<ProviderEvent>,

    #[serde(default)]
    next_page_token: Option<String>,
}

/// A parsed event boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    AllDay(NaiveDate),
    Timed(DateTime<FixedOffset>),
}

impl When {
    fn parse(time: &EventTime, id: &str, field: &'static str) -> Result<Self, EventError> {
        let invalid = |value: &str| EventError::InvalidTime {
            id: id.to_string(),
            field,
            value: value.to_string(),
        };

        if let Some(raw) = &time.date_time {
            return DateTime::parse_from_rfc3339(raw.trim())
                .map(When::Timed)
                .map_err(|_| invalid(raw));
        }
        if let Some(raw) = &time.date {
            return NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map(When::AllDay)
                .map_err(|_| invalid(raw));
        }
        Err(EventError::MissingTime {
            id: id.to_string(),
            field,
        })
    }
}

/// Calendar date (and clock time, for timed events) of `when` in `tz`.
pub fn to_local_date<Tz: TimeZone>(when: &When, tz: &Tz) -> (NaiveDate, Option<NaiveTime>) {
    match when {
        When::AllDay(date) => (*date, None),
        When::Timed(instant) => {
            let local = instant.with_timezone(tz).naive_local();
            (local.date(), Some(local.time()))
        }
    }
}

/// Inclusive last day of an event whose provider end is exclusive.
///
/// All-day ends name the day after the event. Timed ends are instants; one
/// landing exactly on local midnight belongs to the previous day. The result
/// is never earlier than `start`.
pub fn inclusive_end<Tz: TimeZone>(start: NaiveDate, end: &When, tz: &Tz) -> NaiveDate {
    let last = match end {
        When::AllDay(date) => date.checked_sub_days(Days::new(1)).unwrap_or(*date),
        When::Timed(_) => {
            let (date, time) = to_local_date(end, tz);
            match time {
                Some(t) if t == NaiveTime::MIN => {
                    date.checked_sub_days(Days::new(1)).unwrap_or(date)
                }
                _ => date,
            }
        }
    };
    last.max(start)
}

/// Category for a provider color tag, `leisure` when unmapped or absent.
pub fn category_for_color(color_id: Option<&str>) -> Category {
    color_id
        .and_then(|id| {
            COLOR_CATEGORIES
                .iter()
                .find(|(color, _)| *color == id.trim())
                .map(|(_, category)| *category)
        })
        .unwrap_or_default()
}

/// Convert one provider event. Cancelled events yield `Ok(None)`.
pub fn convert_event<Tz: TimeZone>(
    event: &ProviderEvent,
    tz: &Tz,
) -> Result<Option<ActivityItem>, EventError> {
    if event.status.as_deref() == Some("cancelled") {
        return Ok(None);
    }

    let start = When::parse(&event.start, &event.id, "start")?;
    let end = When::parse(&event.end, &event.id, "end")?;

    let (start_date, start_time) = to_local_date(&start, tz);
    let last_date = inclusive_end(start_date, &end, tz);

    let title = event
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("(untitled)");
    let category = category_for_color(event.color_id.as_deref());

    let item = if last_date > start_date {
        ActivityItem::multi_day(event.id.clone(), title, category, start_date, last_date)
            .unwrap_or_else(|_| ActivityItem::single(event.id.clone(), title, category, start_date))
    } else {
        ActivityItem::single(event.id.clone(), title, category, start_date)
    };

    Ok(Some(match start_time {
        Some(time) => item.with_time(time),
        None => item,
    }))
}

/// Convert a batch of events, skipping (and logging) the malformed ones.
pub fn convert_events<Tz: TimeZone>(events: &[ProviderEvent], tz: &Tz) -> Vec<ActivityItem> {
    events
        .iter()
        .filter_map(|event| match convert_event(event, tz) {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "Skipping calendar event");
                None
            }
        })
        .collect()
}

/// Midnight at the start of `date` in `tz`. A midnight skipped by a DST
/// change is read as UTC.
fn local_midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<FixedOffset> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .fixed_offset()
}

/// Client for one calendar's events endpoint.
pub struct GoogleCalendarClient {
    http: Client,
    config: GoogleCalendarConfig,
}

impl GoogleCalendarClient {
    pub fn new(config: GoogleCalendarConfig) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        info!(
            calendar_id = %config.calendar_id,
            timeout_secs = config.timeout.as_secs(),
            "Calendar client initialized"
        );
        Ok(Self { http, config })
    }

    pub fn calendar_id(&self) -> &str {
        &self.config.calendar_id
    }

    /// `{base}/calendars/{calendar_id}/events`, with the id percent-encoded
    /// as a single path segment.
    pub fn events_url(&self) -> Result<Url, FetchError> {
        let mut url =
            Url::parse(&self.config.base_url).map_err(|e| FetchError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Url(format!("{} cannot be a base URL", self.config.base_url)))?
            .pop_if_empty()
            .extend(["calendars", self.config.calendar_id.as_str(), "events"]);
        Ok(url)
    }

    /// All events overlapping `from..=to`, following pagination.
    ///
    /// The window runs from local midnight on `from` to local midnight after
    /// `to`, in the same timezone used to convert the events.
    pub async fn fetch_events<Tz: TimeZone>(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        tz: &Tz,
    ) -> Result<Vec<ProviderEvent>, FetchError> {
        let url = self.events_url()?;
        let time_min = local_midnight(from, tz).to_rfc3339();
        let day_after = to.checked_add_days(Days::new(1)).unwrap_or(to);
        let time_max = local_midnight(day_after, tz).to_rfc3339();

        let mut events = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();

        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("key", self.config.api_key.as_str()),
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
                ("maxResults", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            debug!(url = %url, from = %from, to = %to, "Requesting calendar events");
            let response = self.http.get(url.clone()).query(&query).send().await?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(FetchError::Unauthorized {
                    status: status.as_u16(),
                });
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(MAX_ERROR_BODY).collect(),
                });
            }

            let page: EventsPage = response.json().await?;
            debug!(count = page.items.len(), "Received events page");
            events.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        warn!(page_token = %token, "Page token repeated, stopping pagination");
                        break;
                    }
                    page_token = Some(token);
                }
                _ => break,
            }
        }

        info!(
            count = events.len(),
            calendar_id = %self.config.calendar_id,
            "Fetched calendar events"
        );
        Ok(events)
    }
}
