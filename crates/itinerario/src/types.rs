use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::error::ItemError;

/// Activity category. Drives color and icon selection only.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Spiritual,
    Adventure,
    Educational,
    #[default]
    Leisure,
    Travel,
    Cultural,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Spiritual,
        Category::Adventure,
        Category::Educational,
        Category::Leisure,
        Category::Travel,
        Category::Cultural,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Spiritual => "spiritual",
            Category::Adventure => "adventure",
            Category::Educational => "educational",
            Category::Leisure => "leisure",
            Category::Travel => "travel",
            Category::Cultural => "cultural",
        }
    }

    /// Capitalized name for filter tabs and badges
    pub fn label(self) -> &'static str {
        match self {
            Category::Spiritual => "Spiritual",
            Category::Adventure => "Adventure",
            Category::Educational => "Educational",
            Category::Leisure => "Leisure",
            Category::Travel => "Travel",
            Category::Cultural => "Cultural",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ItemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ItemError::UnknownCategory(s.to_string()))
    }
}

/// One scheduled entry in the itinerary.
///
/// Dates are calendar dates with no time-of-day, so every comparison is
/// date-only. A multi-day item carries an inclusive `end_date` that is never
/// earlier than `start_date`; a single-day item has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemRecord", into = "ItemRecord")]
pub struct ActivityItem {
    /// Stable identifier, used as a collection key
    pub id: String,

    pub title: String,

    pub category: Category,

    /// Local clock time, for display and export only
    pub start_time: Option<NaiveTime>,

    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
}

impl ActivityItem {
    pub fn single(
        id: impl Into<String>,
        title: impl Into<String>,
        category: Category,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            category,
            start_time: None,
            start_date: date,
            end_date: None,
        }
    }

    /// Create an item spanning `start..=end`.
    pub fn multi_day(
        id: impl Into<String>,
        title: impl Into<String>,
        category: Category,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, ItemError> {
        let id = id.into();
        if end < start {
            return Err(ItemError::EndBeforeStart { id, start, end });
        }
        Ok(Self {
            id,
            title: title.into(),
            category,
            start_time: None,
            start_date: start,
            end_date: Some(end),
        })
    }

    pub fn with_time(mut self, time: NaiveTime) -> Self {
        self.start_time = Some(time);
        self
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Inclusive last day, present only for multi-day items
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn is_multi_day(&self) -> bool {
        self.end_date.is_some()
    }

    /// Last calendar day the item occupies
    pub fn last_date(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.start_date)
    }

    /// Deterministic id for records that arrive without one.
    /// Derived from date and title so reloading a fixture keeps the same ids.
    pub fn fixture_id(date: NaiveDate, title: &str) -> String {
        let name = format!("{}|{}", date.format("%Y-%m-%d"), title);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }
}

/// Serialized form of an [`ActivityItem`], as found in fixture files and
/// returned by the JSON API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,

    title: String,

    #[serde(rename = "type", default)]
    category: Category,

    /// `YYYY-MM-DD`, optionally followed by a clock time
    date: String,

    #[serde(default)]
    is_multi_day: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<String>,
}

impl TryFrom<ItemRecord> for ActivityItem {
    type Error = ItemError;

    fn try_from(record: ItemRecord) -> Result<Self, Self::Error> {
        let (start, time) = parse_date_time(&record.date)?;
        let id = record
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| ActivityItem::fixture_id(start, &record.title));

        let mut item = match (record.is_multi_day, record.end_date) {
            (true, Some(end)) => {
                let (end, _) = parse_date_time(&end)?;
                ActivityItem::multi_day(id, record.title, record.category, start, end)?
            }
            (true, None) => return Err(ItemError::MissingEndDate { id }),
            (false, end) => {
                if let Some(end) = end {
                    warn!(id = %id, end_date = %end, "Ignoring end date on single-day item");
                }
                ActivityItem::single(id, record.title, record.category, start)
            }
        };
        item.start_time = time;
        Ok(item)
    }
}

impl From<ActivityItem> for ItemRecord {
    fn from(item: ActivityItem) -> Self {
        let mut date = item.start_date.format("%Y-%m-%d").to_string();
        if let Some(time) = item.start_time {
            date.push_str(&time.format("T%H:%M").to_string());
        }
        ItemRecord {
            id: Some(item.id),
            title: item.title,
            category: item.category,
            date,
            is_multi_day: item.end_date.is_some(),
            end_date: item.end_date.map(|d| d.format("%Y-%m-%d").to_string()),
        }
    }
}

/// Split a `YYYY-MM-DD[( |T)HH:MM[:SS]]` string into its date and optional time.
pub fn parse_date_time(value: &str) -> Result<(NaiveDate, Option<NaiveTime>), ItemError> {
    let value = value.trim();
    let invalid = || ItemError::InvalidDate(value.to_string());

    let (date_part, time_part) = match value.find(['T', ' ']) {
        Some(idx) => (&value[..idx], Some(value[idx + 1..].trim())),
        None => (value, None),
    };

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = match time_part {
        None | Some("") => None,
        Some(t) => Some(
            NaiveTime::parse_from_str(t, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
                .map_err(|_| invalid())?,
        ),
    };

    Ok((date, time))
}
