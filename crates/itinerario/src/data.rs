use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::GoogleCalendarConfig;
use crate::emoji;
use crate::google::{self, GoogleCalendarClient};
use crate::types::{ActivityItem, Category};

/// Fixture file name inside the data directory
pub const FIXTURE_FILE: &str = "itinerary.json";

/// Last known catalog plus the outcome of the most recent refresh.
///
/// A successful refresh replaces `items` wholesale. A failed one only
/// records `last_error`, so the previous catalog keeps being served.
#[derive(Debug, Clone, Default)]
pub struct FetchCache {
    pub last_fetch: Option<DateTime<Utc>>,
    pub items: Vec<ActivityItem>,
    pub last_error: Option<String>,
}

impl FetchCache {
    pub fn new(items: Vec<ActivityItem>) -> Self {
        Self {
            last_fetch: Some(Utc::now()),
            items,
            last_error: None,
        }
    }

    pub fn record_success(&mut self, items: Vec<ActivityItem>, at: DateTime<Utc>) {
        self.items = items;
        self.last_fetch = Some(at);
        self.last_error = None;
    }

    pub fn record_failure(&mut self, error: impl std::fmt::Display) {
        self.last_error = Some(error.to_string());
    }
}

/// Where the catalog comes from.
pub enum CatalogSource {
    /// `itinerary.json` in the data directory, or the built-in itinerary
    /// when that file does not exist
    Fixture { data_dir: PathBuf },
    Google(GoogleCalendarClient),
}

impl CatalogSource {
    /// Google Calendar when credentials are configured, the fixture otherwise.
    pub fn from_config(config: Option<GoogleCalendarConfig>, data_dir: &Path) -> Result<Self> {
        match config {
            Some(config) => {
                let client =
                    GoogleCalendarClient::new(config).context("Failed to create calendar client")?;
                Ok(CatalogSource::Google(client))
            }
            None => Ok(CatalogSource::Fixture {
                data_dir: data_dir.to_path_buf(),
            }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CatalogSource::Fixture { data_dir } => {
                format!("fixture {}", data_dir.join(FIXTURE_FILE).display())
            }
            CatalogSource::Google(client) => format!("Google Calendar {}", client.calendar_id()),
        }
    }

    /// Directory to watch for changes. Only fixtures live on disk.
    pub fn watch_dir(&self) -> Option<&Path> {
        match self {
            CatalogSource::Fixture { data_dir } => Some(data_dir),
            CatalogSource::Google(_) => None,
        }
    }

    /// Produce a fresh catalog for the display window.
    pub async fn load(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ActivityItem>> {
        let items = match self {
            CatalogSource::Fixture { data_dir } => load_catalog(data_dir)?,
            CatalogSource::Google(client) => {
                let events = client
                    .fetch_events(from, to, &Local)
                    .await
                    .context("Failed to fetch calendar events")?;
                google::convert_events(&events, &Local)
            }
        };

        info!(count = items.len(), source = %self.describe(), "Catalog loaded");
        log_icon_coverage(&items);
        Ok(items)
    }
}

/// Load the fixture from `data_dir`, falling back to the built-in itinerary.
pub fn load_catalog(data_dir: &Path) -> Result<Vec<ActivityItem>> {
    let path = data_dir.join(FIXTURE_FILE);
    if !path.exists() {
        debug!(path = %path.display(), "No fixture file, using built-in itinerary");
        return Ok(builtin_fixture());
    }
    load_fixture(&path)
}

/// Read a JSON fixture. Items come back ordered by start date, file order
/// kept within a date.
pub fn load_fixture(path: &Path) -> Result<Vec<ActivityItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let mut items: Vec<ActivityItem> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse fixture {}", path.display()))?;

    items.sort_by_key(|item| item.start_date());
    debug!(count = items.len(), path = %path.display(), "Loaded fixture");
    Ok(items)
}

pub fn save_json(items: &[ActivityItem], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(items)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Log titles that fall back to a category icon.
pub fn log_icon_coverage(items: &[ActivityItem]) {
    let fallbacks: Vec<&str> = items
        .iter()
        .filter(|item| !emoji::has_specific_icon(&item.title))
        .map(|item| item.title.as_str())
        .collect();

    if fallbacks.is_empty() {
        debug!(count = items.len(), "Every activity has a specific icon");
    } else {
        for title in &fallbacks {
            debug!(title = %title, "Activity uses category fallback icon");
        }
        if fallbacks.len() * 2 > items.len() {
            warn!(
                fallback = fallbacks.len(),
                total = items.len(),
                "Most activities use category fallback icons"
            );
        }
    }
}

/// The itinerary shipped with the binary: July 2025, day of month and
/// optional inclusive last day.
const BUILTIN: &[(&str, &str, Category, u32, Option<u32>)] = &[
    ("1", "Arrival & Welcome", Category::Travel, 7, None),
    ("2", "Jerusalem Old City Tour", Category::Cultural, 8, None),
    ("3", "Masada & Dead Sea", Category::Adventure, 9, None),
    ("4", "Tzfat & Northern Israel", Category::Spiritual, 10, None),
    ("5", "Tel Aviv & Beach Day", Category::Leisure, 11, None),
    ("6", "Shabbos in Jerusalem", Category::Spiritual, 12, None),
    ("7", "Golan Heights Adventure", Category::Adventure, 13, None),
    ("8", "Eilat Beach Resort", Category::Leisure, 14, Some(16)),
    ("9", "Red Sea Snorkeling", Category::Adventure, 15, None),
    ("10", "Desert Camping Experience", Category::Adventure, 16, Some(17)),
    ("11", "Farewell Breakfast & Departure", Category::Travel, 18, None),
];

pub fn builtin_fixture() -> Vec<ActivityItem> {
    let july = |day: u32| NaiveDate::from_ymd_opt(2025, 7, day);

    BUILTIN
        .iter()
        .filter_map(|(id, title, category, start, end)| {
            let start = july(*start)?;
            match end {
                None => Some(ActivityItem::single(*id, *title, *category, start)),
                Some(end) => {
                    ActivityItem::multi_day(*id, *title, *category, start, july(*end)?).ok()
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::activities_on_date;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== builtin_fixture tests ==========

    #[test]
    fn test_builtin_fixture_contents() {
        let items = builtin_fixture();
        assert_eq!(items.len(), 11);

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11"]
        );
        assert_eq!(items.iter().filter(|i| i.is_multi_day()).count(), 2);
    }

    #[test]
    fn test_builtin_fixture_overlaps() {
        let items = builtin_fixture();
        let on_16th: Vec<_> = activities_on_date(&items, ymd(2025, 7, 16))
            .iter()
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(on_16th, vec!["8", "10"]);
    }

    // ========== load / save tests ==========

    #[test]
    fn test_load_catalog_without_fixture_uses_builtin() {
        let temp_dir = TempDir::new().unwrap();
        let items = load_catalog(temp_dir.path()).unwrap();
        assert_eq!(items, builtin_fixture());
    }

    #[test]
    fn test_load_fixture_sorts_by_start_date() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(FIXTURE_FILE);
        std::fs::write(
            &path,
            r#"[
                {"id": "b", "title": "Later", "type": "travel", "date": "2025-08-02"},
                {"id": "a", "title": "Earlier", "type": "cultural", "date": "2025-07-20"},
                {"id": "c", "title": "Same day", "type": "leisure", "date": "2025-08-02"}
            ]"#,
        )
        .unwrap();

        let items = load_catalog(temp_dir.path()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_fixture_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(FIXTURE_FILE);
        std::fs::write(&path, "not valid json").unwrap();

        let err = load_fixture(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse fixture"));
    }

    #[test]
    fn test_load_fixture_rejects_reversed_range() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(FIXTURE_FILE);
        std::fs::write(
            &path,
            r#"[{"id": "x", "title": "Trip", "date": "2025-07-20", "isMultiDay": true, "endDate": "2025-07-18"}]"#,
        )
        .unwrap();

        assert!(load_fixture(&path).is_err());
    }

    #[test]
    fn test_save_json_roundtrip_creates_dir() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(FIXTURE_FILE);
        let items = builtin_fixture();

        save_json(&items, &path).unwrap();
        let loaded = load_fixture(&path).unwrap();
        assert_eq!(loaded, items);
    }

    // ========== FetchCache tests ==========

    #[test]
    fn test_fetch_cache_failure_keeps_items() {
        let mut cache = FetchCache::new(builtin_fixture());
        let before = cache.last_fetch;

        cache.record_failure("calendar provider returned HTTP 500");
        assert_eq!(cache.items.len(), 11);
        assert_eq!(cache.last_fetch, before);
        assert_eq!(
            cache.last_error.as_deref(),
            Some("calendar provider returned HTTP 500")
        );
    }

    #[test]
    fn test_fetch_cache_success_replaces_wholesale() {
        let mut cache = FetchCache::new(builtin_fixture());
        cache.record_failure("boom");

        let fresh = vec![ActivityItem::single(
            "g1",
            "Kotel",
            Category::Spiritual,
            ymd(2025, 8, 4),
        )];
        let at = Utc::now();
        cache.record_success(fresh.clone(), at);

        assert_eq!(cache.items, fresh);
        assert_eq!(cache.last_fetch, Some(at));
        assert_eq!(cache.last_error, None);
    }

    // ========== CatalogSource tests ==========

    #[tokio::test]
    async fn test_fixture_source_load() {
        let temp_dir = TempDir::new().unwrap();
        let source = CatalogSource::from_config(None, temp_dir.path()).unwrap();

        assert_eq!(source.watch_dir(), Some(temp_dir.path()));
        assert!(source.describe().contains(FIXTURE_FILE));

        let items = source.load(ymd(2025, 7, 1), ymd(2025, 8, 31)).await.unwrap();
        assert_eq!(items.len(), 11);
    }

    #[test]
    fn test_google_source_has_no_watch_dir() {
        let config = GoogleCalendarConfig::new("key", "camp").unwrap();
        let source = CatalogSource::from_config(Some(config), Path::new("data")).unwrap();
        assert_eq!(source.watch_dir(), None);
        assert_eq!(source.describe(), "Google Calendar camp");
    }
}
