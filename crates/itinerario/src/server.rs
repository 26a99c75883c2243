use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate, Utc};
use notify_debouncer_mini::{
    new_debouncer,
    notify::{RecursiveMode, Watcher},
    DebounceEventResult,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::data::{CatalogSource, FetchCache, FIXTURE_FILE};
use crate::error::ApiError;
use crate::export;
use crate::filter::Filter;
use crate::grid::WeekStart;
use crate::html::{self, Links, Page, View};
use crate::resolve::activities_on_date;
use crate::types::ActivityItem;

/// Display options fixed at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub title: String,
    pub window: (NaiveDate, NaiveDate),
    pub week_start: WeekStart,
}

/// Application state shared across requests
pub struct AppState {
    pub cache: RwLock<FetchCache>,
    pub source: CatalogSource,
    pub settings: Settings,
    /// Serializes [`AppState::refresh`]
    refresh_lock: Mutex<()>,
}

impl AppState {
    pub fn new(source: CatalogSource, settings: Settings, cache: FetchCache) -> Self {
        Self {
            cache: RwLock::new(cache),
            source,
            settings,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Reload the catalog from the source and swap it in.
    ///
    /// On failure the current catalog stays and the error is recorded.
    /// Refreshes run one at a time.
    pub async fn refresh(&self) -> anyhow::Result<usize> {
        let _running = self.refresh_lock.lock().await;
        let (from, to) = self.settings.window;
        match self.source.load(from, to).await {
            Ok(items) => {
                let count = items.len();
                let mut cache = self.cache.write().await;
                let old_count = cache.items.len();
                cache.record_success(items, Utc::now());
                info!(
                    count,
                    change = count as i64 - old_count as i64,
                    "Catalog refreshed"
                );
                Ok(count)
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(error = %message, "Refresh failed, keeping previous catalog");
                self.cache.write().await.record_failure(message);
                Err(e)
            }
        }
    }
}

/// Start the web server, watching the fixture for changes when there is one
pub async fn serve(port: u16, source: CatalogSource, settings: Settings) -> anyhow::Result<()> {
    info!(source = %source.describe(), "Loading itinerary");
    let state = Arc::new(AppState::new(source, settings, FetchCache::default()));

    // A provider outage at startup still serves the page, with the error shown
    if state.refresh().await.is_err() {
        warn!("Starting with an empty catalog");
    }

    if let Some(dir) = state.source.watch_dir() {
        start_file_watcher(state.clone(), dir.to_path_buf())?;
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!(url = %format!("http://{addr}"), "Server running");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/print", get(print_handler))
        .route("/api/items", get(items_handler))
        .route("/api/days/{date}", get(day_handler))
        .route("/api/refresh", get(refresh_handler))
        .route("/export/itinerary.ics", get(ics_handler))
        .route("/export/itinerary.csv", get(csv_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Watch the fixture directory and reload when the fixture file changes
fn start_file_watcher(state: Arc<AppState>, data_dir: PathBuf) -> anyhow::Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        info!(path = %data_dir.display(), "Created data directory");
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel(10);

    let watch_dir = data_dir.clone();
    std::thread::spawn(move || {
        let debouncer = new_debouncer(
            Duration::from_secs(2),
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let touched = events.iter().any(|e| {
                        e.path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .is_some_and(|n| n == FIXTURE_FILE)
                    });
                    if touched {
                        let _ = tx.blocking_send(());
                    }
                }
                Err(e) => warn!(error = %e, "File watcher error"),
            },
        );
        let mut debouncer = match debouncer {
            Ok(d) => d,
            Err(e) => {
                error!(error = %e, "Failed to create file watcher");
                return;
            }
        };

        if let Err(e) = debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)
        {
            error!(error = %e, path = %watch_dir.display(), "Failed to watch directory");
            return;
        }
        info!(path = %watch_dir.display(), "Watching for fixture changes");

        // Keep the watcher alive
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    });

    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            debug!("Detected fixture change");
            let _ = state.refresh().await;
        }
    });

    Ok(())
}

/// `?q=&type=` filter plus the page view
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    view: Option<String>,
    q: Option<String>,
    #[serde(rename = "type")]
    category: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Filter {
        Filter::from_query(self.q.as_deref(), self.category.as_deref())
    }
}

/// Calendar or timeline page
async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Html<String> {
    let cache = state.cache.read().await;
    let filter = query.filter();
    let page = Page {
        title: &state.settings.title,
        catalog: &cache.items,
        filter: &filter,
        view: View::from_query(query.view.as_deref()),
        window: state.settings.window,
        week_start: state.settings.week_start,
        today: Local::now().date_naive(),
        last_fetch: cache.last_fetch,
        last_error: cache.last_error.as_deref(),
        links: Links::Server,
    };
    Html(html::render_page(&page).into_string())
}

async fn print_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Html<String> {
    let cache = state.cache.read().await;
    let items = query.filter().apply(&cache.items);
    let markup = html::render_print(&state.settings.title, &items, Local::now().date_naive());
    Html(markup.into_string())
}

/// Return (filtered) items as JSON
async fn items_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ActivityItem>> {
    let cache = state.cache.read().await;
    Json(query.filter().apply(&cache.items))
}

/// Items active on one date
async fn day_handler(
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<Vec<ActivityItem>>, ApiError> {
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date '{raw}', expected YYYY-MM-DD")))?;

    let cache = state.cache.read().await;
    let active: Vec<ActivityItem> = activities_on_date(&cache.items, date)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(active))
}

/// Reload from the source (manual trigger)
async fn refresh_handler(State(state): State<Arc<AppState>>) -> &'static str {
    info!("Manual refresh triggered");
    match state.refresh().await {
        Ok(_) => "OK",
        Err(_) => "ERROR",
    }
}

async fn ics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cache = state.cache.read().await;
    let body = export::to_ics(&cache.items, Utc::now());
    (
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"itinerary.ics\"",
            ),
        ],
        body,
    )
}

async fn csv_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cache = state.cache.read().await;
    let body = export::to_csv(&cache.items).map_err(|e| ApiError::Internal(format!("{e:#}")))?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"itinerary.csv\"",
            ),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::builtin_fixture;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_state(temp_dir: &TempDir) -> Arc<AppState> {
        let source = CatalogSource::Fixture {
            data_dir: temp_dir.path().to_path_buf(),
        };
        let settings = Settings {
            title: "Camp Itinerary".to_string(),
            window: (ymd(2025, 7, 1), ymd(2025, 8, 31)),
            week_start: WeekStart::Sunday,
        };
        Arc::new(AppState::new(
            source,
            settings,
            FetchCache::new(builtin_fixture()),
        ))
    }

    async fn request(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn ids(body: &str) -> Vec<String> {
        let items: Vec<ActivityItem> = serde_json::from_str(body).unwrap();
        items.into_iter().map(|i| i.id).collect()
    }

    #[tokio::test]
    async fn test_index_renders_calendar() {
        let temp_dir = TempDir::new().unwrap();
        let (status, _, body) = request(create_router(test_state(&temp_dir)), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Camp Itinerary"));
        assert!(body.contains("July 2025"));
        assert!(body.contains("August 2025"));
    }

    #[tokio::test]
    async fn test_index_timeline_with_filter() {
        let temp_dir = TempDir::new().unwrap();
        let (status, _, body) = request(
            create_router(test_state(&temp_dir)),
            "/?view=timeline&type=travel",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Arrival &amp; Welcome"));
        assert!(body.contains("Farewell Breakfast &amp; Departure"));
        assert!(!body.contains("Golan Heights Adventure"));
    }

    #[tokio::test]
    async fn test_api_items_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let app = create_router(test_state(&temp_dir));

        let (status, _, body) = request(app.clone(), "/api/items").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body).len(), 11);

        let (_, _, body) = request(app, "/api/items?type=adventure&q=desert").await;
        assert_eq!(ids(&body), vec!["10"]);
    }

    #[tokio::test]
    async fn test_api_day_overlap() {
        let temp_dir = TempDir::new().unwrap();
        let (status, _, body) = request(
            create_router(test_state(&temp_dir)),
            "/api/days/2025-07-16",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec!["8", "10"]);
    }

    #[tokio::test]
    async fn test_api_day_rejects_bad_date() {
        let temp_dir = TempDir::new().unwrap();
        let (status, _, body) = request(
            create_router(test_state(&temp_dir)),
            "/api/days/July-16",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_refresh_replaces_catalog() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(FIXTURE_FILE),
            r#"[{"id": "n1", "title": "North Overnight", "type": "adventure",
                 "date": "2025-08-04", "isMultiDay": true, "endDate": "2025-08-06"}]"#,
        )
        .unwrap();
        let state = test_state(&temp_dir);
        let app = create_router(state.clone());

        let (_, _, body) = request(app.clone(), "/api/refresh").await;
        assert_eq!(body, "OK");

        let (_, _, body) = request(app, "/api/days/2025-08-05").await;
        assert_eq!(ids(&body), vec!["n1"]);
        assert_eq!(state.cache.read().await.items.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_catalog() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(FIXTURE_FILE), "{ broken").unwrap();
        let state = test_state(&temp_dir);
        let app = create_router(state.clone());

        let (_, _, body) = request(app.clone(), "/api/refresh").await;
        assert_eq!(body, "ERROR");

        {
            let cache = state.cache.read().await;
            assert_eq!(cache.items.len(), 11);
            assert!(cache.last_error.is_some());
        }

        let (_, _, body) = request(app, "/").await;
        assert!(body.contains("error-banner"));
    }

    #[tokio::test]
    async fn test_refreshes_run_one_at_a_time() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(FIXTURE_FILE), "[]").unwrap();
        let state = test_state(&temp_dir);

        let running = state.refresh_lock.lock().await;
        let waiting = tokio::spawn({
            let state = state.clone();
            async move { state.refresh().await.unwrap() }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!waiting.is_finished());
        assert_eq!(state.cache.read().await.items.len(), 11);

        drop(running);
        assert_eq!(waiting.await.unwrap(), 0);
        assert!(state.cache.read().await.items.is_empty());
    }

    #[tokio::test]
    async fn test_ics_export() {
        let temp_dir = TempDir::new().unwrap();
        let (status, headers, body) = request(
            create_router(test_state(&temp_dir)),
            "/export/itinerary.ics",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            headers[header::CONTENT_TYPE],
            "text/calendar; charset=utf-8"
        );
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("itinerary.ics"));
        assert_eq!(body.matches("BEGIN:VEVENT").count(), 11);
    }

    #[tokio::test]
    async fn test_csv_export() {
        let temp_dir = TempDir::new().unwrap();
        let (status, headers, body) = request(
            create_router(test_state(&temp_dir)),
            "/export/itinerary.csv",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "text/csv; charset=utf-8");
        assert_eq!(body.lines().count(), 12);
        assert!(body.contains(r#""2025-07-14","","Eilat Beach Resort","leisure","Yes""#));
    }

    #[tokio::test]
    async fn test_print_page_filtered() {
        let temp_dir = TempDir::new().unwrap();
        let (status, _, body) = request(
            create_router(test_state(&temp_dir)),
            "/print?type=spiritual",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.matches(r#"class="activity""#).count(), 2);
        assert!(body.contains("window.print()"));
    }
}
