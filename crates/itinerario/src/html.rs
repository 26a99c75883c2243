use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use maud::{html, Markup, PreEscaped, DOCTYPE};
use reqwest::Url;
use std::fs;
use std::path::Path;

use crate::emoji;
use crate::filter::{category_counts, group_by_date, DayStatus, Filter};
use crate::grid::{build_grid_with, month_windows, weekday_labels, Cell, WeekStart};
use crate::resolve::{multi_day_first, primary_for_day};
use crate::types::{ActivityItem, Category};

/// Background palette for days covered by a multi-day item.
const SPAN_COLORS: usize = 6;

/// Regular items listed in a calendar cell before collapsing into "+N more".
const CELL_ITEMS: usize = 3;
const CELL_ITEMS_WITH_BANNER: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Calendar,
    Timeline,
}

impl View {
    /// `timeline` selects the timeline; anything else is the calendar.
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("timeline") => View::Timeline,
            _ => View::Calendar,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            View::Calendar => "calendar",
            View::Timeline => "timeline",
        }
    }
}

/// How pages link to each other: server routes, or files side by side
/// in a build directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Links {
    Server,
    Static,
}

/// Everything a calendar or timeline page needs.
pub struct Page<'a> {
    pub title: &'a str,
    /// Full catalog; filtering happens while rendering
    pub catalog: &'a [ActivityItem],
    pub filter: &'a Filter,
    pub view: View,
    pub window: (NaiveDate, NaiveDate),
    pub week_start: WeekStart,
    pub today: NaiveDate,
    pub last_fetch: Option<DateTime<Utc>>,
    pub last_error: Option<&'a str>,
    pub links: Links,
}

impl Page<'_> {
    fn view_href(&self, view: View) -> String {
        match self.links {
            Links::Static => match view {
                View::Calendar => "index.html".to_string(),
                View::Timeline => "timeline.html".to_string(),
            },
            Links::Server => {
                let mut pairs = vec![("view", view.as_str())];
                if let Some(q) = self.filter.search() {
                    pairs.push(("q", q));
                }
                if let Some(category) = self.filter.category() {
                    pairs.push(("type", category.as_str()));
                }
                query_href("/", &pairs)
            }
        }
    }

    fn tab_href(&self, category: Option<Category>) -> String {
        let mut pairs = vec![("view", self.view.as_str())];
        if let Some(q) = self.filter.search() {
            pairs.push(("q", q));
        }
        pairs.push(("type", category.map(Category::as_str).unwrap_or("all")));
        query_href("/", &pairs)
    }

    fn export_href(&self, file: &str) -> String {
        match self.links {
            Links::Static => file.to_string(),
            Links::Server => format!("/export/{file}"),
        }
    }

    fn print_href(&self) -> String {
        match self.links {
            Links::Static => "print.html".to_string(),
            Links::Server => {
                let mut pairs = Vec::new();
                if let Some(q) = self.filter.search() {
                    pairs.push(("q", q));
                }
                if let Some(category) = self.filter.category() {
                    pairs.push(("type", category.as_str()));
                }
                query_href("/print", &pairs)
            }
        }
    }
}

/// `path?k=v&..` with form encoding. Falls back to the bare path.
fn query_href(path: &str, pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return path.to_string();
    }
    match Url::parse_with_params("http://localhost/", pairs) {
        Ok(url) => format!("{}?{}", path, url.query().unwrap_or_default()),
        Err(_) => path.to_string(),
    }
}

/// Write a rendered page to disk.
pub fn generate_html(page: &Page, path: &Path) -> Result<()> {
    let html = render_page(page);
    fs::write(path, html.into_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn generate_print(
    title: &str,
    items: &[ActivityItem],
    today: NaiveDate,
    path: &Path,
) -> Result<()> {
    let html = render_print(title, items, today);
    fs::write(path, html.into_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn render_page(page: &Page) -> Markup {
    let visible = page.filter.apply(page.catalog);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (page.title) }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    (render_header(page, visible.len()))
                    @if let Some(error) = page.last_error {
                        div.error-banner role="alert" {
                            strong { "Could not refresh the calendar. " }
                            "Showing the last loaded itinerary. "
                            span.error-detail { (error) }
                        }
                    }
                    (render_toolbar(page))
                    @if visible.is_empty() {
                        div.empty-state {
                            p { "No activities found." }
                            @if page.filter.is_active() {
                                p { "Try a different search or category." }
                            } @else {
                                p { "Check back later for updates to the itinerary." }
                            }
                        }
                    } @else {
                        @match page.view {
                            View::Calendar => { (render_calendar(page, &visible)) }
                            View::Timeline => { (render_timeline(&visible, page.today)) }
                        }
                    }
                }
                script { (PreEscaped(JAVASCRIPT)) }
            }
        }
    }
}

fn render_header(page: &Page, visible: usize) -> Markup {
    let total = page.catalog.len();
    html! {
        header.page-header {
            h1 { (page.title) }
            div.stats {
                span #"total-count" { (total) }
                " activities"
                @if page.filter.is_active() {
                    " · showing " span #"visible-count" { (visible) }
                }
                @if let Some(at) = page.last_fetch {
                    " · updated " (at.format("%Y-%m-%d %H:%M UTC").to_string())
                }
            }
        }
    }
}

fn render_toolbar(page: &Page) -> Markup {
    let counts = category_counts(page.catalog);
    let active = page.filter.category();

    html! {
        nav.toolbar {
            div.view-toggle {
                a.active[page.view == View::Calendar] href=(page.view_href(View::Calendar)) { "📅 Calendar" }
                a.active[page.view == View::Timeline] href=(page.view_href(View::Timeline)) { "🗒️ Timeline" }
            }
            div.exports {
                a href=(page.export_href("itinerary.ics")) download { "Add to calendar (.ics)" }
                a href=(page.export_href("itinerary.csv")) download { "Spreadsheet (.csv)" }
                a href=(page.print_href()) { "Print" }
                @if page.links == Links::Server {
                    button #"refresh" type="button" { "Refresh" }
                }
            }
        }
        @match page.links {
            Links::Server => {
                form.search method="get" action="/" {
                    input type="hidden" name="view" value=(page.view.as_str());
                    @if let Some(category) = active {
                        input type="hidden" name="type" value=(category.as_str());
                    }
                    input type="search" name="q" placeholder="Search activities..." value=(page.filter.search().unwrap_or_default());
                    button type="submit" { "Search" }
                }
                div.filter-tabs {
                    a.tab.active[active.is_none()] href=(page.tab_href(None)) {
                        "All " span.count { (page.catalog.len()) }
                    }
                    @for (category, count) in &counts {
                        a.tab.active[active == Some(*category)] href=(page.tab_href(Some(*category))) {
                            (emoji::category_icon(*category)) " " (category.label()) " "
                            span.count { (count) }
                        }
                    }
                }
            }
            Links::Static => {
                div.filter-tabs {
                    @for (category, count) in &counts {
                        span.tab { (emoji::category_icon(*category)) " " (category.label()) " " span.count { (count) } }
                    }
                }
            }
        }
    }
}

fn render_calendar(page: &Page, visible: &[ActivityItem]) -> Markup {
    let (start, end) = page.window;
    let labels = weekday_labels(page.week_start);

    html! {
        div.calendar {
            @for (first, last) in month_windows(start, end) {
                section.month {
                    h2 { (first.format("%B %Y").to_string()) }
                    div.grid {
                        @for label in labels {
                            div.weekday { (label) }
                        }
                        @for cell in build_grid_with(page.week_start, first, last, visible) {
                            (render_cell(&cell, page.today))
                        }
                    }
                }
            }
        }
    }
}

fn render_cell(cell: &Cell, today: NaiveDate) -> Markup {
    let Cell::Day { date, activities } = cell else {
        return html! { div.cell.empty {} };
    };

    let primary = primary_for_day(activities);
    // other multi-day items on this day fall back to chips, ahead of the rest
    let regular: Vec<&ActivityItem> = multi_day_first(activities)
        .into_iter()
        .filter(|item| !primary.is_some_and(|p| std::ptr::eq(p, *item)))
        .collect();
    let limit = if primary.is_some() {
        CELL_ITEMS_WITH_BANNER
    } else {
        CELL_ITEMS
    };

    let mut classes = vec!["cell".to_string()];
    if *date == today {
        classes.push("today".to_string());
    }
    if let Some(item) = primary {
        classes.push(format!("span-color-{}", span_color(&item.id)));
    }

    html! {
        div class=(classes.join(" ")) data-date=(date.format("%Y-%m-%d").to_string()) {
            div.day-number { (date.format("%-d").to_string()) }
            @if let Some(item) = primary {
                div.banner title=(item.title) {
                    (emoji::icon_for(&item.title, item.category)) " " (item.title)
                }
            }
            @for item in regular.iter().take(limit) {
                div class={"chip type-" (item.category.as_str())} title=(item.title) {
                    (emoji::icon_for(&item.title, item.category)) " " (item.title)
                }
            }
            @if regular.len() > limit {
                div.more { "+" (regular.len() - limit) " more" }
            }
        }
    }
}

/// Palette index for a multi-day item, from the sum of its id's characters.
pub fn span_color(id: &str) -> usize {
    let sum: usize = id.chars().map(|c| c as usize).sum();
    sum % SPAN_COLORS
}

fn render_timeline(visible: &[ActivityItem], today: NaiveDate) -> Markup {
    let by_date = group_by_date(visible);

    html! {
        div.timeline #"timeline" {
            @for (date, items) in &by_date {
                div.date-group.today[*date == today] {
                    div.date-header { (date.format("%A, %B %-d, %Y").to_string()) }
                    @for item in items {
                        (render_card(item, today))
                    }
                }
            }
        }
    }
}

fn render_card(item: &ActivityItem, today: NaiveDate) -> Markup {
    let status = DayStatus::of(item, today);

    html! {
        div class={"card " (status.css_class()) " type-" (item.category.as_str())} data-id=(item.id) {
            div.card-icon { (emoji::icon_for(&item.title, item.category)) }
            div.card-content {
                div.card-title { (item.title) }
                div.card-meta {
                    @if let Some(time) = item.start_time {
                        span.time { (time.format("%H:%M").to_string()) }
                    }
                    span class={"badge type-" (item.category.as_str())} {
                        (emoji::category_icon(item.category)) " " (item.category.label())
                    }
                    @if let Some(end) = item.end_date() {
                        span.multi-day { "Multi-day · until " (end.format("%a, %b %-d").to_string()) }
                    }
                    @if status == DayStatus::Today {
                        span.now { "Today" }
                    }
                }
            }
        }
    }
}

/// Standalone page listing every item, printed on load.
pub fn render_print(title: &str, items: &[ActivityItem], today: NaiveDate) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { (title) " Itinerary" }
                style { (PreEscaped(PRINT_CSS)) }
            }
            body {
                div.header {
                    h1 { (title) }
                    h2 { "Itinerary & Schedule" }
                    p { "Generated on " (today.format("%B %-d, %Y").to_string()) }
                }
                @for item in items {
                    div.activity {
                        div.date { (item.start_date().format("%A, %B %-d, %Y").to_string()) }
                        div.title { (emoji::icon_for(&item.title, item.category)) " " (item.title) }
                        @if let Some(time) = item.start_time {
                            div.time { "Time: " (time.format("%H:%M").to_string()) }
                        }
                        div.category { "Type: " (item.category.label()) }
                        @if let Some(end) = item.end_date() {
                            div.multiday { "Multi-day event until " (end.format("%A, %B %-d, %Y").to_string()) }
                        }
                    }
                }
                script { (PreEscaped("window.addEventListener('load', () => window.print());")) }
            }
        }
    }
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
    background: linear-gradient(135deg, #eff6ff 0%, #eef2ff 100%);
    color: #1f2937;
    min-height: 100vh;
    line-height: 1.4;
}

.container {
    max-width: 1200px;
    margin: 0 auto;
    padding: 32px 20px 60px;
}

.page-header h1 {
    font-size: 2.4em;
    font-weight: 800;
    text-align: center;
}

.stats {
    text-align: center;
    color: #6b7280;
    font-size: 0.9em;
    margin: 6px 0 24px;
}

.error-banner {
    background: #fef2f2;
    border: 1px solid #fecaca;
    color: #991b1b;
    padding: 12px 16px;
    border-radius: 8px;
    margin-bottom: 20px;
}

.error-detail {
    font-family: monospace;
    font-size: 0.85em;
}

.toolbar {
    display: flex;
    flex-wrap: wrap;
    justify-content: space-between;
    gap: 12px;
    margin-bottom: 16px;
}

.toolbar a, .toolbar button, .search button {
    display: inline-block;
    padding: 8px 14px;
    border-radius: 8px;
    border: 1px solid #d1d5db;
    background: #fff;
    color: #374151;
    text-decoration: none;
    font-size: 0.9em;
    cursor: pointer;
}

.view-toggle a.active {
    background: #2563eb;
    border-color: #2563eb;
    color: #fff;
}

.exports {
    display: flex;
    gap: 8px;
}

.search {
    display: flex;
    gap: 8px;
    margin-bottom: 12px;
}

.search input[type=search] {
    flex: 1;
    padding: 8px 12px;
    border-radius: 8px;
    border: 1px solid #d1d5db;
    font-size: 1em;
}

.filter-tabs {
    display: flex;
    flex-wrap: wrap;
    gap: 8px;
    margin-bottom: 28px;
}

.tab {
    padding: 6px 12px;
    border-radius: 999px;
    background: #fff;
    border: 1px solid #e5e7eb;
    color: #374151;
    text-decoration: none;
    font-size: 0.85em;
}

.tab.active {
    background: #1f2937;
    color: #fff;
}

.tab .count {
    opacity: 0.6;
}

.month {
    margin-bottom: 36px;
}

.month h2 {
    text-align: center;
    font-size: 1.8em;
    margin-bottom: 16px;
}

.grid {
    display: grid;
    grid-template-columns: repeat(7, 1fr);
    background: #fff;
    border-radius: 12px;
    overflow: hidden;
    box-shadow: 0 1px 3px rgba(0,0,0,0.1);
}

.weekday {
    padding: 10px;
    text-align: center;
    font-weight: 600;
    color: #4b5563;
    background: #f9fafb;
    border-bottom: 1px solid #e5e7eb;
}

.cell {
    min-height: 120px;
    padding: 8px;
    border-right: 1px solid #f3f4f6;
    border-bottom: 1px solid #f3f4f6;
    overflow: hidden;
}

.cell.empty {
    background: #f9fafb;
}

.cell.today {
    box-shadow: inset 0 0 0 2px #93c5fd;
    background-color: #eff6ff;
}

.cell.today .day-number {
    color: #2563eb;
}

.day-number {
    font-size: 0.85em;
    font-weight: 600;
    color: #374151;
    margin-bottom: 6px;
}

.banner {
    font-size: 0.75em;
    font-weight: 600;
    margin-bottom: 6px;
    white-space: nowrap;
    overflow: hidden;
    text-overflow: ellipsis;
}

.chip {
    font-size: 0.72em;
    padding: 2px 6px;
    border-radius: 6px;
    border: 1px solid;
    margin-bottom: 3px;
    white-space: nowrap;
    overflow: hidden;
    text-overflow: ellipsis;
}

.more {
    font-size: 0.72em;
    color: #6b7280;
}

.span-color-0 { background: linear-gradient(90deg, #eff6ff, #e0e7ff); }
.span-color-1 { background: linear-gradient(90deg, #f0fdf4, #d1fae5); }
.span-color-2 { background: linear-gradient(90deg, #faf5ff, #ede9fe); }
.span-color-3 { background: linear-gradient(90deg, #fff7ed, #fef3c7); }
.span-color-4 { background: linear-gradient(90deg, #fdf2f8, #ffe4e6); }
.span-color-5 { background: linear-gradient(90deg, #f0fdfa, #cffafe); }

.type-spiritual { background-color: #dbeafe; color: #1e40af; border-color: #bfdbfe; }
.type-adventure { background-color: #ffedd5; color: #9a3412; border-color: #fed7aa; }
.type-educational { background-color: #dcfce7; color: #166534; border-color: #bbf7d0; }
.type-leisure { background-color: #f3e8ff; color: #6b21a8; border-color: #e9d5ff; }
.type-travel { background-color: #f3f4f6; color: #1f2937; border-color: #e5e7eb; }
.type-cultural { background-color: #fef9c3; color: #854d0e; border-color: #fef08a; }

.timeline {
    display: grid;
    gap: 28px;
}

.date-header {
    font-weight: 700;
    font-size: 1.1em;
    margin-bottom: 12px;
    color: #374151;
}

.date-group.today .date-header {
    color: #2563eb;
}

.card {
    display: flex;
    gap: 14px;
    align-items: flex-start;
    padding: 14px 16px;
    margin-bottom: 10px;
    border-radius: 10px;
    border: 1px solid #e5e7eb;
    background: #fff !important;
    color: #1f2937 !important;
}

.card.past {
    opacity: 0.55;
}

.card.today {
    box-shadow: 0 0 0 2px #60a5fa;
}

.card-icon {
    font-size: 1.6em;
}

.card-title {
    font-weight: 600;
    margin-bottom: 4px;
}

.card-meta {
    display: flex;
    flex-wrap: wrap;
    gap: 8px;
    font-size: 0.8em;
    color: #6b7280;
}

.badge {
    padding: 1px 8px;
    border-radius: 999px;
    border: 1px solid;
}

.multi-day {
    color: #b91c1c;
    font-weight: 600;
}

.now {
    color: #2563eb;
    font-weight: 700;
}

.empty-state {
    padding: 60px 20px;
    text-align: center;
    color: #6b7280;
}

@media (max-width: 768px) {
    .cell {
        min-height: 80px;
        padding: 4px;
    }

    .chip, .banner {
        font-size: 0.65em;
    }
}
"#;

const JAVASCRIPT: &str = r#"
// Manual refresh through the API, then reload
const refresh = document.getElementById('refresh');
if (refresh) {
    refresh.addEventListener('click', async () => {
        refresh.disabled = true;
        refresh.textContent = 'Refreshing...';
        try {
            const res = await fetch('/api/refresh');
            const text = await res.text();
            if (text !== 'OK') {
                alert('Refresh failed. Showing the last loaded itinerary.');
            }
        } finally {
            location.reload();
        }
    });
}

// Bring today's activities into view on the timeline
const todayGroup = document.querySelector('.date-group.today');
if (todayGroup) {
    todayGroup.scrollIntoView({ behavior: 'smooth', block: 'start' });
}
"#;

const PRINT_CSS: &str = r#"
body { font-family: Arial, sans-serif; margin: 20px; }
.header { text-align: center; margin-bottom: 30px; }
.activity { margin-bottom: 20px; padding: 15px; border: 1px solid #ddd; border-radius: 8px; page-break-inside: avoid; }
.date { font-weight: bold; color: #2563eb; margin-bottom: 10px; }
.title { font-size: 18px; font-weight: bold; margin-bottom: 5px; }
.time { color: #666; margin-bottom: 5px; }
.category { color: #666; margin-bottom: 5px; }
.multiday { color: #dc2626; font-weight: bold; }
@media print { body { margin: 0; } }
"#;
